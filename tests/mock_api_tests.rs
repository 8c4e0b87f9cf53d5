//! Mock API tests for translation providers
//!
//! The Gemini translator is exercised against a local wiremock server; the
//! fallback chain and quota run against in-process providers.

use async_trait::async_trait;
use autodub::config::ConstraintPolicy;
use autodub::error::{AutodubError, Result};
use autodub::script::prepare_script;
use autodub::transcribe::TranscriptSegment;
use autodub::translate::{
    GeminiTranslator, QuotaLimitedTranslator, QuotaTracker, Translator, TranslatorChain,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

fn gemini_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [
            { "content": { "parts": [ { "text": text } ] } }
        ]
    })
}

// ============================================================================
// Gemini API Mock Tests
// ============================================================================

mod gemini_tests {
    use super::*;

    #[tokio::test]
    async fn test_gemini_single_translation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Hola a todos.\n")))
            .expect(1)
            .mount(&server)
            .await;

        let translator = GeminiTranslator::new("test-key".to_string()).with_base_url(server.uri());
        let text = translator.translate("Hello everyone.", "en", "es").await.unwrap();
        assert_eq!(text, "Hola a todos.");
    }

    #[tokio::test]
    async fn test_gemini_batch_translation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(gemini_reply("[1] Buenos días.\n[2] ¿Cómo estás?\n[3] Adiós.")),
            )
            .mount(&server)
            .await;

        let translator = GeminiTranslator::new("test-key".to_string()).with_base_url(server.uri());
        let texts = translator
            .translate_batch(&["Good morning.", "How are you?", "Goodbye."], "en", "es")
            .await
            .unwrap();
        assert_eq!(texts, vec!["Buenos días.", "¿Cómo estás?", "Adiós."]);
    }

    #[tokio::test]
    async fn test_gemini_http_error_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let translator = GeminiTranslator::new("test-key".to_string()).with_base_url(server.uri());
        let err = translator.translate("Hello.", "en", "es").await.unwrap_err();
        assert!(matches!(err, AutodubError::Api(ref m) if m.contains("429")));
    }

    #[tokio::test]
    async fn test_gemini_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "error": { "message": "bad key" } })),
            )
            .mount(&server)
            .await;

        let translator = GeminiTranslator::new("test-key".to_string()).with_base_url(server.uri());
        let err = translator.translate("Hello.", "en", "es").await.unwrap_err();
        assert!(err.to_string().contains("bad key"));
    }

    #[tokio::test]
    async fn test_gemini_empty_reply_is_translation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let translator = GeminiTranslator::new("test-key".to_string()).with_base_url(server.uri());
        let err = translator.translate("Hello.", "en", "es").await.unwrap_err();
        assert!(matches!(err, AutodubError::Translation(_)));
    }

    #[tokio::test]
    async fn test_gemini_custom_model_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-pro:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Bonjour.")))
            .expect(1)
            .mount(&server)
            .await;

        let translator = GeminiTranslator::new("test-key".to_string())
            .with_model("gemini-1.5-pro")
            .with_base_url(format!("{}/", server.uri()));
        assert_eq!(translator.translate("Hello.", "en", "fr").await.unwrap(), "Bonjour.");
    }
}

// ============================================================================
// Fallback Chain and Quota Tests
// ============================================================================

/// Upper-cases its input and counts calls.
struct Shouting {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Translator for Shouting {
    fn name(&self) -> &str {
        "shouting"
    }

    async fn translate_batch(
        &self,
        texts: &[&str],
        _source_lang: &str,
        _target_lang: &str,
    ) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| t.to_uppercase()).collect())
    }

    fn supported_languages(&self) -> &[&str] {
        &["en"]
    }
}

mod chain_tests {
    use super::*;

    #[tokio::test]
    async fn test_chain_falls_through_failed_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let calls = Arc::new(AtomicUsize::new(0));
        let chain = TranslatorChain::new()
            .with(Box::new(
                GeminiTranslator::new("test-key".to_string()).with_base_url(server.uri()),
            ))
            .with(Box::new(Shouting {
                calls: calls.clone(),
            }));

        let text = chain.translate("hello", "en", "es").await.unwrap();
        assert_eq!(text, "HELLO");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_quota_exhaustion_falls_through() {
        let quota = QuotaTracker::shared(1);
        let primary_calls = Arc::new(AtomicUsize::new(0));
        let backup_calls = Arc::new(AtomicUsize::new(0));

        let chain = TranslatorChain::new()
            .with(Box::new(QuotaLimitedTranslator::new(
                Shouting {
                    calls: primary_calls.clone(),
                },
                quota.clone(),
            )))
            .with(Box::new(Shouting {
                calls: backup_calls.clone(),
            }));

        chain.translate("one", "en", "es").await.unwrap();
        chain.translate("two", "en", "es").await.unwrap();

        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(backup_calls.load(Ordering::SeqCst), 1);
        assert_eq!(quota.remaining(), 0);
    }

    #[tokio::test]
    async fn test_quota_error_without_backup() {
        let quota = QuotaTracker::shared(0);
        let translator = QuotaLimitedTranslator::new(
            Shouting {
                calls: Arc::new(AtomicUsize::new(0)),
            },
            quota,
        );
        let err = translator.translate("hi", "en", "es").await.unwrap_err();
        assert!(matches!(err, AutodubError::QuotaExceeded { limit: 0, .. }));
    }

    #[tokio::test]
    async fn test_prepare_script_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(gemini_reply("[1] Hola a todos.\n[2] Empecemos ahora mismo.")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let translator = GeminiTranslator::new("test-key".to_string()).with_base_url(server.uri());
        let segments = vec![
            TranscriptSegment::new(0.0, 1.2, "Hello everyone."),
            TranscriptSegment::new(1.2, 3.0, "Let's get started right now."),
        ];

        let script = prepare_script(
            &segments,
            &translator,
            "en",
            "es",
            &ConstraintPolicy::default(),
        )
        .await
        .unwrap();

        assert_eq!(script.len(), 2);
        assert_eq!(script[0].0.original_text, "Hello everyone.");
        assert!((script[1].0.duration - 1.8).abs() < 1e-9);
        for (_, result) in &script {
            assert!((0.0..=100.0).contains(&result.quality_score));
        }
    }
}
