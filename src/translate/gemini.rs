//! Gemini-based translation using the Generative AI API.

use crate::error::{AutodubError, Result};
use crate::translate::Translator;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Translator using Google Gemini API.
pub struct GeminiTranslator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiTranslator {
    /// Create a new Gemini translator with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: build_client(DEFAULT_TIMEOUT),
            api_key,
            model: "gemini-2.0-flash".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set a different model (e.g., "gemini-1.5-pro").
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at another endpoint (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    /// Build the translation prompt. Dubbed lines are spoken, so the model is
    /// asked to keep each translation about as long as its source.
    fn build_prompt(&self, texts: &[&str], source_lang: &str, target_lang: &str) -> String {
        let from = language_code_to_name(source_lang);
        let to = language_code_to_name(target_lang);

        if texts.len() == 1 {
            format!(
                r#"Translate the following {from} text to {to} for voice dubbing.
Keep the translation close to the original length. Return ONLY the translated text, nothing else.

Text to translate:
{}"#,
                texts[0]
            )
        } else {
            let numbered_texts: String = texts
                .iter()
                .enumerate()
                .map(|(i, t)| format!("[{}] {}", i + 1, t))
                .collect::<Vec<_>>()
                .join("\n");

            format!(
                r#"Translate each of the following numbered {from} lines to {to} for voice dubbing.
Keep each translation close to its original length.
Return ONLY the translations in the same numbered format, one per line.

Texts to translate:
{numbered_texts}"#
            )
        }
    }

    /// Parse batch translation response. May return fewer entries than
    /// requested when the model drops lines.
    fn parse_batch_response(&self, response: &str, count: usize) -> Vec<String> {
        let mut results = Vec::with_capacity(count);

        for i in 1..=count {
            let pattern = format!("[{}]", i);
            let next_pattern = format!("[{}]", i + 1);

            if let Some(start) = response.find(&pattern) {
                let text_start = start + pattern.len();
                let text_end = if i < count {
                    response[text_start..]
                        .find(&next_pattern)
                        .map(|p| text_start + p)
                        .unwrap_or(response.len())
                } else {
                    response.len()
                };

                results.push(response[text_start..text_end].trim().to_string());
            }
        }

        if results.len() != count {
            warn!(
                "Batch parse failed (got {} of {}), using line-based fallback",
                results.len(),
                count
            );
            results = response
                .lines()
                .filter(|l| !l.trim().is_empty())
                .take(count)
                .map(|l| l.trim().to_string())
                .collect();
        }

        results
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize, Debug)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponseContent {
    parts: Option<Vec<GeminiResponsePart>>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiError {
    message: String,
}

#[async_trait]
impl Translator for GeminiTranslator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn translate_batch(
        &self,
        texts: &[&str],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Vec<String>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!(
            "Translating {} text(s) {} -> {}",
            texts.len(),
            source_lang,
            target_lang
        );

        let prompt = self.build_prompt(texts, source_lang, target_lang);

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AutodubError::Api(format!("Translation request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AutodubError::Api(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(AutodubError::Api(format!(
                "Translation API error ({}): {}",
                status, body
            )));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            AutodubError::Api(format!("Failed to parse translation response: {}", e))
        })?;

        if let Some(error) = gemini_response.error {
            return Err(AutodubError::Api(format!("Gemini error: {}", error.message)));
        }

        let translated_text = gemini_response
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|p| p.into_iter().next())
            .and_then(|p| p.text)
            .unwrap_or_default();

        if translated_text.trim().is_empty() {
            return Err(AutodubError::Translation(
                "Gemini returned no text".to_string(),
            ));
        }

        if texts.len() == 1 {
            Ok(vec![translated_text.trim().to_string()])
        } else {
            Ok(self.parse_batch_response(&translated_text, texts.len()))
        }
    }

    fn supported_languages(&self) -> &[&str] {
        &SUPPORTED_LANGUAGES
    }
}

/// Convert language code to human-readable name for better prompting.
fn language_code_to_name(code: &str) -> &'static str {
    let lowercase = code.to_lowercase();
    let base = lowercase.split(['-', '_']).next().unwrap_or_default();
    match base {
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "bn" => "Bengali",
        "ur" => "Urdu",
        "ta" => "Tamil",
        "te" => "Telugu",
        "th" => "Thai",
        "vi" => "Vietnamese",
        "id" => "Indonesian",
        "nl" => "Dutch",
        "pl" => "Polish",
        "tr" => "Turkish",
        "uk" => "Ukrainian",
        "sv" => "Swedish",
        "el" => "Greek",
        "he" => "Hebrew",
        _ => "the target language",
    }
}

const SUPPORTED_LANGUAGES: [&str; 26] = [
    "en", "es", "fr", "de", "it", "pt", "ru", "ja", "ko", "zh", "ar", "hi", "bn", "ur", "ta", "te",
    "th", "vi", "id", "nl", "pl", "tr", "uk", "sv", "el", "he",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_translator_creation() {
        let translator = GeminiTranslator::new("test-key".to_string());
        assert_eq!(translator.name(), "gemini");
        assert_eq!(translator.model, "gemini-2.0-flash");
        assert_eq!(translator.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_with_base_url_trims_slash() {
        let translator =
            GeminiTranslator::new("k".to_string()).with_base_url("http://localhost:8080/");
        assert_eq!(translator.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_build_prompt_batch() {
        let translator = GeminiTranslator::new("test-key".to_string());
        let prompt = translator.build_prompt(&["Hello", "Goodbye"], "en", "ja");
        assert!(prompt.contains("English"));
        assert!(prompt.contains("Japanese"));
        assert!(prompt.contains("[1] Hello"));
        assert!(prompt.contains("[2] Goodbye"));
    }

    #[test]
    fn test_parse_batch_response() {
        let translator = GeminiTranslator::new("test-key".to_string());
        let results = translator.parse_batch_response("[1] Hola\n[2] Adiós", 2);
        assert_eq!(results, vec!["Hola", "Adiós"]);
    }

    #[test]
    fn test_parse_batch_line_fallback_does_not_pad() {
        let translator = GeminiTranslator::new("test-key".to_string());
        let results = translator.parse_batch_response("Hola\n\nAdiós", 3);
        assert_eq!(results, vec!["Hola", "Adiós"]);
    }

    #[test]
    fn test_language_code_to_name() {
        assert_eq!(language_code_to_name("ES"), "Spanish");
        assert_eq!(language_code_to_name("pt-BR"), "Portuguese");
        assert_eq!(language_code_to_name("xyz"), "the target language");
    }
}
