use crate::error::{AutodubError, Result};
use crate::translate::Translator;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Ordered list of translators tried until one succeeds.
pub struct TranslatorChain {
    providers: Vec<Box<dyn Translator>>,
}

impl TranslatorChain {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn with(mut self, provider: Box<dyn Translator>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn push(&mut self, provider: Box<dyn Translator>) {
        self.providers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for TranslatorChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Translator for TranslatorChain {
    fn name(&self) -> &str {
        "chain"
    }

    async fn translate_batch(
        &self,
        texts: &[&str],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Vec<String>> {
        if self.providers.is_empty() {
            return Err(AutodubError::Translation(
                "No translation providers configured".to_string(),
            ));
        }

        let mut failures = Vec::new();
        for provider in &self.providers {
            debug!("Trying translator '{}'", provider.name());
            match provider.translate_batch(texts, source_lang, target_lang).await {
                Ok(results) if results.len() == texts.len() => return Ok(results),
                Ok(results) => {
                    warn!(
                        "Translator '{}' returned {} of {} texts",
                        provider.name(),
                        results.len(),
                        texts.len()
                    );
                    failures.push(format!(
                        "{}: returned {} of {} texts",
                        provider.name(),
                        results.len(),
                        texts.len()
                    ));
                }
                Err(e) => {
                    warn!("Translator '{}' failed: {}", provider.name(), e);
                    failures.push(format!("{}: {}", provider.name(), e));
                }
            }
        }

        Err(AutodubError::Translation(format!(
            "All providers failed ({})",
            failures.join("; ")
        )))
    }

    /// Languages of the primary provider.
    fn supported_languages(&self) -> &[&str] {
        self.providers
            .first()
            .map(|p| p.supported_languages())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, Option<&'static str>);

    #[async_trait]
    impl Translator for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        async fn translate_batch(&self, texts: &[&str], _: &str, _: &str) -> Result<Vec<String>> {
            match self.1 {
                Some(prefix) => Ok(texts.iter().map(|t| format!("{prefix}{t}")).collect()),
                None => Err(AutodubError::Api("down".to_string())),
            }
        }

        fn supported_languages(&self) -> &[&str] {
            &["en", "es"]
        }
    }

    #[tokio::test]
    async fn test_falls_through_to_next_provider() {
        let chain = TranslatorChain::new()
            .with(Box::new(Fixed("broken", None)))
            .with(Box::new(Fixed("backup", Some("es:"))));
        let out = chain.translate("hello", "en", "es").await.unwrap();
        assert_eq!(out, "es:hello");
    }

    #[tokio::test]
    async fn test_all_failures_are_reported() {
        let chain = TranslatorChain::new()
            .with(Box::new(Fixed("first", None)))
            .with(Box::new(Fixed("second", None)));
        let err = chain.translate_batch(&["a"], "en", "es").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("first"));
        assert!(message.contains("second"));
    }

    #[tokio::test]
    async fn test_empty_chain_errors() {
        let chain = TranslatorChain::default();
        assert!(chain.is_empty());
        assert!(chain.translate("a", "en", "es").await.is_err());
    }
}
