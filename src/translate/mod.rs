//! Translation collaborators.

pub mod chain;
pub mod gemini;
pub mod quota;

pub use chain::TranslatorChain;
pub use gemini::GeminiTranslator;
pub use quota::{QuotaLimitedTranslator, QuotaTracker};

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &str;

    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        let mut results = self.translate_batch(&[text], source_lang, target_lang).await?;
        Ok(results.pop().unwrap_or_default())
    }

    /// Translate several texts at once. Implementations return exactly one
    /// entry per input, in input order.
    async fn translate_batch(
        &self,
        texts: &[&str],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Vec<String>>;

    fn supported_languages(&self) -> &[&str];
}
