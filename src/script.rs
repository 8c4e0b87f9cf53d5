//! Turn a source transcript into a dubbing script: translated lines sized to
//! the time windows of the speech they replace.

use crate::config::ConstraintPolicy;
use crate::constrain::{constrain_with_policy, DurationConstraintResult};
use crate::error::{AutodubError, Result};
use crate::speech::word_count;
use crate::transcribe::TranscriptSegment;
use crate::translate::Translator;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedSegment {
    pub text: String,
    pub original_text: String,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    pub word_count: usize,
}

impl TranslatedSegment {
    pub fn new(source: &TranscriptSegment, translation: impl Into<String>) -> Self {
        let text = translation.into();
        Self {
            word_count: word_count(&text),
            original_text: source.text.clone(),
            start: source.start,
            end: source.end,
            duration: source.end - source.start,
            text,
        }
    }

    /// Fit `text` to this segment's window, updating text and word count.
    pub fn constrain_in_place(
        &mut self,
        language: &str,
        policy: &ConstraintPolicy,
    ) -> DurationConstraintResult {
        let result =
            constrain_with_policy(&self.original_text, &self.text, self.duration, language, policy);
        if result.text != self.text {
            self.text = result.text.clone();
            self.word_count = word_count(&self.text);
        }
        result
    }
}

/// Translate every segment in one batch and constrain each translation to
/// its source window.
pub async fn prepare_script(
    segments: &[TranscriptSegment],
    translator: &dyn Translator,
    source_lang: &str,
    target_lang: &str,
    policy: &ConstraintPolicy,
) -> Result<Vec<(TranslatedSegment, DurationConstraintResult)>> {
    for segment in segments {
        segment.validate()?;
    }
    if segments.is_empty() {
        return Ok(Vec::new());
    }

    info!(
        "Translating {} segments {} -> {} with {}",
        segments.len(),
        source_lang,
        target_lang,
        translator.name()
    );
    let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
    let translations = translator
        .translate_batch(&texts, source_lang, target_lang)
        .await?;

    if translations.len() < segments.len() {
        return Err(AutodubError::Translation(format!(
            "{} returned {} translations for {} segments",
            translator.name(),
            translations.len(),
            segments.len()
        )));
    }

    let script = segments
        .iter()
        .zip(translations)
        .map(|(source, translation)| {
            let mut segment = TranslatedSegment::new(source, translation);
            let result = segment.constrain_in_place(target_lang, policy);
            debug!(
                "[{:.2}-{:.2}] {:?} score {:.0}",
                segment.start, segment.end, result.adjustment, result.quality_score
            );
            (segment, result)
        })
        .collect();

    Ok(script)
}

/// Concatenate a script into the full text handed to speech synthesis and
/// caption allocation.
pub fn full_text(script: &[TranslatedSegment]) -> String {
    script
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
