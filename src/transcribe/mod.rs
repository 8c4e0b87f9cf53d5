//! Transcription collaborator: source of transcript segments and of the
//! word-level alignment that caption timing depends on.

use crate::error::{AutodubError, Result};
use crate::media::AudioHandle;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl WordTiming {
    pub fn new(word: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            word: word.into(),
            start,
            end,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<WordTiming>>,
}

impl TranscriptSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            words: None,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.start.is_finite() && self.end.is_finite()) || self.start >= self.end {
            return Err(AutodubError::InvalidInput(format!(
                "Segment [{}, {}] must have start < end",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    pub segments: Vec<TranscriptSegment>,
    pub language: Option<String>,
}

impl Transcript {
    /// All word timings in segment order.
    pub fn words(&self) -> Vec<WordTiming> {
        self.segments
            .iter()
            .filter_map(|s| s.words.as_ref())
            .flatten()
            .cloned()
            .collect()
    }
}

/// Word-level alignment of the dubbed audio.
///
/// `words` are the timings measured on the audio being synchronised;
/// `reference_words`, when present, are where the same words should land
/// (usually the source speaker's timings). `lip_sync_enabled` marks
/// alignment produced with mouth-movement evidence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlignmentReference {
    pub words: Vec<WordTiming>,
    #[serde(default)]
    pub reference_words: Option<Vec<WordTiming>>,
    #[serde(default)]
    pub lip_sync_enabled: bool,
}

impl AlignmentReference {
    pub fn new(words: Vec<WordTiming>) -> Self {
        Self {
            words,
            reference_words: None,
            lip_sync_enabled: false,
        }
    }

    pub fn from_transcript(transcript: &Transcript) -> Self {
        Self::new(transcript.words())
    }

    pub fn with_reference(mut self, reference: Vec<WordTiming>) -> Self {
        self.reference_words = Some(reference);
        self
    }

    pub fn with_lip_sync(mut self, enabled: bool) -> Self {
        self.lip_sync_enabled = enabled;
        self
    }

    /// Reference timings usable one-to-one against `words`.
    pub fn matched_reference(&self) -> Option<&[WordTiming]> {
        self.reference_words
            .as_deref()
            .filter(|r| r.len() == self.words.len() && check_words(r).is_ok())
    }

    /// Alignment must be non-empty, finite and in chronological order.
    pub fn validate(&self) -> Result<()> {
        if self.words.is_empty() {
            return Err(AutodubError::Alignment(
                "No word-level timings available".to_string(),
            ));
        }
        check_words(&self.words)
    }
}

fn check_words(words: &[WordTiming]) -> Result<()> {
    let mut previous_start = f64::NEG_INFINITY;
    for (i, w) in words.iter().enumerate() {
        if !(w.start.is_finite() && w.end.is_finite()) || w.start < 0.0 || w.end < w.start {
            return Err(AutodubError::Alignment(format!(
                "Word {} '{}' has invalid timing [{}, {}]",
                i, w.word, w.start, w.end
            )));
        }
        if w.start < previous_start {
            return Err(AutodubError::Alignment(format!(
                "Word {} '{}' starts before the previous word",
                i, w.word
            )));
        }
        previous_start = w.start;
    }
    Ok(())
}

/// Speech-to-text backend. In this crate it serves as the aligner that
/// measures word timings on dubbed audio when the caller supplies none.
#[async_trait]
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &str;
    async fn transcribe(&self, audio: &AudioHandle, language: &str) -> Result<Transcript>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words() -> Vec<WordTiming> {
        vec![
            WordTiming::new("hello", 0.0, 0.4),
            WordTiming::new("there", 0.5, 0.9),
        ]
    }

    #[test]
    fn test_segment_validation() {
        assert!(TranscriptSegment::new(0.0, 1.0, "ok").validate().is_ok());
        assert!(TranscriptSegment::new(1.0, 1.0, "zero").validate().is_err());
        assert!(TranscriptSegment::new(2.0, 1.0, "reversed").validate().is_err());
    }

    #[test]
    fn test_empty_alignment_is_rejected() {
        let err = AlignmentReference::default().validate().unwrap_err();
        assert!(matches!(err, AutodubError::Alignment(_)));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_out_of_order_alignment_is_rejected() {
        let mut w = words();
        w.swap(0, 1);
        assert!(AlignmentReference::new(w).validate().is_err());
        assert!(AlignmentReference::new(words()).validate().is_ok());
    }

    #[test]
    fn test_matched_reference_requires_same_length() {
        let alignment = AlignmentReference::new(words()).with_reference(vec![WordTiming::new(
            "hola", 0.0, 0.5,
        )]);
        assert!(alignment.matched_reference().is_none());

        let alignment = AlignmentReference::new(words()).with_reference(words());
        assert_eq!(alignment.matched_reference().map(|r| r.len()), Some(2));
    }

    #[test]
    fn test_transcript_words_flatten() {
        let mut first = TranscriptSegment::new(0.0, 1.0, "hello there");
        first.words = Some(words());
        let second = TranscriptSegment::new(1.0, 2.0, "no words");
        let transcript = Transcript {
            segments: vec![first, second],
            language: Some("en".to_string()),
        };
        assert_eq!(transcript.words().len(), 2);
    }
}
