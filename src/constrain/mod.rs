//! Fit translated text into the time window of the speech it replaces.
//!
//! The constrainer compares the estimated speaking time of a translation to
//! its target window and, when the two are too far apart, shortens the text
//! (dropping filler words or whole low-importance sentences) or lengthens it
//! (discourse fillers, pauses, an emphasis adverb). It never fails: anything
//! that goes wrong yields the untouched translation with a low score.

pub mod expand;
pub mod phrases;
pub mod shorten;
pub mod tagger;

use crate::config::ConstraintPolicy;
use crate::error::{AutodubError, Result};
use crate::speech::estimate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Adjustment {
    None,
    Shortened,
    Expanded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationConstraintResult {
    pub text: String,
    /// Estimated speaking time of `text`.
    pub duration: f64,
    pub adjustment: Adjustment,
    /// Target duration over the estimate of the returned text.
    pub ratio: f64,
    /// Target duration over the estimate of the input translation.
    pub original_ratio: f64,
    pub quality_score: f64,
    pub precision: Precision,
    /// Set when constraining failed and the input was returned as-is.
    #[serde(default)]
    pub degraded: bool,
}

impl DurationConstraintResult {
    pub fn is_accepted(&self, policy: &ConstraintPolicy) -> bool {
        self.ratio >= policy.accept_low && self.ratio <= policy.accept_high
    }
}

/// Constrain with the default thresholds.
pub fn constrain(
    original_text: &str,
    translated_text: &str,
    target_duration: f64,
    language: &str,
) -> DurationConstraintResult {
    constrain_with_policy(
        original_text,
        translated_text,
        target_duration,
        language,
        &ConstraintPolicy::default(),
    )
}

pub fn constrain_with_policy(
    original_text: &str,
    translated_text: &str,
    target_duration: f64,
    language: &str,
    policy: &ConstraintPolicy,
) -> DurationConstraintResult {
    match try_constrain(original_text, translated_text, target_duration, language, policy) {
        Ok(result) => result,
        Err(e) => {
            warn!("Keeping translation unmodified: {}", e);
            degraded(translated_text, target_duration, language, policy)
        }
    }
}

fn try_constrain(
    original_text: &str,
    translated_text: &str,
    target: f64,
    language: &str,
    policy: &ConstraintPolicy,
) -> Result<DurationConstraintResult> {
    if !target.is_finite() || target <= 0.0 {
        return Err(AutodubError::InvalidInput(format!(
            "Target duration must be positive, got {}",
            target
        )));
    }
    if translated_text.trim().is_empty() {
        return Err(AutodubError::InvalidInput(
            "Translation is empty".to_string(),
        ));
    }

    let estimated = estimate(translated_text, language);
    let ratio = target / estimated;
    debug!(
        "Constraining {:?} -> {:?}: target {:.2}s, estimate {:.2}s, ratio {:.2}",
        original_text, translated_text, target, estimated, ratio
    );

    if ratio >= policy.accept_low && ratio <= policy.accept_high {
        return Ok(unchanged(translated_text, estimated, ratio, 100.0, policy));
    }

    let (text, adjustment) = if ratio < policy.shorten_below {
        (
            shorten::shorten(translated_text, target, language, policy),
            Adjustment::Shortened,
        )
    } else if ratio > policy.expand_above {
        (
            expand::expand(translated_text, target, language, policy),
            Adjustment::Expanded,
        )
    } else {
        return Ok(unchanged(
            translated_text,
            estimated,
            ratio,
            graded_score(ratio),
            policy,
        ));
    };

    if text == translated_text {
        return Ok(unchanged(
            translated_text,
            estimated,
            ratio,
            graded_score(ratio),
            policy,
        ));
    }

    let duration = estimate(&text, language);
    let final_ratio = target / duration;
    let penalty = match adjustment {
        Adjustment::Shortened => policy.shorten_penalty,
        Adjustment::Expanded => policy.expand_penalty,
        Adjustment::None => 0.0,
    };
    let mut score = policy.base_score - penalty;
    if (final_ratio - 1.0).abs() <= policy.bonus_tolerance {
        score += policy.precision_bonus;
    }

    debug!(
        "{:?}: ratio {:.2} -> {:.2}, score {:.0}",
        adjustment, ratio, final_ratio, score
    );

    Ok(DurationConstraintResult {
        text,
        duration,
        adjustment,
        ratio: final_ratio,
        original_ratio: ratio,
        quality_score: score.clamp(0.0, 100.0),
        precision: precision(final_ratio, policy),
        degraded: false,
    })
}

fn unchanged(
    text: &str,
    estimated: f64,
    ratio: f64,
    score: f64,
    policy: &ConstraintPolicy,
) -> DurationConstraintResult {
    DurationConstraintResult {
        text: text.to_string(),
        duration: estimated,
        adjustment: Adjustment::None,
        ratio,
        original_ratio: ratio,
        quality_score: score.clamp(0.0, 100.0),
        precision: precision(ratio, policy),
        degraded: false,
    }
}

fn degraded(
    text: &str,
    target: f64,
    language: &str,
    policy: &ConstraintPolicy,
) -> DurationConstraintResult {
    let estimated = estimate(text, language);
    let ratio = if target.is_finite() && target > 0.0 {
        target / estimated
    } else {
        0.0
    };
    DurationConstraintResult {
        text: text.to_string(),
        duration: estimated,
        adjustment: Adjustment::None,
        ratio,
        original_ratio: ratio,
        quality_score: policy.degraded_score.clamp(0.0, 100.0),
        precision: Precision::Medium,
        degraded: true,
    }
}

/// Score for a ratio between the acceptance band and the rewrite
/// thresholds: one point lost per percent of mismatch.
fn graded_score(ratio: f64) -> f64 {
    (100.0 - (1.0 - ratio).abs() * 100.0).clamp(0.0, 100.0)
}

fn precision(ratio: f64, policy: &ConstraintPolicy) -> Precision {
    if (ratio - 1.0).abs() <= policy.high_precision_tolerance {
        Precision::High
    } else {
        Precision::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::word_count;

    const TWENTY_WORDS: &str = "the old captain carefully guided his small wooden boat \
        through the dark stormy waters toward the distant harbor lights before dawn finally came";

    #[test]
    fn test_accepts_own_estimate() {
        let text = "The committee will publish its findings next week.";
        let result = constrain(text, text, estimate(text, "en"), "en");
        assert_eq!(result.adjustment, Adjustment::None);
        assert!(result.ratio >= 0.9 && result.ratio <= 1.1);
        assert_eq!(result.quality_score, 100.0);
        assert_eq!(result.precision, Precision::High);
        assert_eq!(result.text, text);
    }

    #[test]
    fn test_shortens_twenty_words_to_ten_word_budget() {
        assert_eq!(word_count(TWENTY_WORDS), 20);
        let ten: Vec<&str> = TWENTY_WORDS.split_whitespace().take(10).collect();
        let target = estimate(&ten.join(" "), "en");

        let result = constrain("", TWENTY_WORDS, target, "en");
        assert_eq!(result.adjustment, Adjustment::Shortened);
        assert!(word_count(&result.text) <= 11, "{}", result.text);
        assert!(result.text.ends_with(shorten::ELLIPSIS));
        assert!(result.quality_score <= 100.0 && result.quality_score >= 0.0);
    }

    #[test]
    fn test_small_gap_is_not_expanded() {
        let text = "Hi.";
        let target = estimate(text, "en") + 0.3;
        let result = constrain("Hola.", text, target, "en");
        assert!(result.original_ratio > 1.3);
        assert_eq!(result.text, text);
        assert_eq!(result.adjustment, Adjustment::None);
    }

    #[test]
    fn test_expands_short_translation() {
        let text = "We start now. Everyone is here. The doors are closed.";
        let target = estimate(text, "en") * 1.6;
        let result = constrain("", text, target, "en");
        assert_eq!(result.adjustment, Adjustment::Expanded);
        assert!(result.duration > estimate(text, "en"));
        assert!(result.ratio < result.original_ratio);
    }

    #[test]
    fn test_middle_band_is_graded() {
        let text = "The committee will publish its findings next week.";
        let target = estimate(text, "en") * 0.8;
        let result = constrain("", text, target, "en");
        assert_eq!(result.adjustment, Adjustment::None);
        assert!((result.quality_score - 80.0).abs() < 1e-6);
        assert_eq!(result.precision, Precision::Medium);
    }

    #[test]
    fn test_idempotent_once_accepted() {
        let text = "The committee will publish its findings next week.";
        let target = estimate(text, "en") * 1.05;
        let first = constrain("", text, target, "en");
        let second = constrain("", &first.text, target, "en");
        assert_eq!(second.adjustment, Adjustment::None);
        assert_eq!(second.text, first.text);
    }

    #[test]
    fn test_invalid_target_degrades() {
        let policy = ConstraintPolicy::default();
        let result = constrain_with_policy("", "Some text.", -1.0, "en", &policy);
        assert!(result.degraded);
        assert_eq!(result.text, "Some text.");
        assert_eq!(result.quality_score, policy.degraded_score);

        let empty = constrain("", "   ", 2.0, "en");
        assert!(empty.degraded);
    }

    #[test]
    fn test_score_always_in_range() {
        for factor in [0.1, 0.3, 0.6, 0.8, 1.0, 1.2, 1.5, 3.0, 10.0] {
            let target = estimate(TWENTY_WORDS, "en") * factor;
            let result = constrain("", TWENTY_WORDS, target, "en");
            assert!((0.0..=100.0).contains(&result.quality_score));
        }
    }
}
