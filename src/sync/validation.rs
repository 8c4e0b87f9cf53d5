use crate::config::FrameThresholds;
use crate::error::{AutodubError, Result};
use crate::lipsync::LipSyncReference;
use crate::transcribe::AlignmentReference;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncQuality {
    Poor,
    Fair,
    Good,
    VeryGood,
    Excellent,
}

impl fmt::Display for SyncQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncQuality::Poor => "poor",
            SyncQuality::Fair => "fair",
            SyncQuality::Good => "good",
            SyncQuality::VeryGood => "very good",
            SyncQuality::Excellent => "excellent",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentStrategy {
    None,
    FineTuning,
    ModerateCorrection,
    MajorCorrection,
    LipSyncGuided,
    PhonemeGuided,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameLevelValidation {
    pub video_duration: f64,
    pub audio_duration: f64,
    pub fps: f64,
    /// Duration mismatch in frames.
    pub frame_accuracy: f64,
    pub sync_quality: SyncQuality,
    pub requires_adjustment: bool,
    pub strategy: AdjustmentStrategy,
}

impl FrameLevelValidation {
    /// Signed audio-minus-video gap in seconds.
    pub fn gap(&self) -> f64 {
        self.audio_duration - self.video_duration
    }
}

pub fn validate(
    video_duration: f64,
    audio_duration: f64,
    fps: f64,
    lip_sync: Option<&LipSyncReference>,
    alignment: Option<&AlignmentReference>,
) -> Result<FrameLevelValidation> {
    validate_with(
        video_duration,
        audio_duration,
        fps,
        lip_sync,
        alignment,
        &FrameThresholds::default(),
    )
}

/// Classify an audio/video duration mismatch in frames, then let auxiliary
/// evidence improve the grade. Lip-sync and alignment data can only raise
/// the quality, never lower it.
pub fn validate_with(
    video_duration: f64,
    audio_duration: f64,
    fps: f64,
    lip_sync: Option<&LipSyncReference>,
    alignment: Option<&AlignmentReference>,
    thresholds: &FrameThresholds,
) -> Result<FrameLevelValidation> {
    if !(fps.is_finite() && fps > 0.0) {
        return Err(AutodubError::InvalidInput(format!(
            "Frame rate must be positive, got {}",
            fps
        )));
    }
    for (label, d) in [("video", video_duration), ("audio", audio_duration)] {
        if !(d.is_finite() && d >= 0.0) {
            return Err(AutodubError::InvalidInput(format!(
                "{} duration must be non-negative, got {}",
                label, d
            )));
        }
    }

    let gap = (video_duration - audio_duration).abs();
    let frame_accuracy = gap * fps;

    let (mut quality, mut strategy, mut requires_adjustment) =
        if frame_accuracy > thresholds.poor_above {
            (SyncQuality::Poor, AdjustmentStrategy::MajorCorrection, true)
        } else if frame_accuracy > thresholds.fair_above {
            (SyncQuality::Fair, AdjustmentStrategy::ModerateCorrection, true)
        } else if frame_accuracy > thresholds.good_above {
            (
                SyncQuality::Good,
                AdjustmentStrategy::FineTuning,
                gap > thresholds.fine_tuning_min_gap,
            )
        } else {
            (SyncQuality::Excellent, AdjustmentStrategy::None, false)
        };

    if quality == SyncQuality::Fair
        && lip_sync.is_some_and(|l| {
            !l.is_empty() && l.confidence_level >= thresholds.lip_sync_upgrade_confidence
        })
    {
        quality = SyncQuality::Good;
        strategy = AdjustmentStrategy::LipSyncGuided;
        requires_adjustment = true;
    }

    if quality == SyncQuality::Good && alignment.is_some_and(|a| a.lip_sync_enabled && !a.words.is_empty())
    {
        quality = SyncQuality::VeryGood;
        strategy = AdjustmentStrategy::PhonemeGuided;
    }

    debug!(
        "Video {:.3}s vs audio {:.3}s at {} fps: {:.2} frames, {}",
        video_duration, audio_duration, fps, frame_accuracy, quality
    );

    Ok(FrameLevelValidation {
        video_duration,
        audio_duration,
        fps,
        frame_accuracy,
        sync_quality: quality,
        requires_adjustment,
        strategy,
    })
}
