use crate::config::QualityPolicy;
use crate::lipsync::LipSyncReference;
use crate::media::{AudioHandle, AudioSignalProbe, TimeSeries, VideoHandle, VisualSignalProbe};
use crate::transcribe::AlignmentReference;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::correlation::{best_offset, correlation_at};
use super::validation::SyncQuality;

/// Mouth-open intensity above which a lip sample counts as speaking.
const MOUTH_OPEN: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionMethod {
    NeuralOnly,
    PhonemeGuided,
    LipSyncGuided,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncCorrection {
    pub method: CorrectionMethod,
    /// Positive when the audio trails the picture.
    pub offset_seconds: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncQualityReport {
    pub neural_score: f64,
    pub phoneme_score: Option<f64>,
    pub lip_sync_score: Option<f64>,
    pub overall_quality: SyncQuality,
    pub confidence: f64,
    pub offset: f64,
    /// True when the neural score came from the duration-only fallback.
    pub fallback: bool,
    pub requires_correction: bool,
    pub recommended_correction: Option<SyncCorrection>,
    pub degradations: Vec<String>,
}

/// Grades how well a finished audio track lines up with the picture.
///
/// Scoring never fails: a probe that errors is replaced by a low-confidence
/// default and the reason is listed in `degradations`.
pub struct SyncQualityValidator<'a> {
    audio_probe: Option<&'a dyn AudioSignalProbe>,
    visual_probe: Option<&'a dyn VisualSignalProbe>,
    policy: &'a QualityPolicy,
}

struct NeuralScore {
    score: f64,
    confidence: f64,
    offset: f64,
    fallback: bool,
}

impl<'a> SyncQualityValidator<'a> {
    pub fn new(policy: &'a QualityPolicy) -> Self {
        Self {
            audio_probe: None,
            visual_probe: None,
            policy,
        }
    }

    pub fn with_audio_probe(mut self, probe: &'a dyn AudioSignalProbe) -> Self {
        self.audio_probe = Some(probe);
        self
    }

    pub fn with_visual_probe(mut self, probe: &'a dyn VisualSignalProbe) -> Self {
        self.visual_probe = Some(probe);
        self
    }

    pub async fn validate(
        &self,
        video: &VideoHandle,
        audio: &AudioHandle,
        lip_sync: Option<&LipSyncReference>,
        alignment: Option<&AlignmentReference>,
    ) -> SyncQualityReport {
        let mut degradations = Vec::new();
        let resolution = self.policy.resolution;

        let voice = match self.audio_probe {
            Some(probe) => match probe.voice_activity(audio, resolution).await {
                Ok(series) if !series.is_empty() => Some(series),
                Ok(_) => {
                    degradations.push("voice activity series is empty".to_string());
                    None
                }
                Err(e) => {
                    degradations.push(format!("voice activity unavailable: {}", e));
                    None
                }
            },
            None => None,
        };

        let lip = lip_sync.filter(|l| !l.is_empty());
        let neural = self
            .neural_score(video, audio, voice.as_ref(), lip, &mut degradations)
            .await;
        let phoneme_score = alignment.and_then(|a| self.phoneme_score(a, audio, &mut degradations));
        let lip_sync_score = lip.and_then(|l| {
            let score = lip_agreement(l, voice.as_ref()?, audio.duration);
            if score.is_none() {
                degradations.push("lip-sync and voice series do not overlap".to_string());
            }
            score
        });

        let scores: Vec<f64> = std::iter::once(neural.score)
            .chain(phoneme_score)
            .chain(lip_sync_score)
            .collect();
        let confidences: Vec<f64> = std::iter::once(neural.confidence)
            .chain(phoneme_score)
            .chain(lip_sync_score)
            .collect();
        let overall_quality = grade_score(mean(&scores));
        let confidence = mean(&confidences);

        let requires_correction = overall_quality == SyncQuality::Poor
            || (confidence < self.policy.min_confidence && neural.offset.abs() > self.policy.max_offset)
            || lip_sync_score.is_some_and(|s| s < self.policy.min_lip_accuracy);

        let recommended_correction = requires_correction.then(|| {
            let (method, confidence) = [
                (CorrectionMethod::NeuralOnly, Some(neural.confidence)),
                (CorrectionMethod::PhonemeGuided, phoneme_score),
                (CorrectionMethod::LipSyncGuided, lip_sync_score),
            ]
            .into_iter()
            .filter_map(|(m, c)| c.map(|c| (m, c)))
            .fold((CorrectionMethod::NeuralOnly, f64::MIN), |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            });
            SyncCorrection {
                method,
                offset_seconds: neural.offset,
                confidence,
            }
        });

        for d in &degradations {
            warn!("Sync quality: {}", d);
        }
        debug!(
            "Sync quality {} (neural {:.2}, phoneme {:?}, lip {:?}, offset {:+.2}s)",
            overall_quality, neural.score, phoneme_score, lip_sync_score, neural.offset
        );

        SyncQualityReport {
            neural_score: neural.score,
            phoneme_score,
            lip_sync_score,
            overall_quality,
            confidence,
            offset: neural.offset,
            fallback: neural.fallback,
            requires_correction,
            recommended_correction,
            degradations,
        }
    }

    async fn neural_score(
        &self,
        video: &VideoHandle,
        audio: &AudioHandle,
        voice: Option<&TimeSeries>,
        lip: Option<&LipSyncReference>,
        degradations: &mut Vec<String>,
    ) -> NeuralScore {
        let resolution = self.policy.resolution;
        let Some(voice) = voice else {
            return self.duration_fallback(video, audio);
        };

        let visual = match self.visual_probe {
            Some(probe) => match probe.motion(video, resolution).await {
                Ok(series) if !series.is_empty() => Some(series),
                Ok(_) => None,
                Err(e) => {
                    degradations.push(format!("visual motion unavailable: {}", e));
                    None
                }
            },
            None => None,
        };
        let visual = visual.or_else(|| lip.map(|l| l.intensity_series(video.duration, resolution)));
        let Some(visual) = visual else {
            return self.duration_fallback(video, audio);
        };

        let Some(found) = best_offset(&visual, voice, self.policy.search_window) else {
            degradations.push("no usable correlation between voice and picture".to_string());
            return self.duration_fallback(video, audio);
        };

        let secondary = match self.audio_probe {
            Some(probe) => probe
                .energy(audio, resolution)
                .await
                .ok()
                .and_then(|energy| correlation_at(&visual, &energy, found.offset)),
            None => None,
        };
        let primary = found.correlation.abs();
        let confidence = match secondary {
            Some(s) => {
                self.policy.primary_weight * primary + (1.0 - self.policy.primary_weight) * s.abs()
            }
            None => primary,
        }
        .clamp(0.0, 1.0);

        NeuralScore {
            score: confidence,
            confidence,
            offset: found.offset,
            fallback: false,
        }
    }

    /// Accuracy from the duration delta alone, at a fixed low confidence.
    fn duration_fallback(&self, video: &VideoHandle, audio: &AudioHandle) -> NeuralScore {
        let gap = (video.duration - audio.duration).abs();
        let accuracy = if self.policy.fallback_zero_gap > 0.0 {
            (1.0 - gap / self.policy.fallback_zero_gap).clamp(0.0, 1.0)
        } else if gap == 0.0 {
            1.0
        } else {
            0.0
        };
        NeuralScore {
            score: accuracy,
            confidence: self.policy.fallback_confidence,
            offset: 0.0,
            fallback: true,
        }
    }

    /// Word timing agreement with the source speech when both timelines are
    /// known, otherwise the share of words that land inside the audio.
    fn phoneme_score(
        &self,
        alignment: &AlignmentReference,
        audio: &AudioHandle,
        degradations: &mut Vec<String>,
    ) -> Option<f64> {
        if let Err(e) = alignment.validate() {
            degradations.push(format!("phoneme score skipped: {}", e));
            return None;
        }
        let words = &alignment.words;

        if let Some(reference) = alignment.matched_reference() {
            let tolerance = self.policy.fallback_zero_gap.max(f64::EPSILON);
            let agreement: Vec<f64> = words
                .iter()
                .zip(reference)
                .map(|(w, r)| (1.0 - (w.start - r.start).abs() / tolerance).max(0.0))
                .collect();
            return Some(mean(&agreement));
        }

        let limit = audio.duration + self.policy.resolution;
        let inside = words.iter().filter(|w| w.end <= limit).count();
        Some(inside as f64 / words.len() as f64)
    }
}

/// Share of time steps where mouth movement and voice activity agree.
fn lip_agreement(lip: &LipSyncReference, voice: &TimeSeries, duration: f64) -> Option<f64> {
    let mouth = lip.intensity_series(duration, voice.resolution);
    let n = mouth.len().min(voice.len());
    if n == 0 {
        return None;
    }
    let agree = mouth.values[..n]
        .iter()
        .zip(&voice.values[..n])
        .filter(|(m, v)| (**m >= MOUTH_OPEN) == (**v > 0.5))
        .count();
    Some(agree as f64 / n as f64)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Map a score in [0, 1] onto the quality ladder.
pub fn grade_score(score: f64) -> SyncQuality {
    if score >= 0.9 {
        SyncQuality::Excellent
    } else if score >= 0.8 {
        SyncQuality::VeryGood
    } else if score >= 0.7 {
        SyncQuality::Good
    } else if score >= 0.5 {
        SyncQuality::Fair
    } else {
        SyncQuality::Poor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AutodubError, Result};
    use crate::lipsync::SyncPoint;
    use crate::transcribe::WordTiming;
    use async_trait::async_trait;

    fn pulse(len: usize, at: &[usize]) -> Vec<f64> {
        (0..len).map(|i| if at.contains(&i) { 1.0 } else { 0.0 }).collect()
    }

    struct FixedAudio {
        voice: Vec<f64>,
    }

    #[async_trait]
    impl AudioSignalProbe for FixedAudio {
        async fn voice_activity(&self, _audio: &AudioHandle, resolution: f64) -> Result<TimeSeries> {
            Ok(TimeSeries::new(resolution, self.voice.clone()))
        }

        async fn energy(&self, _audio: &AudioHandle, resolution: f64) -> Result<TimeSeries> {
            Ok(TimeSeries::new(resolution, self.voice.clone()))
        }
    }

    struct FixedVisual {
        motion: Vec<f64>,
    }

    #[async_trait]
    impl VisualSignalProbe for FixedVisual {
        async fn motion(&self, _video: &VideoHandle, resolution: f64) -> Result<TimeSeries> {
            Ok(TimeSeries::new(resolution, self.motion.clone()))
        }
    }

    struct BrokenVisual;

    #[async_trait]
    impl VisualSignalProbe for BrokenVisual {
        async fn motion(&self, _video: &VideoHandle, _resolution: f64) -> Result<TimeSeries> {
            Err(AutodubError::Signal("decoder crashed".to_string()))
        }
    }

    fn handles(video: f64, audio: f64) -> (VideoHandle, AudioHandle) {
        (
            VideoHandle::new("/tmp/v.mp4", video, 25.0),
            AudioHandle::new("/tmp/a.wav", audio),
        )
    }

    #[tokio::test]
    async fn test_duration_fallback_without_signals() {
        let policy = QualityPolicy::default();
        let validator = SyncQualityValidator::new(&policy);
        let (video, audio) = handles(10.0, 10.25);

        let report = validator.validate(&video, &audio, None, None).await;
        assert!(report.fallback);
        assert!((report.neural_score - 0.5).abs() < 1e-9);
        assert!((report.confidence - 0.3).abs() < 1e-9);
        assert_eq!(report.overall_quality, SyncQuality::Fair);
        assert!(!report.requires_correction);
    }

    #[tokio::test]
    async fn test_large_gap_fallback_is_poor_and_recommends_correction() {
        let policy = QualityPolicy::default();
        let validator = SyncQualityValidator::new(&policy);
        let (video, audio) = handles(10.0, 11.0);

        let report = validator.validate(&video, &audio, None, None).await;
        assert_eq!(report.overall_quality, SyncQuality::Poor);
        assert!(report.requires_correction);
        let correction = report.recommended_correction.unwrap();
        assert_eq!(correction.method, CorrectionMethod::NeuralOnly);
    }

    #[tokio::test]
    async fn test_correlated_signals_find_offset() {
        let policy = QualityPolicy::default();
        let audio_probe = FixedAudio {
            voice: pulse(80, &[13, 14, 33, 34, 60]),
        };
        let visual_probe = FixedVisual {
            motion: pulse(80, &[10, 11, 30, 31, 57]),
        };
        let validator = SyncQualityValidator::new(&policy)
            .with_audio_probe(&audio_probe)
            .with_visual_probe(&visual_probe);
        let (video, audio) = handles(8.0, 8.0);

        let report = validator.validate(&video, &audio, None, None).await;
        assert!(!report.fallback);
        assert!((report.offset - 0.3).abs() < 1e-9);
        assert!(report.neural_score > 0.95);
        assert_eq!(report.overall_quality, SyncQuality::Excellent);
        assert!(!report.requires_correction);
    }

    #[tokio::test]
    async fn test_signal_failure_is_degradation() {
        let policy = QualityPolicy::default();
        let audio_probe = FixedAudio {
            voice: pulse(40, &[5, 20]),
        };
        let validator = SyncQualityValidator::new(&policy)
            .with_audio_probe(&audio_probe)
            .with_visual_probe(&BrokenVisual);
        let (video, audio) = handles(4.0, 4.0);

        let report = validator.validate(&video, &audio, None, None).await;
        assert!(report.fallback);
        assert_eq!(report.degradations.len(), 1);
        assert!(report.degradations[0].contains("decoder crashed"));
    }

    #[tokio::test]
    async fn test_poor_lip_agreement_requires_correction() {
        let policy = QualityPolicy::default();
        // Voice in the second half, mouth moving in the first.
        let audio_probe = FixedAudio {
            voice: (0..20).map(|i| if i >= 10 { 1.0 } else { 0.0 }).collect(),
        };
        let lip = LipSyncReference::new(
            vec![
                SyncPoint {
                    timestamp: 0.0,
                    intensity: 0.9,
                    confidence: 0.9,
                },
                SyncPoint {
                    timestamp: 1.0,
                    intensity: 0.1,
                    confidence: 0.9,
                },
            ],
            0.9,
        );
        let validator = SyncQualityValidator::new(&policy).with_audio_probe(&audio_probe);
        let (video, audio) = handles(2.0, 2.0);

        let report = validator.validate(&video, &audio, Some(&lip), None).await;
        assert_eq!(report.lip_sync_score, Some(0.0));
        assert!(report.requires_correction);
    }

    #[tokio::test]
    async fn test_recommends_highest_confidence_method() {
        let policy = QualityPolicy::default();
        let validator = SyncQualityValidator::new(&policy);
        let (video, audio) = handles(10.0, 11.0);
        let dubbed = vec![WordTiming::new("uno", 0.0, 0.4), WordTiming::new("dos", 0.5, 0.9)];
        let source = vec![WordTiming::new("one", 0.2, 0.6), WordTiming::new("two", 0.7, 1.1)];
        let alignment = AlignmentReference::new(dubbed).with_reference(source);

        let report = validator.validate(&video, &audio, None, Some(&alignment)).await;
        assert!((report.phoneme_score.unwrap() - 0.6).abs() < 1e-9);
        assert_eq!(report.overall_quality, SyncQuality::Poor);
        assert!(report.requires_correction);
        assert_eq!(
            report.recommended_correction.unwrap().method,
            CorrectionMethod::PhonemeGuided
        );
    }

    #[test]
    fn test_grade_ladder() {
        assert_eq!(grade_score(0.95), SyncQuality::Excellent);
        assert_eq!(grade_score(0.85), SyncQuality::VeryGood);
        assert_eq!(grade_score(0.7), SyncQuality::Good);
        assert_eq!(grade_score(0.5), SyncQuality::Fair);
        assert_eq!(grade_score(0.1), SyncQuality::Poor);
    }
}
