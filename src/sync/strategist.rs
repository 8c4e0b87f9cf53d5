//! Choose and apply audio time adjustments.
//!
//! A correction is first planned as a [`CorrectionPlan`], a pure value that
//! can be inspected and tested, then lowered to a [`FilterGraph`] and handed
//! to the render collaborator. Rendering failures never propagate: the
//! caller gets the untouched input handle back together with the cause.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::CorrectionPolicy;
use crate::error::{AutodubError, Result};
use crate::lipsync::LipSyncReference;
use crate::media::{AudioHandle, MediaRenderer};
use crate::transcribe::{AlignmentReference, WordTiming};

use super::filter::{FilterGraph, FilterOp};
use super::quality::{CorrectionMethod, SyncCorrection};
use super::validation::AdjustmentStrategy;

/// A window of the input audio and the tempo that fits it to its target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TempoWindow {
    pub start: f64,
    pub end: f64,
    /// Duration the window should occupy after correction.
    pub target: f64,
    pub tempo: f64,
}

impl TempoWindow {
    /// Length the window renders to at its clamped tempo.
    pub fn output_length(&self) -> f64 {
        (self.end - self.start) / effective_tempo(self.tempo)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameTier {
    /// Under a tenth of a frame: pad or trim only.
    SubFrame,
    /// Under one frame: tempo within ±1%.
    Micro,
    Scaled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CorrectionPlan {
    PhonemeGuided { windows: Vec<TempoWindow> },
    LipSyncGuided { windows: Vec<TempoWindow> },
    FrameTiered { tier: FrameTier, tempo: f64 },
    /// Shift the audio by a measured offset; positive trims the start.
    Offset { seconds: f64 },
}

impl CorrectionPlan {
    pub fn name(&self) -> &'static str {
        match self {
            CorrectionPlan::PhonemeGuided { .. } => "phoneme_guided",
            CorrectionPlan::LipSyncGuided { .. } => "lip_sync_guided",
            CorrectionPlan::FrameTiered { .. } => "frame_tiered",
            CorrectionPlan::Offset { .. } => "offset",
        }
    }

    /// Lower to an ordered filter graph ending at exactly `target` seconds.
    pub fn to_graph(&self, target: f64, fade: f64) -> FilterGraph {
        let mut graph = FilterGraph::new(target);
        match self {
            CorrectionPlan::PhonemeGuided { windows } | CorrectionPlan::LipSyncGuided { windows } => {
                for w in windows {
                    graph.push(FilterOp::Segment {
                        start: w.start,
                        end: w.end,
                        tempo: w.tempo,
                    });
                }
                graph.push(FilterOp::Concat {
                    inputs: windows.len(),
                });
            }
            CorrectionPlan::FrameTiered { tempo, .. } => {
                if (tempo - 1.0).abs() > f64::EPSILON {
                    graph.push(FilterOp::Tempo { factor: *tempo });
                }
            }
            CorrectionPlan::Offset { seconds } => {
                if *seconds > 0.0 {
                    graph.push(FilterOp::TrimStart { seconds: *seconds });
                } else if *seconds < 0.0 {
                    graph.push(FilterOp::Delay { seconds: -seconds });
                }
            }
        }
        graph.finish(fade);
        graph
    }

    /// Where input time `t` lands in the output of `to_graph(target, _)`.
    pub fn map_time(&self, t: f64, target: f64) -> f64 {
        let mapped = match self {
            CorrectionPlan::PhonemeGuided { windows } | CorrectionPlan::LipSyncGuided { windows } => {
                map_through_windows(windows, t)
            }
            CorrectionPlan::FrameTiered { tempo, .. } => t / effective_tempo(*tempo),
            CorrectionPlan::Offset { seconds } => t - seconds,
        };
        mapped.clamp(0.0, target.max(0.0))
    }

    /// Carry word timings through this correction so they describe the
    /// corrected audio. Reference timings are left as they are.
    pub fn remap_alignment(&self, alignment: &AlignmentReference, target: f64) -> AlignmentReference {
        let words = alignment
            .words
            .iter()
            .map(|w| {
                let start = self.map_time(w.start, target);
                let end = self.map_time(w.end, target).max(start);
                WordTiming::new(w.word.clone(), start, end)
            })
            .collect();
        AlignmentReference {
            words,
            ..alignment.clone()
        }
    }
}

fn effective_tempo(tempo: f64) -> f64 {
    if tempo.is_finite() && tempo > 0.0 {
        tempo
    } else {
        1.0
    }
}

fn map_through_windows(windows: &[TempoWindow], t: f64) -> f64 {
    let mut out = 0.0;
    for (i, w) in windows.iter().enumerate() {
        if t < w.end || i + 1 == windows.len() {
            return out + (t.max(w.start).min(w.end) - w.start) / effective_tempo(w.tempo);
        }
        out += w.output_length();
    }
    t
}

/// Seconds the final trim/pad must absorb once tempo limits are applied.
fn tempo_residual(windows: &[TempoWindow], target: f64) -> f64 {
    target - windows.iter().map(TempoWindow::output_length).sum::<f64>()
}

/// Evidence a guided correction may use.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuxiliaryData<'a> {
    pub alignment: Option<&'a AlignmentReference>,
    pub lip_sync: Option<&'a LipSyncReference>,
    pub fps: f64,
}

impl<'a> AuxiliaryData<'a> {
    pub fn new(
        alignment: Option<&'a AlignmentReference>,
        lip_sync: Option<&'a LipSyncReference>,
        fps: f64,
    ) -> Self {
        Self {
            alignment,
            lip_sync,
            fps,
        }
    }
}

#[derive(Debug)]
pub struct CorrectionOutcome {
    /// The corrected audio, or the untouched input when nothing was applied.
    pub audio: AudioHandle,
    pub plan: Option<CorrectionPlan>,
    pub applied: bool,
    pub error: Option<String>,
}

pub struct SyncCorrectionStrategist<'a> {
    renderer: &'a dyn MediaRenderer,
    policy: &'a CorrectionPolicy,
}

impl<'a> SyncCorrectionStrategist<'a> {
    pub fn new(renderer: &'a dyn MediaRenderer, policy: &'a CorrectionPolicy) -> Self {
        Self { renderer, policy }
    }

    /// Plan a correction of `audio_duration` to `target`. Guided strategies
    /// fall back down the order phoneme, lip sync, frame-tiered when their
    /// evidence is missing.
    pub fn plan(
        &self,
        audio_duration: f64,
        target: f64,
        strategy: AdjustmentStrategy,
        aux: &AuxiliaryData<'_>,
    ) -> CorrectionPlan {
        if strategy == AdjustmentStrategy::PhonemeGuided {
            if let Some(windows) = aux
                .alignment
                .and_then(|a| phoneme_windows(a, audio_duration, target, self.policy))
            {
                log_residual("Phoneme", &windows, target);
                return CorrectionPlan::PhonemeGuided { windows };
            }
            debug!("No usable alignment, escalating to lip-sync guidance");
        }

        if matches!(
            strategy,
            AdjustmentStrategy::PhonemeGuided | AdjustmentStrategy::LipSyncGuided
        ) {
            if let Some(windows) = aux
                .lip_sync
                .and_then(|l| lip_sync_windows(l, audio_duration, target, self.policy))
            {
                log_residual("Lip-sync", &windows, target);
                return CorrectionPlan::LipSyncGuided { windows };
            }
            debug!("No usable lip-sync data, using frame-tiered correction");
        }

        frame_tiered(audio_duration, target, aux.fps, self.policy)
    }

    /// Fit `audio` to `target` seconds using `strategy`, writing to `output`.
    pub async fn correct(
        &self,
        audio: AudioHandle,
        target: f64,
        strategy: AdjustmentStrategy,
        aux: &AuxiliaryData<'_>,
        output: &Path,
    ) -> CorrectionOutcome {
        if !(target.is_finite() && target > 0.0) {
            return unapplied(audio, None, format!("invalid target duration {target}"));
        }
        let plan = self.plan(audio.duration, target, strategy, aux);
        self.execute(audio, plan, target, output).await
    }

    /// Apply a correction recommended by the quality validator.
    pub async fn apply_sync_correction(
        &self,
        audio: AudioHandle,
        target: f64,
        correction: &SyncCorrection,
        aux: &AuxiliaryData<'_>,
        output: &Path,
    ) -> CorrectionOutcome {
        if !(target.is_finite() && target > 0.0) {
            return unapplied(audio, None, format!("invalid target duration {target}"));
        }
        let plan = match correction.method {
            CorrectionMethod::NeuralOnly => CorrectionPlan::Offset {
                seconds: correction.offset_seconds,
            },
            CorrectionMethod::PhonemeGuided => {
                self.plan(audio.duration, target, AdjustmentStrategy::PhonemeGuided, aux)
            }
            CorrectionMethod::LipSyncGuided => {
                self.plan(audio.duration, target, AdjustmentStrategy::LipSyncGuided, aux)
            }
        };
        self.execute(audio, plan, target, output).await
    }

    async fn execute(
        &self,
        audio: AudioHandle,
        plan: CorrectionPlan,
        target: f64,
        output: &Path,
    ) -> CorrectionOutcome {
        let graph = plan.to_graph(target, self.policy.fade);
        info!(
            "Applying {} correction: {:.3}s -> {:.3}s ({} operations)",
            plan.name(),
            audio.duration,
            target,
            graph.ops.len()
        );

        match self.render(&audio, &graph, output).await {
            Ok(corrected) => CorrectionOutcome {
                audio: corrected,
                plan: Some(plan),
                applied: true,
                error: None,
            },
            Err(e) => {
                warn!("{} correction failed, keeping original audio: {}", plan.name(), e);
                unapplied(audio, Some(plan), e.to_string())
            }
        }
    }

    async fn render(
        &self,
        audio: &AudioHandle,
        graph: &FilterGraph,
        output: &Path,
    ) -> Result<AudioHandle> {
        if output == audio.path {
            return Err(AutodubError::Render(
                "Correction output would overwrite its input".to_string(),
            ));
        }
        self.renderer.apply_audio_graph(audio, graph, output).await
    }
}

fn unapplied(audio: AudioHandle, plan: Option<CorrectionPlan>, error: String) -> CorrectionOutcome {
    CorrectionOutcome {
        audio,
        plan,
        applied: false,
        error: Some(error),
    }
}

fn log_residual(kind: &str, windows: &[TempoWindow], target: f64) {
    let residual = tempo_residual(windows, target);
    if residual.abs() > 1e-3 {
        debug!(
            "{} windows hit the tempo limits, {:+.3}s left for trim/pad",
            kind, residual
        );
    }
}

fn clamp_tempo(tempo: f64, min: f64, max: f64) -> f64 {
    if tempo.is_finite() {
        tempo.clamp(min, max)
    } else {
        max
    }
}

/// Window boundaries at each word start, from zero to `end`.
fn boundaries(words: &[WordTiming], end: f64) -> Vec<f64> {
    let mut points = vec![0.0];
    for w in words {
        let last = points[points.len() - 1];
        if w.start > last && w.start < end {
            points.push(w.start);
        }
    }
    points.push(end);
    points
}

fn phoneme_windows(
    alignment: &AlignmentReference,
    audio_duration: f64,
    target: f64,
    policy: &CorrectionPolicy,
) -> Option<Vec<TempoWindow>> {
    if alignment.validate().is_err() || audio_duration <= 0.0 {
        return None;
    }

    let source = boundaries(&alignment.words, audio_duration);
    let targets = alignment
        .matched_reference()
        .map(|reference| boundaries(reference, target))
        .filter(|t| t.len() == source.len());
    let scale = target / audio_duration;

    let windows = source
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let (start, end) = (pair[0], pair[1]);
            let target_len = match &targets {
                Some(t) => t[i + 1] - t[i],
                None => (end - start) * scale,
            };
            TempoWindow {
                start,
                end,
                target: target_len,
                tempo: clamp_tempo((end - start) / target_len, policy.min_tempo, policy.max_tempo),
            }
        })
        .collect::<Vec<_>>();

    (!windows.is_empty()).then_some(windows)
}

fn lip_sync_windows(
    reference: &LipSyncReference,
    audio_duration: f64,
    target: f64,
    policy: &CorrectionPolicy,
) -> Option<Vec<TempoWindow>> {
    if reference.is_empty() || audio_duration <= 0.0 {
        return None;
    }

    let count = reference
        .sync_points
        .len()
        .clamp(1, policy.max_lip_windows.max(1));
    let width = audio_duration / count as f64;
    let video_width = target / count as f64;
    let overall = reference.mean_intensity(f64::NEG_INFINITY, f64::INFINITY)?;

    // Higher mouth activity gets slightly faster delivery.
    let span = policy.lip_tempo_max - policy.lip_tempo_min;
    let raw: Vec<f64> = (0..count)
        .map(|i| {
            let from = i as f64 * video_width;
            let intensity = reference
                .mean_intensity(from, from + video_width)
                .unwrap_or(overall);
            policy.lip_tempo_min + span * intensity
        })
        .collect();

    // Scale so the windows add up to the target before clamping.
    let natural: f64 = raw.iter().map(|r| width / r).sum();
    let k = natural / target;

    let windows = raw
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let tempo = clamp_tempo(k * r, policy.lip_tempo_min, policy.lip_tempo_max);
            let start = i as f64 * width;
            let end = if i + 1 == count {
                audio_duration
            } else {
                start + width
            };
            TempoWindow {
                start,
                end,
                target: (end - start) / tempo,
                tempo,
            }
        })
        .collect();
    Some(windows)
}

fn frame_tiered(
    audio_duration: f64,
    target: f64,
    fps: f64,
    policy: &CorrectionPolicy,
) -> CorrectionPlan {
    let ratio = if audio_duration > 0.0 {
        audio_duration / target
    } else {
        1.0
    };
    let gap_frames = if fps.is_finite() && fps > 0.0 {
        (audio_duration - target).abs() * fps
    } else {
        f64::INFINITY
    };

    if gap_frames < policy.sub_frame_tier {
        CorrectionPlan::FrameTiered {
            tier: FrameTier::SubFrame,
            tempo: 1.0,
        }
    } else if gap_frames < policy.micro_tier {
        CorrectionPlan::FrameTiered {
            tier: FrameTier::Micro,
            tempo: clamp_tempo(
                ratio,
                1.0 - policy.micro_tempo_range,
                1.0 + policy.micro_tempo_range,
            ),
        }
    } else {
        CorrectionPlan::FrameTiered {
            tier: FrameTier::Scaled,
            tempo: clamp_tempo(ratio, policy.min_tempo, policy.max_tempo),
        }
    }
}
