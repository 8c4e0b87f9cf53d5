//! Per-job assembly: fit the dubbed audio to the picture, generate captions
//! and mux the finished video.
//!
//! Stages run strictly in order. Only missing inputs, unusable alignment
//! data and a failed final mux stop a job; every other problem is recorded
//! as a degradation in the [`QualityReport`] and the job carries on.

use crate::config::{CaptionFormat, Config};
use crate::error::{AutodubError, Result};
use crate::lipsync::LipSyncAnalyzer;
use crate::media::{AudioHandle, AudioSignalProbe, MediaRenderer, VideoHandle, VisualSignalProbe};
use crate::subtitle::{allocate, build_cues, snap_cues_to_alignment, write_captions, SubtitleEntry};
use crate::sync::{
    grade_score, validate_with, AuxiliaryData, CorrectionMethod, CorrectionOutcome, CorrectionPlan,
    FrameLevelValidation, SyncCorrection, SyncCorrectionStrategist, SyncQuality,
    SyncQualityReport, SyncQualityValidator,
};
use crate::transcribe::{AlignmentReference, Transcriber};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    LipSyncAnalysis,
    AlignmentValidation,
    DurationValidation,
    SyncAdjustment,
    NeuralValidation,
    NeuralCorrection,
    FinalLipSyncCheck,
    CaptionGeneration,
    VideoAssembly,
    FinalValidation,
}

impl Stage {
    /// Execution order.
    pub const ALL: [Stage; 10] = [
        Stage::LipSyncAnalysis,
        Stage::AlignmentValidation,
        Stage::DurationValidation,
        Stage::SyncAdjustment,
        Stage::NeuralValidation,
        Stage::NeuralCorrection,
        Stage::FinalLipSyncCheck,
        Stage::CaptionGeneration,
        Stage::VideoAssembly,
        Stage::FinalValidation,
    ];

    /// 1-based position in [`Stage::ALL`].
    pub fn number(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).map_or(0, |i| i + 1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::LipSyncAnalysis => "lip_sync_analysis",
            Stage::AlignmentValidation => "alignment_validation",
            Stage::DurationValidation => "duration_validation",
            Stage::SyncAdjustment => "sync_adjustment",
            Stage::NeuralValidation => "neural_validation",
            Stage::NeuralCorrection => "neural_correction",
            Stage::FinalLipSyncCheck => "final_lip_sync_check",
            Stage::CaptionGeneration => "caption_generation",
            Stage::VideoAssembly => "video_assembly",
            Stage::FinalValidation => "final_validation",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Stage::LipSyncAnalysis => "Analyzing lip movement",
            Stage::AlignmentValidation => "Checking word alignment",
            Stage::DurationValidation => "Measuring duration mismatch",
            Stage::SyncAdjustment => "Adjusting audio timing",
            Stage::NeuralValidation => "Scoring A/V sync",
            Stage::NeuralCorrection => "Correcting A/V offset",
            Stage::FinalLipSyncCheck => "Checking lip sync",
            Stage::CaptionGeneration => "Generating captions",
            Stage::VideoAssembly => "Assembling video",
            Stage::FinalValidation => "Validating output",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Passed,
    Corrected,
    Skipped,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub detail: String,
    pub elapsed_ms: u64,
}

/// One dubbing job: a source video, the synthesized speech for it and the
/// text that speech says.
#[derive(Debug, Clone)]
pub struct DubbingJob {
    /// Unique per run; also names the job's work directory.
    pub id: String,
    pub video: PathBuf,
    pub audio: PathBuf,
    /// Final constrained text, used for captions.
    pub text: String,
    pub language: String,
    /// Word-level alignment of `audio`. Derived with the configured aligner
    /// when absent.
    pub alignment: Option<AlignmentReference>,
    pub output: PathBuf,
}

impl DubbingJob {
    pub fn new(
        video: impl Into<PathBuf>,
        audio: impl Into<PathBuf>,
        text: impl Into<String>,
        language: impl Into<String>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            video: video.into(),
            audio: audio.into(),
            text: text.into(),
            language: language.into(),
            alignment: None,
            output: output.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_alignment(mut self, alignment: AlignmentReference) -> Self {
        self.alignment = Some(alignment);
        self
    }
}

/// Composite per-stage report attached to every finished job.
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub job_id: String,
    pub generated_at: DateTime<Utc>,
    pub output: PathBuf,
    pub captions: Option<PathBuf>,
    pub stages: Vec<StageRecord>,
    pub initial_validation: FrameLevelValidation,
    pub final_validation: Option<FrameLevelValidation>,
    pub sync: SyncQualityReport,
    pub lip_sync_quality: Option<SyncQuality>,
    pub overall_quality: SyncQuality,
    pub corrections_applied: usize,
    pub degradations: Vec<String>,
    pub elapsed_ms: u64,
}

impl QualityReport {
    pub fn outcome(&self, stage: Stage) -> Option<StageOutcome> {
        self.stages.iter().find(|r| r.stage == stage).map(|r| r.outcome)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct DubbingResult {
    pub video: VideoHandle,
    pub cues: Vec<SubtitleEntry>,
    pub report: QualityReport,
}

/// Where the report for `output` is written: `<stem>.report.json`.
pub fn report_path(output: &Path) -> PathBuf {
    output.with_extension("report.json")
}

/// Per-job work directory, removed on drop unless intermediates are kept.
struct JobWorkspace {
    dir: PathBuf,
    keep: bool,
}

impl JobWorkspace {
    fn create(root: &Path, job_id: &str, keep: bool) -> Result<Self> {
        if job_id.is_empty() || job_id == "." || job_id == ".." || job_id.contains(['/', '\\']) {
            return Err(AutodubError::InvalidInput(format!(
                "Job id '{}' cannot name a directory",
                job_id
            )));
        }
        let dir = root.join(job_id);
        fs::create_dir_all(&dir)?;
        debug!("Using job directory: {:?}", dir);
        Ok(Self { dir, keep })
    }

    fn intermediate(&self, pass: usize, stage: Stage) -> PathBuf {
        self.dir.join(format!("pass{}_{}.wav", pass, stage))
    }

    /// Delete a superseded intermediate. Inputs outside the job directory
    /// are never touched.
    fn retire(&self, previous: &Path, current: &AudioHandle) {
        if previous == current.path || !previous.starts_with(&self.dir) {
            return;
        }
        match fs::remove_file(previous) {
            Ok(()) => debug!("Removed superseded audio {:?}", previous),
            Err(e) => debug!("Could not remove {:?}: {}", previous, e),
        }
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if self.keep {
            info!("Keeping intermediates in {:?}", self.dir);
            return;
        }
        debug!("Cleaning up job directory: {:?}", self.dir);
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            warn!("Failed to clean up {:?}: {}", self.dir, e);
        }
    }
}

struct StageTimer {
    stage: Stage,
    started: Instant,
    spinner: Option<ProgressBar>,
}

#[derive(Default)]
struct StageLog {
    records: Vec<StageRecord>,
    degradations: Vec<String>,
}

impl StageLog {
    fn finish(&mut self, timer: StageTimer, outcome: StageOutcome, detail: impl Into<String>) {
        let detail = detail.into();
        match outcome {
            StageOutcome::Degraded => {
                warn!("{} degraded: {}", timer.stage, detail);
                self.degradations.push(format!("{}: {}", timer.stage, detail));
            }
            _ => debug!("{} {:?}: {}", timer.stage, outcome, detail),
        }
        if let Some(pb) = &timer.spinner {
            let mark = if outcome == StageOutcome::Degraded { "!" } else { "✓" };
            pb.finish_with_message(format!("{} {}: {}", mark, timer.stage.label(), detail));
        }
        self.records.push(StageRecord {
            stage: timer.stage,
            outcome,
            detail,
            elapsed_ms: timer.started.elapsed().as_millis() as u64,
        });
    }

    fn fail(&mut self, timer: StageTimer, error: AutodubError) -> AutodubError {
        if let Some(pb) = &timer.spinner {
            pb.abandon_with_message(format!("✗ {}: {}", timer.stage.label(), error));
        }
        AutodubError::StageFailed {
            stage: timer.stage.to_string(),
            message: error.to_string(),
        }
    }
}

/// Runs the assembly stages for one job at a time. Shareable across
/// concurrent jobs; it holds no per-job state.
pub struct AssemblyOrchestrator {
    config: Config,
    renderer: Arc<dyn MediaRenderer>,
    lip_sync: Option<Arc<dyn LipSyncAnalyzer>>,
    audio_probe: Option<Arc<dyn AudioSignalProbe>>,
    visual_probe: Option<Arc<dyn VisualSignalProbe>>,
    aligner: Option<Arc<dyn Transcriber>>,
    show_progress: bool,
}

impl AssemblyOrchestrator {
    pub fn new(config: Config, renderer: Arc<dyn MediaRenderer>) -> Self {
        Self {
            config,
            renderer,
            lip_sync: None,
            audio_probe: None,
            visual_probe: None,
            aligner: None,
            show_progress: false,
        }
    }

    pub fn with_lip_sync(mut self, analyzer: Arc<dyn LipSyncAnalyzer>) -> Self {
        self.lip_sync = Some(analyzer);
        self
    }

    pub fn with_audio_probe(mut self, probe: Arc<dyn AudioSignalProbe>) -> Self {
        self.audio_probe = Some(probe);
        self
    }

    pub fn with_visual_probe(mut self, probe: Arc<dyn VisualSignalProbe>) -> Self {
        self.visual_probe = Some(probe);
        self
    }

    /// Source of word alignment for jobs that do not bring their own.
    pub fn with_aligner(mut self, aligner: Arc<dyn Transcriber>) -> Self {
        self.aligner = Some(aligner);
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn start(&self, job_id: &str, stage: Stage) -> StageTimer {
        info!(
            "[{}] Stage {}/{}: {}",
            job_id,
            stage.number(),
            Stage::ALL.len(),
            stage
        );
        let spinner = self.show_progress.then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message(format!("{}...", stage.label()));
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        StageTimer {
            stage,
            started: Instant::now(),
            spinner,
        }
    }

    fn quality_validator(&self) -> SyncQualityValidator<'_> {
        let mut validator = SyncQualityValidator::new(&self.config.policy.quality);
        if let Some(probe) = self.audio_probe.as_deref() {
            validator = validator.with_audio_probe(probe);
        }
        if let Some(probe) = self.visual_probe.as_deref() {
            validator = validator.with_visual_probe(probe);
        }
        validator
    }

    async fn resolve_alignment(
        &self,
        provided: Option<AlignmentReference>,
        audio: &AudioHandle,
        language: &str,
        lip_sync_available: bool,
    ) -> Result<AlignmentReference> {
        let alignment = match provided {
            Some(alignment) => alignment,
            None => match &self.aligner {
                Some(aligner) => {
                    info!("Aligning dubbed audio with {}", aligner.name());
                    let transcript = aligner.transcribe(audio, language).await?;
                    AlignmentReference::from_transcript(&transcript).with_lip_sync(lip_sync_available)
                }
                None => {
                    return Err(AutodubError::Alignment(
                        "No word-level alignment supplied and no aligner configured".to_string(),
                    ))
                }
            },
        };
        alignment.validate()?;
        Ok(alignment)
    }

    async fn assemble(
        &self,
        video: &VideoHandle,
        audio: &AudioHandle,
        captions: Option<&Path>,
        output: &Path,
    ) -> Result<VideoHandle> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        self.renderer.assemble(video, audio, captions, output).await
    }

    /// Run every stage for `job`.
    ///
    /// Returns the assembled video with its quality report, or a terminal
    /// error naming the stage that failed. A poor final grade is still a
    /// successful result.
    pub async fn run(&self, job: DubbingJob) -> Result<DubbingResult> {
        let started = Instant::now();
        let DubbingJob {
            id,
            video: video_path,
            audio: audio_path,
            text,
            language,
            alignment: provided_alignment,
            output,
        } = job;
        let policy = &self.config.policy;
        let max_passes = policy.correction.max_passes;

        for (label, path) in [("Video", &video_path), ("Audio", &audio_path)] {
            if !path.exists() {
                return Err(input_failure(AutodubError::FileNotFound(format!(
                    "{} {}",
                    label,
                    path.display()
                ))));
            }
        }
        let video = self.renderer.probe_video(&video_path).await.map_err(|e| {
            input_failure(AutodubError::InvalidInput(format!(
                "Cannot read video {}: {}",
                video_path.display(),
                e
            )))
        })?;
        let mut audio = self.renderer.probe_audio(&audio_path).await.map_err(|e| {
            input_failure(AutodubError::InvalidInput(format!(
                "Cannot read audio {}: {}",
                audio_path.display(),
                e
            )))
        })?;
        info!(
            "[{}] Dubbing {:?}: video {:.3}s at {} fps, audio {:.3}s",
            id, video_path, video.duration, video.fps, audio.duration
        );

        let workspace = JobWorkspace::create(&self.config.work_root(), &id, self.config.keep_intermediates)?;
        let mut log = StageLog::default();

        let timer = self.start(&id, Stage::LipSyncAnalysis);
        let lip_sync = match &self.lip_sync {
            Some(analyzer) => match analyzer.analyze(&video).await {
                Ok(reference) if !reference.is_empty() => {
                    log.finish(
                        timer,
                        StageOutcome::Passed,
                        format!(
                            "{} sync points from {}, confidence {:.2}",
                            reference.sync_points.len(),
                            analyzer.name(),
                            reference.confidence_level
                        ),
                    );
                    Some(reference)
                }
                Ok(_) => {
                    log.finish(
                        timer,
                        StageOutcome::Degraded,
                        format!("{} found no mouth movement", analyzer.name()),
                    );
                    None
                }
                Err(e) => {
                    log.finish(timer, StageOutcome::Degraded, e.to_string());
                    None
                }
            },
            None => {
                log.finish(timer, StageOutcome::Skipped, "no lip-sync analyzer configured");
                None
            }
        };

        let timer = self.start(&id, Stage::AlignmentValidation);
        let mut alignment = match self
            .resolve_alignment(provided_alignment, &audio, &language, lip_sync.is_some())
            .await
        {
            Ok(alignment) => {
                log.finish(
                    timer,
                    StageOutcome::Passed,
                    format!("{} aligned words", alignment.words.len()),
                );
                alignment
            }
            Err(e) => return Err(log.fail(timer, e)),
        };

        let timer = self.start(&id, Stage::DurationValidation);
        let initial = match validate_with(
            video.duration,
            audio.duration,
            video.fps,
            lip_sync.as_ref(),
            Some(&alignment),
            &policy.frames,
        ) {
            Ok(validation) => {
                log.finish(
                    timer,
                    StageOutcome::Passed,
                    format!(
                        "{:.2} frames off, {}",
                        validation.frame_accuracy, validation.sync_quality
                    ),
                );
                validation
            }
            Err(e) => return Err(log.fail(timer, e)),
        };

        let strategist = SyncCorrectionStrategist::new(self.renderer.as_ref(), &policy.correction);
        let mut passes = 0usize;
        let mut corrections_applied = 0usize;

        let timer = self.start(&id, Stage::SyncAdjustment);
        if !initial.requires_adjustment {
            log.finish(timer, StageOutcome::Skipped, "duration within tolerance");
        } else if passes >= max_passes {
            log.finish(timer, StageOutcome::Degraded, "correction budget exhausted");
        } else {
            passes += 1;
            let previous = audio.path.clone();
            let outcome = strategist
                .correct(
                    audio,
                    video.duration,
                    initial.strategy,
                    &AuxiliaryData::new(Some(&alignment), lip_sync.as_ref(), video.fps),
                    &workspace.intermediate(passes, Stage::SyncAdjustment),
                )
                .await;
            let (corrected, plan) = settle(&workspace, &mut log, timer, &previous, outcome);
            audio = corrected;
            if let Some(plan) = plan {
                corrections_applied += 1;
                alignment = plan.remap_alignment(&alignment, video.duration);
            }
        }

        let validator = self.quality_validator();
        let timer = self.start(&id, Stage::NeuralValidation);
        let mut sync = validator
            .validate(&video, &audio, lip_sync.as_ref(), Some(&alignment))
            .await;
        if sync.degradations.is_empty() {
            let source = if sync.fallback { "duration only" } else { "correlation" };
            log.finish(
                timer,
                StageOutcome::Passed,
                format!(
                    "{} ({}), confidence {:.2}, offset {:+.2}s",
                    sync.overall_quality, source, sync.confidence, sync.offset
                ),
            );
        } else {
            log.finish(timer, StageOutcome::Degraded, sync.degradations.join("; "));
        }

        let timer = self.start(&id, Stage::NeuralCorrection);
        if !sync.requires_correction {
            log.finish(timer, StageOutcome::Skipped, "no correction recommended");
        } else {
            let mut applied = 0usize;
            let mut failure = None;
            while sync.requires_correction && passes < max_passes {
                let Some(correction) = sync.recommended_correction.clone() else {
                    break;
                };
                passes += 1;
                let previous = audio.path.clone();
                let outcome = strategist
                    .apply_sync_correction(
                        audio,
                        video.duration,
                        &correction,
                        &AuxiliaryData::new(Some(&alignment), lip_sync.as_ref(), video.fps),
                        &workspace.intermediate(passes, Stage::NeuralCorrection),
                    )
                    .await;
                audio = outcome.audio;
                let Some(plan) = outcome.plan.filter(|_| outcome.applied) else {
                    failure = outcome.error;
                    break;
                };
                workspace.retire(&previous, &audio);
                alignment = plan.remap_alignment(&alignment, video.duration);
                applied += 1;
                sync = validator
                    .validate(&video, &audio, lip_sync.as_ref(), Some(&alignment))
                    .await;
            }
            corrections_applied += applied;

            if let Some(error) = failure {
                log.finish(timer, StageOutcome::Degraded, format!("correction failed: {}", error));
            } else if sync.requires_correction {
                log.finish(
                    timer,
                    StageOutcome::Degraded,
                    format!("still {} after {} correction(s)", sync.overall_quality, applied),
                );
            } else {
                log.finish(
                    timer,
                    StageOutcome::Corrected,
                    format!("{} correction(s), now {}", applied, sync.overall_quality),
                );
            }
        }

        let timer = self.start(&id, Stage::FinalLipSyncCheck);
        let min_lip = policy.quality.min_lip_accuracy;
        match (lip_sync.is_some(), sync.lip_sync_score) {
            (false, _) => log.finish(timer, StageOutcome::Skipped, "no lip-sync reference"),
            (true, None) => log.finish(timer, StageOutcome::Degraded, "lip-sync score unavailable"),
            (true, Some(score)) if score >= min_lip => log.finish(
                timer,
                StageOutcome::Passed,
                format!("lip-sync accuracy {:.2}", score),
            ),
            (true, Some(score)) if passes >= max_passes => log.finish(
                timer,
                StageOutcome::Degraded,
                format!(
                    "lip-sync accuracy {:.2} below {:.2}, correction budget exhausted",
                    score, min_lip
                ),
            ),
            (true, Some(score)) => {
                passes += 1;
                let correction = SyncCorrection {
                    method: CorrectionMethod::LipSyncGuided,
                    offset_seconds: sync.offset,
                    confidence: score,
                };
                let previous = audio.path.clone();
                let outcome = strategist
                    .apply_sync_correction(
                        audio,
                        video.duration,
                        &correction,
                        &AuxiliaryData::new(Some(&alignment), lip_sync.as_ref(), video.fps),
                        &workspace.intermediate(passes, Stage::FinalLipSyncCheck),
                    )
                    .await;
                let (corrected, plan) = settle(&workspace, &mut log, timer, &previous, outcome);
                audio = corrected;
                if let Some(plan) = plan {
                    corrections_applied += 1;
                    alignment = plan.remap_alignment(&alignment, video.duration);
                    sync = validator
                        .validate(&video, &audio, lip_sync.as_ref(), Some(&alignment))
                        .await;
                }
            }
        }
        let lip_sync_quality = sync.lip_sync_score.map(grade_score);

        let timer = self.start(&id, Stage::CaptionGeneration);
        let format = self.config.caption_format;
        let segments = allocate(&text, audio.duration);
        let mut cues = build_cues(&segments, self.config.words_per_cue);
        // Corrections remap the alignment, so it always describes `audio`.
        let snapped = snap_cues_to_alignment(&mut cues, &alignment.words);
        let captions = if cues.is_empty() {
            log.finish(timer, StageOutcome::Skipped, "no caption text");
            None
        } else {
            let path = output.with_extension(format.extension());
            match write_captions(&cues, format, Some(&language), &path) {
                Ok(()) => {
                    let how = if snapped { "aligned" } else { "allocated" };
                    log.finish(
                        timer,
                        StageOutcome::Passed,
                        format!("{} {} cues in {}", cues.len(), how, path.display()),
                    );
                    Some(path)
                }
                Err(e) => {
                    log.finish(
                        timer,
                        StageOutcome::Degraded,
                        format!("could not write captions: {}", e),
                    );
                    None
                }
            }
        };

        let timer = self.start(&id, Stage::VideoAssembly);
        let embedded = captions.as_deref().filter(|_| format != CaptionFormat::Json);
        let assembled = match self.assemble(&video, &audio, embedded, &output).await {
            Ok(assembled) => {
                log.finish(
                    timer,
                    StageOutcome::Passed,
                    format!("{} ({:.3}s)", output.display(), assembled.duration),
                );
                assembled
            }
            Err(e) => return Err(log.fail(timer, e)),
        };

        let timer = self.start(&id, Stage::FinalValidation);
        let final_validation = match validate_with(
            assembled.duration,
            audio.duration,
            video.fps,
            lip_sync.as_ref(),
            Some(&alignment),
            &policy.frames,
        ) {
            Ok(validation) => {
                let outcome = if validation.sync_quality == SyncQuality::Poor {
                    StageOutcome::Degraded
                } else {
                    StageOutcome::Passed
                };
                log.finish(
                    timer,
                    outcome,
                    format!(
                        "{:.2} frames off, {}",
                        validation.frame_accuracy, validation.sync_quality
                    ),
                );
                Some(validation)
            }
            Err(e) => {
                log.finish(timer, StageOutcome::Degraded, e.to_string());
                None
            }
        };

        let frame_quality = final_validation
            .as_ref()
            .map_or(initial.sync_quality, |v| v.sync_quality);
        let overall_quality = frame_quality.min(sync.overall_quality);

        let report = QualityReport {
            job_id: id,
            generated_at: Utc::now(),
            output: output.clone(),
            captions,
            stages: log.records,
            initial_validation: initial,
            final_validation,
            sync,
            lip_sync_quality,
            overall_quality,
            corrections_applied,
            degradations: log.degradations,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        let path = report_path(&output);
        match report.write_to(&path) {
            Ok(()) => debug!("Wrote quality report to {:?}", path),
            Err(e) => warn!("Failed to write quality report {:?}: {}", path, e),
        }
        info!(
            "[{}] Done: {} with {} correction(s), {} degradation(s)",
            report.job_id,
            report.overall_quality,
            report.corrections_applied,
            report.degradations.len()
        );

        Ok(DubbingResult {
            video: assembled,
            cues,
            report,
        })
    }
}

/// Record a correction outcome. Returns the handle later stages use and
/// the plan when it was applied.
fn settle(
    workspace: &JobWorkspace,
    log: &mut StageLog,
    timer: StageTimer,
    previous: &Path,
    outcome: CorrectionOutcome,
) -> (AudioHandle, Option<CorrectionPlan>) {
    let name = outcome.plan.as_ref().map_or("no", |p| p.name());
    if outcome.applied {
        workspace.retire(previous, &outcome.audio);
        log.finish(
            timer,
            StageOutcome::Corrected,
            format!("{} correction, audio now {:.3}s", name, outcome.audio.duration),
        );
        (outcome.audio, outcome.plan)
    } else {
        log.finish(
            timer,
            StageOutcome::Degraded,
            format!(
                "{} correction failed: {}",
                name,
                outcome.error.as_deref().unwrap_or("unknown error")
            ),
        );
        (outcome.audio, None)
    }
}

/// Missing or unreadable inputs fail the job before any stage runs.
fn input_failure(error: AutodubError) -> AutodubError {
    AutodubError::StageFailed {
        stage: "input".to_string(),
        message: error.to_string(),
    }
}

/// Print a summary of a finished job.
pub fn print_summary(result: &DubbingResult) {
    let report = &result.report;
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                        Dubbing Complete                        ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Job:        {}", report.job_id);
    println!("  Output:     {}", report.output.display());
    if let Some(captions) = &report.captions {
        println!("  Captions:   {} ({} cues)", captions.display(), result.cues.len());
    }
    println!("  Duration:   {:.2}s", result.video.duration);
    println!("  Quality:    {}", report.overall_quality);
    println!("  Corrected:  {} pass(es)", report.corrections_applied);
    println!();
    println!("  Stages:");
    for record in &report.stages {
        println!(
            "    {:<22} {:<10} {}",
            record.stage.as_str(),
            format!("{:?}", record.outcome).to_lowercase(),
            record.detail
        );
    }
    if !report.degradations.is_empty() {
        println!();
        println!("  Degradations:");
        for d in &report.degradations {
            println!("    - {}", d);
        }
    }
    println!();
    println!(
        "  Total:      {:.2}s",
        Duration::from_millis(report.elapsed_ms).as_secs_f64()
    );
    println!("═══════════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert_eq!(Stage::LipSyncAnalysis.number(), 1);
        assert_eq!(Stage::AlignmentValidation.number(), 2);
        assert_eq!(Stage::VideoAssembly.number(), 9);
        assert_eq!(Stage::FinalValidation.number(), Stage::ALL.len());
        assert_eq!(Stage::NeuralCorrection.to_string(), "neural_correction");
    }

    #[test]
    fn test_report_path() {
        assert_eq!(
            report_path(Path::new("/out/movie.mp4")),
            PathBuf::from("/out/movie.report.json")
        );
    }

    #[test]
    fn test_job_ids_are_unique() {
        let a = DubbingJob::new("v.mp4", "a.wav", "Hola.", "es", "o.mp4");
        let b = DubbingJob::new("v.mp4", "a.wav", "Hola.", "es", "o.mp4");
        assert_ne!(a.id, b.id);
        assert_eq!(a.clone().with_id("fixed").id, "fixed");
    }

    #[test]
    fn test_workspace_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let dir = {
            let ws = JobWorkspace::create(root.path(), "job-1", false).unwrap();
            fs::write(ws.intermediate(1, Stage::SyncAdjustment), b"x").unwrap();
            ws.dir.clone()
        };
        assert!(!dir.exists());
    }

    #[test]
    fn test_workspace_kept_when_requested() {
        let root = tempfile::tempdir().unwrap();
        let dir = {
            let ws = JobWorkspace::create(root.path(), "job-2", true).unwrap();
            ws.dir.clone()
        };
        assert!(dir.exists());
    }

    #[test]
    fn test_workspace_rejects_path_like_ids() {
        let root = tempfile::tempdir().unwrap();
        assert!(JobWorkspace::create(root.path(), "../escape", false).is_err());
        assert!(JobWorkspace::create(root.path(), "", false).is_err());
    }

    #[test]
    fn test_retire_only_touches_job_files() {
        let root = tempfile::tempdir().unwrap();
        let outside = root.path().join("input.wav");
        fs::write(&outside, b"x").unwrap();

        let ws = JobWorkspace::create(root.path(), "job-3", false).unwrap();
        let first = ws.intermediate(1, Stage::SyncAdjustment);
        let second = ws.intermediate(2, Stage::NeuralCorrection);
        fs::write(&first, b"x").unwrap();
        fs::write(&second, b"x").unwrap();

        let current = AudioHandle::new(&second, 1.0);
        ws.retire(&outside, &current);
        ws.retire(&first, &current);
        ws.retire(&second, &current);

        assert!(outside.exists());
        assert!(!first.exists());
        assert!(second.exists());
    }
}
