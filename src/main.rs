use anyhow::{Context, Result};
use autodub::config::{CaptionFormat, Config};
use autodub::media::{FfmpegRenderer, MediaRenderer, WavSignalProbe};
use autodub::pipeline::{print_summary, AssemblyOrchestrator, DubbingJob};
use autodub::script::prepare_script;
use autodub::speech::{bounds, estimate_with_pace, word_count, Pace};
use autodub::subtitle::{allocate, build_cues, create_formatter};
use autodub::sync::validate_with;
use autodub::transcribe::{AlignmentReference, Transcript};
use autodub::translate::{GeminiTranslator, QuotaLimitedTranslator, QuotaTracker, Translator, TranslatorChain};
use autodub::{constrain_with_policy, run_jobs};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "autodub")]
#[command(version, about = "Fit dubbed speech to the original timing and check A/V sync")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Estimate how long a text takes to speak
    Estimate {
        text: String,
        #[arg(short, long, default_value = "en")]
        language: String,
        /// Speaking pace: slow, normal, fast
        #[arg(short, long, default_value = "normal")]
        pace: String,
    },

    /// Fit a translation into a target duration
    Constrain {
        /// Translated text
        text: String,
        /// Target duration in seconds
        #[arg(short, long)]
        target: f64,
        #[arg(short, long, default_value = "en")]
        language: String,
        /// Source text the translation replaces
        #[arg(long, default_value = "")]
        original: String,
    },

    /// Build a caption track for a text spoken over a duration
    Captions {
        text: String,
        /// Total duration in seconds
        #[arg(short, long)]
        duration: f64,
        /// Output format: srt, vtt, json
        #[arg(short, long)]
        format: Option<String>,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Grade the mismatch between a video and an audio duration
    Validate {
        #[arg(long)]
        video: f64,
        #[arg(long)]
        audio: f64,
        #[arg(long, default_value = "25")]
        fps: f64,
    },

    /// Translate a transcript (JSON) and fit each segment to its timing
    Script {
        transcript: PathBuf,
        #[arg(short, long)]
        source: String,
        #[arg(short, long)]
        target: String,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Align dubbed audio to a video, caption it and mux the result
    Dub {
        #[arg(long)]
        video: PathBuf,
        /// Synthesized speech (WAV)
        #[arg(long)]
        audio: PathBuf,
        /// Text spoken in the dubbed audio
        #[arg(long)]
        text: String,
        /// Word-level alignment of the dubbed audio (JSON)
        #[arg(long)]
        alignment: PathBuf,
        #[arg(short, long, default_value = "en")]
        language: String,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run several dub jobs from a JSON manifest concurrently
    Batch {
        manifest: PathBuf,
        /// Maximum jobs in flight (defaults to the configured concurrency)
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
}

/// One entry of a batch manifest.
#[derive(Debug, Deserialize)]
struct JobSpec {
    id: Option<String>,
    video: PathBuf,
    audio: PathBuf,
    text: String,
    language: String,
    alignment: PathBuf,
    output: PathBuf,
}

#[derive(Serialize)]
struct ScriptLine<'a> {
    segment: &'a autodub::script::TranslatedSegment,
    constraint: &'a autodub::DurationConstraintResult,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(Some(path)),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

fn read_alignment(path: &Path) -> Result<AlignmentReference> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read alignment {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Invalid alignment JSON in {}", path.display()))
}

fn emit(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn build_translator(config: &Config) -> Result<TranslatorChain> {
    config
        .validate_translation()
        .context("Translation is not configured")?;
    let api_key = config
        .gemini_api_key
        .clone()
        .context("GEMINI_API_KEY not set")?;
    let gemini = GeminiTranslator::new(api_key)
        .with_model(config.translation_model.clone())
        .with_timeout(Duration::from_secs(config.render_timeout_secs));

    let provider: Box<dyn Translator> = match config.daily_translation_quota {
        Some(limit) => Box::new(QuotaLimitedTranslator::new(gemini, QuotaTracker::shared(limit))),
        None => Box::new(gemini),
    };
    Ok(TranslatorChain::new().with(provider))
}

async fn build_orchestrator(config: &Config) -> Result<AssemblyOrchestrator> {
    let renderer = FfmpegRenderer::from_config(config);
    renderer
        .check_available()
        .await
        .context("FFmpeg not found. Install it with: brew install ffmpeg (macOS) or apt install ffmpeg (Linux)")?;
    info!("Using {} renderer", renderer.name());

    Ok(AssemblyOrchestrator::new(config.clone(), Arc::new(renderer))
        .with_audio_probe(Arc::new(WavSignalProbe::default())))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let policy = &config.policy;

    match cli.command {
        Command::Estimate {
            text,
            language,
            pace,
        } => {
            let pace: Pace = pace.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let seconds = estimate_with_pace(&text, &language, pace);
            let (low, high) = bounds(word_count(&text));
            println!("{:.2}s ({} words, bounds {:.2}s..{:.2}s)", seconds, word_count(&text), low, high);
        }

        Command::Constrain {
            text,
            target,
            language,
            original,
        } => {
            let result = constrain_with_policy(&original, &text, target, &language, &policy.constraint);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Command::Captions {
            text,
            duration,
            format,
            output,
        } => {
            let format: CaptionFormat = match format {
                Some(f) => f.parse().map_err(|e: String| anyhow::anyhow!(e))?,
                None => config.caption_format,
            };
            let segments = allocate(&text, duration);
            let cues = build_cues(&segments, config.words_per_cue);
            let content = create_formatter(format, None).format(&cues);
            emit(output.as_deref(), &content)?;
        }

        Command::Validate { video, audio, fps } => {
            let validation = validate_with(video, audio, fps, None, None, &policy.frames)
                .context("Validation failed")?;
            println!("{}", serde_json::to_string_pretty(&validation)?);
        }

        Command::Script {
            transcript,
            source,
            target,
            output,
        } => {
            let contents = std::fs::read_to_string(&transcript)
                .with_context(|| format!("Failed to read {}", transcript.display()))?;
            let transcript: Transcript =
                serde_json::from_str(&contents).context("Invalid transcript JSON")?;

            let translator = build_translator(&config)?;
            let script = prepare_script(
                &transcript.segments,
                &translator,
                &source,
                &target,
                &policy.constraint,
            )
            .await
            .context("Script preparation failed")?;

            let lines: Vec<ScriptLine> = script
                .iter()
                .map(|(segment, constraint)| ScriptLine {
                    segment,
                    constraint,
                })
                .collect();
            emit(output.as_deref(), &serde_json::to_string_pretty(&lines)?)?;
        }

        Command::Dub {
            video,
            audio,
            text,
            alignment,
            language,
            output,
        } => {
            let alignment = read_alignment(&alignment)?;
            let orchestrator = build_orchestrator(&config).await?.with_progress(true);

            info!("Video:    {}", video.display());
            info!("Audio:    {}", audio.display());
            info!("Output:   {}", output.display());

            let job = DubbingJob::new(video, audio, text, language, output).with_alignment(alignment);
            let result = orchestrator.run(job).await.context("Dubbing failed")?;
            print_summary(&result);
        }

        Command::Batch {
            manifest,
            concurrency,
        } => {
            let contents = std::fs::read_to_string(&manifest)
                .with_context(|| format!("Failed to read {}", manifest.display()))?;
            let specs: Vec<JobSpec> =
                serde_json::from_str(&contents).context("Invalid batch manifest")?;

            let mut jobs = Vec::with_capacity(specs.len());
            for spec in specs {
                let alignment = read_alignment(&spec.alignment)?;
                let mut job = DubbingJob::new(spec.video, spec.audio, spec.text, spec.language, spec.output)
                    .with_alignment(alignment);
                if let Some(id) = spec.id {
                    job = job.with_id(id);
                }
                jobs.push(job);
            }

            let orchestrator = build_orchestrator(&config).await?;
            let concurrency = concurrency.unwrap_or(config.concurrency);
            let (results, stats) = run_jobs(&orchestrator, jobs, concurrency, true)
                .await
                .context("Batch failed to start")?;

            for job in &results {
                match &job.result {
                    Ok(done) => println!(
                        "  ✓ {}  {}  {}",
                        job.job_id,
                        done.report.overall_quality,
                        done.video.path.display()
                    ),
                    Err(e) => println!("  ✗ {}  {}", job.job_id, e),
                }
            }
            println!(
                "{}/{} jobs succeeded in {:.1}s",
                stats.successful_jobs,
                stats.total_jobs,
                stats.total_time.as_secs_f64()
            );
            if stats.failed_jobs > 0 {
                anyhow::bail!("{} job(s) failed", stats.failed_jobs);
            }
        }
    }

    Ok(())
}
