use crate::error::{AutodubError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionFormat {
    #[default]
    Srt,
    Vtt,
    Json,
}

impl std::fmt::Display for CaptionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptionFormat::Srt => write!(f, "srt"),
            CaptionFormat::Vtt => write!(f, "vtt"),
            CaptionFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for CaptionFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "srt" => Ok(CaptionFormat::Srt),
            "vtt" => Ok(CaptionFormat::Vtt),
            "json" => Ok(CaptionFormat::Json),
            _ => Err(format!(
                "Unknown caption format: {}. Use 'srt', 'vtt', or 'json'",
                s
            )),
        }
    }
}

impl CaptionFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            CaptionFormat::Srt => "srt",
            CaptionFormat::Vtt => "vtt",
            CaptionFormat::Json => "json",
        }
    }
}

/// Thresholds used when fitting translated text to a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintPolicy {
    /// Ratios inside `[accept_low, accept_high]` are left untouched.
    pub accept_low: f64,
    pub accept_high: f64,
    /// Below this ratio the text is shortened.
    pub shorten_below: f64,
    /// Above this ratio the text is expanded.
    pub expand_above: f64,
    /// Fraction of the proportional word budget kept when dropping words.
    pub word_safety_margin: f64,
    /// Fraction of the target window sentence selection may fill.
    pub sentence_budget: f64,
    /// Minimum gap (seconds) worth expanding for.
    pub min_expansion_gap: f64,
    pub base_score: f64,
    pub shorten_penalty: f64,
    pub expand_penalty: f64,
    pub precision_bonus: f64,
    /// Final ratio tolerance that earns `precision_bonus`.
    pub bonus_tolerance: f64,
    /// Final ratio tolerance reported as high precision.
    pub high_precision_tolerance: f64,
    /// Score reported when constraining failed and the text was kept as-is.
    pub degraded_score: f64,
}

impl Default for ConstraintPolicy {
    fn default() -> Self {
        Self {
            accept_low: 0.9,
            accept_high: 1.1,
            shorten_below: 0.75,
            expand_above: 1.3,
            word_safety_margin: 0.9,
            sentence_budget: 0.95,
            min_expansion_gap: 0.5,
            base_score: 90.0,
            shorten_penalty: 15.0,
            expand_penalty: 10.0,
            precision_bonus: 10.0,
            bonus_tolerance: 0.05,
            high_precision_tolerance: 0.1,
            degraded_score: 40.0,
        }
    }
}

/// Frame-count cutoffs for the severity ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameThresholds {
    pub poor_above: f64,
    pub fair_above: f64,
    pub good_above: f64,
    /// A "good" mismatch only needs fine tuning past this absolute gap.
    pub fine_tuning_min_gap: f64,
    /// Lip-sync references at or above this confidence may upgrade a grade.
    pub lip_sync_upgrade_confidence: f64,
}

impl Default for FrameThresholds {
    fn default() -> Self {
        Self {
            poor_above: 5.0,
            fair_above: 2.0,
            good_above: 0.5,
            fine_tuning_min_gap: 0.05,
            lip_sync_upgrade_confidence: 0.8,
        }
    }
}

/// Bounds applied by the correction strategist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionPolicy {
    pub min_tempo: f64,
    pub max_tempo: f64,
    pub micro_tempo_range: f64,
    pub lip_tempo_min: f64,
    pub lip_tempo_max: f64,
    pub max_lip_windows: usize,
    /// Boundary fade length in seconds.
    pub fade: f64,
    /// Gaps under this many frames are fixed by pad/trim only.
    pub sub_frame_tier: f64,
    /// Gaps under this many frames get a micro tempo change.
    pub micro_tier: f64,
    /// Maximum number of correction passes per job.
    pub max_passes: usize,
}

impl Default for CorrectionPolicy {
    fn default() -> Self {
        Self {
            min_tempo: 0.5,
            max_tempo: 2.0,
            micro_tempo_range: 0.01,
            lip_tempo_min: 0.85,
            lip_tempo_max: 1.15,
            max_lip_windows: 10,
            fade: 0.01,
            sub_frame_tier: 0.1,
            micro_tier: 1.0,
            max_passes: 2,
        }
    }
}

/// Parameters for correlation-based sync validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityPolicy {
    pub search_window: f64,
    pub resolution: f64,
    /// Weight of the voice/motion correlation in the neural confidence.
    pub primary_weight: f64,
    pub min_confidence: f64,
    pub max_offset: f64,
    pub min_lip_accuracy: f64,
    pub fallback_confidence: f64,
    /// Duration delta (seconds) at which fallback accuracy reaches zero.
    pub fallback_zero_gap: f64,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            search_window: 2.0,
            resolution: 0.1,
            primary_weight: 0.7,
            min_confidence: 0.6,
            max_offset: 0.05,
            min_lip_accuracy: 0.7,
            fallback_confidence: 0.3,
            fallback_zero_gap: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncPolicy {
    pub constraint: ConstraintPolicy,
    pub frames: FrameThresholds,
    pub correction: CorrectionPolicy,
    pub quality: QualityPolicy,
}

impl SyncPolicy {
    pub fn validate(&self) -> Result<()> {
        let f = &self.frames;
        if !(f.poor_above > f.fair_above && f.fair_above > f.good_above && f.good_above >= 0.0) {
            return Err(AutodubError::Config(format!(
                "Frame thresholds must be strictly decreasing: poor {} > fair {} > good {} >= 0",
                f.poor_above, f.fair_above, f.good_above
            )));
        }

        let c = &self.constraint;
        if !(c.shorten_below <= c.accept_low && c.accept_low <= 1.0 && 1.0 <= c.accept_high)
            || c.accept_high > c.expand_above
        {
            return Err(AutodubError::Config(
                "Constraint ratios must satisfy shorten <= accept_low <= 1 <= accept_high <= expand"
                    .to_string(),
            ));
        }

        let k = &self.correction;
        if k.min_tempo <= 0.0 || k.min_tempo > k.max_tempo {
            return Err(AutodubError::Config(format!(
                "Tempo bounds are inverted: {} > {}",
                k.min_tempo, k.max_tempo
            )));
        }
        if k.lip_tempo_min > k.lip_tempo_max || k.max_lip_windows == 0 {
            return Err(AutodubError::Config(
                "Lip-sync tempo bounds are inverted or window count is zero".to_string(),
            ));
        }

        if self.quality.resolution <= 0.0 || self.quality.search_window < 0.0 {
            return Err(AutodubError::Config(
                "Correlation resolution must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub translation_model: String,
    pub daily_translation_quota: Option<u64>,
    pub caption_format: CaptionFormat,
    pub words_per_cue: usize,
    pub concurrency: usize,
    pub work_dir: Option<PathBuf>,
    pub keep_intermediates: bool,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// Upper bound for any single external call, in seconds.
    pub render_timeout_secs: u64,
    pub policy: SyncPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            translation_model: "gemini-2.0-flash".to_string(),
            daily_translation_quota: None,
            caption_format: CaptionFormat::default(),
            words_per_cue: 5,
            concurrency: 4,
            work_dir: None,
            keep_intermediates: false,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            render_timeout_secs: 120,
            policy: SyncPolicy::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path();
        Self::load_from(path.as_deref())
    }

    /// Load from an explicit file (if it exists), then apply env overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(config_path) = path {
            if config_path.exists() {
                let contents = std::fs::read_to_string(config_path)?;
                config = toml::from_str::<Config>(&contents)?;
            }
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.gemini_api_key = Some(key);
        }
        if let Ok(format) = std::env::var("AUTODUB_CAPTION_FORMAT") {
            if let Ok(f) = format.parse() {
                self.caption_format = f;
            }
        }
        if let Ok(concurrency) = std::env::var("AUTODUB_CONCURRENCY") {
            if let Ok(c) = concurrency.parse() {
                self.concurrency = c;
            }
        }
        if let Ok(dir) = std::env::var("AUTODUB_WORK_DIR") {
            self.work_dir = Some(PathBuf::from(dir));
        }
        if let Ok(path) = std::env::var("AUTODUB_FFMPEG") {
            self.ffmpeg_path = path;
        }
        if let Ok(path) = std::env::var("AUTODUB_FFPROBE") {
            self.ffprobe_path = path;
        }
        if let Ok(timeout) = std::env::var("AUTODUB_RENDER_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.render_timeout_secs = t;
            }
        }
        if let Ok(quota) = std::env::var("AUTODUB_DAILY_QUOTA") {
            if let Ok(q) = quota.parse() {
                self.daily_translation_quota = Some(q);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(AutodubError::Config(
                "Concurrency must be greater than 0".to_string(),
            ));
        }
        if self.words_per_cue == 0 {
            return Err(AutodubError::Config(
                "words_per_cue must be greater than 0".to_string(),
            ));
        }
        if self.render_timeout_secs == 0 {
            return Err(AutodubError::Config(
                "render_timeout_secs must be greater than 0".to_string(),
            ));
        }
        self.policy.validate()
    }

    /// Translation needs a provider key on top of the general checks.
    pub fn validate_translation(&self) -> Result<()> {
        self.validate()?;
        if self.gemini_api_key.is_none() {
            return Err(AutodubError::Config(
                "GEMINI_API_KEY not set. Get one at https://aistudio.google.com/apikey".to_string(),
            ));
        }
        Ok(())
    }

    /// Root under which per-job directories are created.
    pub fn work_root(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("autodub"))
    }

    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("autodub").join("config.toml"))
    }
}
