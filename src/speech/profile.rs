//! Per-language speaking-rate constants.

use serde::{Deserialize, Serialize};

/// Delivery speed used when estimating durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pace {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl std::str::FromStr for Pace {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "slow" => Ok(Pace::Slow),
            "normal" => Ok(Pace::Normal),
            "fast" => Ok(Pace::Fast),
            _ => Err(format!("Unknown pace: {}. Use 'slow', 'normal', or 'fast'", s)),
        }
    }
}

/// Rates at the three paces, in units per minute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaceRates {
    pub slow: f64,
    pub normal: f64,
    pub fast: f64,
}

impl PaceRates {
    const fn new(slow: f64, normal: f64, fast: f64) -> Self {
        Self { slow, normal, fast }
    }

    pub fn at(&self, pace: Pace) -> f64 {
        match pace {
            Pace::Slow => self.slow,
            Pace::Normal => self.normal,
            Pace::Fast => self.fast,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanguageSpeechProfile {
    pub code: &'static str,
    pub words_per_minute: PaceRates,
    pub syllables_per_minute: PaceRates,
    /// Multiplier for phonetically dense languages.
    pub complexity_factor: f64,
    /// Multiplier for languages with longer natural pauses.
    pub pause_factor: f64,
}

const fn profile(
    code: &'static str,
    wpm: PaceRates,
    spm: PaceRates,
    complexity_factor: f64,
    pause_factor: f64,
) -> LanguageSpeechProfile {
    LanguageSpeechProfile {
        code,
        words_per_minute: wpm,
        syllables_per_minute: spm,
        complexity_factor,
        pause_factor,
    }
}

pub const DEFAULT_PROFILE: LanguageSpeechProfile = profile(
    "en",
    PaceRates::new(120.0, 150.0, 180.0),
    PaceRates::new(190.0, 235.0, 280.0),
    1.0,
    1.0,
);

// Word rates for ja/zh/ko count one unit per character or syllable block.
static PROFILES: &[LanguageSpeechProfile] = &[
    DEFAULT_PROFILE,
    profile("es", PaceRates::new(140.0, 170.0, 200.0), PaceRates::new(250.0, 300.0, 360.0), 1.05, 0.95),
    profile("fr", PaceRates::new(130.0, 160.0, 190.0), PaceRates::new(230.0, 280.0, 330.0), 1.05, 1.0),
    profile("de", PaceRates::new(110.0, 135.0, 160.0), PaceRates::new(190.0, 230.0, 270.0), 1.1, 1.05),
    profile("it", PaceRates::new(135.0, 165.0, 195.0), PaceRates::new(240.0, 290.0, 340.0), 1.0, 0.95),
    profile("pt", PaceRates::new(130.0, 160.0, 190.0), PaceRates::new(230.0, 275.0, 320.0), 1.05, 1.0),
    profile("nl", PaceRates::new(120.0, 145.0, 170.0), PaceRates::new(200.0, 240.0, 280.0), 1.05, 1.0),
    profile("ru", PaceRates::new(110.0, 135.0, 160.0), PaceRates::new(200.0, 240.0, 280.0), 1.1, 1.05),
    profile("pl", PaceRates::new(110.0, 130.0, 155.0), PaceRates::new(200.0, 235.0, 275.0), 1.1, 1.05),
    profile("tr", PaceRates::new(110.0, 135.0, 160.0), PaceRates::new(220.0, 260.0, 300.0), 1.05, 1.0),
    profile("ar", PaceRates::new(110.0, 130.0, 155.0), PaceRates::new(190.0, 225.0, 265.0), 1.1, 1.1),
    profile("hi", PaceRates::new(120.0, 145.0, 170.0), PaceRates::new(210.0, 250.0, 290.0), 1.05, 1.05),
    profile("bn", PaceRates::new(115.0, 140.0, 165.0), PaceRates::new(200.0, 240.0, 280.0), 1.05, 1.05),
    profile("ur", PaceRates::new(115.0, 140.0, 165.0), PaceRates::new(200.0, 240.0, 280.0), 1.05, 1.05),
    profile("ta", PaceRates::new(100.0, 120.0, 145.0), PaceRates::new(220.0, 260.0, 300.0), 1.15, 1.05),
    profile("te", PaceRates::new(100.0, 120.0, 145.0), PaceRates::new(220.0, 260.0, 300.0), 1.15, 1.05),
    profile("ja", PaceRates::new(260.0, 320.0, 380.0), PaceRates::new(330.0, 400.0, 480.0), 1.0, 1.1),
    profile("zh", PaceRates::new(200.0, 240.0, 280.0), PaceRates::new(200.0, 240.0, 280.0), 1.0, 1.05),
    profile("ko", PaceRates::new(200.0, 240.0, 280.0), PaceRates::new(250.0, 300.0, 350.0), 1.0, 1.05),
];

/// Look up a profile by language code. Region suffixes (`pt-BR`, `zh_TW`) are
/// ignored; unknown codes get the English profile.
pub fn profile_for(language: &str) -> &'static LanguageSpeechProfile {
    let base = primary_subtag(language);
    PROFILES
        .iter()
        .find(|p| p.code == base)
        .unwrap_or(&PROFILES[0])
}

pub(crate) fn primary_subtag(language: &str) -> String {
    language
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}
