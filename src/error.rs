use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutodubError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid alignment data: {0}")]
    Alignment(String),

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("Translation quota exhausted: {used}/{limit} requests today")]
    QuotaExceeded { used: u64, limit: u64 },

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Lip-sync analysis failed: {0}")]
    LipSync(String),

    #[error("Signal analysis failed: {0}")]
    Signal(String),

    #[error("Operation timed out after {0}s")]
    Timeout(u64),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Stage {stage} failed: {message}")]
    StageFailed { stage: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AutodubError {
    /// Input errors abort a job without retry.
    pub fn is_input_error(&self) -> bool {
        match self {
            AutodubError::InvalidInput(_) | AutodubError::FileNotFound(_) | AutodubError::Alignment(_) => {
                true
            }
            AutodubError::StageFailed { stage, .. } => stage == "input",
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AutodubError>;
