pub mod batch;
pub mod config;
pub mod constrain;
pub mod error;
pub mod lipsync;
pub mod media;
pub mod pipeline;
pub mod script;
pub mod speech;
pub mod subtitle;
pub mod sync;
pub mod transcribe;
pub mod translate;

pub use batch::{run_jobs, BatchStats, JobResult};
pub use config::{CaptionFormat, Config, SyncPolicy};
pub use constrain::{constrain, constrain_with_policy, Adjustment, DurationConstraintResult, Precision};
pub use error::{AutodubError, Result};
pub use pipeline::{
    print_summary, AssemblyOrchestrator, DubbingJob, DubbingResult, QualityReport, Stage,
    StageOutcome,
};
pub use speech::estimate;
pub use subtitle::allocate;
pub use sync::validate;
