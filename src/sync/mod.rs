//! Audio/video synchronisation: grading, correction planning and scoring.

pub mod correlation;
pub mod filter;
pub mod quality;
pub mod strategist;
pub mod validation;

pub use filter::{FilterGraph, FilterOp};
pub use quality::{grade_score, CorrectionMethod, SyncCorrection, SyncQualityReport, SyncQualityValidator};
pub use strategist::{
    AuxiliaryData, CorrectionOutcome, CorrectionPlan, FrameTier, SyncCorrectionStrategist,
    TempoWindow,
};
pub use validation::{validate, validate_with, AdjustmentStrategy, FrameLevelValidation, SyncQuality};
