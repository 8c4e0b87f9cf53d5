//! Media handles and the render / signal collaborators.

pub mod ffmpeg;
pub mod signal;

pub use ffmpeg::FfmpegRenderer;
pub use signal::WavSignalProbe;

use crate::error::Result;
use crate::sync::filter::FilterGraph;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// An audio file and its measured duration in seconds.
///
/// Handles are moved from stage to stage rather than cloned; whoever holds
/// the handle owns the file behind it.
#[derive(Debug, PartialEq, Serialize)]
pub struct AudioHandle {
    pub path: PathBuf,
    pub duration: f64,
}

impl AudioHandle {
    pub fn new(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            path: path.into(),
            duration,
        }
    }
}

#[derive(Debug, PartialEq, Serialize)]
pub struct VideoHandle {
    pub path: PathBuf,
    pub duration: f64,
    pub fps: f64,
}

impl VideoHandle {
    pub fn new(path: impl Into<PathBuf>, duration: f64, fps: f64) -> Self {
        Self {
            path: path.into(),
            duration,
            fps,
        }
    }
}

/// Evenly sampled signal, one value per `resolution` seconds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    pub resolution: f64,
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(resolution: f64, values: Vec<f64>) -> Self {
        Self { resolution, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.values.len() as f64 * self.resolution
    }
}

/// Executes filter graphs and the final multiplex.
#[async_trait]
pub trait MediaRenderer: Send + Sync {
    fn name(&self) -> &str;

    async fn probe_audio(&self, path: &Path) -> Result<AudioHandle>;

    async fn probe_video(&self, path: &Path) -> Result<VideoHandle>;

    /// Render `graph` over `input` into `output`.
    async fn apply_audio_graph(
        &self,
        input: &AudioHandle,
        graph: &FilterGraph,
        output: &Path,
    ) -> Result<AudioHandle>;

    /// Mux video, audio and an optional caption track into `output`.
    async fn assemble(
        &self,
        video: &VideoHandle,
        audio: &AudioHandle,
        captions: Option<&Path>,
        output: &Path,
    ) -> Result<VideoHandle>;
}

/// Audio half of the correlation collaborator.
#[async_trait]
pub trait AudioSignalProbe: Send + Sync {
    /// 1.0 where speech is present, 0.0 elsewhere.
    async fn voice_activity(&self, audio: &AudioHandle, resolution: f64) -> Result<TimeSeries>;

    async fn energy(&self, audio: &AudioHandle, resolution: f64) -> Result<TimeSeries>;
}

/// Visual half of the correlation collaborator (motion or mouth openness).
#[async_trait]
pub trait VisualSignalProbe: Send + Sync {
    async fn motion(&self, video: &VideoHandle, resolution: f64) -> Result<TimeSeries>;
}
