//! Lip-movement analysis collaborator.

use crate::error::Result;
use crate::media::{TimeSeries, VideoHandle};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPoint {
    pub timestamp: f64,
    /// Mouth-movement intensity in [0, 1].
    pub intensity: f64,
    pub confidence: f64,
}

/// Detected mouth movement over time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LipSyncReference {
    pub sync_points: Vec<SyncPoint>,
    pub confidence_level: f64,
}

impl LipSyncReference {
    pub fn new(mut sync_points: Vec<SyncPoint>, confidence_level: f64) -> Self {
        sync_points.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Self {
            sync_points,
            confidence_level,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sync_points.is_empty()
    }

    /// Mean intensity of the points in `[start, end)`, if any fall there.
    pub fn mean_intensity(&self, start: f64, end: f64) -> Option<f64> {
        let values: Vec<f64> = self
            .sync_points
            .iter()
            .filter(|p| p.timestamp >= start && p.timestamp < end)
            .map(|p| p.intensity.clamp(0.0, 1.0))
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }

    /// Intensity resampled onto a fixed grid covering `duration` seconds,
    /// holding the nearest earlier point.
    pub fn intensity_series(&self, duration: f64, resolution: f64) -> TimeSeries {
        if self.sync_points.is_empty() || resolution <= 0.0 || duration <= 0.0 {
            return TimeSeries::new(resolution, Vec::new());
        }
        let steps = (duration / resolution - 1e-9).ceil().max(1.0) as usize;
        let mut values = Vec::with_capacity(steps);
        let mut idx = 0;
        for step in 0..steps {
            let t = step as f64 * resolution;
            while idx + 1 < self.sync_points.len() && self.sync_points[idx + 1].timestamp <= t {
                idx += 1;
            }
            values.push(self.sync_points[idx].intensity.clamp(0.0, 1.0));
        }
        TimeSeries::new(resolution, values)
    }
}

#[async_trait]
pub trait LipSyncAnalyzer: Send + Sync {
    fn name(&self) -> &str;
    async fn analyze(&self, video: &VideoHandle) -> Result<LipSyncReference>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(timestamp: f64, intensity: f64) -> SyncPoint {
        SyncPoint {
            timestamp,
            intensity,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_points_are_ordered() {
        let reference = LipSyncReference::new(vec![point(1.0, 0.2), point(0.5, 0.8)], 0.9);
        assert_eq!(reference.sync_points[0].timestamp, 0.5);
    }

    #[test]
    fn test_mean_intensity_window() {
        let reference =
            LipSyncReference::new(vec![point(0.1, 0.2), point(0.4, 0.6), point(1.2, 1.0)], 0.9);
        let mean = reference.mean_intensity(0.0, 1.0).unwrap();
        assert!((mean - 0.4).abs() < 1e-9);
        assert!(reference.mean_intensity(2.0, 3.0).is_none());
    }

    #[test]
    fn test_intensity_series_holds_values() {
        let reference = LipSyncReference::new(vec![point(0.0, 0.1), point(0.2, 0.9)], 0.9);
        let series = reference.intensity_series(0.4, 0.1);
        assert_eq!(series.values, vec![0.1, 0.1, 0.9, 0.9]);
    }
}
