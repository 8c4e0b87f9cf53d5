use crate::media::TimeSeries;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OffsetMatch {
    /// Seconds the audio trails the video (negative: audio leads).
    pub offset: f64,
    pub correlation: f64,
}

/// Pearson correlation of two equally long slices. `None` when either side
/// is constant or there are fewer than two samples.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len().min(b.len());
    if n < 2 {
        return None;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a <= f64::EPSILON || var_b <= f64::EPSILON {
        return None;
    }
    Some((cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0))
}

/// Correlation of `audio` shifted by `lag` samples against `video`.
fn lagged(video: &[f64], audio: &[f64], lag: i64) -> Option<f64> {
    let (v, a) = if lag >= 0 {
        let lag = lag as usize;
        if lag >= audio.len() {
            return None;
        }
        (video, &audio[lag..])
    } else {
        let lag = lag.unsigned_abs() as usize;
        if lag >= video.len() {
            return None;
        }
        (&video[lag..], audio)
    };
    pearson(v, a)
}

/// Search offsets within ±`search_window` seconds, in steps of the series
/// resolution, for the one where audio best correlates with video. Smaller
/// offsets win ties.
pub fn best_offset(video: &TimeSeries, audio: &TimeSeries, search_window: f64) -> Option<OffsetMatch> {
    let resolution = video.resolution;
    if !(resolution > 0.0) || (audio.resolution - resolution).abs() > 1e-9 {
        return None;
    }
    let max_lag = (search_window.max(0.0) / resolution).round() as i64;

    let mut best: Option<(i64, f64)> = None;
    for step in 0..=max_lag {
        for lag in if step == 0 { vec![0] } else { vec![-step, step] } {
            if let Some(r) = lagged(&video.values, &audio.values, lag) {
                if best.map_or(true, |(_, b)| r > b) {
                    best = Some((lag, r));
                }
            }
        }
    }

    best.map(|(lag, correlation)| OffsetMatch {
        offset: lag as f64 * resolution,
        correlation,
    })
}

/// Correlation at a fixed offset in seconds, using the same sign convention
/// as [`best_offset`].
pub fn correlation_at(video: &TimeSeries, audio: &TimeSeries, offset: f64) -> Option<f64> {
    if !(video.resolution > 0.0) || (audio.resolution - video.resolution).abs() > 1e-9 {
        return None;
    }
    let lag = (offset / video.resolution).round() as i64;
    lagged(&video.values, &audio.values, lag)
}
