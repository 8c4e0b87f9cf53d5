use std::path::Path;

use async_trait::async_trait;
use hound::WavReader;
use tracing::debug;

use crate::error::{AutodubError, Result};

use super::{AudioHandle, AudioSignalProbe, TimeSeries};

/// Voice activity and energy series computed from PCM WAV files.
#[derive(Debug, Clone)]
pub struct WavSignalProbe {
    /// RMS energy threshold for speech detection (0.0 to 1.0).
    /// Lower values are more sensitive to quiet speech.
    pub energy_threshold: f64,
}

impl Default for WavSignalProbe {
    fn default() -> Self {
        Self {
            energy_threshold: 0.01,
        }
    }
}

impl WavSignalProbe {
    pub fn with_threshold(energy_threshold: f64) -> Self {
        Self { energy_threshold }
    }
}

/// Calculate RMS (Root Mean Square) energy of a sample window.
fn calculate_rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f64).sqrt()
}

/// Read a WAV file as mono samples in [-1, 1], with its sample rate.
fn read_mono(path: &Path) -> Result<(Vec<f64>, u32)> {
    let reader = WavReader::open(path)
        .map_err(|e| AutodubError::Signal(format!("Failed to open WAV file: {e}")))?;

    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;
    debug!(
        "Reading {}: {} Hz, {} channels, {} bits",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample
    );

    let interleaved: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f64 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| AutodubError::Signal(format!("Failed to read samples: {e}")))?
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| AutodubError::Signal(format!("Failed to read samples: {e}")))?,
    };

    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f64>() / frame.len() as f64)
        .collect();

    Ok((mono, spec.sample_rate))
}

/// RMS energy of consecutive windows of `resolution` seconds. A trailing
/// partial window is kept.
fn energy_profile(samples: &[f64], sample_rate: u32, resolution: f64) -> Result<Vec<f64>> {
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(AutodubError::Signal(format!(
            "Resolution must be positive, got {resolution}"
        )));
    }
    let window = ((sample_rate as f64 * resolution).round() as usize).max(1);
    Ok(samples.chunks(window).map(calculate_rms).collect())
}

#[async_trait]
impl AudioSignalProbe for WavSignalProbe {
    async fn voice_activity(&self, audio: &AudioHandle, resolution: f64) -> Result<TimeSeries> {
        let energy = self.energy(audio, resolution).await?;
        let values = energy
            .values
            .iter()
            .map(|&e| if e >= self.energy_threshold { 1.0 } else { 0.0 })
            .collect();
        Ok(TimeSeries::new(resolution, values))
    }

    async fn energy(&self, audio: &AudioHandle, resolution: f64) -> Result<TimeSeries> {
        let (samples, sample_rate) = read_mono(&audio.path)?;
        let values = energy_profile(&samples, sample_rate, resolution)?;
        debug!(
            "Energy profile of {}: {} windows",
            audio.path.display(),
            values.len()
        );
        Ok(TimeSeries::new(resolution, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};

    fn write_wav(path: &Path, sample_rate: u32, samples: &[i16]) {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_calculate_rms_silence() {
        assert_eq!(calculate_rms(&[0.0; 100]), 0.0);
    }

    #[test]
    fn test_calculate_rms_loud() {
        let rms = calculate_rms(&[1.0; 100]);
        assert!((rms - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_energy_profile_windows() {
        let samples: Vec<f64> = (0..250).map(|i| if i < 100 { 0.5 } else { 0.0 }).collect();
        let profile = energy_profile(&samples, 1000, 0.1).unwrap();
        assert_eq!(profile.len(), 3);
        assert!((profile[0] - 0.5).abs() < 1e-9);
        assert_eq!(profile[1], 0.0);
        assert!(energy_profile(&samples, 1000, 0.0).is_err());
    }

    #[tokio::test]
    async fn test_voice_activity_from_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speech.wav");
        // 0.2s silence, 0.2s tone, 0.1s silence at 1 kHz.
        let mut samples = vec![0i16; 200];
        samples.extend((0..200).map(|i| if i % 2 == 0 { 8000 } else { -8000 }));
        samples.extend(vec![0i16; 100]);
        write_wav(&path, 1000, &samples);

        let probe = WavSignalProbe::default();
        let handle = AudioHandle::new(&path, 0.5);
        let activity = probe.voice_activity(&handle, 0.1).await.unwrap();
        assert_eq!(activity.values, vec![0.0, 0.0, 1.0, 1.0, 0.0]);
        assert!((activity.duration() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_missing_wav_is_signal_error() {
        let probe = WavSignalProbe::default();
        let handle = AudioHandle::new("/nonexistent/a.wav", 1.0);
        let err = tokio_test::block_on(probe.energy(&handle, 0.1)).unwrap_err();
        assert!(matches!(err, AutodubError::Signal(_)));
    }
}
