pub mod allocate;
pub mod cues;
pub mod json;
pub mod srt;
pub mod vtt;

pub use allocate::{allocate, TimedSegment};
pub use cues::{build_cues, snap_cues_to_alignment};

use crate::config::CaptionFormat;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// One caption cue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleEntry {
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

pub trait SubtitleFormatter {
    fn format(&self, entries: &[SubtitleEntry]) -> String;
    fn extension(&self) -> &'static str;
}

pub fn create_formatter(format: CaptionFormat, language: Option<&str>) -> Box<dyn SubtitleFormatter> {
    match format {
        CaptionFormat::Srt => Box::new(srt::SrtFormatter),
        CaptionFormat::Vtt => Box::new(vtt::VttFormatter),
        CaptionFormat::Json => Box::new(json::JsonFormatter {
            language: language.map(str::to_string),
            ..Default::default()
        }),
    }
}

/// Render `entries` in `format` and write them to `path`.
pub fn write_captions(
    entries: &[SubtitleEntry],
    format: CaptionFormat,
    language: Option<&str>,
    path: &Path,
) -> Result<()> {
    let formatter = create_formatter(format, language);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, formatter.format(entries))?;
    Ok(())
}

/// `HH:MM:SS<sep>mmm` with zero-padded fields.
pub fn format_timestamp(d: Duration, millis_separator: char) -> String {
    let total_millis = d.as_millis();
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let seconds = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    format!(
        "{:02}:{:02}:{:02}{}{:03}",
        hours, minutes, seconds, millis_separator, millis
    )
}

/// Seconds to `Duration`, rounded to the millisecond. Negative and
/// non-finite values map to zero.
pub fn seconds_to_duration(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_millis((seconds * 1000.0).round() as u64)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp_separators() {
        let d = Duration::from_secs(3661) + Duration::from_millis(123);
        assert_eq!(format_timestamp(d, ','), "01:01:01,123");
        assert_eq!(format_timestamp(d, '.'), "01:01:01.123");
        assert_eq!(format_timestamp(Duration::ZERO, '.'), "00:00:00.000");
    }

    #[test]
    fn test_seconds_to_duration_rounds() {
        assert_eq!(seconds_to_duration(1.2345), Duration::from_millis(1235));
        assert_eq!(seconds_to_duration(-1.0), Duration::ZERO);
        assert_eq!(seconds_to_duration(f64::NAN), Duration::ZERO);
    }

    #[test]
    fn test_create_formatter_extensions() {
        assert_eq!(create_formatter(CaptionFormat::Srt, None).extension(), "srt");
        assert_eq!(create_formatter(CaptionFormat::Vtt, None).extension(), "vtt");
        assert_eq!(create_formatter(CaptionFormat::Json, Some("es")).extension(), "json");
    }

    #[test]
    fn test_write_captions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.vtt");
        let entries = vec![SubtitleEntry {
            index: 1,
            start: Duration::ZERO,
            end: Duration::from_millis(900),
            text: "Hola".to_string(),
        }];
        write_captions(&entries, CaptionFormat::Vtt, None, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("WEBVTT"));
    }
}
