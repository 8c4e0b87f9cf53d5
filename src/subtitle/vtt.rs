// WebVTT subtitle format
use super::{format_timestamp, SubtitleEntry, SubtitleFormatter};

pub struct VttFormatter;

impl SubtitleFormatter for VttFormatter {
    fn format(&self, entries: &[SubtitleEntry]) -> String {
        let mut output = String::from("WEBVTT\n\n");

        for entry in entries {
            output.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                entry.index,
                format_timestamp(entry.start, '.'),
                format_timestamp(entry.end, '.'),
                entry.text
            ));
        }

        output
    }

    fn extension(&self) -> &'static str {
        "vtt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_vtt_format() {
        let entries = vec![SubtitleEntry {
            index: 1,
            start: Duration::from_millis(1500),
            end: Duration::from_millis(4000),
            text: "Bonjour à tous".to_string(),
        }];

        let output = VttFormatter.format(&entries);

        assert!(output.starts_with("WEBVTT\n\n"));
        assert!(output.contains("1\n00:00:01.500 --> 00:00:04.000\nBonjour à tous"));
    }
}
