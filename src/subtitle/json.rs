// JSON caption format
use super::{format_timestamp, SubtitleEntry, SubtitleFormatter};
use serde::Serialize;

#[derive(Default)]
pub struct JsonFormatter {
    pub source_file: Option<String>,
    pub language: Option<String>,
}

#[derive(Serialize)]
struct JsonOutput {
    metadata: JsonMetadata,
    cues: Vec<JsonCue>,
}

#[derive(Serialize)]
struct JsonMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    source_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    cue_count: usize,
    /// End of the last cue, in seconds.
    duration: f64,
}

#[derive(Serialize)]
struct JsonCue {
    index: usize,
    start: f64,
    end: f64,
    start_formatted: String,
    end_formatted: String,
    text: String,
}

impl SubtitleFormatter for JsonFormatter {
    fn format(&self, entries: &[SubtitleEntry]) -> String {
        let output = JsonOutput {
            metadata: JsonMetadata {
                source_file: self.source_file.clone(),
                language: self.language.clone(),
                cue_count: entries.len(),
                duration: entries.last().map(|e| e.end.as_secs_f64()).unwrap_or(0.0),
            },
            cues: entries
                .iter()
                .map(|e| JsonCue {
                    index: e.index,
                    start: e.start.as_secs_f64(),
                    end: e.end.as_secs_f64(),
                    start_formatted: format_timestamp(e.start, '.'),
                    end_formatted: format_timestamp(e.end, '.'),
                    text: e.text.clone(),
                })
                .collect(),
        };

        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_json_format() {
        let entries = vec![SubtitleEntry {
            index: 1,
            start: Duration::from_millis(1500),
            end: Duration::from_millis(4000),
            text: "Hallo zusammen".to_string(),
        }];

        let formatter = JsonFormatter {
            language: Some("de".to_string()),
            ..Default::default()
        };
        let output = formatter.format(&entries);

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["metadata"]["cue_count"], 1);
        assert_eq!(parsed["metadata"]["language"], "de");
        assert_eq!(parsed["cues"][0]["start"], 1.5);
        assert_eq!(parsed["cues"][0]["end_formatted"], "00:00:04.000");
        assert!(parsed["metadata"].get("source_file").is_none());
    }
}
