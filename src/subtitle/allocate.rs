use crate::speech::{split_sentences, word_count};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A sentence with the slice of the total duration allocated to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSegment {
    pub index: usize,
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    pub word_count: usize,
}

/// Spread `total_duration` over the sentences of `full_text` in proportion
/// to their word counts. Segments are contiguous from zero and the last one
/// ends exactly at `total_duration`. Text without a sentence terminator
/// becomes a single segment.
pub fn allocate(full_text: &str, total_duration: f64) -> Vec<TimedSegment> {
    let total = if total_duration.is_finite() {
        total_duration.max(0.0)
    } else {
        0.0
    };

    let sentences = split_sentences(full_text);
    if sentences.is_empty() {
        return Vec::new();
    }

    let counts: Vec<usize> = sentences.iter().map(|s| word_count(s)).collect();
    let total_words: usize = counts.iter().sum();
    let last = sentences.len() - 1;

    let mut segments = Vec::with_capacity(sentences.len());
    let mut cursor = 0.0;
    for (i, (text, words)) in sentences.into_iter().zip(counts).enumerate() {
        let share = if total_words == 0 {
            total / (last + 1) as f64
        } else {
            total * words as f64 / total_words as f64
        };
        let start = cursor;
        let end = if i == last {
            total
        } else {
            (start + share).min(total)
        };
        cursor = end;

        segments.push(TimedSegment {
            index: i,
            text,
            start,
            end,
            duration: end - start,
            word_count: words,
        });
    }

    debug!(
        "Allocated {:.2}s over {} segments ({} words)",
        total,
        segments.len(),
        total_words
    );
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_by_words() {
        let segments = allocate("One two three. Four.", 8.0);
        assert_eq!(segments.len(), 2);
        assert!((segments[0].duration - 6.0).abs() < 1e-9);
        assert!((segments[1].duration - 2.0).abs() < 1e-9);
        assert_eq!(segments[1].start, segments[0].end);
    }

    #[test]
    fn test_single_catch_all_segment() {
        let segments = allocate("no terminator here", 3.0);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].end, 3.0);
    }

    #[test]
    fn test_sum_matches_total() {
        let text = "Uno. Dos tres. Cuatro cinco seis. Siete ocho nueve diez. Once.";
        let total = 7.3;
        let segments = allocate(text, total);
        let sum: f64 = segments.iter().map(|s| s.duration).sum();
        assert!((sum - total).abs() < 1e-9);
        assert_eq!(segments.last().unwrap().end, total);
        for pair in segments.windows(2) {
            assert!(pair[0].end <= pair[1].start + 1e-12);
            assert!(pair[0].start <= pair[1].start);
        }
    }

    #[test]
    fn test_mixed_scripts() {
        let segments = allocate("नमस्ते दोस्तों। 今日は。 Hello there!", 6.0);
        assert_eq!(segments.len(), 3);
    }

    #[test]
    fn test_empty_text() {
        assert!(allocate("   ", 5.0).is_empty());
    }
}
