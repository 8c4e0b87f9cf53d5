use super::{seconds_to_duration, SubtitleEntry, TimedSegment};
use crate::transcribe::WordTiming;
use tracing::debug;

/// Split each timed sentence into cues of at most `words_per_cue` words.
/// Every word of a sentence gets an equal share of the sentence's time and
/// the last cue of a sentence ends exactly where the sentence ends.
pub fn build_cues(segments: &[TimedSegment], words_per_cue: usize) -> Vec<SubtitleEntry> {
    let per_cue = words_per_cue.max(1);
    let mut cues = Vec::new();

    for segment in segments {
        let words: Vec<&str> = segment.text.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        let per_word = segment.duration / words.len() as f64;
        let groups = words.chunks(per_cue).count();

        for (g, group) in words.chunks(per_cue).enumerate() {
            let first = g * per_cue;
            let start = segment.start + first as f64 * per_word;
            let end = if g + 1 == groups {
                segment.end
            } else {
                segment.start + (first + group.len()) as f64 * per_word
            };
            cues.push(SubtitleEntry {
                index: cues.len() + 1,
                start: seconds_to_duration(start),
                end: seconds_to_duration(end),
                text: group.join(" "),
            });
        }
    }

    cues
}

/// Move cue boundaries onto measured word timings. Only applied when the
/// alignment has exactly one timing per caption word; returns whether the
/// cues were changed. Snapped cues stay ordered and never overlap.
pub fn snap_cues_to_alignment(cues: &mut [SubtitleEntry], words: &[WordTiming]) -> bool {
    let caption_words: usize = cues.iter().map(|c| c.text.split_whitespace().count()).sum();
    if caption_words == 0 || caption_words != words.len() {
        debug!(
            "Not snapping captions: {} caption words vs {} aligned words",
            caption_words,
            words.len()
        );
        return false;
    }

    let mut offset = 0;
    let mut previous_end = seconds_to_duration(0.0);
    for cue in cues.iter_mut() {
        let count = cue.text.split_whitespace().count();
        if count == 0 {
            continue;
        }
        let span = &words[offset..offset + count];
        offset += count;

        let start = seconds_to_duration(span[0].start).max(previous_end);
        let end = seconds_to_duration(span[count - 1].end).max(start);
        cue.start = start;
        cue.end = end;
        previous_end = end;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::allocate;
    use std::time::Duration;

    #[test]
    fn test_build_cues_groups_words() {
        let segments = allocate("one two three four five six seven.", 7.0);
        let cues = build_cues(&segments, 5);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "one two three four five");
        assert_eq!(cues[0].start, Duration::ZERO);
        assert_eq!(cues[0].end, Duration::from_secs(5));
        assert_eq!(cues[1].text, "six seven.");
        assert_eq!(cues[1].end, Duration::from_secs(7));
        assert_eq!(cues[1].index, 2);
    }

    #[test]
    fn test_cues_are_sequential() {
        let segments = allocate("Hola a todos. ¿Cómo están hoy? Muy bien, gracias.", 6.0);
        let cues = build_cues(&segments, 2);
        for (i, cue) in cues.iter().enumerate() {
            assert_eq!(cue.index, i + 1);
            assert!(cue.start <= cue.end);
        }
        for pair in cues.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        assert_eq!(cues.last().unwrap().end, Duration::from_secs(6));
    }

    #[test]
    fn test_snap_to_alignment() {
        let segments = allocate("one two three.", 3.0);
        let mut cues = build_cues(&segments, 2);
        let words = vec![
            WordTiming::new("one", 0.2, 0.5),
            WordTiming::new("two", 0.6, 0.9),
            WordTiming::new("three.", 1.4, 2.1),
        ];
        assert!(snap_cues_to_alignment(&mut cues, &words));
        assert_eq!(cues[0].start, Duration::from_millis(200));
        assert_eq!(cues[0].end, Duration::from_millis(900));
        assert_eq!(cues[1].start, Duration::from_millis(1400));
        assert_eq!(cues[1].end, Duration::from_millis(2100));
    }

    #[test]
    fn test_snap_skipped_on_word_mismatch() {
        let segments = allocate("one two three.", 3.0);
        let mut cues = build_cues(&segments, 2);
        let before = cues.clone();
        let words = vec![WordTiming::new("one", 0.0, 0.5)];
        assert!(!snap_cues_to_alignment(&mut cues, &words));
        assert_eq!(cues, before);
    }

    #[test]
    fn test_snap_removes_overlap() {
        let segments = allocate("a b c d.", 4.0);
        let mut cues = build_cues(&segments, 2);
        let words = vec![
            WordTiming::new("a", 0.0, 0.5),
            WordTiming::new("b", 0.5, 1.5),
            WordTiming::new("c", 1.2, 1.8),
            WordTiming::new("d.", 1.8, 2.0),
        ];
        assert!(snap_cues_to_alignment(&mut cues, &words));
        assert!(cues[0].end <= cues[1].start);
    }
}
