use super::phrases::phrases_for;
use crate::config::ConstraintPolicy;
use crate::speech::{estimate, is_terminator, split_sentences};
use tracing::debug;

/// Sentences with more words than this may receive a mid-sentence pause.
const LONG_SENTENCE_WORDS: usize = 8;

const INTERNAL_PUNCTUATION: &[char] = &[',', ';', ':', '—', '–', '،', '、', '，', '；', '：'];

/// Lengthen `text` towards `target` seconds. Gaps smaller than the policy's
/// minimum are left alone. Steps run in order and stop as soon as the
/// estimate reaches the acceptance band.
pub(crate) fn expand(text: &str, target: f64, language: &str, policy: &ConstraintPolicy) -> String {
    let gap = target - estimate(text, language);
    if gap < policy.min_expansion_gap {
        debug!("Gap {:.2}s too small to expand", gap);
        return text.to_string();
    }

    let table = phrases_for(language);
    let goal = target * policy.accept_low;
    let mut sentences = split_sentences(text);
    if sentences.is_empty() {
        return text.to_string();
    }
    let reached = |sentences: &[String]| estimate(&table.join(sentences), language) >= goal;

    // Fillers at every other sentence boundary.
    for (n, i) in (1..sentences.len()).step_by(2).enumerate() {
        let filler = table.fillers[n % table.fillers.len()];
        sentences[i] = table.prefix(filler, &sentences[i]);
        if reached(&sentences) {
            return table.join(&sentences);
        }
    }

    // A pause in the middle of long, unbroken sentences.
    for i in 0..sentences.len() {
        if let Some(paused) = insert_pause(&sentences[i], table.pause_mark) {
            sentences[i] = paused;
            if reached(&sentences) {
                return table.join(&sentences);
            }
        }
    }

    sentences[0] = table.prefix(table.emphasis, &sentences[0]);
    table.join(&sentences)
}

fn insert_pause(sentence: &str, mark: &str) -> Option<String> {
    let mut words: Vec<String> = sentence.split_whitespace().map(str::to_string).collect();
    if words.len() <= LONG_SENTENCE_WORDS {
        return None;
    }
    let body = sentence.trim_end_matches(|c: char| is_terminator(c) || c.is_whitespace());
    if body.contains(INTERNAL_PUNCTUATION) {
        return None;
    }
    let mid = words.len() / 2;
    words[mid - 1].push_str(mark);
    Some(words.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_gap_unchanged() {
        let policy = ConstraintPolicy::default();
        let text = "We start now. Everyone is here.";
        let target = estimate(text, "en") + 0.3;
        assert_eq!(expand(text, target, "en", &policy), text);
    }

    #[test]
    fn test_filler_goes_to_second_sentence() {
        let policy = ConstraintPolicy::default();
        let text = "We start now. Everyone is here.";
        let target = estimate(text, "en") + 0.6;
        let out = expand(text, target, "en", &policy);
        assert_eq!(out, "We start now. In fact, everyone is here.");
    }

    #[test]
    fn test_emphasis_as_last_resort() {
        let policy = ConstraintPolicy::default();
        let text = "Everyone is here.";
        let out = expand(text, 30.0, "en", &policy);
        assert_eq!(out, "Indeed, everyone is here.");
    }

    #[test]
    fn test_pause_inserted_in_long_sentence() {
        assert_eq!(
            insert_pause("one two three four five six seven eight nine ten.", ","),
            Some("one two three four five, six seven eight nine ten.".to_string())
        );
        assert_eq!(insert_pause("one two, three four five six seven eight nine.", ","), None);
        assert_eq!(insert_pause("too short to pause.", ","), None);
    }

    #[test]
    fn test_language_specific_phrases() {
        let policy = ConstraintPolicy::default();
        let out = expand("Todo está listo.", 30.0, "es", &policy);
        assert!(out.starts_with("Realmente,"));
    }
}
