use super::phrases::phrases_for;
use super::tagger::{importance, tag_word};
use crate::config::ConstraintPolicy;
use crate::speech::{estimate, is_terminator, split_sentences};
use tracing::debug;

pub const ELLIPSIS: &str = "...";

/// Shorten `text` so that its estimate fits `target` seconds.
pub(crate) fn shorten(text: &str, target: f64, language: &str, policy: &ConstraintPolicy) -> String {
    let sentences = split_sentences(text);
    if sentences.len() <= 1 {
        let ratio = target / estimate(text, language);
        return shorten_sentence(text.trim(), ratio, language, policy);
    }

    if let Some(selected) = select_sentences(&sentences, target, language, policy) {
        return selected;
    }

    // Nothing fits whole; cut the most important sentence down instead.
    let top = sentences
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| {
            importance(a, language)
                .total_cmp(&importance(b, language))
                .then(ib.cmp(ia))
        })
        .map(|(_, s)| s.as_str())
        .unwrap_or(text);
    let ratio = target / estimate(top, language);
    debug!("No sentence fits {:.2}s, cutting top sentence down (ratio {:.2})", target, ratio);
    shorten_sentence(top, ratio, language, policy)
}

/// Drop words from a single sentence. Core words are kept first, then
/// fillers in their original order; an ellipsis marks the cut.
pub(crate) fn shorten_sentence(
    sentence: &str,
    ratio: f64,
    language: &str,
    policy: &ConstraintPolicy,
) -> String {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    let budget = ((words.len() as f64 * ratio * policy.word_safety_margin).floor() as usize).max(1);
    if budget >= words.len() {
        return sentence.to_string();
    }

    let (core, filler): (Vec<usize>, Vec<usize>) =
        (0..words.len()).partition(|&i| tag_word(words[i], language).is_core());

    let mut keep: Vec<usize> = core.into_iter().chain(filler).take(budget).collect();
    keep.sort_unstable();

    let kept: Vec<&str> = keep.iter().map(|&i| words[i]).collect();
    let joined = if phrases_for(language).spaced {
        kept.join(" ")
    } else {
        kept.concat()
    };
    with_ellipsis(&joined)
}

fn with_ellipsis(text: &str) -> String {
    let stripped = text.trim_end_matches(|c: char| is_terminator(c) || ",;:،、，".contains(c));
    format!("{}{}", stripped, ELLIPSIS)
}

/// Greedily keep the most important sentences that still fit within the
/// sentence budget, reassembled in their original order.
fn select_sentences(
    sentences: &[String],
    target: f64,
    language: &str,
    policy: &ConstraintPolicy,
) -> Option<String> {
    let budget = target * policy.sentence_budget;
    let table = phrases_for(language);

    let mut ranked: Vec<(usize, f64)> = sentences
        .iter()
        .enumerate()
        .map(|(i, s)| (i, importance(s, language)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut accepted: Vec<usize> = Vec::new();
    for (index, score) in ranked {
        let mut candidate = accepted.clone();
        candidate.push(index);
        candidate.sort_unstable();
        let text = table.join(&candidate.iter().map(|&i| sentences[i].clone()).collect::<Vec<_>>());
        if estimate(&text, language) <= budget {
            debug!("Keeping sentence {} (importance {:.1})", index, score);
            accepted = candidate;
        }
    }

    if accepted.is_empty() {
        return None;
    }
    Some(table.join(&accepted.iter().map(|&i| sentences[i].clone()).collect::<Vec<_>>()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::word_count;

    #[test]
    fn test_shorten_sentence_keeps_core_words() {
        let policy = ConstraintPolicy::default();
        let out = shorten_sentence(
            "well the engine really runs very smoothly at night",
            0.5,
            "en",
            &policy,
        );
        assert!(out.ends_with(ELLIPSIS));
        assert!(out.contains("engine"));
        assert!(out.contains("night"));
        assert!(!out.contains("really"));
    }

    #[test]
    fn test_shorten_sentence_budget() {
        let policy = ConstraintPolicy::default();
        let sentence = "one two three four five six seven eight nine ten";
        let out = shorten_sentence(sentence, 0.5, "en", &policy);
        // 10 * 0.5 * 0.9 = 4.5 -> 4 words
        assert_eq!(word_count(&out), 4);
    }

    #[test]
    fn test_no_cut_when_budget_covers_sentence() {
        let policy = ConstraintPolicy::default();
        assert_eq!(shorten_sentence("short one", 1.5, "en", &policy), "short one");
    }

    #[test]
    fn test_ellipsis_replaces_terminal_punctuation() {
        assert_eq!(with_ellipsis("we went home."), "we went home...");
        assert_eq!(with_ellipsis("we went,"), "we went...");
    }

    #[test]
    fn test_select_sentences_prefers_important_ones() {
        let policy = ConstraintPolicy::default();
        let text = "Well, you know. The reactor produces 300 megawatts of power. Okay then.";
        let target = estimate("The reactor produces 300 megawatts of power.", "en") * 1.1;
        let out = shorten(text, target, "en", &policy);
        assert_eq!(out, "The reactor produces 300 megawatts of power.");
    }

    #[test]
    fn test_select_keeps_original_order() {
        let policy = ConstraintPolicy::default();
        let sentences = vec![
            "Where is the station?".to_string(),
            "Hmm.".to_string(),
            "The train leaves at 9 tonight.".to_string(),
        ];
        let target = estimate("Where is the station? The train leaves at 9 tonight.", "en") / 0.9;
        let out = select_sentences(&sentences, target, "en", &policy).unwrap();
        assert_eq!(out, "Where is the station? The train leaves at 9 tonight.");
    }
}
