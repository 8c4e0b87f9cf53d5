use super::profile::{profile_for, Pace};
use super::syllables::{syllable_count, word_count, word_units};
use super::split_sentences;

/// Duration returned for empty text, and the lower clamp for any text.
pub const MIN_DURATION: f64 = 0.5;
/// Lower bound per word, in seconds.
pub const MIN_SECONDS_PER_WORD: f64 = 0.2;
/// Upper bound per word, in seconds.
pub const MAX_SECONDS_PER_WORD: f64 = 2.0;
/// Pause added for every punctuation mark.
pub const PUNCTUATION_PAUSE: f64 = 0.1;
/// Breath taken between consecutive sentences.
pub const SENTENCE_BREATH: f64 = 0.25;

/// Estimate how long `text` takes to speak in `language` at normal pace.
pub fn estimate(text: &str, language: &str) -> f64 {
    estimate_with_pace(text, language, Pace::Normal)
}

/// Estimate how long `text` takes to speak in `language` at `pace`.
///
/// The larger of the word-rate and syllable-rate durations is used so that an
/// underestimate never truncates speech. The word rate runs on
/// [`word_units`]; the clamp uses the whitespace [`word_count`], so the
/// result always lies in `[max(0.5, words * 0.2), words * 2.0]`.
pub fn estimate_with_pace(text: &str, language: &str, pace: Pace) -> f64 {
    let words = word_count(text);
    if words == 0 {
        return MIN_DURATION;
    }

    let profile = profile_for(language);
    let syllables = syllable_count(text, language);

    let units = word_units(text);
    let by_words = units as f64 / profile.words_per_minute.at(pace) * 60.0;
    let by_syllables = syllables as f64 / profile.syllables_per_minute.at(pace) * 60.0;
    let mut seconds = by_words.max(by_syllables);

    seconds *= profile.complexity_factor * profile.pause_factor;

    seconds += punctuation_marks(text) as f64 * PUNCTUATION_PAUSE;
    let sentences = split_sentences(text).len();
    seconds += sentences.saturating_sub(1) as f64 * SENTENCE_BREATH;

    let (lower, upper) = bounds(words);
    seconds.clamp(lower, upper)
}

/// Clamp interval for a text of `words` words.
pub fn bounds(words: usize) -> (f64, f64) {
    let lower = MIN_DURATION.max(words as f64 * MIN_SECONDS_PER_WORD);
    let upper = (words as f64 * MAX_SECONDS_PER_WORD).max(lower);
    (lower, upper)
}

fn punctuation_marks(text: &str) -> usize {
    text.chars().filter(|c| is_pause_mark(*c)).count()
}

fn is_pause_mark(c: char) -> bool {
    matches!(
        c,
        ',' | ';'
            | ':'
            | '.'
            | '!'
            | '?'
            | '…'
            | '—'
            | '–'
            | '、'
            | '，'
            | '。'
            | '！'
            | '？'
            | '；'
            | '：'
            | '،'
            | '؛'
            | '؟'
            | '۔'
            | '।'
            | '॥'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_floor() {
        assert_eq!(estimate("", "en"), 0.5);
        assert_eq!(estimate("   \n\t", "en"), 0.5);
    }

    #[test]
    fn test_longer_text_takes_longer() {
        let short = estimate("Hello there", "en");
        let long = estimate(
            "Hello there, this is a considerably longer sentence with many more words",
            "en",
        );
        assert!(long > short);
    }

    #[test]
    fn test_pace_ordering() {
        let text = "We are going to look at the results of the experiment together";
        let slow = estimate_with_pace(text, "en", Pace::Slow);
        let normal = estimate_with_pace(text, "en", Pace::Normal);
        let fast = estimate_with_pace(text, "en", Pace::Fast);
        assert!(slow > normal);
        assert!(normal > fast);
    }

    #[test]
    fn test_sentence_breaths_add_time() {
        let one = estimate("one two three four five six", "en");
        let two = estimate("one two three. four five six", "en");
        assert!(two > one);
    }

    #[test]
    fn test_within_bounds() {
        let samples = [
            ("Hi", "en"),
            ("a", "en"),
            ("Supercalifragilisticexpialidocious", "en"),
            ("Bonjour à tous, comment allez-vous aujourd'hui ?", "fr"),
            ("नमस्ते, आप कैसे हैं?", "hi"),
            ("今日はとても良い天気ですね。", "ja"),
            ("!!! ??? ...", "en"),
        ];
        for (text, lang) in samples {
            let words = word_count(text);
            let (lower, upper) = bounds(words);
            let d = estimate(text, lang);
            assert!(d >= lower && d <= upper, "{text}: {d} not in [{lower}, {upper}]");
        }
    }

    #[test]
    fn test_unspaced_text_clamped_by_whitespace_words() {
        let text = "今日はとても良い天気ですね。";
        assert_eq!(word_count(text), 1);
        let d = estimate(text, "ja");
        assert!(d <= 2.0, "{d}");
        assert!(d >= 0.5);

        // Two whitespace tokens widen the ceiling to 4s.
        let spaced = estimate("今日はとても良い天気ですね。 明日も晴れるでしょう。", "ja");
        assert!(spaced <= 4.0 && spaced > d, "{spaced}");
    }

    #[test]
    fn test_deterministic() {
        let text = "Deterministic estimates are repeatable.";
        assert_eq!(estimate(text, "en"), estimate(text, "en"));
    }
}
