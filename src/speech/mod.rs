pub mod estimate;
pub mod profile;
pub mod syllables;

pub use estimate::{bounds, estimate, estimate_with_pace};
pub use profile::{profile_for, LanguageSpeechProfile, Pace, PaceRates};
pub use syllables::{script_of, syllable_count, word_count, word_units, Script};

/// Sentence terminators across Latin, Devanagari, Arabic/Urdu and CJK text.
pub const SENTENCE_TERMINATORS: &[char] = &[
    '.', '!', '?', '…', '।', '॥', '۔', '؟', '。', '！', '？', '．',
];

/// Closing characters that stay attached to the sentence they end.
const TRAILING_CLOSERS: &[char] = &['"', '\'', '”', '’', ')', ']', '」', '』', '）', '»'];

pub fn is_terminator(c: char) -> bool {
    SENTENCE_TERMINATORS.contains(&c)
}

/// Split text into trimmed, non-empty sentences, keeping each terminator on
/// its sentence. Text without any terminator comes back as one sentence.
/// A period between two digits ("3.5") does not end a sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        current.push(c);

        let decimal_point = c == '.'
            && i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());

        if is_terminator(c) && !decimal_point {
            while let Some(&next) = chars.get(i + 1) {
                if is_terminator(next) || TRAILING_CLOSERS.contains(&next) {
                    current.push(next);
                    i += 1;
                } else {
                    break;
                }
            }
            push_trimmed(&mut sentences, &current);
            current.clear();
        }
        i += 1;
    }
    push_trimmed(&mut sentences, &current);

    sentences
}

fn push_trimmed(sentences: &mut Vec<String>, sentence: &str) {
    let trimmed = sentence.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}
