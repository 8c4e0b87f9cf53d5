//! Word and syllable counting across writing systems.
//!
//! Scripts are detected per character from their Unicode block. Each script
//! has its own syllable rule; anything unrecognised is counted with the Latin
//! vowel-group heuristic.

use super::profile::primary_subtag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Latin,
    Cyrillic,
    Greek,
    /// Brahmic abugida; carries the base code point of its 128-char block.
    Indic(u32),
    Arabic,
    Hebrew,
    Han,
    Kana,
    Hangul,
    Digit,
    Other,
}

impl Script {
    /// Scripts written without spaces between words.
    pub fn is_unspaced(self) -> bool {
        matches!(self, Script::Han | Script::Kana)
    }
}

pub fn script_of(c: char) -> Script {
    let cp = c as u32;
    match cp {
        _ if c.is_ascii_digit() => Script::Digit,
        0x0041..=0x024F | 0x1E00..=0x1EFF => {
            if c.is_alphabetic() {
                Script::Latin
            } else {
                Script::Other
            }
        }
        0x0370..=0x03FF | 0x1F00..=0x1FFF => Script::Greek,
        0x0400..=0x052F => Script::Cyrillic,
        0x0590..=0x05FF => Script::Hebrew,
        0x0600..=0x06FF | 0x0750..=0x077F | 0x08A0..=0x08FF => Script::Arabic,
        0x0900..=0x0D7F => Script::Indic(cp & !0x7F),
        0x3040..=0x30FF | 0x31F0..=0x31FF => Script::Kana,
        0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF => Script::Han,
        0xAC00..=0xD7A3 => Script::Hangul,
        _ => Script::Other,
    }
}

/// Whitespace-delimited word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Word units for speaking-rate purposes. Same as [`word_count`] for spaced
/// scripts; unspaced scripts count one unit per character so that a
/// Japanese or Chinese sentence is not read at the rate of a single word.
pub fn word_units(text: &str) -> usize {
    text.split_whitespace().map(token_units).sum()
}

fn token_units(token: &str) -> usize {
    let unspaced = token
        .chars()
        .filter(|&c| script_of(c).is_unspaced())
        .count();
    if unspaced == 0 {
        return 1;
    }
    let has_other = token
        .chars()
        .any(|c| c.is_alphanumeric() && !script_of(c).is_unspaced());
    unspaced + usize::from(has_other)
}

/// Estimated syllable (or mora) count for the whole text.
pub fn syllable_count(text: &str, language: &str) -> usize {
    let lang = primary_subtag(language);
    text.split_whitespace()
        .map(|word| word_syllables(word, &lang))
        .sum()
}

fn word_syllables(word: &str, lang: &str) -> usize {
    let mut total = 0;
    let mut run = String::new();
    let mut run_script = Script::Other;

    for c in word.chars() {
        let script = script_of(c);
        let letter = c.is_alphanumeric() || is_combining_mark(c);
        if !letter {
            total += run_syllables(&run, run_script, lang);
            run.clear();
            continue;
        }
        // Combining marks belong to the run they follow.
        let script = if is_combining_mark(c) && !run.is_empty() {
            run_script
        } else {
            script
        };
        if !run.is_empty() && script != run_script {
            total += run_syllables(&run, run_script, lang);
            run.clear();
        }
        run_script = script;
        run.push(c);
    }
    total += run_syllables(&run, run_script, lang);

    if total == 0 && word.chars().any(|c| c.is_alphanumeric()) {
        1
    } else {
        total
    }
}

fn is_combining_mark(c: char) -> bool {
    let cp = c as u32;
    // Indic vowel signs and viramas, Arabic/Hebrew points, generic combining
    // diacritics.
    (0x0300..=0x036F).contains(&cp)
        || (0x0591..=0x05C7).contains(&cp)
        || (0x064B..=0x065F).contains(&cp)
        || ((0x0900..=0x0D7F).contains(&cp) && {
            let offset = cp & 0x7F;
            (0x00..=0x03).contains(&offset)
                || (0x3A..=0x57).contains(&offset)
                || (0x62..=0x63).contains(&offset)
        })
}

fn run_syllables(run: &str, script: Script, lang: &str) -> usize {
    if run.is_empty() {
        return 0;
    }
    let count = match script {
        Script::Cyrillic => run
            .chars()
            .flat_map(char::to_lowercase)
            .filter(|c| "аеёиоуыэюяіїєў".contains(*c))
            .count(),
        Script::Greek => vowel_groups(run, "αεηιουωάέήίόύώϊϋΐΰ"),
        Script::Indic(base) => indic_syllables(run, base),
        Script::Arabic | Script::Hebrew => {
            let letters = run.chars().filter(|c| c.is_alphabetic()).count();
            letters.div_ceil(2)
        }
        Script::Han | Script::Hangul => run.chars().count(),
        Script::Kana => run.chars().filter(|c| !is_small_kana(*c)).count(),
        Script::Digit => run.chars().count(),
        Script::Latin | Script::Other => latin_syllables(run, lang),
    };
    count.max(1)
}

const LATIN_VOWELS: &str = "aeiouyàáâãäåæèéêëìíîïòóôõöøùúûüýÿœ";

fn latin_syllables(word: &str, lang: &str) -> usize {
    let lower = word.to_lowercase();
    let mut count = vowel_groups(&lower, LATIN_VOWELS);

    if count > 1 {
        match lang {
            "en" => {
                // Silent final "e", except the syllabic "-le" ending.
                if lower.ends_with('e') && !ends_with_consonant_le(&lower) {
                    count -= 1;
                }
            }
            "fr" => {
                if lower.ends_with('e') || lower.ends_with("es") || lower.ends_with("ent") {
                    count -= 1;
                }
            }
            _ => {}
        }
    }

    count
}

fn ends_with_consonant_le(word: &str) -> bool {
    let chars: Vec<char> = word.chars().collect();
    let n = chars.len();
    n >= 3 && chars[n - 2] == 'l' && chars[n - 1] == 'e' && !LATIN_VOWELS.contains(chars[n - 3])
}

fn vowel_groups(text: &str, vowels: &str) -> usize {
    let mut groups = 0;
    let mut in_group = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        let is_vowel = vowels.contains(c);
        if is_vowel && !in_group {
            groups += 1;
        }
        in_group = is_vowel;
    }
    groups
}

/// One syllable per independent vowel or consonant cluster head. A consonant
/// followed by a virama joins the next consonant's syllable.
fn indic_syllables(run: &str, base: u32) -> usize {
    let chars: Vec<u32> = run.chars().map(|c| c as u32).collect();
    let virama = base + 0x4D;
    let mut count = 0;
    for (i, &cp) in chars.iter().enumerate() {
        let offset = cp.wrapping_sub(base);
        let independent_vowel = (0x04..=0x14).contains(&offset) || (0x60..=0x61).contains(&offset);
        let consonant = (0x15..=0x39).contains(&offset) || (0x58..=0x5F).contains(&offset);
        if independent_vowel {
            count += 1;
        } else if consonant && chars.get(i + 1) != Some(&virama) {
            count += 1;
        }
    }
    count
}

fn is_small_kana(c: char) -> bool {
    "ぁぃぅぇぉっゃゅょゎァィゥェォッャュョヮ".contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_detection() {
        assert_eq!(script_of('a'), Script::Latin);
        assert_eq!(script_of('é'), Script::Latin);
        assert_eq!(script_of('д'), Script::Cyrillic);
        assert_eq!(script_of('क'), Script::Indic(0x0900));
        assert_eq!(script_of('க'), Script::Indic(0x0B80));
        assert_eq!(script_of('م'), Script::Arabic);
        assert_eq!(script_of('日'), Script::Han);
        assert_eq!(script_of('か'), Script::Kana);
        assert_eq!(script_of('한'), Script::Hangul);
        assert_eq!(script_of('7'), Script::Digit);
    }

    #[test]
    fn test_english_syllables() {
        assert_eq!(syllable_count("hello", "en"), 2);
        assert_eq!(syllable_count("make", "en"), 1);
        assert_eq!(syllable_count("table", "en"), 2);
        assert_eq!(syllable_count("beautiful", "en"), 3);
        assert_eq!(syllable_count("the cat sat", "en"), 3);
    }

    #[test]
    fn test_every_word_has_a_syllable() {
        assert_eq!(syllable_count("rhythm", "en"), 1);
        assert_eq!(syllable_count("hmm", "de"), 1);
    }

    #[test]
    fn test_spanish_keeps_final_e() {
        assert_eq!(syllable_count("grande", "es"), 2);
    }

    #[test]
    fn test_cyrillic_syllables() {
        // при-вет
        assert_eq!(syllable_count("привет", "ru"), 2);
    }

    #[test]
    fn test_devanagari_syllables() {
        // न-म-स्ते: the virama joins स with त
        assert_eq!(syllable_count("नमस्ते", "hi"), 3);
    }

    #[test]
    fn test_cjk_counts() {
        assert_eq!(syllable_count("日本語", "ja"), 3);
        // ちょ is a single mora
        assert_eq!(syllable_count("ちょっと", "ja"), 2);
        assert_eq!(syllable_count("안녕하세요", "ko"), 5);
    }

    #[test]
    fn test_word_count_spaced_and_unspaced() {
        assert_eq!(word_count("the quick brown fox"), 4);
        assert_eq!(word_count("   "), 0);
        assert_eq!(word_count("今日は"), 1);
        assert_eq!(word_count("hello 世界"), 2);
        assert_eq!(word_units("the quick brown fox"), 4);
        assert_eq!(word_units("今日は"), 3);
        assert_eq!(word_units("hello 世界"), 3);
    }

    #[test]
    fn test_digits_count_as_syllables() {
        assert_eq!(syllable_count("2024", "en"), 4);
    }
}
