use crate::speech::profile::primary_subtag;

/// Language-specific material used to lengthen a translation.
#[derive(Debug, Clone, Copy)]
pub struct PhraseTable {
    /// Discourse fillers injected at sentence boundaries.
    pub fillers: &'static [&'static str],
    /// Emphasis adverb prepended to the text as a last resort.
    pub emphasis: &'static str,
    /// Mark used for an inserted mid-sentence pause.
    pub pause_mark: &'static str,
    /// Whether words are separated by spaces.
    pub spaced: bool,
}

const EN: PhraseTable = PhraseTable {
    fillers: &["In fact,", "You see,", "As you know,", "Of course,"],
    emphasis: "Indeed,",
    pause_mark: ",",
    spaced: true,
};

static TABLES: &[(&str, PhraseTable)] = &[
    ("en", EN),
    (
        "es",
        PhraseTable {
            fillers: &["De hecho,", "Como sabes,", "Por supuesto,", "Pues bien,"],
            emphasis: "Realmente,",
            pause_mark: ",",
            spaced: true,
        },
    ),
    (
        "fr",
        PhraseTable {
            fillers: &["En fait,", "Vous savez,", "Bien sûr,", "Eh bien,"],
            emphasis: "Vraiment,",
            pause_mark: ",",
            spaced: true,
        },
    ),
    (
        "de",
        PhraseTable {
            fillers: &["Tatsächlich,", "Wie Sie wissen,", "Natürlich,", "Nun,"],
            emphasis: "Wirklich,",
            pause_mark: ",",
            spaced: true,
        },
    ),
    (
        "it",
        PhraseTable {
            fillers: &["In effetti,", "Come sai,", "Certo,", "Ebbene,"],
            emphasis: "Davvero,",
            pause_mark: ",",
            spaced: true,
        },
    ),
    (
        "pt",
        PhraseTable {
            fillers: &["Na verdade,", "Como você sabe,", "Claro,", "Bem,"],
            emphasis: "Realmente,",
            pause_mark: ",",
            spaced: true,
        },
    ),
    (
        "ru",
        PhraseTable {
            fillers: &["На самом деле,", "Как вы знаете,", "Конечно,"],
            emphasis: "Действительно,",
            pause_mark: ",",
            spaced: true,
        },
    ),
    (
        "hi",
        PhraseTable {
            fillers: &["वास्तव में,", "आप जानते हैं,", "बेशक,"],
            emphasis: "सचमुच,",
            pause_mark: ",",
            spaced: true,
        },
    ),
    (
        "ar",
        PhraseTable {
            fillers: &["في الواقع،", "كما تعلم،", "بالطبع،"],
            emphasis: "حقاً،",
            pause_mark: "،",
            spaced: true,
        },
    ),
    (
        "ja",
        PhraseTable {
            fillers: &["実は、", "ご存知のように、", "もちろん、"],
            emphasis: "本当に、",
            pause_mark: "、",
            spaced: false,
        },
    ),
    (
        "zh",
        PhraseTable {
            fillers: &["其实，", "你知道，", "当然，"],
            emphasis: "确实，",
            pause_mark: "，",
            spaced: false,
        },
    ),
];

/// Phrase table for `language`, falling back to English.
pub fn phrases_for(language: &str) -> &'static PhraseTable {
    let base = primary_subtag(language);
    TABLES
        .iter()
        .find(|(code, _)| *code == base)
        .map(|(_, table)| table)
        .unwrap_or(&TABLES[0].1)
}

impl PhraseTable {
    /// Put `prefix` in front of `sentence`, lowercasing the sentence's first
    /// letter when it is an ordinary capitalised word.
    pub fn prefix(&self, prefix: &str, sentence: &str) -> String {
        if self.spaced {
            format!("{} {}", prefix, decapitalize(sentence))
        } else {
            format!("{}{}", prefix, sentence)
        }
    }

    pub fn join(&self, sentences: &[String]) -> String {
        sentences.join(if self.spaced { " " } else { "" })
    }
}

fn decapitalize(sentence: &str) -> String {
    let mut chars = sentence.chars();
    let (Some(first), Some(second)) = (chars.next(), sentence.chars().nth(1)) else {
        return sentence.to_string();
    };
    // Leave "I", acronyms and proper-looking single letters alone.
    if first.is_uppercase() && second.is_lowercase() {
        first.to_lowercase().chain(chars).collect()
    } else {
        sentence.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_fallback() {
        assert_eq!(phrases_for("es").emphasis, "Realmente,");
        assert_eq!(phrases_for("ja-JP").pause_mark, "、");
        assert_eq!(phrases_for("sw").emphasis, "Indeed,");
    }

    #[test]
    fn test_prefix_decapitalizes() {
        let en = phrases_for("en");
        assert_eq!(en.prefix("Indeed,", "The plan works."), "Indeed, the plan works.");
        assert_eq!(en.prefix("Indeed,", "I agree."), "Indeed, I agree.");
        assert_eq!(en.prefix("Indeed,", "NASA called."), "Indeed, NASA called.");
    }

    #[test]
    fn test_unspaced_join() {
        let ja = phrases_for("ja");
        assert_eq!(ja.prefix("実は、", "元気です。"), "実は、元気です。");
        assert_eq!(ja.join(&["a。".to_string(), "b。".to_string()]), "a。b。");
    }
}
