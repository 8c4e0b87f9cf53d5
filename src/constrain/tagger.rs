//! Lightweight part-of-speech heuristics used to decide which words and
//! sentences survive shortening.
//!
//! Closed-class word lists and suffix rules cover the most common dubbing
//! targets; any other open-class word is treated as a noun so that unknown
//! content is kept rather than dropped.

use crate::speech::profile::primary_subtag;
use crate::speech::word_units;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartOfSpeech {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Number,
    Function,
    Interjection,
}

impl PartOfSpeech {
    /// Content words kept first when a sentence must lose words.
    pub fn is_core(self) -> bool {
        matches!(
            self,
            PartOfSpeech::Noun | PartOfSpeech::Verb | PartOfSpeech::Adjective | PartOfSpeech::Number
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceKind {
    Statement,
    Question,
    Exclamation,
    Imperative,
}

struct Lexicon {
    function: &'static [&'static str],
    verbs: &'static [&'static str],
    adjectives: &'static [&'static str],
    adverbs: &'static [&'static str],
    imperatives: &'static [&'static str],
    verb_suffixes: &'static [&'static str],
    adjective_suffixes: &'static [&'static str],
    adverb_suffixes: &'static [&'static str],
}

const INTERJECTIONS: &[&str] = &[
    "um", "uh", "er", "ah", "oh", "hmm", "eh", "okay", "ok", "yes", "yeah", "well", "euh", "oui",
    "sí", "bueno", "pues", "ja", "ähm", "also", "да", "ну", "あの", "えっと",
];

static EN: Lexicon = Lexicon {
    function: &[
        "a", "an", "the", "this", "that", "these", "those", "i", "you", "he", "she", "it", "we",
        "they", "me", "him", "her", "us", "them", "my", "your", "his", "its", "our", "their", "of",
        "in", "on", "at", "to", "for", "with", "by", "from", "about", "into", "over", "after",
        "before", "under", "between", "and", "or", "but", "so", "because", "if", "than", "then",
        "as", "while", "which", "who", "whom", "whose", "what", "there", "here", "some", "any",
        "all", "each", "every", "no", "not", "can", "could", "will", "would", "shall", "should",
        "may", "might", "must",
    ],
    verbs: &[
        "is", "are", "was", "were", "be", "been", "am", "have", "has", "had", "do", "does", "did",
        "go", "get", "make", "take", "see", "know", "think", "say", "said", "come", "want", "look",
        "use", "find", "give", "tell", "work", "call", "try", "ask", "need", "feel", "leave", "put",
        "mean", "keep", "let", "begin", "help", "show", "hear", "play", "run", "move", "live",
        "believe", "bring", "write", "sit", "stand", "lose", "pay", "meet", "learn", "change",
        "lead", "understand", "watch", "follow", "stop", "create", "speak", "read", "spend",
        "grow", "open", "walk", "win", "remember", "love", "buy", "wait", "build", "stay", "fall",
        "listen", "start", "eat", "turn",
    ],
    adjectives: &[
        "good", "new", "first", "last", "long", "great", "little", "own", "other", "old", "right",
        "big", "high", "different", "small", "large", "next", "early", "young", "important", "few",
        "public", "bad", "same", "able", "best", "better", "sure", "free", "true", "whole", "real",
        "hard", "easy", "strong", "happy", "clear", "full", "special", "ready", "simple",
    ],
    adverbs: &[
        "very", "really", "just", "also", "actually", "basically", "quite", "rather", "too",
        "still", "already", "even", "maybe", "perhaps", "probably", "now", "always", "never",
        "often", "sometimes", "again", "simply", "like", "literally", "totally", "pretty",
    ],
    imperatives: &[
        "please", "look", "listen", "let", "go", "come", "take", "make", "stop", "wait", "try",
        "remember", "imagine", "consider", "watch", "see", "tell", "give", "keep", "check", "don't",
    ],
    verb_suffixes: &["ing", "ed", "ize", "ise", "ify"],
    adjective_suffixes: &["ous", "ful", "ive", "able", "ible", "less", "ical", "ish", "ary"],
    adverb_suffixes: &["ly"],
};

static ES: Lexicon = Lexicon {
    function: &[
        "el", "la", "los", "las", "un", "una", "unos", "unas", "de", "del", "a", "al", "en", "con",
        "por", "para", "sin", "sobre", "entre", "y", "e", "o", "u", "pero", "que", "si", "como",
        "porque", "cuando", "yo", "tú", "él", "ella", "nosotros", "ellos", "ellas", "me", "te",
        "se", "nos", "le", "les", "lo", "mi", "tu", "su", "sus", "este", "esta", "ese", "esa",
        "no",
    ],
    verbs: &[
        "es", "son", "era", "fue", "ser", "estar", "está", "están", "hay", "ha", "han", "he",
        "tiene", "tienen", "hace", "puede", "quiero", "va", "voy", "vamos",
    ],
    adjectives: &[
        "bueno", "buena", "nuevo", "nueva", "grande", "pequeño", "pequeña", "importante", "mejor",
        "primero", "primera", "último", "última",
    ],
    adverbs: &[
        "muy", "muchísimo", "también", "ya", "aún", "todavía", "siempre", "nunca", "bien", "mal",
        "realmente", "solo", "sólo", "quizás", "entonces",
    ],
    imperatives: &["mira", "escucha", "ven", "ve", "espera", "toma", "haz", "por", "imagina"],
    verb_suffixes: &["ar", "er", "ir", "ando", "iendo", "ado", "ido"],
    adjective_suffixes: &["oso", "osa", "ble", "ivo", "iva", "al"],
    adverb_suffixes: &["mente"],
};

static FR: Lexicon = Lexicon {
    function: &[
        "le", "la", "les", "l'", "un", "une", "des", "du", "de", "d'", "à", "au", "aux", "en",
        "dans", "sur", "sous", "avec", "pour", "par", "sans", "et", "ou", "mais", "que", "qui",
        "si", "comme", "je", "tu", "il", "elle", "nous", "vous", "ils", "elles", "on", "me", "te",
        "se", "ce", "cette", "ces", "mon", "ton", "son", "ma", "ta", "sa", "ne", "pas",
    ],
    verbs: &[
        "est", "sont", "était", "être", "avoir", "a", "ont", "fait", "faire", "va", "vais",
        "peut", "veux", "dit", "voir",
    ],
    adjectives: &[
        "bon", "bonne", "nouveau", "nouvelle", "grand", "grande", "petit", "petite", "important",
        "importante", "meilleur", "premier", "première", "dernier", "dernière",
    ],
    adverbs: &[
        "très", "vraiment", "aussi", "déjà", "encore", "toujours", "jamais", "bien", "alors",
        "peut-être", "juste", "assez", "trop",
    ],
    imperatives: &["regardez", "écoutez", "venez", "attendez", "imaginez", "regarde", "écoute"],
    verb_suffixes: &["er", "ir", "ant", "é", "ée"],
    adjective_suffixes: &["eux", "euse", "able", "ible", "if", "ive"],
    adverb_suffixes: &["ment"],
};

static DE: Lexicon = Lexicon {
    function: &[
        "der", "die", "das", "den", "dem", "des", "ein", "eine", "einen", "einem", "einer", "und",
        "oder", "aber", "dass", "wenn", "weil", "als", "wie", "in", "im", "an", "am", "auf", "mit",
        "von", "zu", "zum", "zur", "für", "bei", "nach", "aus", "ich", "du", "er", "sie", "es",
        "wir", "ihr", "mich", "dich", "sich", "uns", "mein", "dein", "sein", "nicht", "kein",
    ],
    verbs: &[
        "ist", "sind", "war", "waren", "sein", "haben", "hat", "habe", "wird", "werden", "kann",
        "muss", "macht", "geht", "gibt",
    ],
    adjectives: &["gut", "neu", "groß", "klein", "wichtig", "erste", "letzte", "besser"],
    adverbs: &[
        "sehr", "wirklich", "auch", "schon", "noch", "immer", "nie", "nur", "eigentlich", "halt",
        "mal", "doch", "jetzt",
    ],
    imperatives: &["schau", "schauen", "hör", "hören", "warte", "warten", "komm", "bitte"],
    verb_suffixes: &["en", "ieren"],
    adjective_suffixes: &["ig", "lich", "isch", "bar", "sam", "los"],
    adverb_suffixes: &["weise"],
};

static PT_IT: Lexicon = Lexicon {
    function: &[
        "o", "a", "os", "as", "um", "uma", "de", "do", "da", "dos", "das", "em", "no", "na", "com",
        "por", "para", "e", "ou", "mas", "que", "se", "eu", "você", "ele", "ela", "nós", "eles",
        "il", "lo", "la", "gli", "le", "un", "una", "di", "del", "della", "in", "con", "per", "tra",
        "ma", "che", "io", "tu", "lui", "lei", "noi", "voi", "loro", "non", "não",
    ],
    verbs: &[
        "é", "são", "foi", "ser", "estar", "tem", "ter", "vai", "è", "sono", "era", "essere",
        "avere", "ha", "hanno", "fa",
    ],
    adjectives: &[
        "bom", "boa", "novo", "nova", "grande", "pequeno", "importante", "buono", "buona", "nuovo",
        "nuova", "piccolo", "piccola",
    ],
    adverbs: &[
        "muito", "também", "já", "ainda", "sempre", "nunca", "molto", "anche", "già", "ancora",
        "mai", "davvero", "realmente",
    ],
    imperatives: &["olha", "escuta", "espera", "guarda", "ascolta", "aspetta", "vieni"],
    verb_suffixes: &["ar", "er", "ir", "are", "ere", "ire", "ando", "endo", "ado", "ato", "ito"],
    adjective_suffixes: &["oso", "osa", "ível", "vel", "ivo", "iva", "bile"],
    adverb_suffixes: &["mente"],
};

static NONE: Lexicon = Lexicon {
    function: &[],
    verbs: &[],
    adjectives: &[],
    adverbs: &[],
    imperatives: &[],
    verb_suffixes: &[],
    adjective_suffixes: &[],
    adverb_suffixes: &[],
};

fn lexicon(language: &str) -> &'static Lexicon {
    match primary_subtag(language).as_str() {
        "en" => &EN,
        "es" => &ES,
        "fr" => &FR,
        "de" => &DE,
        "pt" | "it" => &PT_IT,
        _ => &NONE,
    }
}

fn numeral_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d").expect("static numeral pattern"))
}

/// Strip surrounding punctuation and lowercase.
pub fn normalize(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-')
        .trim_matches(['\'', '-'])
        .to_lowercase()
}

pub fn tag_word(word: &str, language: &str) -> PartOfSpeech {
    let norm = normalize(word);
    if norm.is_empty() {
        return PartOfSpeech::Function;
    }
    if numeral_regex().is_match(&norm) {
        return PartOfSpeech::Number;
    }
    if INTERJECTIONS.contains(&norm.as_str()) {
        return PartOfSpeech::Interjection;
    }

    let lex = lexicon(language);
    let w = norm.as_str();
    if lex.function.contains(&w) {
        return PartOfSpeech::Function;
    }
    if lex.adverbs.contains(&w) {
        return PartOfSpeech::Adverb;
    }
    if lex.verbs.contains(&w) {
        return PartOfSpeech::Verb;
    }
    if lex.adjectives.contains(&w) {
        return PartOfSpeech::Adjective;
    }

    // Suffix rules only apply to words long enough to carry a suffix.
    let long_enough = |suffix: &str| w.chars().count() > suffix.chars().count() + 2;
    if lex.adverb_suffixes.iter().any(|s| w.ends_with(s) && long_enough(s)) {
        return PartOfSpeech::Adverb;
    }
    if lex.adjective_suffixes.iter().any(|s| w.ends_with(s) && long_enough(s)) {
        return PartOfSpeech::Adjective;
    }
    if lex.verb_suffixes.iter().any(|s| w.ends_with(s) && long_enough(s)) {
        return PartOfSpeech::Verb;
    }

    PartOfSpeech::Noun
}

pub fn sentence_kind(sentence: &str, language: &str) -> SentenceKind {
    let trimmed = sentence.trim_end_matches(|c: char| c.is_whitespace() || "\"'”’)]」』）»".contains(c));
    if trimmed.ends_with(['?', '？', '؟']) || sentence.starts_with('¿') {
        return SentenceKind::Question;
    }

    let first = sentence
        .split_whitespace()
        .next()
        .map(normalize)
        .unwrap_or_default();
    if !first.is_empty() && lexicon(language).imperatives.contains(&first.as_str()) {
        return SentenceKind::Imperative;
    }

    if trimmed.ends_with(['!', '！']) || sentence.starts_with('¡') {
        return SentenceKind::Exclamation;
    }
    SentenceKind::Statement
}

/// Heuristic importance of a sentence: weighted content-word counts plus
/// bonuses for questions, commands, exclamations and numbers, minus a
/// penalty for very short sentences.
pub fn importance(sentence: &str, language: &str) -> f64 {
    let mut score = 0.0;
    for word in sentence.split_whitespace() {
        score += match tag_word(word, language) {
            PartOfSpeech::Noun => 2.0,
            PartOfSpeech::Verb => 1.5,
            PartOfSpeech::Adjective => 1.0,
            PartOfSpeech::Adverb => 0.5,
            PartOfSpeech::Number => 2.0,
            PartOfSpeech::Function | PartOfSpeech::Interjection => 0.0,
        };
    }

    score += match sentence_kind(sentence, language) {
        SentenceKind::Question => 2.0,
        SentenceKind::Imperative => 1.5,
        SentenceKind::Exclamation => 1.0,
        SentenceKind::Statement => 0.0,
    };

    if numeral_regex().is_match(sentence) {
        score += 2.0;
    }
    if word_units(sentence) < 4 {
        score -= 1.5;
    }

    score
}
