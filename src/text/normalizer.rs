//! Language-aware product-name normalization.
//!
//! A name containing any CJK ideograph goes through the Chinese pipeline
//! (variant canonicalization, HTML/punctuation stripping, dictionary
//! segmentation, stopword filtering); anything else goes through the Latin
//! pipeline (case folding, diacritic stripping, boundary splitting, filler
//! removal). Matching is defined on the resulting token *set* — order and
//! multiplicity never matter.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use jieba_rs::Jieba;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::text::vocab;

/// Shared segmenter — the dictionary load is expensive, do it once.
static JIEBA: LazyLock<Jieba> = LazyLock::new(Jieba::new);

static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static HTML_ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&[a-zA-Z]+;").unwrap());
static BRACKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[【】\\[\\]()（）<>《》“”‘’『』「」]").unwrap());
static PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,，.。;；:：!！?？~～@#$%^&*+=|\\/]").unwrap());

/// Cleaned, tokenized representation of a product name. `tokens` drives
/// matching; `display` keeps the tokens in first-appearance order for
/// human-readable output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedName {
    pub tokens: BTreeSet<String>,
    pub display: String,
}

impl NormalizedName {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn from_ordered(ordered: Vec<String>) -> Self {
        let display = ordered.join(" ");
        Self {
            tokens: ordered.into_iter().collect(),
            display,
        }
    }
}

pub fn is_cjk_char(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

/// True when the string contains at least one CJK ideograph.
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk_char)
}

/// Normalize a raw product name into a comparable token set. Empty input
/// produces an empty set, which scores zero similarity against anything.
pub fn normalize(name: &str) -> NormalizedName {
    if name.trim().is_empty() {
        return NormalizedName::default();
    }
    if contains_cjk(name) {
        normalize_cjk(name)
    } else {
        normalize_latin(name)
    }
}

fn normalize_cjk(name: &str) -> NormalizedName {
    let text = vocab::to_simplified(name);
    let text = HTML_TAG_RE.replace_all(&text, "");
    let text = HTML_ENTITY_RE.replace_all(&text, "");
    let text = BRACKET_RE.replace_all(&text, " ");
    let text = PUNCT_RE.replace_all(&text, " ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut ordered: Vec<String> = Vec::new();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for word in JIEBA.cut(&collapsed, false) {
        let word = word.trim();
        if word.chars().count() <= 1 {
            continue;
        }
        if vocab::is_stopword(word) || is_meaningless(word) {
            continue;
        }
        if seen.insert(word) {
            ordered.push(word.to_string());
        }
    }
    NormalizedName::from_ordered(ordered)
}

fn normalize_latin(name: &str) -> NormalizedName {
    let mut ordered: Vec<String> = Vec::new();
    for token in latin_raw_tokens(name) {
        if vocab::LATIN_FILLERS.contains(token.as_str()) {
            continue;
        }
        if !ordered.contains(&token) {
            ordered.push(token);
        }
    }
    NormalizedName::from_ordered(ordered)
}

/// Latin tokenization shared by normalization and feature extraction:
/// lowercase, strip diacritics, split on non-alphanumeric characters and at
/// letter/digit boundaries, and drop unit suffixes glued to numbers so
/// "256GB" and "256g" both yield "256".
pub fn latin_raw_tokens(name: &str) -> Vec<String> {
    let lowered = name.to_lowercase();
    let stripped: String = lowered.nfd().filter(|c| !is_combining_mark(*c)).collect();

    let mut tokens = Vec::new();
    for chunk in stripped
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
    {
        split_boundaries(chunk, &mut tokens);
    }
    tokens
}

/// Split one alphanumeric chunk into alpha/digit runs. An alpha run that
/// immediately follows a digit run and names a unit is discarded.
fn split_boundaries(chunk: &str, out: &mut Vec<String>) {
    let mut runs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_is_digit: Option<bool> = None;

    for c in chunk.chars() {
        let is_digit = c.is_ascii_digit();
        if current_is_digit == Some(is_digit) || current.is_empty() {
            current.push(c);
        } else {
            runs.push(std::mem::take(&mut current));
            current.push(c);
        }
        current_is_digit = Some(is_digit);
    }
    if !current.is_empty() {
        runs.push(current);
    }

    let mut prev_was_digit = false;
    for run in runs {
        let is_digit = run.chars().all(|c| c.is_ascii_digit());
        if !is_digit && prev_was_digit && vocab::UNIT_SUFFIXES.contains(run.as_str()) {
            prev_was_digit = false;
            continue;
        }
        prev_was_digit = is_digit;
        out.push(run);
    }
}

/// Segment raw text with the dictionary segmenter, keeping every non-empty
/// token. Used by feature extraction, which classifies before filtering.
pub fn segment_raw(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    JIEBA
        .cut(text, false)
        .into_iter()
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// A token carries no product identity when it has fewer than two
/// characters, is one character repeated, or contains neither Han nor Latin
/// letters while not being a plain number.
fn is_meaningless(word: &str) -> bool {
    let count = word.chars().count();
    if count < 2 {
        return true;
    }
    let distinct: BTreeSet<char> = word.chars().collect();
    if distinct.len() == 1 {
        return true;
    }
    let has_word_char = word.chars().any(|c| is_cjk_char(c) || c.is_ascii_alphabetic());
    let all_digits = word.chars().all(|c| c.is_ascii_digit());
    !has_word_char && !all_digits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(name: &str) -> Vec<String> {
        normalize(name).tokens.into_iter().collect()
    }

    #[test]
    fn empty_input_yields_empty_set() {
        assert!(normalize("").is_empty());
        assert!(normalize("   ").is_empty());
    }

    #[test]
    fn latin_pipeline_lowercases_and_drops_fillers() {
        let t = tokens("Brand New Apple iPhone 15 Pro");
        assert!(t.contains(&"apple".to_string()));
        assert!(t.contains(&"iphone".to_string()));
        assert!(t.contains(&"15".to_string()));
        assert!(t.contains(&"pro".to_string()));
        assert!(!t.contains(&"new".to_string()));
        assert!(!t.contains(&"brand".to_string()));
    }

    #[test]
    fn latin_pipeline_splits_model_and_capacity_tokens() {
        assert_eq!(tokens("iPhone15"), vec!["15".to_string(), "iphone".to_string()]);
        // the unit suffix is dropped so capacities compare across platforms
        assert_eq!(tokens("256GB"), vec!["256".to_string()]);
        assert_eq!(tokens("256G"), vec!["256".to_string()]);
    }

    #[test]
    fn latin_pipeline_strips_diacritics() {
        let t = tokens("Café Crème Machine");
        assert!(t.contains(&"cafe".to_string()));
        assert!(t.contains(&"creme".to_string()));
    }

    #[test]
    fn cjk_pipeline_drops_marketing_noise() {
        let t = tokens("正品包邮 蓝牙耳机 特价");
        assert!(t.contains(&"蓝牙".to_string()) || t.contains(&"蓝牙耳机".to_string()));
        assert!(!t.iter().any(|w| w == "正品" || w == "包邮" || w == "特价"));
    }

    #[test]
    fn cjk_pipeline_strips_html_and_brackets() {
        let t = tokens("<b>【旗舰店】蓝牙耳机</b>&nbsp;");
        assert!(!t.iter().any(|w| w.contains('【') || w.contains('<')));
        assert!(!t.contains(&"旗舰店".to_string()));
    }

    #[test]
    fn cjk_pipeline_canonicalizes_traditional_variants() {
        let a = normalize("藍牙耳機");
        let b = normalize("蓝牙耳机");
        assert_eq!(a.tokens, b.tokens);
    }

    #[test]
    fn repeated_character_tokens_are_dropped() {
        assert!(is_meaningless("aa"));
        assert!(is_meaningless("——"));
        assert!(!is_meaningless("耳机"));
        assert!(!is_meaningless("256"));
    }

    #[test]
    fn mixed_script_goes_through_cjk_pipeline() {
        let t = tokens("Sony 索尼 WH-1000XM5 耳机");
        assert!(t.contains(&"索尼".to_string()));
        assert!(t.contains(&"Sony".to_string()));
    }
}
