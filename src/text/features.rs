//! Typed feature extraction from raw product names.
//!
//! Classification runs on the raw tokenization, before any stopword-based
//! keyword filtering, so brand/spec/color/material tokens survive even when
//! the normalizer would have discarded them. Precedence per token, first
//! match wins: brand → spec → color → material → keyword.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::text::normalizer::{contains_cjk, latin_raw_tokens, segment_raw};
use crate::text::vocab;

/// Digits with an optional unit suffix ("256GB", "1.5L"), or an NxM
/// dimension pattern ("1920x1080").
static SPEC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+[a-zA-Z]*(?:\.\d+)?[a-zA-Z]*|[0-9]+[xX×]\d+").unwrap());

/// Categorized sub-tokens of a product name, used for weighted similarity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureBundle {
    pub brands: BTreeSet<String>,
    pub specs: BTreeSet<String>,
    pub colors: BTreeSet<String>,
    pub materials: BTreeSet<String>,
    pub keywords: BTreeSet<String>,
}

impl FeatureBundle {
    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
            && self.specs.is_empty()
            && self.colors.is_empty()
            && self.materials.is_empty()
            && self.keywords.is_empty()
    }
}

/// Pull typed features out of a raw name. Tokens shorter than two
/// characters are ignored entirely.
pub fn extract_features(name: &str) -> FeatureBundle {
    let mut features = FeatureBundle::default();
    if name.trim().is_empty() {
        return features;
    }

    let tokens = if contains_cjk(name) {
        segment_raw(name)
    } else {
        latin_raw_tokens(name)
    };

    for token in tokens {
        if token.chars().count() < 2 {
            continue;
        }
        if is_brand_token(&token) {
            features.brands.insert(token);
        } else if SPEC_RE.is_match(&token) {
            features.specs.insert(token);
        } else if matches_vocab(&token, &vocab::COLORS) {
            features.colors.insert(token);
        } else if matches_vocab(&token, &vocab::MATERIALS) {
            features.materials.insert(token);
        } else if !vocab::is_stopword(&token) {
            features.keywords.insert(token);
        }
    }
    features
}

/// Brand tokens start with Latin letters and are longer than two characters.
fn is_brand_token(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_alphabetic()) && token.chars().count() > 2
}

/// Exact membership, or the token contains a vocabulary entry ("深蓝色"
/// contains "蓝").
fn matches_vocab(token: &str, vocab: &std::collections::HashSet<&'static str>) -> bool {
    vocab.contains(token) || vocab.iter().any(|entry| token.contains(entry))
}
