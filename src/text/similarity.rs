//! Weighted Jaccard similarity over normalized names and their feature
//! bundles. Output is in [0, 1] and bit-reproducible for fixed inputs: no
//! randomness, no locale-dependent collation.

use std::collections::BTreeSet;

use crate::text::features::{extract_features, FeatureBundle};
use crate::text::normalizer::{normalize, NormalizedName};

/// Full normalized token sets dominate the score; free keywords come next;
/// brands anchor identity and specs disambiguate variants.
pub const FULL_TEXT_WEIGHT: f64 = 0.4;
pub const BRAND_WEIGHT: f64 = 0.2;
pub const KEYWORD_WEIGHT: f64 = 0.3;
pub const SPEC_WEIGHT: f64 = 0.1;

/// Normalized name and features computed once per record so a matcher batch
/// pays for tokenization a single time.
#[derive(Debug, Clone, Default)]
pub struct PreparedName {
    pub raw_is_empty: bool,
    pub normalized: NormalizedName,
    pub features: FeatureBundle,
}

impl PreparedName {
    pub fn of(name: &str) -> Self {
        Self {
            raw_is_empty: name.trim().is_empty(),
            normalized: normalize(name),
            features: extract_features(name),
        }
    }
}

/// Jaccard similarity |A∩B| / |A∪B|. Both sets empty compares as identical;
/// exactly one empty compares as disjoint.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

/// Similarity of two raw product names. An empty name scores zero against
/// everything, including another empty name.
pub fn similarity(name_a: &str, name_b: &str) -> f64 {
    if name_a.trim().is_empty() || name_b.trim().is_empty() {
        return 0.0;
    }
    score_prepared(&PreparedName::of(name_a), &PreparedName::of(name_b))
}

/// Weighted combination over pre-tokenized names.
pub fn score_prepared(a: &PreparedName, b: &PreparedName) -> f64 {
    if a.raw_is_empty || b.raw_is_empty {
        return 0.0;
    }
    let text_sim = jaccard(&a.normalized.tokens, &b.normalized.tokens);
    let brand_sim = jaccard(&a.features.brands, &b.features.brands);
    let keyword_sim = jaccard(&a.features.keywords, &b.features.keywords);
    let spec_sim = jaccard(&a.features.specs, &b.features.specs);

    let score = text_sim * FULL_TEXT_WEIGHT
        + brand_sim * BRAND_WEIGHT
        + keyword_sim * KEYWORD_WEIGHT
        + spec_sim * SPEC_WEIGHT;
    // weight accumulation can overshoot 1.0 by an ulp
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let total = FULL_TEXT_WEIGHT + BRAND_WEIGHT + KEYWORD_WEIGHT + SPEC_WEIGHT;
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn similarity_is_symmetric() {
        let pairs = [
            ("Apple iPhone 15 Pro 256GB", "iPhone15 Pro 256G"),
            ("小米蓝牙耳机", "蓝牙耳机 正品"),
            ("Samsung Galaxy S24", "Apple iPhone 15 Pro"),
        ];
        for (a, b) in pairs {
            let ab = similarity(a, b);
            let ba = similarity(b, a);
            assert_eq!(ab.to_bits(), ba.to_bits(), "asymmetric for {a} / {b}");
        }
    }

    #[test]
    fn similarity_is_bounded_and_reflexive() {
        let names = [
            "Apple iPhone 15 Pro 256GB",
            "小米蓝牙耳机 半入耳式",
            "Sony WH-1000XM5",
        ];
        for a in names {
            for b in names {
                let s = similarity(a, b);
                assert!((0.0..=1.0).contains(&s), "out of bounds: {s}");
            }
            assert_eq!(similarity(a, a), 1.0);
        }
    }

    #[test]
    fn empty_name_scores_zero() {
        assert_eq!(similarity("", "Apple iPhone"), 0.0);
        assert_eq!(similarity("Apple iPhone", ""), 0.0);
        assert_eq!(similarity("", ""), 0.0);
    }

    #[test]
    fn same_product_across_platforms_clears_match_threshold() {
        let s = similarity("Apple iPhone 15 Pro 256GB", "iPhone15 Pro 256G");
        assert!(s >= 0.8, "expected >= 0.8, got {s}");
    }

    #[test]
    fn different_products_stay_below_threshold() {
        let s = similarity("Apple iPhone 15 Pro 256GB", "Samsung Galaxy S24");
        assert!(s < 0.8, "expected < 0.8, got {s}");
    }

    #[test]
    fn jaccard_edge_cases() {
        let empty = BTreeSet::new();
        let full: BTreeSet<String> = ["a".to_string()].into_iter().collect();
        assert_eq!(jaccard(&empty, &empty), 1.0);
        assert_eq!(jaccard(&empty, &full), 0.0);
        assert_eq!(jaccard(&full, &full), 1.0);
    }
}
