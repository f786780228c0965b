//! Bilingual product-name pipeline: normalization, feature extraction, and
//! similarity scoring. Everything here is pure, synchronous computation —
//! deterministic for fixed inputs.

pub mod features;
pub mod normalizer;
pub mod similarity;
pub mod vocab;

pub use features::{extract_features, FeatureBundle};
pub use normalizer::{contains_cjk, normalize, NormalizedName};
pub use similarity::{jaccard, similarity, PreparedName};
