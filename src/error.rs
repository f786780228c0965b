use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("collector error: {0}")]
    Collector(String),

    #[error("rate limited by {0}")]
    RateLimited(String),

    #[error("analysis failed: {0}")]
    Analyzer(String),

    #[error("export error: {0}")]
    Export(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;

/// Non-fatal failure of a single statistical section. A degraded section is
/// reported in place of its result; the surrounding analysis keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputationWarning {
    pub section: String,
    pub reason: String,
}

impl ComputationWarning {
    pub fn new(section: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ComputationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.section, self.reason)
    }
}

/// Per-section outcome: either the computed result or the warning that
/// explains why the section is unavailable.
pub type Section<T> = std::result::Result<T, ComputationWarning>;
