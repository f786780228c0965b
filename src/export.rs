//! File export for analysis results and record batches: JSON, CSV, and a
//! readable Markdown report. The exporter only walks the generic data map
//! an `AnalysisResult` carries — it knows nothing about specific analyses.

use std::path::PathBuf;

use serde_json::Value;
use tracing::info;

use crate::error::{MonitorError, Result};
use crate::types::{AnalysisResult, ProductRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Markdown,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            "markdown" | "md" => Some(ExportFormat::Markdown),
            _ => None,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Markdown => "md",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Markdown => "markdown",
        };
        write!(f, "{s}")
    }
}

pub struct DataExporter {
    out_dir: PathBuf,
}

impl DataExporter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    fn target(&self, stem: &str, format: ExportFormat) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.out_dir)?;
        Ok(self.out_dir.join(format!("{stem}.{}", format.extension())))
    }

    /// Write an analysis result. CSV is a record format, not a nested one —
    /// requesting it here is an error.
    pub fn export_result(
        &self,
        result: &AnalysisResult,
        format: ExportFormat,
        stem: &str,
    ) -> Result<PathBuf> {
        let path = self.target(stem, format)?;
        let content = match format {
            ExportFormat::Json => serde_json::to_string_pretty(&result.to_value())?,
            ExportFormat::Markdown => result_to_markdown(result),
            ExportFormat::Csv => {
                return Err(MonitorError::Export(
                    "analysis results cannot be exported as CSV; export records instead"
                        .to_string(),
                ))
            }
        };
        std::fs::write(&path, content)?;
        info!(path = %path.display(), format = %format, "analysis result exported");
        Ok(path)
    }

    /// Write a record batch as flat rows.
    pub fn export_records(
        &self,
        records: &[ProductRecord],
        format: ExportFormat,
        stem: &str,
    ) -> Result<PathBuf> {
        let path = self.target(stem, format)?;
        let content = match format {
            ExportFormat::Json => serde_json::to_string_pretty(records)?,
            ExportFormat::Csv => records_to_csv(records),
            ExportFormat::Markdown => records_to_markdown(records),
        };
        std::fs::write(&path, content)?;
        info!(path = %path.display(), format = %format, count = records.len(), "records exported");
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

const CSV_COLUMNS: [&str; 11] = [
    "platform",
    "product_id",
    "name",
    "price",
    "currency",
    "availability",
    "rating",
    "review_count",
    "seller",
    "url",
    "timestamp",
];

fn records_to_csv(records: &[ProductRecord]) -> String {
    let mut out = String::new();
    out.push_str(&CSV_COLUMNS.join(","));
    out.push('\n');
    for r in records {
        let fields = [
            csv_field(&r.platform),
            csv_field(&r.product_id),
            csv_field(&r.name),
            r.price.to_string(),
            csv_field(&r.currency),
            csv_field(&r.availability),
            r.rating.map(|v| v.to_string()).unwrap_or_default(),
            r.review_count.map(|v| v.to_string()).unwrap_or_default(),
            csv_field(r.seller.as_deref().unwrap_or_default()),
            csv_field(&r.url),
            r.timestamp.to_rfc3339(),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Quote a field when it contains a separator, quote, or newline.
fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

// ---------------------------------------------------------------------------
// Markdown
// ---------------------------------------------------------------------------

fn result_to_markdown(result: &AnalysisResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", title_case(&result.analysis_type)));
    out.push_str(&format!("Generated: {}\n\n", result.timestamp.to_rfc3339()));

    if !result.metadata.is_empty() {
        out.push_str("## Metadata\n\n");
        for (key, value) in &result.metadata {
            out.push_str(&format!("- **{}**: {}\n", title_case(key), scalar(value)));
        }
        out.push('\n');
    }

    for (key, value) in &result.data {
        out.push_str(&format!("## {}\n\n", title_case(key)));
        write_value(&mut out, value, 0);
        out.push('\n');
    }
    out
}

fn records_to_markdown(records: &[ProductRecord]) -> String {
    let mut out = String::new();
    out.push_str("# Product Records\n\n");
    out.push_str("| Platform | Product | Price | Currency | Availability | Rating |\n");
    out.push_str("|---|---|---|---|---|---|\n");
    for r in records {
        out.push_str(&format!(
            "| {} | {} | {:.2} | {} | {} | {} |\n",
            r.platform,
            r.name.replace('|', "\\|"),
            r.price,
            r.currency,
            r.availability,
            r.rating.map(|v| format!("{v:.1}")).unwrap_or_else(|| "-".into()),
        ));
    }
    out
}

fn write_value(out: &mut String, value: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                if inner.is_object() || inner.is_array() {
                    out.push_str(&format!("{indent}- **{}**:\n", title_case(key)));
                    write_value(out, inner, depth + 1);
                } else {
                    out.push_str(&format!(
                        "{indent}- **{}**: {}\n",
                        title_case(key),
                        scalar(inner)
                    ));
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                if item.is_object() || item.is_array() {
                    out.push_str(&format!("{indent}-\n"));
                    write_value(out, item, depth + 1);
                } else {
                    out.push_str(&format!("{indent}- {}\n", scalar(item)));
                }
            }
        }
        scalar_value => {
            out.push_str(&format!("{indent}{}\n", scalar(scalar_value)));
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() != 0.0 => format!("{f:.2}"),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

fn title_case(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn record() -> ProductRecord {
        ProductRecord::new(
            "amazon",
            "B01",
            "Widget, \"Deluxe\"",
            19.99,
            "USD",
            "In Stock",
            "https://x/p",
        )
    }

    #[test]
    fn csv_escapes_quotes_and_commas() {
        let csv = records_to_csv(&[record()]);
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("platform,product_id,name"));
        let row = lines.next().unwrap();
        assert!(row.contains(r#""Widget, ""Deluxe""""#));
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert_eq!(ExportFormat::parse("xlsx"), None);
        assert_eq!(ExportFormat::parse("JSON"), Some(ExportFormat::Json));
    }

    #[test]
    fn markdown_report_walks_nested_data() {
        let mut data = Map::new();
        let mut inner = Map::new();
        inner.insert("total_products".into(), Value::from(3));
        data.insert("overview".into(), Value::Object(inner));
        let result = AnalysisResult::new("comprehensive_price_analysis", data, Map::new());

        let md = result_to_markdown(&result);
        assert!(md.contains("# Comprehensive Price Analysis"));
        assert!(md.contains("## Overview"));
        assert!(md.contains("**Total Products**: 3"));
    }

    #[test]
    fn csv_of_analysis_results_is_an_export_error() {
        let exporter = DataExporter::new(std::env::temp_dir().join("pm-export-test"));
        let result = AnalysisResult::new("t", Map::new(), Map::new());
        let out = exporter.export_result(&result, ExportFormat::Csv, "r");
        assert!(matches!(out, Err(MonitorError::Export(_))));
    }
}
