use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use price_monitor::analyzer::{AnalyzeOptions, ComparisonAnalyzer, PriceAnalyzer};
use price_monitor::collectors::collect_all;
use price_monitor::config::Config;
use price_monitor::db::HistoryStore;
use price_monitor::error::Result;
use price_monitor::export::{DataExporter, ExportFormat};
use price_monitor::stats::StatsOptions;
use price_monitor::types::ProductRecord;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        tracing::error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let store = HistoryStore::new(&cfg.db_path).await?;

    let records = gather_records(&cfg, &store).await?;
    if records.is_empty() {
        warn!("no records to analyze — nothing collected and history is empty");
        return Ok(());
    }
    info!(
        records = records.len(),
        platforms = ?records.iter().map(|r| r.platform.as_str()).collect::<std::collections::BTreeSet<_>>(),
        "record batch ready"
    );

    let options = AnalyzeOptions {
        similarity_threshold: cfg.similarity_threshold,
        stats: StatsOptions {
            confidence_level: cfg.confidence_level,
            outlier_method: cfg.outlier_method,
            ..StatsOptions::default()
        },
        include_matching: true,
        include_statistics: true,
    };

    let analysis = PriceAnalyzer::new(options).analyze(&records)?;
    let comparison = ComparisonAnalyzer::new(cfg.similarity_threshold).analyze(&records)?;

    let exporter = DataExporter::new(&cfg.export_dir);
    exporter.export_result(&analysis, ExportFormat::Json, "price_analysis")?;
    exporter.export_result(&analysis, ExportFormat::Markdown, "price_analysis")?;
    exporter.export_result(&comparison, ExportFormat::Json, "comparison_analysis")?;
    exporter.export_records(&records, ExportFormat::Csv, "records")?;

    if let Some(matched) = analysis.data.get("matched_products") {
        info!(
            matches = matched.get("match_count").and_then(|v| v.as_u64()).unwrap_or(0),
            "analysis complete, exports written to {}",
            cfg.export_dir
        );
    }

    Ok(())
}

/// Collect fresh records, persisting them as history — or, when running
/// offline or when every platform fails, fall back to the latest stored
/// snapshot.
async fn gather_records(cfg: &Config, store: &HistoryStore) -> Result<Vec<ProductRecord>> {
    if cfg.offline {
        info!("offline mode: analyzing latest stored snapshot");
        return store.latest_snapshot().await;
    }

    let records = collect_all(cfg).await;
    store.log_search(&cfg.search_query, records.len()).await?;

    if records.is_empty() {
        warn!("all platforms came back empty, falling back to stored history");
        return store.latest_snapshot().await;
    }

    store.record_snapshots(&records).await?;
    Ok(records)
}
