//! SQLite-backed price history. Product identity rows are upserted; price
//! observations are append-only — a fresh observation inserts a new
//! history row rather than touching an old one.

use chrono::{DateTime, Utc};
use sqlx::migrate::MigrateDatabase;
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::info;

use crate::error::Result;
use crate::types::ProductRecord;

pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub async fn new(db_path: &str) -> Result<Self> {
        let db_url = format!("sqlite:{db_path}");
        if !Sqlite::database_exists(&db_url).await.unwrap_or(false) {
            info!(db_path, "creating database file");
            Sqlite::create_database(&db_url).await?;
        }

        let pool = SqlitePool::connect(&db_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(db_path, "database ready");
        Ok(Self { pool })
    }

    /// Record one observation: upsert the identity row, append the history
    /// row.
    pub async fn record_snapshot(&self, record: &ProductRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO products (platform, product_id, name, url, image_url, seller, category, brand, first_seen)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (platform, product_id) DO UPDATE SET
                name = excluded.name,
                url = excluded.url,
                image_url = excluded.image_url
            ",
        )
        .bind(&record.platform)
        .bind(&record.product_id)
        .bind(&record.name)
        .bind(&record.url)
        .bind(&record.image_url)
        .bind(&record.seller)
        .bind(&record.category)
        .bind(&record.brand)
        .bind(record.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            INSERT INTO price_history (platform, product_id, price, currency, availability, rating, review_count, captured_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&record.platform)
        .bind(&record.product_id)
        .bind(record.price)
        .bind(&record.currency)
        .bind(&record.availability)
        .bind(record.rating)
        .bind(record.review_count.map(|c| c as i64))
        .bind(record.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn record_snapshots(&self, records: &[ProductRecord]) -> Result<()> {
        for record in records {
            self.record_snapshot(record).await?;
        }
        info!(count = records.len(), "snapshots persisted");
        Ok(())
    }

    /// The most recent observation of every known product.
    pub async fn latest_snapshot(&self) -> Result<Vec<ProductRecord>> {
        let rows = sqlx::query(
            r"
            SELECT p.platform, p.product_id, p.name, p.url, p.image_url, p.seller,
                   p.category, p.brand,
                   h.price, h.currency, h.availability, h.rating, h.review_count, h.captured_at
            FROM products p
            JOIN price_history h
              ON h.platform = p.platform AND h.product_id = p.product_id
            WHERE h.id IN (
                SELECT MAX(id) FROM price_history GROUP BY platform, product_id
            )
            ORDER BY p.platform, p.product_id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row_to_record(&row)).collect())
    }

    /// Time-ordered price observations for one product.
    pub async fn history_for(
        &self,
        platform: &str,
        product_id: &str,
    ) -> Result<Vec<(DateTime<Utc>, f64)>> {
        let rows = sqlx::query(
            r"
            SELECT price, captured_at FROM price_history
            WHERE platform = ? AND product_id = ?
            ORDER BY id
            ",
        )
        .bind(platform)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let captured: String = row.get("captured_at");
                (parse_timestamp(&captured), row.get::<f64, _>("price"))
            })
            .collect())
    }

    pub async fn log_search(&self, query: &str, results_count: usize) -> Result<()> {
        sqlx::query(
            "INSERT INTO search_history (query, results_count, searched_at) VALUES (?, ?, ?)",
        )
        .bind(query)
        .bind(results_count as i64)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> ProductRecord {
    let captured: String = row.get("captured_at");
    let mut record = ProductRecord::new(
        row.get::<String, _>("platform"),
        row.get::<String, _>("product_id"),
        row.get::<String, _>("name"),
        row.get::<f64, _>("price"),
        row.get::<String, _>("currency"),
        row.get::<String, _>("availability"),
        row.get::<String, _>("url"),
    );
    record.image_url = row.get("image_url");
    record.seller = row.get("seller");
    record.category = row.get("category");
    record.brand = row.get("brand");
    record.rating = row.get("rating");
    record.review_count = row.get::<Option<i64>, _>("review_count").map(|c| c as u64);
    record.timestamp = parse_timestamp(&captured);
    record
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> HistoryStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        HistoryStore { pool }
    }

    fn record(price: f64) -> ProductRecord {
        let mut r = ProductRecord::new(
            "amazon",
            "B0TEST",
            "Widget",
            price,
            "USD",
            "In Stock",
            "https://x/p",
        );
        r.rating = Some(4.2);
        r
    }

    #[tokio::test]
    async fn snapshots_are_append_only() {
        let store = memory_store().await;
        store.record_snapshot(&record(10.0)).await.unwrap();
        store.record_snapshot(&record(12.0)).await.unwrap();

        let history = store.history_for("amazon", "B0TEST").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].1, 10.0);
        assert_eq!(history[1].1, 12.0);
    }

    #[tokio::test]
    async fn latest_snapshot_returns_most_recent_observation() {
        let store = memory_store().await;
        store.record_snapshot(&record(10.0)).await.unwrap();
        store.record_snapshot(&record(15.0)).await.unwrap();

        let latest = store.latest_snapshot().await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].price, 15.0);
        assert_eq!(latest[0].rating, Some(4.2));
    }

    #[tokio::test]
    async fn search_history_is_recorded() {
        let store = memory_store().await;
        store.log_search("earbuds", 17).await.unwrap();
        let row = sqlx::query("SELECT query, results_count FROM search_history")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(row.get::<String, _>("query"), "earbuds");
        assert_eq!(row.get::<i64, _>("results_count"), 17);
    }
}
