use crate::parser::parse_timestamp;
use crate::traits::ItemStore;
use crate::types::{Item, ItemStatus, Metrics, NewItem, Result, Settings, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    /// Connects and creates the schema if it is missing.
    ///
    /// `sqlite://engagement.db?mode=rwc` creates the file on first use.
    pub async fn new(database_url: &str) -> Result<Self> {
        let db = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let store = Self { db };
        store.setup_schema().await?;
        Ok(store)
    }

    /// Private in-memory database. A single connection keeps every query on
    /// the same database.
    pub async fn in_memory() -> Result<Self> {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { db };
        store.setup_schema().await?;
        Ok(store)
    }

    async fn setup_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                app_id TEXT,
                page_id TEXT,
                access_token TEXT
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                headline TEXT,
                full_text TEXT,
                media_path TEXT,
                status INTEGER DEFAULT 0,
                remote_id TEXT,
                published_at TEXT,
                like_count INTEGER DEFAULT 0,
                comment_count INTEGER DEFAULT 0,
                share_count INTEGER DEFAULT 0
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        debug!("Schema ready");
        Ok(())
    }

    pub fn get_db_pool(&self) -> &SqlitePool {
        &self.db
    }
}

/// Reads a row leniently: NULLs become empty strings or zero, negative
/// counters clamp to zero and an unreadable timestamp becomes `None`.
fn item_from_row(row: &SqliteRow) -> Result<Item> {
    let text = |column: &str| -> Result<String> {
        Ok(row.try_get::<Option<String>, _>(column)?.unwrap_or_default())
    };
    let count = |column: &str| -> Result<u32> {
        let value = row.try_get::<Option<i64>, _>(column)?.unwrap_or(0);
        Ok(value.clamp(0, u32::MAX as i64) as u32)
    };

    let published_at = row
        .try_get::<Option<String>, _>("published_at")?
        .as_deref()
        .and_then(parse_timestamp);

    Ok(Item {
        id: row.try_get("id")?,
        remote_id: row.try_get("remote_id")?,
        status: ItemStatus::from_code(row.try_get::<Option<i64>, _>("status")?.unwrap_or(0)),
        headline: text("headline")?,
        full_text: text("full_text")?,
        media_path: text("media_path")?,
        like_count: count("like_count")?,
        comment_count: count("comment_count")?,
        share_count: count("share_count")?,
        published_at,
    })
}

fn ensure_affected(rows_affected: u64, id: i64) -> Result<()> {
    if rows_affected == 0 {
        return Err(SyncError::ItemNotFound { id });
    }
    Ok(())
}

#[async_trait]
impl ItemStore for SqliteStore {
    async fn all_items(&self) -> Result<Vec<Item>> {
        let rows = sqlx::query("SELECT * FROM posts ORDER BY id DESC")
            .fetch_all(&self.db)
            .await?;

        rows.iter().map(item_from_row).collect()
    }

    async fn item_by_id(&self, id: i64) -> Result<Option<Item>> {
        let row = sqlx::query("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn insert_item(&self, item: &NewItem) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO posts (headline, full_text, media_path, status, like_count, comment_count, share_count)
            VALUES ($1, $2, $3, 0, 0, 0, 0)
            "#,
        )
        .bind(&item.headline)
        .bind(&item.full_text)
        .bind(&item.media_path)
        .execute(&self.db)
        .await?;

        let id = result.last_insert_rowid();
        info!("Saved draft {}", id);
        Ok(id)
    }

    async fn update_item(&self, item: &Item) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET headline = $1, full_text = $2, media_path = $3
            WHERE id = $4
            "#,
        )
        .bind(&item.headline)
        .bind(&item.full_text)
        .bind(&item.media_path)
        .bind(item.id)
        .execute(&self.db)
        .await?;

        ensure_affected(result.rows_affected(), item.id)?;
        debug!("Updated item {}", item.id);
        Ok(())
    }

    async fn delete_item(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        ensure_affected(result.rows_affected(), id)?;
        info!("Deleted item {}", id);
        Ok(())
    }

    async fn update_metrics(&self, id: i64, metrics: Metrics) -> Result<()> {
        let result = sqlx::query(
            "UPDATE posts SET like_count = $1, comment_count = $2, share_count = $3 WHERE id = $4",
        )
        .bind(metrics.likes as i64)
        .bind(metrics.comments as i64)
        .bind(metrics.shares as i64)
        .bind(id)
        .execute(&self.db)
        .await?;

        ensure_affected(result.rows_affected(), id)
    }

    async fn mark_published(&self, id: i64, remote_id: &str, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET status = $1, remote_id = $2, published_at = $3
            WHERE id = $4
            "#,
        )
        .bind(ItemStatus::Published.code())
        .bind(remote_id)
        .bind(at.to_rfc3339())
        .bind(id)
        .execute(&self.db)
        .await?;

        ensure_affected(result.rows_affected(), id)?;
        info!("Marked item {} as published ({})", id, remote_id);
        Ok(())
    }

    async fn load_settings(&self) -> Result<Option<Settings>> {
        let row = sqlx::query("SELECT app_id, page_id, access_token FROM settings LIMIT 1")
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(r) => Ok(Some(Settings {
                app_id: r.try_get::<Option<String>, _>("app_id")?.unwrap_or_default(),
                page_id: r.try_get::<Option<String>, _>("page_id")?.unwrap_or_default(),
                access_token: r.try_get::<Option<String>, _>("access_token")?.unwrap_or_default(),
            })),
            None => Ok(None),
        }
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM settings").execute(&mut *tx).await?;

        sqlx::query("INSERT INTO settings (app_id, page_id, access_token) VALUES ($1, $2, $3)")
            .bind(&settings.app_id)
            .bind(&settings.page_id)
            .bind(&settings.access_token)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("Saved settings for page {}", settings.page_id);
        Ok(())
    }
}
