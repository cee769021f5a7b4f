use crate::types::{Comment, Item, MetricSnapshot, Metrics, NewItem, Page, PageCursor, Result, Settings};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Remote social-media endpoint. Every call is one logical round trip and
/// carries the bearer credential it needs; nothing is cached between calls.
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Current counters for a published item. Never fails: any transport or
    /// remote error comes back as `MetricSnapshot::Unavailable`.
    async fn fetch_metrics(&self, remote_id: &str, access_token: &str) -> MetricSnapshot;

    /// One page of comments. Errors propagate so pagination can abort.
    async fn fetch_comments_page(
        &self,
        remote_id: &str,
        cursor: &PageCursor,
        access_token: &str,
    ) -> Result<Page<Comment>>;

    /// Upload a photo post and return the remote identifier. Single attempt.
    async fn publish(&self, message: &str, media: Vec<u8>, settings: &Settings) -> Result<String>;

    /// Connectivity check; returns the page's display name.
    async fn validate_credentials(&self, page_id: &str, access_token: &str) -> Result<String>;
}

/// Local record store. Each write is durable before it returns.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// All items, newest first.
    async fn all_items(&self) -> Result<Vec<Item>>;

    async fn item_by_id(&self, id: i64) -> Result<Option<Item>>;

    async fn insert_item(&self, item: &NewItem) -> Result<i64>;

    /// Rewrites headline, text and media path. Status and metrics are untouched.
    async fn update_item(&self, item: &Item) -> Result<()>;

    async fn delete_item(&self, id: i64) -> Result<()>;

    async fn update_metrics(&self, id: i64, metrics: Metrics) -> Result<()>;

    async fn mark_published(&self, id: i64, remote_id: &str, at: DateTime<Utc>) -> Result<()>;

    async fn load_settings(&self) -> Result<Option<Settings>>;

    /// Replaces whatever settings row exists; there is never more than one.
    async fn save_settings(&self, settings: &Settings) -> Result<()>;
}
