use crate::traits::{FeedClient, ItemStore};
use crate::types::{
    Comment, Item, ItemStatus, MetricSnapshot, Metrics, NewItem, Page, PageCursor, Result, Settings,
    SyncError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::RwLock;
use tracing::debug;

/// In-process stand-in for the remote endpoint, for development and tests.
///
/// Comment pages registered with `with_comment_pages` are chained through
/// synthetic cursors `"{remote_id}#page={n}"`.
#[derive(Default)]
pub struct MockFeedClient {
    metrics: HashMap<String, MetricSnapshot>,
    comment_pages: HashMap<String, Vec<Vec<Comment>>>,
    failing_pages: HashSet<(String, usize)>,
    publish_id: Option<String>,
    page_name: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl MockFeedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(mut self, remote_id: &str, snapshot: MetricSnapshot) -> Self {
        self.metrics.insert(remote_id.to_string(), snapshot);
        self
    }

    pub fn with_comment_pages(mut self, remote_id: &str, pages: Vec<Vec<Comment>>) -> Self {
        self.comment_pages.insert(remote_id.to_string(), pages);
        self
    }

    /// Makes the zero-based page `index` of `remote_id` fail with a transport error.
    pub fn with_failing_page(mut self, remote_id: &str, index: usize) -> Self {
        self.failing_pages.insert((remote_id.to_string(), index));
        self
    }

    pub fn with_publish_id(mut self, remote_id: &str) -> Self {
        self.publish_id = Some(remote_id.to_string());
        self
    }

    pub fn with_page_name(mut self, name: &str) -> Self {
        self.page_name = Some(name.to_string());
        self
    }

    /// Every call made so far, as `"{operation}:{argument}"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn page_index(remote_id: &str, cursor: &PageCursor) -> Result<usize> {
        match cursor {
            PageCursor::First => Ok(0),
            PageCursor::Next(next) => next
                .strip_prefix(&format!("{}#page=", remote_id))
                .and_then(|index| index.parse().ok())
                .ok_or_else(|| SyncError::Parse(format!("unknown cursor {}", next))),
        }
    }
}

#[async_trait]
impl FeedClient for MockFeedClient {
    async fn fetch_metrics(&self, remote_id: &str, _access_token: &str) -> MetricSnapshot {
        self.record(format!("metrics:{}", remote_id));
        self.metrics
            .get(remote_id)
            .copied()
            .unwrap_or(MetricSnapshot::Unavailable)
    }

    async fn fetch_comments_page(
        &self,
        remote_id: &str,
        cursor: &PageCursor,
        _access_token: &str,
    ) -> Result<Page<Comment>> {
        let index = Self::page_index(remote_id, cursor)?;
        self.record(format!("comments:{}#{}", remote_id, index));

        if self.failing_pages.contains(&(remote_id.to_string(), index)) {
            return Err(SyncError::Transport(format!("page {} unreachable", index)));
        }

        let pages = match self.comment_pages.get(remote_id) {
            Some(pages) => pages,
            None => return Ok(Page::empty()),
        };

        let entries = pages.get(index).cloned().unwrap_or_default();
        let next = if index + 1 < pages.len() {
            Some(format!("{}#page={}", remote_id, index + 1))
        } else {
            None
        };
        Ok(Page { entries, next })
    }

    async fn publish(&self, message: &str, media: Vec<u8>, settings: &Settings) -> Result<String> {
        self.record(format!("publish:{}:{}", settings.page_id, media.len()));
        debug!("Mock publish of {} chars", message.len());
        self.publish_id.clone().ok_or_else(|| SyncError::Rejected {
            status: Some(400),
            message: "Upload failed".to_string(),
        })
    }

    async fn validate_credentials(&self, page_id: &str, _access_token: &str) -> Result<String> {
        self.record(format!("validate:{}", page_id));
        self.page_name.clone().ok_or_else(|| SyncError::Rejected {
            status: Some(400),
            message: "Invalid OAuth access token.".to_string(),
        })
    }
}

#[derive(Default)]
struct MemoryState {
    items: BTreeMap<i64, Item>,
    settings: Option<Settings>,
    next_id: i64,
    metric_writes: usize,
}

/// `ItemStore` kept entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully formed item as-is, keeping its id.
    pub async fn put(&self, item: Item) {
        let mut state = self.state.write().await;
        state.next_id = state.next_id.max(item.id);
        state.items.insert(item.id, item);
    }

    pub async fn metric_writes(&self) -> usize {
        self.state.read().await.metric_writes
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn all_items(&self) -> Result<Vec<Item>> {
        let state = self.state.read().await;
        Ok(state.items.values().rev().cloned().collect())
    }

    async fn item_by_id(&self, id: i64) -> Result<Option<Item>> {
        Ok(self.state.read().await.items.get(&id).cloned())
    }

    async fn insert_item(&self, item: &NewItem) -> Result<i64> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let id = state.next_id;
        state.items.insert(
            id,
            Item {
                id,
                remote_id: None,
                status: ItemStatus::Draft,
                headline: item.headline.clone(),
                full_text: item.full_text.clone(),
                media_path: item.media_path.clone(),
                like_count: 0,
                comment_count: 0,
                share_count: 0,
                published_at: None,
            },
        );
        Ok(id)
    }

    async fn update_item(&self, item: &Item) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state
            .items
            .get_mut(&item.id)
            .ok_or(SyncError::ItemNotFound { id: item.id })?;
        stored.headline = item.headline.clone();
        stored.full_text = item.full_text.clone();
        stored.media_path = item.media_path.clone();
        Ok(())
    }

    async fn delete_item(&self, id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .items
            .remove(&id)
            .map(|_| ())
            .ok_or(SyncError::ItemNotFound { id })
    }

    async fn update_metrics(&self, id: i64, metrics: Metrics) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state.items.get_mut(&id).ok_or(SyncError::ItemNotFound { id })?;
        stored.like_count = metrics.likes;
        stored.comment_count = metrics.comments;
        stored.share_count = metrics.shares;
        state.metric_writes += 1;
        Ok(())
    }

    async fn mark_published(&self, id: i64, remote_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state.items.get_mut(&id).ok_or(SyncError::ItemNotFound { id })?;
        stored.status = ItemStatus::Published;
        stored.remote_id = Some(remote_id.to_string());
        stored.published_at = Some(at);
        Ok(())
    }

    async fn load_settings(&self) -> Result<Option<Settings>> {
        Ok(self.state.read().await.settings.clone())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.state.write().await.settings = Some(settings.clone());
        Ok(())
    }
}
