use crate::analytics::compute_analytics;
use crate::comments::load_all_comments;
use crate::media::MediaLibrary;
use crate::paginator::Paginator;
use crate::refresher::MetricsRefresher;
use crate::traits::{FeedClient, ItemStore};
use crate::types::{
    AnalyticsSnapshot, Comment, Item, NewItem, RefreshReport, Result, Settings, SyncConfig, SyncError,
};
use chrono::Utc;
use interfaces::headline_of;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemFilter {
    #[default]
    All,
    Drafts,
    Published,
}

impl ItemFilter {
    fn matches(&self, item: &Item) -> bool {
        match self {
            ItemFilter::All => true,
            ItemFilter::Drafts => !item.is_published(),
            ItemFilter::Published => item.is_published(),
        }
    }
}

/// Operator workflows over an injected remote client and store.
///
/// Each call runs to completion on its own; callers serialise them.
pub struct EngagementService {
    client: Arc<dyn FeedClient>,
    store: Arc<dyn ItemStore>,
    media: MediaLibrary,
    config: SyncConfig,
}

impl EngagementService {
    pub fn new(client: Arc<dyn FeedClient>, store: Arc<dyn ItemStore>, config: SyncConfig) -> Self {
        let media = MediaLibrary::new(config.media_dir.clone());
        Self {
            client,
            store,
            media,
            config,
        }
    }

    pub fn media(&self) -> &MediaLibrary {
        &self.media
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.store.save_settings(settings).await
    }

    pub async fn load_settings(&self) -> Result<Option<Settings>> {
        self.store.load_settings().await
    }

    async fn credentials(&self) -> Result<Settings> {
        match self.store.load_settings().await? {
            Some(settings) if settings.has_token() => Ok(settings),
            _ => Err(SyncError::MissingSettings),
        }
    }

    async fn existing_item(&self, id: i64) -> Result<Item> {
        self.store
            .item_by_id(id)
            .await?
            .ok_or(SyncError::ItemNotFound { id })
    }

    pub async fn create_draft(&self, full_text: &str, media_source: &Path) -> Result<i64> {
        validate_draft(full_text, media_source)?;

        let media_path = self.media.import(media_source, None).await?;
        let draft = NewItem::draft(full_text, &media_path.to_string_lossy());
        self.store.insert_item(&draft).await
    }

    /// Rewrites a draft. When the image changes, the previous managed file is
    /// removed after the row has been updated.
    pub async fn update_draft(&self, id: i64, full_text: &str, media_source: &Path) -> Result<()> {
        validate_draft(full_text, media_source)?;

        let existing = self.existing_item(id).await?;
        if existing.is_published() {
            return Err(SyncError::InvalidState(format!(
                "item {} is published and can no longer be edited",
                id
            )));
        }

        let media_path = self
            .media
            .import(media_source, Some(Path::new(&existing.media_path)))
            .await?;
        let updated = Item {
            headline: headline_of(full_text),
            full_text: full_text.to_string(),
            media_path: media_path.to_string_lossy().into_owned(),
            ..existing.clone()
        };
        self.store.update_item(&updated).await?;

        if existing.media_path != updated.media_path {
            self.media.discard(Path::new(&existing.media_path)).await;
        }

        info!("Draft {} updated", id);
        Ok(())
    }

    pub async fn delete_item(&self, id: i64) -> Result<()> {
        let existing = self.existing_item(id).await?;
        self.store.delete_item(id).await?;
        self.media.discard(Path::new(&existing.media_path)).await;
        Ok(())
    }

    pub async fn list_items(&self, filter: ItemFilter) -> Result<Vec<Item>> {
        let items = self.store.all_items().await?;
        Ok(items.into_iter().filter(|item| filter.matches(item)).collect())
    }

    /// Uploads a draft and records the remote identifier it was given.
    pub async fn publish_item(&self, id: i64) -> Result<String> {
        let item = self.existing_item(id).await?;
        if item.is_published() {
            return Err(SyncError::InvalidState(format!("item {} is already published", id)));
        }

        let settings = self.credentials().await?;
        let media = self.media.read(Path::new(&item.media_path)).await?;

        let remote_id = self.client.publish(&item.full_text, media, &settings).await?;
        self.store.mark_published(id, &remote_id, Utc::now()).await?;

        info!("Item {} published as {}", id, remote_id);
        Ok(remote_id)
    }

    pub async fn test_connection(&self, page_id: &str, access_token: &str) -> Result<String> {
        let page_id = page_id.trim();
        let access_token = access_token.trim();
        if page_id.is_empty() || access_token.is_empty() {
            return Err(SyncError::InvalidState("page id and access token are required".to_string()));
        }

        let page_name = self.client.validate_credentials(page_id, access_token).await?;
        info!("Connected to page {}", page_name);
        Ok(page_name)
    }

    pub async fn refresh_statistics(&self, cancel: Option<CancellationToken>) -> Result<RefreshReport> {
        let settings = self.credentials().await?;
        let items = self.store.all_items().await?;

        let mut refresher = MetricsRefresher::new(self.client.as_ref(), self.store.as_ref(), &settings.access_token)
            .with_concurrency(self.config.refresh_concurrency);
        if let Some(token) = cancel {
            refresher = refresher.with_cancellation(token);
        }

        let report = refresher.refresh_all(&items).await?;
        if report.qualifying == 0 {
            warn!("No published items with a remote identifier to refresh");
        }
        Ok(report)
    }

    pub async fn load_comments(&self, id: i64, cancel: Option<CancellationToken>) -> Result<Vec<Comment>> {
        let item = self.existing_item(id).await?;
        let remote_id = item.linked_remote_id().ok_or_else(|| {
            SyncError::InvalidState(format!("item {} has no remote identifier", id))
        })?;

        let settings = self.credentials().await?;
        let mut paginator = Paginator::new();
        if let Some(token) = cancel {
            paginator = paginator.with_cancellation(token);
        }

        load_all_comments(self.client.as_ref(), &paginator, remote_id, &settings.access_token).await
    }

    pub async fn analytics(&self) -> Result<AnalyticsSnapshot> {
        let items = self.store.all_items().await?;
        Ok(compute_analytics(&items, Utc::now()))
    }
}

fn validate_draft(full_text: &str, media_source: &Path) -> Result<()> {
    if full_text.trim().is_empty() {
        return Err(SyncError::InvalidState("a draft needs text".to_string()));
    }
    if media_source.as_os_str().is_empty() {
        return Err(SyncError::InvalidState("a draft needs an image".to_string()));
    }
    Ok(())
}
