use crate::traits::{FeedClient, ItemStore};
use crate::types::{Item, MetricSnapshot, RefreshReport, Result, SyncError};
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

enum ItemOutcome {
    Updated,
    Unavailable,
    Missing,
    NotAttempted,
}

/// Pulls fresh counters for every published item and writes each success
/// back to the store as soon as it arrives. A failed remote lookup, or a row
/// deleted mid-batch, only affects that item and the batch moves on.
pub struct MetricsRefresher<'a> {
    client: &'a dyn FeedClient,
    store: &'a dyn ItemStore,
    access_token: &'a str,
    concurrency: usize,
    cancel: Option<CancellationToken>,
}

impl<'a> MetricsRefresher<'a> {
    pub fn new(client: &'a dyn FeedClient, store: &'a dyn ItemStore, access_token: &'a str) -> Self {
        Self {
            client,
            store,
            access_token,
            concurrency: 1,
            cancel: None,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Items that are published and carry a remote identifier, with that identifier.
    pub fn qualifying(items: &[Item]) -> Vec<(i64, &str)> {
        items
            .iter()
            .filter(|item| item.is_published())
            .filter_map(|item| item.linked_remote_id().map(|remote_id| (item.id, remote_id)))
            .collect()
    }

    pub async fn refresh_all(&self, items: &[Item]) -> Result<RefreshReport> {
        let targets = Self::qualifying(items);
        let mut report = RefreshReport {
            qualifying: targets.len(),
            ..Default::default()
        };

        info!(
            "Refreshing metrics for {} of {} items (concurrency {})",
            targets.len(),
            items.len(),
            self.concurrency
        );

        let outcomes: Vec<ItemOutcome> = if self.concurrency == 1 {
            let mut outcomes = Vec::with_capacity(targets.len());
            for (position, (id, remote_id)) in targets.iter().enumerate() {
                debug!("Refreshing item {} of {}", position + 1, targets.len());
                outcomes.push(self.refresh_one(*id, remote_id).await?);
            }
            outcomes
        } else {
            stream::iter(targets.iter().map(|(id, remote_id)| self.refresh_one(*id, remote_id)))
                .buffer_unordered(self.concurrency)
                .try_collect()
                .await?
        };

        for outcome in outcomes {
            match outcome {
                ItemOutcome::Updated => report.updated += 1,
                ItemOutcome::Unavailable => report.unavailable += 1,
                ItemOutcome::Missing => report.missing += 1,
                ItemOutcome::NotAttempted => report.cancelled = true,
            }
        }

        info!(
            "Metrics refresh finished: {} updated, {} unavailable, {} missing, {} skipped",
            report.updated,
            report.unavailable,
            report.missing,
            report.skipped()
        );
        Ok(report)
    }

    async fn refresh_one(&self, id: i64, remote_id: &str) -> Result<ItemOutcome> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Ok(ItemOutcome::NotAttempted);
        }

        match self.client.fetch_metrics(remote_id, self.access_token).await {
            MetricSnapshot::Available(metrics) => match self.store.update_metrics(id, metrics).await {
                Ok(()) => {
                    debug!("Item {} now at {:?}", id, metrics);
                    Ok(ItemOutcome::Updated)
                }
                Err(SyncError::ItemNotFound { .. }) => {
                    warn!("Item {} disappeared before its metrics could be stored", id);
                    Ok(ItemOutcome::Missing)
                }
                Err(e) => Err(e),
            },
            MetricSnapshot::Unavailable => {
                warn!("Skipping item {}: metrics unavailable for {}", id, remote_id);
                Ok(ItemOutcome::Unavailable)
            }
        }
    }
}
