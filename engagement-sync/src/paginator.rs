use crate::types::{Page, PageCursor, Result, SyncError};
use std::collections::HashSet;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Follows `next` cursors until the feed runs out.
///
/// Any page failure aborts the walk and discards what was gathered so far.
/// Cancellation is checked between pages, never while a fetch is in flight.
#[derive(Default)]
pub struct Paginator {
    cancel: Option<CancellationToken>,
}

impl Paginator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub async fn collect_all<T, F, Fut>(&self, start: PageCursor, mut fetch: F) -> Result<Vec<T>>
    where
        F: FnMut(PageCursor) -> Fut,
        Fut: Future<Output = Result<Page<T>>>,
    {
        let mut entries = Vec::new();
        let mut cursor = start;
        let mut pages = 0usize;
        let mut followed: HashSet<String> = HashSet::new();
        if let PageCursor::Next(first) = &cursor {
            followed.insert(first.clone());
        }

        loop {
            if self.is_cancelled() {
                debug!("Pagination cancelled after {} pages", pages);
                return Err(SyncError::Cancelled);
            }

            let page = fetch(cursor.clone()).await?;
            pages += 1;
            debug!("Page {} returned {} entries", pages, page.entries.len());
            entries.extend(page.entries);

            match page.next {
                Some(next) if !followed.insert(next.clone()) => {
                    warn!("Feed cursor cycles back to an earlier page, stopping after {} pages", pages);
                    break;
                }
                Some(next) => cursor = PageCursor::Next(next),
                None => break,
            }
        }

        debug!("Pagination finished: {} entries over {} pages", entries.len(), pages);
        Ok(entries)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}
