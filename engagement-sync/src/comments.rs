use crate::paginator::Paginator;
use crate::traits::FeedClient;
use crate::types::{Comment, PageCursor, Result};
use std::cmp::Ordering;
use tracing::info;

/// Walks every comment page for a published item and returns the comments
/// newest first. Comments without a usable timestamp go last, in feed order.
pub async fn load_all_comments(
    client: &dyn FeedClient,
    paginator: &Paginator,
    remote_id: &str,
    access_token: &str,
) -> Result<Vec<Comment>> {
    let mut comments = paginator
        .collect_all(PageCursor::First, |cursor| async move {
            client.fetch_comments_page(remote_id, &cursor, access_token).await
        })
        .await?;

    sort_newest_first(&mut comments);
    info!("Loaded {} comments for {}", comments.len(), remote_id);
    Ok(comments)
}

pub fn sort_newest_first(comments: &mut [Comment]) {
    comments.sort_by(|a, b| match (a.created_at, b.created_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
