//! Ranking and rollups over a snapshot of stored items.
//!
//! Everything here is recomputed from scratch on each call. `now` is passed
//! in so the same input always produces the same snapshot.

use crate::types::{AnalyticsSnapshot, DataQuality, Item, RankedRow, TopItem, WindowRollup};
use chrono::{DateTime, Duration, Utc};

pub const SHORT_WINDOW_DAYS: i64 = 7;
pub const LONG_WINDOW_DAYS: i64 = 30;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

pub fn compute_analytics(items: &[Item], now: DateTime<Utc>) -> AnalyticsSnapshot {
    let published: Vec<&Item> = items.iter().filter(|item| item.is_published()).collect();
    let draft_count = items.len() - published.len();

    let total_likes: u64 = published.iter().map(|item| item.like_count as u64).sum();
    let total_comments: u64 = published.iter().map(|item| item.comment_count as u64).sum();
    let total_shares: u64 = published.iter().map(|item| item.share_count as u64).sum();
    let total_interactions = total_likes + total_comments + total_shares;

    let average_interactions = if published.is_empty() {
        0.0
    } else {
        total_interactions as f64 / published.len() as f64
    };

    let rows = rank(&published, now);
    let top_item = rows.first().map(|row| TopItem {
        headline: row.headline.clone(),
        score: row.score,
        interactions: row.interactions,
    });

    let data_quality = DataQuality {
        linked: published
            .iter()
            .filter(|item| item.linked_remote_id().is_some())
            .count(),
        published: published.len(),
    };

    AnalyticsSnapshot {
        computed_at: now,
        total_likes,
        total_comments,
        total_shares,
        total_interactions,
        published_count: published.len(),
        draft_count,
        average_interactions,
        top_item,
        last_7_days: window_rollup(&published, now, SHORT_WINDOW_DAYS),
        last_30_days: window_rollup(&published, now, LONG_WINDOW_DAYS),
        data_quality,
        rows,
    }
}

/// Whole days since publication, rounded up and never below one.
/// Items without a publish timestamp report zero.
pub fn days_online(published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    match published_at {
        Some(published_at) => {
            let elapsed_days = (now - published_at).num_milliseconds() as f64 / MILLIS_PER_DAY;
            (elapsed_days.ceil() as i64).max(1)
        }
        None => 0,
    }
}

fn rank(published: &[&Item], now: DateTime<Utc>) -> Vec<RankedRow> {
    let mut rows: Vec<RankedRow> = published
        .iter()
        .map(|item| {
            let metrics = item.metrics();
            let interactions = metrics.interactions();
            let days_online = days_online(item.published_at, now);
            let interactions_per_day = if days_online > 0 {
                Some(interactions as f64 / days_online as f64)
            } else {
                None
            };

            RankedRow {
                rank: 0,
                item_id: item.id,
                headline: item.headline.clone(),
                published_at: item.published_at,
                remote_id: item.remote_id.clone(),
                likes: item.like_count,
                comments: item.comment_count,
                shares: item.share_count,
                interactions,
                score: metrics.score(),
                days_online,
                interactions_per_day,
            }
        })
        .collect();

    // sort_by is stable: equal score and interactions keep input order
    rows.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.interactions.cmp(&a.interactions))
    });

    for (index, row) in rows.iter_mut().enumerate() {
        row.rank = index + 1;
    }

    rows
}

fn window_rollup(published: &[&Item], now: DateTime<Utc>, days: i64) -> WindowRollup {
    let boundary = now - Duration::days(days);
    let in_window: Vec<&&Item> = published
        .iter()
        .filter(|item| item.published_at.is_some_and(|at| at >= boundary))
        .collect();

    WindowRollup {
        days,
        items: in_window.len(),
        interactions: in_window.iter().map(|item| item.metrics().interactions()).sum(),
    }
}
