use crate::types::{Comment, Metrics, Page, Result, SyncError};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

/// Parses `{"likes": {"summary": {"total_count": n}}, "comments": {...}, "shares": {"count": n}}`.
/// Missing sub-objects count as zero.
pub fn parse_metrics(body: &str) -> Result<Metrics> {
    let data: Value = serde_json::from_str(body)?;

    Ok(Metrics {
        likes: count_at(&data, &["likes", "summary", "total_count"]),
        comments: count_at(&data, &["comments", "summary", "total_count"]),
        shares: count_at(&data, &["shares", "count"]),
    })
}

/// Parses one comments page envelope (`data` array plus `paging.next`).
///
/// A body that is not JSON, or lacks the expected fields, is read as an empty
/// final page rather than an error.
pub fn parse_comments_page(body: &str) -> Page<Comment> {
    let data: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            warn!("Unreadable comments envelope, treating as empty page: {}", e);
            return Page::empty();
        }
    };

    let entries: Vec<Comment> = data
        .get("data")
        .and_then(Value::as_array)
        .map(|comments| comments.iter().map(parse_comment).collect())
        .unwrap_or_default();

    let next = data
        .get("paging")
        .and_then(|paging| paging.get("next"))
        .and_then(Value::as_str)
        .filter(|next| !next.is_empty())
        .map(str::to_string);

    debug!("Parsed comments page with {} entries (next: {})", entries.len(), next.is_some());
    Page { entries, next }
}

fn parse_comment(comment: &Value) -> Comment {
    let author = str_at(comment, &["from", "name"])
        .or_else(|| str_at(comment, &["username"]))
        .or_else(|| str_at(comment, &["from", "id"]))
        .unwrap_or("Unknown")
        .to_string();

    let message = str_at(comment, &["message"]).unwrap_or("").to_string();
    let created_at = str_at(comment, &["created_time"]).and_then(parse_timestamp);

    Comment {
        author,
        message,
        created_at,
    }
}

/// Accepts the remote's `2024-03-01T10:00:00+0000` form as well as RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|t| t.and_utc())
        })
}

/// Remote identifier from a publish response: `id`, falling back to `post_id`.
pub fn parse_published_id(body: &str) -> Result<String> {
    let data: Value = serde_json::from_str(body)?;

    str_at(&data, &["id"])
        .or_else(|| str_at(&data, &["post_id"]))
        .map(str::to_string)
        .ok_or_else(|| SyncError::Parse("publish response carries no id".to_string()))
}

pub fn parse_page_name(body: &str) -> Result<String> {
    let data: Value = serde_json::from_str(body)?;

    str_at(&data, &["name"])
        .map(str::to_string)
        .ok_or_else(|| SyncError::Parse("page response carries no name".to_string()))
}

/// The remote's own `error.message`, when the body has one.
pub fn parse_error_message(body: &str) -> Option<String> {
    let data: Value = serde_json::from_str(body).ok()?;
    str_at(&data, &["error", "message"])
        .filter(|message| !message.trim().is_empty())
        .map(str::to_string)
}

fn value_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    value_at(value, path).and_then(Value::as_str)
}

fn count_at(value: &Value, path: &[&str]) -> u32 {
    value_at(value, path)
        .and_then(Value::as_u64)
        .map(|count| count.min(u32::MAX as u64) as u32)
        .unwrap_or(0)
}
