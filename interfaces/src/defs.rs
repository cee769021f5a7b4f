use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    Draft,
    Published,
}

impl ItemStatus {
    /// Stored representation: 0 = draft, 1 = published. Anything else reads back as a draft.
    pub fn from_code(code: i64) -> Self {
        if code == 1 {
            ItemStatus::Published
        } else {
            ItemStatus::Draft
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            ItemStatus::Draft => 0,
            ItemStatus::Published => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Draft => "Draft",
            ItemStatus::Published => "Published",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub remote_id: Option<String>,
    pub status: ItemStatus,
    pub headline: String,
    pub full_text: String,
    pub media_path: String,
    pub like_count: u32,
    pub comment_count: u32,
    pub share_count: u32,
    pub published_at: Option<DateTime<Utc>>,
}

impl Item {
    pub fn is_published(&self) -> bool {
        self.status == ItemStatus::Published
    }

    /// Remote identifier, if present and not blank.
    pub fn linked_remote_id(&self) -> Option<&str> {
        self.remote_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            likes: self.like_count,
            comments: self.comment_count,
            shares: self.share_count,
        }
    }
}

/// Content for a new draft before the store assigns it an id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub headline: String,
    pub full_text: String,
    pub media_path: String,
}

impl NewItem {
    pub fn draft(full_text: &str, media_path: &str) -> Self {
        Self {
            headline: headline_of(full_text),
            full_text: full_text.to_owned(),
            media_path: media_path.to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub message: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn preview_text(&self) -> String {
        let created = self
            .created_at
            .map(|t| t.format("%d.%m.%Y %H:%M").to_string())
            .unwrap_or_else(|| "-".to_owned());
        format!("{} ({}): {}", self.author, created, self.message)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub likes: u32,
    pub comments: u32,
    pub shares: u32,
}

impl Metrics {
    pub fn interactions(&self) -> u64 {
        self.likes as u64 + self.comments as u64 + self.shares as u64
    }

    /// Likes weigh 1, comments 2, shares 3.
    pub fn score(&self) -> u64 {
        self.likes as u64 + self.comments as u64 * 2 + self.shares as u64 * 3
    }
}

/// Outcome of a single remote metrics query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricSnapshot {
    Available(Metrics),
    Unavailable,
}

impl MetricSnapshot {
    pub fn metrics(&self) -> Option<Metrics> {
        match self {
            MetricSnapshot::Available(metrics) => Some(*metrics),
            MetricSnapshot::Unavailable => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub app_id: String,
    pub page_id: String,
    pub access_token: String,
}

impl Settings {
    pub fn has_token(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}

/// First line of the text, used as an item's headline.
pub fn headline_of(text: &str) -> String {
    text.lines().next().unwrap_or("").to_owned()
}

// Object style note:
// These are plain records passed between the store, the remote client and
// the ranking code. Nothing here performs I/O; the engine crate owns the
// collaborators that load and persist them.
