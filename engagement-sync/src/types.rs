use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub use interfaces::defs::{Comment, Item, ItemStatus, MetricSnapshot, Metrics, NewItem, Settings};

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub api_base: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub comments_page_size: u32,
    pub refresh_concurrency: usize,
    pub media_dir: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base: "https://graph.facebook.com".to_string(),
            user_agent: "Engagement-Sync/1.0".to_string(),
            timeout_seconds: 30,
            max_retries: 0,
            retry_delay_seconds: 1,
            comments_page_size: 100,
            refresh_concurrency: 1,
            media_dir: PathBuf::from("media"),
        }
    }
}

impl SyncConfig {
    /// Defaults overlaid with `ENGAGEMENT_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base: env::var("ENGAGEMENT_API_BASE").unwrap_or(defaults.api_base),
            user_agent: defaults.user_agent,
            timeout_seconds: env_or("ENGAGEMENT_TIMEOUT_SECONDS", defaults.timeout_seconds),
            max_retries: env_or("ENGAGEMENT_MAX_RETRIES", defaults.max_retries),
            retry_delay_seconds: defaults.retry_delay_seconds,
            comments_page_size: defaults.comments_page_size,
            refresh_concurrency: env_or("ENGAGEMENT_REFRESH_CONCURRENCY", defaults.refresh_concurrency).max(1),
            media_dir: env::var("ENGAGEMENT_MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_dir),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

/// Where the next page of a paginated feed starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    First,
    Next(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub entries: Vec<T>,
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            next: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub qualifying: usize,
    pub updated: usize,
    pub unavailable: usize,
    /// Rows deleted between loading the batch and writing their metrics.
    pub missing: usize,
    pub cancelled: bool,
}

impl RefreshReport {
    /// Qualifying items whose stored metrics were left untouched.
    pub fn skipped(&self) -> usize {
        self.qualifying - self.updated
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRow {
    pub rank: usize,
    pub item_id: i64,
    pub headline: String,
    pub published_at: Option<DateTime<Utc>>,
    pub remote_id: Option<String>,
    pub likes: u32,
    pub comments: u32,
    pub shares: u32,
    pub interactions: u64,
    pub score: u64,
    pub days_online: i64,
    pub interactions_per_day: Option<f64>,
}

impl RankedRow {
    pub fn interactions_per_day_display(&self) -> String {
        match self.interactions_per_day {
            Some(rate) => format!("{:.2}", rate),
            None => "-".to_string(),
        }
    }

    pub fn published_display(&self) -> String {
        self.published_at
            .map(|t| t.format("%d.%m.%Y").to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopItem {
    pub headline: String,
    pub score: u64,
    pub interactions: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRollup {
    pub days: i64,
    pub items: usize,
    pub interactions: u64,
}

impl fmt::Display for WindowRollup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} items | {} interactions", self.items, self.interactions)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQuality {
    pub linked: usize,
    pub published: usize,
}

impl DataQuality {
    pub fn ratio(&self) -> Option<f64> {
        if self.published == 0 {
            None
        } else {
            Some(self.linked as f64 / self.published as f64)
        }
    }
}

impl fmt::Display for DataQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.linked, self.published)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub computed_at: DateTime<Utc>,
    pub total_likes: u64,
    pub total_comments: u64,
    pub total_shares: u64,
    pub total_interactions: u64,
    pub published_count: usize,
    pub draft_count: usize,
    pub average_interactions: f64,
    pub top_item: Option<TopItem>,
    pub last_7_days: WindowRollup,
    pub last_30_days: WindowRollup,
    pub data_quality: DataQuality,
    pub rows: Vec<RankedRow>,
}

impl AnalyticsSnapshot {
    pub fn average_interactions_display(&self) -> String {
        format!("{:.1}", self.average_interactions)
    }

    pub fn top_item_display(&self) -> String {
        match &self.top_item {
            Some(top) => format!("Score: {} | Interactions: {}", top.score, top.interactions),
            None => "Score: 0".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Remote rejected the request: {message}")]
    Rejected { status: Option<u16>, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Item not found: {id}")]
    ItemNotFound { id: i64 },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("No credentials configured")]
    MissingSettings,

    #[error("Operation cancelled")]
    Cancelled,
}

impl SyncError {
    /// Only transport failures are worth trying again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
