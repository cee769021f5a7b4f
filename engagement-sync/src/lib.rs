pub mod types;
pub mod traits;
pub mod parser;
pub mod client;
pub mod paginator;
pub mod comments;
pub mod refresher;
pub mod analytics;
pub mod store;
pub mod media;
pub mod service;
pub mod mock;

pub use types::*;
pub use traits::{FeedClient, ItemStore};
pub use client::GraphClient;
pub use paginator::Paginator;
pub use refresher::MetricsRefresher;
pub use analytics::compute_analytics;
pub use store::SqliteStore;
pub use media::MediaLibrary;
pub use service::{EngagementService, ItemFilter};
pub use mock::{MemoryStore, MockFeedClient};
