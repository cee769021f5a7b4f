use chrono::{Duration, Utc};
use engagement_sync::{
    Comment, EngagementService, Item, ItemFilter, ItemStatus, ItemStore, MemoryStore, MetricSnapshot,
    Metrics, MockFeedClient, Settings, SqliteStore, SyncConfig, SyncError,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

struct Fixture {
    service: EngagementService,
    client: Arc<MockFeedClient>,
    store: Arc<MemoryStore>,
    workdir: TempDir,
}

impl Fixture {
    fn new(client: MockFeedClient) -> Self {
        let workdir = tempfile::tempdir().unwrap();
        let config = SyncConfig {
            media_dir: workdir.path().join("media"),
            ..SyncConfig::default()
        };
        let client = Arc::new(client);
        let store = Arc::new(MemoryStore::new());
        let service = EngagementService::new(client.clone(), store.clone(), config);
        Self {
            service,
            client,
            store,
            workdir,
        }
    }

    fn image(&self, name: &str) -> PathBuf {
        let path = self.workdir.path().join(name);
        std::fs::write(&path, name.as_bytes()).unwrap();
        path
    }

    async fn with_credentials(self) -> Self {
        self.service
            .save_settings(&Settings {
                app_id: "app".to_string(),
                page_id: "page-1".to_string(),
                access_token: "secret".to_string(),
            })
            .await
            .unwrap();
        self
    }
}

fn published_item(id: i64, remote_id: &str, likes: u32) -> Item {
    Item {
        id,
        remote_id: Some(remote_id.to_string()),
        status: ItemStatus::Published,
        headline: format!("Published {}", id),
        full_text: format!("Published {}", id),
        media_path: String::new(),
        like_count: likes,
        comment_count: 0,
        share_count: 0,
        published_at: Some(Utc::now() - Duration::days(2)),
    }
}

#[tokio::test]
async fn draft_is_created_with_a_managed_copy_of_the_image() {
    init_tracing();
    let fixture = Fixture::new(MockFeedClient::new());
    let source = fixture.image("beach.jpg");

    let id = fixture
        .service
        .create_draft("Beach day\nSun all week", &source)
        .await
        .unwrap();

    let item = fixture.store.item_by_id(id).await.unwrap().unwrap();
    assert_eq!(item.headline, "Beach day");
    assert_eq!(item.status, ItemStatus::Draft);
    assert!(fixture.service.media().is_managed(Path::new(&item.media_path)));
    assert!(item.media_path.ends_with(".jpg"));
    assert!(source.exists());
}

#[tokio::test]
async fn drafts_need_text_and_an_image() {
    init_tracing();
    let fixture = Fixture::new(MockFeedClient::new());
    let source = fixture.image("a.png");

    assert!(matches!(
        fixture.service.create_draft("   ", &source).await,
        Err(SyncError::InvalidState(_))
    ));
    assert!(matches!(
        fixture.service.create_draft("text", Path::new("")).await,
        Err(SyncError::InvalidState(_))
    ));
    assert!(fixture.store.all_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn editing_a_draft_replaces_its_image() {
    init_tracing();
    let fixture = Fixture::new(MockFeedClient::new());
    let id = fixture
        .service
        .create_draft("First", &fixture.image("one.jpg"))
        .await
        .unwrap();
    let old_media = fixture.store.item_by_id(id).await.unwrap().unwrap().media_path;

    fixture
        .service
        .update_draft(id, "Second\nmore", &fixture.image("two.jpg"))
        .await
        .unwrap();

    let item = fixture.store.item_by_id(id).await.unwrap().unwrap();
    assert_eq!(item.headline, "Second");
    assert_ne!(item.media_path, old_media);
    assert!(!Path::new(&old_media).exists());
    assert!(Path::new(&item.media_path).exists());
}

#[tokio::test]
async fn publishing_marks_the_item_and_blocks_further_edits() {
    init_tracing();
    let fixture = Fixture::new(MockFeedClient::new().with_publish_id("page-1_999"))
        .with_credentials()
        .await;
    let id = fixture
        .service
        .create_draft("Going live", &fixture.image("live.jpg"))
        .await
        .unwrap();

    let remote_id = fixture.service.publish_item(id).await.unwrap();
    assert_eq!(remote_id, "page-1_999");
    assert_eq!(fixture.client.calls(), vec!["publish:page-1:8"]);

    let item = fixture.store.item_by_id(id).await.unwrap().unwrap();
    assert!(item.is_published());
    assert_eq!(item.linked_remote_id(), Some("page-1_999"));
    assert!(item.published_at.is_some());

    assert!(matches!(
        fixture.service.publish_item(id).await,
        Err(SyncError::InvalidState(_))
    ));
    assert!(matches!(
        fixture
            .service
            .update_draft(id, "changed", &fixture.image("x.jpg"))
            .await,
        Err(SyncError::InvalidState(_))
    ));
}

#[tokio::test]
async fn rejected_upload_leaves_the_draft_untouched() {
    init_tracing();
    let fixture = Fixture::new(MockFeedClient::new()).with_credentials().await;
    let id = fixture
        .service
        .create_draft("Will fail", &fixture.image("fail.jpg"))
        .await
        .unwrap();

    let result = fixture.service.publish_item(id).await;
    assert!(matches!(result, Err(SyncError::Rejected { status: Some(400), .. })));

    let item = fixture.store.item_by_id(id).await.unwrap().unwrap();
    assert_eq!(item.status, ItemStatus::Draft);
    assert_eq!(item.remote_id, None);
}

#[tokio::test]
async fn remote_operations_require_credentials() {
    init_tracing();
    let fixture = Fixture::new(MockFeedClient::new().with_publish_id("x"));
    let id = fixture
        .service
        .create_draft("No token", &fixture.image("n.jpg"))
        .await
        .unwrap();

    assert!(matches!(
        fixture.service.publish_item(id).await,
        Err(SyncError::MissingSettings)
    ));
    assert!(matches!(
        fixture.service.refresh_statistics(None).await,
        Err(SyncError::MissingSettings)
    ));
    assert!(fixture.client.calls().is_empty());
}

#[tokio::test]
async fn delete_removes_row_and_managed_image() {
    init_tracing();
    let fixture = Fixture::new(MockFeedClient::new());
    let id = fixture
        .service
        .create_draft("Temporary", &fixture.image("tmp.jpg"))
        .await
        .unwrap();
    let media = fixture.store.item_by_id(id).await.unwrap().unwrap().media_path;

    fixture.service.delete_item(id).await.unwrap();

    assert!(fixture.store.item_by_id(id).await.unwrap().is_none());
    assert!(!Path::new(&media).exists());
    assert!(matches!(
        fixture.service.delete_item(id).await,
        Err(SyncError::ItemNotFound { .. })
    ));
}

#[tokio::test]
async fn list_filters_by_status() {
    init_tracing();
    let fixture = Fixture::new(MockFeedClient::new());
    fixture.store.put(published_item(1, "r1", 0)).await;
    fixture
        .service
        .create_draft("Draft", &fixture.image("d.jpg"))
        .await
        .unwrap();

    assert_eq!(fixture.service.list_items(ItemFilter::All).await.unwrap().len(), 2);

    let drafts = fixture.service.list_items(ItemFilter::Drafts).await.unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].headline, "Draft");

    let published = fixture.service.list_items(ItemFilter::Published).await.unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].id, 1);
}

#[tokio::test]
async fn connection_test_trims_input_and_reports_page_name() {
    init_tracing();
    let fixture = Fixture::new(MockFeedClient::new().with_page_name("Corner Bakery"));

    let name = fixture
        .service
        .test_connection("  page-7 ", " token ")
        .await
        .unwrap();
    assert_eq!(name, "Corner Bakery");
    assert_eq!(fixture.client.calls(), vec!["validate:page-7"]);

    assert!(matches!(
        fixture.service.test_connection("", "token").await,
        Err(SyncError::InvalidState(_))
    ));
}

#[tokio::test]
async fn refresh_then_analytics_reflects_new_metrics() {
    init_tracing();
    let client = MockFeedClient::new()
        .with_metrics(
            "r1",
            MetricSnapshot::Available(Metrics {
                likes: 1,
                comments: 0,
                shares: 0,
            }),
        )
        .with_metrics(
            "r2",
            MetricSnapshot::Available(Metrics {
                likes: 0,
                comments: 3,
                shares: 3,
            }),
        );
    let fixture = Fixture::new(client).with_credentials().await;
    fixture.store.put(published_item(1, "r1", 50)).await;
    fixture.store.put(published_item(2, "r2", 0)).await;

    let report = fixture.service.refresh_statistics(None).await.unwrap();
    assert_eq!(report.updated, 2);

    let snapshot = fixture.service.analytics().await.unwrap();
    assert_eq!(snapshot.total_interactions, 7);
    assert_eq!(snapshot.rows[0].item_id, 2);
    assert_eq!(snapshot.rows[0].score, 15);
    assert_eq!(snapshot.top_item_display(), "Score: 15 | Interactions: 6");
    assert_eq!(snapshot.last_7_days.items, 2);
}

#[tokio::test]
async fn comments_are_loaded_newest_first() {
    init_tracing();
    let now = Utc::now();
    let comment = |author: &str, hours_ago: i64| Comment {
        author: author.to_string(),
        message: "nice".to_string(),
        created_at: Some(now - Duration::hours(hours_ago)),
    };
    let client = MockFeedClient::new().with_comment_pages(
        "r1",
        vec![vec![comment("old", 10), comment("newest", 1)], vec![comment("middle", 5)]],
    );
    let fixture = Fixture::new(client).with_credentials().await;
    fixture.store.put(published_item(1, "r1", 0)).await;

    let comments = fixture.service.load_comments(1, None).await.unwrap();
    let authors: Vec<&str> = comments.iter().map(|c| c.author.as_str()).collect();
    assert_eq!(authors, vec!["newest", "middle", "old"]);
}

#[tokio::test]
async fn comments_need_a_remote_identifier() {
    init_tracing();
    let fixture = Fixture::new(MockFeedClient::new()).with_credentials().await;
    let id = fixture
        .service
        .create_draft("Not yet live", &fixture.image("c.jpg"))
        .await
        .unwrap();

    assert!(matches!(
        fixture.service.load_comments(id, None).await,
        Err(SyncError::InvalidState(_))
    ));
}

#[tokio::test]
async fn service_runs_on_sqlite_as_well() {
    init_tracing();
    let workdir = tempfile::tempdir().unwrap();
    let source = workdir.path().join("s.jpg");
    std::fs::write(&source, b"img").unwrap();

    let config = SyncConfig {
        media_dir: workdir.path().join("media"),
        ..SyncConfig::default()
    };
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let service = EngagementService::new(Arc::new(MockFeedClient::new()), store, config);

    let id = service.create_draft("Stored in sqlite", &source).await.unwrap();
    let drafts = service.list_items(ItemFilter::Drafts).await.unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].id, id);
}

#[tokio::test]
async fn media_reached_through_parent_dir_is_copied_and_survives_delete() {
    init_tracing();
    let fixture = Fixture::new(MockFeedClient::new());
    let operator_file = fixture.image("holiday.jpg");
    let media_dir = fixture.service.media().root().to_path_buf();
    std::fs::create_dir_all(&media_dir).unwrap();
    let sneaky = media_dir.join("..").join("holiday.jpg");

    let id = fixture.service.create_draft("Holiday", &sneaky).await.unwrap();
    let stored = fixture.store.item_by_id(id).await.unwrap().unwrap().media_path;
    assert!(fixture.service.media().is_managed(Path::new(&stored)));
    assert_ne!(Path::new(&stored), sneaky.as_path());

    fixture.service.delete_item(id).await.unwrap();

    assert!(operator_file.exists());
    assert!(!Path::new(&stored).exists());
}

#[tokio::test]
async fn drafts_never_share_a_managed_file() {
    init_tracing();
    let fixture = Fixture::new(MockFeedClient::new());
    let first = fixture
        .service
        .create_draft("First", &fixture.image("shared.jpg"))
        .await
        .unwrap();
    let first_media = fixture.store.item_by_id(first).await.unwrap().unwrap().media_path;

    let second = fixture
        .service
        .create_draft("Second", Path::new(&first_media))
        .await
        .unwrap();
    let second_media = fixture.store.item_by_id(second).await.unwrap().unwrap().media_path;
    assert_ne!(first_media, second_media);

    fixture.service.delete_item(first).await.unwrap();

    assert!(!Path::new(&first_media).exists());
    assert!(Path::new(&second_media).exists());
    assert_eq!(std::fs::read(&second_media).unwrap(), b"shared.jpg");
}

#[tokio::test]
async fn editing_text_only_keeps_the_current_image() {
    init_tracing();
    let fixture = Fixture::new(MockFeedClient::new());
    let id = fixture
        .service
        .create_draft("Before", &fixture.image("keep.jpg"))
        .await
        .unwrap();
    let media = fixture.store.item_by_id(id).await.unwrap().unwrap().media_path;

    fixture
        .service
        .update_draft(id, "After", Path::new(&media))
        .await
        .unwrap();

    let item = fixture.store.item_by_id(id).await.unwrap().unwrap();
    assert_eq!(item.headline, "After");
    assert_eq!(item.media_path, media);
    assert!(Path::new(&media).exists());
}
