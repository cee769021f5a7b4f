use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use engagement_sync::{
    AnalyticsSnapshot, EngagementService, GraphClient, ItemFilter, Settings, SqliteStore, SyncConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "engagement-sync", about = "Draft, publish and rank social posts by engagement")]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://engagement.db?mode=rwc")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show or replace the stored page credentials
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Check that a page id and token reach the remote endpoint
    TestConnection {
        #[arg(long)]
        page_id: Option<String>,
        #[arg(long)]
        token: Option<String>,
    },
    /// Create or edit drafts
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },
    /// List stored items, newest first
    List {
        #[arg(long, value_enum, default_value_t = FilterArg::All)]
        filter: FilterArg,
    },
    /// Delete an item and its managed image
    Delete { id: i64 },
    /// Publish a draft
    Publish { id: i64 },
    /// Pull current metrics for every published item
    Refresh,
    /// Load all comments of a published item
    Comments { id: i64 },
    /// Rank published items and print rollups
    Analytics {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    Set {
        #[arg(long, default_value = "")]
        app_id: String,
        #[arg(long)]
        page_id: String,
        #[arg(long)]
        token: String,
    },
}

#[derive(Subcommand)]
enum DraftAction {
    New {
        #[arg(long)]
        text: String,
        #[arg(long)]
        media: PathBuf,
    },
    Edit {
        id: i64,
        #[arg(long)]
        text: String,
        #[arg(long)]
        media: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterArg {
    All,
    Drafts,
    Published,
}

impl From<FilterArg> for ItemFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => ItemFilter::All,
            FilterArg::Drafts => ItemFilter::Drafts,
            FilterArg::Published => ItemFilter::Published,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = SyncConfig::from_env();

    let store = SqliteStore::new(&cli.database_url)
        .await
        .with_context(|| format!("opening database {}", cli.database_url))?;
    let client = GraphClient::new(config.clone())?;
    let service = EngagementService::new(Arc::new(client), Arc::new(store), config);

    match cli.command {
        Command::Settings { action } => match action {
            SettingsAction::Show => match service.load_settings().await? {
                Some(settings) => {
                    println!("App ID:  {}", settings.app_id);
                    println!("Page ID: {}", settings.page_id);
                    println!("Token:   {}", if settings.has_token() { "(set)" } else { "(empty)" });
                }
                None => println!("No settings saved yet."),
            },
            SettingsAction::Set { app_id, page_id, token } => {
                service
                    .save_settings(&Settings {
                        app_id,
                        page_id,
                        access_token: token,
                    })
                    .await?;
                println!("Settings saved.");
            }
        },
        Command::TestConnection { page_id, token } => {
            let stored = service.load_settings().await?.unwrap_or_default();
            let page_id = page_id.unwrap_or(stored.page_id);
            let token = token.unwrap_or(stored.access_token);
            let page_name = service.test_connection(&page_id, &token).await?;
            println!("Connected to page '{}'", page_name);
        }
        Command::Draft { action } => match action {
            DraftAction::New { text, media } => {
                let id = service.create_draft(&text, &media).await?;
                println!("Draft {} saved.", id);
            }
            DraftAction::Edit { id, text, media } => {
                service.update_draft(id, &text, &media).await?;
                println!("Draft {} updated.", id);
            }
        },
        Command::List { filter } => {
            let items = service.list_items(filter.into()).await?;
            for item in &items {
                let published = item
                    .published_at
                    .map(|t| t.format("%d.%m.%Y %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:>4}  {:<9}  {:<16}  {}",
                    item.id,
                    item.status.label(),
                    published,
                    item.headline
                );
            }
            println!("{} items loaded.", items.len());
        }
        Command::Delete { id } => {
            service.delete_item(id).await?;
            println!("Item {} deleted.", id);
        }
        Command::Publish { id } => {
            let remote_id = service.publish_item(id).await?;
            println!("Published. Remote ID: {}", remote_id);
        }
        Command::Refresh => {
            let cancel = cancel_on_ctrl_c();
            let report = service.refresh_statistics(Some(cancel)).await?;
            if report.cancelled {
                warn!("Refresh interrupted");
            }
            println!(
                "{} of {} published items updated ({} unavailable, {} missing).",
                report.updated, report.qualifying, report.unavailable, report.missing
            );
        }
        Command::Comments { id } => {
            let cancel = cancel_on_ctrl_c();
            let comments = service.load_comments(id, Some(cancel)).await?;
            for (index, comment) in comments.iter().enumerate() {
                println!("{:>4}. {}", index + 1, comment.preview_text());
            }
            println!("{} comments loaded.", comments.len());
        }
        Command::Analytics { json } => {
            let snapshot = service.analytics().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_analytics(&snapshot);
            }
        }
    }

    Ok(())
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping after the current request");
            child.cancel();
        }
    });
    token
}

fn print_analytics(snapshot: &AnalyticsSnapshot) {
    if snapshot.published_count == 0 && snapshot.draft_count == 0 {
        println!("No items stored yet.");
        return;
    }

    println!("Likes:         {}", snapshot.total_likes);
    println!("Comments:      {}", snapshot.total_comments);
    println!("Shares:        {}", snapshot.total_shares);
    println!("Interactions:  {}", snapshot.total_interactions);
    println!("Published:     {}", snapshot.published_count);
    println!("Drafts:        {}", snapshot.draft_count);
    println!("Avg per item:  {}", snapshot.average_interactions_display());
    println!(
        "Top item:      {} ({})",
        snapshot.top_item.as_ref().map(|top| top.headline.as_str()).unwrap_or("-"),
        snapshot.top_item_display()
    );
    println!("Last 7 days:   {}", snapshot.last_7_days);
    println!("Last 30 days:  {}", snapshot.last_30_days);
    println!("Linked:        {} published items with remote id", snapshot.data_quality);
    println!();

    for row in &snapshot.rows {
        println!(
            "{:>3}. {:<40} {:>10}  L{:<5} C{:<5} S{:<5} score {:<6} {:>3}d  {}/day",
            row.rank,
            truncate(&row.headline, 40),
            row.published_display(),
            row.likes,
            row.comments,
            row.shares,
            row.score,
            row.days_online,
            row.interactions_per_day_display()
        );
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(max - 3).collect();
        short.push_str("...");
        short
    }
}

