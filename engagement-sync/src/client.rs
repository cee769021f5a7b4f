use crate::parser;
use crate::traits::FeedClient;
use crate::types::{Comment, MetricSnapshot, Page, PageCursor, Result, Settings, SyncConfig, SyncError};
use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

const METRICS_FIELDS: &str = "likes.summary(true),comments.summary(true),shares";
const COMMENT_FIELDS: &str = "from{name,id},username,message,created_time";

pub struct GraphClient {
    client: Client,
    config: SyncConfig,
}

impl GraphClient {
    pub fn new(config: SyncConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let base = self.config.api_base.trim_end_matches('/');
        let raw = format!("{}/{}", base, path);
        let url = if params.is_empty() {
            Url::parse(&raw)?
        } else {
            Url::parse_with_params(&raw, params)?
        };
        Ok(url)
    }

    /// Cursor links come from the remote; only ones on the configured API
    /// origin are followed, since the bearer token travels with them.
    fn comments_url(&self, remote_id: &str, cursor: &PageCursor) -> Result<Url> {
        match cursor {
            PageCursor::First => self.endpoint(
                &format!("{}/comments", remote_id),
                &[
                    ("fields", COMMENT_FIELDS.to_string()),
                    ("order", "reverse_chronological".to_string()),
                    ("limit", self.config.comments_page_size.to_string()),
                ],
            ),
            PageCursor::Next(next) => {
                let url = Url::parse(next)?;
                let api = Url::parse(&self.config.api_base)?;
                if url.origin() != api.origin() {
                    return Err(SyncError::Rejected {
                        status: None,
                        message: format!("next page link leaves {}", api.origin().ascii_serialization()),
                    });
                }
                Ok(url)
            }
        }
    }

    /// GET with bearer auth. Retries transport failures only, up to
    /// `max_retries`; a response with any status is returned as-is.
    async fn get_with_retry(&self, url: &Url, access_token: &str) -> Result<Response> {
        let mut backoff = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 32),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.retry_delay_seconds * 60)),
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            match self.client.get(url.clone()).bearer_auth(access_token).send().await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    let error = SyncError::from(e);
                    if attempt < self.config.max_retries {
                        if let Some(delay) = backoff.next_backoff() {
                            attempt += 1;
                            warn!("Attempt {} failed for {}, retrying in {:?}: {}", attempt, url.path(), delay, error);
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                    return Err(error);
                }
            }
        }
    }

    async fn read_body(response: Response, fallback: &str) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = parser::parse_error_message(&body).unwrap_or_else(|| fallback.to_string());
            return Err(SyncError::Rejected {
                status: Some(status.as_u16()),
                message,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl FeedClient for GraphClient {
    async fn fetch_metrics(&self, remote_id: &str, access_token: &str) -> MetricSnapshot {
        let start_time = Instant::now();
        let result = async {
            let url = self.endpoint(remote_id, &[("fields", METRICS_FIELDS.to_string())])?;
            let response = self.get_with_retry(&url, access_token).await?;
            let body = Self::read_body(response, "Statistics unavailable").await?;
            parser::parse_metrics(&body)
        }
        .await;

        match result {
            Ok(metrics) => {
                debug!(
                    "Fetched metrics for {} in {}ms: {:?}",
                    remote_id,
                    start_time.elapsed().as_millis(),
                    metrics
                );
                MetricSnapshot::Available(metrics)
            }
            Err(e) => {
                warn!("Metrics unavailable for {}: {}", remote_id, e);
                MetricSnapshot::Unavailable
            }
        }
    }

    async fn fetch_comments_page(
        &self,
        remote_id: &str,
        cursor: &PageCursor,
        access_token: &str,
    ) -> Result<Page<Comment>> {
        let url = self.comments_url(remote_id, cursor)?;
        match cursor {
            PageCursor::First => debug!("Fetching first comments page for {}", remote_id),
            PageCursor::Next(_) => debug!("Following comments cursor for {}", remote_id),
        }

        let response = self.get_with_retry(&url, access_token).await?;
        let body = Self::read_body(response, "Comments could not be loaded").await?;
        Ok(parser::parse_comments_page(&body))
    }

    async fn publish(&self, message: &str, media: Vec<u8>, settings: &Settings) -> Result<String> {
        let url = self.endpoint(&format!("{}/photos", settings.page_id), &[])?;
        info!("Publishing photo post to page {} ({} bytes)", settings.page_id, media.len());

        let form = Form::new()
            .text("message", message.to_string())
            .part("source", Part::bytes(media).file_name("upload.jpg"));

        let response = self
            .client
            .post(url)
            .bearer_auth(&settings.access_token)
            .multipart(form)
            .send()
            .await?;

        let body = Self::read_body(response, "Upload failed").await?;
        let remote_id = parser::parse_published_id(&body)?;
        info!("Published post {}", remote_id);
        Ok(remote_id)
    }

    async fn validate_credentials(&self, page_id: &str, access_token: &str) -> Result<String> {
        let url = self.endpoint(page_id, &[("fields", "name".to_string())])?;
        debug!("Validating credentials for page {}", page_id);

        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let body = Self::read_body(response, "Unknown API error").await?;
        parser::parse_page_name(&body)
    }
}
