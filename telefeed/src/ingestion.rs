use anyhow::{Context, Result};
use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// One article as seen in a feed document. Produced fresh each cycle,
/// never persisted; the link doubles as the dedup identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDescriptor {
    pub link: String,
    pub title: String,
}

/// A parsed feed: its display title plus entries in document order
/// (typical sources list newest first; the orchestrator reverses).
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub feed_title: String,
    pub entries: Vec<ArticleDescriptor>,
}

/// Produces ordered article descriptors from a feed URL.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FeedSnapshot>;
}

/// Feed source backed by an HTTP client and feed-rs parsing.
pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("Telefeed/0.1.0")
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    /// Fetches and parses one feed. Retries transient transport failures
    /// (network errors, 5xx, 429) with a short backoff; 4xx responses and
    /// parse failures are returned immediately.
    async fn fetch(&self, url: &str) -> Result<FeedSnapshot> {
        let max_retries = 3;
        let mut last_error = None;

        for attempt in 1..=max_retries {
            if attempt > 1 {
                let backoff = Duration::from_secs(2u64.pow(attempt - 2)); // 1s, 2s, 4s...
                tracing::info!(
                    "Retrying feed fetch for {} (attempt {}/{}) after {:?}...",
                    url,
                    attempt,
                    max_retries,
                    backoff
                );
                tokio::time::sleep(backoff).await;
            }

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let bytes = response.bytes().await.context("failed to read response body")?;
                        let feed = parser::parse(bytes.as_ref()).context("failed to parse feed")?;
                        return Ok(snapshot_from_feed(url, feed));
                    } else if status.is_server_error() {
                        last_error = Some(anyhow::anyhow!("server error: {}", status));
                        continue;
                    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(anyhow::anyhow!("rate limited: {}", status));
                        continue;
                    } else {
                        // Client error (4xx) - likely permanent, don't retry
                        return Err(anyhow::anyhow!("feed fetch failed with status: {}", status));
                    }
                }
                Err(e) => {
                    last_error = Some(anyhow::Error::new(e).context("network error during fetch"));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("unknown error after retries")))
    }
}

fn snapshot_from_feed(url: &str, feed: feed_rs::model::Feed) -> FeedSnapshot {
    let feed_title = feed
        .title
        .map(|t| t.content)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| url.to_string());

    let entries = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone())?;
            if link.is_empty() {
                debug!("skipping entry without link in feed {}", url);
                return None;
            }
            let title = entry
                .title
                .map(|t| t.content)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "(untitled)".to_string());
            Some(ArticleDescriptor { link, title })
        })
        .collect();

    FeedSnapshot { feed_title, entries }
}
