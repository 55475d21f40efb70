use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::io::Cursor;
use std::time::Duration;
use tracing::{info, warn};

/// Fetches a URL and returns extracted plain text, or `None` when the page
/// cannot be fetched or yields no usable content. Failures never propagate
/// and there is no retry at this layer.
#[async_trait]
pub trait ArticleExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Option<String>;
}

/// Extractor backed by readability content extraction with a text fallback.
pub struct ReadabilityExtractor {
    client: Client,
}

impl ReadabilityExtractor {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("Telefeed/0.1.0")
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self { client })
    }

    async fn try_extract(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("failed to fetch article page")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("article fetch failed with status: {}", status));
        }

        // Readability requires a Reader, so we fetch bytes
        let bytes = response.bytes().await.context("failed to read response body")?;
        let mut reader = Cursor::new(bytes);

        // We construct a Url object for readability to resolve relative links
        let url_obj = url::Url::parse(url).context("failed to parse article URL")?;

        let product = readability::extractor::extract(&mut reader, &url_obj)
            .map_err(|e| anyhow::anyhow!("readability failed: {}", e))?;

        // product.content is the HTML of the main article; convert it to
        // plain text, falling back to readability's own text on failure.
        match html2text::from_read(product.content.as_bytes(), 80) {
            Ok(text) => {
                info!(
                    "scraping: readability extracted {} chars from {}",
                    text.len(),
                    url
                );
                Ok(text)
            }
            Err(e) => {
                warn!("scraping: failed to convert extracted HTML to text: {}", e);
                Ok(product.text)
            }
        }
    }
}

#[async_trait]
impl ArticleExtractor for ReadabilityExtractor {
    async fn extract(&self, url: &str) -> Option<String> {
        match self.try_extract(url).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                warn!("scraping: no usable text extracted from {}", url);
                None
            }
            Err(e) => {
                warn!("scraping: extraction failed for {}: {:#}", url, e);
                None
            }
        }
    }
}
