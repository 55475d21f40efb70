use anyhow::{Context, Result};
use async_trait::async_trait;
use common::StoreConfig;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

/// The durable record of already-delivered article links.
pub type SeenSet = HashSet<String>;

/// Load/save a set of opaque identifiers against a remote persistence
/// endpoint. `load` degrades to an empty set on any failure so that
/// first-run and transient-outage behavior are identical: start fresh.
#[async_trait]
pub trait SeenStore: Send + Sync {
    async fn load(&self) -> SeenSet;
    async fn save(&self, seen: &SeenSet) -> Result<()>;
}

/// Seen-set store backed by a hub-style blob API: the artifact lives at
/// `{api}/{repo_id}/resolve/{filename}` and is replaced wholesale via
/// `PUT {api}/{repo_id}/upload/{filename}`. Plain text, one link per line.
///
/// Last-writer-wins: there is no versioning or locking, so two processes
/// sharing one location can silently drop each other's additions.
pub struct BlobSeenStore {
    api_url: String,
    repo_id: String,
    filename: String,
    token: Option<String>,
    client: Client,
}

impl BlobSeenStore {
    pub fn new(config: &StoreConfig, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Telefeed/0.1.0")
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            repo_id: config.repo_id.clone(),
            filename: config.filename.clone(),
            token,
            client,
        })
    }

    fn resolve_url(&self) -> String {
        format!("{}/{}/resolve/{}", self.api_url, self.repo_id, self.filename)
    }

    fn upload_url(&self) -> String {
        format!("{}/{}/upload/{}", self.api_url, self.repo_id, self.filename)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.header("Authorization", format!("Bearer {}", token)),
            None => req,
        }
    }
}

#[async_trait]
impl SeenStore for BlobSeenStore {
    async fn load(&self) -> SeenSet {
        let url = self.resolve_url();
        let response = match self.authorize(self.client.get(&url)).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("store: could not fetch seen links ({:#}); starting fresh", e);
                return SeenSet::new();
            }
        };

        if !response.status().is_success() {
            warn!(
                "store: seen-links fetch returned {}; starting fresh",
                response.status()
            );
            return SeenSet::new();
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                warn!("store: could not read seen links body ({:#}); starting fresh", e);
                return SeenSet::new();
            }
        };

        let links: SeenSet = body
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(|line| line.to_string())
            .collect();
        info!("store: loaded {} seen links", links.len());
        links
    }

    async fn save(&self, seen: &SeenSet) -> Result<()> {
        let mut body = String::new();
        for link in seen {
            body.push_str(link);
            body.push('\n');
        }

        let url = self.upload_url();
        let response = self
            .authorize(self.client.put(&url))
            .header("Content-Type", "text/plain")
            .body(body)
            .send()
            .await
            .context("seen-links upload request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("seen-links upload rejected with {}: {}", status, detail);
        }

        info!("store: saved {} seen links", seen.len());
        Ok(())
    }
}
