use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Delivers a formatted message to a fixed destination. Failure is for the
/// caller to log; there is no retry at this layer.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Notifier posting to a Telegram bot sendMessage endpoint. Missing
/// credentials degrade every `send` to an error, never a crash.
pub struct TelegramNotifier {
    api_url: String,
    bot_token: Option<String>,
    chat_id: Option<String>,
    client: Client,
}

impl TelegramNotifier {
    pub fn new(api_url: impl Into<String>, bot_token: Option<String>, chat_id: Option<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
            client: Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let (Some(token), Some(chat_id)) = (&self.bot_token, &self.chat_id) else {
            anyhow::bail!("telegram credentials not configured");
        };

        let url = format!("{}/bot{}/sendMessage", self.api_url, token);
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        self.client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("telegram post")?
            .error_for_status()
            .context("telegram non-2xx")?;
        Ok(())
    }
}
