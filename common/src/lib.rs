/*!
common/src/lib.rs

Shared configuration types for Telefeed.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader with default/override merge semantics
- A typed Secrets struct resolved from the environment once at startup
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Feed list configuration. The list is fixed for the process lifetime;
/// there is no runtime add/remove.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    pub urls: Vec<String>,
}

/// Scheduler configuration: one cycle per `interval_seconds`, and a shorter
/// `cooldown_seconds` pause after a cycle that failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub interval_seconds: u64,
    pub cooldown_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 1800,
            cooldown_seconds: 60,
        }
    }
}

/// Remote blob store holding the seen-link set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the hub-style blob API.
    pub api_url: String,
    /// Namespace / repository identifier within the hub.
    pub repo_id: String,
    /// Filename of the seen-links artifact inside the repo.
    pub filename: String,
    /// Name of the env var holding the write token.
    pub token_env: Option<String>,
}

/// Telegram delivery configuration. The bot token and chat id are referenced
/// by env var name, never stored in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub api_url: Option<String>,
    pub bot_token_env: Option<String>,
    pub chat_id_env: Option<String>,
}

/// Remote LLM config (OpenAI-compatible chat completions endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
}

/// Politeness / fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolitenessConfig {
    pub fetch_timeout_seconds: Option<u64>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    pub store: StoreConfig,
    pub telegram: Option<TelegramConfig>,
    pub llm: Option<LlmConfig>,
    pub politeness: Option<PolitenessConfig>,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(
        default_path: Option<&Path>,
        override_path: Option<&Path>,
    ) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value =
                    toml::from_str(&data).context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value =
                    toml::from_str(&data).context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value
            .try_into()
            .context("Failed to parse merged configuration")?;
        Ok(cfg)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Credential values resolved from the environment exactly once at startup.
/// A missing value degrades the collaborator that needs it to per-call
/// failure; it is never a startup crash.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub store_token: Option<String>,
    pub llm_api_key: Option<String>,
}

impl Secrets {
    /// Resolve every env var the config names. Absent values are logged as
    /// warnings so operators see the degraded collaborator at startup rather
    /// than in per-call failures only.
    pub fn from_config(config: &Config) -> Self {
        let bot_token = config
            .telegram
            .as_ref()
            .and_then(|t| t.bot_token_env.as_deref())
            .and_then(|name| resolve_env("telegram bot token", name));
        let chat_id = config
            .telegram
            .as_ref()
            .and_then(|t| t.chat_id_env.as_deref())
            .and_then(|name| resolve_env("telegram chat id", name));
        let store_token = config
            .store
            .token_env
            .as_deref()
            .and_then(|name| resolve_env("store write token", name));
        let llm_api_key = config
            .llm
            .as_ref()
            .and_then(|l| l.api_key_env.as_deref())
            .and_then(|name| resolve_env("llm api key", name));

        Self {
            bot_token,
            chat_id,
            store_token,
            llm_api_key,
        }
    }
}

fn resolve_env(what: &str, name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Some(v),
        _ => {
            tracing::warn!("{} env var '{}' not set; calls needing it will fail", what, name);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [feeds]
        urls = ["https://example.com/a.xml", "https://example.com/b.xml"]

        [scheduler]
        interval_seconds = 1800
        cooldown_seconds = 60

        [store]
        api_url = "https://hub.example.com"
        repo_id = "alice/news-bot-db"
        filename = "seen_links.txt"
        token_env = "HUB_TOKEN"

        [telegram]
        bot_token_env = "TELEGRAM_BOT_TOKEN"
        chat_id_env = "TELEGRAM_CHAT_ID"

        [llm]
        api_url = "https://llm.example.com/v1/chat/completions"
        api_key_env = "LLM_API_KEY"
        model = "gpt-4o-mini"
        max_tokens = 150
    "#;

    #[test]
    fn config_parses_from_toml() {
        let cfg: Config = toml::from_str(SAMPLE).expect("parse config");
        assert_eq!(cfg.feeds.urls.len(), 2);
        assert_eq!(cfg.scheduler.interval_seconds, 1800);
        assert_eq!(cfg.store.repo_id, "alice/news-bot-db");
        assert_eq!(cfg.store.filename, "seen_links.txt");
        assert_eq!(cfg.llm.as_ref().and_then(|l| l.max_tokens), Some(150));
    }

    #[test]
    fn scheduler_defaults_apply_when_section_missing() {
        let toml = r#"
            [feeds]
            urls = []

            [store]
            api_url = "https://hub.example.com"
            repo_id = "alice/db"
            filename = "seen_links.txt"
        "#;
        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.scheduler.interval_seconds, 1800);
        assert_eq!(cfg.scheduler.cooldown_seconds, 60);
    }

    #[test]
    fn override_wins_on_merge() {
        let mut base: toml::Value = toml::from_str(SAMPLE).unwrap();
        let over: toml::Value = toml::from_str(
            r#"
            [scheduler]
            interval_seconds = 300
            "#,
        )
        .unwrap();
        merge_toml(&mut base, over);
        let cfg: Config = base.try_into().unwrap();
        assert_eq!(cfg.scheduler.interval_seconds, 300);
        // untouched keys survive the merge
        assert_eq!(cfg.scheduler.cooldown_seconds, 60);
        assert_eq!(cfg.feeds.urls.len(), 2);
    }

    #[test]
    fn secrets_resolve_from_named_env_vars() {
        let cfg: Config = toml::from_str(
            r#"
            [feeds]
            urls = []

            [store]
            api_url = "https://hub.example.com"
            repo_id = "alice/db"
            filename = "seen_links.txt"
            token_env = "TELEFEED_TEST_STORE_TOKEN"
            "#,
        )
        .unwrap();

        std::env::set_var("TELEFEED_TEST_STORE_TOKEN", "tok-123");
        let secrets = Secrets::from_config(&cfg);
        std::env::remove_var("TELEFEED_TEST_STORE_TOKEN");

        assert_eq!(secrets.store_token.as_deref(), Some("tok-123"));
        assert!(secrets.bot_token.is_none());
        assert!(secrets.llm_api_key.is_none());
    }
}
