use std::sync::Arc;

use chrono::{DateTime, Utc};
use rocket::serde::json::Json;
use rocket::{get, routes, Build, Rocket, State};
use serde::Serialize;

use common::Config;

/// Application state stored inside Rocket managed state. The status surface
/// is read-only; nothing here can drive or mutate the pipeline.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub config: Arc<Config>,
}

/// Response structure for `/api/v1/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: i64,
    interval_seconds: u64,
    feeds: Vec<String>,
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

/// Status endpoint: static "running" indicator plus the configured feed list.
#[get("/api/v1/status")]
async fn status(state: &State<AppState>) -> Json<StatusResponse> {
    let now = Utc::now();
    let uptime = (now - state.started_at).num_seconds();

    Json(StatusResponse {
        status: "running",
        uptime_seconds: uptime,
        interval_seconds: state.config.scheduler.interval_seconds,
        feeds: state.config.feeds.urls.clone(),
    })
}

pub fn build_rocket(state: AppState) -> Rocket<Build> {
    rocket::build().manage(state).mount("/", routes![health, status])
}

/// Launch the Rocket server; returns when Rocket shuts down.
pub async fn launch_rocket(state: AppState) -> anyhow::Result<()> {
    build_rocket(state)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("rocket server failed: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::Status;
    use rocket::local::asynchronous::Client;

    fn test_config() -> Config {
        Config {
            feeds: common::FeedsConfig {
                urls: vec!["https://news.example.com/rss".to_string()],
            },
            scheduler: common::SchedulerConfig::default(),
            store: common::StoreConfig {
                api_url: "https://hub.example.com".to_string(),
                repo_id: "alice/db".to_string(),
                filename: "seen_links.txt".to_string(),
                token_env: None,
            },
            telegram: None,
            llm: None,
            politeness: None,
        }
    }

    #[rocket::async_test]
    async fn health_returns_ok() {
        let state = AppState {
            started_at: Utc::now(),
            config: Arc::new(test_config()),
        };
        let client = Client::tracked(build_rocket(state)).await.expect("client");
        let resp = client.get("/health").dispatch().await;
        assert_eq!(resp.status(), Status::Ok);
        assert_eq!(resp.into_string().await.as_deref(), Some("OK"));
    }

    #[rocket::async_test]
    async fn status_reports_running_and_feed_list() {
        let state = AppState {
            started_at: Utc::now(),
            config: Arc::new(test_config()),
        };
        let client = Client::tracked(build_rocket(state)).await.expect("client");
        let resp = client.get("/api/v1/status").dispatch().await;
        assert_eq!(resp.status(), Status::Ok);

        let body: serde_json::Value =
            serde_json::from_str(&resp.into_string().await.unwrap()).unwrap();
        assert_eq!(body["status"], "running");
        assert_eq!(body["interval_seconds"], 1800);
        assert_eq!(body["feeds"][0], "https://news.example.com/rss");
    }
}
