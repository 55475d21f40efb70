use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::ingestion::FeedSource;
use crate::llm::{summarizer, LlmProvider};
use crate::notify::Notifier;
use crate::scraping::ArticleExtractor;
use crate::store::SeenStore;

/// Outcome of one cycle, for logging and tests.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub feeds_checked: usize,
    pub delivered: usize,
    pub save_attempted: bool,
}

/// Ties the collaborators together once per cycle, enforcing the dedup and
/// one-article-per-feed policy. The seen set is exclusively owned here for
/// the duration of a cycle; cycles never overlap.
pub struct Pipeline {
    feed_urls: Vec<String>,
    store: Arc<dyn SeenStore>,
    source: Arc<dyn FeedSource>,
    extractor: Arc<dyn ArticleExtractor>,
    llm: Arc<dyn LlmProvider>,
    notifier: Arc<dyn Notifier>,
    summary_max_tokens: usize,
}

impl Pipeline {
    pub fn new(
        feed_urls: Vec<String>,
        store: Arc<dyn SeenStore>,
        source: Arc<dyn FeedSource>,
        extractor: Arc<dyn ArticleExtractor>,
        llm: Arc<dyn LlmProvider>,
        notifier: Arc<dyn Notifier>,
        summary_max_tokens: usize,
    ) -> Self {
        Self {
            feed_urls,
            store,
            source,
            extractor,
            llm,
            notifier,
            summary_max_tokens,
        }
    }

    /// One full pass over all configured feeds.
    ///
    /// Per feed, entries are scanned oldest-first and at most one unseen
    /// article is processed; after downtime a backlog drains one article per
    /// feed per cycle rather than flooding the chat. Summarization errors
    /// propagate (the scheduler loop owns recovery); every other
    /// collaborator failure is logged and degraded locally.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let mut seen = self.store.load().await;
        let mut added = false;
        let mut report = CycleReport::default();

        for url in &self.feed_urls {
            report.feeds_checked += 1;

            let snapshot = match self.source.fetch(url).await {
                Ok(s) => s,
                Err(e) => {
                    warn!("pipeline: failed to fetch feed {}: {:#}", url, e);
                    continue;
                }
            };

            // Document order is newest-first at typical sources; reverse so
            // the chronologically earliest unseen entry is delivered first.
            for entry in snapshot.entries.iter().rev() {
                if seen.contains(&entry.link) {
                    continue;
                }

                info!("pipeline: new article in {}: {}", snapshot.feed_title, entry.title);

                match self.extractor.extract(&entry.link).await {
                    None => {
                        // Not marked seen: extraction gets another chance
                        // next cycle.
                        info!("pipeline: no text for {}; skipping feed this cycle", entry.link);
                    }
                    Some(text) => {
                        let summary =
                            summarizer::summarize_article(&*self.llm, &text, self.summary_max_tokens)
                                .await?;
                        let message = format_message(
                            &snapshot.feed_title,
                            &entry.title,
                            &summary,
                            &entry.link,
                        );
                        if let Err(e) = self.notifier.send(&message).await {
                            warn!("pipeline: delivery failed for {}: {:#}", entry.link, e);
                        }
                        // At-most-once attempt: the link counts as seen even
                        // when delivery failed.
                        seen.insert(entry.link.clone());
                        added = true;
                        report.delivered += 1;
                    }
                }

                // One entry per feed per cycle, processed or not.
                break;
            }
        }

        if added {
            report.save_attempted = true;
            if let Err(e) = self.store.save(&seen).await {
                warn!("pipeline: failed to persist seen links: {:#}", e);
            }
        } else {
            info!("pipeline: no new articles this cycle");
        }

        Ok(report)
    }
}

/// Message template for one delivered article. Pure so the markup can be
/// checked in isolation.
pub fn format_message(feed_title: &str, title: &str, summary: &str, link: &str) -> String {
    format!(
        "\u{1F195} *New Article Summary*\n\
         *Source:* {}\n\
         *Title:* {}\n\
         *Summary:*\n{}\n\
         *Link:* {}",
        feed_title, title, summary, link
    )
}
