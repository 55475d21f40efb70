// Summarizer module
use anyhow::Result;

use super::LlmProvider;

/// Fixed fallback used when an article yields no text. Callers are expected
/// to check for absent text before summarizing; this guard keeps the
/// contract safe if they don't.
pub const NO_TEXT_FALLBACK: &str = "Could not generate summary (no text).";

/// Produce a bounded synopsis of `article_text`. Provider failures propagate:
/// the scheduler loop, not this layer, owns recovery from a broken model.
pub async fn summarize_article<P: LlmProvider + ?Sized>(
    provider: &P,
    article_text: &str,
    max_tokens: usize,
) -> Result<String> {
    if article_text.trim().is_empty() {
        return Ok(NO_TEXT_FALLBACK.to_string());
    }

    let summary = provider.summarize(article_text, max_tokens).await?;
    Ok(bound_words(&summary, max_tokens))
}

/// Cap a summary at `max_words` whitespace-separated words. The model is
/// asked to stay within the budget; this enforces it when it doesn't.
fn bound_words(s: &str, max_words: usize) -> String {
    let words: Vec<&str> = s.split_whitespace().collect();
    if words.len() <= max_words {
        return s.trim().to_string();
    }
    format!("{}...", words[..max_words].join(" "))
}
