// src/ingest/mod.rs
pub mod providers;
pub mod types;

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;

use crate::config::ArticleConfig;
use crate::ingest::types::{CandidateItem, FeedProvider};

/// Normalize text: decode HTML entities, strip tags, normalize quotes,
/// collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Truncate to `max` chars on a char boundary, appending an ellipsis marker.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str("...");
    out
}

/// Clean titles and summaries in place and cap summary length.
pub fn normalize_items(items: &mut [CandidateItem], summary_max_chars: usize) {
    for item in items.iter_mut() {
        item.title = normalize_text(&item.title);
        item.summary = truncate_chars(&normalize_text(&item.summary), summary_max_chars);
    }
}

/// Keep items published within the lookback window. Items without a date are
/// kept (absence of a date is not evidence of staleness).
pub fn filter_recent(
    items: Vec<CandidateItem>,
    now: DateTime<Utc>,
    hours_lookback: i64,
) -> Vec<CandidateItem> {
    let cutoff = now - chrono::Duration::hours(hours_lookback);
    items
        .into_iter()
        .filter(|item| match item.published {
            Some(ts) => ts > cutoff,
            None => true,
        })
        .collect()
}

/// Remove duplicate items by link, keeping the first occurrence.
pub fn dedup_by_link(items: Vec<CandidateItem>) -> Vec<CandidateItem> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(item.link.clone()) {
            unique.push(item);
        }
    }
    unique
}

/// Fetch every feed concurrently with a per-feed timeout. A slow or failing
/// feed is logged and skipped; it never blocks the rest of the run.
pub async fn fetch_all(
    providers: &[Box<dyn FeedProvider>],
    timeout: Duration,
) -> Vec<CandidateItem> {
    let tasks = providers.iter().map(|p| async move {
        match tokio::time::timeout(timeout, p.fetch_latest()).await {
            Ok(Ok(items)) => {
                tracing::info!(provider = %p.name(), count = items.len(), "feed fetched");
                items
            }
            Ok(Err(e)) => {
                tracing::warn!(error = ?e, provider = %p.name(), "feed error");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(provider = %p.name(), timeout_secs = timeout.as_secs(), "feed timed out");
                Vec::new()
            }
        }
    });

    join_all(tasks).await.into_iter().flatten().collect()
}

/// Full intake pass: fetch, window, dedup, normalize, sort newest first.
pub async fn fetch_and_process(
    providers: &[Box<dyn FeedProvider>],
    article_cfg: &ArticleConfig,
    timeout: Duration,
) -> Vec<CandidateItem> {
    let raw = fetch_all(providers, timeout).await;
    let total = raw.len();

    let now = Utc::now();
    let recent = filter_recent(raw, now, article_cfg.hours_lookback);
    let mut items = dedup_by_link(recent);
    normalize_items(&mut items, article_cfg.summary_max_chars);

    // Newest first; undated items sort last.
    items.sort_by(|a, b| b.published.cmp(&a.published));

    tracing::info!(
        fetched = total,
        kept = items.len(),
        lookback_hours = article_cfg.hours_lookback,
        "intake complete"
    );
    items
}
