// src/trending/mod.rs
//! Trending-signal matcher: cross-references candidate items against what is
//! independently trending on Reddit, Hacker News, and GitHub. Token-overlap
//! matching is a weak, noisy signal, so it only *promotes* otherwise-routine
//! items to VIRAL; it never overrides a content-based classification.

pub mod sources;

use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::classify::EventType;
use crate::ingest::types::CandidateItem;

/// One externally trending item, fetched fresh per run and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendingSignal {
    pub source: String,
    pub title: String,
    /// Engagement: upvotes, points, or stars depending on the source.
    pub score: i64,
    pub url: String,
    pub keywords: BTreeSet<String>,
}

/// Audit record for a viral promotion: which signal caused it and on what
/// keyword overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViralMatch {
    pub signal_source: String,
    pub signal_title: String,
    pub signal_score: i64,
    pub matched_keywords: Vec<String>,
    pub match_strength: usize,
    pub combined_score: i64,
}

/// Stop words and the high-value allow-list used by keyword extraction.
/// Allow-list members are always retained regardless of length or stop-word
/// status.
#[derive(Debug, Clone)]
pub struct KeywordVocab {
    stop_words: HashSet<String>,
    high_value: HashSet<String>,
}

impl Default for KeywordVocab {
    fn default() -> Self {
        fn set(words: &[&str]) -> HashSet<String> {
            words.iter().map(|s| s.to_string()).collect()
        }
        Self {
            stop_words: set(&[
                "the", "and", "for", "are", "but", "not", "you", "all", "can", "had",
                "her", "was", "one", "our", "out", "day", "get", "has", "him", "his",
                "how", "its", "may", "new", "now", "old", "see", "way", "who", "did",
                "been", "have", "from", "this", "that", "with", "they", "will", "what",
                "when", "your", "said", "each", "just", "like", "over", "such", "into",
                "year", "some", "could", "them", "than", "then", "being", "about", "after",
            ]),
            high_value: set(&[
                "openai", "google", "apple", "microsoft", "meta", "amazon", "nvidia",
                "tesla", "anthropic", "chatgpt", "gpt", "gemini", "claude", "waymo",
                "robotaxi", "autonomous", "robot", "drone", "model", "launch", "release",
                "acquisition", "funding", "startup", "developer", "programming", "code",
            ]),
        }
    }
}

/// Extract matching keywords from text: lower-case, alphabetic tokens of
/// length >= 3, stop words dropped, allow-list always kept.
pub fn extract_keywords(text: &str, vocab: &KeywordVocab) -> BTreeSet<String> {
    static RE_WORD: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re = RE_WORD.get_or_init(|| regex::Regex::new(r"\b[a-z]{3,}\b").unwrap());

    let lower = text.to_lowercase();
    let mut keywords = BTreeSet::new();
    for m in re.find_iter(&lower) {
        let word = m.as_str();
        if vocab.high_value.contains(word) || !vocab.stop_words.contains(word) {
            keywords.insert(word.to_string());
        }
    }
    keywords
}

/// Find the best-matching signal for an item: overlap of at least
/// `min_overlap` keywords, ranked by overlap x engagement. Ties keep the
/// first signal in iteration order (reddit, then hackernews, then github).
pub fn match_item(
    item_keywords: &BTreeSet<String>,
    signals: &[TrendingSignal],
    min_overlap: usize,
) -> Option<ViralMatch> {
    let mut best: Option<ViralMatch> = None;
    let mut best_score = 0i64;

    for signal in signals {
        let matches: Vec<String> = item_keywords
            .intersection(&signal.keywords)
            .cloned()
            .collect();
        let strength = matches.len();
        if strength < min_overlap {
            continue;
        }

        let combined = (strength as i64) * signal.score.max(1);
        if combined > best_score {
            best_score = combined;
            best = Some(ViralMatch {
                signal_source: signal.source.clone(),
                signal_title: truncate_chars(&signal.title, 100),
                signal_score: signal.score,
                matched_keywords: matches,
                match_strength: strength,
                combined_score: combined,
            });
        }
    }

    best
}

/// Check items against the fetched signals and promote matching ROUTINE
/// items to VIRAL (tier 2). Stronger classifications are left untouched.
/// Returns the number of promotions.
pub fn promote_viral(
    items: &mut [CandidateItem],
    signals: &[TrendingSignal],
    vocab: &KeywordVocab,
    min_overlap: usize,
) -> usize {
    let mut promoted = 0usize;

    for item in items.iter_mut() {
        let item_keywords = extract_keywords(&item.text(), vocab);
        let Some(found) = match_item(&item_keywords, signals, min_overlap) else {
            continue;
        };

        let Some(ec) = item.event.as_mut() else {
            continue;
        };
        if ec.event_type == EventType::Routine {
            ec.event_type = EventType::Viral;
            ec.priority = EventType::Viral.priority();
            ec.viral_boost = true;
            tracing::info!(
                signal_source = %found.signal_source,
                strength = found.match_strength,
                title = %truncate_chars(&item.title, 50),
                "promoted routine item to viral"
            );
            item.viral = Some(found);
            promoted += 1;
        } else {
            // Content-based classification outranks trend matching; keep the
            // match for auditability but do not override.
            item.viral = Some(found);
        }
    }

    if promoted > 0 {
        tracing::info!(count = promoted, "viral promotions this run");
    }
    promoted
}

/// Fetch all trending sources concurrently with a per-source timeout. A
/// failed or slow source contributes an empty list. The returned vector
/// preserves provider order, which the tie-break in [`match_item`] relies on.
pub async fn collect_signals(
    providers: &[Box<dyn sources::SignalProvider>],
    timeout: Duration,
) -> Vec<TrendingSignal> {
    let tasks = providers.iter().map(|p| async move {
        match tokio::time::timeout(timeout, p.fetch()).await {
            Ok(Ok(signals)) => {
                tracing::info!(source = p.name(), count = signals.len(), "trending signals fetched");
                signals
            }
            Ok(Err(e)) => {
                tracing::warn!(error = ?e, source = p.name(), "trending source error");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(source = p.name(), "trending source timed out");
                Vec::new()
            }
        }
    });

    join_all(tasks).await.into_iter().flatten().collect()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
