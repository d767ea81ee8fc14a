// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::EventClassification;
use crate::relevance::Relevance;
use crate::trending::ViralMatch;

/// One news item flowing through the pipeline. Created by intake, enriched
/// in place by the relevance filter, event classifier, and trending matcher,
/// consumed once by content generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateItem {
    /// Stable identifier derived from the link (same URL => same id).
    pub id: String,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub source: String,
    pub source_category: String,
    pub author: String,
    pub published: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<Relevance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<EventClassification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viral: Option<ViralMatch>,
}

impl CandidateItem {
    /// Title + summary, the text every downstream scorer works on.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.summary)
    }
}

/// Stable 12-hex-char identifier for a source URL.
pub fn item_id(url: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<CandidateItem>>;
    fn name(&self) -> String;
}
