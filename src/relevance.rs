// src/relevance.rs
//! Topic relevance gate: scores each candidate against the configured topic
//! categories. A keyword scorer is always available offline; when a chat
//! model is wired in, it produces a higher-accuracy score and the keyword
//! result is the per-item fallback.

use serde::{Deserialize, Serialize};

use crate::config::{ArticleConfig, TopicCategory};
use crate::ingest::types::CandidateItem;
use crate::llm::{strip_code_fence, ChatModel, ChatRequest, Outcome};

/// Result of relevance evaluation, attached to the candidate item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relevance {
    pub relevant: bool,
    /// 0-100.
    pub score: u32,
    pub primary_topic: String,
    pub keywords: Vec<String>,
    pub reason: String,
}

const SCORE_PER_KEYWORD: u32 = 15;
const MAX_SCORE: u32 = 100;

/// Keyword scorer: +15 per matched topic keyword, capped at 100. The primary
/// topic is the first category (in config order) with any hit.
pub fn score_keywords(
    topics: &[TopicCategory],
    min_relevance_score: u32,
    title: &str,
    summary: &str,
) -> Relevance {
    let text = format!("{} {}", title, summary).to_lowercase();

    let mut score = 0u32;
    let mut matched = Vec::new();
    let mut primary_topic = String::from("Other");

    for category in topics {
        for keyword in &category.keywords {
            if contains_word(&text, &keyword.to_lowercase()) {
                score += SCORE_PER_KEYWORD;
                matched.push(keyword.clone());
                if primary_topic == "Other" {
                    primary_topic = category.name.clone();
                }
            }
        }
    }
    let score = score.min(MAX_SCORE);

    matched.truncate(5);
    Relevance {
        relevant: score >= min_relevance_score,
        score,
        primary_topic,
        keywords: matched,
        reason: "keyword scorer".into(),
    }
}

/// Whole-word containment; plain substring matching would let "ai" fire
/// inside "rain" or "maintain".
fn contains_word(haystack: &str, needle: &str) -> bool {
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(needle) {
        let abs = start + pos;
        let end = abs + needle.len();
        let before_ok = abs == 0
            || !haystack[..abs]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
        let after_ok = end >= haystack.len()
            || !haystack[end..].chars().next().is_some_and(|c| c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        start = end;
    }
    false
}

#[derive(Deserialize)]
struct ModelRelevance {
    relevant: bool,
    relevance_score: u32,
    primary_topic: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    reason: String,
}

fn relevance_prompt(topics: &[TopicCategory], item: &CandidateItem) -> String {
    let topic_names: Vec<&str> = topics.iter().map(|t| t.name.as_str()).collect();
    format!(
        r#"Analyze this news article and determine its relevance to our target topics.

ARTICLE TITLE: {title}

ARTICLE SUMMARY: {summary}

TARGET TOPICS: {topics}

Respond in this exact JSON format:
{{
    "relevant": true,
    "relevance_score": 0,
    "primary_topic": "one of the target topics or Other",
    "keywords": ["keyword1", "keyword2", "keyword3"],
    "reason": "Brief explanation of why this article is or isn't relevant"
}}

relevance_score is 0-100. Only respond with the JSON, no other text."#,
        title = item.title,
        summary = item.summary,
        topics = topic_names.join(", "),
    )
}

/// Model-assisted relevance with silent degradation to the keyword scorer.
pub async fn score_with_model(
    chat: &dyn ChatModel,
    topics: &[TopicCategory],
    article_cfg: &ArticleConfig,
    item: &CandidateItem,
) -> Outcome<Relevance> {
    let keyword = score_keywords(
        topics,
        article_cfg.min_relevance_score,
        &item.title,
        &item.summary,
    );

    let req = ChatRequest {
        system: "You are a news classifier. Respond only with valid JSON.",
        user: &relevance_prompt(topics, item),
        temperature: 0.3,
        max_tokens: 500,
    };

    let raw = match chat.complete(req).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = ?e, item = %item.id, "relevance model call failed; using keyword score");
            return Outcome::Fallback {
                value: keyword,
                reason: format!("model call failed: {e}"),
            };
        }
    };

    match serde_json::from_str::<ModelRelevance>(strip_code_fence(&raw)) {
        Ok(parsed) => {
            let score = parsed.relevance_score.min(MAX_SCORE);
            Outcome::Live(Relevance {
                relevant: parsed.relevant && score >= article_cfg.min_relevance_score,
                score,
                primary_topic: parsed.primary_topic,
                keywords: parsed.keywords,
                reason: parsed.reason,
            })
        }
        Err(e) => {
            tracing::warn!(error = ?e, item = %item.id, "relevance model returned malformed JSON; using keyword score");
            Outcome::Fallback {
                value: keyword,
                reason: format!("malformed model response: {e}"),
            }
        }
    }
}

/// Score every item (model-assisted when available), attach the relevance,
/// then filter to relevant items sorted by descending score.
pub async fn classify_and_filter(
    chat: Option<&dyn ChatModel>,
    topics: &[TopicCategory],
    article_cfg: &ArticleConfig,
    mut items: Vec<CandidateItem>,
) -> Vec<CandidateItem> {
    for item in items.iter_mut() {
        let rel = match chat {
            Some(model) => score_with_model(model, topics, article_cfg, item)
                .await
                .into_value(),
            None => score_keywords(
                topics,
                article_cfg.min_relevance_score,
                &item.title,
                &item.summary,
            ),
        };
        item.relevance = Some(rel);
    }

    let mut relevant: Vec<CandidateItem> = items
        .into_iter()
        .filter(|i| i.relevance.as_ref().is_some_and(|r| r.relevant))
        .collect();
    relevant.sort_by(|a, b| {
        let sa = a.relevance.as_ref().map(|r| r.score).unwrap_or(0);
        let sb = b.relevance.as_ref().map(|r| r.score).unwrap_or(0);
        sb.cmp(&sa)
    });
    relevant
}
