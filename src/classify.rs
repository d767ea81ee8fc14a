// src/classify.rs
//! Event classifier: assigns each candidate exactly one event type and a
//! priority tier. The keyword pass works with no network access and is a
//! pure function of (title, summary); a chat model can override it with a
//! higher-accuracy label, degrading silently back to the keyword result on
//! any failure. Classification never blocks the pipeline.

use serde::{Deserialize, Serialize};

use crate::llm::{ChatModel, ChatRequest, Outcome};

/// The fixed event taxonomy. Priority tiers are a pure function of the
/// variant: 1 = publish immediately, 2 = publish within the hour, 3 = batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Breaking,
    Acquisition,
    Layoffs,
    Lawsuit,
    Funding,
    Viral,
    Routine,
}

impl EventType {
    /// Stable iteration order for the keyword pass; first match wins.
    pub const ALL: [EventType; 7] = [
        EventType::Breaking,
        EventType::Acquisition,
        EventType::Layoffs,
        EventType::Lawsuit,
        EventType::Funding,
        EventType::Viral,
        EventType::Routine,
    ];

    pub fn priority(self) -> u8 {
        match self {
            EventType::Breaking => 1,
            EventType::Acquisition => 1,
            EventType::Layoffs => 1,
            EventType::Lawsuit => 1,
            EventType::Funding => 2,
            EventType::Viral => 2,
            EventType::Routine => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EventType::Breaking => "BREAKING",
            EventType::Acquisition => "ACQUISITION",
            EventType::Layoffs => "LAYOFFS",
            EventType::Lawsuit => "LAWSUIT",
            EventType::Funding => "FUNDING",
            EventType::Viral => "VIRAL",
            EventType::Routine => "ROUTINE",
        }
    }

    pub fn from_label(label: &str) -> Option<EventType> {
        EventType::ALL.into_iter().find(|et| et.label() == label)
    }
}

/// Which pass produced the event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceSource {
    KeywordMatch,
    Model,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventClassification {
    pub event_type: EventType,
    pub priority: u8,
    pub confidence: ConfidenceSource,
    pub high_profile: bool,
    /// High-profile entity + tier-1 hard-news type. Informational only.
    #[serde(default)]
    pub boosted: bool,
    /// Set by the trending matcher when a ROUTINE item is promoted.
    #[serde(default)]
    pub viral_boost: bool,
}

impl EventClassification {
    fn new(event_type: EventType, confidence: ConfidenceSource, high_profile: bool) -> Self {
        let mut ec = Self {
            event_type,
            priority: event_type.priority(),
            confidence,
            high_profile,
            boosted: false,
            viral_boost: false,
        };
        // Boost rule: high-profile entity on hard tier-1 news.
        ec.boosted = ec.high_profile
            && matches!(
                ec.event_type,
                EventType::Breaking | EventType::Acquisition | EventType::Layoffs
            );
        ec
    }
}

/// Keyword tables and the high-profile entity list. Immutable; built once
/// and passed in, so tests can inject alternates.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Ordered: the first event type with any matching phrase wins.
    pub signals: Vec<(EventType, Vec<String>)>,
    pub high_profile_entities: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        fn phrases(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }
        Self {
            signals: vec![
                (
                    EventType::Breaking,
                    phrases(&[
                        "launches", "released", "announces", "unveils", "introduces", "debuts",
                        "now available", "ships", "rolls out", "goes live", "officially",
                    ]),
                ),
                (
                    EventType::Acquisition,
                    phrases(&[
                        "acquires", "acquisition", "buys", "bought", "merger", "deal",
                        "takes over", "purchase",
                    ]),
                ),
                (
                    EventType::Layoffs,
                    phrases(&[
                        "layoffs", "lays off", "cuts", "job cuts", "eliminates",
                        "reduces workforce", "restructure", "downsizing", "firing",
                    ]),
                ),
                (
                    EventType::Lawsuit,
                    phrases(&[
                        "sues", "lawsuit", "sued", "court", "legal", "antitrust",
                        "investigation", "ban", "blocks", "halts", "orders", "ruling",
                    ]),
                ),
                (
                    EventType::Funding,
                    phrases(&[
                        "raises", "funding", "valuation", "series a", "series b", "series c",
                        "investment", "backed", "secures",
                    ]),
                ),
                (
                    EventType::Viral,
                    phrases(&["trending", "viral", "explodes", "blows up", "everyone is talking"]),
                ),
            ],
            high_profile_entities: phrases(&[
                "openai", "google", "apple", "microsoft", "meta", "amazon", "nvidia",
                "tesla", "anthropic", "mistral", "chatgpt", "gpt-5", "gpt-4", "gemini",
                "claude", "waymo", "x.ai", "deepmind", "stability ai", "midjourney",
            ]),
        }
    }
}

/// Keyword pass. Pure function of (title, summary): lower-case the text,
/// walk the signal table in order, first event type with any phrase hit
/// wins; no hit means ROUTINE.
pub fn classify_keywords(cfg: &ClassifierConfig, title: &str, summary: &str) -> EventClassification {
    let text = format!("{} {}", title, summary).to_lowercase();

    let high_profile = cfg
        .high_profile_entities
        .iter()
        .any(|entity| text.contains(entity.as_str()));

    for (event_type, phrases) in &cfg.signals {
        if phrases.iter().any(|kw| text.contains(kw.as_str())) {
            return EventClassification::new(*event_type, ConfidenceSource::KeywordMatch, high_profile);
        }
    }

    EventClassification::new(EventType::Routine, ConfidenceSource::Default, high_profile)
}

fn event_prompt(title: &str, summary: &str) -> String {
    let excerpt: String = summary.chars().take(300).collect();
    format!(
        r#"Classify this news article into exactly ONE category.

Categories:
- BREAKING: New product launches, model releases, feature announcements, things people will Google TODAY
- ACQUISITION: Company buys/acquires another company
- LAYOFFS: Job cuts, workforce reductions, restructuring
- LAWSUIT: Legal action, bans, investigations, court rulings
- FUNDING: Investment rounds, valuations (only if >$50M or well-known company)
- VIRAL: Trending on social media, generating buzz
- ROUTINE: Regular updates, opinion pieces, minor features, not time-sensitive

TITLE: {title}
SUMMARY: {excerpt}

Think: "Will people start Googling this within the next few hours?"
If yes, pick BREAKING, ACQUISITION, LAYOFFS, LAWSUIT, or FUNDING.
If no, pick ROUTINE.

Reply with ONLY the category name (one word)."#,
        title = title,
        excerpt = if excerpt.is_empty() { "N/A".to_string() } else { excerpt },
    )
}

/// Pull a valid label out of a model reply: exact match first, then a
/// substring salvage for replies like "Category: BREAKING".
fn salvage_label(reply: &str) -> Option<EventType> {
    let cleaned = reply.trim().to_uppercase();
    if let Some(et) = EventType::from_label(&cleaned) {
        return Some(et);
    }
    EventType::ALL
        .into_iter()
        .find(|et| cleaned.contains(et.label()))
}

/// Model-assisted classification. Any transport failure or unrecognized
/// label degrades to the keyword result; the caller sees which path won via
/// the [`Outcome`] and the classification's confidence source.
pub async fn classify_with_model(
    cfg: &ClassifierConfig,
    chat: &dyn ChatModel,
    title: &str,
    summary: &str,
) -> Outcome<EventClassification> {
    let keyword = classify_keywords(cfg, title, summary);

    let req = ChatRequest {
        system: "You are a news editor who identifies breaking news that will drive search traffic.",
        user: &event_prompt(title, summary),
        temperature: 0.1,
        max_tokens: 20,
    };

    let reply = match chat.complete(req).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(error = ?e, "event model call failed; using keyword classification");
            return Outcome::Fallback {
                value: keyword,
                reason: format!("model call failed: {e}"),
            };
        }
    };

    match salvage_label(&reply) {
        Some(event_type) => Outcome::Live(EventClassification::new(
            event_type,
            ConfidenceSource::Model,
            keyword.high_profile,
        )),
        None => {
            tracing::warn!(reply = %reply, "event model returned an invalid label; using keyword classification");
            Outcome::Fallback {
                value: keyword,
                reason: format!("invalid label: {reply}"),
            }
        }
    }
}

/// Classify one item, preferring the model when one is wired in.
pub async fn classify_item(
    cfg: &ClassifierConfig,
    chat: Option<&dyn ChatModel>,
    title: &str,
    summary: &str,
) -> EventClassification {
    let ec = match chat {
        Some(model) => classify_with_model(cfg, model, title, summary)
            .await
            .into_value(),
        None => classify_keywords(cfg, title, summary),
    };
    if ec.boosted {
        tracing::info!(event = ec.event_type.label(), title = %truncate(title, 50), "boosted high-profile item");
    }
    ec
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockChat;

    fn cfg() -> ClassifierConfig {
        ClassifierConfig::default()
    }

    #[test]
    fn priority_table_is_fixed() {
        assert_eq!(EventType::Breaking.priority(), 1);
        assert_eq!(EventType::Acquisition.priority(), 1);
        assert_eq!(EventType::Layoffs.priority(), 1);
        assert_eq!(EventType::Lawsuit.priority(), 1);
        assert_eq!(EventType::Funding.priority(), 2);
        assert_eq!(EventType::Viral.priority(), 2);
        assert_eq!(EventType::Routine.priority(), 3);
    }

    #[test]
    fn labels_round_trip() {
        for et in EventType::ALL {
            assert_eq!(EventType::from_label(et.label()), Some(et));
        }
        assert_eq!(EventType::from_label("NONSENSE"), None);
    }

    #[test]
    fn keyword_pass_first_match_wins() {
        // "launches" (BREAKING) appears before "raises" (FUNDING) in table
        // order, so a title with both classifies as BREAKING.
        let ec = classify_keywords(&cfg(), "Startup launches product and raises $100M", "");
        assert_eq!(ec.event_type, EventType::Breaking);
        assert_eq!(ec.priority, 1);
        assert_eq!(ec.confidence, ConfidenceSource::KeywordMatch);
    }

    #[test]
    fn keyword_pass_is_idempotent() {
        let a = classify_keywords(&cfg(), "Meta lays off 10,000 employees", "restructuring");
        let b = classify_keywords(&cfg(), "Meta lays off 10,000 employees", "restructuring");
        assert_eq!(a, b);
        assert_eq!(a.event_type, EventType::Layoffs);
    }

    #[test]
    fn no_signal_means_routine_default() {
        let ec = classify_keywords(&cfg(), "Weekly AI newsletter roundup", "Regular updates");
        assert_eq!(ec.event_type, EventType::Routine);
        assert_eq!(ec.priority, 3);
        assert_eq!(ec.confidence, ConfidenceSource::Default);
    }

    #[test]
    fn high_profile_flag_is_independent_of_event_type() {
        let routine = classify_keywords(&cfg(), "An essay about OpenAI culture", "opinion");
        assert_eq!(routine.event_type, EventType::Routine);
        assert!(routine.high_profile);
        assert!(!routine.boosted);
    }

    #[test]
    fn boost_requires_high_profile_and_hard_news() {
        let boosted = classify_keywords(&cfg(), "OpenAI launches GPT-5", "available today");
        assert_eq!(boosted.event_type, EventType::Breaking);
        assert!(boosted.boosted);

        // FUNDING is tier 2: high-profile but not boosted.
        let funding = classify_keywords(&cfg(), "Anthropic raises $2B", "funding round");
        assert_eq!(funding.event_type, EventType::Funding);
        assert!(funding.high_profile);
        assert!(!funding.boosted);
    }

    #[tokio::test]
    async fn model_label_overrides_keywords() {
        let chat = MockChat::new(["LAWSUIT"]);
        let out = classify_with_model(&cfg(), &chat, "Regulator moves against startup", "").await;
        assert!(out.is_live());
        assert_eq!(out.value().event_type, EventType::Lawsuit);
        assert_eq!(out.value().confidence, ConfidenceSource::Model);
    }

    #[tokio::test]
    async fn model_salvages_label_from_chatty_reply() {
        let chat = MockChat::new(["Category: ACQUISITION."]);
        let out = classify_with_model(&cfg(), &chat, "Big co buys small co", "").await;
        assert!(out.is_live());
        assert_eq!(out.value().event_type, EventType::Acquisition);
    }

    #[tokio::test]
    async fn invalid_model_label_falls_back_to_keywords() {
        let chat = MockChat::new(["SOMETHING_ELSE"]);
        let out = classify_with_model(&cfg(), &chat, "OpenAI launches GPT-5", "").await;
        assert!(!out.is_live());
        assert_eq!(out.value().event_type, EventType::Breaking);
        assert_eq!(out.value().confidence, ConfidenceSource::KeywordMatch);
    }

    #[tokio::test]
    async fn model_failure_is_silent_to_the_caller() {
        let chat = MockChat::failing("simulated timeout");
        let out = classify_with_model(&cfg(), &chat, "OpenAI launches GPT-5", "").await;
        assert!(!out.is_live());
        assert_eq!(out.value().event_type, EventType::Breaking);
    }
}
