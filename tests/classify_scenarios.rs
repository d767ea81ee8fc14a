// tests/classify_scenarios.rs
//! End-to-end classification scenarios at the classify + queue level.

use news_radar::classify::{classify_keywords, ClassifierConfig, ConfidenceSource, EventType};
use news_radar::config::QueueCaps;
use news_radar::ingest::types::{item_id, CandidateItem};
use news_radar::queue::{build_queues, select_for_publishing};
use news_radar::trending::{extract_keywords, match_item, promote_viral, KeywordVocab, TrendingSignal};

fn item(title: &str, summary: &str) -> CandidateItem {
    let mut it = CandidateItem {
        id: item_id(title),
        title: title.into(),
        link: format!("https://example.test/{}", item_id(title)),
        summary: summary.into(),
        source: "Test".into(),
        source_category: "tech".into(),
        author: "Test".into(),
        published: None,
        relevance: None,
        event: None,
        viral: None,
    };
    it.event = Some(classify_keywords(
        &ClassifierConfig::default(),
        title,
        summary,
    ));
    it
}

// Scenario A: "OpenAI launches GPT-5" -> keyword pass matches "launches" ->
// BREAKING, tier 1 -> lands in the urgent queue.
#[test]
fn scenario_a_breaking_launch_goes_urgent() {
    let gpt5 = item("OpenAI launches GPT-5", "New model available today");
    let ec = gpt5.event.clone().unwrap();
    assert_eq!(ec.event_type, EventType::Breaking);
    assert_eq!(ec.priority, 1);
    assert_eq!(ec.confidence, ConfidenceSource::KeywordMatch);
    assert!(ec.high_profile);
    assert!(ec.boosted);

    let queues = build_queues(vec![gpt5]);
    assert_eq!(queues.urgent.len(), 1);
    let selected = select_for_publishing(queues, &QueueCaps::default(), None);
    assert_eq!(selected.len(), 1);
}

// Scenario B: a routine newsletter with no event keywords and no trending
// overlap stays ROUTINE and publishes only when nothing urgent exists.
#[test]
fn scenario_b_routine_newsletter() {
    let newsletter = item("Weekly AI newsletter roundup", "Regular ecosystem digest");
    let ec = newsletter.event.clone().unwrap();
    assert_eq!(ec.event_type, EventType::Routine);
    assert_eq!(ec.priority, 3);
    assert_eq!(ec.confidence, ConfidenceSource::Default);

    // No trending overlap >= 2: no promotion.
    let vocab = KeywordVocab::default();
    let signals = vec![TrendingSignal {
        source: "reddit".into(),
        title: "Completely unrelated cooking thread".into(),
        score: 999,
        url: "https://reddit.test/x".into(),
        keywords: extract_keywords("Completely unrelated cooking thread", &vocab),
    }];
    let item_kws = extract_keywords(&newsletter.text(), &vocab);
    assert!(match_item(&item_kws, &signals, 2).is_none());

    // Alone, it is the run's sole content.
    let selected = select_for_publishing(
        build_queues(vec![newsletter.clone()]),
        &QueueCaps::default(),
        None,
    );
    assert_eq!(selected.len(), 1);

    // Next to real news that already fills the run, it is not selected.
    let selected = select_for_publishing(
        build_queues(vec![
            item("OpenAI launches GPT-5", "today"),
            item("Meta lays off 10,000 employees", "restructuring"),
            newsletter,
        ]),
        &QueueCaps::default(),
        None,
    );
    assert_eq!(selected.len(), 2);
    assert!(selected
        .iter()
        .all(|i| i.event.as_ref().unwrap().priority == 1));
}

// Scenario C: FUNDING outranks trending overlap — VIRAL promotion must not
// override a non-ROUTINE classification.
#[test]
fn scenario_c_funding_resists_viral_promotion() {
    let vocab = KeywordVocab::default();
    let mut items = vec![item(
        "Anthropic raises $2B at $60B valuation",
        "Funding round announced by investors",
    )];
    assert_eq!(
        items[0].event.as_ref().unwrap().event_type,
        EventType::Funding
    );

    let signals = vec![TrendingSignal {
        source: "hackernews".into(),
        title: "Anthropic valuation funding round discussion".into(),
        score: 800,
        url: "https://news.ycombinator.test/x".into(),
        keywords: extract_keywords("Anthropic valuation funding round discussion", &vocab),
    }];

    let promoted = promote_viral(&mut items, &signals, &vocab, 2);
    assert_eq!(promoted, 0);
    let ec = items[0].event.as_ref().unwrap();
    assert_eq!(ec.event_type, EventType::Funding);
    assert_eq!(ec.priority, 2);
    assert!(!ec.viral_boost);
}

// Keyword classification is a pure function of (title, summary).
#[test]
fn keyword_classification_is_deterministic() {
    let cfg = ClassifierConfig::default();
    for (title, summary) in [
        ("OpenAI launches GPT-5", "available"),
        ("Google acquires AI startup for $2 billion", "deal announced"),
        ("Italy tells Meta to halt WhatsApp AI restrictions", "legal order"),
        ("Weekly AI newsletter", "digest"),
    ] {
        let a = classify_keywords(&cfg, title, summary);
        let b = classify_keywords(&cfg, title, summary);
        assert_eq!(a, b, "classification must be idempotent for {title}");
        assert_eq!(a.priority, a.event_type.priority());
    }
}

// Alternate tables are injectable: the classifier has no ambient state.
#[test]
fn alternate_signal_tables_are_respected() {
    let cfg = ClassifierConfig {
        signals: vec![(EventType::Lawsuit, vec!["flibbertigibbet".into()])],
        high_profile_entities: vec!["examplecorp".into()],
    };
    let ec = classify_keywords(&cfg, "ExampleCorp flibbertigibbet hearing", "");
    assert_eq!(ec.event_type, EventType::Lawsuit);
    assert!(ec.high_profile);

    // The default BREAKING phrase means nothing to this table.
    let ec = classify_keywords(&cfg, "Company launches product", "");
    assert_eq!(ec.event_type, EventType::Routine);
}
