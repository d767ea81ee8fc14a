// tests/ingest_pipeline.rs
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use news_radar::config::ArticleConfig;
use news_radar::ingest;
use news_radar::ingest::types::{item_id, CandidateItem, FeedProvider};

struct MockFeed;

#[async_trait]
impl FeedProvider for MockFeed {
    async fn fetch_latest(&self) -> Result<Vec<CandidateItem>> {
        Ok(vec![
            CandidateItem {
                id: item_id("https://example.test/a"),
                title: "<b>Hello&nbsp;world</b>".into(),
                link: "https://example.test/a".into(),
                summary: "Some &ldquo;quoted&rdquo; <i>summary</i>".into(),
                source: "Mock".into(),
                source_category: "tech".into(),
                author: "Mock".into(),
                published: None,
                relevance: None,
                event: None,
                viral: None,
            },
            // Duplicate link: must be removed.
            CandidateItem {
                id: item_id("https://example.test/a"),
                title: "Hello world again".into(),
                link: "https://example.test/a".into(),
                summary: String::new(),
                source: "Mock".into(),
                source_category: "tech".into(),
                author: "Mock".into(),
                published: None,
                relevance: None,
                event: None,
                viral: None,
            },
        ])
    }

    fn name(&self) -> String {
        "MockFeed".into()
    }
}

struct BrokenFeed;

#[async_trait]
impl FeedProvider for BrokenFeed {
    async fn fetch_latest(&self) -> Result<Vec<CandidateItem>> {
        anyhow::bail!("simulated feed outage")
    }

    fn name(&self) -> String {
        "BrokenFeed".into()
    }
}

#[tokio::test]
async fn smoke_pipeline_normalizes_and_dedups() {
    let providers: Vec<Box<dyn FeedProvider>> = vec![Box::new(MockFeed)];
    let out = ingest::fetch_and_process(
        &providers,
        &ArticleConfig::default(),
        Duration::from_secs(5),
    )
    .await;
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].title, "Hello world");
    assert_eq!(out[0].summary, "Some \"quoted\" summary");
}

#[tokio::test]
async fn one_broken_feed_does_not_block_the_rest() {
    let providers: Vec<Box<dyn FeedProvider>> = vec![Box::new(BrokenFeed), Box::new(MockFeed)];
    let out = ingest::fetch_and_process(
        &providers,
        &ArticleConfig::default(),
        Duration::from_secs(5),
    )
    .await;
    assert_eq!(out.len(), 1);
}
