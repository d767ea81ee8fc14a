// src/ingest/providers/rss.rs
//! Generic RSS 2.0 feed provider. One instance per configured feed; parses
//! either a live HTTP response or a fixture string (tests).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::config::FeedConfig;
use crate::ingest::types::{item_id, CandidateItem, FeedProvider};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    author: Option<String>,
}

fn parse_rfc2822_to_utc(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC))
        .and_then(|dt| Utc.timestamp_opt(dt.unix_timestamp(), 0).single())
}

pub struct RssFeedProvider {
    feed: FeedConfig,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl RssFeedProvider {
    pub fn from_config(feed: FeedConfig, client: reqwest::Client) -> Self {
        Self {
            feed,
            mode: Mode::Http { client },
        }
    }

    pub fn from_fixture_str(feed: FeedConfig, xml: &str) -> Self {
        Self {
            feed,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    fn parse_items_from_str(&self, s: &str) -> Result<Vec<CandidateItem>> {
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean)
            .with_context(|| format!("parsing rss xml for {}", self.feed.name))?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let title = it.title.as_deref().unwrap_or("").trim().to_string();
            let link = it.link.as_deref().unwrap_or("").trim().to_string();
            // Required fields; an entry without them is dropped, not fatal.
            if title.is_empty() || link.is_empty() {
                continue;
            }

            out.push(CandidateItem {
                id: item_id(&link),
                title,
                summary: it.description.unwrap_or_default().trim().to_string(),
                published: it.pub_date.as_deref().and_then(parse_rfc2822_to_utc),
                author: it.author.unwrap_or_else(|| self.feed.name.clone()),
                link,
                source: self.feed.name.clone(),
                source_category: self.feed.category.clone(),
                relevance: None,
                event: None,
                viral: None,
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl FeedProvider for RssFeedProvider {
    async fn fetch_latest(&self) -> Result<Vec<CandidateItem>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s),
            Mode::Http { client } => {
                let body = client
                    .get(&self.feed.url)
                    .send()
                    .await
                    .with_context(|| format!("{} http get", self.feed.name))?
                    .text()
                    .await
                    .with_context(|| format!("{} http body", self.feed.name))?;
                self.parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> String {
        self.feed.name.clone()
    }
}

// Named entities commonly found in feed descriptions that are not valid XML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Tech</title>
    <item>
      <title>OpenAI launches GPT-5</title>
      <link>https://example.test/gpt5</link>
      <pubDate>Mon, 02 Jun 2025 10:00:00 +0000</pubDate>
      <description>New model available today.</description>
    </item>
    <item>
      <title>Untitled entry without a link</title>
      <description>Should be dropped.</description>
    </item>
  </channel>
</rss>"#;

    fn feed() -> FeedConfig {
        FeedConfig {
            name: "Example Tech".into(),
            url: "https://example.test/rss".into(),
            category: "tech".into(),
        }
    }

    #[tokio::test]
    async fn parses_fixture_and_drops_incomplete_entries() {
        let provider = RssFeedProvider::from_fixture_str(feed(), FIXTURE);
        let items = provider.fetch_latest().await.expect("parse");
        assert_eq!(items.len(), 1);
        let it = &items[0];
        assert_eq!(it.title, "OpenAI launches GPT-5");
        assert_eq!(it.source, "Example Tech");
        assert_eq!(it.id, item_id("https://example.test/gpt5"));
        let ts = it.published.expect("pubDate parsed");
        assert_eq!(ts.timestamp(), 1748858400);
    }

    #[test]
    fn rfc2822_parse_tolerates_garbage() {
        assert!(parse_rfc2822_to_utc("not a date").is_none());
        assert!(parse_rfc2822_to_utc("Mon, 02 Jun 2025 10:00:00 +0000").is_some());
    }
}
