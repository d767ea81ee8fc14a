// src/trending/sources.rs
//! Trending-source providers: Reddit hot posts, Hacker News top stories,
//! GitHub recently-starred repositories. Each provider applies its own
//! engagement floor; fetch errors surface as `Err` and the collector turns
//! them into an empty contribution.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use serde::Deserialize;

use crate::config::TrendingConfig;
use crate::trending::{extract_keywords, KeywordVocab, TrendingSignal};

const USER_AGENT: &str = "news-radar/0.1";
const HN_BASE: &str = "https://hacker-news.firebaseio.com/v0";
const GITHUB_SEARCH: &str = "https://api.github.com/search/repositories";

// Repos must mention one of these to count as a tech trending signal.
const GITHUB_TECH_TERMS: [&str; 8] = [
    "ai", "llm", "gpt", "ml", "machine learning", "neural", "agent", "automation",
];

#[async_trait]
pub trait SignalProvider: Send + Sync {
    async fn fetch(&self) -> Result<Vec<TrendingSignal>>;
    fn name(&self) -> &'static str;
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(10))
        .build()
        .expect("reqwest client")
}

/* ----------------------------
Reddit
---------------------------- */

#[derive(Debug, Deserialize)]
struct RedditListing {
    data: RedditListingData,
}
#[derive(Debug, Deserialize)]
struct RedditListingData {
    #[serde(default)]
    children: Vec<RedditPost>,
}
#[derive(Debug, Deserialize)]
struct RedditPost {
    data: RedditPostData,
}
#[derive(Debug, Deserialize)]
struct RedditPostData {
    #[serde(default)]
    title: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    permalink: String,
}

pub struct RedditProvider {
    client: reqwest::Client,
    subreddits: Vec<String>,
    min_score: i64,
    vocab: KeywordVocab,
}

impl RedditProvider {
    pub fn new(cfg: &TrendingConfig, vocab: KeywordVocab) -> Self {
        Self {
            client: http_client(),
            subreddits: cfg.subreddits.clone(),
            min_score: cfg.reddit_min_score,
            vocab,
        }
    }
}

/// Parse one subreddit hot listing into signals above the score floor.
pub fn parse_reddit_listing(
    json: &str,
    min_score: i64,
    vocab: &KeywordVocab,
) -> Result<Vec<TrendingSignal>> {
    let listing: RedditListing = serde_json::from_str(json).context("reddit listing json")?;
    let mut out = Vec::new();
    for post in listing.data.children {
        let d = post.data;
        if d.score < min_score || d.title.is_empty() {
            continue;
        }
        out.push(TrendingSignal {
            source: "reddit".into(),
            keywords: extract_keywords(&d.title, vocab),
            url: format!("https://reddit.com{}", d.permalink),
            title: d.title,
            score: d.score,
        });
    }
    Ok(out)
}

#[async_trait]
impl SignalProvider for RedditProvider {
    async fn fetch(&self) -> Result<Vec<TrendingSignal>> {
        let mut all = Vec::new();
        for subreddit in &self.subreddits {
            let url = format!("https://www.reddit.com/r/{subreddit}/hot.json?limit=15");
            let body = match self.client.get(&url).send().await {
                Ok(resp) => resp.text().await.context("reddit body")?,
                Err(e) => {
                    tracing::warn!(error = ?e, subreddit = %subreddit, "reddit fetch error");
                    continue;
                }
            };
            match parse_reddit_listing(&body, self.min_score, &self.vocab) {
                Ok(mut signals) => {
                    tracing::debug!(subreddit = %subreddit, count = signals.len(), "reddit trending");
                    all.append(&mut signals);
                }
                Err(e) => {
                    tracing::warn!(error = ?e, subreddit = %subreddit, "reddit parse error");
                }
            }
        }
        Ok(all)
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}

/* ----------------------------
Hacker News
---------------------------- */

#[derive(Debug, Deserialize)]
struct HnItem {
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
    score: Option<i64>,
    url: Option<String>,
    id: Option<i64>,
}

pub struct HackerNewsProvider {
    client: reqwest::Client,
    min_score: i64,
    top_limit: usize,
    vocab: KeywordVocab,
}

impl HackerNewsProvider {
    pub fn new(cfg: &TrendingConfig, vocab: KeywordVocab) -> Self {
        Self {
            client: http_client(),
            min_score: cfg.hn_min_score,
            top_limit: cfg.hn_top_limit,
            vocab,
        }
    }
}

/// Convert one HN item payload into a signal if it is a story above the floor.
pub fn parse_hn_item(json: &str, min_score: i64, vocab: &KeywordVocab) -> Option<TrendingSignal> {
    let item: HnItem = serde_json::from_str(json).ok()?;
    if item.kind.as_deref() != Some("story") {
        return None;
    }
    let score = item.score.unwrap_or(0);
    if score < min_score {
        return None;
    }
    let title = item.title?;
    let url = item
        .url
        .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", item.id.unwrap_or(0)));
    Some(TrendingSignal {
        source: "hackernews".into(),
        keywords: extract_keywords(&title, vocab),
        title,
        score,
        url,
    })
}

#[async_trait]
impl SignalProvider for HackerNewsProvider {
    async fn fetch(&self) -> Result<Vec<TrendingSignal>> {
        let ids: Vec<i64> = self
            .client
            .get(format!("{HN_BASE}/topstories.json"))
            .send()
            .await
            .context("hn topstories get")?
            .json()
            .await
            .context("hn topstories json")?;

        let tasks = ids.into_iter().take(self.top_limit).map(|id| {
            let client = self.client.clone();
            async move {
                let url = format!("{HN_BASE}/item/{id}.json");
                let fetched = tokio::time::timeout(Duration::from_secs(5), async {
                    client.get(&url).send().await.ok()?.text().await.ok()
                })
                .await;
                match fetched {
                    Ok(Some(body)) => Some(body),
                    _ => {
                        tracing::debug!(id, "hn item fetch failed");
                        None
                    }
                }
            }
        });

        let bodies = join_all(tasks).await;
        let signals = bodies
            .into_iter()
            .flatten()
            .filter_map(|body| parse_hn_item(&body, self.min_score, &self.vocab))
            .collect();
        Ok(signals)
    }

    fn name(&self) -> &'static str {
        "hackernews"
    }
}

/* ----------------------------
GitHub
---------------------------- */

#[derive(Debug, Deserialize)]
struct GithubSearch {
    #[serde(default)]
    items: Vec<GithubRepo>,
}
#[derive(Debug, Deserialize)]
struct GithubRepo {
    #[serde(default)]
    name: String,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: i64,
    #[serde(default)]
    html_url: String,
}

pub struct GithubProvider {
    client: reqwest::Client,
    min_stars: i64,
    lookback_days: i64,
    vocab: KeywordVocab,
}

impl GithubProvider {
    pub fn new(cfg: &TrendingConfig, vocab: KeywordVocab) -> Self {
        Self {
            client: http_client(),
            min_stars: cfg.github_min_stars,
            lookback_days: cfg.github_lookback_days,
            vocab,
        }
    }
}

/// Parse a repository search result, keeping repos whose name/description
/// reads as AI/ML/tech tooling.
pub fn parse_github_search(json: &str, vocab: &KeywordVocab) -> Result<Vec<TrendingSignal>> {
    let search: GithubSearch = serde_json::from_str(json).context("github search json")?;
    let mut out = Vec::new();
    for repo in search.items {
        let description = repo.description.unwrap_or_default();
        let full_text = format!("{} {}", repo.name, description).to_lowercase();
        if !GITHUB_TECH_TERMS.iter().any(|kw| full_text.contains(kw)) {
            continue;
        }
        let desc_excerpt: String = description.chars().take(100).collect();
        out.push(TrendingSignal {
            source: "github".into(),
            keywords: extract_keywords(&format!("{} {}", repo.name, description), vocab),
            title: format!("{}: {}", repo.name, desc_excerpt),
            score: repo.stargazers_count,
            url: repo.html_url,
        });
    }
    Ok(out)
}

#[async_trait]
impl SignalProvider for GithubProvider {
    async fn fetch(&self) -> Result<Vec<TrendingSignal>> {
        let since = (Utc::now() - chrono::Duration::days(self.lookback_days))
            .format("%Y-%m-%d")
            .to_string();
        let query = format!("created:>{since} stars:>{}", self.min_stars);

        let body = self
            .client
            .get(GITHUB_SEARCH)
            .query(&[
                ("q", query.as_str()),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", "15"),
            ])
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await
            .context("github search get")?
            .text()
            .await
            .context("github search body")?;

        parse_github_search(&body, &self.vocab)
    }

    fn name(&self) -> &'static str {
        "github"
    }
}

/// The standard provider set in tie-break order: reddit, hackernews, github.
pub fn default_providers(cfg: &TrendingConfig) -> Vec<Box<dyn SignalProvider>> {
    let vocab = KeywordVocab::default();
    vec![
        Box::new(RedditProvider::new(cfg, vocab.clone())),
        Box::new(HackerNewsProvider::new(cfg, vocab.clone())),
        Box::new(GithubProvider::new(cfg, vocab)),
    ]
}
