// src/config.rs
//! Pipeline configuration: feed list, topic tables, queue caps, trending
//! thresholds, and site identity. Loaded once at startup from TOML (+ env
//! for secrets) and passed explicitly into each stage — no ambient globals.

use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

pub const ENV_CHAT_API_KEY: &str = "GROQ_API_KEY";
pub const ENV_IMAGE_API_KEY: &str = "LEONARDO_API_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicCategory {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArticleConfig {
    pub min_words: usize,
    pub max_words: usize,
    /// 0-100 scale; items scoring below are filtered out.
    pub min_relevance_score: u32,
    pub hours_lookback: i64,
    pub summary_max_chars: usize,
}

impl Default for ArticleConfig {
    fn default() -> Self {
        Self {
            min_words: 1000,
            max_words: 1500,
            min_relevance_score: 70,
            hours_lookback: 24,
            summary_max_chars: 500,
        }
    }
}

/// Per-queue publishing caps. Urgent is a safety cap ("publish all breaking
/// news, bounded"), elevated a batch cap, routine a trickle.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct QueueCaps {
    pub urgent: usize,
    pub elevated: usize,
    pub routine: usize,
}

impl Default for QueueCaps {
    fn default() -> Self {
        Self {
            urgent: 5,
            elevated: 3,
            routine: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrendingConfig {
    pub subreddits: Vec<String>,
    pub reddit_min_score: i64,
    pub hn_min_score: i64,
    pub hn_top_limit: usize,
    pub github_min_stars: i64,
    pub github_lookback_days: i64,
    /// Minimum keyword overlap for a candidate to match a signal.
    pub min_overlap: usize,
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            subreddits: vec![
                "technology".into(),
                "artificial".into(),
                "MachineLearning".into(),
                "programming".into(),
            ],
            reddit_min_score: 100,
            hn_min_score: 50,
            hn_top_limit: 20,
            github_min_stars: 50,
            github_lookback_days: 60,
            min_overlap: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub url: String,
    pub author: String,
    pub site_dir: String,
    pub data_dir: String,
    /// Relative asset path used when image generation is skipped or fails.
    pub placeholder_asset: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Global Digital Times".into(),
            url: "https://globaldigitaltimes.example.com".into(),
            author: "Global Digital Times".into(),
            site_dir: "site".into(),
            data_dir: "data".into(),
            placeholder_asset: "assets/placeholder.png".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "llama-3.3-70b-versatile".into(),
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub model_id: String,
    /// Must be multiples of 8; close to 16:9 for OG images.
    pub width: u32,
    pub height: u32,
    pub num_images: u32,
    pub max_wait_secs: u64,
    pub poll_interval_secs: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            model_id: "de7d3faf-762f-48e0-b3b7-9d0ac3a3fcf3".into(),
            width: 1472,
            height: 832,
            num_images: 1,
            max_wait_secs: 120,
            poll_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub feeds: Vec<FeedConfig>,
    pub topics: Vec<TopicCategory>,
    pub article: ArticleConfig,
    pub queues: QueueCaps,
    pub trending: TrendingConfig,
    pub site: SiteConfig,
    pub chat: ChatConfig,
    pub image: ImageConfig,
    /// Per-external-call timeout in seconds (feeds, trending, model calls).
    pub fetch_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            topics: default_topics(),
            article: ArticleConfig::default(),
            queues: QueueCaps::default(),
            trending: TrendingConfig::default(),
            site: SiteConfig::default(),
            chat: ChatConfig::default(),
            image: ImageConfig::default(),
            fetch_timeout_secs: 10,
        }
    }
}

impl PipelineConfig {
    /// Load from a TOML file; any missing section falls back to its default.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            anyhow::anyhow!(
                "failed to read pipeline config at {}: {}",
                path.as_ref().display(),
                e
            )
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let cfg: PipelineConfig = toml::from_str(toml_str)?;
        Ok(cfg)
    }

    /// Load from the given path, or fall back to built-in defaults when the
    /// file does not exist (first run, tests).
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

fn default_feeds() -> Vec<FeedConfig> {
    [
        ("BBC Technology", "http://feeds.bbci.co.uk/news/technology/rss.xml", "tech"),
        ("TechCrunch", "https://techcrunch.com/feed/", "tech"),
        ("Wired", "https://www.wired.com/feed/rss", "tech"),
        ("MIT Technology Review", "https://www.technologyreview.com/feed/", "ai"),
        ("The Verge", "https://www.theverge.com/rss/index.xml", "tech"),
        ("Ars Technica", "https://feeds.arstechnica.com/arstechnica/index", "tech"),
    ]
    .into_iter()
    .map(|(name, url, category)| FeedConfig {
        name: name.into(),
        url: url.into(),
        category: category.into(),
    })
    .collect()
}

fn default_topics() -> Vec<TopicCategory> {
    vec![
        TopicCategory {
            name: "AI".into(),
            keywords: [
                "artificial intelligence",
                "ai",
                "machine learning",
                "deep learning",
                "neural network",
                "openai",
                "chatgpt",
                "gpt",
                "llm",
                "large language model",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        },
        TopicCategory {
            name: "Robotics".into(),
            keywords: ["robotics", "automation", "robot", "autonomous"]
                .into_iter()
                .map(String::from)
                .collect(),
        },
        TopicCategory {
            name: "Tech Policy".into(),
            keywords: ["policy", "regulation", "law", "government", "privacy", "antitrust"]
                .into_iter()
                .map(String::from)
                .collect(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_expected_caps() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.queues.urgent, 5);
        assert_eq!(cfg.queues.elevated, 3);
        assert_eq!(cfg.queues.routine, 1);
        assert_eq!(cfg.article.min_relevance_score, 70);
        assert_eq!(cfg.trending.min_overlap, 2);
        assert_eq!(cfg.feeds.len(), 6);
    }

    #[test]
    fn partial_toml_keeps_defaults_elsewhere() {
        let toml_str = r#"
[queues]
urgent = 2

[[feeds]]
name = "Example"
url = "https://example.test/rss"
category = "tech"
"#;
        let cfg = PipelineConfig::from_toml_str(toml_str).expect("parse");
        assert_eq!(cfg.queues.urgent, 2);
        // untouched sections keep their defaults
        assert_eq!(cfg.queues.elevated, 3);
        assert_eq!(cfg.feeds.len(), 1);
        assert_eq!(cfg.feeds[0].name, "Example");
        assert_eq!(cfg.article.hours_lookback, 24);
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(PipelineConfig::from_toml_str("queues = 3").is_err());
    }
}
