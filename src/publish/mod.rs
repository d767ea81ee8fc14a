// src/publish/mod.rs
//! Static site publisher. Writes article pages, keeps the append-only
//! ledger, and regenerates the index insertion and sitemap. The ledger id
//! check makes publishing idempotent: the same source article can flow in
//! from any number of runs and produce exactly one page.

pub mod ledger;
pub mod render;
pub mod sitemap;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::SiteConfig;
use crate::generate::GeneratedArticle;
use crate::publish::ledger::{Ledger, LedgerEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// The ledger already holds this id; nothing was written.
    AlreadyPublished,
}

pub struct Publisher {
    site_dir: PathBuf,
    site: SiteConfig,
    ledger: Ledger,
}

impl Publisher {
    /// Standard layout: pages under `<site_dir>/articles/`, ledger at
    /// `<data_dir>/articles.json`.
    pub fn new(site: SiteConfig) -> Self {
        let ledger_path = PathBuf::from(&site.data_dir).join("articles.json");
        Self {
            site_dir: PathBuf::from(&site.site_dir),
            ledger: Ledger::load(ledger_path),
            site,
        }
    }

    /// Test/alternate-layout constructor with explicit paths.
    pub fn with_paths(site: SiteConfig, site_dir: impl Into<PathBuf>, ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            site_dir: site_dir.into(),
            ledger: Ledger::load(ledger_path.into()),
            site,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    fn articles_dir(&self) -> PathBuf {
        self.site_dir.join("articles")
    }

    /// Publish one article: ledger check, page write, ledger append.
    pub fn publish(&mut self, article: &GeneratedArticle) -> Result<PublishOutcome> {
        if self.ledger.contains(&article.id) {
            tracing::warn!(id = %article.id, slug = %article.metadata.slug, "already published; skipping");
            return Ok(PublishOutcome::AlreadyPublished);
        }

        let html = render::render_article_page(article, &self.site);
        let dir = self.articles_dir();
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(format!("{}.html", article.metadata.slug));
        fs::write(&path, html).with_context(|| format!("writing {}", path.display()))?;

        self.ledger.record(LedgerEntry {
            id: article.id.clone(),
            title: article.title.clone(),
            slug: article.metadata.slug.clone(),
            original_link: article.original_link.clone(),
            original_source: article.original_source.clone(),
            topic: article.topic.clone(),
            generated_at: article.generated_at.to_rfc3339(),
            word_count: article.word_count,
        })?;

        tracing::info!(path = %path.display(), "article published");
        Ok(PublishOutcome::Published)
    }

    /// Publish a batch, then refresh the index and sitemap once. Returns the
    /// publish count; per-article failures are collected into `errors`.
    pub fn publish_all(
        &mut self,
        articles: &[GeneratedArticle],
        errors: &mut Vec<String>,
    ) -> usize {
        let mut published = Vec::new();
        for article in articles {
            match self.publish(article) {
                Ok(PublishOutcome::Published) => published.push(article),
                Ok(PublishOutcome::AlreadyPublished) => {}
                Err(e) => {
                    tracing::error!(error = ?e, id = %article.id, "publish failed");
                    errors.push(format!("publish failed: {}: {e}", article.id));
                }
            }
        }

        if !published.is_empty() {
            if let Err(e) = self.update_index(&published) {
                tracing::warn!(error = ?e, "index update failed");
                errors.push(format!("index update failed: {e}"));
            }
            if let Err(e) = self.update_sitemap() {
                tracing::warn!(error = ?e, "sitemap update failed");
                errors.push(format!("sitemap update failed: {e}"));
            }
        }

        published.len()
    }

    fn update_index(&self, published: &[&GeneratedArticle]) -> Result<()> {
        let index_path = self.site_dir.join("index.html");
        let current = match fs::read_to_string(&index_path) {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(error = ?e, path = %index_path.display(), "index not readable; leaving it untouched");
                return Ok(());
            }
        };

        let cards: Vec<String> = published
            .iter()
            .map(|a| render::render_index_card(a, &self.site))
            .collect();

        match render::insert_into_index(&current, &cards.join("\n")) {
            Some(updated) => {
                fs::write(&index_path, updated)
                    .with_context(|| format!("writing {}", index_path.display()))?;
                tracing::info!(count = published.len(), "index updated");
                Ok(())
            }
            None => {
                tracing::warn!("index marker not found; index left untouched");
                Ok(())
            }
        }
    }

    fn update_sitemap(&self) -> Result<()> {
        let xml = sitemap::build_sitemap(&self.site.url, self.ledger.entries());
        let path = self.site_dir.join("sitemap.xml");
        fs::create_dir_all(&self.site_dir)
            .with_context(|| format!("creating {}", self.site_dir.display()))?;
        fs::write(&path, xml).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(urls = self.ledger.len() + 4, "sitemap updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{ImagePrompt, Outline, PromptSource, SeoMetadata};
    use chrono::Utc;

    fn article(id: &str, slug: &str) -> GeneratedArticle {
        GeneratedArticle {
            id: id.into(),
            original_title: "Original".into(),
            original_link: "https://example.test/src".into(),
            original_source: "Test".into(),
            title: format!("Title for {slug}"),
            title_options: Vec::new(),
            outline: Outline::default(),
            content: "# Heading\n\nBody.".into(),
            metadata: SeoMetadata {
                meta_title: "T".into(),
                meta_description: "D".into(),
                slug: slug.into(),
                image_alt: "A".into(),
                og_title: "T".into(),
                og_description: "D".into(),
                keywords: Vec::new(),
                reading_time_minutes: 5,
            },
            topic: "AI".into(),
            event: None,
            generated_at: Utc::now(),
            word_count: 2,
            image_prompt: ImagePrompt {
                prompt: String::new(),
                filename: String::new(),
                alt_text: String::new(),
                confidence: 0.6,
                source: PromptSource::Fallback,
            },
            featured_image: None,
        }
    }

    fn publisher(dir: &std::path::Path) -> Publisher {
        Publisher::with_paths(
            SiteConfig::default(),
            dir.join("site"),
            dir.join("data/articles.json"),
        )
    }

    #[test]
    fn publish_writes_page_and_ledger() {
        let tmp = tempfile::tempdir().unwrap();
        let mut p = publisher(tmp.path());

        let out = p.publish(&article("id-1", "first-post")).unwrap();
        assert_eq!(out, PublishOutcome::Published);
        assert!(tmp.path().join("site/articles/first-post.html").exists());
        assert!(p.ledger().contains("id-1"));
    }

    #[test]
    fn second_publish_of_same_id_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let mut p = publisher(tmp.path());

        assert_eq!(p.publish(&article("id-1", "first-post")).unwrap(), PublishOutcome::Published);
        // Same id, different slug: still refused, no second file.
        assert_eq!(
            p.publish(&article("id-1", "retitled-post")).unwrap(),
            PublishOutcome::AlreadyPublished
        );
        assert!(!tmp.path().join("site/articles/retitled-post.html").exists());
        assert_eq!(p.ledger().len(), 1);
    }

    #[test]
    fn publish_all_updates_sitemap_and_tolerates_missing_index() {
        let tmp = tempfile::tempdir().unwrap();
        let mut p = publisher(tmp.path());
        let mut errors = Vec::new();

        let n = p.publish_all(&[article("id-1", "a"), article("id-2", "b")], &mut errors);
        assert_eq!(n, 2);
        // Missing index.html is tolerated (logged, not an error).
        assert!(errors.is_empty(), "errors: {errors:?}");
        let sitemap = std::fs::read_to_string(tmp.path().join("site/sitemap.xml")).unwrap();
        assert!(sitemap.contains("articles/a.html"));
        assert!(sitemap.contains("articles/b.html"));
    }

    #[test]
    fn publish_all_updates_existing_index() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("site")).unwrap();
        std::fs::write(
            tmp.path().join("site/index.html"),
            format!("<html><body>{}\n</body></html>", render::INDEX_POSTS_MARKER),
        )
        .unwrap();

        let mut p = publisher(tmp.path());
        let mut errors = Vec::new();
        p.publish_all(&[article("id-1", "a")], &mut errors);
        assert!(errors.is_empty());

        let index = std::fs::read_to_string(tmp.path().join("site/index.html")).unwrap();
        assert!(index.contains("articles/a.html"));
    }
}
