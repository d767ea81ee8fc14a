// src/pipeline.rs
//! Pipeline orchestrator: fetch -> relevance -> ledger pre-filter -> event
//! classification -> trending upgrade -> queue build -> generation ->
//! publish. Always returns a [`RunReport`]; stage errors are recorded in the
//! report, never propagated as panics past this boundary.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classify::{self, ClassifierConfig};
use crate::config::PipelineConfig;
use crate::generate::{self, image::placeholder_image, image::ImageModel, GeneratedArticle};
use crate::ingest::{self, types::FeedProvider};
use crate::llm::ChatModel;
use crate::publish::Publisher;
use crate::queue;
use crate::relevance;
use crate::trending::{self, sources::SignalProvider, KeywordVocab};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Generate but do not publish.
    pub dry_run: bool,
    /// External overall cap on items sent to generation; applied last.
    pub limit: Option<usize>,
    pub skip_images: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishedSummary {
    pub slug: String,
    pub title: String,
    pub event_type: String,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_seconds: f64,
    pub articles_fetched: usize,
    pub articles_relevant: usize,
    pub already_published_skipped: usize,
    pub urgent_count: usize,
    pub elevated_count: usize,
    pub routine_count: usize,
    pub articles_generated: usize,
    pub articles_published: usize,
    pub published: Vec<PublishedSummary>,
    pub errors: Vec<String>,
}

impl RunReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: None,
            duration_seconds: 0.0,
            articles_fetched: 0,
            articles_relevant: 0,
            already_published_skipped: 0,
            urgent_count: 0,
            elevated_count: 0,
            routine_count: 0,
            articles_generated: 0,
            articles_published: 0,
            published: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn finish(mut self) -> Self {
        let finished = Utc::now();
        self.duration_seconds = (finished - self.started_at)
            .num_milliseconds()
            .max(0) as f64
            / 1000.0;
        self.finished_at = Some(finished);
        self
    }
}

/// Everything the pipeline talks to, injectable for tests.
pub struct PipelineDeps {
    pub feeds: Vec<Box<dyn FeedProvider>>,
    pub signals: Vec<Box<dyn SignalProvider>>,
    pub chat: Option<Box<dyn ChatModel>>,
    pub images: Option<Box<dyn ImageModel>>,
    pub publisher: Publisher,
}

/// One full pipeline pass.
pub async fn run_pipeline(
    cfg: &PipelineConfig,
    mut deps: PipelineDeps,
    opts: &RunOptions,
) -> RunReport {
    let started_at = Utc::now();
    let mut report = RunReport::new(started_at);
    tracing::info!(%started_at, dry_run = opts.dry_run, "pipeline run starting");

    let timeout = Duration::from_secs(cfg.fetch_timeout_secs);
    let chat: Option<&dyn ChatModel> = deps.chat.as_deref();

    // Step 1: intake
    let items = ingest::fetch_and_process(&deps.feeds, &cfg.article, timeout).await;
    report.articles_fetched = items.len();
    if items.is_empty() {
        tracing::warn!("no articles fetched; ending run");
        report.errors.push("intake returned no articles".into());
        return report.finish();
    }

    // Step 2: topic relevance
    let relevant =
        relevance::classify_and_filter(chat, &cfg.topics, &cfg.article, items).await;
    report.articles_relevant = relevant.len();
    if relevant.is_empty() {
        tracing::info!("no relevant articles this run");
        return report.finish();
    }

    // Step 3: drop already-published items before classification is attempted
    let ledger = deps.publisher.ledger();
    let before = relevant.len();
    let mut fresh: Vec<_> = relevant
        .into_iter()
        .filter(|item| !ledger.contains(&item.id))
        .collect();
    report.already_published_skipped = before - fresh.len();
    if report.already_published_skipped > 0 {
        tracing::info!(
            skipped = report.already_published_skipped,
            "skipping already published articles"
        );
    }
    if fresh.is_empty() {
        tracing::info!("all relevant articles already published");
        return report.finish();
    }

    // Step 4: event classification
    let classifier_cfg = ClassifierConfig::default();
    for item in fresh.iter_mut() {
        let ec = classify::classify_item(&classifier_cfg, chat, &item.title, &item.summary).await;
        tracing::info!(
            event = ec.event_type.label(),
            priority = ec.priority,
            title = %item.title.chars().take(50).collect::<String>(),
            "classified"
        );
        item.event = Some(ec);
    }

    // Step 5: trending upgrade (weak signal, only promotes ROUTINE items)
    let signals = trending::collect_signals(&deps.signals, timeout).await;
    let vocab = KeywordVocab::default();
    trending::promote_viral(&mut fresh, &signals, &vocab, cfg.trending.min_overlap);

    // Step 6: queue build + selection
    let queues = queue::build_queues(fresh);
    report.urgent_count = queues.urgent.len();
    report.elevated_count = queues.elevated.len();
    report.routine_count = queues.routine.len();
    tracing::info!(
        urgent = report.urgent_count,
        elevated = report.elevated_count,
        routine = report.routine_count,
        "publishing queues built"
    );

    let to_process = queue::select_for_publishing(queues, &cfg.queues, opts.limit);
    if to_process.is_empty() {
        tracing::info!("nothing selected after queue filtering");
        return report.finish();
    }
    tracing::info!(count = to_process.len(), "processing selected articles");

    // Step 7: content generation
    let mut generated: Vec<GeneratedArticle> = Vec::new();
    for item in &to_process {
        let Some(model) = chat else {
            report
                .errors
                .push(format!("generation unavailable (no chat model): {}", item.id));
            continue;
        };
        match generate::generate_article(
            model,
            &cfg.site,
            cfg.article.min_words,
            cfg.article.max_words,
            item,
        )
        .await
        {
            Ok(mut article) => {
                article.featured_image = Some(
                    featured_image_for(&article, deps.images.as_deref(), cfg, opts).await,
                );
                generated.push(article);
            }
            Err(e) => {
                tracing::error!(error = ?e, id = %item.id, "article generation failed");
                report.errors.push(format!("generation failed: {}: {e}", item.id));
            }
        }
    }
    report.articles_generated = generated.len();
    if generated.is_empty() {
        tracing::warn!("no articles generated");
        return report.finish();
    }

    // Step 8: publish
    if opts.dry_run {
        tracing::info!("dry run: skipping publish step");
        for article in &generated {
            tracing::info!(slug = %article.metadata.slug, "would publish");
            report.published.push(summary_of(article));
        }
    } else {
        let published_count = deps.publisher.publish_all(&generated, &mut report.errors);
        report.articles_published = published_count;
        for article in &generated {
            report.published.push(summary_of(article));
        }
    }

    let report = report.finish();
    log_summary(&report);
    report
}

async fn featured_image_for(
    article: &GeneratedArticle,
    images: Option<&dyn ImageModel>,
    cfg: &PipelineConfig,
    opts: &RunOptions,
) -> generate::FeaturedImage {
    if opts.skip_images {
        return placeholder_image(&cfg.site.placeholder_asset);
    }
    let Some(model) = images else {
        return placeholder_image(&cfg.site.placeholder_asset);
    };
    match model
        .generate(&article.image_prompt.prompt, &article.metadata.slug)
        .await
    {
        Ok(image) => image,
        Err(e) => {
            tracing::warn!(error = ?e, slug = %article.metadata.slug, "image generation failed; using placeholder");
            placeholder_image(&cfg.site.placeholder_asset)
        }
    }
}

fn summary_of(article: &GeneratedArticle) -> PublishedSummary {
    PublishedSummary {
        slug: article.metadata.slug.clone(),
        title: article.title.clone(),
        event_type: article
            .event
            .as_ref()
            .map(|ec| ec.event_type.label().to_string())
            .unwrap_or_else(|| "UNKNOWN".into()),
    }
}

fn log_summary(report: &RunReport) {
    tracing::info!(
        fetched = report.articles_fetched,
        relevant = report.articles_relevant,
        urgent = report.urgent_count,
        elevated = report.elevated_count,
        routine = report.routine_count,
        generated = report.articles_generated,
        published = report.articles_published,
        errors = report.errors.len(),
        duration_s = report.duration_seconds,
        "pipeline run complete"
    );
    for article in &report.published {
        tracing::info!(event = %article.event_type, slug = %article.slug, title = %article.title, "published article");
    }
}
