//! News Radar — binary entrypoint.
//! One invocation is one full pipeline pass: fetch feeds, classify, queue,
//! generate, publish. Designed to run from cron/CI; the exit code is
//! non-zero only when nothing was published AND errors were recorded during
//! a non-dry run.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_radar::config::{PipelineConfig, DEFAULT_CONFIG_PATH};
use news_radar::generate::image::LeonardoImages;
use news_radar::ingest::providers::rss::RssFeedProvider;
use news_radar::ingest::types::FeedProvider;
use news_radar::llm::GroqChat;
use news_radar::pipeline::{run_pipeline, PipelineDeps, RunOptions};
use news_radar::publish::Publisher;
use news_radar::trending::sources;

#[derive(Debug, Parser)]
#[command(name = "news-radar", about = "Automated news pipeline")]
struct Cli {
    /// Generate but do not publish.
    #[arg(long)]
    dry_run: bool,

    /// Maximum total articles to process (applied after queue policy).
    #[arg(long)]
    limit: Option<usize>,

    /// Skip featured-image generation.
    #[arg(long)]
    skip_images: bool,

    /// Path to the pipeline TOML config.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    let cfg = match PipelineConfig::load_or_default(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = ?e, path = %cli.config, "failed to load config");
            return std::process::ExitCode::FAILURE;
        }
    };

    let http = reqwest::Client::builder()
        .user_agent("news-radar/0.1")
        .connect_timeout(std::time::Duration::from_secs(4))
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("reqwest client");

    let feeds: Vec<Box<dyn FeedProvider>> = cfg
        .feeds
        .iter()
        .map(|feed| {
            Box::new(RssFeedProvider::from_config(feed.clone(), http.clone()))
                as Box<dyn FeedProvider>
        })
        .collect();

    let assets_dir = std::path::PathBuf::from(&cfg.site.site_dir).join("assets");
    let deps = PipelineDeps {
        feeds,
        signals: sources::default_providers(&cfg.trending),
        chat: GroqChat::from_env(&cfg.chat)
            .map(|c| Box::new(c) as Box<dyn news_radar::llm::ChatModel>),
        images: LeonardoImages::from_env(&cfg.image, assets_dir)
            .map(|c| Box::new(c) as Box<dyn news_radar::generate::image::ImageModel>),
        publisher: Publisher::new(cfg.site.clone()),
    };

    let opts = RunOptions {
        dry_run: cli.dry_run,
        limit: cli.limit,
        skip_images: cli.skip_images,
    };

    let report = run_pipeline(&cfg, deps, &opts).await;

    // Exit-code policy for CI: failure only when a real run published
    // nothing and recorded at least one error.
    if !cli.dry_run && report.articles_published == 0 && !report.errors.is_empty() {
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}
