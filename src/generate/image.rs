// src/generate/image.rs
//! Featured-image generation: start a job on a Leonardo-style REST API,
//! poll it to completion, download the result into the site assets. Every
//! failure path degrades to the placeholder asset; image trouble never
//! fails an article.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::ImageConfig;

const LEONARDO_API_BASE: &str = "https://cloud.leonardo.ai/api/rest/v1";

/// Outcome of image generation as carried on the article. `generated` is
/// false when the placeholder is in use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturedImage {
    pub generated: bool,
    pub prompt: String,
    pub url: String,
    pub filename: String,
    /// Path relative to the site root, used in page templates.
    pub assets_path: String,
}

/// Placeholder result used when generation is skipped or fails.
pub fn placeholder_image(placeholder_asset: &str) -> FeaturedImage {
    FeaturedImage {
        generated: false,
        prompt: String::new(),
        url: String::new(),
        filename: String::new(),
        assets_path: placeholder_asset.to_string(),
    }
}

#[async_trait]
pub trait ImageModel: Send + Sync {
    /// Generate an image for `prompt` and store it as `<slug>.png` in the
    /// site assets. Errors are for the caller to degrade on.
    async fn generate(&self, prompt: &str, slug: &str) -> Result<FeaturedImage>;
    fn name(&self) -> &'static str;
}

pub struct LeonardoImages {
    http: reqwest::Client,
    api_key: String,
    cfg: ImageConfig,
    assets_dir: PathBuf,
}

#[derive(Deserialize)]
struct CreateResp {
    #[serde(rename = "sdGenerationJob")]
    job: Option<CreateJob>,
}
#[derive(Deserialize)]
struct CreateJob {
    #[serde(rename = "generationId")]
    generation_id: String,
}

#[derive(Deserialize)]
struct StatusResp {
    #[serde(rename = "generations_by_pk")]
    generation: Option<Generation>,
}
#[derive(Deserialize)]
struct Generation {
    status: String,
    #[serde(default)]
    generated_images: Vec<GeneratedImageRef>,
}
#[derive(Deserialize)]
struct GeneratedImageRef {
    url: String,
}

impl LeonardoImages {
    pub fn new(api_key: String, cfg: ImageConfig, assets_dir: impl Into<PathBuf>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("news-radar/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            cfg,
            assets_dir: assets_dir.into(),
        }
    }

    /// Build from the environment; `None` when no API key is configured.
    pub fn from_env(cfg: &ImageConfig, assets_dir: impl Into<PathBuf>) -> Option<Self> {
        let key = std::env::var(crate::config::ENV_IMAGE_API_KEY).unwrap_or_default();
        if key.trim().is_empty() {
            tracing::warn!(
                "{} not set; image generation disabled",
                crate::config::ENV_IMAGE_API_KEY
            );
            return None;
        }
        Some(Self::new(key, cfg.clone(), assets_dir))
    }

    async fn create_generation(&self, prompt: &str) -> Result<String> {
        let payload = json!({
            "prompt": prompt,
            "modelId": self.cfg.model_id,
            "width": self.cfg.width,
            "height": self.cfg.height,
            "num_images": self.cfg.num_images,
            "promptMagic": true,
            "public": false,
        });

        let resp = self
            .http
            .post(format!("{LEONARDO_API_BASE}/generations"))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("image generation create")?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("image generation create returned status {status}");
        }
        let body: CreateResp = resp.json().await.context("image generation create body")?;
        body.job
            .map(|j| j.generation_id)
            .ok_or_else(|| anyhow::anyhow!("image generation create returned no job id"))
    }

    async fn wait_for_generation(&self, generation_id: &str) -> Result<String> {
        let url = format!("{LEONARDO_API_BASE}/generations/{generation_id}");
        let deadline = tokio::time::Instant::now() + Duration::from_secs(self.cfg.max_wait_secs);

        while tokio::time::Instant::now() < deadline {
            let body: StatusResp = self
                .http
                .get(&url)
                .bearer_auth(&self.api_key)
                .send()
                .await
                .context("image generation status")?
                .json()
                .await
                .context("image generation status body")?;

            if let Some(generation) = body.generation {
                match generation.status.as_str() {
                    "COMPLETE" => {
                        return generation
                            .generated_images
                            .first()
                            .map(|img| img.url.clone())
                            .ok_or_else(|| anyhow::anyhow!("generation complete but no images"));
                    }
                    "FAILED" => anyhow::bail!("image generation failed"),
                    _ => {} // still processing
                }
            }
            tokio::time::sleep(Duration::from_secs(self.cfg.poll_interval_secs)).await;
        }
        anyhow::bail!("image generation timed out after {}s", self.cfg.max_wait_secs)
    }

    async fn download(&self, url: &str, filename: &str) -> Result<PathBuf> {
        let bytes = self
            .http
            .get(url)
            .send()
            .await
            .context("image download")?
            .bytes()
            .await
            .context("image download body")?;

        std::fs::create_dir_all(&self.assets_dir)
            .with_context(|| format!("creating {}", self.assets_dir.display()))?;
        let path = self.assets_dir.join(filename);
        write_atomic(&path, &bytes)?;
        tracing::info!(path = %path.display(), "image saved");
        Ok(path)
    }
}

#[async_trait]
impl ImageModel for LeonardoImages {
    async fn generate(&self, prompt: &str, slug: &str) -> Result<FeaturedImage> {
        let generation_id = self.create_generation(prompt).await?;
        tracing::info!(%generation_id, "image generation started");

        let image_url = self.wait_for_generation(&generation_id).await?;
        let filename = format!("{slug}.png");
        self.download(&image_url, &filename).await?;

        Ok(FeaturedImage {
            generated: true,
            prompt: prompt.to_string(),
            url: image_url,
            assets_path: format!("assets/{filename}"),
            filename,
        })
    }

    fn name(&self) -> &'static str {
        "leonardo"
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("png.tmp");
    std::fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("renaming into {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_not_generated() {
        let p = placeholder_image("assets/placeholder.png");
        assert!(!p.generated);
        assert_eq!(p.assets_path, "assets/placeholder.png");
    }

    #[test]
    fn create_response_shapes_parse() {
        let ok = r#"{"sdGenerationJob": {"generationId": "abc-123"}}"#;
        let parsed: CreateResp = serde_json::from_str(ok).unwrap();
        assert_eq!(parsed.job.unwrap().generation_id, "abc-123");

        let empty = r#"{}"#;
        let parsed: CreateResp = serde_json::from_str(empty).unwrap();
        assert!(parsed.job.is_none());
    }

    #[test]
    fn status_response_shapes_parse() {
        let done = r#"{"generations_by_pk": {"status": "COMPLETE", "generated_images": [{"url": "https://cdn.test/i.png"}]}}"#;
        let parsed: StatusResp = serde_json::from_str(done).unwrap();
        let generation = parsed.generation.unwrap();
        assert_eq!(generation.status, "COMPLETE");
        assert_eq!(generation.generated_images[0].url, "https://cdn.test/i.png");
    }
}
