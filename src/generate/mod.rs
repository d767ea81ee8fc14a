// src/generate/mod.rs
//! Article generation: turns a selected candidate into a full article with
//! SEO metadata and an image prompt. Every model step has a documented
//! fallback (original title, outline skeleton, summary-based content,
//! derived metadata, topic-keyed image prompt) so a degraded model never
//! aborts a run — at worst the output is plainer.

pub mod image;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::EventClassification;
use crate::config::SiteConfig;
use crate::ingest::types::CandidateItem;
use crate::llm::{strip_code_fence, ChatModel, ChatRequest, Outcome};

pub use image::FeaturedImage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleOption {
    pub title: String,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outline {
    pub h1: String,
    #[serde(default)]
    pub intro_hook: String,
    #[serde(default)]
    pub sections: Vec<OutlineSection>,
    #[serde(default)]
    pub faq: Vec<FaqEntry>,
    #[serde(default)]
    pub target_keywords: Vec<String>,
    #[serde(default)]
    pub meta_description_hint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineSection {
    pub h2: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    #[serde(default)]
    pub answer_preview: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeoMetadata {
    pub meta_title: String,
    pub meta_description: String,
    pub slug: String,
    pub image_alt: String,
    pub og_title: String,
    pub og_description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_reading_time")]
    pub reading_time_minutes: u32,
}

fn default_reading_time() -> u32 {
    5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptSource {
    Model,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePrompt {
    pub prompt: String,
    pub filename: String,
    pub alt_text: String,
    pub confidence: f32,
    pub source: PromptSource,
}

/// Complete generated article, ready for the publisher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedArticle {
    pub id: String,
    pub original_title: String,
    pub original_link: String,
    pub original_source: String,
    pub title: String,
    pub title_options: Vec<TitleOption>,
    pub outline: Outline,
    /// Markdown body.
    pub content: String,
    pub metadata: SeoMetadata,
    pub topic: String,
    pub event: Option<EventClassification>,
    pub generated_at: DateTime<Utc>,
    pub word_count: usize,
    pub image_prompt: ImagePrompt,
    pub featured_image: Option<FeaturedImage>,
}

/// ASCII slug: lowercase alphanumeric runs joined by hyphens.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_sep = false;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
            pending_sep = false;
        } else {
            pending_sep = true;
        }
    }
    out
}

fn count_words(s: &str) -> usize {
    s.split_whitespace().count()
}

/* ----------------------------
Step 1: SEO titles
---------------------------- */

async fn generate_titles(chat: &dyn ChatModel, item: &CandidateItem) -> Outcome<Vec<TitleOption>> {
    let topic = item
        .relevance
        .as_ref()
        .map(|r| r.primary_topic.as_str())
        .unwrap_or("Technology");
    let user = format!(
        r#"Generate 5 headline options that pass this test:
"Would someone type this EXACT phrase into Google?"

ORIGINAL TITLE: {title}
SUMMARY: {summary}
TOPIC: {topic}

RULES:
1. Lead with the product/company name (most important keyword first)
2. Use "now", "today", "just", "finally" for breaking news
3. Use conversational phrasing, NOT marketing buzzwords
4. 8-12 words max
5. Include the ACTUAL thing people will search for
6. Avoid: "revolutionary", "game-changing", "unlock", "transform", "power of"

Respond with a JSON array:
[
    {{"title": "Your Title Here", "score": 85, "keywords": ["key1", "key2"]}}
]

Rank by how likely someone would Google this exact phrase.
Only respond with the JSON array, no other text."#,
        title = item.title,
        summary = item.summary,
        topic = topic,
    );

    let fallback = vec![TitleOption {
        title: item.title.clone(),
        score: 50,
        keywords: Vec::new(),
    }];

    let req = ChatRequest {
        system: "You are an SEO expert and headline writer.",
        user: &user,
        temperature: 0.8,
        max_tokens: 1000,
    };
    let raw = match chat.complete(req).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = ?e, item = %item.id, "title generation failed; keeping original title");
            return Outcome::Fallback {
                value: fallback,
                reason: format!("model call failed: {e}"),
            };
        }
    };

    match serde_json::from_str::<Vec<TitleOption>>(strip_code_fence(&raw)) {
        Ok(mut titles) if !titles.is_empty() => {
            titles.sort_by(|a, b| b.score.cmp(&a.score));
            Outcome::Live(titles)
        }
        Ok(_) => Outcome::Fallback {
            value: fallback,
            reason: "model returned an empty title list".into(),
        },
        Err(e) => {
            tracing::warn!(error = ?e, item = %item.id, "title JSON malformed; keeping original title");
            Outcome::Fallback {
                value: fallback,
                reason: format!("malformed title JSON: {e}"),
            }
        }
    }
}

/* ----------------------------
Step 2: outline
---------------------------- */

fn outline_skeleton(item: &CandidateItem, title: &str) -> Outline {
    Outline {
        h1: title.to_string(),
        intro_hook: item.summary.chars().take(100).collect(),
        meta_description_hint: item.summary.chars().take(150).collect(),
        ..Outline::default()
    }
}

async fn generate_outline(
    chat: &dyn ChatModel,
    item: &CandidateItem,
    title: &str,
) -> Outcome<Outline> {
    let topic = item
        .relevance
        .as_ref()
        .map(|r| r.primary_topic.as_str())
        .unwrap_or("Technology");
    let user = format!(
        r#"Create a detailed blog outline for this article.

TITLE: {title}
TOPIC: {topic}
SOURCE SUMMARY: {summary}

Create an outline with a main title, 4-6 H2 sections with key points,
a 3-question FAQ, and target keywords. Optimize for featured snippets.

Respond with JSON:
{{
    "h1": "Main Title",
    "intro_hook": "Opening sentence to grab attention",
    "sections": [
        {{"h2": "Section Title", "key_points": ["point1", "point2", "point3"]}}
    ],
    "faq": [
        {{"question": "Q1?", "answer_preview": "Brief answer"}}
    ],
    "target_keywords": ["keyword1", "keyword2", "keyword3"],
    "meta_description_hint": "Key message for meta description"
}}

Only respond with JSON."#,
        title = title,
        topic = topic,
        summary = item.summary,
    );

    let req = ChatRequest {
        system: "You are a content strategist and SEO expert.",
        user: &user,
        temperature: 0.7,
        max_tokens: 1500,
    };
    let raw = match chat.complete(req).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = ?e, item = %item.id, "outline generation failed; using skeleton");
            return Outcome::Fallback {
                value: outline_skeleton(item, title),
                reason: format!("model call failed: {e}"),
            };
        }
    };

    match serde_json::from_str::<Outline>(strip_code_fence(&raw)) {
        Ok(outline) => Outcome::Live(outline),
        Err(e) => {
            tracing::warn!(error = ?e, item = %item.id, "outline JSON malformed; using skeleton");
            Outcome::Fallback {
                value: outline_skeleton(item, title),
                reason: format!("malformed outline JSON: {e}"),
            }
        }
    }
}

/* ----------------------------
Step 3: article body
---------------------------- */

async fn generate_content(
    chat: &dyn ChatModel,
    site: &SiteConfig,
    item: &CandidateItem,
    outline: &Outline,
    min_words: usize,
    max_words: usize,
) -> Outcome<String> {
    let sections_text: Vec<String> = outline
        .sections
        .iter()
        .map(|s| format!("- {}: {}", s.h2, s.key_points.join(", ")))
        .collect();
    let faq_text: Vec<String> = outline.faq.iter().map(|f| format!("- {}", f.question)).collect();

    let user = format!(
        r#"Write a complete, engaging blog article based on this outline.

TITLE: {h1}
INTRO HOOK: {hook}

SECTIONS TO COVER:
{sections}

FAQ TO INCLUDE:
{faq}

SOURCE INFORMATION:
{summary}
Source: {source}

REQUIREMENTS:
1. Write {min_words}-{max_words} words
2. Use conversational but professional tone
3. Include the H1 title at the start
4. Use H2 headers for each section
5. Include relevant examples and analogies
6. Add a compelling introduction and a strong conclusion
7. Include the FAQ section with full answers
8. Cite the source appropriately
9. Use markdown formatting

Write the complete article now:"#,
        h1 = outline.h1,
        hook = outline.intro_hook,
        sections = sections_text.join("\n"),
        faq = faq_text.join("\n"),
        summary = item.summary,
        source = item.source,
    );
    let system = format!(
        "You are a senior tech journalist writing for {}. Write engaging, informative content with proper structure.",
        site.name
    );

    let req = ChatRequest {
        system: &system,
        user: &user,
        temperature: 0.7,
        max_tokens: 4096,
    };
    match chat.complete(req).await {
        Ok(mut content) => {
            // Make sure the source citation is present.
            if !content.contains(item.source.as_str()) {
                content.push_str(&format!(
                    "\n\n---\n*Source: [{}]({})*",
                    item.source, item.link
                ));
            }
            Outcome::Live(content)
        }
        Err(e) => {
            tracing::warn!(error = ?e, item = %item.id, "content generation failed; using summary body");
            Outcome::Fallback {
                value: format!(
                    "# {}\n\n{}\n\n*Source: {}*",
                    outline.h1, item.summary, item.source
                ),
                reason: format!("model call failed: {e}"),
            }
        }
    }
}

/* ----------------------------
Step 4: SEO metadata
---------------------------- */

fn fallback_metadata(title: &str, content: &str) -> SeoMetadata {
    SeoMetadata {
        meta_title: title.chars().take(60).collect(),
        meta_description: content.chars().take(160).collect(),
        slug: slugify(title),
        image_alt: format!("Featured image for {title}"),
        og_title: title.to_string(),
        og_description: content.chars().take(200).collect(),
        keywords: Vec::new(),
        reading_time_minutes: 5,
    }
}

async fn generate_metadata(
    chat: &dyn ChatModel,
    item: &CandidateItem,
    title: &str,
    content: &str,
) -> Outcome<SeoMetadata> {
    let preview: String = content.chars().take(500).collect();
    let user = format!(
        r#"Generate SEO metadata for this blog article.

TITLE: {title}
CONTENT PREVIEW: {preview}...

Generate:
{{
    "meta_title": "SEO title (50-60 chars)",
    "meta_description": "Compelling description (150-160 chars)",
    "slug": "url-friendly-slug",
    "image_alt": "Descriptive alt text for featured image",
    "og_title": "Open Graph title",
    "og_description": "Open Graph description",
    "keywords": ["keyword1", "keyword2", "keyword3", "keyword4", "keyword5"],
    "reading_time_minutes": 5
}}

Only respond with JSON."#,
    );

    let req = ChatRequest {
        system: "You are an SEO specialist.",
        user: &user,
        temperature: 0.5,
        max_tokens: 500,
    };
    let raw = match chat.complete(req).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = ?e, item = %item.id, "metadata generation failed; deriving from title");
            return Outcome::Fallback {
                value: fallback_metadata(title, content),
                reason: format!("model call failed: {e}"),
            };
        }
    };

    match serde_json::from_str::<SeoMetadata>(strip_code_fence(&raw)) {
        Ok(mut meta) => {
            // Re-slugify whatever the model produced; the model's idea of
            // url-friendly is not always filesystem-friendly.
            meta.slug = if meta.slug.is_empty() {
                slugify(title)
            } else {
                slugify(&meta.slug)
            };
            Outcome::Live(meta)
        }
        Err(e) => {
            tracing::warn!(error = ?e, item = %item.id, "metadata JSON malformed; deriving from title");
            Outcome::Fallback {
                value: fallback_metadata(title, content),
                reason: format!("malformed metadata JSON: {e}"),
            }
        }
    }
}

/* ----------------------------
Step 5: image prompt
---------------------------- */

#[derive(Deserialize)]
struct ModelImagePrompt {
    prompt: String,
    filename: String,
    alt_text: String,
    #[serde(default)]
    confidence: f32,
}

const IMAGE_PROMPT_CONFIDENCE_FLOOR: f32 = 0.75;

/// Static photorealistic prompts per topic, used when the model is absent,
/// fails, or reports low confidence in its own prompt.
pub fn fallback_image_prompt(topic: &str, title: &str) -> ImagePrompt {
    let (prompt, filename, alt_text) = match topic {
        "AI" => (
            "Close-up of a developer's hands typing on a laptop in a quiet co-working space, code editor open on screen, soft window light, shallow depth of field, realistic candid photography, no stylization.",
            "ai-software-development",
            "Developer working on AI software in modern office",
        ),
        "Robotics" => (
            "Medium shot of a self-driving car paused at a city intersection, dashboard sensors visible, one calm passenger in the back seat, street lamps reflecting on wet asphalt, natural dusk lighting, photorealistic, no neon, no text.",
            "autonomous-vehicle-city",
            "Self-driving vehicle navigating urban intersection",
        ),
        "Tech Policy" => (
            "Wide shot of a modern corporate headquarters building exterior under overcast skies, employees entering the lobby, natural urban environment, documentary photography style, no dramatic lighting.",
            "tech-company-headquarters",
            "Technology company headquarters following regulatory announcement",
        ),
        _ => (
            "Medium shot of a modern open-plan tech office, employees collaborating at standing desks, large windows with natural light, plants and minimalist decor, authentic workplace photography, no staged poses.",
            "tech-office-workspace",
            "Modern technology company workspace",
        ),
    };

    let slug_title: String = slugify(title).chars().take(30).collect();
    ImagePrompt {
        prompt: prompt.to_string(),
        filename: format!("{filename}-{slug_title}"),
        alt_text: alt_text.to_string(),
        confidence: 0.6,
        source: PromptSource::Fallback,
    }
}

async fn generate_image_prompt(
    chat: &dyn ChatModel,
    item: &CandidateItem,
    title: &str,
    topic: &str,
) -> ImagePrompt {
    let summary: String = item.summary.chars().take(500).collect();
    let system = r#"You are an expert visual director for a tech news publication.
Generate PHOTOREALISTIC image prompts.

STRICT RULES:
- 1-2 sentences only
- No neon colors, no abstract circuit brains, no text overlays, no CGI look
- Prioritize realism, natural lighting, real-world materials
- Include human presence only if it naturally fits the story
- Specify framing (close-up / medium / wide)
- Mention lighting condition (window light, dusk, overcast, office LED, etc.)
- AVOID buzzwords like "futuristic", "cyberpunk", "AI glow", "holographic"

Output JSON only."#;
    let user = format!(
        r#"Generate a PHOTOREALISTIC image prompt for this article:

TITLE: {title}
TOPIC: {topic}
SUMMARY: {summary}

Respond with JSON:
{{
    "prompt": "1-2 sentence prompt",
    "filename": "lowercase-hyphenated-filename",
    "alt_text": "One sentence alt text with main keyword",
    "confidence": 0.8
}}

confidence is 0.0-1.0: how confident you are this prompt will produce a
good, unique image. Only respond with JSON."#,
    );

    let req = ChatRequest {
        system,
        user: &user,
        temperature: 0.7,
        max_tokens: 500,
    };
    let raw = match chat.complete(req).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = ?e, item = %item.id, "image prompt generation failed; using fallback prompt");
            return fallback_image_prompt(topic, title);
        }
    };

    match serde_json::from_str::<ModelImagePrompt>(strip_code_fence(&raw)) {
        Ok(parsed) if parsed.confidence >= IMAGE_PROMPT_CONFIDENCE_FLOOR => ImagePrompt {
            prompt: parsed.prompt,
            filename: slugify(&parsed.filename),
            alt_text: parsed.alt_text,
            confidence: parsed.confidence,
            source: PromptSource::Model,
        },
        Ok(parsed) => {
            tracing::info!(
                confidence = parsed.confidence,
                item = %item.id,
                "image prompt confidence below floor; using fallback prompt"
            );
            fallback_image_prompt(topic, title)
        }
        Err(e) => {
            tracing::warn!(error = ?e, item = %item.id, "image prompt JSON malformed; using fallback prompt");
            fallback_image_prompt(topic, title)
        }
    }
}

/* ----------------------------
Driver
---------------------------- */

/// Generate a complete article for one selected candidate.
pub async fn generate_article(
    chat: &dyn ChatModel,
    site: &SiteConfig,
    min_words: usize,
    max_words: usize,
    item: &CandidateItem,
) -> Result<GeneratedArticle> {
    tracing::info!(item = %item.id, title = %item.title, "generating article");

    let titles = generate_titles(chat, item).await.into_value();
    let selected_title = titles
        .first()
        .map(|t| t.title.clone())
        .unwrap_or_else(|| item.title.clone());

    let outline = generate_outline(chat, item, &selected_title).await.into_value();
    let content = generate_content(chat, site, item, &outline, min_words, max_words)
        .await
        .into_value();
    let metadata = generate_metadata(chat, item, &selected_title, &content)
        .await
        .into_value();

    let topic = item
        .relevance
        .as_ref()
        .map(|r| r.primary_topic.clone())
        .unwrap_or_else(|| "Technology".into());
    let image_prompt = generate_image_prompt(chat, item, &selected_title, &topic).await;

    let word_count = count_words(&content);
    tracing::info!(slug = %metadata.slug, words = word_count, "article generation complete");

    Ok(GeneratedArticle {
        id: item.id.clone(),
        original_title: item.title.clone(),
        original_link: item.link.clone(),
        original_source: item.source.clone(),
        title: selected_title,
        title_options: titles,
        outline,
        content,
        metadata,
        topic,
        event: item.event.clone(),
        generated_at: Utc::now(),
        word_count,
        image_prompt,
        featured_image: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::item_id;
    use crate::llm::MockChat;

    fn item(title: &str, summary: &str) -> CandidateItem {
        CandidateItem {
            id: item_id(title),
            title: title.into(),
            link: format!("https://example.test/{}", item_id(title)),
            summary: summary.into(),
            source: "TechCrunch".into(),
            source_category: "tech".into(),
            author: "TechCrunch".into(),
            published: None,
            relevance: None,
            event: None,
            viral: None,
        }
    }

    #[test]
    fn slugify_basics() {
        assert_eq!(slugify("OpenAI launches GPT-5!"), "openai-launches-gpt-5");
        assert_eq!(slugify("  spaced   out  "), "spaced-out");
        assert_eq!(slugify("Émoji ❤ stripped"), "moji-stripped");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn fallback_metadata_derives_from_title() {
        let meta = fallback_metadata("A Long Title About Things", "Body text goes here.");
        assert_eq!(meta.slug, "a-long-title-about-things");
        assert!(meta.meta_description.starts_with("Body text"));
        assert_eq!(meta.reading_time_minutes, 5);
    }

    #[test]
    fn fallback_image_prompt_is_topic_keyed() {
        let p = fallback_image_prompt("Robotics", "Waymo expands robotaxi service");
        assert_eq!(p.source, PromptSource::Fallback);
        assert!(p.filename.starts_with("autonomous-vehicle-city-"));
        let q = fallback_image_prompt("Gardening", "Unrelated");
        assert!(q.filename.starts_with("tech-office-workspace-"));
    }

    #[tokio::test]
    async fn full_generation_with_scripted_model() {
        let chat = MockChat::new([
            // titles
            r#"[{"title": "GPT-5 release date and features explained", "score": 90, "keywords": ["gpt-5"]},
                {"title": "Weaker option", "score": 40, "keywords": []}]"#,
            // outline
            r#"{"h1": "GPT-5 release date and features explained",
                "intro_hook": "It is here.",
                "sections": [{"h2": "What changed", "key_points": ["reasoning"]}],
                "faq": [{"question": "When?", "answer_preview": "Today"}],
                "target_keywords": ["gpt-5"],
                "meta_description_hint": "GPT-5 explained"}"#,
            // content
            "# GPT-5 release date and features explained\n\nBody. Source: TechCrunch.",
            // metadata
            r#"{"meta_title": "GPT-5 explained", "meta_description": "All about GPT-5",
                "slug": "Gpt 5 Explained!", "image_alt": "GPT-5", "og_title": "GPT-5",
                "og_description": "OG", "keywords": ["gpt-5"], "reading_time_minutes": 6}"#,
            // image prompt
            r#"{"prompt": "Close-up of a laptop", "filename": "gpt-5-laptop", "alt_text": "Laptop", "confidence": 0.9}"#,
        ]);
        let site = SiteConfig::default();
        let art = generate_article(&chat, &site, 1000, 1500, &item("OpenAI launches GPT-5", "New model"))
            .await
            .expect("generate");

        assert_eq!(art.title, "GPT-5 release date and features explained");
        assert_eq!(art.metadata.slug, "gpt-5-explained"); // re-slugified
        assert_eq!(art.image_prompt.source, PromptSource::Model);
        assert!(art.word_count > 0);
    }

    #[tokio::test]
    async fn failing_model_degrades_every_step() {
        let chat = MockChat::failing("api down");
        let site = SiteConfig::default();
        let art = generate_article(
            &chat,
            &site,
            1000,
            1500,
            &item("OpenAI launches GPT-5", "New model available today"),
        )
        .await
        .expect("generate still succeeds");

        // Original title kept, summary-based body, derived metadata.
        assert_eq!(art.title, "OpenAI launches GPT-5");
        assert!(art.content.contains("New model available today"));
        assert_eq!(art.metadata.slug, "openai-launches-gpt-5");
        assert_eq!(art.image_prompt.source, PromptSource::Fallback);
    }

    #[tokio::test]
    async fn low_confidence_image_prompt_uses_fallback() {
        let chat = MockChat::new([
            r#"[{"title": "T", "score": 80, "keywords": []}]"#,
            r#"{"h1": "T", "sections": [], "faq": []}"#,
            "# T\n\nBody. Source: TechCrunch.",
            r#"{"meta_title": "T", "meta_description": "D", "slug": "t", "image_alt": "A",
                "og_title": "T", "og_description": "D"}"#,
            r#"{"prompt": "meh", "filename": "meh", "alt_text": "meh", "confidence": 0.3}"#,
        ]);
        let site = SiteConfig::default();
        let art = generate_article(&chat, &site, 1000, 1500, &item("Some story", "Summary"))
            .await
            .expect("generate");
        assert_eq!(art.image_prompt.source, PromptSource::Fallback);
    }
}
