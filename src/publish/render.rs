// src/publish/render.rs
//! HTML rendering for published pages: the article page template, the index
//! post cards, and the markdown-to-HTML conversion they share.

use chrono::{DateTime, Datelike, Utc};
use pulldown_cmark::{html, Options, Parser};

use crate::config::SiteConfig;
use crate::generate::{image::placeholder_image, GeneratedArticle};

/// Markers the index updater looks for.
pub const INDEX_POSTS_MARKER: &str = r#"<div class="blog-posts">"#;

pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn format_date(ts: DateTime<Utc>) -> String {
    ts.format("%B %d, %Y").to_string()
}

/// Render a full standalone article page.
pub fn render_article_page(article: &GeneratedArticle, site: &SiteConfig) -> String {
    let meta = &article.metadata;
    let image = article
        .featured_image
        .clone()
        .unwrap_or_else(|| placeholder_image(&site.placeholder_asset));

    let content_html = markdown_to_html(&article.content);
    let meta_description: String = meta.meta_description.chars().take(160).collect();
    let og_description: String = meta.og_description.chars().take(200).collect();
    let published_date = article.generated_at.to_rfc3339();
    let formatted_date = format_date(article.generated_at);
    let year = Utc::now().year();

    format!(
        r#"<!DOCTYPE html>
<html dir="ltr" lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{meta_title} | {site_name}</title>
    <meta name="description" content="{meta_description}">
    <meta name="keywords" content="{keywords}">
    <meta name="author" content="{author}">

    <!-- Open Graph -->
    <meta property="og:title" content="{og_title}">
    <meta property="og:description" content="{og_description}">
    <meta property="og:image" content="{site_url}/{image_path}">
    <meta property="og:url" content="{site_url}/articles/{slug}.html">
    <meta property="og:type" content="article">

    <!-- Twitter Card -->
    <meta name="twitter:card" content="summary_large_image">
    <meta name="twitter:title" content="{og_title}">
    <meta name="twitter:description" content="{og_description}">
    <meta name="twitter:image" content="{site_url}/{image_path}">

    <link rel="canonical" href="{site_url}/articles/{slug}.html">
    <style>
        body {{ font-family: Roboto, Arial, sans-serif; line-height: 1.6; color: #333; }}
        .article-container {{ max-width: 800px; margin: 0 auto; padding: 20px; }}
        .article-title {{ font-size: 2em; color: #000; margin-bottom: 10px; }}
        .article-meta {{ color: #666; font-size: 0.9em; margin-bottom: 20px; }}
        .article-image {{ width: 100%; max-height: 400px; object-fit: cover; border-radius: 8px; margin-bottom: 20px; }}
        .article-content {{ font-size: 1.1em; }}
        .article-content h2 {{ color: #B51200; margin-top: 30px; }}
        .article-content blockquote {{ border-left: 4px solid #B51200; padding-left: 20px; margin: 20px 0; font-style: italic; }}
        .article-footer {{ margin-top: 40px; padding-top: 20px; border-top: 1px solid #eee; }}
        .back-link, .source-link {{ color: #B51200; }}
        @media (max-width: 600px) {{
            .article-title {{ font-size: 1.5em; }}
            .article-content {{ font-size: 1em; }}
        }}
    </style>

    <script type="application/ld+json">
    {{
        "@context": "https://schema.org",
        "@type": "BlogPosting",
        "mainEntityOfPage": {{ "@type": "WebPage", "@id": "{site_url}/articles/{slug}.html" }},
        "headline": "{title_attr}",
        "description": "{meta_description_attr}",
        "image": "{site_url}/{image_path}",
        "author": {{ "@type": "Organization", "name": "{author}" }},
        "publisher": {{ "@type": "Organization", "name": "{site_name}" }},
        "datePublished": "{published_date}",
        "dateModified": "{published_date}"
    }}
    </script>
</head>
<body>
    <main class="article-container">
        <article>
            <header class="article-header">
                <h1 class="article-title">{title}</h1>
                <div class="article-meta">
                    <span>{site_name}</span> &bull;
                    <span>{formatted_date}</span> &bull;
                    <span class="reading-time">{reading_time} min read</span>
                </div>
            </header>

            <img class="article-image" src="../{image_path}" alt="{image_alt}">

            <div class="article-content">
                {content_html}
            </div>

            <footer class="article-footer">
                <p><a href="../index.html" class="back-link">&larr; Back to Home</a></p>
                <p style="color: #666; font-size: 0.9em;">
                    Originally sourced from: <a href="{original_link}" class="source-link" target="_blank">{original_source}</a>
                </p>
            </footer>
        </article>
    </main>

    <footer style="background: #f5f5f5; padding: 20px; text-align: center; margin-top: 40px;">
        <p style="color: #666;">&copy; {year} {site_name}. All rights reserved.</p>
    </footer>
</body>
</html>"#,
        meta_title = escape_attr(&meta.meta_title),
        site_name = escape_attr(&site.name),
        meta_description = escape_attr(&meta_description),
        keywords = escape_attr(&meta.keywords.join(", ")),
        author = escape_attr(&site.author),
        og_title = escape_attr(&meta.og_title),
        og_description = escape_attr(&og_description),
        site_url = site.url,
        image_path = image.assets_path,
        slug = meta.slug,
        title = article.title,
        title_attr = escape_attr(&article.title),
        meta_description_attr = escape_attr(&meta_description),
        formatted_date = formatted_date,
        reading_time = meta.reading_time_minutes,
        image_alt = escape_attr(&meta.image_alt),
        content_html = content_html,
        original_link = article.original_link,
        original_source = escape_attr(&article.original_source),
        published_date = published_date,
        year = year,
    )
}

/// Strip markdown syntax for a plain-text snippet.
fn plain_snippet(markdown: &str, max_chars: usize) -> String {
    static RE_MD: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re = RE_MD.get_or_init(|| regex::Regex::new(r"[#*_`\[\]]").unwrap());
    let flat = re.replace_all(markdown, "").replace('\n', " ");
    let trimmed = flat.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max_chars).collect();
    // Break on the last word boundary.
    match cut.rsplit_once(' ') {
        Some((head, _)) => format!("{head}..."),
        None => format!("{cut}..."),
    }
}

/// Render one post card for the index page.
pub fn render_index_card(article: &GeneratedArticle, site: &SiteConfig) -> String {
    let slug = &article.metadata.slug;
    let image = article
        .featured_image
        .clone()
        .unwrap_or_else(|| placeholder_image(&site.placeholder_asset));
    let snippet = plain_snippet(&article.content, 150);
    let title_attr = escape_attr(&article.title);

    format!(
        r#"<div class="post-outer">
  <article class="post">
    <div class="img-thumbnail-wrap">
      <a href="articles/{slug}.html">
        <img alt="{title_attr}" style="width: 100%; height: 162px; object-fit: cover;" src="{image_path}" title="{title_attr}">
      </a>
    </div>
    <h2 class="post-title entry-title">
      <a href="articles/{slug}.html">{title}</a>
    </h2>
    <div class="post-body entry-content">
      <div class="post-snippet">
        {snippet}
        <a class="read-more-link" href="articles/{slug}.html" title="{title_attr}">Read more &raquo;</a>
      </div>
    </div>
  </article>
</div>"#,
        slug = slug,
        title_attr = title_attr,
        title = article.title,
        image_path = image.assets_path,
        snippet = snippet,
    )
}

/// Insert rendered cards right after the blog-posts marker. Returns `None`
/// when the marker is missing (index left untouched by the caller).
pub fn insert_into_index(index_html: &str, cards: &str) -> Option<String> {
    let (head, tail) = index_html.split_once(INDEX_POSTS_MARKER)?;
    Some(format!("{head}{INDEX_POSTS_MARKER}\n{cards}{tail}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{ImagePrompt, Outline, PromptSource, SeoMetadata};

    fn article() -> GeneratedArticle {
        GeneratedArticle {
            id: "abc123def456".into(),
            original_title: "OpenAI launches GPT-5".into(),
            original_link: "https://example.test/gpt5".into(),
            original_source: "TechCrunch".into(),
            title: "GPT-5 release date and features explained".into(),
            title_options: Vec::new(),
            outline: Outline::default(),
            content: "# GPT-5\n\nA **bold** body with [a link](https://x.test).".into(),
            metadata: SeoMetadata {
                meta_title: "GPT-5 explained".into(),
                meta_description: "All about GPT-5".into(),
                slug: "gpt-5-explained".into(),
                image_alt: "GPT-5 concept".into(),
                og_title: "GPT-5".into(),
                og_description: "OG description".into(),
                keywords: vec!["gpt-5".into(), "openai".into()],
                reading_time_minutes: 6,
            },
            topic: "AI".into(),
            event: None,
            generated_at: Utc::now(),
            word_count: 10,
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

    #[test]
    fn article_page_contains_expected_blocks() {
        let site = SiteConfig::default();
        let html = render_article_page(&article(), &site);
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("GPT-5 release date and features explained"));
        assert!(html.contains(r#"property="og:title""#));
        assert!(html.contains("articles/gpt-5-explained.html"));
        // markdown was converted
        assert!(html.contains("<strong>bold</strong>"));
        // placeholder image in use
        assert!(html.contains(&site.placeholder_asset));
    }

    #[test]
    fn index_card_snippet_has_no_markdown() {
        let site = SiteConfig::default();
        let card = render_index_card(&article(), &site);
        assert!(card.contains("gpt-5-explained.html"));
        assert!(!card.contains("**"));
        assert!(!card.contains('#'));
    }

    #[test]
    fn index_insertion_after_marker() {
        let index = format!(
            "<html><body>{}\n<div>old post</div></body></html>",
            INDEX_POSTS_MARKER
        );
        let updated = insert_into_index(&index, "<div>new post</div>").expect("marker present");
        let marker_pos = updated.find(INDEX_POSTS_MARKER).unwrap();
        let new_pos = updated.find("new post").unwrap();
        let old_pos = updated.find("old post").unwrap();
        assert!(marker_pos < new_pos && new_pos < old_pos);
    }

    #[test]
    fn index_insertion_without_marker_is_none() {
        assert!(insert_into_index("<html><body></body></html>", "x").is_none());
    }
}
