// src/publish/sitemap.rs
//! Sitemap generation: rebuilt whole from the ledger after each publish.

use chrono::{DateTime, Utc};

use crate::publish::ledger::LedgerEntry;

const TRUST_PAGES: [&str; 3] = ["about.html", "privacy.html", "editorial-policy.html"];

fn lastmod_from_iso(generated_at: &str) -> String {
    DateTime::parse_from_rfc3339(generated_at)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
        .format("%Y-%m-%d")
        .to_string()
}

/// Build sitemap.xml content: homepage, one entry per ledgered article,
/// then the static trust pages.
pub fn build_sitemap(site_url: &str, entries: &[LedgerEntry]) -> String {
    let mut xml = Vec::with_capacity(entries.len() * 6 + 16);
    xml.push(r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string());
    xml.push(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#.to_string());

    xml.push("  <url>".to_string());
    xml.push(format!("    <loc>{site_url}/</loc>"));
    xml.push("    <changefreq>hourly</changefreq>".to_string());
    xml.push("    <priority>1.0</priority>".to_string());
    xml.push("  </url>".to_string());

    for entry in entries {
        let lastmod = lastmod_from_iso(&entry.generated_at);
        xml.push("  <url>".to_string());
        xml.push(format!("    <loc>{site_url}/articles/{}.html</loc>", entry.slug));
        xml.push(format!("    <lastmod>{lastmod}</lastmod>"));
        xml.push("    <changefreq>weekly</changefreq>".to_string());
        xml.push("    <priority>0.8</priority>".to_string());
        xml.push("  </url>".to_string());
    }

    for page in TRUST_PAGES {
        xml.push("  <url>".to_string());
        xml.push(format!("    <loc>{site_url}/{page}</loc>"));
        xml.push("    <changefreq>monthly</changefreq>".to_string());
        xml.push("    <priority>0.4</priority>".to_string());
        xml.push("  </url>".to_string());
    }

    xml.push("</urlset>".to_string());
    xml.join("\n")
}
