//! Renders the top articles as a self-contained HTML page.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::article::DigestEntry;

const STYLE: &str = "body{font-family:Arial,sans-serif;max-width:760px;margin:0 auto;padding:16px;color:#222}\
h1{font-size:22px}.article{border-bottom:1px solid #ddd;padding:12px 0}\
.meta{color:#666;font-size:13px}.score{color:#0a6;font-size:12px}\
.summary{margin-top:6px;line-height:1.45}";

/// `{dir}/digest_{YYYY-MM-DD}.html`
pub fn digest_html_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("digest_{}.html", date.format("%Y-%m-%d")))
}

/// Render the digest. Every article field is HTML-escaped.
pub fn render_digest_html(entries: &[DigestEntry], date: NaiveDate) -> String {
    let day = date.format("%Y-%m-%d");
    let mut out = String::with_capacity(1024 + entries.len() * 512);
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>News digest {day}</title>\n<style>{STYLE}</style>\n"));
    out.push_str("</head>\n<body>\n");
    out.push_str(&format!("<h1>Top articles for {day}</h1>\n"));

    if entries.is_empty() {
        out.push_str("<p>No relevant articles found.</p>\n");
    }

    for (i, e) in entries.iter().enumerate() {
        let a = &e.ranked.article;
        out.push_str("<div class=\"article\">\n");
        out.push_str(&format!(
            "<h2>{}. <a href=\"{}\">{}</a></h2>\n",
            i + 1,
            encode_double_quoted_attribute(&a.url),
            encode_text(&a.title)
        ));
        out.push_str(&format!(
            "<div class=\"meta\">{} &middot; {}</div>\n",
            encode_text(&a.source),
            encode_text(&a.published_at)
        ));
        out.push_str(&format!(
            "<div class=\"score\">relevance {:.3}</div>\n",
            e.ranked.relevance_score
        ));
        out.push_str(&format!(
            "<p class=\"summary\">{}</p>\n",
            encode_text(&e.summary)
        ));
        out.push_str("</div>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

/// Write the rendered digest to `{dir}/digest_{date}.html`, creating `dir`.
pub fn export_standalone_html(entries: &[DigestEntry], dir: &Path, date: NaiveDate) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = digest_html_path(dir, date);
    let html = render_digest_html(entries, date);
    fs::write(&path, html).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(target: "digest", path = %path.display(), articles = entries.len(), "exported HTML digest");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{CanonicalArticle, RankedArticle};

    fn entry(title: &str, url: &str, summary: &str) -> DigestEntry {
        let article = CanonicalArticle {
            source: "Src".into(),
            title: title.into(),
            url: url.into(),
            ..Default::default()
        };
        DigestEntry {
            ranked: RankedArticle {
                combined_text: article.combined_text(),
                article,
                relevance_score: 0.25,
            },
            summary: summary.into(),
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
    }

    #[test]
    fn escapes_untrusted_fields() {
        let html = render_digest_html(
            &[entry("<script>x</script>", "https://a/?q=\"1\"", "A & B")],
            day(),
        );
        assert!(!html.contains("<script>x"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("A &amp; B"));
        assert!(html.contains("&quot;1&quot;"));
    }

    #[test]
    fn empty_digest_still_renders() {
        let html = render_digest_html(&[], day());
        assert!(html.contains("Top articles for 2025-03-04"));
        assert!(html.contains("No relevant articles found."));
    }

    #[test]
    fn export_writes_dated_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("out");
        let path = export_standalone_html(&[entry("t", "https://u", "s")], &dir, day()).unwrap();
        assert_eq!(path, dir.join("digest_2025-03-04.html"));
        let body = std::fs::read_to_string(path).unwrap();
        assert!(body.contains("1. <a href=\"https://u\">t</a>"));
    }
}
