//! CSV archive of each run: the full canonical dataset and the digest entries.
//!
//! Files carry a leading row-index column. Timestamps are RFC 3339 with full
//! sub-second precision, empty for `None`, so [`read_canonical_csv`] gives
//! back exactly what was written.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::article::{CanonicalArticle, DigestEntry};
use crate::ingest::types::FetchOrigin;

#[derive(Debug, Serialize, Deserialize)]
struct CanonicalRow {
    index: usize,
    source: String,
    title: String,
    url: String,
    published_at: String,
    description: String,
    content: String,
    fetched_from: String,
    published_at_parsed: String,
}

#[derive(Debug, Serialize)]
struct DigestRow<'a> {
    index: usize,
    source: &'a str,
    title: &'a str,
    url: &'a str,
    published_at: &'a str,
    description: &'a str,
    content: &'a str,
    fetched_from: &'static str,
    published_at_parsed: String,
    combined_text: &'a str,
    relevance_score: f32,
    summary: &'a str,
}

fn fmt_ts(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        .unwrap_or_default()
}

fn parse_ts(raw: &str, row: usize) -> Result<Option<DateTime<Utc>>> {
    if raw.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| Some(t.with_timezone(&Utc)))
        .with_context(|| format!("row {row}: bad published_at_parsed {raw:?}"))
}

/// `{dir}/all_articles_{YYYY-MM-DD}.csv`
pub fn all_articles_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("all_articles_{}.csv", date.format("%Y-%m-%d")))
}

/// `{dir}/top_articles_{YYYY-MM-DD}.csv`
pub fn top_articles_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("top_articles_{}.csv", date.format("%Y-%m-%d")))
}

fn writer_for(path: &Path) -> Result<csv::Writer<fs::File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    csv::Writer::from_path(path).with_context(|| format!("opening {}", path.display()))
}

pub fn write_canonical_csv(path: &Path, articles: &[CanonicalArticle]) -> Result<()> {
    let mut w = writer_for(path)?;
    for (index, a) in articles.iter().enumerate() {
        w.serialize(CanonicalRow {
            index,
            source: a.source.clone(),
            title: a.title.clone(),
            url: a.url.clone(),
            published_at: a.published_at.clone(),
            description: a.description.clone(),
            content: a.content.clone(),
            fetched_from: a.fetched_from.as_str().to_string(),
            published_at_parsed: fmt_ts(a.published_at_parsed),
        })
        .with_context(|| format!("writing row {index} to {}", path.display()))?;
    }
    w.flush().with_context(|| format!("flushing {}", path.display()))?;
    tracing::info!(target: "pipeline", path = %path.display(), rows = articles.len(), "archived articles");
    Ok(())
}

pub fn write_digest_csv(path: &Path, entries: &[DigestEntry]) -> Result<()> {
    let mut w = writer_for(path)?;
    for (index, e) in entries.iter().enumerate() {
        let a = &e.ranked.article;
        w.serialize(DigestRow {
            index,
            source: &a.source,
            title: &a.title,
            url: &a.url,
            published_at: &a.published_at,
            description: &a.description,
            content: &a.content,
            fetched_from: a.fetched_from.as_str(),
            published_at_parsed: fmt_ts(a.published_at_parsed),
            combined_text: &e.ranked.combined_text,
            relevance_score: e.ranked.relevance_score,
            summary: &e.summary,
        })
        .with_context(|| format!("writing row {index} to {}", path.display()))?;
    }
    w.flush().with_context(|| format!("flushing {}", path.display()))?;
    tracing::info!(target: "pipeline", path = %path.display(), rows = entries.len(), "archived digest");
    Ok(())
}

/// Read back a file written by [`write_canonical_csv`].
pub fn read_canonical_csv(path: &Path) -> Result<Vec<CanonicalArticle>> {
    let mut r = csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let mut out = Vec::new();
    for (i, row) in r.deserialize::<CanonicalRow>().enumerate() {
        let row = row.with_context(|| format!("row {i} of {}", path.display()))?;
        out.push(CanonicalArticle {
            published_at_parsed: parse_ts(&row.published_at_parsed, i)?,
            fetched_from: FetchOrigin::from_tag(&row.fetched_from),
            source: row.source,
            title: row.title,
            url: row.url,
            published_at: row.published_at,
            description: row.description,
            content: row.content,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dated_paths() {
        let d = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
        assert_eq!(
            all_articles_path(Path::new("arch"), d),
            Path::new("arch/all_articles_2025-06-05.csv")
        );
        assert_eq!(
            top_articles_path(Path::new("arch"), d),
            Path::new("arch/top_articles_2025-06-05.csv")
        );
    }

    #[test]
    fn header_starts_with_index() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/a.csv");
        write_canonical_csv(&path, &[CanonicalArticle {
            url: "https://x".into(),
            ..Default::default()
        }])
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("index,source,title,url"));
        assert!(lines.next().unwrap().starts_with("0,"));
    }

    #[test]
    fn bad_timestamp_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.csv");
        std::fs::write(
            &path,
            "index,source,title,url,published_at,description,content,fetched_from,published_at_parsed\n\
             0,s,t,u,p,d,c,gdelt,yesterday\n",
        )
        .unwrap();
        let err = read_canonical_csv(&path).unwrap_err();
        assert!(format!("{err:#}").contains("published_at_parsed"));
    }
}
