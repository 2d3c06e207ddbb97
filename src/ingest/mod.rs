// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod types;

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::article::CanonicalArticle;
use crate::ingest::types::{ArticleRecord, SourceProvider};

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_records_total", "Raw records handed to the merge step.");
        describe_counter!(
            "ingest_malformed_total",
            "Records dropped because they had no url."
        );
        describe_counter!(
            "ingest_dedup_total",
            "Records removed by url deduplication."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider fetch/parse errors."
        );
    });
}

/// Normalize text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Best-effort timestamp parsing. Naive values are taken as UTC.
pub fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 5] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y%m%dT%H%M%SZ",
        "%Y%m%d%H%M%S",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

/// Convert one raw record. `None` when the record has no usable url.
pub fn normalize_record(rec: ArticleRecord) -> Option<CanonicalArticle> {
    let url = rec.url.unwrap_or_default();
    if url.trim().is_empty() {
        return None;
    }
    let published_at = rec.published_at.unwrap_or_default();
    let published_at_parsed = parse_published_at(&published_at);

    Some(CanonicalArticle {
        source: rec.source.unwrap_or_default(),
        title: rec.title.unwrap_or_default(),
        url,
        published_at,
        description: rec.description.unwrap_or_default(),
        content: rec.content.unwrap_or_default(),
        fetched_from: rec.fetched_from.unwrap_or_default(),
        published_at_parsed,
    })
}

/// Newest first, unparsed dates last.
fn newest_first(a: &CanonicalArticle, b: &CanonicalArticle) -> Ordering {
    match (a.published_at_parsed, b.published_at_parsed) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable newest-first sort, keep the first row per url, sort again.
/// Returns the surviving articles and the number of duplicates removed.
pub fn dedup_and_sort_counted(mut articles: Vec<CanonicalArticle>) -> (Vec<CanonicalArticle>, usize) {
    articles.sort_by(newest_first);

    let before = articles.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(before);
    let mut kept: Vec<CanonicalArticle> = articles
        .into_iter()
        .filter(|a| seen.insert(a.url.clone()))
        .collect();

    kept.sort_by(newest_first);
    let removed = before - kept.len();
    (kept, removed)
}

/// See [`dedup_and_sort_counted`].
pub fn dedup_and_sort(articles: Vec<CanonicalArticle>) -> Vec<CanonicalArticle> {
    dedup_and_sort_counted(articles).0
}

/// Merge any number of source collections into one canonical dataset.
///
/// Concatenation order only matters as the tie-break between duplicates whose
/// dates compare equal (including both unparseable).
pub fn normalize_and_merge<I>(sources: I) -> Vec<CanonicalArticle>
where
    I: IntoIterator<Item = Vec<ArticleRecord>>,
{
    ensure_metrics_described();

    let mut total = 0usize;
    let mut malformed = 0usize;
    let mut canonical = Vec::new();
    for rec in sources.into_iter().flatten() {
        total += 1;
        let origin = rec.fetched_from.unwrap_or_default();
        let title = rec.title.clone().unwrap_or_default();
        match normalize_record(rec) {
            Some(a) => canonical.push(a),
            None => {
                malformed += 1;
                tracing::warn!(
                    target: "ingest",
                    origin = origin.as_str(),
                    %title,
                    "dropping record without url"
                );
            }
        }
    }

    let (merged, dedup) = dedup_and_sort_counted(canonical);

    counter!("ingest_records_total").increment(total as u64);
    counter!("ingest_malformed_total").increment(malformed as u64);
    counter!("ingest_dedup_total").increment(dedup as u64);

    tracing::info!(
        target: "ingest",
        total,
        malformed,
        dedup,
        kept = merged.len(),
        "merged source records"
    );

    merged
}

/// Fetch from every provider; a failing provider contributes an empty set.
/// Returns one collection per provider, in provider order.
pub async fn run_once(providers: &[Box<dyn SourceProvider>]) -> Vec<Vec<ArticleRecord>> {
    ensure_metrics_described();

    let mut out = Vec::with_capacity(providers.len());
    for p in providers {
        match p.fetch_latest().await {
            Ok(v) => {
                tracing::info!(target: "ingest", provider = p.name(), count = v.len(), "provider fetched");
                out.push(v);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, provider = p.name(), "provider error");
                counter!("ingest_provider_errors_total").increment(1);
                out.push(Vec::new());
            }
        }
    }
    out
}
