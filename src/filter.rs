// src/filter.rs
//! Source blocklist filtering.
//!
//! Matching is exact and case-sensitive on `CanonicalArticle::source`.

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::article::CanonicalArticle;

/// Sources dropped when the caller supplies no blocklist of its own.
pub const DEFAULT_BLOCKLIST: [&str; 3] = ["Pypi.org", "Fox News", "W3.org"];

pub fn default_blocklist() -> Vec<String> {
    DEFAULT_BLOCKLIST.iter().map(|s| s.to_string()).collect()
}

pub fn is_blocked<S: AsRef<str>>(source: &str, blocklist: &[S]) -> bool {
    blocklist.iter().any(|b| b.as_ref() == source)
}

/// Keep every article whose source is not blocklisted, in input order.
pub fn filter_articles<S: AsRef<str>>(
    articles: &[CanonicalArticle],
    excluded_sources: &[S],
) -> Vec<CanonicalArticle> {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("filter_removed_total", "Articles removed by the source blocklist.");
    });

    if articles.is_empty() {
        tracing::warn!(target: "filter", "empty article set provided to filter");
        return Vec::new();
    }

    let kept: Vec<CanonicalArticle> = articles
        .iter()
        .filter(|a| !is_blocked(&a.source, excluded_sources))
        .cloned()
        .collect();

    let removed = articles.len() - kept.len();
    counter!("filter_removed_total").increment(removed as u64);
    tracing::info!(
        target: "filter",
        removed,
        kept = kept.len(),
        blocklist = ?excluded_sources.iter().map(|s| s.as_ref()).collect::<Vec<_>>(),
        "filtered articles by source"
    );
    kept
}

/// [`filter_articles`] with [`DEFAULT_BLOCKLIST`].
pub fn filter_articles_default(articles: &[CanonicalArticle]) -> Vec<CanonicalArticle> {
    filter_articles(articles, &DEFAULT_BLOCKLIST)
}
