// src/pipeline.rs
//! One end-to-end run: fetch, merge, archive, filter, rank, summarize,
//! export, deliver.
//!
//! A ranking failure aborts the run before anything is exported or sent.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};

use crate::archive::{all_articles_path, top_articles_path, write_canonical_csv, write_digest_csv};
use crate::config::{AppConfig, QueryTermSet};
use crate::digest::{export_standalone_html, render_digest_html, EmailSender};
use crate::filter::filter_articles;
use crate::ingest::config::load_query_terms;
use crate::ingest::providers::gdelt::GdeltProvider;
use crate::ingest::providers::newsapi::NewsApiProvider;
use crate::ingest::providers::FetchWindow;
use crate::ingest::types::SourceProvider;
use crate::ingest::{normalize_and_merge, run_once};
use crate::relevance::RelevanceRanker;
use crate::summarize::{summarize_all, DisabledSummarizer, DynSummarizer};

/// Command-line overrides applied on top of [`AppConfig`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub days: Option<i64>,
    pub count: Option<usize>,
    pub query_terms: Option<QueryTermSet>,
    pub dry_run: bool,
    pub no_summary: bool,
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub merged: usize,
    pub filtered: usize,
    pub ranked: usize,
    pub all_articles_csv: PathBuf,
    pub top_articles_csv: PathBuf,
    pub html: PathBuf,
    pub emailed: bool,
}

pub struct Pipeline {
    pub providers: Vec<Box<dyn SourceProvider>>,
    pub blocklist: Vec<String>,
    pub ranker: RelevanceRanker,
    pub summarizer: DynSummarizer,
    pub query: String,
    pub top_n: usize,
    pub archive_dir: PathBuf,
    pub html_dir: PathBuf,
    /// `None` skips delivery.
    pub email: Option<EmailSender>,
}

impl Pipeline {
    /// Wire real providers and backends from configuration and environment.
    ///
    /// NewsAPI is skipped with a warning when `NEWSAPI_KEY` is missing; GDELT
    /// needs no key. SMTP settings are only required outside dry runs.
    pub fn from_config(cfg: &AppConfig, opts: &RunOptions) -> Result<Self> {
        let days = opts.days.unwrap_or(cfg.fetch.days);
        let top_n = opts.count.unwrap_or(cfg.ranking.top_n);
        let set = opts.query_terms.unwrap_or(cfg.fetch.query_terms);

        let terms = load_query_terms(&cfg.fetch.query_terms_path(set))?;
        let window = FetchWindow::last_days(days);
        tracing::info!(
            target: "pipeline",
            days,
            top_n,
            query_terms = set.as_str(),
            terms = terms.len(),
            "configuring run"
        );

        let mut providers: Vec<Box<dyn SourceProvider>> = Vec::new();
        match NewsApiProvider::from_env(&cfg.fetch.newsapi_endpoint, terms.clone(), window) {
            Ok(p) => providers.push(Box::new(
                p.with_chunk_size(cfg.fetch.chunk_size)
                    .with_page_size(cfg.fetch.page_size),
            )),
            Err(e) => tracing::warn!(target: "pipeline", error = %e, "newsapi disabled"),
        }
        providers.push(Box::new(
            GdeltProvider::new(cfg.fetch.resolved_gdelt_endpoint(), terms, window)?
                .with_chunk_size(cfg.fetch.chunk_size)
                .with_max_records(cfg.fetch.max_records),
        ));

        let summarizer: DynSummarizer = if opts.no_summary {
            std::sync::Arc::new(DisabledSummarizer)
        } else {
            cfg.summarizer.build()
        };

        let email = if opts.dry_run {
            None
        } else {
            Some(EmailSender::from_env().context("configuring digest email")?)
        };

        Ok(Self {
            providers,
            blocklist: cfg.filter.resolve_blocklist()?,
            ranker: RelevanceRanker::new(cfg.embedding.build()?),
            summarizer,
            query: cfg.ranking.query.clone(),
            top_n,
            archive_dir: cfg.output.archive_dir.clone(),
            html_dir: cfg.output.html_dir.clone(),
            email,
        })
    }

    pub async fn run(&self) -> Result<RunReport> {
        self.run_for(Utc::now().date_naive()).await
    }

    /// Run with `date` stamped on every output file.
    pub async fn run_for(&self, date: NaiveDate) -> Result<RunReport> {
        let batches = run_once(&self.providers).await;
        let merged = normalize_and_merge(batches);

        let all_csv = all_articles_path(&self.archive_dir, date);
        write_canonical_csv(&all_csv, &merged)?;

        let filtered = filter_articles(&merged, self.blocklist.as_slice());

        let ranked = self
            .ranker
            .get_relevant_articles(&filtered, &self.query, self.top_n)
            .await
            .context("ranking articles")?;

        let entries = summarize_all(self.summarizer.as_ref(), ranked).await;

        let top_csv = top_articles_path(&self.archive_dir, date);
        write_digest_csv(&top_csv, &entries)?;
        let html = export_standalone_html(&entries, &self.html_dir, date)?;

        let emailed = match &self.email {
            Some(sender) => {
                sender
                    .send_digest(render_digest_html(&entries, date), date)
                    .await?;
                true
            }
            None => {
                tracing::info!(target: "pipeline", "email delivery skipped");
                false
            }
        };

        let report = RunReport {
            merged: merged.len(),
            filtered: filtered.len(),
            ranked: entries.len(),
            all_articles_csv: all_csv,
            top_articles_csv: top_csv,
            html,
            emailed,
        };
        tracing::info!(
            target: "pipeline",
            merged = report.merged,
            filtered = report.filtered,
            ranked = report.ranked,
            emailed = report.emailed,
            "run complete"
        );
        Ok(report)
    }
}
