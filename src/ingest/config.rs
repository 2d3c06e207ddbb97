// src/ingest/config.rs
//! Blocklist and query-term files.
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "NEWSRANK_BLOCKLIST_PATH";

/// Load a blocklist from an explicit path. Supports TOML or JSON formats.
pub fn load_blocklist_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading blocklist from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_source_list(&content, ext.as_str())
}

/// Load a blocklist using env var + fallbacks:
/// 1) $NEWSRANK_BLOCKLIST_PATH
/// 2) config/blocklist.toml
/// 3) config/blocklist.json
///
/// `Ok(None)` means nothing was configured and the caller keeps its default.
pub fn load_blocklist_default() -> Result<Option<Vec<String>>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_blocklist_from(&pb).map(Some);
        } else {
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/blocklist.toml");
    if toml_p.exists() {
        return load_blocklist_from(&toml_p).map(Some);
    }
    let json_p = PathBuf::from("config/blocklist.json");
    if json_p.exists() {
        return load_blocklist_from(&json_p).map(Some);
    }
    Ok(None)
}

/// Query terms used by the fetchers, stored as a JSON array of strings.
pub fn load_query_terms(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        anyhow::bail!(
            "query terms file not found: {} (available sets: 'short' or 'long')",
            path.display()
        );
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading query terms from {}", path.display()))?;
    let terms = parse_json(&content)
        .with_context(|| format!("parsing query terms from {}", path.display()))?;
    if terms.is_empty() {
        anyhow::bail!("query terms file {} is empty", path.display());
    }
    Ok(terms)
}

fn parse_source_list(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    // Try TOML first if hinted or content looks like toml.
    let try_toml = hint_ext == "toml" || s.contains("sources");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported blocklist format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlList {
        sources: Vec<String>,
    }
    let v: TomlList = toml::from_str(s)?;
    Ok(clean_list(v.sources))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Trim, drop empties, drop repeats. Keeps first-seen order; case is preserved
/// since blocklist matching is case-sensitive.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && seen.insert(t.to_string()) {
            out.push(t.to_string());
        }
    }
    out
}
