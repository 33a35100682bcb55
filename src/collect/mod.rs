// src/collect/mod.rs
pub mod providers;
pub mod types;

use crate::collect::types::{SourceProvider, SourceSet, SourceUsage};
use crate::ensure_metrics_described;
use crate::error::Result;
use metrics::counter;
use once_cell::sync::OnceCell;

/// Normalize text: decode entities, strip tags, fold quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Polls every provider in order and concatenates their batches.
pub struct Collector {
    providers: Vec<Box<dyn SourceProvider>>,
}

impl Collector {
    pub fn new(providers: Vec<Box<dyn SourceProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Completion spend recorded by providers during the last `collect`.
    pub fn usage(&self) -> Vec<SourceUsage> {
        self.providers.iter().filter_map(|p| p.usage()).collect()
    }

    /// A failing provider contributes zero items unless it escalates the error.
    pub async fn collect(&self) -> Result<SourceSet> {
        ensure_metrics_described();

        let mut all = Vec::new();
        for p in &self.providers {
            match p.fetch_latest().await {
                Ok(mut batch) => {
                    tracing::info!(provider = p.name(), items = batch.len(), "provider fetched");
                    counter!("collect_items_total").increment(batch.len() as u64);
                    all.append(&mut batch);
                }
                Err(e) if p.escalates(&e) => {
                    tracing::error!(error = %e, provider = p.name(), "provider error is fatal");
                    counter!("collect_provider_errors_total").increment(1);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(error = %e, provider = p.name(), "provider error");
                    counter!("collect_provider_errors_total").increment(1);
                }
            }
        }
        Ok(all)
    }
}
