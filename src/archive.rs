// src/archive.rs
//! Best-effort local copy of each run: the final markdown plus a JSON metadata file.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

use crate::ai::Usage;
use crate::collect::types::CandidateItem;
use crate::cost::CostEstimate;
use crate::synth::SynthesisArtifact;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemRef {
    pub title: String,
    pub link: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StageMeta {
    pub stage: String,
    pub model: String,
    pub chars: usize,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunMetadata {
    pub timestamp: String,
    pub items: Vec<ItemRef>,
    pub stages: Vec<StageMeta>,
    pub final_length: usize,
    pub sha256: String,
    pub cost_estimate: CostEstimate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    /// `YYYYmmdd_HHMM`, used in file names.
    pub stamp: String,
    pub markdown: String,
    pub metadata: RunMetadata,
}

fn sha256_hex(s: &str) -> String {
    let digest = Sha256::digest(s.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

impl RunRecord {
    pub fn new(
        at: DateTime<Local>,
        items: &[CandidateItem],
        artifacts: &[SynthesisArtifact],
        cost: CostEstimate,
    ) -> Self {
        let markdown = artifacts.last().map(|a| a.text.clone()).unwrap_or_default();
        let metadata = RunMetadata {
            timestamp: at.to_rfc3339(),
            items: items
                .iter()
                .map(|it| ItemRef {
                    title: it.title.clone(),
                    link: it.link.clone(),
                    source: it.source.clone(),
                })
                .collect(),
            stages: artifacts
                .iter()
                .map(|a| StageMeta {
                    stage: a.stage.clone(),
                    model: a.model.clone(),
                    chars: a.text.chars().count(),
                    usage: a.usage,
                })
                .collect(),
            final_length: markdown.chars().count(),
            sha256: sha256_hex(&markdown),
            cost_estimate: cost,
        };
        Self {
            stamp: at.format("%Y%m%d_%H%M").to_string(),
            markdown,
            metadata,
        }
    }
}

#[async_trait::async_trait]
pub trait ArchiveSink: Send + Sync {
    async fn store(&self, record: &RunRecord) -> Result<()>;
}

/// Writes `blog_post_{stamp}.md` and `metadata_{stamp}.json` under `dir`.
pub struct FileArchive {
    dir: PathBuf,
}

impl FileArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait::async_trait]
impl ArchiveSink for FileArchive {
    async fn store(&self, record: &RunRecord) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating {}", self.dir.display()))?;

        let md_path = self.dir.join(format!("blog_post_{}.md", record.stamp));
        tokio::fs::write(&md_path, &record.markdown)
            .await
            .with_context(|| format!("writing {}", md_path.display()))?;

        let meta_path = self.dir.join(format!("metadata_{}.json", record.stamp));
        let json = serde_json::to_string_pretty(&record.metadata)?;
        tokio::fs::write(&meta_path, json)
            .await
            .with_context(|| format!("writing {}", meta_path.display()))?;

        tracing::info!(target: "archive", md = %md_path.display(), meta = %meta_path.display(), "run archived");
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Default)]
pub struct MemoryArchive {
    pub records: std::sync::Mutex<Vec<RunRecord>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ArchiveSink for MemoryArchive {
    async fn store(&self, record: &RunRecord) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record.clone());
        Ok(())
    }
}
