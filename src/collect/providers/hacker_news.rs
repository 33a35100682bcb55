// src/collect/providers/hacker_news.rs
use async_trait::async_trait;
use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::collect::types::{CandidateItem, PublishTime, SourceProvider};
use crate::error::{PipelineError, Result};

pub const DEFAULT_HN_BASE: &str = "https://hacker-news.firebaseio.com";
pub const DEFAULT_TOP_N: usize = 10;
const SOURCE: &str = "Hacker News";

#[derive(Debug, Deserialize)]
struct Story {
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
    url: Option<String>,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    descendants: i64,
    #[serde(default)]
    time: i64,
}

/// Top stories from the Hacker News Firebase API: one id list, then one GET per id.
pub struct HackerNewsProvider {
    base: String,
    top_n: usize,
    client: reqwest::Client,
}

impl HackerNewsProvider {
    pub fn new(base: &str, client: reqwest::Client) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            top_n: DEFAULT_TOP_N,
            client,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::fetch(SOURCE, e))?;
        if !resp.status().is_success() {
            return Err(PipelineError::fetch(SOURCE, format!("HTTP {} for {url}", resp.status())));
        }
        resp.json::<T>()
            .await
            .map_err(|e| PipelineError::DataFormat(format!("{SOURCE} {url}: {e}")))
    }
}

fn story_to_item(story: Story) -> Option<CandidateItem> {
    if story.kind.as_deref() != Some("story") {
        return None;
    }
    Some(CandidateItem {
        title: story.title.unwrap_or_default(),
        link: story.url.unwrap_or_default(),
        summary: format!(
            "HN Score: {} | Comments: {}",
            story.score, story.descendants
        ),
        published_at: DateTime::from_timestamp(story.time, 0).map(PublishTime::Instant),
        source: SOURCE.to_string(),
        implications: None,
    })
}

#[async_trait]
impl SourceProvider for HackerNewsProvider {
    async fn fetch_latest(&self) -> Result<Vec<CandidateItem>> {
        let ids: Vec<u64> = self
            .get_json(&format!("{}/v0/topstories.json", self.base))
            .await?;

        let mut out = Vec::new();
        for id in ids.into_iter().take(self.top_n) {
            // Deleted items come back as `null`.
            let story: Option<Story> = self
                .get_json(&format!("{}/v0/item/{id}.json", self.base))
                .await?;
            if let Some(item) = story.and_then(story_to_item) {
                out.push(item);
            }
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        SOURCE
    }
}
