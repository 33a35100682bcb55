// src/collect/providers/retrieval.rs
//! Search-augmented retrieval: one chat call that answers with a JSON list of news records.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;

use crate::ai::{CompletionRequest, DynCompletionService, ServiceError, Usage};
use crate::collect::types::{CandidateItem, PublishTime, SourceProvider, SourceUsage};
use crate::error::{PipelineError, Result};

pub const DEFAULT_RETRIEVAL_MODEL: &str = "sonar";
const SOURCE: &str = "Search";

pub const DEFAULT_RETRIEVAL_PROMPT: &str = "Find today's top 5 AI and tech news stories that \
would interest startup founders and developers. Focus on AI product launches, open source \
releases, funding news, technical breakthroughs, API updates, developer tools and market \
analysis. Avoid corporate PR, vague announcements and overhyped claims.\n\n\
Answer ONLY with a JSON array. Each element must be an object with the string fields \
\"title\", \"summary\" (2-3 sentences), \"implications\" (practical implications for \
startups/developers) and \"url\" (source URL).";

#[derive(Debug, Deserialize)]
struct Record {
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    implications: String,
    #[serde(default)]
    url: String,
}

/// Removes a surrounding markdown code fence (```` ``` ```` or ```` ```json ````), if any.
pub fn unwrap_code_fence(s: &str) -> &str {
    static RE_FENCE: OnceCell<Regex> = OnceCell::new();
    let re = RE_FENCE.get_or_init(|| {
        Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)\r?\n?```\s*$").unwrap()
    });
    match re.captures(s).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => s.trim(),
    }
}

/// Parses the retrieval answer into items stamped with `retrieved_at`.
pub fn parse_records(
    content: &str,
    retrieved_at: chrono::DateTime<Utc>,
) -> Result<Vec<CandidateItem>> {
    let body = unwrap_code_fence(content);
    let records: Vec<Record> = serde_json::from_str(body).map_err(|e| {
        PipelineError::DataFormat(format!("retrieval payload is not a record list: {e}"))
    })?;

    Ok(records
        .into_iter()
        .map(|r| CandidateItem {
            title: r.title.trim().to_string(),
            link: r.url.trim().to_string(),
            summary: r.summary.trim().to_string(),
            published_at: Some(PublishTime::Instant(retrieved_at)),
            source: SOURCE.to_string(),
            implications: Some(r.implications.trim().to_string()).filter(|s| !s.is_empty()),
        })
        .collect())
}

pub struct RetrievalProvider {
    service: DynCompletionService,
    request: CompletionRequest,
    spent: Mutex<Option<Usage>>,
}

impl RetrievalProvider {
    pub fn new(service: DynCompletionService, model: &str, prompt: &str) -> Self {
        Self {
            service,
            request: CompletionRequest {
                model: model.to_string(),
                system: None,
                prompt: prompt.to_string(),
                temperature: 0.2,
                max_tokens: 1500,
            },
            spent: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SourceProvider for RetrievalProvider {
    async fn fetch_latest(&self) -> Result<Vec<CandidateItem>> {
        let completion = self
            .service
            .complete(&self.request)
            .await
            .map_err(|e| match e {
                ServiceError::Malformed(m) => PipelineError::DataFormat(m),
                other => PipelineError::fetch(SOURCE, other),
            })?;
        tracing::debug!(chars = completion.text.len(), "retrieval answer received");
        *self.spent.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = completion.usage;
        parse_records(&completion.text, Utc::now())
    }

    fn name(&self) -> &str {
        SOURCE
    }

    /// No other source backs this one up, so a malformed payload ends the run.
    fn escalates(&self, err: &PipelineError) -> bool {
        matches!(err, PipelineError::DataFormat(_))
    }

    fn usage(&self) -> Option<SourceUsage> {
        let usage = (*self.spent.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))?;
        Some(SourceUsage {
            label: "retrieval".into(),
            model: self.request.model.clone(),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_with_language_tag_is_unwrapped() {
        let s = "```json\n[{\"title\":\"A\"}]\n```";
        assert_eq!(unwrap_code_fence(s), "[{\"title\":\"A\"}]");
    }

    #[test]
    fn bare_payload_passes_through() {
        assert_eq!(unwrap_code_fence("  [1, 2]  "), "[1, 2]");
    }

    #[test]
    fn records_map_to_items() {
        let now = Utc::now();
        let items = parse_records(
            "```\n[{\"title\":\" A \",\"summary\":\"S\",\"implications\":\"\",\"url\":\"https://a.test\"}]\n```",
            now,
        )
        .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "A");
        assert_eq!(items[0].link, "https://a.test");
        assert_eq!(items[0].implications, None);
        assert_eq!(items[0].published_at, Some(PublishTime::Instant(now)));
    }

    #[tokio::test]
    async fn completion_usage_is_reported_after_fetch() {
        let provider = RetrievalProvider::new(
            std::sync::Arc::new(crate::ai::FixedService {
                text: "[{\"title\":\"A\",\"url\":\"https://a.test\"}]".into(),
                usage: Some(Usage {
                    prompt_tokens: 120,
                    completion_tokens: 480,
                }),
            }),
            DEFAULT_RETRIEVAL_MODEL,
            "prompt",
        );
        assert_eq!(provider.usage(), None);

        provider.fetch_latest().await.unwrap();
        let spent = provider.usage().expect("usage recorded");
        assert_eq!(spent.model, "sonar");
        assert_eq!(spent.usage.total(), 600);
    }

    #[test]
    fn prose_answer_is_a_data_format_error() {
        let err = parse_records("Here are today's stories: ...", Utc::now()).unwrap_err();
        assert!(matches!(err, PipelineError::DataFormat(_)));
    }
}
