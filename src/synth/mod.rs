// src/synth/mod.rs
//! Content synthesizer: an ordered list of stage descriptors, each one completion call
//! that consumes the previous artifact (or the filtered item set for the first stage).

pub mod presets;

use std::collections::HashMap;
use std::fmt::Write as _;

use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};

use crate::ai::{CompletionRequest, CompletionService, DynCompletionService, Usage};
use crate::collect::types::CandidateItem;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Perplexity,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::OpenAi => "openai",
            ServiceKind::Anthropic => "anthropic",
            ServiceKind::Perplexity => "perplexity",
        }
    }
}

/// How much of each item the first stage sees.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemDetail {
    /// `"{n}. {title} ({source})"`
    #[default]
    Brief,
    /// Brief line plus summary, implications and URL.
    Full,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2500
}

/// One synthesis step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageDescriptor {
    pub id: String,
    pub service: ServiceKind,
    pub model: String,
    /// System instruction.
    #[serde(default)]
    pub persona: Option<String>,
    /// Placeholders: `{input}`, `{target_length}`, `{outline}`, `{tone}`.
    pub template: String,
    #[serde(default)]
    pub target_length: String,
    #[serde(default)]
    pub outline: String,
    #[serde(default)]
    pub tone: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub input_limit: Option<usize>,
    #[serde(default)]
    pub item_detail: ItemDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SynthesisArtifact {
    pub stage: String,
    pub text: String,
    pub model: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Copy)]
pub enum StageInput<'a> {
    Items(&'a [CandidateItem]),
    Artifact(&'a SynthesisArtifact),
}

/// Numbered listing of items for a prompt.
pub fn serialize_items(items: &[CandidateItem], limit: Option<usize>, detail: ItemDetail) -> String {
    let take = limit.unwrap_or(items.len());
    let mut out = String::new();
    for (i, it) in items.iter().take(take).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{}. {} ({})", i + 1, it.title, it.source);
        if detail == ItemDetail::Full {
            if !it.summary.is_empty() {
                let _ = write!(out, "\n   Summary: {}", it.summary);
            }
            if let Some(imp) = it.implications.as_deref() {
                let _ = write!(out, "\n   Implications: {imp}");
            }
            if !it.link.is_empty() {
                let _ = write!(out, "\n   URL: {}", it.link);
            }
        }
    }
    out
}

/// Fills the stage template. Input goes after a blank line when `{input}` is absent.
pub fn build_prompt(stage: &StageDescriptor, input: StageInput<'_>) -> String {
    let input_text = match input {
        StageInput::Items(items) => serialize_items(items, stage.input_limit, stage.item_detail),
        StageInput::Artifact(a) => a.text.clone(),
    };

    let filled = stage
        .template
        .replace("{target_length}", &stage.target_length)
        .replace("{outline}", &stage.outline)
        .replace("{tone}", &stage.tone);

    if filled.contains("{input}") {
        filled.replace("{input}", &input_text)
    } else {
        format!("{}\n\n{}", filled.trim_end(), input_text)
    }
}

/// Runs one stage. Depends only on its arguments.
pub async fn run_stage(
    service: &dyn CompletionService,
    stage: &StageDescriptor,
    input: StageInput<'_>,
) -> Result<SynthesisArtifact> {
    let request = CompletionRequest {
        model: stage.model.clone(),
        system: stage.persona.clone(),
        prompt: build_prompt(stage, input),
        temperature: stage.temperature,
        max_tokens: stage.max_tokens,
    };

    let t0 = std::time::Instant::now();
    let completion = service
        .complete(&request)
        .await
        .map_err(|e| PipelineError::generation(&stage.id, e))?;
    histogram!("synth_stage_ms", "stage" => stage.id.clone())
        .record(t0.elapsed().as_secs_f64() * 1_000.0);

    if completion.text.trim().is_empty() {
        return Err(PipelineError::generation(&stage.id, "empty completion"));
    }

    if let Some(u) = completion.usage {
        counter!("synth_tokens_total", "stage" => stage.id.clone()).increment(u.total());
    }
    tracing::info!(
        target: "synth",
        stage = %stage.id,
        provider = service.name(),
        model = %stage.model,
        chars = completion.text.chars().count(),
        prompt_tokens = completion.usage.map(|u| u.prompt_tokens),
        completion_tokens = completion.usage.map(|u| u.completion_tokens),
        "stage complete"
    );

    Ok(SynthesisArtifact {
        stage: stage.id.clone(),
        text: completion.text,
        model: stage.model.clone(),
        usage: completion.usage,
    })
}

/// Routes each stage to the completion service of its kind.
#[derive(Default, Clone)]
pub struct Synthesizer {
    services: HashMap<ServiceKind, DynCompletionService>,
}

impl Synthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, kind: ServiceKind, service: DynCompletionService) -> Self {
        self.services.insert(kind, service);
        self
    }

    pub fn has_service(&self, kind: ServiceKind) -> bool {
        self.services.contains_key(&kind)
    }

    /// Final artifact only.
    pub async fn synthesize(
        &self,
        items: &[CandidateItem],
        stages: &[StageDescriptor],
    ) -> Result<SynthesisArtifact> {
        let mut trace = self.synthesize_traced(items, stages).await?;
        trace
            .pop()
            .ok_or_else(|| PipelineError::config("no synthesis stages configured"))
    }

    /// Every artifact in stage order; the last one is the document.
    pub async fn synthesize_traced(
        &self,
        items: &[CandidateItem],
        stages: &[StageDescriptor],
    ) -> Result<Vec<SynthesisArtifact>> {
        if stages.is_empty() {
            return Err(PipelineError::config("no synthesis stages configured"));
        }

        let mut artifacts: Vec<SynthesisArtifact> = Vec::with_capacity(stages.len());
        for stage in stages {
            let service = self.services.get(&stage.service).ok_or_else(|| {
                PipelineError::config(format!(
                    "stage `{}` needs the {} service, which is not configured",
                    stage.id,
                    stage.service.as_str()
                ))
            })?;
            let input = match artifacts.last() {
                Some(prev) => StageInput::Artifact(prev),
                None => StageInput::Items(items),
            };
            let artifact = run_stage(service.as_ref(), stage, input).await?;
            artifacts.push(artifact);
        }
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(template: &str) -> StageDescriptor {
        StageDescriptor {
            id: "draft".into(),
            service: ServiceKind::OpenAi,
            model: "m".into(),
            persona: None,
            template: template.into(),
            target_length: "3000 characters".into(),
            outline: "intro / body / outro".into(),
            tone: "plain".into(),
            temperature: 0.5,
            max_tokens: 100,
            input_limit: Some(1),
            item_detail: ItemDetail::Brief,
        }
    }

    fn item(title: &str) -> CandidateItem {
        CandidateItem {
            title: title.into(),
            link: "https://x.test".into(),
            summary: "sum".into(),
            published_at: None,
            source: "Wire".into(),
            implications: Some("imp".into()),
        }
    }

    #[test]
    fn placeholders_are_filled() {
        let s = stage("Write {target_length}, {tone}:\n{outline}\n---\n{input}");
        let items = [item("A"), item("B")];
        let p = build_prompt(&s, StageInput::Items(&items));
        assert_eq!(
            p,
            "Write 3000 characters, plain:\nintro / body / outro\n---\n1. A (Wire)"
        );
    }

    #[test]
    fn input_is_appended_without_placeholder() {
        let s = stage("Polish this.  ");
        let prev = SynthesisArtifact {
            stage: "draft".into(),
            text: "# Draft".into(),
            model: "m".into(),
            usage: None,
        };
        assert_eq!(
            build_prompt(&s, StageInput::Artifact(&prev)),
            "Polish this.\n\n# Draft"
        );
    }

    #[test]
    fn full_detail_lists_every_field() {
        let out = serialize_items(&[item("A")], None, ItemDetail::Full);
        assert_eq!(
            out,
            "1. A (Wire)\n   Summary: sum\n   Implications: imp\n   URL: https://x.test"
        );
    }

    #[test]
    fn service_kind_names_match_config_values() {
        let k: ServiceKind = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(k, ServiceKind::OpenAi);
        assert_eq!(ServiceKind::Anthropic.as_str(), "anthropic");
    }
}
