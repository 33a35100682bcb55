use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use trend_digest::ai::{Completion, CompletionRequest, CompletionService, ServiceError, Usage};
use trend_digest::collect::types::CandidateItem;
use trend_digest::synth::presets::search_digest_stages;
use trend_digest::synth::{run_stage, ItemDetail, ServiceKind, StageDescriptor, StageInput};
use trend_digest::{PipelineError, Synthesizer};

/// Replies with a fixed text and remembers every request.
struct Recording {
    reply: Result<String, u16>,
    seen: Mutex<Vec<CompletionRequest>>,
}

impl Recording {
    fn ok(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn status(code: u16) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(code),
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl CompletionService for Recording {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ServiceError> {
        self.seen.lock().push(request.clone());
        match &self.reply {
            Ok(text) => Ok(Completion {
                text: text.clone(),
                usage: Some(Usage {
                    prompt_tokens: 100,
                    completion_tokens: 50,
                }),
            }),
            Err(status) => Err(ServiceError::Status {
                status: *status,
                body: "upstream error".into(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn items() -> Vec<CandidateItem> {
    ["Model launch", "Funding round"]
        .iter()
        .map(|t| CandidateItem {
            title: t.to_string(),
            link: "https://news.example.com".into(),
            summary: "summary".into(),
            published_at: None,
            source: "Search".into(),
            implications: Some("matters".into()),
        })
        .collect()
}

fn stage(id: &str, service: ServiceKind, template: &str) -> StageDescriptor {
    StageDescriptor {
        id: id.into(),
        service,
        model: format!("{id}-model"),
        persona: Some(format!("{id} persona")),
        template: template.into(),
        target_length: String::new(),
        outline: String::new(),
        tone: String::new(),
        temperature: 0.4,
        max_tokens: 300,
        input_limit: None,
        item_detail: ItemDetail::Brief,
    }
}

#[tokio::test]
async fn stages_chain_their_artifacts() {
    let first = Recording::ok("# Draft body");
    let second = Recording::ok("# Polished body");
    let synth = Synthesizer::new()
        .with_service(ServiceKind::OpenAi, first.clone())
        .with_service(ServiceKind::Anthropic, second.clone());
    let stages = vec![
        stage("draft", ServiceKind::OpenAi, "Write about:\n{input}"),
        stage("polished", ServiceKind::Anthropic, "Polish:\n{input}"),
    ];

    let trace = synth.synthesize_traced(&items(), &stages).await.unwrap();
    assert_eq!(trace.len(), 2);
    assert_eq!(trace[0].stage, "draft");
    assert_eq!(trace[1].text, "# Polished body");
    assert_eq!(trace[1].model, "polished-model");
    assert_eq!(trace[1].usage.map(|u| u.total()), Some(150));

    let first_req = first.seen.lock()[0].clone();
    assert_eq!(
        first_req.prompt,
        "Write about:\n1. Model launch (Search)\n2. Funding round (Search)"
    );
    assert_eq!(first_req.system.as_deref(), Some("draft persona"));
    assert_eq!(first_req.model, "draft-model");
    assert_eq!(first_req.max_tokens, 300);

    let second_req = second.seen.lock()[0].clone();
    assert_eq!(second_req.prompt, "Polish:\n# Draft body");
}

#[tokio::test]
async fn synthesize_returns_the_last_artifact() {
    let svc = Recording::ok("final");
    let synth = Synthesizer::new().with_service(ServiceKind::OpenAi, svc);
    let out = synth
        .synthesize(&items(), &[stage("only", ServiceKind::OpenAi, "{input}")])
        .await
        .unwrap();
    assert_eq!(out.stage, "only");
    assert_eq!(out.text, "final");
}

#[tokio::test]
async fn empty_completion_is_a_generation_error() {
    let svc = Recording::ok("  \n ");
    let err = run_stage(
        svc.as_ref(),
        &stage("draft", ServiceKind::OpenAi, "{input}"),
        StageInput::Items(&items()),
    )
    .await
    .unwrap_err();
    match err {
        PipelineError::Generation { stage, message } => {
            assert_eq!(stage, "draft");
            assert!(message.contains("empty"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn failing_stage_stops_the_chain() {
    let first = Recording::status(500);
    let second = Recording::ok("never");
    let synth = Synthesizer::new()
        .with_service(ServiceKind::OpenAi, first)
        .with_service(ServiceKind::Anthropic, second.clone());
    let stages = vec![
        stage("draft", ServiceKind::OpenAi, "{input}"),
        stage("polished", ServiceKind::Anthropic, "{input}"),
    ];

    let err = synth.synthesize_traced(&items(), &stages).await.unwrap_err();
    assert!(
        matches!(&err, PipelineError::Generation { stage, .. } if stage == "draft"),
        "got {err:?}"
    );
    assert!(second.seen.lock().is_empty());
}

#[tokio::test]
async fn missing_service_is_a_config_error() {
    let synth = Synthesizer::new();
    let err = synth
        .synthesize(&items(), &[stage("draft", ServiceKind::Perplexity, "{input}")])
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)), "got {err:?}");
}

#[tokio::test]
async fn no_stages_is_a_config_error() {
    let err = Synthesizer::new().synthesize(&items(), &[]).await.unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

#[tokio::test]
async fn search_preset_feeds_full_item_detail_to_the_draft() {
    let draft = Recording::ok("draft text");
    let polish = Recording::ok("polished text");
    let synth = Synthesizer::new()
        .with_service(ServiceKind::OpenAi, draft.clone())
        .with_service(ServiceKind::Anthropic, polish.clone());

    let out = synth
        .synthesize(&items(), &search_digest_stages())
        .await
        .unwrap();
    assert_eq!(out.stage, "polished");

    let prompt = draft.seen.lock()[0].prompt.clone();
    assert!(prompt.contains("1. Model launch (Search)\n   Summary: summary"));
    assert!(prompt.contains("Implications: matters"));
    assert!(!prompt.contains("{input}"));

    let req = polish.seen.lock()[0].clone();
    assert!(req.prompt.contains("draft text"));
    assert_eq!(req.model, "claude-3-haiku-20240307");
    assert!(req.system.is_none());
}
