// src/pipeline.rs
//! # Run driver
//! collect → filter → synthesize → render → dispatch, strictly in sequence.
//!
//! Collector sub-fetch failures are absorbed by the collector; any error that reaches
//! this driver ends the run, and nothing is mailed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::{error, info, warn};

use crate::ai::{build_http_client, ChatCompletionsClient, MessagesClient, Usage};
use crate::archive::{ArchiveSink, FileArchive, RunRecord};
use crate::collect::providers::{FeedProvider, HackerNewsProvider, RetrievalProvider};
use crate::collect::types::{source_urls, SourceProvider};
use crate::collect::Collector;
use crate::config::{AppConfig, CostConfig, TransportKind};
use crate::cost::{estimate_cost, log_cost, CostEstimate};
use crate::dispatch::{compose_subject, DeliveryReceipt, Dispatcher, ResendTransport, SmtpTransport};
use crate::error::{PipelineError, Result};
use crate::filter::{filter_recent, DEFAULT_CAPACITY, DEFAULT_DAYS};
use crate::render::Renderer;
use crate::synth::{ServiceKind, StageDescriptor, Synthesizer};

/// Who gets the mail and how it is titled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    pub to: Vec<String>,
    pub subject_label: String,
    pub subject_tagline: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub items: usize,
    /// (stage, characters)
    pub artifacts: Vec<(String, usize)>,
    /// Retrieval and synthesis tokens together.
    pub usage: Usage,
    pub cost: CostEstimate,
    pub subject: String,
    pub receipt: DeliveryReceipt,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Delivered(RunReport),
    /// The run ended early without error and without mail.
    Skipped { reason: String },
}

pub struct Pipeline {
    collector: Collector,
    synthesizer: Synthesizer,
    stages: Vec<StageDescriptor>,
    renderer: Renderer,
    dispatcher: Dispatcher,
    envelope: Envelope,
    days: u32,
    capacity: usize,
    archive: Option<Arc<dyn ArchiveSink>>,
    cost: CostConfig,
}

fn abort(stage: &'static str) -> impl Fn(PipelineError) -> PipelineError {
    move |e| {
        error!(target: "pipeline", stage, error = %e, "run aborted");
        e
    }
}

impl Pipeline {
    pub fn new(
        collector: Collector,
        synthesizer: Synthesizer,
        stages: Vec<StageDescriptor>,
        dispatcher: Dispatcher,
        envelope: Envelope,
    ) -> Self {
        Self {
            collector,
            synthesizer,
            stages,
            renderer: Renderer::default(),
            dispatcher,
            envelope,
            days: DEFAULT_DAYS,
            capacity: DEFAULT_CAPACITY,
            archive: None,
            cost: CostConfig::default(),
        }
    }

    pub fn with_filter(mut self, days: u32, capacity: usize) -> Self {
        self.days = days;
        self.capacity = capacity;
        self
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_archive(mut self, archive: Arc<dyn ArchiveSink>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_cost(mut self, cost: CostConfig) -> Self {
        self.cost = cost;
        self
    }

    /// Builds every component from `cfg`. Meant to be called once per run.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let http = build_http_client(Duration::from_secs(cfg.endpoints.http_timeout_secs))
            .map_err(|e| PipelineError::config(format!("http client: {e}")))?;

        let stages = cfg.stages();
        let mut synthesizer = Synthesizer::new();
        for stage in &stages {
            if synthesizer.has_service(stage.service) {
                continue;
            }
            let key = require_key(cfg, stage.service)?;
            let base = cfg.endpoint(stage.service);
            let service: crate::ai::DynCompletionService = match stage.service {
                ServiceKind::OpenAi => Arc::new(ChatCompletionsClient::openai(base, key, http.clone())),
                ServiceKind::Perplexity => {
                    Arc::new(ChatCompletionsClient::perplexity(base, key, http.clone()))
                }
                ServiceKind::Anthropic => Arc::new(MessagesClient::new(base, key, http.clone())),
            };
            synthesizer = synthesizer.with_service(stage.service, service);
        }

        let collector = Collector::new(build_providers(cfg, &http)?);

        let transport: Box<dyn crate::dispatch::MailTransport> = match cfg.delivery.transport {
            TransportKind::Resend => {
                let key = &cfg.credentials.resend_api_key;
                if key.is_empty() {
                    return Err(PipelineError::config("RESEND_API_KEY is not set"));
                }
                Box::new(ResendTransport::new(&cfg.endpoints.resend, key, http.clone()))
            }
            TransportKind::Smtp => {
                let d = &cfg.delivery;
                if d.smtp_host.is_empty() || d.smtp_user.is_empty() || d.smtp_pass.is_empty() {
                    return Err(PipelineError::config("SMTP_HOST / SMTP_USER / SMTP_PASS must be set"));
                }
                Box::new(SmtpTransport::new(&d.smtp_host, &d.smtp_user, &d.smtp_pass)?)
            }
        };

        let d = &cfg.delivery;
        if d.from.is_empty() {
            return Err(PipelineError::config("sender address missing (EMAIL_FROM)"));
        }
        if d.to.is_empty() {
            return Err(PipelineError::config("recipient address missing (EMAIL_TO)"));
        }
        let envelope = Envelope {
            from: d.from.clone(),
            to: d.to.clone(),
            subject_label: d.subject_label.clone(),
            subject_tagline: d.subject_tagline.clone(),
        };

        let mut pipeline = Pipeline::new(
            collector,
            synthesizer,
            stages,
            Dispatcher::new(transport),
            envelope,
        )
        .with_filter(cfg.filter.days, cfg.filter.capacity)
        .with_renderer(Renderer::new(cfg.render.clone()))
        .with_cost(cfg.cost.clone());
        if cfg.archive.enabled {
            pipeline = pipeline.with_archive(Arc::new(FileArchive::new(&cfg.archive.dir)));
        }

        info!(
            target: "pipeline",
            preset = ?cfg.preset,
            providers = ?pipeline.collector.provider_names(),
            stages = ?pipeline.stages.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            transport = pipeline.dispatcher.transport_name(),
            "pipeline configured"
        );
        Ok(pipeline)
    }

    pub async fn run_once(&self) -> Result<RunOutcome> {
        let t0 = std::time::Instant::now();
        crate::ensure_metrics_described();

        let items = self.collector.collect().await.map_err(abort("collect"))?;
        let collected = items.len();
        let recent = filter_recent(items, self.days, self.capacity);
        info!(target: "pipeline", collected, recent = recent.len(), "items filtered");
        if recent.is_empty() {
            info!(target: "pipeline", "no recent items, nothing to write");
            return Ok(RunOutcome::Skipped {
                reason: "no recent items".into(),
            });
        }

        let artifacts = self
            .synthesizer
            .synthesize_traced(&recent, &self.stages)
            .await
            .map_err(abort("synthesize"))?;
        let Some(final_artifact) = artifacts.last() else {
            return Err(abort("synthesize")(PipelineError::config(
                "no synthesis stages configured",
            )));
        };

        let document = self.renderer.render(&final_artifact.text, &source_urls(&recent));

        let spend = self.collector.usage();
        let cost = estimate_cost(&spend, &artifacts, &self.cost.prices);
        log_cost(&cost, self.cost.fx_rate, &self.cost.fx_currency);

        let now = Local::now();
        if let Some(archive) = &self.archive {
            let record = RunRecord::new(now, &recent, &artifacts, cost.clone());
            if let Err(e) = archive.store(&record).await {
                warn!(target: "pipeline", error = ?e, "archive failed, continuing");
            }
        }

        let subject = compose_subject(
            &self.envelope.subject_label,
            &self.envelope.subject_tagline,
            now.date_naive(),
        );
        let receipt = self
            .dispatcher
            .deliver(&document, &subject, &self.envelope.to, &self.envelope.from)
            .await;
        if receipt.skipped {
            return Ok(RunOutcome::Skipped {
                reason: receipt.error_detail.unwrap_or_default(),
            });
        }
        if !receipt.success {
            let detail = receipt.error_detail.unwrap_or_else(|| "unknown".into());
            return Err(abort("dispatch")(PipelineError::Delivery(detail)));
        }

        let usage = spend
            .iter()
            .map(|s| s.usage)
            .chain(artifacts.iter().filter_map(|a| a.usage))
            .fold(Usage::default(), |acc, u| Usage {
                prompt_tokens: acc.prompt_tokens + u.prompt_tokens,
                completion_tokens: acc.completion_tokens + u.completion_tokens,
            });
        info!(
            target: "pipeline",
            elapsed_ms = t0.elapsed().as_millis() as u64,
            tokens = usage.total(),
            "run complete"
        );

        Ok(RunOutcome::Delivered(RunReport {
            items: recent.len(),
            artifacts: artifacts
                .iter()
                .map(|a| (a.stage.clone(), a.text.chars().count()))
                .collect(),
            usage,
            cost,
            subject,
            receipt,
        }))
    }
}

fn require_key(cfg: &AppConfig, kind: ServiceKind) -> Result<&str> {
    let key = cfg.api_key(kind);
    if key.is_empty() {
        let var = match kind {
            ServiceKind::OpenAi => "OPENAI_API_KEY",
            ServiceKind::Anthropic => "ANTHROPIC_API_KEY",
            ServiceKind::Perplexity => "PERPLEXITY_API_KEY",
        };
        return Err(PipelineError::config(format!("{var} is not set")));
    }
    Ok(key)
}

fn build_providers(cfg: &AppConfig, http: &reqwest::Client) -> Result<Vec<Box<dyn SourceProvider>>> {
    let mut providers: Vec<Box<dyn SourceProvider>> = Vec::new();
    for url in cfg.feeds() {
        providers.push(Box::new(
            FeedProvider::from_url(&url, http.clone()).with_limit(cfg.sources.per_feed_limit),
        ));
    }
    if cfg.hacker_news_enabled() {
        providers.push(Box::new(
            HackerNewsProvider::new(&cfg.endpoints.hacker_news, http.clone())
                .with_top_n(cfg.sources.hn_top),
        ));
    }
    if cfg.retrieval_enabled() {
        let key = require_key(cfg, ServiceKind::Perplexity)?;
        let retrieval_http =
            build_http_client(Duration::from_secs(cfg.sources.retrieval_timeout_secs))
                .map_err(|e| PipelineError::config(format!("http client: {e}")))?;
        let service = Arc::new(ChatCompletionsClient::perplexity(
            cfg.endpoint(ServiceKind::Perplexity),
            key,
            retrieval_http,
        ));
        providers.push(Box::new(RetrievalProvider::new(
            service,
            &cfg.sources.retrieval_model,
            &cfg.sources.retrieval_prompt,
        )));
    }
    if providers.is_empty() {
        return Err(PipelineError::config("no sources configured"));
    }
    Ok(providers)
}
