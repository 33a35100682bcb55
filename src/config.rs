// src/config.rs
//! Run configuration: TOML file + environment.
//!
//! Lookup order: `$DIGEST_CONFIG_PATH`, then `config/digest.toml`, then built-in
//! defaults. Secrets set to `"ENV"` (the default) are read from the environment once,
//! at load time.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::ai::anthropic::ANTHROPIC_BASE;
use crate::ai::chat::{OPENAI_BASE, PERPLEXITY_BASE};
use crate::collect::providers::feed::DEFAULT_PER_FEED_LIMIT;
use crate::collect::providers::hacker_news::{DEFAULT_HN_BASE, DEFAULT_TOP_N};
use crate::collect::providers::retrieval::{DEFAULT_RETRIEVAL_MODEL, DEFAULT_RETRIEVAL_PROMPT};
use crate::cost::ModelPrice;
use crate::dispatch::resend::RESEND_BASE;
use crate::filter::{DEFAULT_CAPACITY, DEFAULT_DAYS};
use crate::render::RenderOptions;
use crate::synth::presets::Preset;
use crate::synth::{ServiceKind, StageDescriptor};

pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/digest.toml";
const ENV_SENTINEL: &str = "ENV";

pub const DEFAULT_FEEDS: [&str; 5] = [
    "https://techcrunch.com/feed/",
    "https://www.theverge.com/rss/index.xml",
    "https://feeds.feedburner.com/TechCrunch/startups",
    "https://www.wired.com/feed/rss",
    "https://feeds.arstechnica.com/arstechnica/technology-lab",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub preset: Preset,
    pub sources: SourcesConfig,
    pub filter: FilterConfig,
    /// Replaces the preset's stages when non-empty.
    pub stages: Vec<StageDescriptor>,
    pub render: RenderOptions,
    pub delivery: DeliveryConfig,
    pub endpoints: Endpoints,
    pub credentials: Credentials,
    pub schedule: ScheduleConfig,
    pub cost: CostConfig,
    pub archive: ArchiveConfig,
}

/// `None` fields fall back to the preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub feeds: Option<Vec<String>>,
    pub per_feed_limit: usize,
    pub hacker_news: Option<bool>,
    pub hn_top: usize,
    pub retrieval: Option<bool>,
    pub retrieval_model: String,
    pub retrieval_prompt: String,
    pub retrieval_timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            feeds: None,
            per_feed_limit: DEFAULT_PER_FEED_LIMIT,
            hacker_news: None,
            hn_top: DEFAULT_TOP_N,
            retrieval: None,
            retrieval_model: DEFAULT_RETRIEVAL_MODEL.into(),
            retrieval_prompt: DEFAULT_RETRIEVAL_PROMPT.into(),
            retrieval_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub days: u32,
    pub capacity: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            days: DEFAULT_DAYS,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Resend,
    Smtp,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub transport: TransportKind,
    pub subject_label: String,
    pub subject_tagline: String,
    /// Empty: `$EMAIL_FROM`.
    pub from: String,
    /// Empty: `$EMAIL_TO`, comma separated.
    pub to: Vec<String>,
    pub smtp_host: String,
    pub smtp_user: String,
    pub smtp_pass: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Resend,
            subject_label: "IT Trend Deep Dive".into(),
            subject_tagline: "Tech insights you should not miss today".into(),
            from: String::new(),
            to: Vec::new(),
            smtp_host: ENV_SENTINEL.into(),
            smtp_user: ENV_SENTINEL.into(),
            smtp_pass: ENV_SENTINEL.into(),
        }
    }
}

impl std::fmt::Debug for DeliveryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryConfig")
            .field("transport", &self.transport)
            .field("subject_label", &self.subject_label)
            .field("subject_tagline", &self.subject_tagline)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_pass_len", &self.smtp_pass.len())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub openai: String,
    pub anthropic: String,
    pub perplexity: String,
    pub resend: String,
    pub hacker_news: String,
    pub http_timeout_secs: u64,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            openai: OPENAI_BASE.into(),
            anthropic: ANTHROPIC_BASE.into(),
            perplexity: PERPLEXITY_BASE.into(),
            resend: RESEND_BASE.into(),
            hacker_news: DEFAULT_HN_BASE.into(),
            http_timeout_secs: 120,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub openai_api_key: String,
    pub anthropic_api_key: String,
    pub perplexity_api_key: String,
    pub resend_api_key: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            openai_api_key: ENV_SENTINEL.into(),
            anthropic_api_key: ENV_SENTINEL.into(),
            perplexity_api_key: ENV_SENTINEL.into(),
            resend_api_key: ENV_SENTINEL.into(),
        }
    }
}

// Key lengths only, never the keys.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key_len", &self.openai_api_key.len())
            .field("anthropic_api_key_len", &self.anthropic_api_key.len())
            .field("perplexity_api_key_len", &self.perplexity_api_key.len())
            .field("resend_api_key_len", &self.resend_api_key.len())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Local wall-clock time, `HH:MM`.
    pub at: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { at: "09:00".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// USD per 1K tokens, keyed by model id.
    pub prices: BTreeMap<String, ModelPrice>,
    /// Local currency per USD; 0 disables the conversion in logs.
    pub fx_rate: f64,
    pub fx_currency: String,
}

impl Default for CostConfig {
    fn default() -> Self {
        let mut prices = BTreeMap::new();
        prices.insert("gpt-4o-mini".into(), ModelPrice::new(0.000_15, 0.000_6));
        prices.insert("gpt-3.5-turbo-16k".into(), ModelPrice::new(0.001, 0.002));
        prices.insert("claude-3-haiku-20240307".into(), ModelPrice::new(0.000_25, 0.001_25));
        prices.insert("sonar".into(), ModelPrice::new(0.001, 0.001));
        Self {
            prices,
            fx_rate: 1350.0,
            fx_currency: "KRW".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("archive"),
        }
    }
}

/// `"ENV"` (any case) reads `var`; anything else is taken literally.
fn resolve_secret(value: &mut String, var: &str) {
    if value.trim().eq_ignore_ascii_case(ENV_SENTINEL) {
        *value = env::var(var).unwrap_or_default().trim().to_string();
    }
}

fn split_addresses(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl AppConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: AppConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg.resolve_env())
    }

    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from(&default_path);
        }
        Ok(Self::default().resolve_env())
    }

    /// Replaces `"ENV"` secrets and blank addresses with environment values.
    pub fn resolve_env(mut self) -> Self {
        let c = &mut self.credentials;
        resolve_secret(&mut c.openai_api_key, "OPENAI_API_KEY");
        resolve_secret(&mut c.anthropic_api_key, "ANTHROPIC_API_KEY");
        resolve_secret(&mut c.perplexity_api_key, "PERPLEXITY_API_KEY");
        resolve_secret(&mut c.resend_api_key, "RESEND_API_KEY");

        let d = &mut self.delivery;
        resolve_secret(&mut d.smtp_host, "SMTP_HOST");
        resolve_secret(&mut d.smtp_user, "SMTP_USER");
        resolve_secret(&mut d.smtp_pass, "SMTP_PASS");
        if d.from.trim().is_empty() {
            d.from = env::var("EMAIL_FROM").unwrap_or_default().trim().to_string();
        }
        if d.to.is_empty() {
            d.to = split_addresses(&env::var("EMAIL_TO").unwrap_or_default());
        }
        self
    }

    pub fn stages(&self) -> Vec<StageDescriptor> {
        if self.stages.is_empty() {
            self.preset.stages()
        } else {
            self.stages.clone()
        }
    }

    pub fn feeds(&self) -> Vec<String> {
        match (&self.sources.feeds, self.preset) {
            (Some(f), _) => f.clone(),
            (None, Preset::FeedDigest) => DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            (None, Preset::SearchDigest) => Vec::new(),
        }
    }

    pub fn hacker_news_enabled(&self) -> bool {
        self.sources
            .hacker_news
            .unwrap_or(self.preset == Preset::FeedDigest)
    }

    pub fn retrieval_enabled(&self) -> bool {
        self.sources
            .retrieval
            .unwrap_or(self.preset == Preset::SearchDigest)
    }

    pub fn api_key(&self, kind: ServiceKind) -> &str {
        match kind {
            ServiceKind::OpenAi => &self.credentials.openai_api_key,
            ServiceKind::Anthropic => &self.credentials.anthropic_api_key,
            ServiceKind::Perplexity => &self.credentials.perplexity_api_key,
        }
    }

    pub fn endpoint(&self, kind: ServiceKind) -> &str {
        match kind {
            ServiceKind::OpenAi => &self.endpoints.openai,
            ServiceKind::Anthropic => &self.endpoints.anthropic,
            ServiceKind::Perplexity => &self.endpoints.perplexity,
        }
    }
}
