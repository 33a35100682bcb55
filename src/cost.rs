// src/cost.rs
//! Rough spend estimate from token usage. Logging only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::ai::Usage;
use crate::collect::types::SourceUsage;
use crate::synth::SynthesisArtifact;

/// USD per 1K tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ModelPrice {
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
}

impl ModelPrice {
    pub fn new(prompt_per_1k: f64, completion_per_1k: f64) -> Self {
        Self {
            prompt_per_1k,
            completion_per_1k,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CostEstimate {
    /// (stage or source, USD); entries without usage or price are left out.
    pub per_stage: Vec<(String, f64)>,
    pub total_usd: f64,
}

impl CostEstimate {
    fn add(&mut self, label: &str, model: &str, usage: Usage, prices: &BTreeMap<String, ModelPrice>) {
        let Some(price) = prices.get(model) else {
            return;
        };
        let usd = (usage.prompt_tokens as f64 * price.prompt_per_1k
            + usage.completion_tokens as f64 * price.completion_per_1k)
            / 1000.0;
        self.per_stage.push((label.to_string(), usd));
        self.total_usd += usd;
    }

    pub fn monthly_usd(&self) -> f64 {
        self.total_usd * 30.0
    }
}

/// Source spend first, then each stage in run order.
pub fn estimate_cost(
    sources: &[SourceUsage],
    artifacts: &[SynthesisArtifact],
    prices: &BTreeMap<String, ModelPrice>,
) -> CostEstimate {
    let mut est = CostEstimate::default();
    for s in sources {
        est.add(&s.label, &s.model, s.usage, prices);
    }
    for a in artifacts {
        if let Some(usage) = a.usage {
            est.add(&a.stage, &a.model, usage, prices);
        }
    }
    est
}

pub fn log_cost(est: &CostEstimate, fx_rate: f64, fx_currency: &str) {
    for (stage, usd) in &est.per_stage {
        info!(target: "cost", %stage, usd = %format!("{usd:.4}"), "stage cost estimate");
    }
    if fx_rate > 0.0 {
        info!(
            target: "cost",
            total_usd = %format!("{:.4}", est.total_usd),
            monthly_usd = %format!("{:.2}", est.monthly_usd()),
            local = %format!("{:.0} {fx_currency}", est.total_usd * fx_rate),
            "run cost estimate"
        );
    } else {
        info!(
            target: "cost",
            total_usd = %format!("{:.4}", est.total_usd),
            monthly_usd = %format!("{:.2}", est.monthly_usd()),
            "run cost estimate"
        );
    }
}
