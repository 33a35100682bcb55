// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod ai;
pub mod archive;
pub mod collect;
pub mod config;
pub mod cost;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod render;
pub mod schedule;
pub mod synth;

// ---- Re-exports for stable public API ----
pub use crate::collect::types::{CandidateItem, PublishTime, SourceProvider, SourceSet};
pub use crate::collect::Collector;
pub use crate::error::PipelineError;
pub use crate::pipeline::{Pipeline, RunOutcome, RunReport};
pub use crate::render::{render, RenderedDocument, Renderer};
pub use crate::synth::{StageDescriptor, SynthesisArtifact, Synthesizer};

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use tracing::info;

/// One-time metrics registration for every series the crate emits.
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(describe_metrics);
}

fn describe_metrics() {
    describe_counter!("collect_items_total", "Candidate items parsed from providers.");
    describe_counter!(
        "collect_provider_errors_total",
        "Provider fetch/parse errors."
    );
    describe_histogram!("collect_parse_ms", "Provider parse time in milliseconds.");
    describe_histogram!("synth_stage_ms", "Synthesis stage latency in milliseconds.");
    describe_counter!("synth_tokens_total", "Tokens consumed per synthesis stage.");
    describe_counter!("dispatch_total", "Delivery attempts by outcome.");
    describe_counter!("digest_runs_total", "Scheduled runs started.");
    describe_counter!("digest_run_failures_total", "Scheduled runs that ended in error.");
    describe_gauge!("digest_last_run_ts", "Unix time of the last scheduled run.");
}

/// Builds a pipeline from an already loaded config and runs it once.
pub async fn run_from_config(cfg: &config::AppConfig) -> error::Result<RunOutcome> {
    let pipeline = Pipeline::from_config(cfg)?;
    let outcome = pipeline.run_once().await?;
    info!(target: "pipeline", ?outcome, "run finished");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Descriptions(Mutex<Vec<String>>);

    impl Descriptions {
        fn push(&self, key: KeyName) {
            self.0.lock().unwrap().push(key.as_str().to_string());
        }
    }

    impl Recorder for Descriptions {
        fn describe_counter(&self, key: KeyName, _: Option<Unit>, _: SharedString) {
            self.push(key);
        }
        fn describe_gauge(&self, key: KeyName, _: Option<Unit>, _: SharedString) {
            self.push(key);
        }
        fn describe_histogram(&self, key: KeyName, _: Option<Unit>, _: SharedString) {
            self.push(key);
        }
        fn register_counter(&self, _: &Key, _: &Metadata<'_>) -> Counter {
            Counter::noop()
        }
        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }
        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[test]
    fn every_emitted_series_is_described() {
        let recorder = Descriptions::default();
        metrics::with_local_recorder(&recorder, describe_metrics);
        let described = recorder.0.lock().unwrap();
        for name in [
            "collect_items_total",
            "collect_provider_errors_total",
            "collect_parse_ms",
            "synth_stage_ms",
            "synth_tokens_total",
            "dispatch_total",
            "digest_runs_total",
            "digest_run_failures_total",
            "digest_last_run_ts",
        ] {
            assert!(described.iter().any(|d| d == name), "{name} not described");
        }
    }
}
