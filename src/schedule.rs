// src/schedule.rs
use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone};
use metrics::{counter, gauge};

use crate::config::AppConfig;
use crate::error::{PipelineError, Result};
use crate::pipeline::{Pipeline, RunOutcome};

/// Parses `HH:MM` (24h).
pub fn parse_at(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|e| PipelineError::config(format!("invalid schedule time {s:?}: {e}")))
}

/// First instant strictly after `now` whose wall-clock time is `at`.
/// Days where `at` does not exist (DST gap) are skipped.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut day = now.date_naive();
    for _ in 0..3 {
        if let Some(candidate) = day.and_time(at).and_local_timezone(tz.clone()).earliest() {
            if candidate > *now {
                return candidate;
            }
        }
        let Some(next) = day.succ_opt() else { break };
        day = next;
    }
    now.clone() + Duration::days(1)
}

/// Runs the pipeline every day at `cfg.schedule.at` (local time). Never returns
/// unless the schedule itself is invalid; a failed run is logged and the loop waits
/// for the next day.
pub async fn run_daily(cfg: AppConfig) -> Result<()> {
    let at = parse_at(&cfg.schedule.at)?;
    crate::ensure_metrics_described();
    tracing::info!(target: "schedule", at = %at, "daily schedule armed");

    loop {
        let now = Local::now();
        let next = next_run_after(&now, at);
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::info!(target: "schedule", next = %next.to_rfc3339(), wait_secs = wait.as_secs(), "sleeping until next run");
        tokio::time::sleep(wait).await;

        counter!("digest_runs_total").increment(1);
        gauge!("digest_last_run_ts").set(Local::now().timestamp() as f64);

        // Fresh components per tick so key or config changes in the env apply.
        let outcome = match Pipeline::from_config(&cfg) {
            Ok(pipeline) => pipeline.run_once().await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(RunOutcome::Delivered(report)) => {
                tracing::info!(target: "schedule", subject = %report.subject, items = report.items, "scheduled run delivered")
            }
            Ok(RunOutcome::Skipped { reason }) => {
                tracing::info!(target: "schedule", %reason, "scheduled run skipped")
            }
            Err(e) => {
                counter!("digest_run_failures_total").increment(1);
                tracing::error!(target: "schedule", error = %e, "scheduled run failed");
            }
        }
    }
}
