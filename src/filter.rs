// src/filter.rs
//! Recency filter: keep items newer than `now - days`, then cap positionally.

use chrono::{DateTime, Duration, Utc};

use crate::collect::types::{CandidateItem, SourceSet};

pub const DEFAULT_DAYS: u32 = 1;
pub const DEFAULT_CAPACITY: usize = 10;

/// `now - days`, saturating at the earliest representable instant.
pub fn cutoff(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(days))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Filter against the wall clock.
pub fn filter_recent(items: Vec<CandidateItem>, days: u32, capacity: usize) -> SourceSet {
    filter_recent_at(Utc::now(), items, days, capacity)
}

/// Keeps items published strictly after the cutoff, in input order; items without a
/// usable timestamp are dropped. The first `capacity` survivors win, whatever source
/// they came from.
pub fn filter_recent_at(
    now: DateTime<Utc>,
    items: Vec<CandidateItem>,
    days: u32,
    capacity: usize,
) -> SourceSet {
    let cut = cutoff(now, days);
    let total = items.len();

    let kept: SourceSet = items
        .into_iter()
        .filter(|it| {
            it.published_at
                .and_then(|p| p.resolve())
                .is_some_and(|t| t > cut)
        })
        .take(capacity)
        .collect();

    tracing::debug!(total, kept = kept.len(), %cut, "recency filter applied");
    kept
}
