// src/collect/types.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ai::Usage;
use crate::error::{PipelineError, Result};

/// Broken-down UTC time as feeds report it (year, month, day, hour, minute, second).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarTuple {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl CalendarTuple {
    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        use chrono::{Datelike, Timelike};
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
        }
    }

    /// `None` when the tuple does not name a real instant.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)?
            .and_hms_opt(self.hour, self.minute, self.second)
            .map(|naive| naive.and_utc())
    }
}

/// Publish time in either of the shapes sources hand us.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PublishTime {
    Instant(DateTime<Utc>),
    Calendar(CalendarTuple),
}

impl PublishTime {
    pub fn resolve(&self) -> Option<DateTime<Utc>> {
        match self {
            PublishTime::Instant(dt) => Some(*dt),
            PublishTime::Calendar(t) => t.to_utc(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateItem {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published_at: Option<PublishTime>,
    pub source: String, // e.g. "TechCrunch", "Hacker News", "Search"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implications: Option<String>,
}

/// Items in source-arrival order.
pub type SourceSet = Vec<CandidateItem>;

/// Non-empty links of `items`, in order, duplicates kept.
pub fn source_urls(items: &[CandidateItem]) -> Vec<String> {
    items
        .iter()
        .filter(|it| !it.link.trim().is_empty())
        .map(|it| it.link.clone())
        .collect()
}

/// Tokens a provider spent on a completion service during its last fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUsage {
    pub label: String,
    pub model: String,
    pub usage: Usage,
}

#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<CandidateItem>>;

    fn name(&self) -> &str;

    /// Whether `err` should abort the whole collection instead of being isolated.
    fn escalates(&self, _err: &PipelineError) -> bool {
        false
    }

    fn usage(&self) -> Option<SourceUsage> {
        None
    }
}
