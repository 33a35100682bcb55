// src/error.rs
//! Typed failures for one digest run.
//!
//! Collector sub-fetches are isolated by the caller; every other variant aborts the run.

/// Error kinds surfaced by pipeline stages.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Transport failure reaching a source or service.
    #[error("fetch error ({origin}): {message}")]
    Fetch { origin: String, message: String },

    /// A response did not parse into the expected structured shape.
    #[error("data format error: {0}")]
    DataFormat(String),

    /// A completion service failed or returned an unusable completion.
    #[error("generation error in stage `{stage}`: {message}")]
    Generation { stage: String, message: String },

    /// Email submission failed.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Missing credentials or an invalid configuration value.
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn fetch(origin: impl Into<String>, message: impl ToString) -> Self {
        Self::Fetch {
            origin: origin.into(),
            message: message.to_string(),
        }
    }

    pub fn generation(stage: impl Into<String>, message: impl ToString) -> Self {
        Self::Generation {
            stage: stage.into(),
            message: message.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
