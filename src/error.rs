//! Error taxonomy shared by every stage of the association pipeline.
//!
//! None of these are recovered inside the library. Each variant carries the
//! offending value and the stage that raised it, so a failed run can be
//! diagnosed from the message alone.

use thiserror::Error;

use crate::engine::EngineState;

/// Canonical error type for `hostpath`.
#[derive(Debug, Error)]
pub enum HostPathError {
    /// Bad coordinate string or ellipse parameter string.
    #[error("malformed localization {field} '{input}': {reason}")]
    MalformedLocalization {
        field: &'static str,
        input: String,
        reason: String,
    },

    /// Localization type other than `ellipse`.
    #[error("unsupported localization type '{0}' (only 'ellipse' is implemented)")]
    UnsupportedLocalizationType(String),

    /// No filter policy is registered for the requested survey.
    #[error("no catalog filter policy registered for survey '{0}'")]
    UnsupportedSurvey(String),

    /// Candidate set is empty at a stage that needs at least one row.
    #[error("no candidates left after {stage}")]
    NoCandidates { stage: &'static str },

    /// Engine operation invoked from the wrong state.
    #[error("'{operation}' called out of order: engine is in state {state:?}")]
    OutOfOrderConfiguration {
        operation: &'static str,
        state: EngineState,
    },

    /// Failure reported by a catalog retriever.
    #[error("catalog retrieval from {source_name} failed: {reason}")]
    CatalogRetrieval { source_name: String, reason: String },

    /// Candidate rows that the engine cannot accept as a set.
    #[error("invalid candidate set: {0}")]
    InvalidCandidates(String),

    /// Out-of-range or unknown configuration value.
    #[error("invalid configuration for {parameter}: {reason}")]
    InvalidConfig {
        parameter: &'static str,
        reason: String,
    },

    /// Every hypothesis has zero likelihood, so posteriors are undefined.
    #[error("degenerate likelihood: {0}")]
    DegenerateLikelihood(String),

    /// Output path whose extension is not a delimited tabular format.
    #[error("unsupported output format for '{0}' (expected .csv or .tsv)")]
    UnsupportedOutputFormat(String),

    /// Writing results failed.
    #[error("failed to export results to {path}: {reason}")]
    Export { path: String, reason: String },
}

impl HostPathError {
    pub(crate) fn malformed(
        field: &'static str,
        input: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        HostPathError::MalformedLocalization {
            field,
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_config(parameter: &'static str, reason: impl Into<String>) -> Self {
        HostPathError::InvalidConfig {
            parameter,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HostPathError>;
