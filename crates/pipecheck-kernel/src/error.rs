//! Error types for pipecheck kernel operations.
//!
//! Only infrastructural failures are errors. A record that was fetched and
//! decoded but does not meet an assay's expectations is reported as a
//! [`crate::Discrepancy`], never as an error.

/// Failures at the metadata boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Network failure, or a server error that outlived the retry budget.
    #[error("transport error fetching {id}: {message}")]
    Transport { id: String, message: String },

    /// Credentials were rejected.
    #[error("access denied fetching {id} (status {status})")]
    Unauthorized { id: String, status: u16 },

    /// The identifier does not resolve to a record.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The record arrived but does not decode into the expected shape.
    #[error("malformed record {id}: {message}")]
    Malformed { id: String, message: String },
}

impl SourceError {
    pub fn failure_class(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "source.transport",
            Self::Unauthorized { .. } => "source.unauthorized",
            Self::NotFound(_) => "source.not_found",
            Self::Malformed { .. } => "source.malformed_record",
        }
    }
}

/// Failures that abort evaluation of a single experiment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A record decoded but violates a structural invariant (for example an
    /// experiment without replicates).
    #[error("invalid record {id}: {message}")]
    InvalidRecord { id: String, message: String },
}

impl CheckError {
    pub fn failure_class(&self) -> &'static str {
        match self {
            Self::Source(err) => err.failure_class(),
            Self::InvalidRecord { .. } => "record.invalid",
        }
    }
}
