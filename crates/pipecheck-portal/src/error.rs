use pipecheck_kernel::SourceError;

/// Failures constructing a metadata source.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("{path}: I/O error: {message}")]
    Io { path: String, message: String },

    #[error("{path}:{line}: parse error: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    #[error("{path}: {source}")]
    Record { path: String, source: SourceError },
}
