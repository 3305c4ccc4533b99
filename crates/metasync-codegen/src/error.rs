use metasync_scan::ScanError;

/// A single backend call failed. Retried until attempts run out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("backend call timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("failed starting backend `{program}`: {message}")]
    Spawn { program: String, message: String },

    #[error("backend exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("backend produced unusable output: {0}")]
    InvalidOutput(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("cancelled")]
    Cancelled,
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, GenerationError::Cancelled)
    }
}

/// Generated-region delimiters in a target file are missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {message}")]
pub struct MergeConflictError {
    pub path: String,
    pub message: String,
}

/// Run-level failures of a generation run.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("failed writing codegen ledger {path}: {message}")]
    Ledger { path: String, message: String },

    #[error("invalid backend configuration: {0}")]
    Backend(String),
}
