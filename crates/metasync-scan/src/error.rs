use metasync_graph::CycleError;

/// Run-level failures of discovery, scanning, and report I/O.
///
/// Per-document problems never surface here; they become gaps.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("failed walking repository {path}: {message}")]
    Walk { path: String, message: String },

    #[error(transparent)]
    Cycle(#[from] CycleError),

    #[error("failed writing gap report {path}: {message}")]
    WriteReport { path: String, message: String },

    #[error("failed reading gap report {path}: {message}")]
    ReadReport { path: String, message: String },

    #[error("failed rendering gap report: {0}")]
    Render(String),
}

impl ScanError {
    /// Whether the run must stop with the fatal exit code.
    pub fn is_fatal_graph_error(&self) -> bool {
        matches!(self, ScanError::Cycle(_))
    }
}
