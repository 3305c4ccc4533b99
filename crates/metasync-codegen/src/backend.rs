//! Generation backends.

use crate::error::GenerationError;
use async_trait::async_trait;
use metasync_kernel::TargetKind;
use serde::{Deserialize, Serialize};

/// What the orchestrator will do with backend output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationAction {
    /// Target absent; output becomes the whole file.
    Create,
    /// Target present; output replaces the generated region only.
    Merge,
}

impl GenerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationAction::Create => "create",
            GenerationAction::Merge => "merge",
        }
    }
}

/// Everything a backend needs to produce one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub meta_type: String,
    pub meta_file: String,
    pub target_file: String,
    pub target_kind: TargetKind,
    pub action: GenerationAction,
    /// The meta document's fields.
    pub contract_fields: serde_json::Value,
    /// Full current file for `merge`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_content: Option<String>,
    /// Current generated-region body for `merge`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_region: Option<String>,
    /// Sections or behaviours the output must cover.
    pub missing_items: Vec<String>,
}

/// Backend output: whole-file content for `create`, region body for `merge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub content: String,
}

impl GeneratedContent {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Produces content for one request.
///
/// Implementations must be safe to call concurrently; the orchestrator
/// bounds concurrency, applies the timeout, and retries on error.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Name recorded in the outcome ledger.
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedContent, GenerationError>;
}
