//! Outcome ledger written after every generation run.

use crate::backend::GenerationAction;
use crate::error::CodegenError;
use chrono::{DateTime, Utc};
use metasync_kernel::{Gap, GapKind, write_atomic};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

/// Lifecycle of one gap inside a run. Nothing persists across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapState {
    /// Found by the scanner; not generatable, or not yet scheduled.
    Detected,
    Queued,
    Generating,
    Resolved,
    Failed,
    /// Existing file without a usable generated region; needs a human.
    Blocked,
}

impl GapState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GapState::Detected => "detected",
            GapState::Queued => "queued",
            GapState::Generating => "generating",
            GapState::Resolved => "resolved",
            GapState::Failed => "failed",
            GapState::Blocked => "blocked",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GapState::Resolved | GapState::Failed | GapState::Blocked)
    }
}

/// What happened to one gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapOutcome {
    pub gap_id: String,
    pub kind: GapKind,
    pub meta_type: String,
    pub meta_file: String,
    pub target_file: String,
    pub state: GapState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<GenerationAction>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// sha256 of the bytes written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_sha256: Option<String>,
}

impl GapOutcome {
    pub fn from_gap(gap: &Gap, state: GapState) -> Self {
        Self {
            gap_id: gap.id.clone(),
            kind: gap.kind,
            meta_type: gap.meta_type.clone(),
            meta_file: gap.meta_file.clone(),
            target_file: gap.target_file.clone(),
            state,
            action: None,
            attempts: 0,
            error: None,
            content_sha256: None,
        }
    }

    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.state = GapState::Failed;
        self.error = Some(error.into());
        self
    }

    pub fn blocked(mut self, reason: impl Into<String>) -> Self {
        self.state = GapState::Blocked;
        self.error = Some(reason.into());
        self
    }
}

/// One generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodegenLedger {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub backend: String,
    pub dry_run: bool,
    pub cancelled: bool,
    pub outcomes: Vec<GapOutcome>,
}

impl CodegenLedger {
    pub fn counts_by_state(&self) -> BTreeMap<GapState, usize> {
        let mut counts = BTreeMap::new();
        for outcome in &self.outcomes {
            *counts.entry(outcome.state).or_insert(0) += 1;
        }
        counts
    }

    pub fn write(&self, path: &Path) -> Result<(), CodegenError> {
        let ledger_error = |message: String| CodegenError::Ledger {
            path: path.display().to_string(),
            message,
        };
        let mut rendered =
            serde_json::to_string_pretty(self).map_err(|err| ledger_error(err.to_string()))?;
        rendered.push('\n');
        write_atomic(path, rendered.as_bytes()).map_err(|err| ledger_error(err.to_string()))
    }
}

pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_lowercase_hex_sha256() {
        assert_eq!(
            content_digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn ledger_round_trips_through_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();
        let ledger = CodegenLedger {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            backend: "scaffold".to_string(),
            dry_run: false,
            cancelled: false,
            outcomes: vec![GapOutcome {
                gap_id: "gap-0001".to_string(),
                kind: GapKind::MissingDoc,
                meta_type: "doc-spec".to_string(),
                meta_file: "docs/guide.meta.yaml".to_string(),
                target_file: "docs/GUIDE.md".to_string(),
                state: GapState::Resolved,
                action: Some(GenerationAction::Create),
                attempts: 1,
                error: None,
                content_sha256: Some(content_digest(b"# Guide\n")),
            }],
        };
        let path = dir.path().join("meta-codegen.json");
        ledger.write(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let loaded: CodegenLedger = serde_json::from_str(&text).unwrap();
        assert_eq!(loaded, ledger);
        assert!(text.contains("\"state\": \"resolved\""));
        assert_eq!(ledger.counts_by_state().get(&GapState::Resolved), Some(&1));
    }
}
