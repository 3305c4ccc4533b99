//! Gaps: detected discrepancies between contracts and the filesystem.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Gap classification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    MissingDoc,
    MissingTestFile,
    SchemaViolation,
    InvalidMeta,
    ManualIntervention,
}

impl GapKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GapKind::MissingDoc => "missing_doc",
            GapKind::MissingTestFile => "missing_test_file",
            GapKind::SchemaViolation => "schema_violation",
            GapKind::InvalidMeta => "invalid_meta",
            GapKind::ManualIntervention => "manual_intervention",
        }
    }

    /// Whether the codegen orchestrator may fill this gap.
    pub fn is_generatable(&self) -> bool {
        matches!(self, GapKind::MissingDoc | GapKind::MissingTestFile)
    }
}

impl fmt::Display for GapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured detail carried by a gap. Empty fields are omitted on output.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GapContext {
    /// Human-readable violation for schema and wiring gaps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    /// Verbatim parse or I/O error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Dependency-graph node the gap belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_sections: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_sections: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_behaviors: Vec<String>,
}

impl GapContext {
    pub fn is_empty(&self) -> bool {
        self == &GapContext::default()
    }

    pub fn problem(problem: impl Into<String>) -> Self {
        Self {
            problem: Some(problem.into()),
            ..Self::default()
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// One discrepancy. Never mutated after the report assigns its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gap {
    /// `gap-NNNN`; empty until the report builder numbers it.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub kind: GapKind,
    pub meta_type: String,
    pub meta_file: String,
    pub target_file: String,
    #[serde(default, skip_serializing_if = "GapContext::is_empty")]
    pub context: GapContext,
}

impl Gap {
    pub fn new(
        kind: GapKind,
        meta_type: impl Into<String>,
        meta_file: impl Into<String>,
        target_file: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            kind,
            meta_type: meta_type.into(),
            meta_file: meta_file.into(),
            target_file: target_file.into(),
            context: GapContext::default(),
        }
    }

    pub fn with_context(mut self, context: GapContext) -> Self {
        self.context = context;
        self
    }

    /// Report order: `(meta_file, target_file)`, then kind and context so the
    /// order is total.
    pub fn report_order(&self, other: &Self) -> Ordering {
        (&self.meta_file, &self.target_file, self.kind, &self.context).cmp(&(
            &other.meta_file,
            &other.target_file,
            other.kind,
            &other.context,
        ))
    }

    /// Whether two gaps describe the same discrepancy, ignoring ids.
    pub fn same_discrepancy(&self, other: &Self) -> bool {
        self.report_order(other) == Ordering::Equal && self.meta_type == other.meta_type
    }
}
