//! Contract kinds, target specifications, and the schema handler seam.

use crate::error::InvalidMetaError;
use crate::meta::MetaDocument;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of contract kinds, keyed by the `type` discriminator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ContractKind {
    RootReadme,
    SubsystemReadme,
    ComponentReadme,
    DocSpec,
    UnitTestSpec,
    IntegrationTestSpec,
    E2eTestSpec,
    SubsystemTestSpec,
    ModuleMeta,
    WiringContract,
    SchemaExtractionContract,
}

impl ContractKind {
    pub const ALL: [ContractKind; 11] = [
        ContractKind::RootReadme,
        ContractKind::SubsystemReadme,
        ContractKind::ComponentReadme,
        ContractKind::DocSpec,
        ContractKind::UnitTestSpec,
        ContractKind::IntegrationTestSpec,
        ContractKind::E2eTestSpec,
        ContractKind::SubsystemTestSpec,
        ContractKind::ModuleMeta,
        ContractKind::WiringContract,
        ContractKind::SchemaExtractionContract,
    ];

    /// The `type` discriminator string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractKind::RootReadme => "root-readme",
            ContractKind::SubsystemReadme => "subsystem-readme",
            ContractKind::ComponentReadme => "component-readme",
            ContractKind::DocSpec => "doc-spec",
            ContractKind::UnitTestSpec => "unit-test-spec",
            ContractKind::IntegrationTestSpec => "integration-test-spec",
            ContractKind::E2eTestSpec => "e2e-test-spec",
            ContractKind::SubsystemTestSpec => "subsystem-test-spec",
            ContractKind::ModuleMeta => "module-meta",
            ContractKind::WiringContract => "wiring-contract",
            ContractKind::SchemaExtractionContract => "schema-extraction-contract",
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        ContractKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == needle)
            .ok_or_else(|| format!("unknown contract kind: {needle}"))
    }
}

/// What sort of artifact a target is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Doc,
    Test,
    Wiring,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Doc => "doc",
            TargetKind::Test => "test",
            TargetKind::Wiring => "wiring",
        }
    }
}

/// One artifact a contract demands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Repository-relative path.
    pub target_path: String,
    pub target_kind: TargetKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_sections: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_behaviors: Vec<String>,
}

impl TargetSpec {
    pub fn doc(target_path: impl Into<String>, required_sections: Vec<String>) -> Self {
        Self {
            target_path: target_path.into(),
            target_kind: TargetKind::Doc,
            required_sections,
            required_behaviors: Vec::new(),
        }
    }

    pub fn test(target_path: impl Into<String>, required_behaviors: Vec<String>) -> Self {
        Self {
            target_path: target_path.into(),
            target_kind: TargetKind::Test,
            required_sections: Vec::new(),
            required_behaviors,
        }
    }

    pub fn wiring(target_path: impl Into<String>) -> Self {
        Self {
            target_path: target_path.into(),
            target_kind: TargetKind::Wiring,
            required_sections: Vec::new(),
            required_behaviors: Vec::new(),
        }
    }
}

/// `depends_on` block of module and extraction contracts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependsOn {
    #[serde(default)]
    pub hard: Vec<String>,
    #[serde(default)]
    pub soft: Vec<String>,
}

/// A dependency-graph node declared by one meta document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphDeclaration {
    pub id: String,
    pub meta_file: String,
    pub meta_type: String,
    pub depends_on: DependsOn,
}

/// Typed view of a `wiring-contract` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WiringDeclaration {
    pub module: String,
    /// Callable capabilities the module exposes.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Agents the module binds to.
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub memory_segments: Vec<String>,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub approval_adapter: Option<String>,
    /// Negative-path tests exercising the approval denial.
    #[serde(default)]
    pub negative_tests: Vec<String>,
}

/// Handler for one contract kind.
///
/// Registering an implementation in the [`ContractRegistry`](crate::ContractRegistry)
/// is the only step needed to teach the whole pipeline a new kind.
pub trait ContractSchema: Send + Sync {
    fn kind(&self) -> ContractKind;

    /// Top-level fields that must be present and non-null.
    fn required_fields(&self) -> &'static [&'static str];

    /// Resolve the artifacts this document demands. Pure.
    fn resolve_targets(&self, doc: &MetaDocument) -> Result<Vec<TargetSpec>, InvalidMetaError>;

    /// Whether documents of this kind contribute dependency-graph nodes.
    fn declares_dependencies(&self) -> bool {
        false
    }

    /// The graph node this document declares, if any.
    fn graph_declaration(
        &self,
        _doc: &MetaDocument,
    ) -> Result<Option<GraphDeclaration>, InvalidMetaError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_round_trip_through_from_str() {
        for kind in ContractKind::ALL {
            assert_eq!(kind.as_str().parse::<ContractKind>().unwrap(), kind);
        }
    }

    #[test]
    fn serde_names_match_discriminators() {
        let rendered = serde_json::to_string(&ContractKind::E2eTestSpec).unwrap();
        assert_eq!(rendered, "\"e2e-test-spec\"");
        let rendered = serde_json::to_string(&ContractKind::SchemaExtractionContract).unwrap();
        assert_eq!(rendered, "\"schema-extraction-contract\"");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!("api-readme".parse::<ContractKind>().is_err());
    }
}
