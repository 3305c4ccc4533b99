//! Wiring invariants: catalog membership and approval gating.

use metasync_kernel::{
    ContractKind, Gap, GapContext, GapKind, MetaDocument, RunContext, WiringDeclaration,
};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Ids(Vec<String>),
    Entries { entries: Vec<CatalogEntry> },
}

/// One id catalog loaded from the repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    /// Repository-relative path.
    pub path: String,
    pub ids: BTreeSet<String>,
    /// Read or parse failure; the catalog is unusable when set.
    pub error: Option<String>,
}

impl Catalog {
    /// Parse catalog text. Blank text is an empty catalog.
    pub fn parse(path: impl Into<String>, text: &str) -> Self {
        let path = path.into();
        if text.trim().is_empty() {
            return Self {
                path,
                ..Self::default()
            };
        }
        match serde_yaml::from_str::<CatalogFile>(text) {
            Ok(file) => {
                let ids = match file {
                    CatalogFile::Ids(ids) => ids,
                    CatalogFile::Entries { entries } => entries.into_iter().map(|e| e.id).collect(),
                };
                Self {
                    path,
                    ids: ids.into_iter().map(|id| id.trim().to_string()).collect(),
                    error: None,
                }
            }
            Err(err) => Self {
                path,
                ids: BTreeSet::new(),
                error: Some(format!(
                    "expected a list of ids or an `entries` list: {err}"
                )),
            },
        }
    }

    /// Load the catalog at repository-relative `path`; absent means empty.
    pub fn load(ctx: &RunContext, path: &str) -> Self {
        match fs::read_to_string(ctx.repo_path(path)) {
            Ok(text) => Self::parse(path, &text),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path, "catalog absent; treating as empty");
                Self {
                    path: path.to_string(),
                    ..Self::default()
                }
            }
            Err(err) => {
                warn!(path, error = %err, "failed reading catalog");
                Self {
                    path: path.to_string(),
                    ids: BTreeSet::new(),
                    error: Some(err.to_string()),
                }
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id.trim())
    }
}

/// The three catalogs wiring contracts are checked against.
#[derive(Debug, Clone, Default)]
pub struct WiringCatalogs {
    pub capabilities: Catalog,
    pub agents: Catalog,
    pub memory_topology: Catalog,
}

impl WiringCatalogs {
    pub fn load(ctx: &RunContext) -> Self {
        let wiring = &ctx.config.wiring;
        Self {
            capabilities: Catalog::load(ctx, &wiring.capability_registry),
            agents: Catalog::load(ctx, &wiring.agent_catalog),
            memory_topology: Catalog::load(ctx, &wiring.memory_topology),
        }
    }
}

fn violation(doc: &MetaDocument, target_file: &str, problem: String) -> Gap {
    Gap::new(
        GapKind::SchemaViolation,
        ContractKind::WiringContract.as_str(),
        doc.path.clone(),
        target_file,
    )
    .with_context(GapContext::problem(problem))
}

fn check_membership(
    doc: &MetaDocument,
    module: &str,
    refs: &[String],
    catalog: &Catalog,
    noun: &str,
    catalog_name: &str,
    gaps: &mut Vec<Gap>,
) {
    if refs.is_empty() {
        return;
    }
    if let Some(error) = &catalog.error {
        gaps.push(violation(
            doc,
            &catalog.path,
            format!("{catalog_name} {} is unreadable: {error}", catalog.path),
        ));
        return;
    }
    let unique: BTreeSet<&str> = refs.iter().map(|r| r.trim()).collect();
    for id in unique {
        if !catalog.contains(id) {
            gaps.push(violation(
                doc,
                &catalog.path,
                format!("{noun} `{id}` of module `{module}` is not in the {catalog_name}"),
            ));
        }
    }
}

/// Violations of one wiring contract. Never repaired automatically.
pub fn validate_wiring(
    doc: &MetaDocument,
    wiring: &WiringDeclaration,
    catalogs: &WiringCatalogs,
) -> Vec<Gap> {
    let module = wiring.module.trim();
    let mut gaps = Vec::new();
    check_membership(
        doc,
        module,
        &wiring.capabilities,
        &catalogs.capabilities,
        "capability",
        "capability registry",
        &mut gaps,
    );
    check_membership(
        doc,
        module,
        &wiring.agents,
        &catalogs.agents,
        "agent binding",
        "agent catalog",
        &mut gaps,
    );
    check_membership(
        doc,
        module,
        &wiring.memory_segments,
        &catalogs.memory_topology,
        "memory segment",
        "memory topology",
        &mut gaps,
    );

    if wiring.requires_approval {
        let adapter_missing = wiring
            .approval_adapter
            .as_deref()
            .is_none_or(|adapter| adapter.trim().is_empty());
        if adapter_missing {
            gaps.push(violation(
                doc,
                &doc.path,
                format!("module `{module}` requires approval but declares no approval_adapter"),
            ));
        }
        if wiring.negative_tests.is_empty() {
            gaps.push(violation(
                doc,
                &doc.path,
                format!("module `{module}` requires approval but declares no negative_tests"),
            ));
        }
    }
    gaps
}
