//! Canonical contract-kind → schema registry.
//!
//! This module is the single authority for what each `type` discriminator
//! requires and which artifacts it resolves to.

use crate::contract::{
    ContractKind, ContractSchema, DependsOn, GraphDeclaration, TargetSpec, WiringDeclaration,
};
use crate::error::InvalidMetaError;
use crate::meta::MetaDocument;
use crate::paths::resolve_declared;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DEFAULT_README: &str = "README.md";

/// Row of the `metasync contracts` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractSummary {
    pub kind: ContractKind,
    pub required_fields: Vec<&'static str>,
    pub declares_dependencies: bool,
}

/// Registered schema handlers, one per contract kind.
#[derive(Default)]
pub struct ContractRegistry {
    schemas: BTreeMap<ContractKind, Box<dyn ContractSchema>>,
}

impl std::fmt::Debug for ContractRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractRegistry")
            .field("kinds", &self.schemas.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ContractRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in contract kind.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ReadmeSchema {
            kind: ContractKind::RootReadme,
            required: &[],
        });
        registry.register(ReadmeSchema {
            kind: ContractKind::SubsystemReadme,
            required: &["subsystem"],
        });
        registry.register(ReadmeSchema {
            kind: ContractKind::ComponentReadme,
            required: &["component"],
        });
        registry.register(DocSpecSchema);
        registry.register(TestSpecSchema(ContractKind::UnitTestSpec));
        registry.register(TestSpecSchema(ContractKind::IntegrationTestSpec));
        registry.register(TestSpecSchema(ContractKind::E2eTestSpec));
        registry.register(TestSpecSchema(ContractKind::SubsystemTestSpec));
        registry.register(ModuleMetaSchema);
        registry.register(WiringContractSchema);
        registry.register(SchemaExtractionSchema);
        registry
    }

    /// Register a handler, replacing any previous handler for the same kind.
    pub fn register<S: ContractSchema + 'static>(
        &mut self,
        schema: S,
    ) -> Option<Box<dyn ContractSchema>> {
        self.schemas.insert(schema.kind(), Box::new(schema))
    }

    pub fn get(&self, kind: ContractKind) -> Option<&dyn ContractSchema> {
        self.schemas.get(&kind).map(|schema| schema.as_ref())
    }

    /// Map a `type` string to a registered kind. Never guesses.
    pub fn classify(&self, type_name: &str) -> Option<ContractKind> {
        type_name
            .parse::<ContractKind>()
            .ok()
            .filter(|kind| self.schemas.contains_key(kind))
    }

    pub fn kinds(&self) -> impl Iterator<Item = ContractKind> + '_ {
        self.schemas.keys().copied()
    }

    pub fn summaries(&self) -> Vec<ContractSummary> {
        self.schemas
            .values()
            .map(|schema| ContractSummary {
                kind: schema.kind(),
                required_fields: schema.required_fields().to_vec(),
                declares_dependencies: schema.declares_dependencies(),
            })
            .collect()
    }

    fn schema_for(&self, doc: &MetaDocument) -> Result<&dyn ContractSchema, InvalidMetaError> {
        let Some(kind) = doc.kind else {
            return Err(match &doc.type_name {
                Some(type_name) => InvalidMetaError::UnknownType {
                    path: doc.path.clone(),
                    type_name: type_name.clone(),
                },
                None => InvalidMetaError::MissingType {
                    path: doc.path.clone(),
                },
            });
        };
        self.get(kind).ok_or_else(|| InvalidMetaError::UnknownType {
            path: doc.path.clone(),
            type_name: kind.as_str().to_string(),
        })
    }

    /// Check every required field is present and non-null.
    pub fn validate(&self, doc: &MetaDocument) -> Result<(), InvalidMetaError> {
        let schema = self.schema_for(doc)?;
        for field in schema.required_fields() {
            if !doc.has_field(field) {
                return Err(InvalidMetaError::MissingField {
                    path: doc.path.clone(),
                    field: (*field).to_string(),
                });
            }
        }
        Ok(())
    }

    /// Validate, then resolve the artifacts `doc` demands.
    pub fn resolve_targets(&self, doc: &MetaDocument) -> Result<Vec<TargetSpec>, InvalidMetaError> {
        self.validate(doc)?;
        self.schema_for(doc)?.resolve_targets(doc)
    }

    /// The dependency-graph node `doc` declares, if its kind declares any.
    pub fn graph_declaration(
        &self,
        doc: &MetaDocument,
    ) -> Result<Option<GraphDeclaration>, InvalidMetaError> {
        let schema = self.schema_for(doc)?;
        if !schema.declares_dependencies() {
            return Ok(None);
        }
        self.validate(doc)?;
        schema.graph_declaration(doc)
    }

    pub fn declares_dependencies(&self, kind: ContractKind) -> bool {
        self.get(kind)
            .map(|schema| schema.declares_dependencies())
            .unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
struct DocFields {
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    required_sections: Vec<String>,
}

struct ReadmeSchema {
    kind: ContractKind,
    required: &'static [&'static str],
}

impl ContractSchema for ReadmeSchema {
    fn kind(&self) -> ContractKind {
        self.kind
    }

    fn required_fields(&self) -> &'static [&'static str] {
        self.required
    }

    fn resolve_targets(&self, doc: &MetaDocument) -> Result<Vec<TargetSpec>, InvalidMetaError> {
        let fields: DocFields = doc.decode()?;
        let declared = fields.target.as_deref().unwrap_or(DEFAULT_README);
        let target = resolve_declared(&doc.path, declared)?;
        Ok(vec![TargetSpec::doc(target, fields.required_sections)])
    }
}

struct DocSpecSchema;

impl ContractSchema for DocSpecSchema {
    fn kind(&self) -> ContractKind {
        ContractKind::DocSpec
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["target"]
    }

    fn resolve_targets(&self, doc: &MetaDocument) -> Result<Vec<TargetSpec>, InvalidMetaError> {
        let fields: DocFields = doc.decode()?;
        let declared = fields
            .target
            .ok_or_else(|| InvalidMetaError::MissingField {
                path: doc.path.clone(),
                field: "target".to_string(),
            })?;
        let target = resolve_declared(&doc.path, &declared)?;
        Ok(vec![TargetSpec::doc(target, fields.required_sections)])
    }
}

#[derive(Debug, Deserialize)]
struct TestFields {
    target: String,
    #[serde(default)]
    required_behaviors: Vec<String>,
}

struct TestSpecSchema(ContractKind);

impl ContractSchema for TestSpecSchema {
    fn kind(&self) -> ContractKind {
        self.0
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["target"]
    }

    fn resolve_targets(&self, doc: &MetaDocument) -> Result<Vec<TargetSpec>, InvalidMetaError> {
        let fields: TestFields = doc.decode()?;
        let target = resolve_declared(&doc.path, &fields.target)?;
        Ok(vec![TargetSpec::test(target, fields.required_behaviors)])
    }
}

#[derive(Debug, Deserialize)]
struct ModuleDocs {
    readme: String,
    #[serde(default)]
    required_sections: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ModuleTest {
    path: String,
    #[serde(default)]
    behaviors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ModuleMetaFields {
    id: String,
    #[serde(default)]
    depends_on: DependsOn,
    #[serde(default)]
    docs: Option<ModuleDocs>,
    #[serde(default)]
    tests: Vec<ModuleTest>,
}

struct ModuleMetaSchema;

impl ContractSchema for ModuleMetaSchema {
    fn kind(&self) -> ContractKind {
        ContractKind::ModuleMeta
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["id"]
    }

    fn resolve_targets(&self, doc: &MetaDocument) -> Result<Vec<TargetSpec>, InvalidMetaError> {
        let fields: ModuleMetaFields = doc.decode()?;
        let mut targets = Vec::new();
        if let Some(docs) = fields.docs {
            let target = resolve_declared(&doc.path, &docs.readme)?;
            targets.push(TargetSpec::doc(target, docs.required_sections));
        }
        for test in fields.tests {
            let target = resolve_declared(&doc.path, &test.path)?;
            targets.push(TargetSpec::test(target, test.behaviors));
        }
        Ok(targets)
    }

    fn declares_dependencies(&self) -> bool {
        true
    }

    fn graph_declaration(
        &self,
        doc: &MetaDocument,
    ) -> Result<Option<GraphDeclaration>, InvalidMetaError> {
        let fields: ModuleMetaFields = doc.decode()?;
        Ok(Some(GraphDeclaration {
            id: fields.id.trim().to_string(),
            meta_file: doc.path.clone(),
            meta_type: self.kind().as_str().to_string(),
            depends_on: fields.depends_on,
        }))
    }
}

struct WiringContractSchema;

impl ContractSchema for WiringContractSchema {
    fn kind(&self) -> ContractKind {
        ContractKind::WiringContract
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["module"]
    }

    fn resolve_targets(&self, doc: &MetaDocument) -> Result<Vec<TargetSpec>, InvalidMetaError> {
        let fields: WiringDeclaration = doc.decode()?;
        let mut targets = vec![TargetSpec::wiring(doc.path.clone())];
        for test in &fields.negative_tests {
            let target = resolve_declared(&doc.path, test)?;
            targets.push(TargetSpec::test(
                target,
                vec![format!("{} rejects unapproved calls", fields.module)],
            ));
        }
        Ok(targets)
    }
}

#[derive(Debug, Deserialize)]
struct SchemaExtractionFields {
    id: String,
    output: String,
    #[serde(default)]
    required_sections: Vec<String>,
    #[serde(default)]
    depends_on: DependsOn,
}

struct SchemaExtractionSchema;

impl ContractSchema for SchemaExtractionSchema {
    fn kind(&self) -> ContractKind {
        ContractKind::SchemaExtractionContract
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["id", "output"]
    }

    fn resolve_targets(&self, doc: &MetaDocument) -> Result<Vec<TargetSpec>, InvalidMetaError> {
        let fields: SchemaExtractionFields = doc.decode()?;
        let target = resolve_declared(&doc.path, &fields.output)?;
        Ok(vec![TargetSpec::doc(target, fields.required_sections)])
    }

    fn declares_dependencies(&self) -> bool {
        true
    }

    fn graph_declaration(
        &self,
        doc: &MetaDocument,
    ) -> Result<Option<GraphDeclaration>, InvalidMetaError> {
        let fields: SchemaExtractionFields = doc.decode()?;
        Ok(Some(GraphDeclaration {
            id: fields.id.trim().to_string(),
            meta_file: doc.path.clone(),
            meta_type: self.kind().as_str().to_string(),
            depends_on: fields.depends_on,
        }))
    }
}
