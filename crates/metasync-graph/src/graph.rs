//! Arena-backed dependency graph.

use metasync_kernel::{Gap, GapContext, GapKind, GraphDeclaration};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// One node: a module or extraction contract and its declared prerequisites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    pub id: String,
    pub meta_file: String,
    pub meta_type: String,
    pub hard_deps: BTreeSet<String>,
    pub soft_deps: BTreeSet<String>,
}

/// Flat node array with index-based adjacency.
///
/// Nodes are stored sorted by id, so index order is lexicographic id order.
/// Built once and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNode>,
    index: BTreeMap<String, usize>,
    hard: Vec<Vec<usize>>,
    soft: Vec<Vec<usize>>,
    dependents: Vec<Vec<usize>>,
}

/// A graph together with the declaration problems found while building it.
#[derive(Debug, Clone, Default)]
pub struct GraphBuild {
    pub graph: DependencyGraph,
    pub gaps: Vec<Gap>,
}

impl DependencyGraph {
    /// Build the graph from node declarations.
    ///
    /// Blank ids are rejected. Duplicate ids keep the first declaration by
    /// `(id, meta_file)`; hard dependencies on undeclared ids are dropped.
    /// All three become `schema_violation` gaps. Unknown soft dependencies
    /// are ignored.
    pub fn build(declarations: Vec<GraphDeclaration>) -> GraphBuild {
        let mut declarations = declarations;
        declarations.sort_by(|a, b| (&a.id, &a.meta_file).cmp(&(&b.id, &b.meta_file)));

        let mut gaps = Vec::new();
        let mut nodes: Vec<DependencyNode> = Vec::with_capacity(declarations.len());
        let mut index: BTreeMap<String, usize> = BTreeMap::new();
        for mut decl in declarations {
            decl.id = decl.id.trim().to_string();
            if decl.id.is_empty() {
                gaps.push(
                    Gap::new(
                        GapKind::SchemaViolation,
                        decl.meta_type.clone(),
                        decl.meta_file.clone(),
                        decl.meta_file.clone(),
                    )
                    .with_context(GapContext::problem(
                        "dependency node id must not be empty",
                    )),
                );
                continue;
            }
            if let Some(&existing) = index.get(&decl.id) {
                let first = &nodes[existing];
                gaps.push(
                    Gap::new(
                        GapKind::SchemaViolation,
                        decl.meta_type.clone(),
                        decl.meta_file.clone(),
                        decl.meta_file.clone(),
                    )
                    .with_context(GapContext {
                        problem: Some(format!(
                            "duplicate dependency node id `{}` (already declared by {})",
                            decl.id, first.meta_file
                        )),
                        node: Some(decl.id.clone()),
                        ..GapContext::default()
                    }),
                );
                continue;
            }
            index.insert(decl.id.clone(), nodes.len());
            nodes.push(DependencyNode {
                id: decl.id,
                meta_file: decl.meta_file,
                meta_type: decl.meta_type,
                hard_deps: normalize_ids(decl.depends_on.hard),
                soft_deps: normalize_ids(decl.depends_on.soft),
            });
        }

        let mut hard = vec![Vec::new(); nodes.len()];
        let mut soft = vec![Vec::new(); nodes.len()];
        let mut dependents = vec![Vec::new(); nodes.len()];
        for (idx, node) in nodes.iter_mut().enumerate() {
            let mut kept_hard = BTreeSet::new();
            for dep in &node.hard_deps {
                match index.get(dep) {
                    Some(&target) => {
                        hard[idx].push(target);
                        dependents[target].push(idx);
                        kept_hard.insert(dep.clone());
                    }
                    None => gaps.push(
                        Gap::new(
                            GapKind::SchemaViolation,
                            node.meta_type.clone(),
                            node.meta_file.clone(),
                            node.meta_file.clone(),
                        )
                        .with_context(GapContext {
                            problem: Some(format!(
                                "hard dependency `{dep}` of `{}` is not declared by any contract",
                                node.id
                            )),
                            node: Some(node.id.clone()),
                            ..GapContext::default()
                        }),
                    ),
                }
            }
            node.hard_deps = kept_hard;

            let mut kept_soft = BTreeSet::new();
            for dep in &node.soft_deps {
                match index.get(dep) {
                    Some(&target) if target != idx => {
                        soft[idx].push(target);
                        kept_soft.insert(dep.clone());
                    }
                    _ => debug!(node = %node.id, dep = %dep, "ignoring unresolved soft dependency"),
                }
            }
            node.soft_deps = kept_soft;
        }
        for list in &mut dependents {
            list.sort_unstable();
        }

        GraphBuild {
            graph: DependencyGraph {
                nodes,
                index,
                hard,
                soft,
                dependents,
            },
            gaps,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in id order.
    pub fn nodes(&self) -> &[DependencyNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&DependencyNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    /// Node declared by `meta_file`, if any.
    pub fn node_for_meta_file(&self, meta_file: &str) -> Option<&DependencyNode> {
        self.nodes.iter().find(|node| node.meta_file == meta_file)
    }

    pub(crate) fn hard_edges(&self, idx: usize) -> &[usize] {
        &self.hard[idx]
    }

    pub(crate) fn soft_edges(&self, idx: usize) -> &[usize] {
        &self.soft[idx]
    }

    pub(crate) fn dependents_of(&self, idx: usize) -> &[usize] {
        &self.dependents[idx]
    }

    pub(crate) fn id_at(&self, idx: usize) -> &str {
        &self.nodes[idx].id
    }

    pub(crate) fn meta_file_at(&self, idx: usize) -> &str {
        &self.nodes[idx].meta_file
    }
}

fn normalize_ids(ids: Vec<String>) -> BTreeSet<String> {
    ids.into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}
