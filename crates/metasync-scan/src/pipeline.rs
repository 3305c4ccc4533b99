//! The check pipeline: discover → graph → resolve → scan → report.

use crate::discovery::discover;
use crate::error::ScanError;
use crate::report::GapReport;
use crate::scanner::scan;
use crate::wiring::WiringCatalogs;
use metasync_graph::{DependencyGraph, GraphBuild, Resolution, resolve};
use metasync_kernel::{MetaDocument, RunContext};
use tracing::{debug, info};

/// Everything one check run computed.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub documents: Vec<MetaDocument>,
    pub graph: DependencyGraph,
    pub resolution: Resolution,
    pub report: GapReport,
}

/// Graph nodes declared by parsed documents.
///
/// Documents whose declaration cannot be decoded are left out; the scanner
/// reports them as `invalid_meta`.
pub fn build_graph(ctx: &RunContext, documents: &[MetaDocument]) -> GraphBuild {
    let declarations = documents
        .iter()
        .filter(|doc| doc.is_parsed())
        .filter_map(|doc| match ctx.registry.graph_declaration(doc) {
            Ok(decl) => decl,
            Err(err) => {
                debug!(path = %doc.path, error = %err, "skipping undecodable graph declaration");
                None
            }
        })
        .collect();
    DependencyGraph::build(declarations)
}

/// Discover, resolve, and scan without writing anything.
///
/// A dependency cycle aborts before scanning.
pub fn analyze(ctx: &RunContext) -> Result<CheckOutcome, ScanError> {
    let documents = discover(ctx)?;
    let GraphBuild { graph, gaps: graph_gaps } = build_graph(ctx, &documents);
    let resolution = resolve(&graph)?;
    info!(
        nodes = graph.len(),
        batches = resolution.batches.len(),
        "dependency graph resolved"
    );

    let catalogs = WiringCatalogs::load(ctx);
    let mut gaps = scan(ctx, &documents, &catalogs);
    gaps.extend(graph_gaps);

    let report = GapReport::build(ctx.repo_root.display().to_string(), gaps);
    Ok(CheckOutcome {
        documents,
        graph,
        resolution,
        report,
    })
}

/// Analyze and write the report to `report.path`.
///
/// Nothing is written or removed when analysis fails, so a previous report
/// survives a cycle untouched.
pub fn run_check(ctx: &RunContext) -> Result<CheckOutcome, ScanError> {
    let outcome = analyze(ctx)?;
    outcome.report.write(&ctx.report_path())?;
    Ok(outcome)
}
