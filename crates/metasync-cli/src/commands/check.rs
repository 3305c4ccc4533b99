use crate::cli::GlobalArgs;
use crate::support::{EXIT_CLEAN, EXIT_GAPS, context_or_exit, fatal, print_gaps, print_json};
use metasync_kernel::RunContext;
use metasync_scan::run_check;
use serde_json::json;
use tracing::info;

pub fn run(global: &GlobalArgs, json_output: bool) -> i32 {
    let ctx = context_or_exit(global);
    check(&ctx, json_output)
}

/// Run the compliance check and return its CI exit code.
pub fn check(ctx: &RunContext, json_output: bool) -> i32 {
    let outcome = run_check(ctx).unwrap_or_else(|e| fatal(e));
    let report = &outcome.report;
    let report_path = ctx.report_path();
    info!(gaps = report.gaps.len(), report = %report_path.display(), "check finished");

    if json_output {
        print_json(&json!({
            "repo_root": ctx.repo_root.display().to_string(),
            "report_path": report_path.display().to_string(),
            "meta_documents": outcome.documents.len(),
            "graph_nodes": outcome.graph.len(),
            "clean": report.is_clean(),
            "gap_count": report.gaps.len(),
            "counts_by_kind": report.counts_by_kind(),
            "gaps": report.gaps,
        }));
    } else {
        println!("metasync check");
        println!("  Repo root: {}", ctx.repo_root.display());
        println!("  Meta documents: {}", outcome.documents.len());
        println!("  Graph nodes: {}", outcome.graph.len());
        println!("  Report: {}", report_path.display());
        println!("  Gaps: {}", report.gaps.len());
        for (kind, count) in report.counts_by_kind() {
            println!("    {kind}: {count}");
        }
        print_gaps(&report.gaps);
    }

    if report.is_clean() {
        EXIT_CLEAN
    } else {
        EXIT_GAPS
    }
}
