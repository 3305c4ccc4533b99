use crate::cli::GlobalArgs;
use crate::support::{
    EXIT_CLEAN, EXIT_GAPS, GAP_SAMPLE_LIMIT, context_or_exit, fatal, print_gaps, print_json,
    print_sample_block, sample_with_truncation, yes_no,
};
use metasync_codegen::{GapOutcome, GenerateOptions, configured_backend, run_generate};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

pub struct Args {
    pub from_report: bool,
    pub dry_run: bool,
    pub refresh: bool,
    pub json: bool,
}

pub fn run(global: &GlobalArgs, args: Args) -> i32 {
    let ctx = Arc::new(context_or_exit(global));
    let backend = configured_backend(&ctx).unwrap_or_else(|e| fatal(e));
    let options = GenerateOptions {
        from_report: args.from_report,
        dry_run: args.dry_run,
        refresh: args.refresh,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| fatal(format!("failed to create tokio runtime: {e}")));

    let run_ctx = Arc::clone(&ctx);
    let outcome = runtime
        .block_on(async move {
            let (cancel_tx, cancel_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received; cancelling generation");
                    let _ = cancel_tx.send(true);
                }
            });
            run_generate(run_ctx, backend, options, cancel_rx).await
        })
        .unwrap_or_else(|e| fatal(e));

    let ledger = &outcome.ledger;
    let report = &outcome.report;
    if args.json {
        print_json(&json!({
            "run_id": ledger.run_id.to_string(),
            "backend": ledger.backend,
            "dry_run": ledger.dry_run,
            "cancelled": ledger.cancelled,
            "ledger_path": (!ledger.dry_run).then(|| ctx.ledger_path().display().to_string()),
            "report_path": ctx.report_path().display().to_string(),
            "counts_by_state": ledger.counts_by_state(),
            "outcomes": ledger.outcomes,
            "remaining_gaps": report.gaps,
        }));
    } else {
        println!("metasync generate");
        println!("  Backend: {}", ledger.backend);
        println!("  Run id: {}", ledger.run_id);
        println!("  Dry run: {}", yes_no(ledger.dry_run));
        println!("  Cancelled: {}", yes_no(ledger.cancelled));
        for (state, count) in ledger.counts_by_state() {
            println!("    {}: {count}", state.as_str());
        }
        let lines: Vec<String> = ledger.outcomes.iter().map(outcome_line).collect();
        let (sample, truncated) = sample_with_truncation(lines, GAP_SAMPLE_LIMIT);
        print_sample_block("Outcomes", &sample, truncated);
        if !ledger.dry_run {
            println!("  Ledger: {}", ctx.ledger_path().display());
        }
        println!("  Remaining gaps: {}", report.gaps.len());
        print_gaps(&report.gaps);
    }

    if report.is_clean() {
        EXIT_CLEAN
    } else {
        EXIT_GAPS
    }
}

fn outcome_line(outcome: &GapOutcome) -> String {
    let mut line = format!("[{}] {}", outcome.state.as_str(), outcome.target_file);
    if let Some(action) = outcome.action {
        line.push_str(&format!(" ({}, attempts: {})", action.as_str(), outcome.attempts));
    }
    if let Some(error) = &outcome.error {
        line.push_str(&format!(": {error}"));
    }
    line
}
