//! The generate pipeline: analyze → orchestrate → ledger → rescan → report.

use crate::backend::GenerationBackend;
use crate::command::CommandBackend;
use crate::error::CodegenError;
use crate::ledger::{CodegenLedger, GapOutcome, GapState};
use crate::merge::RegionMarkers;
use crate::orchestrator::{Orchestrator, OrchestratorOptions, plan_waves};
use crate::scaffold::ScaffoldBackend;
use chrono::Utc;
use metasync_kernel::{BackendKind, Gap, GapContext, GapKind, RunContext, TargetKind};
use metasync_scan::{CheckOutcome, GapReport, analyze};
use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Work from the existing report instead of a fresh scan.
    pub from_report: bool,
    pub dry_run: bool,
    /// Also regenerate the region of every compliant doc target that has one.
    pub refresh: bool,
}

#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub ledger: CodegenLedger,
    /// Report after generation; the pre-run report on a dry run.
    pub report: GapReport,
}

/// The backend selected by `codegen.backend`.
pub fn configured_backend(ctx: &RunContext) -> Result<Arc<dyn GenerationBackend>, CodegenError> {
    let backend: Arc<dyn GenerationBackend> = match ctx.config.codegen.backend {
        BackendKind::Scaffold => Arc::new(ScaffoldBackend),
        BackendKind::Command => Arc::new(
            CommandBackend::from_argv(&ctx.config.codegen.command)?
                .with_working_dir(ctx.repo_root.clone()),
        ),
    };
    Ok(backend)
}

/// Replace scanner gaps of blocked targets with `manual_intervention` gaps.
pub fn with_manual_interventions(report: GapReport, outcomes: &[GapOutcome]) -> GapReport {
    let blocked: Vec<&GapOutcome> = outcomes
        .iter()
        .filter(|outcome| outcome.state == GapState::Blocked)
        .collect();
    if blocked.is_empty() {
        return report;
    }

    let mut gaps: Vec<Gap> = report
        .gaps
        .into_iter()
        .filter(|gap| {
            !blocked.iter().any(|outcome| {
                outcome.kind == gap.kind
                    && outcome.meta_file == gap.meta_file
                    && outcome.target_file == gap.target_file
            })
        })
        .collect();
    gaps.extend(blocked.iter().map(|outcome| {
        Gap::new(
            GapKind::ManualIntervention,
            outcome.meta_type.clone(),
            outcome.meta_file.clone(),
            outcome.target_file.clone(),
        )
        .with_context(GapContext::problem(
            outcome.error.clone().unwrap_or_else(|| "blocked".to_string()),
        ))
    }));
    GapReport::build(report.repo.root, gaps)
}

/// Work items for compliant doc targets whose file carries a generated
/// region. Targets that already have a gap are skipped.
pub fn refresh_items(ctx: &RunContext, analysis: &CheckOutcome, gaps: &[Gap]) -> Vec<Gap> {
    let markers = RegionMarkers::new(
        &ctx.config.codegen.begin_marker,
        &ctx.config.codegen.end_marker,
    );
    let gapped: BTreeSet<(&str, &str)> = gaps
        .iter()
        .map(|gap| (gap.meta_file.as_str(), gap.target_file.as_str()))
        .collect();

    let mut items = Vec::new();
    for doc in &analysis.documents {
        let Ok(targets) = ctx.registry.resolve_targets(doc) else {
            continue;
        };
        for target in targets {
            if target.target_kind != TargetKind::Doc
                || gapped.contains(&(doc.path.as_str(), target.target_path.as_str()))
            {
                continue;
            }
            let Ok(text) = fs::read_to_string(ctx.repo_path(&target.target_path)) else {
                continue;
            };
            if !matches!(markers.find(&target.target_path, &text), Ok(Some(_))) {
                continue;
            }
            let mut gap = Gap::new(
                GapKind::MissingDoc,
                doc.meta_type(),
                doc.path.clone(),
                target.target_path.clone(),
            )
            .with_context(GapContext::problem("refresh generated region"));
            gap.id = format!("refresh-{:04}", items.len() + 1);
            items.push(gap);
        }
    }
    debug!(items = items.len(), "planned region refresh");
    items
}

/// Fill every generatable gap, then rescan and rewrite the report.
///
/// A dependency cycle aborts before anything is generated and before any
/// previous report is read, so a stale report is left as it was. With
/// `refresh`, compliant doc targets with a generated region are merged
/// again too. Cancellation still produces a ledger and a refreshed report
/// for whatever finished.
pub async fn run_generate(
    ctx: Arc<RunContext>,
    backend: Arc<dyn GenerationBackend>,
    options: GenerateOptions,
    cancel: watch::Receiver<bool>,
) -> Result<GenerateOutcome, CodegenError> {
    let started_at = Utc::now();
    let analysis = analyze(&ctx)?;
    let mut gaps = if options.from_report {
        GapReport::load(&ctx.report_path())?.gaps
    } else {
        analysis.report.gaps.clone()
    };
    if options.refresh {
        let items = refresh_items(&ctx, &analysis, &gaps);
        gaps.extend(items);
    }

    let waves = plan_waves(&gaps, &analysis.graph, &analysis.resolution);
    let orchestrator = Orchestrator::new(
        Arc::clone(&ctx),
        backend,
        OrchestratorOptions::from_config(&ctx.config.codegen)
            .with_dry_run(options.dry_run)
            .with_refresh(options.refresh),
    );
    let result = orchestrator.run(waves, cancel).await;

    let mut outcomes = result.outcomes;
    outcomes.extend(
        gaps.iter()
            .filter(|gap| !gap.kind.is_generatable())
            .map(|gap| GapOutcome::from_gap(gap, GapState::Detected)),
    );
    outcomes.sort_by(|a, b| {
        (&a.gap_id, &a.meta_file, &a.target_file).cmp(&(&b.gap_id, &b.meta_file, &b.target_file))
    });

    let ledger = CodegenLedger {
        run_id: Uuid::new_v4(),
        started_at,
        finished_at: Utc::now(),
        backend: orchestrator.backend_name().to_string(),
        dry_run: options.dry_run,
        cancelled: result.cancelled,
        outcomes,
    };
    info!(
        run_id = %ledger.run_id,
        outcomes = ledger.outcomes.len(),
        cancelled = ledger.cancelled,
        "generation run finished"
    );

    if options.dry_run {
        return Ok(GenerateOutcome {
            ledger,
            report: analysis.report,
        });
    }

    ledger.write(&ctx.ledger_path())?;
    let refreshed = analyze(&ctx)?;
    let report = with_manual_interventions(refreshed.report, &ledger.outcomes);
    report.write(&ctx.report_path())?;
    Ok(GenerateOutcome { ledger, report })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(kind: GapKind, target: &str, state: GapState) -> GapOutcome {
        let gap = Gap::new(kind, "component-readme", "core/readme.meta.yaml", target);
        let outcome = GapOutcome::from_gap(&gap, state);
        if state == GapState::Blocked {
            outcome.blocked("core/README.md exists without a generated region")
        } else {
            outcome
        }
    }

    #[test]
    fn blocked_targets_become_manual_intervention() {
        let report = GapReport::build(
            "/repo",
            vec![
                Gap::new(GapKind::MissingDoc, "component-readme", "core/readme.meta.yaml", "core/README.md"),
                Gap::new(GapKind::MissingDoc, "component-readme", "core/readme.meta.yaml", "core/GUIDE.md"),
            ],
        );
        let outcomes = vec![
            outcome(GapKind::MissingDoc, "core/README.md", GapState::Blocked),
            outcome(GapKind::MissingDoc, "core/GUIDE.md", GapState::Failed),
        ];
        let report = with_manual_interventions(report, &outcomes);
        assert_eq!(report.gaps.len(), 2);
        assert_eq!(report.gaps[0].target_file, "core/GUIDE.md");
        assert_eq!(report.gaps[0].kind, GapKind::MissingDoc);
        assert_eq!(report.gaps[1].kind, GapKind::ManualIntervention);
        assert_eq!(report.gaps[1].id, "gap-0002");
        assert!(
            report.gaps[1]
                .context
                .problem
                .as_deref()
                .unwrap()
                .contains("without a generated region")
        );
    }

    #[test]
    fn command_backend_needs_a_program() {
        let mut config = metasync_kernel::Config::default();
        config.codegen.backend = BackendKind::Command;
        let ctx = RunContext::new("/repo", config);
        assert!(configured_backend(&ctx).is_err());

        let mut config = metasync_kernel::Config::default();
        config.codegen.backend = BackendKind::Command;
        config.codegen.command = vec!["gen-docs".to_string(), "--json".to_string()];
        let ctx = RunContext::new("/repo", config);
        assert_eq!(configured_backend(&ctx).unwrap().name(), "gen-docs");
    }
}
