//! Compliance scanner: meta documents against the filesystem.

use crate::headings::{extract_headings, missing_sections};
use crate::wiring::{WiringCatalogs, validate_wiring};
use metasync_kernel::{
    Gap, GapContext, GapKind, MetaDocument, ParseStatus, RunContext, TargetKind, TargetSpec,
    WiringDeclaration,
};
use std::fs;
use std::io::ErrorKind;
use std::thread;
use tracing::{debug, info, warn};

/// Outcome of checking one target on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
    Satisfied,
    Missing,
    /// Doc present but lacking these headings.
    MissingSections(Vec<String>),
    /// Non-NotFound I/O failure, verbatim.
    Unreadable(String),
}

/// Check a doc or test target. Wiring targets are always `Satisfied` here;
/// their invariants are checked against the catalogs.
pub fn check_target(ctx: &RunContext, target: &TargetSpec) -> TargetStatus {
    let path = ctx.repo_path(&target.target_path);
    match target.target_kind {
        TargetKind::Doc => match fs::read_to_string(&path) {
            Ok(text) => {
                let headings = extract_headings(&text);
                let missing = missing_sections(
                    &target.required_sections,
                    &headings,
                    ctx.config.headings.match_mode,
                );
                if missing.is_empty() {
                    TargetStatus::Satisfied
                } else {
                    TargetStatus::MissingSections(missing)
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => TargetStatus::Missing,
            Err(err) => TargetStatus::Unreadable(err.to_string()),
        },
        TargetKind::Test => match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => TargetStatus::Satisfied,
            Ok(_) => TargetStatus::Unreadable(format!("{} is not a regular file", target.target_path)),
            Err(err) if err.kind() == ErrorKind::NotFound => TargetStatus::Missing,
            Err(err) => TargetStatus::Unreadable(err.to_string()),
        },
        TargetKind::Wiring => TargetStatus::Satisfied,
    }
}

/// The gap, if any, for one resolved target.
pub fn target_gap(doc: &MetaDocument, target: &TargetSpec, status: TargetStatus) -> Option<Gap> {
    let gap = |kind| {
        Gap::new(
            kind,
            doc.meta_type(),
            doc.path.clone(),
            target.target_path.clone(),
        )
    };
    match (status, target.target_kind) {
        (TargetStatus::Satisfied, _) => None,
        (TargetStatus::Missing, TargetKind::Test) => {
            Some(gap(GapKind::MissingTestFile).with_context(GapContext {
                required_behaviors: target.required_behaviors.clone(),
                ..GapContext::default()
            }))
        }
        (TargetStatus::Missing, _) => Some(gap(GapKind::MissingDoc).with_context(GapContext {
            required_sections: target.required_sections.clone(),
            ..GapContext::default()
        })),
        (TargetStatus::MissingSections(missing), _) => {
            Some(gap(GapKind::MissingDoc).with_context(GapContext {
                required_sections: target.required_sections.clone(),
                missing_sections: missing,
                ..GapContext::default()
            }))
        }
        (TargetStatus::Unreadable(error), _) => {
            Some(gap(GapKind::ManualIntervention).with_context(GapContext::error(error)))
        }
    }
}

fn invalid_meta(doc: &MetaDocument, context: GapContext) -> Gap {
    Gap::new(
        GapKind::InvalidMeta,
        doc.meta_type(),
        doc.path.clone(),
        doc.path.clone(),
    )
    .with_context(context)
}

/// All gaps for one meta document.
pub fn scan_document(ctx: &RunContext, doc: &MetaDocument, catalogs: &WiringCatalogs) -> Vec<Gap> {
    match &doc.parse_status {
        ParseStatus::Failed { error } => {
            return vec![invalid_meta(doc, GapContext::error(error.clone()))];
        }
        ParseStatus::MissingType => {
            return vec![invalid_meta(
                doc,
                GapContext::problem("missing `type` field"),
            )];
        }
        ParseStatus::UnknownType { type_name } => {
            if ctx.config.discovery.strict_types {
                return vec![invalid_meta(
                    doc,
                    GapContext::problem(format!("unknown contract type `{type_name}`")),
                )];
            }
            debug!(path = %doc.path, type_name = %type_name, "ignoring unknown contract type");
            return Vec::new();
        }
        ParseStatus::Parsed => {}
    }

    let targets = match ctx.registry.resolve_targets(doc) {
        Ok(targets) => targets,
        Err(err) => return vec![invalid_meta(doc, GapContext::problem(err.to_string()))],
    };

    let mut gaps = Vec::new();
    for target in &targets {
        if target.target_kind == TargetKind::Wiring {
            match doc.decode::<WiringDeclaration>() {
                Ok(wiring) => gaps.extend(validate_wiring(doc, &wiring, catalogs)),
                Err(err) => gaps.push(invalid_meta(doc, GapContext::problem(err.to_string()))),
            }
            continue;
        }
        let status = check_target(ctx, target);
        if let TargetStatus::Unreadable(error) = &status {
            warn!(path = %target.target_path, error = %error, "failed reading target");
        }
        gaps.extend(target_gap(doc, target, status));
    }
    debug!(path = %doc.path, targets = targets.len(), gaps = gaps.len(), "scanned meta document");
    gaps
}

/// Scan every document on `discovery.scan_workers` scoped threads.
///
/// Each worker returns its own gap list; the merged result is sorted into
/// report order so the worker count never shows in the output.
pub fn scan(ctx: &RunContext, documents: &[MetaDocument], catalogs: &WiringCatalogs) -> Vec<Gap> {
    let workers = ctx.config.discovery.scan_workers.max(1);
    let chunk_size = documents.len().div_ceil(workers).max(1);

    let mut gaps: Vec<Gap> = thread::scope(|scope| {
        let handles: Vec<_> = documents
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .flat_map(|doc| scan_document(ctx, doc, catalogs))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(gaps) => gaps,
                Err(_) => {
                    warn!("scan worker panicked; its gaps are lost");
                    Vec::new()
                }
            })
            .collect()
    });
    gaps.sort_by(|a, b| a.report_order(b));
    info!(documents = documents.len(), gaps = gaps.len(), "compliance scan complete");
    gaps
}
