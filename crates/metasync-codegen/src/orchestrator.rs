//! Codegen orchestrator: turns generatable gaps into written artifacts.
//!
//! ```text
//! DETECTED ─▶ QUEUED ─▶ GENERATING ─▶ RESOLVED
//!                │            └─────▶ FAILED
//!                └──▶ BLOCKED (existing file without a usable region)
//! ```
//!
//! Gaps run wave by wave: a wave is one extraction batch of the dependency
//! graph, and gaps outside the graph join the first wave. Within a wave,
//! tasks share a semaphore of `codegen.workers` permits; every backend call is
//! wrapped in a timeout and retried with exponential backoff.
//!
//! A task holds its target's path lock from planning to verification, so
//! gaps sharing a target run one after another and each plans against the
//! file the previous one left behind.

use crate::backend::{GeneratedContent, GenerationAction, GenerationBackend, GenerationRequest};
use crate::error::GenerationError;
use crate::ledger::{GapOutcome, GapState, content_digest};
use crate::locks::PathLocks;
use crate::merge::RegionMarkers;
use metasync_graph::{DependencyGraph, Resolution};
use metasync_kernel::{
    CodegenConfig, Gap, GapKind, MetaDocument, RunContext, TargetKind, TargetSpec, write_atomic,
};
use metasync_scan::{TargetStatus, check_target};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub workers: usize,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff: Duration,
    pub markers: RegionMarkers,
    /// Decide actions without calling the backend or writing.
    pub dry_run: bool,
    /// Regenerate the region of doc targets that are already compliant.
    pub refresh: bool,
}

impl OrchestratorOptions {
    pub fn from_config(config: &CodegenConfig) -> Self {
        Self {
            workers: config.workers.max(1),
            timeout: Duration::from_secs(config.timeout_secs),
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.backoff_ms),
            markers: RegionMarkers::new(&config.begin_marker, &config.end_marker),
            dry_run: false,
            refresh: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }
}

/// Outcomes of one orchestration, sorted by gap id.
#[derive(Debug, Clone, Default)]
pub struct OrchestrationResult {
    pub outcomes: Vec<GapOutcome>,
    pub cancelled: bool,
}

/// Group generatable gaps into waves following the extraction batches.
pub fn plan_waves(gaps: &[Gap], graph: &DependencyGraph, resolution: &Resolution) -> Vec<Vec<Gap>> {
    let batch_index = resolution.batch_index();
    let mut waves: BTreeMap<usize, Vec<Gap>> = BTreeMap::new();
    for gap in gaps.iter().filter(|gap| gap.kind.is_generatable()) {
        let wave = graph
            .node_for_meta_file(&gap.meta_file)
            .and_then(|node| batch_index.get(node.id.as_str()).copied())
            .unwrap_or(0);
        waves.entry(wave).or_default().push(gap.clone());
    }
    waves.into_values().collect()
}

enum Plan {
    Satisfied,
    Generate {
        request: GenerationRequest,
        target: TargetSpec,
        path: PathBuf,
    },
    Blocked(String),
}

enum ApplyError {
    Conflict(String),
    Failed(String),
}

async fn wait_cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            // Sender gone without cancelling: never fires.
            std::future::pending::<()>().await;
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    ctx: Arc<RunContext>,
    backend: Arc<dyn GenerationBackend>,
    options: OrchestratorOptions,
    locks: Arc<PathLocks>,
    permits: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(
        ctx: Arc<RunContext>,
        backend: Arc<dyn GenerationBackend>,
        options: OrchestratorOptions,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(options.workers.max(1)));
        Self {
            ctx,
            backend,
            options,
            locks: Arc::new(PathLocks::new()),
            permits,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Process `waves` in order; a wave starts only after every task of the
    /// previous one is terminal.
    pub async fn run(
        &self,
        waves: Vec<Vec<Gap>>,
        cancel: watch::Receiver<bool>,
    ) -> OrchestrationResult {
        let mut outcomes = Vec::new();
        let mut cancelled = false;

        for (index, wave) in waves.into_iter().enumerate() {
            if *cancel.borrow() {
                cancelled = true;
                outcomes.extend(
                    wave.iter()
                        .map(|gap| GapOutcome::from_gap(gap, GapState::Queued).failed("cancelled")),
                );
                continue;
            }
            info!(wave = index, gaps = wave.len(), "starting generation wave");

            let mut pending: BTreeMap<(String, String, String), Gap> = BTreeMap::new();
            let mut tasks = JoinSet::new();
            for gap in wave {
                pending.insert(outcome_key(&gap), gap.clone());
                let this = self.clone();
                let cancel = cancel.clone();
                tasks.spawn(async move { this.process(gap, cancel).await });
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(outcome) => {
                        pending.remove(&(
                            outcome.gap_id.clone(),
                            outcome.meta_file.clone(),
                            outcome.target_file.clone(),
                        ));
                        outcomes.push(outcome);
                    }
                    Err(err) => warn!(error = %err, "generation task aborted"),
                }
            }
            for gap in pending.values() {
                outcomes.push(
                    GapOutcome::from_gap(gap, GapState::Generating).failed("generation task aborted"),
                );
            }
        }

        cancelled |= *cancel.borrow();
        outcomes.sort_by(|a, b| {
            (&a.gap_id, &a.meta_file, &a.target_file).cmp(&(&b.gap_id, &b.meta_file, &b.target_file))
        });
        OrchestrationResult {
            outcomes,
            cancelled,
        }
    }

    async fn process(&self, gap: Gap, mut cancel: watch::Receiver<bool>) -> GapOutcome {
        let outcome = GapOutcome::from_gap(&gap, GapState::Queued);
        let _permit = tokio::select! {
            biased;
            _ = wait_cancelled(&mut cancel) => return outcome.failed("cancelled"),
            permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return outcome.failed("worker pool closed"),
            },
        };
        let lock_path = self.ctx.repo_path(&gap.target_file);
        let _guard = tokio::select! {
            biased;
            _ = wait_cancelled(&mut cancel) => return outcome.failed("cancelled"),
            guard = self.locks.lock(&lock_path) => guard,
        };

        let plan = match self.plan(&gap) {
            Ok(plan) => plan,
            Err(message) => return outcome.failed(message),
        };
        let (request, target, path) = match plan {
            Plan::Satisfied => {
                debug!(target_file = %gap.target_file, "target already compliant");
                let mut outcome = outcome;
                outcome.state = GapState::Resolved;
                return outcome;
            }
            Plan::Blocked(reason) => {
                warn!(target_file = %gap.target_file, reason = %reason, "gap needs manual intervention");
                return outcome.blocked(reason);
            }
            Plan::Generate {
                request,
                target,
                path,
            } => (request, target, path),
        };

        let mut outcome = outcome;
        outcome.action = Some(request.action);
        if self.options.dry_run {
            return outcome;
        }

        outcome.state = GapState::Generating;
        let generated = match self.generate_with_retry(&request, &mut cancel).await {
            Ok((generated, attempts)) => {
                outcome.attempts = attempts;
                generated
            }
            Err((err, attempts)) => {
                outcome.attempts = attempts;
                warn!(target_file = %gap.target_file, error = %err, attempts, "generation failed");
                return outcome.failed(err.to_string());
            }
        };
        if *cancel.borrow() {
            return outcome.failed("cancelled");
        }

        match self.apply(&request, &path, generated).await {
            Ok(digest) => outcome.content_sha256 = Some(digest),
            Err(ApplyError::Conflict(reason)) => return outcome.blocked(reason),
            Err(ApplyError::Failed(message)) => return outcome.failed(message),
        }

        match check_target(&self.ctx, &target) {
            TargetStatus::Satisfied => {
                info!(target_file = %gap.target_file, action = ?request.action, "gap resolved");
                outcome.state = GapState::Resolved;
                outcome
            }
            TargetStatus::MissingSections(missing) => outcome.failed(format!(
                "{} still lacks sections after write: {}",
                gap.target_file,
                missing.join(", ")
            )),
            TargetStatus::Missing => {
                outcome.failed(format!("{} is still missing after write", gap.target_file))
            }
            TargetStatus::Unreadable(error) => outcome.failed(error),
        }
    }

    /// Re-open the meta document and decide what to do with the target.
    fn plan(&self, gap: &Gap) -> Result<Plan, String> {
        let wanted = match gap.kind {
            GapKind::MissingDoc => TargetKind::Doc,
            GapKind::MissingTestFile => TargetKind::Test,
            other => return Err(format!("{other} gaps are not generatable")),
        };
        let text = fs::read_to_string(self.ctx.repo_path(&gap.meta_file))
            .map_err(|err| format!("failed re-reading {}: {err}", gap.meta_file))?;
        let doc = MetaDocument::parse(gap.meta_file.clone(), &text, &self.ctx.registry);
        let target = self
            .ctx
            .registry
            .resolve_targets(&doc)
            .map_err(|err| err.to_string())?
            .into_iter()
            .find(|target| target.target_path == gap.target_file && target.target_kind == wanted)
            .ok_or_else(|| {
                format!(
                    "{} no longer declares {} target {}",
                    gap.meta_file,
                    wanted.as_str(),
                    gap.target_file
                )
            })?;
        let path = self.ctx.repo_path(&target.target_path);

        let mut request = GenerationRequest {
            meta_type: doc.meta_type().to_string(),
            meta_file: gap.meta_file.clone(),
            target_file: target.target_path.clone(),
            target_kind: target.target_kind,
            action: GenerationAction::Create,
            contract_fields: doc.contract_fields(),
            existing_content: None,
            existing_region: None,
            missing_items: match wanted {
                TargetKind::Test => target.required_behaviors.clone(),
                _ => target.required_sections.clone(),
            },
        };

        match check_target(&self.ctx, &target) {
            TargetStatus::Satisfied if self.options.refresh && wanted == TargetKind::Doc => {
                let existing = fs::read_to_string(&path)
                    .map_err(|err| format!("failed reading {}: {err}", target.target_path))?;
                match self.options.markers.extract(&target.target_path, &existing) {
                    Ok(Some(region)) => {
                        request.action = GenerationAction::Merge;
                        request.existing_region = Some(region.to_string());
                        request.existing_content = Some(existing);
                        request.missing_items = Vec::new();
                        Ok(Plan::Generate {
                            request,
                            target,
                            path,
                        })
                    }
                    Ok(None) => Ok(Plan::Satisfied),
                    Err(conflict) => Ok(Plan::Blocked(conflict.to_string())),
                }
            }
            TargetStatus::Satisfied => Ok(Plan::Satisfied),
            TargetStatus::Missing => Ok(Plan::Generate {
                request,
                target,
                path,
            }),
            TargetStatus::MissingSections(missing) => {
                let existing = fs::read_to_string(&path)
                    .map_err(|err| format!("failed reading {}: {err}", target.target_path))?;
                match self.options.markers.extract(&target.target_path, &existing) {
                    Ok(Some(region)) => {
                        request.action = GenerationAction::Merge;
                        request.existing_region = Some(region.to_string());
                        request.existing_content = Some(existing);
                        request.missing_items = missing;
                        Ok(Plan::Generate {
                            request,
                            target,
                            path,
                        })
                    }
                    Ok(None) => Ok(Plan::Blocked(format!(
                        "{} exists without a generated region; add `{}` and `{}` markers or \
                         write the missing sections by hand",
                        target.target_path, self.options.markers.begin, self.options.markers.end
                    ))),
                    Err(conflict) => Ok(Plan::Blocked(conflict.to_string())),
                }
            }
            TargetStatus::Unreadable(error) => Ok(Plan::Blocked(error)),
        }
    }

    async fn generate_with_retry(
        &self,
        request: &GenerationRequest,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(GeneratedContent, u32), (GenerationError, u32)> {
        let mut last_error = GenerationError::Backend("no attempt made".to_string());
        for attempt in 1..=self.options.max_attempts {
            let call = tokio::time::timeout(self.options.timeout, self.backend.generate(request));
            let result = tokio::select! {
                biased;
                _ = wait_cancelled(cancel) => return Err((GenerationError::Cancelled, attempt)),
                result = call => result,
            };
            match result {
                Ok(Ok(generated)) => return Ok((generated, attempt)),
                Ok(Err(err)) => last_error = err,
                Err(_) => {
                    last_error = GenerationError::Timeout {
                        secs: self.options.timeout.as_secs(),
                    }
                }
            }
            if !last_error.is_retryable() || attempt == self.options.max_attempts {
                return Err((last_error, attempt));
            }

            let delay = self
                .options
                .backoff
                .saturating_mul(1u32 << (attempt - 1).min(16));
            debug!(
                target_file = %request.target_file,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "retrying backend call"
            );
            tokio::select! {
                biased;
                _ = wait_cancelled(cancel) => return Err((GenerationError::Cancelled, attempt)),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        Err((last_error, self.options.max_attempts))
    }

    /// Write backend output. The caller holds the target's lock. Returns the
    /// digest of the file content afterwards.
    async fn apply(
        &self,
        request: &GenerationRequest,
        path: &Path,
        generated: GeneratedContent,
    ) -> Result<String, ApplyError> {
        let markers = &self.options.markers;
        let rel = request.target_file.as_str();

        let content = match request.action {
            GenerationAction::Create => {
                if path.exists() {
                    return Err(ApplyError::Failed(format!(
                        "{rel} appeared while its content was being generated"
                    )));
                }
                match request.target_kind {
                    TargetKind::Doc => match markers.find(rel, &generated.content) {
                        Ok(Some(_)) => generated.content,
                        Ok(None) => markers.wrap(&generated.content),
                        Err(conflict) => {
                            return Err(ApplyError::Failed(format!(
                                "backend output has malformed region markers: {conflict}"
                            )));
                        }
                    },
                    _ => generated.content,
                }
            }
            GenerationAction::Merge => {
                let current = fs::read_to_string(path)
                    .map_err(|err| ApplyError::Failed(format!("failed reading {rel}: {err}")))?;
                let body = markers
                    .unwrap_body(rel, &generated.content)
                    .map_err(|conflict| {
                        ApplyError::Failed(format!("backend output has malformed region markers: {conflict}"))
                    })?;
                let merged = markers
                    .replace(rel, &current, body)
                    .map_err(|conflict| ApplyError::Conflict(conflict.to_string()))?;
                if merged == current {
                    debug!(target_file = rel, "generated region unchanged");
                    return Ok(content_digest(current.as_bytes()));
                }
                merged
            }
        };

        let digest = content_digest(content.as_bytes());
        let target = path.to_path_buf();
        tokio::task::spawn_blocking(move || write_atomic(&target, content.as_bytes()))
            .await
            .map_err(|err| ApplyError::Failed(format!("write task failed for {rel}: {err}")))?
            .map_err(|err| ApplyError::Failed(format!("failed writing {rel}: {err}")))?;
        debug!(target_file = rel, action = ?request.action, "wrote generated content");
        Ok(digest)
    }
}

fn outcome_key(gap: &Gap) -> (String, String, String) {
    (gap.id.clone(), gap.meta_file.clone(), gap.target_file.clone())
}
