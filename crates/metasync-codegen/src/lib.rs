//! # metasync-codegen
//!
//! Gap-driven generation. Generatable gaps (`missing_doc`,
//! `missing_test_file`) are re-resolved against their meta documents,
//! dispatched to a [`GenerationBackend`], and written back either as new
//! files or as a replacement of the single generated region inside an
//! existing file. Hand-written content outside the region is never touched.
//!
//! Backends:
//! - [`ScaffoldBackend`]: deterministic skeletons of the required headings
//!   and behaviours (default)
//! - [`CommandBackend`]: an external program fed the request as JSON on stdin

pub mod backend;
pub mod command;
pub mod error;
pub mod generate;
pub mod ledger;
pub mod locks;
pub mod merge;
pub mod orchestrator;
pub mod scaffold;

pub use backend::{GeneratedContent, GenerationAction, GenerationBackend, GenerationRequest};
pub use command::CommandBackend;
pub use error::{CodegenError, GenerationError, MergeConflictError};
pub use generate::{
    GenerateOptions, GenerateOutcome, configured_backend, refresh_items, run_generate,
    with_manual_interventions,
};
pub use ledger::{CodegenLedger, GapOutcome, GapState, content_digest};
pub use locks::PathLocks;
pub use merge::RegionMarkers;
pub use orchestrator::{OrchestrationResult, Orchestrator, OrchestratorOptions, plan_waves};
pub use scaffold::ScaffoldBackend;
