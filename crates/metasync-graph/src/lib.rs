//! # metasync-graph
//!
//! Dependency layer for module and extraction contracts.
//!
//! This crate provides:
//! - `DependencyNode` and the arena-backed `DependencyGraph`
//! - cycle detection with full cycle paths (`CycleError`)
//! - deterministic topological order and extraction batches
//!
//! It is pure: it never touches the filesystem, and graphs are rebuilt from
//! the loaded meta documents on every run.
//!
//! ## Data model
//!
//! ```text
//! GraphDeclaration (one per module-meta / extraction contract)
//!     ↓  build (dangling + duplicate ids → schema_violation gaps)
//! DependencyGraph (flat node array, index adjacency, reverse index)
//!     ↓  resolve (cycle → CycleError, fatal)
//! Resolution { order, batches }
//! ```

pub mod graph;
pub mod resolve;

pub use graph::{DependencyGraph, DependencyNode, GraphBuild};
pub use resolve::{CycleError, ExtractionBatch, Resolution, detect_cycle, resolve};
