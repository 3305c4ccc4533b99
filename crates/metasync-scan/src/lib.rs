//! # metasync-scan
//!
//! Filesystem side of a compliance run.
//!
//! - [`discover`] walks the repository and parses meta documents on a bounded
//!   pool of scoped threads.
//! - [`scan`] checks every resolved target against disk and validates wiring
//!   contracts against their catalogs.
//! - [`GapReport`] sorts, numbers, and atomically persists the result.
//! - [`run_check`] is the whole pipeline; a dependency cycle aborts it before
//!   any report is written.

pub mod discovery;
pub mod error;
pub mod headings;
pub mod pipeline;
pub mod report;
pub mod scanner;
pub mod wiring;

pub use discovery::{discover, find_meta_files};
pub use error::ScanError;
pub use headings::{extract_headings, missing_sections};
pub use pipeline::{CheckOutcome, analyze, build_graph, run_check};
pub use report::{GapReport, REPORT_VERSION, RepoInfo};
pub use scanner::{TargetStatus, check_target, scan, scan_document, target_gap};
pub use wiring::{Catalog, WiringCatalogs, validate_wiring};
