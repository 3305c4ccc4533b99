//! # Metasync Kernel
//!
//! The shared vocabulary of a compliance run: a repository declares what must
//! exist through typed meta documents, and every discrepancy between those
//! declarations and the filesystem is a [`Gap`].
//!
//! Contract interpretation here is **filesystem-agnostic**: it parses
//! documents that were already read and resolves which artifacts they demand.
//! Walking the tree, checking targets, and generating content live in adapter
//! crates (`metasync-scan`, `metasync-codegen`); the only I/O helpers are
//! config loading and [`write_atomic`].
//!
//! ## Architecture
//!
//! ```text
//! Config                ← metasync.toml, every field defaulted
//!     │
//! RunContext            ← repo root + config + registry, rebuilt per run
//!     │
//! ContractRegistry      ← `type` discriminator → ContractSchema handler
//!     │
//! MetaDocument          ← one parsed contract file
//!     │
//! TargetSpec            ← doc / test / wiring artifact a contract demands
//!     │
//! Gap                   ← one detected discrepancy
//! ```

pub mod config;
pub mod context;
pub mod contract;
pub mod error;
pub mod fsio;
pub mod gap;
pub mod meta;
pub mod paths;
pub mod registry;

pub use config::{
    BackendKind, CiConfig, CodegenConfig, Config, ConfigError, DEFAULT_CONFIG_FILE,
    DiscoveryConfig, HeadingMatchMode, HeadingsConfig, ReportConfig, WiringConfig,
};
pub use context::RunContext;
pub use contract::{
    ContractKind, ContractSchema, DependsOn, GraphDeclaration, TargetKind, TargetSpec,
    WiringDeclaration,
};
pub use error::InvalidMetaError;
pub use fsio::write_atomic;
pub use gap::{Gap, GapContext, GapKind};
pub use meta::{MetaDocument, ParseStatus, TYPE_FIELD};
pub use paths::{normalize_path, relative_to_root, resolve_declared};
pub use registry::{ContractRegistry, ContractSummary};
