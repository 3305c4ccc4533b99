//! The immutable context threaded through every component of one run.

use crate::config::Config;
use crate::paths::relative_to_root;
use crate::registry::ContractRegistry;
use std::path::{Path, PathBuf};

/// Repo root, configuration, and contract registry for one run.
///
/// Built fresh per run and never mutated; components receive it by reference
/// (or behind an `Arc` when crossing task boundaries).
#[derive(Debug)]
pub struct RunContext {
    pub repo_root: PathBuf,
    pub config: Config,
    pub registry: ContractRegistry,
}

impl RunContext {
    pub fn new(repo_root: impl Into<PathBuf>, config: Config) -> Self {
        Self::with_registry(repo_root, config, ContractRegistry::builtin())
    }

    pub fn with_registry(
        repo_root: impl Into<PathBuf>,
        config: Config,
        registry: ContractRegistry,
    ) -> Self {
        Self {
            repo_root: repo_root.into(),
            config,
            registry,
        }
    }

    /// Absolute (or root-joined) path for a repository-relative one.
    pub fn repo_path(&self, relative: &str) -> PathBuf {
        self.repo_root.join(relative)
    }

    pub fn relative(&self, path: &Path) -> String {
        relative_to_root(path, &self.repo_root)
    }

    pub fn report_path(&self) -> PathBuf {
        self.repo_path(&self.config.report.path)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.repo_path(&self.config.codegen.ledger_path)
    }
}
