//! Run configuration loaded from `metasync.toml`.
//!
//! Every field has a default, so a repository without a config file runs with
//! the conventions below.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "metasync.toml";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed reading config {path}: {message}")]
    Io { path: String, message: String },

    #[error("failed parsing config {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid config {path}: {message}")]
    Invalid { path: String, message: String },

    #[error("failed rendering config: {0}")]
    Render(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub discovery: DiscoveryConfig,
    pub report: ReportConfig,
    pub headings: HeadingsConfig,
    pub wiring: WiringConfig,
    pub codegen: CodegenConfig,
    pub ci: CiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// File-name suffixes that mark a meta document.
    pub meta_suffixes: Vec<String>,
    /// Directory names never descended into.
    pub exclude_dirs: Vec<String>,
    /// Raise unknown `type` values as `invalid_meta` instead of ignoring them.
    pub strict_types: bool,
    /// Worker threads for parsing and scanning.
    pub scan_workers: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            meta_suffixes: vec![".meta.yaml".to_string(), ".meta.yml".to_string()],
            exclude_dirs: vec![
                ".git".to_string(),
                "target".to_string(),
                "node_modules".to_string(),
            ],
            strict_types: false,
            scan_workers: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Repository-relative gap report path.
    pub path: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: "meta-gaps.yaml".to_string(),
        }
    }
}

/// How `required_sections` are compared with document headings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingMatchMode {
    /// Byte-for-byte equality of the trimmed heading text.
    #[default]
    Exact,
    /// Case-insensitive with internal whitespace collapsed.
    Normalized,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeadingsConfig {
    pub match_mode: HeadingMatchMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WiringConfig {
    pub capability_registry: String,
    pub agent_catalog: String,
    pub memory_topology: String,
}

impl Default for WiringConfig {
    fn default() -> Self {
        Self {
            capability_registry: "registry/capabilities.yaml".to_string(),
            agent_catalog: "registry/agents.yaml".to_string(),
            memory_topology: "registry/memory-topology.yaml".to_string(),
        }
    }
}

/// Generation backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Deterministic skeletons of the required headings/behaviours.
    #[default]
    Scaffold,
    /// External program speaking the JSON request protocol on stdin/stdout.
    Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodegenConfig {
    pub backend: BackendKind,
    /// Program and arguments for the `command` backend.
    pub command: Vec<String>,
    /// Concurrent generation tasks.
    pub workers: usize,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    /// Base delay of the exponential retry backoff.
    pub backoff_ms: u64,
    pub begin_marker: String,
    pub end_marker: String,
    /// Repository-relative outcome ledger path.
    pub ledger_path: String,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Scaffold,
            command: Vec::new(),
            workers: 4,
            timeout_secs: 120,
            max_attempts: 3,
            backoff_ms: 500,
            begin_marker: "<!-- metasync:generated:begin -->".to_string(),
            end_marker: "<!-- metasync:generated:end -->".to_string(),
            ledger_path: "meta-codegen.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CiConfig {
    /// Test runner started once compliance passes.
    pub test_command: Vec<String>,
}

impl Config {
    /// Parse TOML text; `origin` names the source in errors.
    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|err| ConfigError::Parse {
            path: origin.to_string(),
            message: err.to_string(),
        })?;
        config.validate(origin)?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    /// Load an explicit config path, or `<repo_root>/metasync.toml` when it
    /// exists, or defaults.
    pub fn discover(repo_root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate: PathBuf = repo_root.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "loading config");
            Self::load(&candidate)
        } else {
            tracing::debug!("no config file found; using defaults");
            Ok(Self::default())
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|err| ConfigError::Render(err.to_string()))
    }

    fn validate(&self, origin: &str) -> Result<(), ConfigError> {
        let invalid = |message: &str| ConfigError::Invalid {
            path: origin.to_string(),
            message: message.to_string(),
        };
        if self.discovery.meta_suffixes.iter().all(|s| s.trim().is_empty()) {
            return Err(invalid("discovery.meta_suffixes must name at least one suffix"));
        }
        if self.discovery.scan_workers == 0 {
            return Err(invalid("discovery.scan_workers must be at least 1"));
        }
        if self.codegen.workers == 0 {
            return Err(invalid("codegen.workers must be at least 1"));
        }
        if self.codegen.max_attempts == 0 {
            return Err(invalid("codegen.max_attempts must be at least 1"));
        }
        if self.codegen.begin_marker.trim().is_empty()
            || self.codegen.end_marker.trim().is_empty()
            || self.codegen.begin_marker == self.codegen.end_marker
        {
            return Err(invalid(
                "codegen.begin_marker and codegen.end_marker must be distinct and non-empty",
            ));
        }
        if self.codegen.backend == BackendKind::Command && self.codegen.command.is_empty() {
            return Err(invalid("codegen.command is required when codegen.backend = \"command\""));
        }
        Ok(())
    }
}
