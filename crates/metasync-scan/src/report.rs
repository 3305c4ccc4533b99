//! Gap report: normalized, numbered, and persisted as YAML.

use crate::error::ScanError;
use metasync_kernel::{Gap, GapKind, write_atomic};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

pub const REPORT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub root: String,
}

/// All gaps of one run, in report order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapReport {
    pub version: u32,
    pub repo: RepoInfo,
    pub gaps: Vec<Gap>,
}

impl GapReport {
    /// Sort, deduplicate, and number `gaps`.
    ///
    /// Incoming ids are discarded; the result depends only on the gap
    /// contents, never on detection order.
    pub fn build(repo_root: impl Into<String>, gaps: Vec<Gap>) -> Self {
        let mut gaps: Vec<Gap> = gaps
            .into_iter()
            .map(|mut gap| {
                gap.id.clear();
                gap
            })
            .collect();
        gaps.sort_by(|a, b| a.report_order(b).then_with(|| a.meta_type.cmp(&b.meta_type)));
        gaps.dedup();
        for (idx, gap) in gaps.iter_mut().enumerate() {
            gap.id = format!("gap-{:04}", idx + 1);
        }
        Self {
            version: REPORT_VERSION,
            repo: RepoInfo {
                root: repo_root.into(),
            },
            gaps,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.gaps.is_empty()
    }

    pub fn counts_by_kind(&self) -> BTreeMap<GapKind, usize> {
        let mut counts = BTreeMap::new();
        for gap in &self.gaps {
            *counts.entry(gap.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn render(&self) -> Result<String, ScanError> {
        serde_yaml::to_string(self).map_err(|err| ScanError::Render(err.to_string()))
    }

    /// Atomically replace the report at `path`.
    pub fn write(&self, path: &Path) -> Result<(), ScanError> {
        let rendered = self.render()?;
        write_atomic(path, rendered.as_bytes()).map_err(|err| ScanError::WriteReport {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        info!(path = %path.display(), gaps = self.gaps.len(), "wrote gap report");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ScanError> {
        let read_error = |message: String| ScanError::ReadReport {
            path: path.display().to_string(),
            message,
        };
        let text = fs::read_to_string(path).map_err(|err| read_error(err.to_string()))?;
        let report: GapReport =
            serde_yaml::from_str(&text).map_err(|err| read_error(err.to_string()))?;
        if report.version != REPORT_VERSION {
            return Err(read_error(format!(
                "unsupported report version {} (expected {REPORT_VERSION})",
                report.version
            )));
        }
        Ok(report)
    }
}
