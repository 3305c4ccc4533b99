//! Repository-relative path normalization.
//!
//! Every path that reaches a gap or a report is repository-relative with `/`
//! separators, so reports stay byte-identical across platforms and checkouts.

use crate::error::InvalidMetaError;
use std::path::Path;

/// Trim, convert separators, and drop leading `./` segments.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.trim().replace('\\', "/");
    while normalized.starts_with("./") {
        normalized = normalized.replacen("./", "", 1);
    }
    normalized
}

/// Express `path` relative to `repo_root`, falling back to the normalized
/// input when it is not under the root.
pub fn relative_to_root(path: &Path, repo_root: &Path) -> String {
    match path.strip_prefix(repo_root) {
        Ok(stripped) => normalize_path(&stripped.to_string_lossy()),
        Err(_) => normalize_path(&path.to_string_lossy()),
    }
}

/// Resolve a path declared inside a meta document.
///
/// Relative paths are taken from the meta document's directory; a leading `/`
/// anchors the path at the repository root. `.` and `..` are folded
/// lexically and may not climb above the root.
pub fn resolve_declared(meta_path: &str, declared: &str) -> Result<String, InvalidMetaError> {
    let declared_norm = declared.trim().replace('\\', "/");
    let (base, rest) = match declared_norm.strip_prefix('/') {
        Some(rooted) => (String::new(), rooted.to_string()),
        None => {
            let meta_norm = normalize_path(meta_path);
            let parent = match meta_norm.rfind('/') {
                Some(idx) => meta_norm[..idx].to_string(),
                None => String::new(),
            };
            (parent, declared_norm.clone())
        }
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(rest.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(InvalidMetaError::PathEscapesRoot {
                        path: meta_path.to_string(),
                        declared: declared.to_string(),
                    });
                }
            }
            other => segments.push(other),
        }
    }
    Ok(segments.join("/"))
}
