//! Meta-document discovery.

use crate::error::ScanError;
use metasync_kernel::{DiscoveryConfig, MetaDocument, RunContext};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Candidate meta files under `repo_root`, sorted by path.
pub fn find_meta_files(
    repo_root: &Path,
    config: &DiscoveryConfig,
) -> Result<Vec<PathBuf>, ScanError> {
    if !repo_root.is_dir() {
        return Err(ScanError::Walk {
            path: repo_root.display().to_string(),
            message: "not a directory".to_string(),
        });
    }

    let suffixes: Vec<&str> = config
        .meta_suffixes
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let walker = WalkDir::new(repo_root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !config
                    .exclude_dirs
                    .iter()
                    .any(|name| entry.file_name().to_str() == Some(name.as_str()))
        });

    let mut paths = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable path during discovery");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if suffixes.iter().any(|suffix| name.ends_with(suffix)) {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Discover and parse every meta document in the repository.
///
/// Parsing runs on `discovery.scan_workers` scoped threads; each worker owns a
/// contiguous slice of the sorted path list, so concatenating the results keeps
/// path order. Unreadable or malformed files come back as failed documents.
pub fn discover(ctx: &RunContext) -> Result<Vec<MetaDocument>, ScanError> {
    let paths = find_meta_files(&ctx.repo_root, &ctx.config.discovery)?;
    let workers = ctx.config.discovery.scan_workers.max(1);
    let chunk_size = paths.len().div_ceil(workers).max(1);

    let mut documents: Vec<MetaDocument> = thread::scope(|scope| {
        let handles: Vec<_> = paths
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|path| load_document(ctx, path))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(docs) => docs,
                Err(_) => {
                    warn!("discovery worker panicked; its documents are skipped");
                    Vec::new()
                }
            })
            .collect()
    });
    documents.sort_by(|a, b| a.path.cmp(&b.path));

    info!(
        documents = documents.len(),
        parsed = documents.iter().filter(|d| d.is_parsed()).count(),
        "discovered meta documents"
    );
    Ok(documents)
}

fn load_document(ctx: &RunContext, path: &Path) -> MetaDocument {
    let relative = ctx.relative(path);
    match fs::read_to_string(path) {
        Ok(text) => {
            let doc = MetaDocument::parse(relative, &text, &ctx.registry);
            debug!(path = %doc.path, meta_type = doc.meta_type(), "loaded meta document");
            doc
        }
        Err(err) => {
            warn!(path = %relative, error = %err, "failed reading meta document");
            MetaDocument::failed(relative, err.to_string())
        }
    }
}
