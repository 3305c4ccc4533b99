//! Per-target write exclusion.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per absolute target path, created on first use.
///
/// Two gaps that resolve to the same file serialize their read-merge-write
/// sequence; unrelated files proceed in parallel.
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            Arc::clone(locks.entry(path.to_path_buf()).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_path_is_exclusive() {
        let locks = Arc::new(PathLocks::new());
        let guard = locks.lock(Path::new("/repo/README.md")).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock(Path::new("/repo/README.md")).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());
        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_paths_do_not_block() {
        let locks = PathLocks::new();
        let _a = locks.lock(Path::new("/repo/a.md")).await;
        let _b = tokio::time::timeout(Duration::from_secs(1), locks.lock(Path::new("/repo/b.md")))
            .await
            .unwrap();
    }
}
