use crate::cli::GlobalArgs;
use crate::support::{EXIT_CLEAN, fatal};
use metasync_kernel::{Config, DEFAULT_CONFIG_FILE, write_atomic};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct InitOutcome {
    pub config_path: PathBuf,
    pub overwritten: bool,
}

pub fn init_config(repo_root: &Path, force: bool) -> Result<InitOutcome, String> {
    if !repo_root.is_dir() {
        return Err(format!(
            "init path is not a directory: {}",
            repo_root.display()
        ));
    }
    let config_path = repo_root.join(DEFAULT_CONFIG_FILE);
    let exists = config_path.exists();
    if exists && !force {
        return Err(format!(
            "{} already exists; pass --force to overwrite",
            config_path.display()
        ));
    }

    let text = Config::default().to_toml_string().map_err(|e| e.to_string())?;
    write_atomic(&config_path, text.as_bytes())
        .map_err(|e| format!("failed to write {}: {e}", config_path.display()))?;
    Ok(InitOutcome {
        config_path,
        overwritten: exists,
    })
}

pub fn run(global: &GlobalArgs, force: bool) -> i32 {
    match init_config(Path::new(&global.repo_root), force) {
        Ok(outcome) => {
            println!("metasync init");
            println!("  config: {}", outcome.config_path.display());
            if outcome.overwritten {
                println!("  replaced existing config");
            }
            EXIT_CLEAN
        }
        Err(e) => fatal(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_config_that_loads_back_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = init_config(dir.path(), false).unwrap();
        assert!(!outcome.overwritten);
        let loaded = Config::load(&outcome.config_path).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), false).unwrap();
        let err = init_config(dir.path(), false).unwrap_err();
        assert!(err.contains("--force"));
        assert!(init_config(dir.path(), true).unwrap().overwritten);
    }
}
