use crate::cli::GlobalArgs;
use metasync_kernel::{Config, Gap, RunContext};
use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process;

pub const EXIT_CLEAN: i32 = 0;
pub const EXIT_GAPS: i32 = 1;
pub const EXIT_FATAL: i32 = 2;
/// `ci` could not start the test runner; same code a shell uses.
pub const EXIT_RUNNER_UNAVAILABLE: i32 = 127;
pub const GAP_SAMPLE_LIMIT: usize = 25;

/// Print `error: ...` and exit with the fatal code.
pub fn fatal(message: impl Display) -> ! {
    eprintln!("error: {message}");
    process::exit(EXIT_FATAL);
}

/// Build the run context from global flags; bad roots and configs are fatal.
pub fn context_or_exit(global: &GlobalArgs) -> RunContext {
    let repo_root = PathBuf::from(&global.repo_root);
    if !repo_root.is_dir() {
        fatal(format!(
            "repository root is not a directory: {}",
            repo_root.display()
        ));
    }
    let explicit = global.config.as_deref().map(Path::new);
    let mut config = Config::discover(&repo_root, explicit).unwrap_or_else(|e| fatal(e));
    if global.strict {
        config.discovery.strict_types = true;
    }
    RunContext::new(repo_root, config)
}

pub fn print_json<T: Serialize>(value: &T) {
    let rendered =
        serde_json::to_string_pretty(value).unwrap_or_else(|e| fatal(format!("json serialization: {e}")));
    println!("{rendered}");
}

pub fn sample_with_truncation<T>(items: Vec<T>, limit: usize) -> (Vec<T>, usize) {
    let total = items.len();
    let sample: Vec<T> = items.into_iter().take(limit).collect();
    let truncated = total.saturating_sub(sample.len());
    (sample, truncated)
}

pub fn print_sample_block(header: &str, items: &[String], truncated: usize) {
    if items.is_empty() {
        return;
    }

    println!("  {header} (showing up to {}):", items.len());
    for item in items {
        println!("    - {item}");
    }
    if truncated > 0 {
        println!("    - ... and {truncated} more");
    }
}

/// One-line summary of a gap for text output.
pub fn gap_line(gap: &Gap) -> String {
    let mut line = format!(
        "{} [{}] {} -> {}",
        gap.id, gap.kind, gap.meta_file, gap.target_file
    );
    if !gap.context.missing_sections.is_empty() {
        line.push_str(&format!(
            " (missing sections: {})",
            gap.context.missing_sections.join(", ")
        ));
    }
    if let Some(detail) = gap.context.problem.as_ref().or(gap.context.error.as_ref()) {
        line.push_str(&format!(": {detail}"));
    }
    line
}

pub fn print_gaps(gaps: &[Gap]) {
    let lines: Vec<String> = gaps.iter().map(gap_line).collect();
    let (sample, truncated) = sample_with_truncation(lines, GAP_SAMPLE_LIMIT);
    print_sample_block("Gaps", &sample, truncated);
}

pub fn yes_no(ok: bool) -> &'static str {
    if ok { "yes" } else { "no" }
}
