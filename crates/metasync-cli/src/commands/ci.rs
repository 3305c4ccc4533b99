use crate::cli::GlobalArgs;
use crate::commands::check;
use crate::support::{EXIT_CLEAN, EXIT_GAPS, EXIT_RUNNER_UNAVAILABLE, context_or_exit};
use std::process::Command;
use tracing::info;

/// Check, then run the test command and return its exit code unchanged.
pub fn run(global: &GlobalArgs, command: Vec<String>) -> i32 {
    let ctx = context_or_exit(global);
    let code = check::check(&ctx, false);
    if code != EXIT_CLEAN {
        eprintln!("metasync ci: compliance check failed; test runner not started");
        return code;
    }

    let argv = if command.is_empty() {
        ctx.config.ci.test_command.clone()
    } else {
        command
    };
    let Some((program, args)) = argv.split_first() else {
        eprintln!("metasync ci: no test command given and ci.test_command is empty");
        return EXIT_CLEAN;
    };

    info!(program = %program, "handing off to test runner");
    let status = match Command::new(program)
        .args(args)
        .current_dir(&ctx.repo_root)
        .status()
    {
        Ok(status) => status,
        Err(e) => {
            eprintln!("error: failed to start test runner `{program}`: {e}");
            return EXIT_RUNNER_UNAVAILABLE;
        }
    };
    // Killed by a signal: no code to propagate.
    status.code().unwrap_or(EXIT_GAPS)
}
