//! Metasync CLI: the `metasync` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let default = if verbose > 0 { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Logs go to stderr so `--json` stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);
    let global = &cli.global;

    let code = match cli.command {
        Commands::Check { json } => commands::check::run(global, json),

        Commands::Graph { json } => commands::graph::run(global, json),

        Commands::Contracts { json } => commands::contracts::run(json),

        Commands::Generate {
            from_report,
            dry_run,
            refresh,
            json,
        } => commands::generate::run(
            global,
            commands::generate::Args {
                from_report,
                dry_run,
                refresh,
                json,
            },
        ),

        Commands::Ci { command } => commands::ci::run(global, command),

        Commands::Init { force } => commands::init::run(global, force),
    };
    std::process::exit(code);
}
