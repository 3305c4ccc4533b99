use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "metasync",
    about = "Metasync: meta-contract compliance checks and gap-driven generation",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Repository root to scan
    #[arg(long, global = true, default_value = ".")]
    pub repo_root: String,

    /// Config file (default: <repo-root>/metasync.toml when present)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Report unknown contract types as invalid_meta gaps
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log debug detail to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan every meta document and write the gap report
    ///
    /// Exit 0: no gaps. Exit 1: gaps found, report written.
    /// Exit 2: dependency cycle or bad config, nothing written.
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the topological order and extraction batches of module contracts
    Graph {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered contract types
    Contracts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fill generatable gaps, then rescan and rewrite the report
    Generate {
        /// Take gaps from the existing report instead of a fresh scan
        #[arg(long)]
        from_report: bool,

        /// Decide actions without calling the backend or writing files
        #[arg(long)]
        dry_run: bool,

        /// Also regenerate the region of doc targets that are already compliant
        #[arg(long)]
        refresh: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the check, then hand off to the test runner on success
    Ci {
        /// Test command (default: ci.test_command from config)
        #[arg(last = true)]
        command: Vec<String>,
    },

    /// Write a default metasync.toml at the repository root
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}
