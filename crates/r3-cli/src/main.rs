mod commands;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;

use commands::Commands;

/// `r3` — commit, check out, and search a content-addressed repository of
/// reproducible research jobs (§6.6).
#[derive(Parser)]
#[command(name = "r3", about = "A content-addressed repository for reproducible research jobs")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Repository to operate on (falls back to the R3_REPOSITORY environment
    /// variable, then the current directory)
    #[arg(long, global = true, env = "R3_REPOSITORY")]
    repository: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    match commands::run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("fatal: {e}");
            process::exit(1);
        }
    }
}
