pub mod checkout;
pub mod commit;
pub mod find;
pub mod init;
pub mod rebuild_index;
pub mod remove;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::Cli;

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new, empty repository
    Init(init::Args),
    /// Commit a working directory as a new job
    Commit(commit::Args),
    /// Materialise a committed job into a working directory
    Checkout(checkout::Args),
    /// Remove a committed job
    Remove(remove::Args),
    /// Search committed jobs by tag
    Find(find::Args),
    /// Recompute index.yaml from the jobs on disk
    RebuildIndex(rebuild_index::Args),
}

pub fn run(cli: Cli) -> Result<i32> {
    match &cli.command {
        Commands::Init(args) => init::run(args, &cli),
        Commands::Commit(args) => commit::run(args, &cli),
        Commands::Checkout(args) => checkout::run(args, &cli),
        Commands::Remove(args) => remove::run(args, &cli),
        Commands::Find(args) => find::run(args, &cli),
        Commands::RebuildIndex(args) => rebuild_index::run(args, &cli),
    }
}

/// Open the repository named by `--repository`/`R3_REPOSITORY`, defaulting
/// to the current directory (§6.6).
pub(crate) fn open_repository(cli: &Cli) -> Result<r3_repository::Repository> {
    let path = cli.repository.clone().unwrap_or_else(|| PathBuf::from("."));
    r3_repository::Repository::open(&path)
        .with_context(|| format!("opening repository at {}", path.display()))
}

/// `checkout`/`remove` take a `JOB_PATH` naming the committed job's own
/// directory directly (`<repository>/jobs/<id>`) rather than a separate
/// `--repository` flag; the repository root and job id are both derived
/// from that one path.
pub(crate) fn job_from_path(job_path: &Path) -> Result<(r3_repository::Repository, r3_model::Job)> {
    let job_path = std::fs::canonicalize(job_path)
        .with_context(|| format!("resolving job path {}", job_path.display()))?;
    let id = job_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow::anyhow!("job path has no final component: {}", job_path.display()))?
        .to_string();
    let repository_root = job_path
        .parent()
        .and_then(Path::parent)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "job path is not inside a repository's jobs/ directory: {}",
                job_path.display()
            )
        })?;
    let repo = r3_repository::Repository::open(repository_root)
        .with_context(|| format!("opening repository at {}", repository_root.display()))?;
    let job = r3_model::Job::with_id(job_path, id);
    Ok((repo, job))
}
