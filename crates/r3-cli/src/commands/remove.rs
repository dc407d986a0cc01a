use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;

use crate::commands::job_from_path;
use crate::Cli;

/// `r3 remove JOB_PATH` — remove a committed job. Fails if another
/// committed job still depends on it.
#[derive(ClapArgs)]
pub struct Args {
    pub job_path: PathBuf,
}

pub fn run(args: &Args, _cli: &Cli) -> Result<i32> {
    let (mut repo, job) = job_from_path(&args.job_path)?;
    repo.remove(&job)?;
    println!("removed {}", args.job_path.display());
    Ok(0)
}
