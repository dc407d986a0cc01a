use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;

use crate::commands::job_from_path;
use crate::Cli;

/// `r3 checkout JOB_PATH TARGET` — materialise a committed job into a fresh
/// working directory. `JOB_PATH` is the job's own directory
/// (`<repository>/jobs/<id>`), which also identifies the repository.
#[derive(ClapArgs)]
pub struct Args {
    pub job_path: PathBuf,
    pub target: PathBuf,
}

pub fn run(args: &Args, _cli: &Cli) -> Result<i32> {
    let (mut repo, mut job) = job_from_path(&args.job_path)?;
    repo.checkout(&mut job, &args.target)?;
    println!("checked out {} to {}", args.job_path.display(), args.target.display());
    Ok(0)
}
