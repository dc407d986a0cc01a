use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;
use r3_model::Job;

use crate::commands::open_repository;
use crate::Cli;

/// `r3 commit PATH [--repository R]` — commit a working directory as a new
/// job in the repository.
#[derive(ClapArgs)]
pub struct Args {
    /// Working directory to commit
    pub path: PathBuf,
}

pub fn run(args: &Args, cli: &Cli) -> Result<i32> {
    let mut repo = open_repository(cli)?;
    let job = Job::new(&args.path);
    let (committed, warnings) = repo.commit(job)?;
    for warning in &warnings {
        eprintln!("warning: {warning}");
    }
    println!("{}", committed.id().expect("commit always assigns an id"));
    Ok(0)
}
