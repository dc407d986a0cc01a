use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;

use crate::Cli;

/// `r3 init PATH` — create a fresh, empty repository.
#[derive(ClapArgs)]
pub struct Args {
    /// Directory the repository is created at; parent directories are
    /// created as needed
    pub path: PathBuf,
}

pub fn run(args: &Args, _cli: &Cli) -> Result<i32> {
    let repo =
        r3_repository::Repository::init(&args.path).with_context(|| "initialising repository")?;
    println!("initialised empty repository at {}", repo.root().display());
    Ok(0)
}
