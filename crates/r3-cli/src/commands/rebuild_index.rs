use anyhow::Result;
use clap::Args as ClapArgs;

use crate::commands::open_repository;
use crate::Cli;

/// `r3 rebuild-index [--repository R]` — recompute `index.yaml` from the
/// jobs on disk, discarding whatever was there before.
#[derive(ClapArgs)]
pub struct Args {}

pub fn run(_args: &Args, cli: &Cli) -> Result<i32> {
    let mut repo = open_repository(cli)?;
    repo.rebuild_index()?;
    println!("rebuilt index at {}", repo.root().display());
    Ok(0)
}
