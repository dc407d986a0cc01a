use anyhow::Result;
use clap::Args as ClapArgs;

use crate::commands::open_repository;
use crate::Cli;

/// `r3 find [-t TAG]... [--latest|--all] [--long]` — search committed jobs
/// by tag. With no tags, matches every job.
#[derive(ClapArgs)]
pub struct Args {
    /// Restrict to jobs carrying this tag; may be repeated
    #[arg(short = 't', long = "tag", action = clap::ArgAction::Append)]
    pub tag: Vec<String>,

    /// Only the single latest match
    #[arg(long, conflicts_with = "all")]
    pub latest: bool,

    /// Every match, ascending by commit time (default)
    #[arg(long, conflicts_with = "latest")]
    pub all: bool,

    /// Print commit time and tags alongside each job id
    #[arg(short = 'l', long = "long")]
    pub long: bool,
}

pub fn run(args: &Args, cli: &Cli) -> Result<i32> {
    let mut repo = open_repository(cli)?;
    let jobs = repo.find(&args.tag, args.latest)?;
    for mut job in jobs {
        if args.long {
            let metadata = job.metadata()?;
            let tags = metadata
                .tags
                .iter()
                .map(|t| format!("#{t}"))
                .collect::<Vec<_>>()
                .join(" ");
            let datetime = metadata.committed_at.clone().unwrap_or_default();
            println!("{} | {} | {}", job.id().unwrap_or(""), datetime, tags);
        } else {
            println!("{}", job.id().unwrap_or(""));
        }
    }
    Ok(0)
}
