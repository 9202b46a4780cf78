//! # Roll Command Implementation
//!
//! Applies a named rolling-update schedule declared on the enclosing
//! repository. Actions run in declaration order; the first failure aborts
//! the roll with the underlying error.

use anyhow::Result;
use clap::Args;

use repo_workspace::catalog;
use repo_workspace::git::SystemGit;
use repo_workspace::package_index::SystemPackageIndex;
use repo_workspace::roll;
use repo_workspace::workspace;

/// Apply a dependency rolling schedule
#[derive(Args, Debug)]
pub struct RollArgs {
    /// Name of the schedule to apply
    pub schedule: String,
}

/// Execute the `roll` command.
pub fn execute(args: RollArgs) -> Result<()> {
    let registry = catalog::builtin()?;
    let git = SystemGit;
    let index = SystemPackageIndex;
    let cwd = std::env::current_dir()?;
    let (ws, repo, _repo_top) = workspace::current_repo(&registry, &git, &cwd)?;
    roll::roll(&ws, &registry, &git, &index, repo, &args.schedule)?;
    Ok(())
}
