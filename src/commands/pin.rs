//! # Pin Command Implementation
//!
//! Captures the currently checked-out revision of every declared dependency
//! of the enclosing repository into its pin manifest. With
//! `--require-upstream`, each captured revision must additionally be
//! reachable from the dependency's remote tracking branch.

use anyhow::Result;
use clap::Args;

use repo_workspace::catalog;
use repo_workspace::git::SystemGit;
use repo_workspace::pins;
use repo_workspace::workspace;

/// Pin deps to current revisions
#[derive(Args, Debug)]
pub struct PinArgs {
    /// Require every pinned revision to be on its remote tracking branch
    #[arg(long)]
    pub require_upstream: bool,
}

/// Execute the `pin` command.
pub fn execute(args: PinArgs) -> Result<()> {
    let registry = catalog::builtin()?;
    let git = SystemGit;
    let cwd = std::env::current_dir()?;
    let (ws, repo, repo_top) = workspace::current_repo(&registry, &git, &cwd)?;
    pins::update(&ws, &registry, &git, repo, &repo_top, args.require_upstream)?;
    Ok(())
}
