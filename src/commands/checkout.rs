//! # Checkout Command Implementation
//!
//! Clones one or more repositories into the enclosing workspace, recursing
//! into their declared dependencies. The visited set is shared across all
//! named repositories so a repository appearing in several dependency
//! trees is cloned once per invocation. With `--sync`, each checked-out
//! repository's dependencies are additionally moved to its pinned
//! revisions, sharing one revision map across the whole run.

use std::collections::{BTreeMap, HashSet};

use anyhow::Result;
use clap::Args;

use repo_workspace::catalog;
use repo_workspace::git::SystemGit;
use repo_workspace::walker::{self, CheckoutOptions, SyncOptions};
use repo_workspace::workspace::WorkspaceMeta;

/// Check out repositories and their transitive dependencies
#[derive(Args, Debug)]
pub struct CheckoutArgs {
    /// Repositories to check out
    #[arg(value_name = "REPO", required = true)]
    pub repos: Vec<String>,

    /// Sync deps as repositories are checked out
    #[arg(long)]
    pub sync: bool,

    /// Disable all submodule updates
    #[arg(long)]
    pub no_submodules: bool,

    /// Disable checkout of dependencies
    #[arg(long)]
    pub no_deps: bool,

    /// Clone repositories using the read-only (http) origins
    #[arg(long)]
    pub ro: bool,

    /// Exclude dependencies by regex
    #[arg(long = "exclude-dep", value_name = "REGEX")]
    pub exclude_dep: Vec<String>,

    /// Exclude submodules by regex (matched against 'repo:path')
    #[arg(long = "exclude-submodule", value_name = "REGEX")]
    pub exclude_submodule: Vec<String>,
}

/// Execute the `checkout` command.
pub fn execute(args: CheckoutArgs) -> Result<()> {
    let registry = catalog::builtin()?;
    let git = SystemGit;
    let cwd = std::env::current_dir()?;
    let ws = WorkspaceMeta::find_required(&cwd)?;

    let options = CheckoutOptions {
        rw: !args.ro,
        checkout_deps: !args.no_deps,
        submodules: !args.no_submodules,
        exclude_deps: walker::compile_patterns(&args.exclude_dep)?,
        exclude_submodules: walker::compile_patterns(&args.exclude_submodule)?,
    };
    let sync_options = SyncOptions {
        exclude_deps: walker::compile_patterns(&args.exclude_dep)?,
        exclude_submodules: walker::compile_patterns(&args.exclude_submodule)?,
        submodules_depth: 0,
    };

    let mut visited = HashSet::new();
    let mut updated_heads = BTreeMap::new();
    for name in &args.repos {
        let repo = registry.get_required(name)?;
        walker::checkout(&ws, &registry, &git, repo, &options, &mut visited)?;
        if args.sync {
            walker::sync(
                &ws,
                &registry,
                &git,
                repo,
                &ws.repo_dir(name),
                &sync_options,
                &mut updated_heads,
            )?;
        }
    }
    Ok(())
}
