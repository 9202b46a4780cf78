//! # Sync Command Implementation
//!
//! Moves the working trees of the enclosing repository's dependencies to
//! the revisions recorded in its pin manifest, recursing into each
//! dependency's own pins. Dependencies without a pinned entry are skipped
//! with a warning; dependencies already at their pinned revision are left
//! untouched.

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;

use repo_workspace::catalog;
use repo_workspace::git::SystemGit;
use repo_workspace::walker::{self, SyncOptions};
use repo_workspace::workspace;

/// Sync dependent repositories to pinned revisions
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Exclude dependencies by regex
    #[arg(long = "exclude-dep", value_name = "REGEX")]
    pub exclude_dep: Vec<String>,

    /// Exclude submodules by regex (matched against 'repo:path')
    #[arg(long = "exclude-submodule", value_name = "REGEX")]
    pub exclude_submodule: Vec<String>,

    /// Update submodules with a shallow fetch depth
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub submodules_depth: u32,
}

/// Execute the `sync` command.
pub fn execute(args: SyncArgs) -> Result<()> {
    let registry = catalog::builtin()?;
    let git = SystemGit;
    let cwd = std::env::current_dir()?;
    let (ws, repo, repo_top) = workspace::current_repo(&registry, &git, &cwd)?;

    let options = SyncOptions {
        exclude_deps: walker::compile_patterns(&args.exclude_dep)?,
        exclude_submodules: walker::compile_patterns(&args.exclude_submodule)?,
        submodules_depth: args.submodules_depth,
    };
    let mut updated_heads = BTreeMap::new();
    walker::sync(
        &ws,
        &registry,
        &git,
        repo,
        &repo_top,
        &options,
        &mut updated_heads,
    )?;
    Ok(())
}
