//! # Dependency Graph Traversal
//!
//! Checkout and sync share one recursion shape: a depth-first, pre-order
//! walk over each repository's declared dependencies. Both traversals thread
//! a single piece of state through the whole call tree so that every
//! repository is processed at most once per invocation:
//!
//! - `checkout` carries a visited-name set, so a diamond-shaped graph clones
//!   each repository once and walks its sub-dependencies once;
//! - `sync` carries a map of dependency name to the revision it was synced
//!   to, so later branches of the graph detect "already synced".
//!
//! The shared state also guarantees termination if the registry data ever
//! contains a cycle. Exclusion filters are unanchored regular expressions,
//! matched against the bare dependency name for dependencies and against
//! `name:path` for submodules; an excluded node is logged and skipped, not
//! removed from the graph.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use regex::Regex;

use crate::error::{Error, Result};
use crate::git::GitOperations;
use crate::pins::PinManifest;
use crate::registry::{Registry, RepoDescriptor};
use crate::workspace::WorkspaceMeta;

/// Options controlling a recursive checkout.
pub struct CheckoutOptions {
    /// Clone from the read-write URL instead of the read-only one.
    pub rw: bool,
    /// Recurse into declared dependencies.
    pub checkout_deps: bool,
    /// Initialize submodules of repositories that declare them.
    pub submodules: bool,
    pub exclude_deps: Vec<Regex>,
    pub exclude_submodules: Vec<Regex>,
}

impl Default for CheckoutOptions {
    fn default() -> Self {
        Self {
            rw: true,
            checkout_deps: true,
            submodules: true,
            exclude_deps: Vec::new(),
            exclude_submodules: Vec::new(),
        }
    }
}

/// Options controlling a recursive sync.
#[derive(Default)]
pub struct SyncOptions {
    pub exclude_deps: Vec<Regex>,
    pub exclude_submodules: Vec<Regex>,
    /// A value greater than zero requests shallow submodule fetches.
    pub submodules_depth: u32,
}

/// Compile user-supplied exclusion patterns.
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| Ok(Regex::new(p)?)).collect()
}

fn is_excluded(patterns: &[Regex], candidate: &str) -> bool {
    patterns.iter().any(|p| p.is_match(candidate))
}

/// Clone `repo` into the workspace, then recurse into its dependencies.
///
/// `visited` must be shared across the entire invocation (including across
/// multiple top-level repositories of one command) so each repository is
/// considered at most once.
pub fn checkout(
    ws: &WorkspaceMeta,
    registry: &Registry,
    git: &dyn GitOperations,
    repo: &RepoDescriptor,
    options: &CheckoutOptions,
    visited: &mut HashSet<String>,
) -> Result<()> {
    if !visited.contains(&repo.name) {
        let url = if options.rw { &repo.rw_url } else { &repo.ro_url };
        let path = ws.repo_dir(&repo.name);
        if path.exists() {
            if git.toplevel(&path).is_none() {
                return Err(Error::CorruptRepositoryDirectory { path });
            }
            println!("Skipping checkout of {} (already exists)", repo.name);
        } else {
            println!(
                "Checking out {} into {} (from {})",
                repo.name,
                path.display(),
                url
            );
            git.clone_repo(url, &path)?;
            if options.submodules && repo.submodules {
                let submodules =
                    filter_submodules(git, &path, &repo.name, &options.exclude_submodules)?;
                if !submodules.is_empty() {
                    git.update_submodules(&path, &submodules, 0)?;
                }
            }
        }
    }

    visited.insert(repo.name.clone());
    if !options.checkout_deps {
        return Ok(());
    }
    for dep_name in &repo.deps {
        if visited.contains(dep_name) {
            continue;
        }
        if is_excluded(&options.exclude_deps, dep_name) {
            println!("Excluding {dep_name} based on --exclude-dep");
            continue;
        }
        let dep_repo = registry.get_required(dep_name)?;
        checkout(ws, registry, git, dep_repo, options, visited)?;
    }
    Ok(())
}

/// Move the working trees of `repo`'s dependencies to their pinned
/// revisions, then recurse into each dependency's own pins.
///
/// `updated_heads` memoizes the revision every dependency was synced to, so
/// the transitive closure is processed once per invocation.
pub fn sync(
    ws: &WorkspaceMeta,
    registry: &Registry,
    git: &dyn GitOperations,
    repo: &RepoDescriptor,
    repo_top: &Path,
    options: &SyncOptions,
    updated_heads: &mut BTreeMap<String, String>,
) -> Result<()> {
    let pins = PinManifest::load(repo_top)?.pinned_versions;
    for dep_name in &repo.deps {
        if is_excluded(&options.exclude_deps, dep_name) {
            println!("Excluding {dep_name} based on --exclude-dep");
            continue;
        }
        if updated_heads.contains_key(dep_name) {
            println!("Skipping duplicate dep in dag: {dep_name}");
            continue;
        }
        let dep_revision = match pins.get(dep_name) {
            Some(revision) => revision.clone(),
            None => {
                log::warn!("No pinned revision for {dep_name}. Skipping");
                continue;
            }
        };
        updated_heads.insert(dep_name.clone(), dep_revision.clone());
        println!("Syncing dep {dep_name} to {dep_revision}");

        let dep_repo = registry.get_required(dep_name)?;
        let dep_dir = ws.repo_dir(dep_name);
        let current_revision = git.rev_parse(&dep_dir, &["HEAD"])?;
        if current_revision == dep_revision {
            println!("  Already at needed revision.");
        } else {
            git.fetch(&dep_dir, "origin")?;
            git.checkout_detached(&dep_dir, &dep_revision)?;
        }

        // Submodule pointers can be stale even when the superproject
        // revision is unchanged, so the subset is updated either way.
        if dep_repo.submodules {
            let submodules =
                filter_submodules(git, &dep_dir, dep_name, &options.exclude_submodules)?;
            if !submodules.is_empty() {
                git.update_submodules(&dep_dir, &submodules, options.submodules_depth)?;
            }
        }

        sync(ws, registry, git, dep_repo, &dep_dir, options, updated_heads)?;
    }
    Ok(())
}

fn filter_submodules(
    git: &dyn GitOperations,
    dir: &Path,
    repo_name: &str,
    exclude_patterns: &[Regex],
) -> Result<Vec<String>> {
    let mut kept = Vec::new();
    for submodule in git.list_submodules(dir)? {
        if is_excluded(exclude_patterns, &format!("{repo_name}:{submodule}")) {
            println!("Excluding submodule {submodule} based on --exclude-submodule");
            continue;
        }
        kept.push(submodule);
    }
    Ok(kept)
}
