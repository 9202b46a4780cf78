//! # Repository Registry
//!
//! The registry is the static catalog of repositories the tool knows about:
//! identity (name and clone URLs), the declared dependency edges between
//! repositories, and the named rolling-update schedules.
//!
//! ## Design
//!
//! The registry is built once at process start through `RegistryBuilder` and
//! passed by reference to every component that needs it. It is immutable
//! after `build()`: there is no removal operation, and registering a
//! duplicate name is a fatal configuration error. Lookups preserve
//! registration order, which keeps the "did you mean" listing in
//! `get_required` stable.
//!
//! The set of descriptors forms a directed graph over the `deps` edges. The
//! data model does not prevent cycles; the traversals in `walker` carry a
//! visited set so they terminate regardless.

use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::roll::RollAction;

/// A statically declared repository: identity, dependency edges, and
/// rolling-update schedules.
#[derive(Debug, Clone)]
pub struct RepoDescriptor {
    /// Unique name, also the directory name inside the workspace root.
    pub name: String,
    /// Read-only clone URL (typically https).
    pub ro_url: String,
    /// Read-write clone URL (typically ssh).
    pub rw_url: String,
    /// Names of repositories this one depends on, in declaration order.
    pub deps: Vec<String>,
    /// Whether the repository carries submodules that need initialization.
    pub submodules: bool,
    /// Branch whose remote tip a remote-head roll action advances to.
    pub tracking_branch: String,
    /// Named, ordered lists of roll actions.
    pub schedules: BTreeMap<String, Vec<RollAction>>,
}

impl RepoDescriptor {
    pub fn new(name: &str, ro_url: &str, rw_url: &str) -> Self {
        Self {
            name: name.to_string(),
            ro_url: ro_url.to_string(),
            rw_url: rw_url.to_string(),
            deps: Vec::new(),
            submodules: false,
            tracking_branch: "main".to_string(),
            schedules: BTreeMap::new(),
        }
    }

    pub fn with_deps(mut self, deps: &[&str]) -> Self {
        self.deps = deps.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_submodules(mut self) -> Self {
        self.submodules = true;
        self
    }

    pub fn with_tracking_branch(mut self, branch: &str) -> Self {
        self.tracking_branch = branch.to_string();
        self
    }

    pub fn with_schedule(mut self, name: &str, actions: Vec<RollAction>) -> Self {
        self.schedules.insert(name.to_string(), actions);
        self
    }
}

/// Read-only catalog of registered repositories.
#[derive(Debug, Default)]
pub struct Registry {
    repos: Vec<RepoDescriptor>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            registry: Registry::default(),
        }
    }

    pub fn find(&self, name: &str) -> Option<&RepoDescriptor> {
        self.index.get(name).map(|&i| &self.repos[i])
    }

    /// Look up a repository, failing with a message that enumerates every
    /// registered name in registration order.
    pub fn get_required(&self, name: &str) -> Result<&RepoDescriptor> {
        self.find(name).ok_or_else(|| Error::UnknownRepository {
            name: name.to_string(),
            known: self.names().join(", "),
        })
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.repos.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Builder used to populate a `Registry` once at process start.
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    pub fn register(&mut self, descriptor: RepoDescriptor) -> Result<()> {
        if self.registry.index.contains_key(&descriptor.name) {
            return Err(Error::DuplicateRepository {
                name: descriptor.name.clone(),
            });
        }
        self.registry
            .index
            .insert(descriptor.name.clone(), self.registry.repos.len());
        self.registry.repos.push(descriptor);
        Ok(())
    }

    pub fn build(self) -> Registry {
        self.registry
    }
}
