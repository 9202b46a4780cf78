//! Shared mock collaborators for unit tests.
//!
//! `MockGit` records every mutating call it receives and answers inspection
//! calls from canned state, so graph traversals and roll actions can be
//! exercised without spawning processes or touching real repositories.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::git::GitOperations;
use crate::package_index::PackageIndex;

#[derive(Default)]
pub(crate) struct MockGit {
    /// Rendered call log, in invocation order.
    pub calls: RefCell<Vec<String>>,
    working_trees: RefCell<HashSet<PathBuf>>,
    head_revisions: RefCell<HashMap<PathBuf, String>>,
    remote_heads: RefCell<HashMap<(String, String), String>>,
    branches_containing: RefCell<HashMap<String, Vec<String>>>,
    files_at_revision: RefCell<HashMap<(PathBuf, String), Vec<u8>>>,
    submodule_paths: RefCell<HashMap<PathBuf, Vec<String>>>,
}

impl MockGit {
    pub fn add_working_tree(&self, dir: &Path) {
        self.working_trees.borrow_mut().insert(dir.to_path_buf());
    }

    pub fn set_head(&self, dir: &Path, revision: &str) {
        self.add_working_tree(dir);
        self.head_revisions
            .borrow_mut()
            .insert(dir.to_path_buf(), revision.to_string());
    }

    pub fn set_remote_head(&self, url: &str, branch: &str, revision: &str) {
        self.remote_heads
            .borrow_mut()
            .insert((url.to_string(), branch.to_string()), revision.to_string());
    }

    pub fn set_branches_containing(&self, revision: &str, branches: &[&str]) {
        self.branches_containing.borrow_mut().insert(
            revision.to_string(),
            branches.iter().map(|b| b.to_string()).collect(),
        );
    }

    pub fn set_file_at_revision(&self, dir: &Path, revision: &str, contents: &[u8]) {
        self.files_at_revision
            .borrow_mut()
            .insert((dir.to_path_buf(), revision.to_string()), contents.to_vec());
    }

    pub fn set_submodules(&self, dir: &Path, paths: &[&str]) {
        self.submodule_paths.borrow_mut().insert(
            dir.to_path_buf(),
            paths.iter().map(|p| p.to_string()).collect(),
        );
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn missing(&self, what: &str) -> Error {
        Error::ExternalCommandFailed {
            command: what.to_string(),
            stderr: "no canned response".to_string(),
        }
    }
}

impl GitOperations for MockGit {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        self.record(format!("clone {} {}", url, dest.display()));
        self.add_working_tree(dest);
        Ok(())
    }

    fn fetch(&self, dir: &Path, remote: &str) -> Result<()> {
        self.record(format!("fetch {} {}", dir.display(), remote));
        Ok(())
    }

    fn checkout_detached(&self, dir: &Path, revision: &str) -> Result<()> {
        self.record(format!("checkout {} {}", dir.display(), revision));
        self.set_head(dir, revision);
        Ok(())
    }

    fn rev_parse(&self, dir: &Path, args: &[&str]) -> Result<String> {
        self.record(format!("rev_parse {} {}", dir.display(), args.join(" ")));
        self.head_revisions
            .borrow()
            .get(dir)
            .cloned()
            .ok_or_else(|| self.missing(&format!("rev_parse {}", dir.display())))
    }

    fn toplevel(&self, dir: &Path) -> Option<PathBuf> {
        if self.working_trees.borrow().contains(dir) {
            Some(dir.to_path_buf())
        } else {
            None
        }
    }

    fn list_submodules(&self, dir: &Path) -> Result<Vec<String>> {
        Ok(self
            .submodule_paths
            .borrow()
            .get(dir)
            .cloned()
            .unwrap_or_default())
    }

    fn update_submodules(&self, dir: &Path, submodules: &[String], depth: u32) -> Result<()> {
        self.record(format!(
            "update_submodules {} [{}] depth={}",
            dir.display(),
            submodules.join(","),
            depth
        ));
        Ok(())
    }

    fn remote_branches_containing(&self, _dir: &Path, revision: &str) -> Result<Vec<String>> {
        Ok(self
            .branches_containing
            .borrow()
            .get(revision)
            .cloned()
            .unwrap_or_default())
    }

    fn remote_head(&self, url: &str, branch: &str) -> Result<String> {
        self.record(format!("remote_head {} {}", url, branch));
        self.remote_heads
            .borrow()
            .get(&(url.to_string(), branch.to_string()))
            .cloned()
            .ok_or_else(|| self.missing(&format!("remote_head {url} {branch}")))
    }

    fn show_file_at_revision(&self, dir: &Path, revision: &str, path: &str) -> Result<Vec<u8>> {
        self.record(format!("show {} {}:{}", dir.display(), revision, path));
        self.files_at_revision
            .borrow()
            .get(&(dir.to_path_buf(), revision.to_string()))
            .cloned()
            .ok_or_else(|| self.missing(&format!("show {revision}:{path}")))
    }

    fn format_ref(&self, _dir: &Path, revision: &str) -> Result<String> {
        Ok(format!("{revision} 2024-05-01 12:00:00 +0000 : subject"))
    }
}

/// Canned package index replies, keyed by package name.
#[derive(Default)]
pub(crate) struct MockPackageIndex {
    replies: HashMap<String, String>,
}

impl MockPackageIndex {
    pub fn with_reply(mut self, package: &str, output: &str) -> Self {
        self.replies.insert(package.to_string(), output.to_string());
        self
    }
}

impl PackageIndex for MockPackageIndex {
    fn query_versions(&self, package: &str, _flags: &[String]) -> Result<String> {
        self.replies
            .get(package)
            .cloned()
            .ok_or_else(|| Error::ExternalCommandFailed {
                command: format!("pip index versions {package}"),
                stderr: "no canned response".to_string(),
            })
    }
}
