//! Shared test utilities for E2E tests.
//!
//! This module provides common fixtures and helper functions to reduce
//! duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_workspace();
//!     fixture.command().arg("sync").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::git_available;
    pub use super::TestFixture;
}

/// Marker file name the tool writes at the workspace root.
pub const META_FILENAME: &str = ".repo-workspace.json";

/// Check whether the system `git` binary is available.
///
/// Local-only tests that create real repositories bail out early when it
/// is not, rather than failing the suite.
#[allow(dead_code)]
pub fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

/// A test fixture that provides a temporary directory with an optional
/// workspace marker and git repositories.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write a workspace marker at the fixture root.
    pub fn with_workspace(self) -> Self {
        self.temp_dir
            .child(META_FILENAME)
            .write_str("{\n  \"version\": 0\n}\n")
            .expect("Failed to write workspace marker");
        self
    }

    /// Add a file with the given path and content.
    #[allow(dead_code)]
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a git repository under the fixture root and return its path.
    ///
    /// The repository gets one empty commit so HEAD resolves.
    #[allow(dead_code)]
    pub fn init_repo(&self, name: &str) -> PathBuf {
        let dir = self.path().join(name);
        std::fs::create_dir_all(&dir).expect("Failed to create repo dir");
        run_git(&dir, &["init", "--quiet"]);
        self.commit(name, "initial commit");
        // Point origin at the repository itself so fetches succeed locally.
        let dir_str = dir.to_string_lossy().into_owned();
        run_git(&dir, &["remote", "add", "origin", &dir_str]);
        dir
    }

    /// Create an empty commit in a repository and return its revision.
    #[allow(dead_code)]
    pub fn commit(&self, name: &str, message: &str) -> String {
        let dir = self.path().join(name);
        run_git(
            &dir,
            &[
                "-c",
                "user.name=test",
                "-c",
                "user.email=test@test",
                "commit",
                "--allow-empty",
                "--quiet",
                "-m",
                message,
            ],
        );
        self.head_revision(name)
    }

    /// The current HEAD revision of a repository under the fixture root.
    #[allow(dead_code)]
    pub fn head_revision(&self, name: &str) -> String {
        let dir = self.path().join(name);
        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(&dir)
            .output()
            .expect("Failed to run git rev-parse");
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Create a command configured to run in this fixture's directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("repo-workspace");
        cmd.current_dir(self.path());
        cmd
    }

    /// Create a command configured to run in a subdirectory of the fixture.
    #[allow(dead_code)]
    pub fn command_in(&self, subpath: &str) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("repo-workspace");
        cmd.current_dir(self.path().join(subpath));
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_with_workspace() {
        let fixture = TestFixture::new().with_workspace();
        assert!(fixture.path().join(META_FILENAME).exists());
    }
}
