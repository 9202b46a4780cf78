//! # Version Control Operations
//!
//! This module wraps the system `git` command behind the `GitOperations`
//! trait. Using the system binary means authentication (SSH keys, credential
//! helpers, personal access tokens) works exactly as it does for the user's
//! own git invocations.
//!
//! ## Design
//!
//! The trait-based design separates the traversal and pin logic from the
//! concrete process-spawning implementation. In the application, `SystemGit`
//! is used; in tests, the trait is implemented by call-recording mocks so
//! graph traversals can be exercised without touching real repositories.
//!
//! All operations are synchronous and block the caller until the underlying
//! command completes. A non-zero exit status is reported as
//! `Error::ExternalCommandFailed`, carrying the rendered command line and
//! captured stderr.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::{Error, Result};

/// Trait for version control operations - allows mocking in tests
pub trait GitOperations {
    /// Clone a repository into the destination directory.
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;

    /// Fetch from the named remote.
    fn fetch(&self, dir: &Path, remote: &str) -> Result<()>;

    /// Check out a revision with a detached HEAD.
    fn checkout_detached(&self, dir: &Path, revision: &str) -> Result<()>;

    /// Run `rev-parse` with the given arguments and return trimmed stdout.
    fn rev_parse(&self, dir: &Path, args: &[&str]) -> Result<String>;

    /// The toplevel directory of the working tree enclosing `dir`, or `None`
    /// if `dir` is not inside a working tree.
    fn toplevel(&self, dir: &Path) -> Option<PathBuf>;

    /// Submodule paths declared by the working tree, in status order.
    fn list_submodules(&self, dir: &Path) -> Result<Vec<String>>;

    /// Initialize and update the given submodule paths. A `depth` greater
    /// than zero requests a shallow submodule fetch.
    fn update_submodules(&self, dir: &Path, submodules: &[String], depth: u32) -> Result<()>;

    /// Names of remote branches containing `revision`.
    fn remote_branches_containing(&self, dir: &Path, revision: &str) -> Result<Vec<String>>;

    /// The tip revision of `branch` on the remote at `url`.
    fn remote_head(&self, url: &str, branch: &str) -> Result<String>;

    /// The contents of `path` as it existed at `revision`, read from
    /// history without touching the working tree.
    fn show_file_at_revision(&self, dir: &Path, revision: &str, path: &str) -> Result<Vec<u8>>;

    /// A one-line human-readable summary of a commit.
    fn format_ref(&self, dir: &Path, revision: &str) -> Result<String>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command to perform real version control operations.
pub struct SystemGit;

fn render_command(args: &[&str], cwd: Option<&Path>) -> String {
    match cwd {
        Some(dir) => format!("git {} (in {})", args.join(" "), dir.display()),
        None => format!("git {}", args.join(" ")),
    }
}

impl SystemGit {
    fn exec(&self, args: &[&str], cwd: Option<&Path>) -> Result<Output> {
        log::debug!("{}", render_command(args, cwd));
        let mut command = Command::new("git");
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        command.output().map_err(|e| Error::ExternalCommandFailed {
            command: render_command(args, cwd),
            stderr: e.to_string(),
        })
    }

    fn exec_checked(&self, args: &[&str], cwd: Option<&Path>) -> Result<Output> {
        let output = self.exec(args, cwd)?;
        if !output.status.success() {
            return Err(Error::ExternalCommandFailed {
                command: render_command(args, cwd),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }

    fn stdout_string(output: Output) -> String {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}

impl GitOperations for SystemGit {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let dest_str = dest.to_string_lossy().into_owned();
        self.exec_checked(&["clone", url, dest_str.as_str()], None)?;
        Ok(())
    }

    fn fetch(&self, dir: &Path, remote: &str) -> Result<()> {
        self.exec_checked(&["fetch", remote], Some(dir))?;
        Ok(())
    }

    fn checkout_detached(&self, dir: &Path, revision: &str) -> Result<()> {
        self.exec_checked(&["checkout", "--detach", revision], Some(dir))?;
        Ok(())
    }

    fn rev_parse(&self, dir: &Path, args: &[&str]) -> Result<String> {
        let mut full_args = vec!["rev-parse"];
        full_args.extend_from_slice(args);
        let output = self.exec_checked(&full_args, Some(dir))?;
        Ok(Self::stdout_string(output))
    }

    fn toplevel(&self, dir: &Path) -> Option<PathBuf> {
        let output = self.exec(&["rev-parse", "--show-toplevel"], Some(dir)).ok()?;
        if !output.status.success() {
            return None;
        }
        Some(PathBuf::from(Self::stdout_string(output)))
    }

    fn list_submodules(&self, dir: &Path) -> Result<Vec<String>> {
        let output = self.exec_checked(&["submodule", "status"], Some(dir))?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let mut results = Vec::new();
        for line in stdout.lines() {
            // Status lines look like: "<sha> <path> (<describe>)".
            if let Some(path) = line.split_whitespace().nth(1) {
                results.push(path.to_string());
            }
        }
        Ok(results)
    }

    fn update_submodules(&self, dir: &Path, submodules: &[String], depth: u32) -> Result<()> {
        let mut args = vec!["submodule".to_string(), "update".to_string(), "--init".to_string()];
        if depth > 0 {
            args.push("--depth".to_string());
            args.push("1".to_string());
        }
        args.push("--".to_string());
        args.extend(submodules.iter().cloned());
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.exec_checked(&arg_refs, Some(dir))?;
        Ok(())
    }

    fn remote_branches_containing(&self, dir: &Path, revision: &str) -> Result<Vec<String>> {
        let output = self.exec_checked(&["branch", "-r", "--contains", revision], Some(dir))?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        Ok(stdout.lines().map(|line| line.trim().to_string()).collect())
    }

    fn remote_head(&self, url: &str, branch: &str) -> Result<String> {
        let args = ["ls-remote", "--heads", url, branch];
        let output = self.exec_checked(&args, None)?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let lines: Vec<&str> = stdout.lines().collect();
        if lines.len() != 1 {
            return Err(Error::ExternalCommandFailed {
                command: render_command(&args, None),
                stderr: format!("expected exactly one matching head, got {}", lines.len()),
            });
        }
        match lines[0].split_whitespace().next() {
            Some(revision) => Ok(revision.to_string()),
            None => Err(Error::ExternalCommandFailed {
                command: render_command(&args, None),
                stderr: "malformed ls-remote output".to_string(),
            }),
        }
    }

    fn show_file_at_revision(&self, dir: &Path, revision: &str, path: &str) -> Result<Vec<u8>> {
        let spec = format!("{revision}:{path}");
        let output = self.exec_checked(&["show", &spec], Some(dir))?;
        Ok(output.stdout)
    }

    fn format_ref(&self, dir: &Path, revision: &str) -> Result<String> {
        let output = self.exec_checked(
            &["show", "--quiet", "--format=format:%h %ci : %s", revision],
            Some(dir),
        )?;
        Ok(Self::stdout_string(output))
    }
}
