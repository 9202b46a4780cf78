//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for the
//! `repo-workspace` application. It uses the `thiserror` library to create a
//! comprehensive `Error` enum that covers all anticipated failure modes,
//! providing clear and descriptive error messages.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum that represents all possible errors that can
//!   occur within the application. Each variant corresponds to a specific
//!   type of error and includes contextual information to aid in debugging.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`, used
//!   throughout the application to simplify function signatures and ensure
//!   type safety.
//!
//! Every error is fatal to the running command: there is no retry logic
//! anywhere in the tool, and transient failures from the underlying version
//! control or package index commands are surfaced as-is through
//! `ExternalCommandFailed`. Conditions that are expected during normal
//! operation (a missing pin manifest, a dependency already at its pinned
//! revision, a no-op pin write) are modeled as ordinary return values, not
//! errors.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for repo-workspace operations
#[derive(Error, Debug)]
pub enum Error {
    /// The requested repository name is not present in the registry.
    ///
    /// The message enumerates every registered name so the user can spot
    /// typos without re-running with extra verbosity.
    #[error("No repository matching '{name}' found (did you mean one of: {known})")]
    UnknownRepository { name: String, known: String },

    /// Two repositories were registered under the same name.
    #[error("Repository '{name}' is already registered")]
    DuplicateRepository { name: String },

    /// A declared dependency's directory is not a valid working tree.
    #[error("Dependency {name} at {} is not checked out", path.display())]
    DependencyNotCheckedOut { name: String, path: PathBuf },

    /// A checkout target directory exists but is not a working tree.
    #[error("Directory {} exists but is not a git repository", path.display())]
    CorruptRepositoryDirectory { path: PathBuf },

    /// A captured revision is not reachable from the remote tracking branch.
    #[error("Revision not found on remote tracking branch {branch} (found on: {containing})")]
    RevisionNotUpstream { branch: String, containing: String },

    /// A roll action tried to update a pin that was never captured.
    #[error("Cannot update pin for {name} because it is not in the version file")]
    UnknownPin { name: String },

    /// `roll` was invoked on a repository that declares no schedules.
    #[error("Repository {name} has no rolling schedules")]
    NoRollingSchedules { name: String },

    /// The requested schedule name is not declared on the repository.
    #[error("Unknown schedule '{schedule}' for {name}. Available: {available}")]
    UnknownSchedule {
        name: String,
        schedule: String,
        available: String,
    },

    /// An inherit-via roll action found no pin entry for the via repository.
    #[error("Via repo {via} is not a pin of {name} (pins: {pins})")]
    ViaRepoNotPinned {
        via: String,
        name: String,
        pins: String,
    },

    /// The via repository's historical manifest lacks the needed entry.
    #[error(
        "Repository {via} does not contain a version pin for {dep}, \
         which is needed to roll requested versions (available: {available})"
    )]
    MissingTransitivePin {
        via: String,
        dep: String,
        available: String,
    },

    /// The package index output did not contain the expected marker line.
    #[error(
        "Could not find an 'Available versions:' line in the package index \
         output for {package}"
    )]
    VersionQueryFormatUnrecognized { package: String },

    /// A requirements manifest named by a roll action does not exist.
    #[error("Cannot update requirements (does not exist): {}", path.display())]
    RequirementFileMissing { path: PathBuf },

    /// A version control or package index command exited non-zero.
    ///
    /// Captures the rendered command line and the command's error output.
    #[error("External command failed: {command}{}", if stderr.is_empty() { String::new() } else { format!("\n{stderr}") })]
    ExternalCommandFailed { command: String, stderr: String },

    /// No workspace marker file was found walking up from the given path.
    #[error("No workspace found in a directory enclosing {}", path.display())]
    NoWorkspace { path: PathBuf },

    /// The current directory does not enclose a version-controlled tree.
    #[error("Directory {} does not enclose a git repository", path.display())]
    NotARepository { path: PathBuf },

    /// The enclosing working tree is not named after a registered repository.
    #[error("Git repository {} is not a known repository", path.display())]
    UnregisteredRepository { path: PathBuf },

    /// A pin manifest block could not be parsed.
    #[error("Pin manifest parse error in {block}: {message}")]
    ManifestParse { block: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
