//! # Package Index Queries
//!
//! Version-bump roll actions ask an external package index which versions of
//! a package are available. The query shells out to `pip index versions`,
//! whose output is scanned for an "Available versions:" line by the roll
//! framework; this module only returns the raw text.
//!
//! As with version control, the concrete process-spawning implementation
//! sits behind a trait so roll actions can be unit tested against canned
//! output.

use std::process::Command;

use crate::error::{Error, Result};

/// Trait for package index queries - allows mocking in tests
pub trait PackageIndex {
    /// Raw output of a version listing query for `package`. The flags are
    /// passed through to the underlying tool (extra index URLs,
    /// pre-release opt-in, and similar).
    fn query_versions(&self, package: &str, flags: &[String]) -> Result<String>;
}

/// The default implementation, which invokes `pip index versions` through
/// the system Python interpreter.
pub struct SystemPackageIndex;

impl PackageIndex for SystemPackageIndex {
    fn query_versions(&self, package: &str, flags: &[String]) -> Result<String> {
        let mut args: Vec<String> = vec!["-m".to_string(), "pip".to_string(), "index".to_string()];
        args.extend(flags.iter().cloned());
        args.push("versions".to_string());
        args.push(package.to_string());

        let rendered = format!("python3 {}", args.join(" "));
        log::debug!("{rendered}");
        let output = Command::new("python3").args(&args).output().map_err(|e| {
            Error::ExternalCommandFailed {
                command: rendered.clone(),
                stderr: e.to_string(),
            }
        })?;
        if !output.status.success() {
            return Err(Error::ExternalCommandFailed {
                command: rendered,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
