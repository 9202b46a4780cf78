//! # Pin Manifests
//!
//! Each repository stores a pin manifest at a fixed filename inside its
//! working tree. The manifest records, for every tracked dependency, the
//! exact revision its working tree should be set to, the read-only origin
//! URL to clone it from, and whether it carries submodules.
//!
//! ## On-disk shape
//!
//! The file is self-describing: a fixed auto-generated header, three named
//! blocks (`PINNED_VERSIONS`, `ORIGINS`, `SUBMODULES`) holding JSON object
//! literals with stable key ordering, and finally the embedded bootstrap
//! program (see `bootstrap`), which makes the file independently executable
//! for minimal dependency checkouts. Submodule flags are written as the
//! integer `1` so the data blocks stay readable by the bootstrap
//! interpreter.
//!
//! The manifest is parsed by a dedicated block scanner, never evaluated.
//! Hand-edited files remain loadable: any subset of the three blocks may be
//! absent and is treated as empty.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use regex::Regex;

use crate::bootstrap::BOOTSTRAP_SCRIPT;
use crate::error::{Error, Result};
use crate::git::GitOperations;
use crate::registry::{Registry, RepoDescriptor};
use crate::workspace::WorkspaceMeta;

/// Fixed manifest filename inside each repository working tree.
pub const PIN_FILENAME: &str = "sync_deps.py";

const PINNED_VERSIONS_BLOCK: &str = "PINNED_VERSIONS";
const ORIGINS_BLOCK: &str = "ORIGINS";
const SUBMODULES_BLOCK: &str = "SUBMODULES";

/// The parsed content of a pin manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinManifest {
    /// Dependency name to pinned revision.
    pub pinned_versions: BTreeMap<String, String>,
    /// Dependency name to read-only origin URL.
    pub origins: BTreeMap<String, String>,
    /// Dependency name to submodule presence.
    pub submodules: BTreeMap<String, bool>,
}

impl PinManifest {
    /// Read the manifest inside `repo_top`. A missing file is an empty
    /// manifest, not an error.
    pub fn load(repo_top: &Path) -> Result<PinManifest> {
        let path = repo_top.join(PIN_FILENAME);
        if !path.is_file() {
            return Ok(PinManifest::default());
        }
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse manifest text in isolation.
    pub fn parse(text: &str) -> Result<PinManifest> {
        let mut manifest = PinManifest::default();
        if let Some(block) = extract_block(text, PINNED_VERSIONS_BLOCK)? {
            manifest.pinned_versions = parse_string_map(PINNED_VERSIONS_BLOCK, &block)?;
        }
        if let Some(block) = extract_block(text, ORIGINS_BLOCK)? {
            manifest.origins = parse_string_map(ORIGINS_BLOCK, &block)?;
        }
        if let Some(block) = extract_block(text, SUBMODULES_BLOCK)? {
            manifest.submodules = parse_flag_map(SUBMODULES_BLOCK, &block)?;
        }
        Ok(manifest)
    }

    /// Serialize the manifest: header, the three sorted JSON blocks, then
    /// the embedded bootstrap program.
    pub fn render(&self) -> Result<String> {
        let mut out = String::new();
        out.push_str("#!/usr/bin/env python\n");
        out.push_str("### AUTO-GENERATED: DO NOT EDIT\n");
        out.push_str("### Casual developers and CI bots invoke this to do the most\n");
        out.push_str("### efficient checkout of dependencies.\n");
        out.push_str("### Cross-repo project development should use the\n");
        out.push_str("### 'repo-workspace' dev tool for more full featured setup.\n");
        out.push_str("### Update with: repo-workspace pin\n\n");

        out.push_str(&format!(
            "{PINNED_VERSIONS_BLOCK} = {}\n\n",
            serde_json::to_string_pretty(&self.pinned_versions)?
        ));
        out.push_str(&format!(
            "{ORIGINS_BLOCK} = {}\n\n",
            serde_json::to_string_pretty(&self.origins)?
        ));
        let flags: BTreeMap<&String, u8> = self
            .submodules
            .iter()
            .map(|(name, present)| (name, u8::from(*present)))
            .collect();
        out.push_str(&format!(
            "{SUBMODULES_BLOCK} = {}\n\n",
            serde_json::to_string_pretty(&flags)?
        ));

        out.push_str("\n### Update support:\n");
        out.push_str(BOOTSTRAP_SCRIPT);
        Ok(out)
    }

    /// Overwrite the manifest inside `repo_top`.
    pub fn store(&self, repo_top: &Path) -> Result<()> {
        fs::write(repo_top.join(PIN_FILENAME), self.render()?)?;
        Ok(())
    }
}

/// Capture the current revisions of every declared dependency of `repo`
/// into its pin manifest.
///
/// With `require_upstream`, each captured revision is additionally checked
/// for reachability from the dependency's remote tracking branch.
pub fn update(
    ws: &WorkspaceMeta,
    registry: &Registry,
    git: &dyn GitOperations,
    repo: &RepoDescriptor,
    repo_top: &Path,
    require_upstream: bool,
) -> Result<()> {
    if repo.deps.is_empty() {
        println!(
            "Repository {} has no tracked dependencies. Doing nothing.",
            repo.name
        );
        return Ok(());
    }

    let mut manifest = PinManifest::load(repo_top)?;
    for dep_name in &repo.deps {
        println!("Processing dep {dep_name}");
        let dep_repo = registry.get_required(dep_name)?;
        let dep_dir = ws.repo_dir(dep_name);
        if git.toplevel(&dep_dir).is_none() {
            return Err(Error::DependencyNotCheckedOut {
                name: dep_name.clone(),
                path: dep_dir,
            });
        }
        let head_revision = git.rev_parse(&dep_dir, &["HEAD"])?;

        if require_upstream {
            git.fetch(&dep_dir, "origin")?;
            let containing = git.remote_branches_containing(&dep_dir, &head_revision)?;
            let tracking_branch = format!("origin/{}", dep_repo.tracking_branch);
            if !containing.contains(&tracking_branch) {
                return Err(Error::RevisionNotUpstream {
                    branch: tracking_branch,
                    containing: containing.join(", "),
                });
            }
            println!("  Validated that revision is on upstream tracking branch");
        }

        let summary = git.format_ref(&dep_dir, &head_revision)?;
        println!("  {dep_name}: {summary}");

        manifest
            .pinned_versions
            .insert(dep_name.clone(), head_revision);
        manifest
            .origins
            .insert(dep_name.clone(), dep_repo.ro_url.clone());
        if dep_repo.submodules {
            manifest.submodules.insert(dep_name.clone(), true);
        }
    }
    manifest.store(repo_top)
}

/// Patch a single pin entry, returning whether a write happened.
///
/// Pins are never introduced here; a dependency must already have an entry
/// (created by `update`) or the call fails with `UnknownPin`. Setting the
/// revision an entry already has performs no write, so roll schedules
/// produce no-op runs when nothing changed upstream.
pub fn set_pin_revision(repo_top: &Path, dep_name: &str, revision: &str) -> Result<bool> {
    let mut manifest = PinManifest::load(repo_top)?;
    match manifest.pinned_versions.get(dep_name) {
        None => Err(Error::UnknownPin {
            name: dep_name.to_string(),
        }),
        Some(existing) if existing == revision => Ok(false),
        Some(_) => {
            manifest
                .pinned_versions
                .insert(dep_name.to_string(), revision.to_string());
            manifest.store(repo_top)?;
            Ok(true)
        }
    }
}

/// Read the pinned-revisions mapping of a manifest as it existed at a
/// historical revision, without touching the working tree.
pub fn read_pins_at_revision(
    git: &dyn GitOperations,
    repo_top: &Path,
    revision: &str,
) -> Result<BTreeMap<String, String>> {
    let bytes = git.show_file_at_revision(repo_top, revision, PIN_FILENAME)?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(PinManifest::parse(&text)?.pinned_versions)
}

/// Locate `NAME = { ... }` in the manifest text and return the braced JSON
/// object, or `None` when the block is absent.
fn extract_block(text: &str, name: &str) -> Result<Option<String>> {
    let marker = Regex::new(&format!(r"(?m)^{name}\s*=\s*"))?;
    let m = match marker.find(text) {
        Some(m) => m,
        None => return Ok(None),
    };
    match scan_object(&text[m.end()..]) {
        Some(object) => Ok(Some(object.to_string())),
        None => Err(Error::ManifestParse {
            block: name.to_string(),
            message: "expected a braced object after '='".to_string(),
        }),
    }
}

/// Return the balanced `{ ... }` object at the start of `text`, tracking
/// string literals so braces inside values do not confuse the scan.
fn scan_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if depth == 0 && c != '{' {
            if c.is_whitespace() {
                continue;
            }
            return None;
        }
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_string_map(block: &str, json: &str) -> Result<BTreeMap<String, String>> {
    let raw: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(json).map_err(|e| Error::ManifestParse {
            block: block.to_string(),
            message: e.to_string(),
        })?;
    let mut map = BTreeMap::new();
    for (key, value) in raw {
        match value.as_str() {
            Some(s) => {
                map.insert(key, s.to_string());
            }
            None => {
                return Err(Error::ManifestParse {
                    block: block.to_string(),
                    message: format!("expected a string value for '{key}'"),
                })
            }
        }
    }
    Ok(map)
}

fn parse_flag_map(block: &str, json: &str) -> Result<BTreeMap<String, bool>> {
    let raw: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(json).map_err(|e| Error::ManifestParse {
            block: block.to_string(),
            message: e.to_string(),
        })?;
    let mut map = BTreeMap::new();
    for (key, value) in raw {
        let flag = match &value {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::Number(n) => n.as_i64() != Some(0),
            _ => {
                return Err(Error::ManifestParse {
                    block: block.to_string(),
                    message: format!("expected a flag value for '{key}'"),
                })
            }
        };
        map.insert(key, flag);
    }
    Ok(map)
}
