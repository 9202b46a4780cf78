//! # Workspace Root Discovery
//!
//! A workspace is a directory that holds one working tree per tracked
//! repository, marked by a small JSON metadata file at its root. The marker
//! is written once by `init` and only ever read afterwards; its schema
//! version is fixed at creation time.
//!
//! Discovery walks upward from a starting directory to the nearest marker
//! file, so every command works from anywhere inside the workspace or any
//! repository within it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::git::GitOperations;
use crate::registry::{Registry, RepoDescriptor};

/// Marker file name at the workspace root.
pub const META_FILENAME: &str = ".repo-workspace.json";

/// Schema version written into newly initialized workspaces.
const WS_VERSION: u32 = 0;

#[derive(Debug, Serialize, Deserialize)]
struct MetaFile {
    #[serde(default)]
    version: u32,
}

/// An on-disk workspace root plus its marker schema version.
#[derive(Debug, Clone)]
pub struct WorkspaceMeta {
    pub root: PathBuf,
    pub version: u32,
}

impl WorkspaceMeta {
    /// Walk upward from `from_dir` to the nearest marker file.
    pub fn find(from_dir: &Path) -> Result<Option<WorkspaceMeta>> {
        let mut dir = from_dir.canonicalize()?;
        loop {
            let marker = dir.join(META_FILENAME);
            if marker.is_file() {
                return Ok(Some(Self::load_marker(&marker)?));
            }
            if !dir.pop() {
                return Ok(None);
            }
        }
    }

    pub fn find_required(from_dir: &Path) -> Result<WorkspaceMeta> {
        Self::find(from_dir)?.ok_or_else(|| Error::NoWorkspace {
            path: from_dir.to_path_buf(),
        })
    }

    /// Create a workspace rooted at `at_dir`, writing the marker file.
    pub fn initialize(at_dir: &Path) -> Result<WorkspaceMeta> {
        let meta = MetaFile { version: WS_VERSION };
        let mut rendered = serde_json::to_string_pretty(&meta)?;
        rendered.push('\n');
        fs::write(at_dir.join(META_FILENAME), rendered)?;
        Ok(WorkspaceMeta {
            root: at_dir.to_path_buf(),
            version: WS_VERSION,
        })
    }

    fn load_marker(marker: &Path) -> Result<WorkspaceMeta> {
        let text = fs::read_to_string(marker)?;
        let meta: MetaFile = serde_json::from_str(&text)?;
        // The marker lives directly in the workspace root.
        let root = marker
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        Ok(WorkspaceMeta {
            root,
            version: meta.version,
        })
    }

    /// The directory a repository occupies inside this workspace.
    pub fn repo_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

/// Resolve the repository enclosing `from_dir`: its workspace, its registry
/// descriptor, and its working tree toplevel.
pub fn current_repo<'r>(
    registry: &'r Registry,
    git: &dyn GitOperations,
    from_dir: &Path,
) -> Result<(WorkspaceMeta, &'r RepoDescriptor, PathBuf)> {
    let toplevel = git.toplevel(from_dir).ok_or_else(|| Error::NotARepository {
        path: from_dir.to_path_buf(),
    })?;
    let ws = WorkspaceMeta::find_required(&toplevel)?;
    let name = toplevel
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let repo = registry
        .find(&name)
        .ok_or_else(|| Error::UnregisteredRepository {
            path: toplevel.clone(),
        })?;
    Ok((ws, repo, toplevel))
}
