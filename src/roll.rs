//! # Rolling Updates
//!
//! A roll applies a named, pre-declared schedule of update actions to the
//! current repository's pin manifest. Each action resolves a new revision
//! (or package version) and hands it to the pin store; actions are applied
//! in declaration order, and the first failure aborts the whole roll.
//!
//! Actions are a tagged enum rather than an open-ended plugin surface: each
//! variant carries only the parameters captured when the schedule was
//! declared, and is stateless between invocations.

use std::fmt;
use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::{Error, Result};
use crate::git::GitOperations;
use crate::package_index::PackageIndex;
use crate::pins;
use crate::pins::PinManifest;
use crate::registry::{Registry, RepoDescriptor};
use crate::workspace::WorkspaceMeta;

/// One update applied to a single pin entry (or requirements manifest) of a
/// target repository.
#[derive(Debug, Clone)]
pub enum RollAction {
    /// Advance a dependency's pin to the tip of its remote tracking branch.
    RemoteBranchHead { dep: String },
    /// Advance a dependency's pin to whatever revision another repository's
    /// own pin manifest (at its currently pinned revision) records for it.
    /// This follows an already-vetted choice instead of the bleeding edge.
    InheritViaRepo { dep: String, via: String },
    /// Query the package index for the latest version of a package and
    /// rewrite the listed requirement manifests to use it.
    PackageVersionBump {
        package: String,
        index_flags: Vec<String>,
        requirement_files: Vec<String>,
    },
}

impl RollAction {
    pub fn remote_branch_head(dep: &str) -> Self {
        Self::RemoteBranchHead {
            dep: dep.to_string(),
        }
    }

    pub fn inherit_via_repo(dep: &str, via: &str) -> Self {
        Self::InheritViaRepo {
            dep: dep.to_string(),
            via: via.to_string(),
        }
    }

    pub fn package_version_bump(
        package: &str,
        index_flags: &[&str],
        requirement_files: &[&str],
    ) -> Self {
        Self::PackageVersionBump {
            package: package.to_string(),
            index_flags: index_flags.iter().map(|f| f.to_string()).collect(),
            requirement_files: requirement_files.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl fmt::Display for RollAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteBranchHead { dep } => write!(f, "remote-branch-head({dep})"),
            Self::InheritViaRepo { dep, via } => write!(f, "inherit-via-repo({dep} via {via})"),
            Self::PackageVersionBump { package, .. } => {
                write!(f, "package-version-bump({package})")
            }
        }
    }
}

/// Apply the named schedule of `repo`, action by action.
pub fn roll(
    ws: &WorkspaceMeta,
    registry: &Registry,
    git: &dyn GitOperations,
    index: &dyn PackageIndex,
    repo: &RepoDescriptor,
    schedule_name: &str,
) -> Result<()> {
    if repo.schedules.is_empty() {
        return Err(Error::NoRollingSchedules {
            name: repo.name.clone(),
        });
    }
    let actions = repo
        .schedules
        .get(schedule_name)
        .ok_or_else(|| Error::UnknownSchedule {
            name: repo.name.clone(),
            schedule: schedule_name.to_string(),
            available: repo
                .schedules
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
        })?;
    for action in actions {
        println!("Performing rolling action: {action}");
        action.apply(ws, registry, git, index, repo)?;
    }
    Ok(())
}

impl RollAction {
    /// Apply this action against `repo`'s working tree in the workspace.
    pub fn apply(
        &self,
        ws: &WorkspaceMeta,
        registry: &Registry,
        git: &dyn GitOperations,
        index: &dyn PackageIndex,
        repo: &RepoDescriptor,
    ) -> Result<()> {
        let repo_top = ws.repo_dir(&repo.name);
        match self {
            Self::RemoteBranchHead { dep } => {
                let dep_repo = registry.get_required(dep)?;
                let head_revision = git.remote_head(&dep_repo.ro_url, &dep_repo.tracking_branch)?;
                println!(
                    "  Remote head for {}: {}",
                    dep_repo.tracking_branch, head_revision
                );
                report_pin_write(pins::set_pin_revision(&repo_top, dep, &head_revision)?);
            }
            Self::InheritViaRepo { dep, via } => {
                let our_pins = PinManifest::load(&repo_top)?.pinned_versions;
                let via_revision =
                    our_pins.get(via).cloned().ok_or_else(|| Error::ViaRepoNotPinned {
                        via: via.clone(),
                        name: repo.name.clone(),
                        pins: our_pins.keys().cloned().collect::<Vec<_>>().join(", "),
                    })?;
                let via_dir = ws.repo_dir(via);
                git.fetch(&via_dir, "origin")?;
                let via_pins = pins::read_pins_at_revision(git, &via_dir, &via_revision)?;
                let dep_revision =
                    via_pins.get(dep).cloned().ok_or_else(|| Error::MissingTransitivePin {
                        via: via.clone(),
                        dep: dep.clone(),
                        available: via_pins.keys().cloned().collect::<Vec<_>>().join(", "),
                    })?;
                println!("  Resolved revision {dep_revision} via {via}");
                report_pin_write(pins::set_pin_revision(&repo_top, dep, &dep_revision)?);
            }
            Self::PackageVersionBump {
                package,
                index_flags,
                requirement_files,
            } => {
                let output = index.query_versions(package, index_flags)?;
                let version = parse_available_version(package, &output)?;
                println!("  Found latest version: '{version}'");
                for requirement_file in requirement_files {
                    let path = repo_top.join(requirement_file);
                    if !path.is_file() {
                        return Err(Error::RequirementFileMissing { path });
                    }
                    rewrite_requirement(&path, package, &version)?;
                }
            }
        }
        Ok(())
    }
}

fn report_pin_write(changed: bool) {
    if changed {
        println!("  Updated pinned revision.");
    } else {
        println!("  No update required.");
    }
}

/// Scan package index output for the first version on the
/// "Available versions:" line. The surrounding output format has shifted
/// between index tool releases; the marker line is the stable contract, and
/// its absence is a hard failure rather than a skip.
fn parse_available_version(package: &str, output: &str) -> Result<String> {
    let marker = Regex::new(r"^\s*Available versions:\s*(.+)")?;
    for line in output.lines() {
        if let Some(captures) = marker.captures(line) {
            let first = captures[1].split(',').next().map(str::trim).unwrap_or("");
            if !first.is_empty() {
                return Ok(first.to_string());
            }
        }
    }
    Err(Error::VersionQueryFormatUnrecognized {
        package: package.to_string(),
    })
}

/// Rewrite `package==<old><tail>` lines to the new version, preserving any
/// trailing text (environment markers, comments). Appends a new line when
/// the package is not present yet.
fn rewrite_requirement(path: &Path, package: &str, version: &str) -> Result<()> {
    let content = fs::read_to_string(path)?;
    let spec = Regex::new(&format!(r"^\s*{}==\S+", regex::escape(package)))?;
    let mut found = false;
    let mut lines = Vec::new();
    for line in content.lines() {
        match spec.find(line) {
            Some(m) => {
                let tail = &line[m.end()..];
                lines.push(format!("{package}=={version}{tail}"));
                found = true;
            }
            None => lines.push(line.to_string()),
        }
    }
    if !found {
        lines.push(format!("{package}=={version}"));
    }
    println!("Updating {}", path.display());
    fs::write(path, lines.join("\n") + "\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RepoDescriptor;
    use crate::test_support::{MockGit, MockPackageIndex};
    use tempfile::TempDir;

    fn descriptor(name: &str, deps: &[&str]) -> RepoDescriptor {
        RepoDescriptor::new(
            name,
            &format!("https://example.com/{name}.git"),
            &format!("git@example.com:{name}.git"),
        )
        .with_deps(deps)
    }

    fn workspace() -> (TempDir, WorkspaceMeta) {
        let temp = TempDir::new().unwrap();
        let ws = WorkspaceMeta::initialize(temp.path()).unwrap();
        (temp, ws)
    }

    fn store_pins(ws: &WorkspaceMeta, repo: &str, pins: &[(&str, &str)]) {
        let mut manifest = PinManifest::default();
        for (dep, revision) in pins {
            manifest
                .pinned_versions
                .insert(dep.to_string(), revision.to_string());
        }
        std::fs::create_dir_all(ws.repo_dir(repo)).unwrap();
        manifest.store(&ws.repo_dir(repo)).unwrap();
    }

    fn registry_with_schedules() -> Registry {
        let mut builder = Registry::builder();
        builder
            .register(
                descriptor("app", &["runtime", "models"])
                    .with_schedule(
                        "continuous",
                        vec![RollAction::remote_branch_head("runtime")],
                    )
                    .with_schedule(
                        "nightly",
                        vec![RollAction::inherit_via_repo("models", "runtime")],
                    ),
            )
            .unwrap();
        builder.register(descriptor("runtime", &["models"])).unwrap();
        builder.register(descriptor("models", &[])).unwrap();
        builder.build()
    }

    #[test]
    fn test_roll_rejects_repo_without_schedules() {
        let registry = registry_with_schedules();
        let (_temp, ws) = workspace();
        let git = MockGit::default();
        let index = MockPackageIndex::default();

        let err = roll(
            &ws,
            &registry,
            &git,
            &index,
            registry.get_required("runtime").unwrap(),
            "continuous",
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoRollingSchedules { .. }));
    }

    #[test]
    fn test_roll_rejects_unknown_schedule_listing_available() {
        let registry = registry_with_schedules();
        let (_temp, ws) = workspace();
        let git = MockGit::default();
        let index = MockPackageIndex::default();

        let err = roll(
            &ws,
            &registry,
            &git,
            &index,
            registry.get_required("app").unwrap(),
            "weekly",
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Unknown schedule 'weekly'"));
        assert!(message.contains("continuous, nightly"));
    }

    #[test]
    fn test_remote_branch_head_updates_pin() {
        let registry = registry_with_schedules();
        let (_temp, ws) = workspace();
        let git = MockGit::default();
        git.set_remote_head("https://example.com/runtime.git", "main", "new-head");
        let index = MockPackageIndex::default();

        store_pins(&ws, "app", &[("runtime", "old-head")]);
        roll(
            &ws,
            &registry,
            &git,
            &index,
            registry.get_required("app").unwrap(),
            "continuous",
        )
        .unwrap();

        let manifest = PinManifest::load(&ws.repo_dir("app")).unwrap();
        assert_eq!(manifest.pinned_versions["runtime"], "new-head");
    }

    #[test]
    fn test_remote_branch_head_requires_existing_pin() {
        let registry = registry_with_schedules();
        let (_temp, ws) = workspace();
        let git = MockGit::default();
        git.set_remote_head("https://example.com/runtime.git", "main", "new-head");
        let index = MockPackageIndex::default();

        store_pins(&ws, "app", &[("models", "aaa")]);
        let err = roll(
            &ws,
            &registry,
            &git,
            &index,
            registry.get_required("app").unwrap(),
            "continuous",
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownPin { .. }));
    }

    #[test]
    fn test_inherit_via_repo_resolves_transitive_pin() {
        let registry = registry_with_schedules();
        let (_temp, ws) = workspace();
        let git = MockGit::default();
        let index = MockPackageIndex::default();

        // app pins runtime at rev-r and models at a stale revision; the
        // historical manifest of runtime at rev-r pins models at rev-x.
        store_pins(&ws, "app", &[("runtime", "rev-r"), ("models", "stale")]);
        let historical = "PINNED_VERSIONS = {\n  \"models\": \"rev-x\"\n}\n";
        git.set_file_at_revision(&ws.repo_dir("runtime"), "rev-r", historical.as_bytes());

        roll(
            &ws,
            &registry,
            &git,
            &index,
            registry.get_required("app").unwrap(),
            "nightly",
        )
        .unwrap();

        let manifest = PinManifest::load(&ws.repo_dir("app")).unwrap();
        assert_eq!(manifest.pinned_versions["models"], "rev-x");
        assert_eq!(
            git.count_calls(&format!("fetch {}", ws.repo_dir("runtime").display())),
            1
        );
    }

    #[test]
    fn test_inherit_via_repo_requires_via_pin() {
        let registry = registry_with_schedules();
        let (_temp, ws) = workspace();
        let git = MockGit::default();
        let index = MockPackageIndex::default();

        store_pins(&ws, "app", &[("models", "stale")]);
        let err = roll(
            &ws,
            &registry,
            &git,
            &index,
            registry.get_required("app").unwrap(),
            "nightly",
        )
        .unwrap_err();
        assert!(matches!(err, Error::ViaRepoNotPinned { .. }));
    }

    #[test]
    fn test_inherit_via_repo_requires_transitive_pin() {
        let registry = registry_with_schedules();
        let (_temp, ws) = workspace();
        let git = MockGit::default();
        let index = MockPackageIndex::default();

        store_pins(&ws, "app", &[("runtime", "rev-r"), ("models", "stale")]);
        let historical = "PINNED_VERSIONS = {\n  \"other\": \"zzz\"\n}\n";
        git.set_file_at_revision(&ws.repo_dir("runtime"), "rev-r", historical.as_bytes());

        let err = roll(
            &ws,
            &registry,
            &git,
            &index,
            registry.get_required("app").unwrap(),
            "nightly",
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingTransitivePin { .. }));
    }

    #[test]
    fn test_parse_available_version_takes_first_entry() {
        let output = "pkg (2.3.1)\nAvailable versions: 2.3.1, 2.3.0, 2.2.9\n";
        assert_eq!(parse_available_version("pkg", output).unwrap(), "2.3.1");
    }

    #[test]
    fn test_parse_available_version_tolerates_leading_whitespace() {
        let output = "  Available versions:  1.0.0\n";
        assert_eq!(parse_available_version("pkg", output).unwrap(), "1.0.0");
    }

    #[test]
    fn test_parse_available_version_missing_marker_is_fatal() {
        let err = parse_available_version("pkg", "no versions here\n").unwrap_err();
        assert!(matches!(err, Error::VersionQueryFormatUnrecognized { .. }));
    }

    #[test]
    fn test_package_version_bump_rewrites_requirements_preserving_tail() {
        let mut builder = Registry::builder();
        builder
            .register(descriptor("app", &[]).with_schedule(
                "nightly",
                vec![RollAction::package_version_bump(
                    "accel-compiler",
                    &[],
                    &["requirements.txt"],
                )],
            ))
            .unwrap();
        let registry = builder.build();
        let (_temp, ws) = workspace();
        std::fs::create_dir_all(ws.repo_dir("app")).unwrap();
        std::fs::write(
            ws.repo_dir("app").join("requirements.txt"),
            "accel-compiler==1.0.0 ; python_version >= \"3.9\"\nother==2.0\n",
        )
        .unwrap();
        let git = MockGit::default();
        let index = MockPackageIndex::default()
            .with_reply("accel-compiler", "Available versions: 1.2.0, 1.1.0\n");

        roll(
            &ws,
            &registry,
            &git,
            &index,
            registry.get_required("app").unwrap(),
            "nightly",
        )
        .unwrap();

        let content =
            std::fs::read_to_string(ws.repo_dir("app").join("requirements.txt")).unwrap();
        assert!(content.contains("accel-compiler==1.2.0 ; python_version >= \"3.9\""));
        assert!(content.contains("other==2.0"));
    }

    #[test]
    fn test_package_version_bump_appends_missing_package() {
        let (_temp, ws) = workspace();
        std::fs::create_dir_all(ws.repo_dir("app")).unwrap();
        let path = ws.repo_dir("app").join("requirements.txt");
        std::fs::write(&path, "other==2.0\n").unwrap();

        rewrite_requirement(&path, "accel-compiler", "1.2.0").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "other==2.0\naccel-compiler==1.2.0\n");
    }

    #[test]
    fn test_package_version_bump_missing_requirement_file_is_fatal() {
        let mut builder = Registry::builder();
        builder
            .register(descriptor("app", &[]).with_schedule(
                "nightly",
                vec![RollAction::package_version_bump(
                    "accel-compiler",
                    &[],
                    &["requirements.txt"],
                )],
            ))
            .unwrap();
        let registry = builder.build();
        let (_temp, ws) = workspace();
        std::fs::create_dir_all(ws.repo_dir("app")).unwrap();
        let git = MockGit::default();
        let index = MockPackageIndex::default()
            .with_reply("accel-compiler", "Available versions: 1.2.0\n");

        let err = roll(
            &ws,
            &registry,
            &git,
            &index,
            registry.get_required("app").unwrap(),
            "nightly",
        )
        .unwrap_err();
        assert!(matches!(err, Error::RequirementFileMissing { .. }));
    }

    #[test]
    fn test_display_names_actions() {
        assert_eq!(
            RollAction::remote_branch_head("runtime").to_string(),
            "remote-branch-head(runtime)"
        );
        assert_eq!(
            RollAction::inherit_via_repo("models", "runtime").to_string(),
            "inherit-via-repo(models via runtime)"
        );
        assert_eq!(
            RollAction::package_version_bump("pkg", &[], &[]).to_string(),
            "package-version-bump(pkg)"
        );
    }

    #[test]
    fn test_roll_applies_actions_in_order_and_stops_on_failure() {
        let mut builder = Registry::builder();
        builder
            .register(
                descriptor("app", &["runtime", "models"]).with_schedule(
                    "nightly",
                    vec![
                        RollAction::remote_branch_head("runtime"),
                        RollAction::remote_branch_head("models"),
                    ],
                ),
            )
            .unwrap();
        builder.register(descriptor("runtime", &[])).unwrap();
        builder.register(descriptor("models", &[])).unwrap();
        let registry = builder.build();
        let (_temp, ws) = workspace();
        let git = MockGit::default();
        // Only the first dependency has a canned remote head; the second
        // action fails and must abort the roll.
        git.set_remote_head("https://example.com/runtime.git", "main", "new-head");
        let index = MockPackageIndex::default();

        store_pins(&ws, "app", &[("runtime", "old"), ("models", "old")]);
        let err = roll(
            &ws,
            &registry,
            &git,
            &index,
            registry.get_required("app").unwrap(),
            "nightly",
        )
        .unwrap_err();
        assert!(matches!(err, Error::ExternalCommandFailed { .. }));

        let manifest = PinManifest::load(&ws.repo_dir("app")).unwrap();
        assert_eq!(manifest.pinned_versions["runtime"], "new-head");
        assert_eq!(manifest.pinned_versions["models"], "old");
    }

    #[test]
    fn test_unchanged_remote_head_writes_nothing() {
        let registry = registry_with_schedules();
        let (_temp, ws) = workspace();
        let git = MockGit::default();
        git.set_remote_head("https://example.com/runtime.git", "main", "same");
        let index = MockPackageIndex::default();

        store_pins(&ws, "app", &[("runtime", "same")]);
        let before =
            std::fs::read(ws.repo_dir("app").join(crate::pins::PIN_FILENAME)).unwrap();
        roll(
            &ws,
            &registry,
            &git,
            &index,
            registry.get_required("app").unwrap(),
            "continuous",
        )
        .unwrap();
        let after = std::fs::read(ws.repo_dir("app").join(crate::pins::PIN_FILENAME)).unwrap();
        assert_eq!(before, after);
    }
}
