//! # Built-in Repository Catalog
//!
//! The fixed set of repositories this tool manages, declared once and
//! registered at process start. Dependency edges and rolling schedules live
//! here rather than in per-repository configuration so that every checkout
//! of the tool agrees on the shape of the graph.

use crate::error::Result;
use crate::registry::{Registry, RepoDescriptor};
use crate::roll::RollAction;

/// Build the registry of tracked repositories.
pub fn builtin() -> Result<Registry> {
    let mut builder = Registry::builder();
    builder.register(
        RepoDescriptor::new(
            "iree",
            "https://github.com/openxla/iree.git",
            "git@github.com:openxla/iree.git",
        )
        .with_submodules(),
    )?;
    // Not part of the project family proper, but key to integration.
    builder.register(RepoDescriptor::new(
        "jax",
        "https://github.com/google/jax.git",
        "git@github.com:google/jax.git",
    ))?;
    builder.register(
        RepoDescriptor::new(
            "openxla-pjrt-plugin",
            "https://github.com/openxla/openxla-pjrt-plugin.git",
            "git@github.com:openxla/openxla-pjrt-plugin.git",
        )
        .with_deps(&["iree", "jax", "xla"])
        .with_schedule(
            "continuous",
            // Runtime changes are picked up continuously; everything else
            // rolls nightly.
            vec![RollAction::remote_branch_head("iree")],
        )
        .with_schedule(
            "nightly",
            vec![
                RollAction::remote_branch_head("iree"),
                RollAction::remote_branch_head("xla"),
                RollAction::remote_branch_head("jax"),
                RollAction::package_version_bump(
                    "iree-compiler",
                    &["-f", "https://openxla.github.io/iree/pip-release-links.html"],
                    &["requirements.txt"],
                ),
                RollAction::package_version_bump(
                    "jaxlib",
                    &[
                        "-f",
                        "https://storage.googleapis.com/jax-releases/jaxlib_nightly_releases.html",
                        "--pre",
                    ],
                    &["requirements.txt"],
                ),
            ],
        ),
    )?;
    builder.register(RepoDescriptor::new(
        "stablehlo",
        "https://github.com/openxla/stablehlo.git",
        "git@github.com:openxla/stablehlo.git",
    ))?;
    builder.register(RepoDescriptor::new(
        "xla",
        "https://github.com/openxla/xla.git",
        "git@github.com:openxla/xla.git",
    ))?;
    Ok(builder.build())
}
