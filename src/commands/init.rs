//! # Init Command Implementation
//!
//! Creates the workspace marker file in the current directory, or reports
//! the enclosing workspace when one already exists. Re-running `init`
//! inside an existing workspace performs no write.

use anyhow::Result;
use clap::Args;

use repo_workspace::workspace::WorkspaceMeta;

/// Initialize (or re-initialize) a workspace
#[derive(Args, Debug)]
pub struct InitArgs {}

/// Execute the `init` command.
pub fn execute(_args: InitArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    match WorkspaceMeta::find(&cwd)? {
        Some(ws) => {
            println!("Running within existing workspace: {}", ws.root.display());
        }
        None => {
            let ws = WorkspaceMeta::initialize(&cwd)?;
            println!("Initialized workspace at: {}", ws.root.display());
        }
    }
    Ok(())
}
