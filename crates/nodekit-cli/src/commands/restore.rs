//! Undo a partially applied template patch

use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::Result;
use console::style;
use nodekit_core::restore_backup;

/// Restore a patched file from its .backup copy
#[derive(Args)]
pub struct RestoreCommand {
    /// The patched file (not the .backup)
    pub file: PathBuf,
}

impl RestoreCommand {
    pub async fn run(self) -> Result<()> {
        let backup = restore_backup(&self.file)?;
        println!(
            "{} Restored {} from {}",
            style("*").green(),
            self.file.display(),
            backup.display()
        );
        Ok(())
    }
}
