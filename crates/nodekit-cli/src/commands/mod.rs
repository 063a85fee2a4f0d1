//! CLI commands for nodekit

use clap::Subcommand;
use color_eyre::eyre::Result;

pub mod check;
pub mod deploy;
pub mod extract;
pub mod restore;
pub mod set_key;

/// All available CLI commands
#[derive(Subcommand)]
pub enum Command {
    /// Deploy the client contract against the node's operator contract
    Deploy(deploy::DeployCommand),

    /// Check installer prerequisites without deploying
    Check(check::CheckCommand),

    /// Find a deployed contract address in build output
    Extract(extract::ExtractCommand),

    /// Set or update a key in the installer env file
    SetKey(set_key::SetKeyCommand),

    /// Restore a patched migration script from its backup
    Restore(restore::RestoreCommand),
}

impl Command {
    /// Execute the command
    pub async fn run(self) -> Result<()> {
        match self {
            Command::Deploy(cmd) => cmd.run().await,
            Command::Check(cmd) => cmd.run().await,
            Command::Extract(cmd) => cmd.run().await,
            Command::SetKey(cmd) => cmd.run().await,
            Command::Restore(cmd) => cmd.run().await,
        }
    }
}
