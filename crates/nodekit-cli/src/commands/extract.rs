//! Recover a deployed contract address from build output

use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::{eyre, Result};
use nodekit_core::AddressExtractor;
use tracing::info;

/// Print the address of a deployed contract found in a build directory
#[derive(Args)]
pub struct ExtractCommand {
    /// Migrated project directory (holds deploy.log and build/contracts)
    pub build_dir: PathBuf,

    /// Contract name as it appears in the migration output
    #[arg(long, default_value = "Client")]
    pub contract: String,
}

impl ExtractCommand {
    pub async fn run(self) -> Result<()> {
        let extractor = AddressExtractor::standard(&self.build_dir);

        match extractor.extract_with_tier(&self.contract) {
            Some((tier, address)) => {
                info!(tier, "address found");
                // Just print the address for easy scripting: $(nodekit extract ./client)
                println!("{}", address);
                Ok(())
            }
            None => Err(eyre!(
                "No address for '{}' found in {} (tried {})",
                self.contract,
                self.build_dir.display(),
                extractor.tiers().join(", ")
            )),
        }
    }
}
