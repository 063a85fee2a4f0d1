//! Set a single key in the installer env file

use clap::Args;
use color_eyre::eyre::{eyre, Result};
use console::style;
use nodekit_core::state::PRIVATE_KEY;
use nodekit_core::{is_valid_address, is_valid_private_key};

use crate::config::ConfigArgs;

/// Set or update KEY in the installer env file (written with mode 600)
#[derive(Args)]
pub struct SetKeyCommand {
    #[command(flatten)]
    pub target: ConfigArgs,

    /// Key name, e.g. CLIENT_CONTRACT_ADDRESS
    pub key: String,

    pub value: String,
}

impl SetKeyCommand {
    pub async fn run(self) -> Result<()> {
        check_value(&self.key, &self.value)?;

        let (_, env) = self.target.load()?;
        env.set_or_append(&self.key, &self.value)?;
        env.restrict_permissions()?;

        println!(
            "{} Set {} in {}",
            style("*").green(),
            style(&self.key).cyan(),
            env.path().display()
        );
        Ok(())
    }
}

/// Keys with a known format are checked before anything is written
fn check_value(key: &str, value: &str) -> Result<()> {
    if key == PRIVATE_KEY && !is_valid_private_key(value) {
        return Err(eyre!(
            "{} must be exactly 64 hex characters without a 0x prefix",
            PRIVATE_KEY
        ));
    }
    if key.ends_with("_ADDRESS") && !is_valid_address(value) {
        return Err(eyre!(
            "{} must be 0x followed by 40 hex characters, got '{}'",
            key,
            value
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        assert!(check_value("CLIENT_CONTRACT_ADDRESS", "0x1234").is_err());
        assert!(check_value(
            "CLIENT_CONTRACT_ADDRESS",
            "0xdddddddddddddddddddddddddddddddddddddddd"
        )
        .is_ok());
        assert!(check_value(PRIVATE_KEY, "0xabc").is_err());
        assert!(check_value("RPC_API_KEY", "anything").is_ok());
    }

    #[tokio::test]
    async fn test_set_key_writes_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let env_path = dir.path().join(".env");
        std::fs::write(&env_path, "INSTALL_DIR=\"/opt/node\"\n").unwrap();

        let command = SetKeyCommand {
            target: ConfigArgs {
                config: None,
                env_file: Some(env_path.clone()),
            },
            key: "CLIENT_CONTRACT_ADDRESS".to_string(),
            value: "0xdddddddddddddddddddddddddddddddddddddddd".to_string(),
        };
        command.run().await.unwrap();

        assert_eq!(
            std::fs::read_to_string(env_path).unwrap(),
            "INSTALL_DIR=\"/opt/node\"\nCLIENT_CONTRACT_ADDRESS=\"0xdddddddddddddddddddddddddddddddddddddddd\"\n"
        );
    }
}
