use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::Args;
use color_eyre::eyre::{eyre, Result};
use nodekit_core::{EnvFile, Placeholder};
use serde::Deserialize;

const NODEKIT_CONFIG: &str = "nodekit.toml";

/// nodekit configuration file structure (nodekit.toml)
/// Every field is optional; defaults match the stock installer layout
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodekitConfig {
    pub deploy: DeployConfig,
    pub placeholders: PlaceholderConfig,
}

/// `[deploy]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub env_file: String,
    pub contract_dir: String,
    pub contract_name: String,
    /// Migration script, relative to the contract dir
    pub migration_file: String,
    pub network: String,
    pub summary_file: String,
    pub install_command: Vec<String>,
    /// `{network}` is replaced with the target network
    pub migrate_command: Vec<String>,
    pub required_api_keys: Vec<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            env_file: ".env".to_string(),
            contract_dir: "${INSTALL_DIR}/client-contract".to_string(),
            contract_name: "Client".to_string(),
            migration_file: "migrations/2_deploy_client.js".to_string(),
            network: "testnet".to_string(),
            summary_file: "${INSTALL_DIR}/client_contract_info.txt".to_string(),
            install_command: vec!["npm".to_string(), "install".to_string()],
            migrate_command: ["npx", "truffle", "migrate", "--network", "{network}", "--reset"]
                .map(String::from)
                .to_vec(),
            required_api_keys: vec!["RPC_API_KEY".to_string()],
        }
    }
}

/// `[placeholders]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaceholderConfig {
    /// Receives the operator contract address
    pub oracle: Placeholder,
    /// Receives the job id without hyphens
    pub job_id: Placeholder,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            oracle: Placeholder::assignment("oracleAddress"),
            job_id: Placeholder::call("asciiToHex"),
        }
    }
}

impl NodekitConfig {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre!("Could not read {}: {}", path.display(), e))?;

        let config: NodekitConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if given, else nodekit.toml in the current directory if it
    /// exists, else the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None if Path::new(NODEKIT_CONFIG).exists() => Self::load_from(Path::new(NODEKIT_CONFIG)),
            None => Ok(Self::default()),
        }
    }

    /// Resolve `${VAR}` references and CLI overrides into concrete settings
    pub fn resolve(
        &self,
        vars: &BTreeMap<String, String>,
        network: Option<&str>,
        contract_dir: Option<&Path>,
    ) -> Result<DeploySettings> {
        let deploy = &self.deploy;
        let network = network.unwrap_or(&deploy.network).to_string();

        let contract_dir = match contract_dir {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from(resolve_vars(&deploy.contract_dir, vars)?),
        };

        if deploy.install_command.is_empty() || deploy.migrate_command.is_empty() {
            return Err(eyre!(
                "install_command and migrate_command in {} must not be empty",
                NODEKIT_CONFIG
            ));
        }

        let migrate_command = deploy
            .migrate_command
            .iter()
            .map(|arg| arg.replace("{network}", &network))
            .collect();

        Ok(DeploySettings {
            contract_dir,
            contract_name: deploy.contract_name.clone(),
            migration_file: PathBuf::from(&deploy.migration_file),
            network,
            summary_file: PathBuf::from(resolve_vars(&deploy.summary_file, vars)?),
            install_command: deploy.install_command.clone(),
            migrate_command,
            oracle_placeholder: self.placeholders.oracle.clone(),
            job_placeholder: self.placeholders.job_id.clone(),
        })
    }
}

/// Deployment settings with every reference resolved
#[derive(Debug, Clone)]
pub struct DeploySettings {
    pub contract_dir: PathBuf,
    pub contract_name: String,
    pub migration_file: PathBuf,
    pub network: String,
    pub summary_file: PathBuf,
    pub install_command: Vec<String>,
    pub migrate_command: Vec<String>,
    pub oracle_placeholder: Placeholder,
    pub job_placeholder: Placeholder,
}

/// `--config` / `--env-file` flags shared by commands that read installer state
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to nodekit.toml (defaults to ./nodekit.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Installer env file holding state from earlier steps
    #[arg(long, env = "NODEKIT_ENV_FILE")]
    pub env_file: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn load(&self) -> Result<(NodekitConfig, EnvFile)> {
        let config = NodekitConfig::load_or_default(self.config.as_deref())?;
        let env_path = match &self.env_file {
            Some(path) => path.clone(),
            None => PathBuf::from(resolve_vars(&config.deploy.env_file, &BTreeMap::new())?),
        };
        Ok((config, EnvFile::at(env_path)))
    }
}

/// Resolve `${VAR}` references in a string
/// Looks in `vars` (the installer env file) first, then the process environment
pub fn resolve_vars(value: &str, vars: &BTreeMap<String, String>) -> Result<String> {
    let mut resolved = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        resolved.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| eyre!("Unterminated variable reference in '{}'", value))?;
        let var_name = &after[..end];

        let var_value = match vars.get(var_name) {
            Some(v) => v.clone(),
            None => std::env::var(var_name)
                .map_err(|_| eyre!("Variable '{}' not set in env file or environment", var_name))?,
        };
        resolved.push_str(&var_value);
        rest = &after[end + 1..];
    }

    resolved.push_str(rest);
    Ok(resolved)
}
