//! Typed view of the state earlier installer steps leave in the env file

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::env_file::EnvFile;
use crate::error::{Error, Result};
use crate::validate::{is_valid_address, is_valid_private_key, JobId};

pub const INSTALL_DIR: &str = "INSTALL_DIR";
pub const OPERATOR_ADDRESS: &str = "OPERATOR_ADDRESS";
pub const JOB_ID: &str = "JOB_ID";
pub const JOB_ID_NO_HYPHENS: &str = "JOB_ID_NO_HYPHENS";
pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
pub const CLIENT_CONTRACT_ADDRESS: &str = "CLIENT_CONTRACT_ADDRESS";

const SETUP_STEP: &str = "Re-run the node setup step of the installer.";
const API_KEY_STEP: &str = "Re-run the API key configuration step of the installer.";
const OPERATOR_STEP: &str = "Re-run the operator contract deployment step of the installer.";
const JOB_STEP: &str = "Re-run the job creation step of the installer.";

/// Everything the client contract deployment needs from earlier steps
#[derive(Debug, Clone)]
pub struct InstallerState {
    pub install_dir: PathBuf,
    pub operator_address: String,
    pub job_id: JobId,
    pub job_id_no_hyphens: String,
    pub api_keys: BTreeMap<String, String>,
    pub private_key: Option<String>,
    values: BTreeMap<String, String>,
}

impl InstallerState {
    /// Load and validate the state from `env`
    pub fn load(env: &EnvFile, required_api_keys: &[String]) -> Result<Self> {
        Self::from_values(env.load()?, required_api_keys)
    }

    pub fn from_values(
        values: BTreeMap<String, String>,
        required_api_keys: &[String],
    ) -> Result<Self> {
        let get = |key: &str| values.get(key).filter(|v| !v.is_empty()).cloned();

        let install_dir = get(INSTALL_DIR)
            .map(PathBuf::from)
            .ok_or_else(|| Error::missing(INSTALL_DIR, SETUP_STEP))?;

        let mut api_keys = BTreeMap::new();
        for key in required_api_keys {
            let value = get(key).ok_or_else(|| Error::missing(key.as_str(), API_KEY_STEP))?;
            api_keys.insert(key.clone(), value);
        }

        let operator_address =
            get(OPERATOR_ADDRESS).ok_or_else(|| Error::missing(OPERATOR_ADDRESS, OPERATOR_STEP))?;
        if !is_valid_address(&operator_address) {
            return Err(Error::Validation(format!(
                "{} '{}' is not an address. {}",
                OPERATOR_ADDRESS, operator_address, OPERATOR_STEP
            )));
        }

        let compact = get(JOB_ID_NO_HYPHENS);
        let job_id = get(JOB_ID)
            .or_else(|| compact.clone())
            .ok_or_else(|| Error::missing(JOB_ID, JOB_STEP))?;
        let job_id = JobId::parse(&job_id)?;

        let job_id_no_hyphens = match compact {
            Some(compact) if compact != job_id.without_hyphens() => {
                return Err(Error::Validation(format!(
                    "{} and {} disagree ({} vs {}). {}",
                    JOB_ID,
                    JOB_ID_NO_HYPHENS,
                    job_id,
                    compact,
                    JOB_STEP
                )));
            }
            Some(compact) => compact,
            None => job_id.without_hyphens(),
        };

        let private_key = get(PRIVATE_KEY);
        if private_key.as_deref().is_some_and(|k| !is_valid_private_key(k)) {
            return Err(Error::Validation(format!(
                "{} must be exactly 64 hex characters without a 0x prefix",
                PRIVATE_KEY
            )));
        }

        Ok(Self {
            install_dir,
            operator_address,
            job_id,
            job_id_no_hyphens,
            api_keys,
            private_key,
            values,
        })
    }

    /// Raw value of any key in the env file
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Every key/value pair, for exporting to child processes
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Record a private key entered after loading
    pub fn set_private_key(&mut self, private_key: String) {
        self.values.insert(PRIVATE_KEY.to_string(), private_key.clone());
        self.private_key = Some(private_key);
    }
}
