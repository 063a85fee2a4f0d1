pub mod env_file;
pub mod error;
pub mod extract;
pub mod staging;
pub mod state;
pub mod summary;
pub mod template;
pub mod validate;

pub use env_file::{set_or_append_key, EnvFile};
pub use error::{Error, Result};
pub use extract::{AddressExtractor, AddressStrategy, LogScan, RawText, StructuredArtifacts};
pub use staging::StagedProject;
pub use state::InstallerState;
pub use summary::DeploymentSummary;
pub use template::{restore_backup, substitute_template_value, Placeholder, Substitution};
pub use validate::{is_valid_address, is_valid_private_key, parse_address, signer_address, JobId};
