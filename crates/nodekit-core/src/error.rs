use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing prerequisite: {what}. {remedy}")]
    PrerequisiteMissing { what: String, remedy: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{tool} failed ({status}):\n{output}")]
    ToolInvocationFailed {
        tool: String,
        status: String,
        output: String,
    },

    #[error("Verification failed: {} does not contain \"{expected}\"", path.display())]
    VerificationFailed { path: PathBuf, expected: String },

    #[error("Invalid placeholder pattern: {0}")]
    InvalidPattern(String),
}

impl Error {
    /// Shorthand for a missing prerequisite with the step that fixes it
    pub fn missing(what: impl Into<String>, remedy: impl Into<String>) -> Self {
        Error::PrerequisiteMissing {
            what: what.into(),
            remedy: remedy.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
