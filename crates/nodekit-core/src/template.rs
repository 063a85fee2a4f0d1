//! In-place substitution of quoted placeholder values in migration scripts

use std::path::{Path, PathBuf};

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Suffix appended to a template file name for its pre-patch copy
pub const BACKUP_SUFFIX: &str = ".backup";

/// A quoted literal inside a source file that gets replaced at deploy time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Placeholder {
    /// `name = "..."`, e.g. `const oracleAddress = "0x..."`
    Assignment { name: String },
    /// `name("...")`, e.g. `web3.utils.asciiToHex("...")`
    Call { name: String },
}

impl Placeholder {
    pub fn assignment(name: impl Into<String>) -> Self {
        Placeholder::Assignment { name: name.into() }
    }

    pub fn call(name: impl Into<String>) -> Self {
        Placeholder::Call { name: name.into() }
    }

    pub fn name(&self) -> &str {
        match self {
            Placeholder::Assignment { name } | Placeholder::Call { name } => name,
        }
    }

    /// Matcher with three groups: the text before the literal, the opening
    /// quote and the literal itself.
    pub fn regex(&self) -> Result<Regex> {
        let name = self.name();
        if name.trim().is_empty() {
            return Err(Error::InvalidPattern("placeholder name is empty".into()));
        }

        let escaped = regex::escape(name);
        let pattern = match self {
            Placeholder::Assignment { .. } => {
                format!(r#"(\b{}\s*=\s*)(["'])([^"'\r\n]*)["']"#, escaped)
            }
            Placeholder::Call { .. } => {
                format!(r#"(\b{}\s*\(\s*)(["'])([^"'\r\n]*)["']"#, escaped)
            }
        };

        Regex::new(&pattern).map_err(|e| Error::InvalidPattern(e.to_string()))
    }
}

impl std::fmt::Display for Placeholder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Placeholder::Assignment { name } => write!(f, "{} = \"...\"", name),
            Placeholder::Call { name } => write!(f, "{}(\"...\")", name),
        }
    }
}

/// Outcome of a successful substitution
#[derive(Debug, Clone)]
pub struct Substitution {
    /// Number of placeholder occurrences rewritten
    pub replaced: usize,
    /// Location of the pre-patch copy
    pub backup: PathBuf,
}

/// Path of the backup copy for `path`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Replace the quoted argument of every `placeholder` occurrence in `path`
/// with `new_value`, then re-read the file to confirm the value landed.
///
/// A backup is written next to the file first. An existing backup is left
/// alone so it keeps holding the original content when several placeholders
/// are patched one after another.
pub fn substitute_template_value(
    path: &Path,
    placeholder: &Placeholder,
    new_value: &str,
) -> Result<Substitution> {
    if new_value.contains(['"', '\'', '\n', '\r']) {
        return Err(Error::Validation(format!(
            "replacement for {} may not contain quotes or line breaks",
            placeholder
        )));
    }

    let re = placeholder.regex()?;
    let original = std::fs::read_to_string(path)?;

    let backup = backup_path(path);
    if !backup.exists() {
        std::fs::copy(path, &backup)?;
    }

    let replaced = re.find_iter(&original).count();
    let patched = re.replace_all(&original, |caps: &Captures| {
        format!("{}{}{}{}", &caps[1], &caps[2], new_value, &caps[2])
    });
    std::fs::write(path, patched.as_bytes())?;

    debug!(
        path = %path.display(),
        placeholder = %placeholder,
        replaced,
        "substituted template value"
    );

    verify(path, &re, new_value)?;

    Ok(Substitution { replaced, backup })
}

fn verify(path: &Path, re: &Regex, expected: &str) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let landed = content.contains(expected)
        && re
            .captures_iter(&content)
            .any(|caps| &caps[3] == expected);

    if landed {
        Ok(())
    } else {
        Err(Error::VerificationFailed {
            path: path.to_path_buf(),
            expected: expected.to_string(),
        })
    }
}

/// Copy the backup of `path` back over it. Returns the backup location.
pub fn restore_backup(path: &Path) -> Result<PathBuf> {
    let backup = backup_path(path);
    if !backup.is_file() {
        return Err(Error::missing(
            format!("backup {}", backup.display()),
            "Nothing to restore; the file was never patched.",
        ));
    }
    std::fs::copy(&backup, path)?;
    debug!(path = %path.display(), "restored from backup");
    Ok(backup)
}
