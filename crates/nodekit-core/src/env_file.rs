//! Flat `KEY=value` environment files shared between installer steps
//!
//! Reading goes through `dotenvy`, so quoting and `export` prefixes behave the
//! way a shell `source` would. Writing is line based: [`EnvFile::set_or_append`]
//! touches a single key and leaves every other line (comments included) as is.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{Error, Result};

/// An environment-style config file on disk.
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
}

impl EnvFile {
    /// Point at an env file. The file does not need to exist yet.
    pub fn at<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Parse every entry of the file.
    pub fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.exists() {
            return Err(Error::missing(
                format!("environment file {}", self.path.display()),
                "Run the node setup step of the installer first.",
            ));
        }

        let iter = dotenvy::from_path_iter(&self.path).map_err(map_dotenv_error)?;
        let mut values = BTreeMap::new();
        for item in iter {
            let (key, value) = item.map_err(map_dotenv_error)?;
            values.insert(key, value);
        }

        trace!(path = %self.path.display(), entries = values.len(), "loaded env file");
        Ok(values)
    }

    /// Look up a single key. Empty values count as absent.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key).filter(|v| !v.is_empty()))
    }

    /// Set `key` to `value`, replacing the existing line in place or appending
    /// `KEY="value"` at the end. Creates the file when it does not exist.
    ///
    /// Running this twice with the same arguments leaves the file unchanged.
    /// Duplicate lines for `key` left by older tooling are collapsed into the
    /// first one.
    pub fn set_or_append(&self, key: &str, value: &str) -> Result<()> {
        check_key(key)?;
        check_value(value)?;

        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        // Keep whatever line ending the file already uses
        let newline = if content.contains("\r\n") { "\r\n" } else { "\n" };
        let mut replaced = false;
        let mut output = String::with_capacity(content.len() + key.len() + value.len() + 4);

        for chunk in content.split_inclusive('\n') {
            let (line, ending) = split_line_ending(chunk);
            let ending = if ending.is_empty() { newline } else { ending };

            match split_assignment(line) {
                Some((prefix, existing)) if existing == key => {
                    if replaced {
                        continue;
                    }
                    replaced = true;
                    let indent = &line[..line.len() - line.trim_start().len()];
                    output.push_str(&format!("{}{}{}=\"{}\"{}", indent, prefix, key, value, ending));
                }
                _ => {
                    output.push_str(line);
                    output.push_str(ending);
                }
            }
        }

        if !replaced {
            output.push_str(&format!("{}=\"{}\"{}", key, value, newline));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, output)?;

        debug!(
            path = %self.path.display(),
            key,
            action = if replaced { "updated" } else { "appended" },
            "patched env file"
        );
        Ok(())
    }

    /// Restrict the file to owner read/write (0600). No-op off unix.
    pub fn restrict_permissions(&self) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

/// Convenience wrapper around [`EnvFile::set_or_append`].
pub fn set_or_append_key(path: &Path, key: &str, value: &str) -> Result<()> {
    EnvFile::at(path).set_or_append(key, value)
}

/// Separate a line from its `\n` or `\r\n` terminator
fn split_line_ending(chunk: &str) -> (&str, &str) {
    if let Some(line) = chunk.strip_suffix("\r\n") {
        (line, "\r\n")
    } else if let Some(line) = chunk.strip_suffix('\n') {
        (line, "\n")
    } else {
        (chunk, "")
    }
}

/// Split `KEY=...` or `export KEY=...` into its prefix and key.
fn split_assignment(line: &str) -> Option<(&'static str, &str)> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return None;
    }

    let (prefix, rest) = match trimmed.strip_prefix("export ") {
        Some(rest) => ("export ", rest.trim_start()),
        None => ("", trimmed),
    };

    let (key, _) = rest.split_once('=')?;
    let key = key.trim_end();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((prefix, key))
}

fn check_key(key: &str) -> Result<()> {
    let mut chars = key.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(Error::Validation(format!("'{}' is not a valid key name", key)))
    }
}

fn check_value(value: &str) -> Result<()> {
    if value.contains(['"', '\n', '\r']) {
        return Err(Error::Validation(
            "values may not contain double quotes or line breaks".into(),
        ));
    }
    Ok(())
}

fn map_dotenv_error(err: dotenvy::Error) -> Error {
    match err {
        dotenvy::Error::Io(e) => Error::Io(e),
        other => Error::Validation(format!("malformed env file: {}", other)),
    }
}
