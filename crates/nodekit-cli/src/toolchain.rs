//! Running the external package manager and migration tool

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use color_eyre::eyre::{eyre, Result};
use nodekit_core::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tracing::{debug, info};

/// A fully described subprocess call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Extra environment on top of the inherited one
    pub env: Vec<(String, String)>,
    /// Echo output to the terminal while it is captured
    pub stream: bool,
}

impl ToolInvocation {
    /// Build from a `[program, args...]` command line
    pub fn from_command(command: &[String], cwd: &Path) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| eyre!("Empty command line"))?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            cwd: cwd.to_path_buf(),
            env: Vec::new(),
            stream: false,
        })
    }

    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }

    pub fn with_env<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.env.extend(vars);
        self
    }

    /// The command line as a user would type it
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What a finished subprocess left behind
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// `None` when killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout followed by stderr, as written to the deploy log
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }

    /// Turn a non-zero exit into [`Error::ToolInvocationFailed`]
    pub fn ensure_success(&self, invocation: &ToolInvocation) -> Result<()> {
        if self.success() {
            return Ok(());
        }

        let status = match self.code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        // truffle reports failures on stdout, node warnings land on stderr
        Err(Error::ToolInvocationFailed {
            tool: invocation.command_line(),
            status,
            output: self.combined(),
        }
        .into())
    }
}

/// Runs external tools to completion
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput>;
}

/// Spawns real processes. Blocks until the tool exits; there is no timeout.
pub struct ProcessRunner;

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        info!(command = %invocation.command_line(), cwd = %invocation.cwd.display(), "running tool");

        let mut child = tokio::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => eyre!(
                    "'{}' not found. Is it installed and on PATH?",
                    invocation.program
                ),
                _ => eyre!("Failed to run '{}': {}", invocation.command_line(), e),
            })?;

        let (out_echo, err_echo) = if invocation.stream {
            (Some(Echo::Stdout), Some(Echo::Stderr))
        } else {
            (None, None)
        };

        // Both pipes are drained together so a chatty stderr can't stall stdout
        let (stdout, stderr, status) = tokio::try_join!(
            drain(child.stdout.take(), out_echo),
            drain(child.stderr.take(), err_echo),
            child.wait(),
        )
        .map_err(|e| eyre!("Failed to run '{}': {}", invocation.command_line(), e))?;

        debug!(code = ?status.code(), "tool finished");

        Ok(ToolOutput {
            code: status.code(),
            stdout,
            stderr,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Echo {
    Stdout,
    Stderr,
}

/// Read a pipe to the end line by line, copying each line to `echo` as it arrives.
async fn drain<R>(pipe: Option<R>, echo: Option<Echo>) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let Some(pipe) = pipe else {
        return Ok(String::new());
    };

    let mut reader = BufReader::new(pipe);
    let mut captured = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }

        match echo {
            Some(Echo::Stdout) => {
                let mut out = tokio::io::stdout();
                out.write_all(&line).await?;
                out.flush().await?;
            }
            Some(Echo::Stderr) => {
                let mut err = tokio::io::stderr();
                err.write_all(&line).await?;
                err.flush().await?;
            }
            None => {}
        }
        captured.extend_from_slice(&line);
    }

    Ok(String::from_utf8_lossy(&captured).into_owned())
}
