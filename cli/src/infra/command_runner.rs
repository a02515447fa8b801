//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` is the production implementation that uses tokio
//! for async process execution with guaranteed timeout and kill.

use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Child;

use crate::application::ports::CommandRunner;

/// Default watchdog for provisioning commands. Package installs are slow.
pub const DEFAULT_CMD_TIMEOUT: Duration = Duration::from_secs(3600);

/// Environment applied to every child so package managers never prompt.
const NONINTERACTIVE_ENV: &[(&str, &str)] = &[
    ("DEBIAN_FRONTEND", "noninteractive"),
    ("NEEDRESTART_MODE", "a"),
];

/// Production `CommandRunner` using tokio for async process execution
/// with guaranteed timeout and kill.
///
/// Children are spawned with `kill_on_drop`, and the timeout branch kills
/// the child explicitly before returning.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn command(program: &str, args: &[&str]) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .envs(NONINTERACTIVE_ENV.iter().copied())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Wait for `child` while draining its pipes, killing it after `timeout`.
    async fn collect(program: &str, mut child: Child, timeout: Duration) -> Result<Output> {
        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    drain(stdout_handle.as_mut()),
                    drain(stderr_handle.as_mut()),
                );
                Ok(Output {
                    status: status.with_context(|| format!("waiting for {program}"))?,
                    stdout,
                    stderr,
                })
            } => result,
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
            }
        }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_CMD_TIMEOUT)
    }
}

async fn drain<R: AsyncRead + Unpin>(handle: Option<&mut R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(h) = handle {
        let _ = h.read_to_end(&mut buf).await;
    }
    buf
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        let child = Self::command(program, args)
            .stdin(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;
        Self::collect(program, child, timeout).await
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], input: &[u8]) -> Result<Output> {
        let mut child = Self::command(program, args)
            .stdin(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        // Write and close stdin before waiting so the child sees EOF.
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input)
                .await
                .with_context(|| format!("writing stdin of {program}"))?;
            stdin
                .shutdown()
                .await
                .with_context(|| format!("closing stdin of {program}"))?;
        }

        Self::collect(program, child, self.timeout).await
    }
}
