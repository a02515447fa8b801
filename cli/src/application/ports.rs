//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::Secret;

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Run a program with stdin piped from `stdin`.
    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output>;
}

// ── Host Filesystem Port ──────────────────────────────────────────────────────

/// Abstracts the host filesystem writes performed by provisioning steps.
pub trait HostFs {
    /// Whether `path` exists (symlinks are followed).
    fn exists(&self, path: &Path) -> bool;
    /// Create `path` and its parents, then apply `mode` to `path`.
    fn create_dir_all(&self, path: &Path, mode: u32) -> Result<()>;
    /// Write `content` to `path` with permission bits `mode`.
    ///
    /// The file must never be observable with wider permissions than `mode`.
    fn write(&self, path: &Path, content: &str, mode: u32) -> Result<()>;
    /// Point `link` at `original`, replacing an existing link.
    fn symlink(&self, original: &Path, link: &Path) -> Result<()>;
    /// Remove the file at `path`. A file that is already gone is not an error.
    fn remove_file(&self, path: &Path) -> Result<()>;
}

// ── Prompt Port ───────────────────────────────────────────────────────────────

/// Abstracts interactive operator input.
pub trait Prompter {
    /// Read a secret with input hidden, asking for confirmation.
    /// `validate` is re-applied until it passes.
    fn password(&self, prompt: &str, validate: &dyn Fn(&str) -> Result<(), String>) -> Result<Secret>;
    /// Read a line of plain text. `validate` is re-applied until it passes.
    fn input(&self, prompt: &str, validate: &dyn Fn(&str) -> Result<(), String>) -> Result<String>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a message for a step that had nothing to do.
    fn skipped(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// Emit a failure message.
    fn failed(&self, message: &str);
}
