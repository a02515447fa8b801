//! Application context: unified state passed to every command handler.
//!
//! `AppContext` bundles the output context, loaded settings and the
//! production port implementations so command handlers take one parameter.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::domain::ProvisionSettings;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::YamlSettingsStore;
use crate::infra::prompt::DialoguerPrompter;
use crate::output::{HumanRenderer, OutputContext, TerminalReporter};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Explicit settings file (`--config` or `N8N_PROVISION_CONFIG`).
    pub config: Option<PathBuf>,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Settings loaded from the settings file, or defaults.
    pub settings: ProvisionSettings,
    /// Process runner with the configured per-command watchdog.
    pub runner: TokioCommandRunner,
    /// Interactive prompts on the controlling terminal.
    pub prompter: DialoguerPrompter,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be found, read or parsed.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let settings = YamlSettingsStore::default().load(flags.config.as_deref())?;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        // In JSON mode stdout carries a single document, so progress lines
        // are suppressed.
        let quiet = flags.output.quiet || flags.output.json;

        Ok(Self {
            output: OutputContext::new(flags.output.no_color, quiet),
            mode,
            runner: TokioCommandRunner::new(Duration::from_secs(settings.command_timeout_secs)),
            settings,
            prompter: DialoguerPrompter,
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Human renderer over this context's output.
    #[must_use]
    pub fn human(&self) -> HumanRenderer<'_> {
        HumanRenderer::new(&self.output)
    }

    /// Progress reporter over this context's output.
    #[must_use]
    pub fn terminal_reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }
}
