//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::app::{AppContext, AppFlags, OutputFlags};
use crate::commands;
use crate::domain::{ConfigError, ProvisionError};
use crate::output::json;

/// Provision a host to run n8n behind nginx with TLS and PostgreSQL
#[derive(Parser)]
#[command(name = "n8n-provision", version)]
pub struct Cli {
    /// Settings file (YAML)
    #[arg(long, value_name = "PATH", env = "N8N_PROVISION_CONFIG")]
    pub config: Option<PathBuf>,

    /// Public domain name; skips the domain prompt
    #[arg(long, value_name = "DOMAIN")]
    pub domain: Option<String>,

    /// Print the step plan and rendered files without changing the host
    #[arg(long)]
    pub dry_run: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output (also honours `NO_COLOR`)
    #[arg(long)]
    pub no_color: bool,

    /// Debug-level logs on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if settings cannot be loaded, input is invalid, or a
    /// provisioning step fails.
    pub async fn run(self) -> Result<()> {
        let json = self.json;
        let result = self.dispatch().await;
        if let Err(e) = &result {
            // A failed step has already printed its report.
            if json && e.downcast_ref::<commands::provision::StepFailed>().is_none() {
                println!("{}", json::format_error(&format!("{e:#}"), error_code(e))?);
            }
        }
        result
    }

    async fn dispatch(self) -> Result<()> {
        let Cli {
            config,
            domain,
            dry_run,
            json,
            quiet,
            no_color,
            verbose: _,
        } = self;
        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            config,
        })?;

        if dry_run {
            commands::plan::run(&app, domain.as_deref())
        } else {
            commands::provision::run(&app, domain.as_deref()).await
        }
    }
}

/// Stable code for the JSON error object.
fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(e) = err.downcast_ref::<ProvisionError>() {
        e.code()
    } else if err.downcast_ref::<ConfigError>().is_some() {
        "config"
    } else {
        "error"
    }
}
