//! `n8n-provision`: run every provisioning step against this host.

use anyhow::Result;
use thiserror::Error;

use crate::app::AppContext;
use crate::application::services::config_input::collect_config;
use crate::application::services::privilege::ensure_elevated;
use crate::application::services::provision::Provisioner;
use crate::domain::StepId;
use crate::infra::fs::LocalFs;
use crate::output::json;

/// A step failed and its diagnostic has been printed.
#[derive(Debug, Error)]
#[error("provisioning stopped at step {}/{} ({})", .step.number(), StepId::ALL.len(), .step.id())]
pub struct StepFailed {
    pub step: StepId,
}

/// Run the provisioning workflow.
///
/// # Errors
///
/// Returns an error if the process is not elevated, operator input cannot be
/// read or is invalid, or a step fails ([`StepFailed`]).
pub async fn run(app: &AppContext, domain: Option<&str>) -> Result<()> {
    ensure_elevated(&app.runner).await?;
    let cfg = collect_config(&app.settings, domain, &app.prompter)?;
    tracing::info!(
        domain = %cfg.domain_name,
        user = %cfg.target_user,
        port = cfg.service_port,
        "starting provisioning run"
    );

    let reporter = app.terminal_reporter();
    let report = Provisioner::new(&app.runner, &LocalFs, &reporter)
        .run(&cfg)
        .await;

    if app.is_json() {
        println!("{}", json::format_report(&report, &cfg)?);
    }

    match report.failure() {
        None => {
            if !app.is_json() {
                app.human().render_summary(&report, &cfg);
            }
            Ok(())
        }
        Some((step, err)) => {
            if !app.is_json() {
                app.human().render_failure(step, err);
            }
            Err(StepFailed { step }.into())
        }
    }
}
