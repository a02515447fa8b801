//! `n8n-provision --dry-run`: show what a run would do.
//!
//! Needs no privileges and never asks for the database password.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::Prompter;
use crate::domain::config::validate_domain;
use crate::domain::templates::preview;
use crate::domain::{ProvisioningConfig, Secret};
use crate::output::json;

/// Stands in for the database password, which a dry run never collects.
const PASSWORD_PLACEHOLDER: &str = "********";

/// Print the ordered step plan and the rendered files.
///
/// # Errors
///
/// Returns an error if the domain cannot be read or the settings are invalid.
pub fn run(app: &AppContext, domain: Option<&str>) -> Result<()> {
    let domain = match domain.or(app.settings.domain.as_deref()) {
        Some(d) => d.trim().to_string(),
        None => app
            .prompter
            .input("Domain name (e.g. n8n.example.com)", &|value: &str| {
                validate_domain(value).map_err(|e| e.to_string())
            })?,
    };
    let cfg = ProvisioningConfig::new(&app.settings, &domain, Secret::new(PASSWORD_PLACEHOLDER))?;
    let files = preview(&cfg);

    if app.is_json() {
        println!("{}", json::format_plan(&cfg, &files)?);
    } else {
        app.human().render_plan(&cfg, &files);
    }
    Ok(())
}
