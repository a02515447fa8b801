//! Application service: assemble the run configuration.
//!
//! Settings come from the settings file; the database password is always
//! asked for, and the domain is asked for unless it was supplied already.

use anyhow::Result;

use crate::application::ports::Prompter;
use crate::domain::config::{validate_domain, validate_password};
use crate::domain::{ProvisionSettings, ProvisioningConfig, Secret};

/// Collect operator input and build the immutable [`ProvisioningConfig`].
///
/// Prompts in a fixed order: database password first, then the domain name.
/// `domain_override` (from `--domain`) wins over the settings file; either
/// one suppresses the domain prompt.
///
/// # Errors
///
/// Returns an error if a prompt fails (e.g. no TTY) or the resulting
/// configuration is invalid.
pub fn collect_config(
    settings: &ProvisionSettings,
    domain_override: Option<&str>,
    prompter: &impl Prompter,
) -> Result<ProvisioningConfig> {
    let prompt = format!(
        "Password for database role '{}'",
        settings.database_user
    );
    let password = prompter.password(&prompt, &|value: &str| {
        validate_password(&Secret::new(value)).map_err(|e| e.to_string())
    })?;

    let domain = match domain_override.or(settings.domain.as_deref()) {
        Some(d) => d.to_string(),
        None => prompter.input("Domain name (e.g. n8n.example.com)", &|value: &str| {
            validate_domain(value.trim()).map_err(|e| e.to_string())
        })?,
    };

    Ok(ProvisioningConfig::new(settings, domain.trim(), password)?)
}
