//! Edge of the host: nginx virtual host, TLS certificate and firewall.

use super::{Provisioner, StepOutcome};
use crate::application::ports::{CommandRunner, HostFs, ProgressReporter};
use crate::domain::templates::NginxSite;
use crate::domain::{ProvisionError, ProvisioningConfig, StepStatus};

pub const SITE_FILE_MODE: u32 = 0o644;
/// ufw application profile registered by the nginx package (ports 80 and 443).
pub const NGINX_UFW_PROFILE: &str = "Nginx Full";

/// Firewall state as reported by `ufw status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirewallState {
    Active,
    Inactive,
    Unknown,
}

/// Parse the first line of `ufw status` output.
#[must_use]
pub fn parse_ufw_status(stdout: &str) -> FirewallState {
    let first = stdout.lines().next().unwrap_or("").trim();
    match first.strip_prefix("Status:").map(str::trim) {
        Some("active") => FirewallState::Active,
        Some("inactive") => FirewallState::Inactive,
        _ => FirewallState::Unknown,
    }
}

impl<R: CommandRunner, F: HostFs, P: ProgressReporter> Provisioner<'_, R, F, P> {
    pub(super) async fn reverse_proxy(&self, cfg: &ProvisioningConfig) -> StepOutcome {
        self.apt_install(&["nginx"]).await?;

        let available = cfg.site_available_path();
        let enabled = cfg.site_enabled_path();
        let site = NginxSite::for_config(cfg).render();
        self.write_file(&available, &site, SITE_FILE_MODE)?;
        self.fs
            .symlink(&available, &enabled)
            .map_err(|e| ProvisionError::FileWrite {
                path: enabled.clone(),
                reason: format!("{e:#}"),
            })?;

        self.exec("nginx", &["-t"], ProvisionError::ProxyValidation)
            .await?;
        self.systemctl(&["restart", "nginx"]).await?;
        Ok(StepStatus::Success)
    }

    pub(super) async fn certificate(&self, cfg: &ProvisioningConfig) -> StepOutcome {
        if self.fs.exists(&cfg.certificate_path()) {
            return Ok(StepStatus::Skipped(format!(
                "certificate for {} already present",
                cfg.domain_name
            )));
        }

        self.apt_install(&["certbot", "python3-certbot-nginx"])
            .await?;

        let mut args = vec![
            "--nginx",
            "-d",
            cfg.domain_name.as_str(),
            "--non-interactive",
            "--agree-tos",
            "--redirect",
        ];
        match &cfg.admin_email {
            Some(email) => args.extend_from_slice(&["--email", email.as_str()]),
            None => args.push("--register-unsafely-without-email"),
        }
        self.exec("certbot", &args, ProvisionError::CertificateAcquisition)
            .await?;
        Ok(StepStatus::Success)
    }

    /// Open the nginx profile when ufw is active. An inactive firewall is
    /// left untouched with an advisory.
    pub(super) async fn firewall(&self) -> StepOutcome {
        let state = match self.probe("firewall status", "ufw", &["status"]).await {
            Ok(output) if output.status.success() => {
                parse_ufw_status(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(_) => FirewallState::Unknown,
            Err(err) => {
                self.reporter.warn(&err.to_string());
                FirewallState::Unknown
            }
        };

        match state {
            FirewallState::Active => {
                self.exec(
                    "ufw",
                    &["allow", NGINX_UFW_PROFILE],
                    ProvisionError::Firewall,
                )
                .await?;
                Ok(StepStatus::Success)
            }
            FirewallState::Inactive => {
                self.reporter.warn(&format!(
                    "ufw is inactive; leaving it untouched. If you enable it later, run: ufw allow '{NGINX_UFW_PROFILE}'"
                ));
                Ok(StepStatus::Skipped("firewall inactive".to_string()))
            }
            FirewallState::Unknown => {
                self.reporter.warn(&format!(
                    "could not determine firewall state; make sure ports 80 and 443 are reachable ('{NGINX_UFW_PROFILE}')"
                ));
                Ok(StepStatus::Skipped("firewall state unknown".to_string()))
            }
        }
    }
}
