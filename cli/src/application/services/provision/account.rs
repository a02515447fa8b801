//! Service account creation and the closing privilege cleanup.
//!
//! A temporary `sudo` grant is recorded in a root-owned marker file before
//! the account is created. The hardening step revokes any recorded grant,
//! so a run that stopped half-way is still cleaned up by the next one.

use super::{Provisioner, StepOutcome};
use crate::application::ports::{CommandRunner, HostFs, ProgressReporter};
use crate::domain::{ProvisionError, ProvisioningConfig, StepId, StepResult, StepStatus};

/// Group granting temporary elevated privileges during setup.
pub const SUDO_GROUP: &str = "sudo";

impl<R: CommandRunner, F: HostFs, P: ProgressReporter> Provisioner<'_, R, F, P> {
    pub(super) async fn service_account(&self, cfg: &ProvisioningConfig) -> StepOutcome {
        let user = cfg.target_user.as_str();
        if self
            .already_present("service account", "id", &["-u", user])
            .await
        {
            return Ok(StepStatus::Skipped(format!("account '{user}' already exists")));
        }

        let mut args = vec!["--create-home", "--shell", "/bin/bash"];
        if cfg.temporary_sudo {
            // Recorded first, so a grant is never made without a trace.
            self.write_file(
                &cfg.sudo_grant_marker(),
                &format!("{user} {SUDO_GROUP}\n"),
                0o600,
            )?;
            args.extend_from_slice(&["--groups", SUDO_GROUP]);
        }
        args.push(user);
        self.exec("useradd", &args, ProvisionError::Account).await?;
        Ok(StepStatus::Success)
    }

    /// Revoke the `sudo` membership granted by [`Self::service_account`],
    /// in this run or in an earlier one that stopped before this step.
    /// Accounts this tool did not create are left alone.
    pub(super) async fn hardening(
        &self,
        cfg: &ProvisioningConfig,
        prior: &[StepResult],
    ) -> StepOutcome {
        let user = cfg.target_user.as_str();
        let marker = cfg.sudo_grant_marker();
        let created_now = cfg.temporary_sudo
            && prior
                .iter()
                .any(|r| r.step == StepId::ServiceAccount && r.status == StepStatus::Success);
        if !created_now && !self.fs.exists(&marker) {
            return Ok(StepStatus::Skipped(format!(
                "no temporary privilege grant is recorded for '{user}'"
            )));
        }

        if self.in_sudo_group(user).await {
            self.exec("gpasswd", &["-d", user, SUDO_GROUP], ProvisionError::Account)
                .await?;
        } else {
            tracing::info!(user, "recorded grant already revoked");
        }
        self.remove_file(&marker)?;
        Ok(StepStatus::Success)
    }

    /// Whether `user` is currently a member of [`SUDO_GROUP`]. A probe that
    /// cannot run counts as a member so the revoke is still attempted.
    async fn in_sudo_group(&self, user: &str) -> bool {
        match self.probe("group membership", "id", &["-nG", user]).await {
            Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
                .split_whitespace()
                .any(|group| group == SUDO_GROUP),
            Ok(_) => false,
            Err(err) => {
                self.reporter.warn(&err.to_string());
                true
            }
        }
    }
}
