//! Package installation steps: OS sync, Node.js runtime, the application
//! package and the database engine.

use super::{Provisioner, StepOutcome};
use crate::application::ports::{CommandRunner, HostFs, ProgressReporter};
use crate::domain::{ProvisionError, ProvisioningConfig, StepStatus};

/// Stands in for the NodeSource setup script in diagnostics.
const NODESOURCE_LABEL: &str = "<nodesource setup script>";

impl<R: CommandRunner, F: HostFs, P: ProgressReporter> Provisioner<'_, R, F, P> {
    pub(super) async fn sync_packages(&self) -> StepOutcome {
        self.apt_get(&["update", "-q"]).await?;
        self.apt_get(&[
            "upgrade",
            "-y",
            "-q",
            "-o",
            "Dpkg::Options::=--force-confdef",
            "-o",
            "Dpkg::Options::=--force-confold",
        ])
        .await?;
        Ok(StepStatus::Success)
    }

    pub(super) async fn runtime(&self, cfg: &ProvisioningConfig) -> StepOutcome {
        if self
            .already_present("Node.js runtime", "which", &["node"])
            .await
        {
            return Ok(StepStatus::Skipped("node is already on PATH".to_string()));
        }

        // The script is piped from memory into `bash`; it never lands in a
        // directory other users can write to.
        let url = format!("https://deb.nodesource.com/setup_{}.x", cfg.node_major);
        let script = self
            .exec("curl", &["-fsSL", &url], ProvisionError::PackageManager)
            .await?;
        self.exec_with_stdin(
            "bash",
            &["-s"],
            &script.stdout,
            NODESOURCE_LABEL,
            ProvisionError::PackageManager,
        )
        .await?;
        self.apt_install(&["nodejs"]).await?;
        Ok(StepStatus::Success)
    }

    pub(super) async fn application(&self, cfg: &ProvisioningConfig) -> StepOutcome {
        self.exec(
            "npm",
            &["install", "-g", &cfg.app_package],
            ProvisionError::PackageManager,
        )
        .await?;
        Ok(StepStatus::Success)
    }

    pub(super) async fn database_engine(&self) -> StepOutcome {
        self.apt_install(&["postgresql", "postgresql-contrib"]).await?;
        self.systemctl(&["enable", "--now", "postgresql"]).await?;
        Ok(StepStatus::Success)
    }
}
