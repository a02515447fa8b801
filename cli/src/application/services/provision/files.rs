//! Generated configuration: the application environment file and the
//! systemd unit that loads it.

use super::{Provisioner, StepOutcome};
use crate::application::ports::{CommandRunner, HostFs, ProgressReporter};
use crate::domain::templates::{EnvFile, SystemdUnit};
use crate::domain::{ProvisionError, ProvisioningConfig, StepStatus};

/// Data directory: owner-only.
pub const DATA_DIR_MODE: u32 = 0o700;
/// Environment file holds the database password.
pub const ENV_FILE_MODE: u32 = 0o600;
pub const UNIT_FILE_MODE: u32 = 0o644;

impl<R: CommandRunner, F: HostFs, P: ProgressReporter> Provisioner<'_, R, F, P> {
    pub(super) async fn environment_file(&self, cfg: &ProvisioningConfig) -> StepOutcome {
        let dir = cfg.data_dir();
        self.fs
            .create_dir_all(&dir, DATA_DIR_MODE)
            .map_err(|e| ProvisionError::FileWrite {
                path: dir.clone(),
                reason: format!("{e:#}"),
            })?;

        let env = EnvFile::for_config(cfg).render();
        self.write_file(&cfg.env_file_path(), &env, ENV_FILE_MODE)?;

        let owner = format!("{0}:{0}", cfg.target_user);
        let dir_arg = dir.to_string_lossy();
        self.exec("chown", &["-R", &owner, &dir_arg], |failure| {
            ProvisionError::FileWrite {
                path: dir.clone(),
                reason: failure.to_string(),
            }
        })
        .await?;
        Ok(StepStatus::Success)
    }

    pub(super) async fn service_unit(&self, cfg: &ProvisioningConfig) -> StepOutcome {
        let unit = SystemdUnit::for_config(cfg).render();
        self.write_file(&cfg.unit_path(), &unit, UNIT_FILE_MODE)?;

        let unit_name = cfg.unit_name();
        self.systemctl(&["daemon-reload"]).await?;
        self.systemctl(&["enable", "--now", &unit_name]).await?;
        Ok(StepStatus::Success)
    }
}
