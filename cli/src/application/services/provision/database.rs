//! Database bootstrap: create database, create role, grant privileges.
//!
//! There is no existence probe here. A second run fails at
//! `CREATE DATABASE` and stops; the operator drops or keeps the objects by
//! hand. This keeps the established behaviour of the setup procedure and is
//! flagged rather than papered over.

use super::{Provisioner, StepOutcome};
use crate::application::ports::{CommandRunner, HostFs, ProgressReporter};
use crate::domain::{ProvisionError, ProvisioningConfig, StepStatus, sql};

/// `psql` run as the `postgres` superuser, reading SQL from stdin.
pub const PSQL_ARGS: &[&str] = &[
    "-u",
    "postgres",
    "psql",
    "-v",
    "ON_ERROR_STOP=1",
    "--no-psqlrc",
    "-q",
];

impl<R: CommandRunner, F: HostFs, P: ProgressReporter> Provisioner<'_, R, F, P> {
    pub(super) async fn database_bootstrap(&self, cfg: &ProvisioningConfig) -> StepOutcome {
        let statements = [
            ("CREATE DATABASE", sql::create_database(cfg)),
            ("CREATE ROLE", sql::create_role(cfg)),
            ("GRANT ALL PRIVILEGES", sql::grant_privileges(cfg)),
        ];
        for (label, statement) in &statements {
            self.exec_with_stdin(
                "sudo",
                PSQL_ARGS,
                statement.as_bytes(),
                label,
                ProvisionError::DatabaseBootstrap,
            )
            .await?;
        }
        Ok(StepStatus::Success)
    }
}
