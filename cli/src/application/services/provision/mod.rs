//! Application service: the provisioning use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.
//!
//! Steps run strictly in [`StepId::ALL`] order. Each step sees the run
//! configuration and the results of the steps before it, and nothing else.
//! The loop stops at the first failed step; nothing is rolled back.

mod account;
mod database;
mod files;
mod packages;
mod proxy;

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::application::ports::{CommandRunner, HostFs, ProgressReporter};
use crate::domain::{
    CommandFailure, ExitIndication, ProvisionError, ProvisioningConfig, RunReport, StepId,
    StepResult, StepStatus,
};

/// Existence probes are quick; don't let one hang the run.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// What a single step returns before it is paired with its [`StepId`].
pub(crate) type StepOutcome = Result<StepStatus, ProvisionError>;

/// Runs the provisioning steps against a host through the given ports.
pub struct Provisioner<'a, R: CommandRunner, F: HostFs, P: ProgressReporter> {
    runner: &'a R,
    fs: &'a F,
    reporter: &'a P,
}

impl<'a, R: CommandRunner, F: HostFs, P: ProgressReporter> Provisioner<'a, R, F, P> {
    pub fn new(runner: &'a R, fs: &'a F, reporter: &'a P) -> Self {
        Self {
            runner,
            fs,
            reporter,
        }
    }

    /// Run every step in order, stopping at the first failure.
    pub async fn run(&self, cfg: &ProvisioningConfig) -> RunReport {
        let mut report = RunReport::default();
        let total = StepId::ALL.len();

        for step in StepId::ALL {
            self.reporter
                .step(&format!("[{}/{total}] {}", step.number(), step.label()));
            tracing::info!(step = %step, "starting step");

            let status = self
                .run_step(step, cfg, &report.results)
                .await
                .unwrap_or_else(StepStatus::Failed);

            match &status {
                StepStatus::Success => self.reporter.success(step.label()),
                StepStatus::Skipped(reason) => self
                    .reporter
                    .skipped(&format!("{} (skipped: {reason})", step.label())),
                StepStatus::Failed(err) => {
                    tracing::error!(step = %step, error = %err, "step failed");
                    self.reporter.failed(&format!("{}: {err}", step.label()));
                }
            }

            let failed = status.is_failed();
            report.results.push(StepResult { step, status });
            if failed {
                break;
            }
        }

        tracing::info!(
            complete = report.is_complete(),
            steps = report.results.len(),
            "provisioning finished"
        );
        report
    }

    /// Execute one step. `prior` holds the results of earlier steps only.
    async fn run_step(
        &self,
        step: StepId,
        cfg: &ProvisioningConfig,
        prior: &[StepResult],
    ) -> StepOutcome {
        match step {
            StepId::SyncPackages => self.sync_packages().await,
            StepId::ServiceAccount => self.service_account(cfg).await,
            StepId::Runtime => self.runtime(cfg).await,
            StepId::Application => self.application(cfg).await,
            StepId::DatabaseEngine => self.database_engine().await,
            StepId::DatabaseBootstrap => self.database_bootstrap(cfg).await,
            StepId::EnvironmentFile => self.environment_file(cfg).await,
            StepId::ServiceUnit => self.service_unit(cfg).await,
            StepId::ReverseProxy => self.reverse_proxy(cfg).await,
            StepId::Certificate => self.certificate(cfg).await,
            StepId::Firewall => self.firewall().await,
            StepId::Hardening => self.hardening(cfg, prior).await,
        }
    }

    // ── Effects ──────────────────────────────────────────────────────────────

    /// Run a command that must succeed; `classify` turns a failure into the
    /// step's error kind.
    async fn exec(
        &self,
        program: &str,
        args: &[&str],
        classify: impl FnOnce(CommandFailure) -> ProvisionError,
    ) -> Result<Output, ProvisionError> {
        let command = command_line(program, args);
        tracing::debug!(command = %command, "running command");
        let result = self.runner.run(program, args).await;
        check_output(command, result).map_err(classify)
    }

    /// Like [`Self::exec`] with `input` on stdin. `input_label` stands in for
    /// the input in diagnostics so stdin contents are never logged.
    async fn exec_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        input: &[u8],
        input_label: &str,
        classify: impl FnOnce(CommandFailure) -> ProvisionError,
    ) -> Result<Output, ProvisionError> {
        let command = format!("{} < {input_label}", command_line(program, args));
        tracing::debug!(command = %command, "running command with stdin");
        let result = self
            .runner
            .run_with_stdin(program, args, input)
            .await;
        check_output(command, result).map_err(classify)
    }

    /// Run a read-only probe. Any exit status is returned as-is; only a
    /// probe that cannot run at all is an error.
    async fn probe(&self, what: &str, program: &str, args: &[&str]) -> Result<Output, ProvisionError> {
        tracing::debug!(probe = what, command = %command_line(program, args), "probing");
        self.runner
            .run_with_timeout(program, args, PROBE_TIMEOUT)
            .await
            .map_err(|e| ProvisionError::ExistenceCheck {
                probe: what.to_string(),
                reason: format!("{e:#}"),
            })
    }

    /// `true` when the probe exits zero. A probe that cannot run is reported
    /// as a warning and treated as "not present".
    async fn already_present(&self, what: &str, program: &str, args: &[&str]) -> bool {
        match self.probe(what, program, args).await {
            Ok(output) => output.status.success(),
            Err(err) => {
                self.reporter.warn(&err.to_string());
                false
            }
        }
    }

    fn write_file(&self, path: &Path, content: &str, mode: u32) -> Result<(), ProvisionError> {
        tracing::debug!(path = %path.display(), mode = %format!("{mode:o}"), "writing file");
        self.fs
            .write(path, content, mode)
            .map_err(|e| ProvisionError::FileWrite {
                path: path.to_path_buf(),
                reason: format!("{e:#}"),
            })
    }

    fn remove_file(&self, path: &Path) -> Result<(), ProvisionError> {
        tracing::debug!(path = %path.display(), "removing file");
        self.fs
            .remove_file(path)
            .map_err(|e| ProvisionError::FileWrite {
                path: path.to_path_buf(),
                reason: format!("{e:#}"),
            })
    }

    /// `apt-get <args>` classified as a package-manager failure.
    async fn apt_get(&self, args: &[&str]) -> Result<(), ProvisionError> {
        self.exec("apt-get", args, ProvisionError::PackageManager)
            .await
            .map(|_| ())
    }

    /// `apt-get install -y -q <packages>`.
    async fn apt_install(&self, packages: &[&str]) -> Result<(), ProvisionError> {
        let mut args = vec!["install", "-y", "-q"];
        args.extend_from_slice(packages);
        self.apt_get(&args).await
    }

    /// `systemctl <args>` classified as a service-control failure.
    async fn systemctl(&self, args: &[&str]) -> Result<(), ProvisionError> {
        self.exec("systemctl", args, ProvisionError::ServiceControl)
            .await
            .map(|_| ())
    }
}

/// Display form of a command line, e.g. `apt-get install -y nginx`.
#[must_use]
pub fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

fn check_output(command: String, result: Result<Output>) -> Result<Output, CommandFailure> {
    match result {
        Ok(output) if output.status.success() => Ok(output),
        Ok(output) => {
            let exit = output
                .status
                .code()
                .map_or(ExitIndication::Signal, ExitIndication::Code);
            tracing::warn!(command = %command, exit = %exit, "command failed");
            Err(CommandFailure {
                command,
                exit,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
        Err(e) => Err(CommandFailure {
            command,
            exit: ExitIndication::NotRun(format!("{e:#}")),
            stderr: String::new(),
        }),
    }
}
