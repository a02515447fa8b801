//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

// ── Command failures ──────────────────────────────────────────────────────────

/// How an external command ended when it did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitIndication {
    /// The process exited with a non-zero code.
    Code(i32),
    /// The process was terminated by a signal.
    Signal,
    /// The process could not be spawned, waited on, or timed out.
    NotRun(String),
}

impl fmt::Display for ExitIndication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "exit code {code}"),
            Self::Signal => f.write_str("terminated by signal"),
            Self::NotRun(reason) => write!(f, "could not run: {reason}"),
        }
    }
}

/// Identity and outcome of a failed external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    /// Program and arguments as a single display string.
    pub command: String,
    /// How the command ended.
    pub exit: ExitIndication,
    /// Captured standard error, possibly empty.
    pub stderr: String,
}

impl CommandFailure {
    /// Last `n` non-empty lines of stderr, for diagnostics.
    #[must_use]
    pub fn stderr_tail(&self, n: usize) -> Vec<&str> {
        let lines: Vec<&str> = self
            .stderr
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .collect();
        let start = lines.len().saturating_sub(n);
        lines[start..].to_vec()
    }
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` failed ({})", self.command, self.exit)
    }
}

// ── Provisioning errors ───────────────────────────────────────────────────────

/// Errors raised while provisioning the host.
///
/// Every variant except [`ProvisionError::ExistenceCheck`] is fatal and stops
/// the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    #[error("must be run as root (effective uid: {uid}). Re-run with sudo.")]
    NotElevated { uid: String },

    #[error("package manager: {0}")]
    PackageManager(CommandFailure),

    #[error("could not check {probe}: {reason}")]
    ExistenceCheck { probe: String, reason: String },

    #[error("service account: {0}")]
    Account(CommandFailure),

    #[error("database bootstrap: {0}")]
    DatabaseBootstrap(CommandFailure),

    #[error("cannot write {}: {reason}", path.display())]
    FileWrite { path: PathBuf, reason: String },

    #[error("service control: {0}")]
    ServiceControl(CommandFailure),

    #[error("reverse proxy validation: {0}")]
    ProxyValidation(CommandFailure),

    #[error("certificate acquisition: {0}")]
    CertificateAcquisition(CommandFailure),

    #[error("firewall: {0}")]
    Firewall(CommandFailure),
}

impl ProvisionError {
    /// Whether this error stops the run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ExistenceCheck { .. })
    }

    /// The failed external command behind this error, if any.
    #[must_use]
    pub fn command_failure(&self) -> Option<&CommandFailure> {
        match self {
            Self::PackageManager(f)
            | Self::Account(f)
            | Self::DatabaseBootstrap(f)
            | Self::ServiceControl(f)
            | Self::ProxyValidation(f)
            | Self::CertificateAcquisition(f)
            | Self::Firewall(f) => Some(f),
            Self::NotElevated { .. } | Self::ExistenceCheck { .. } | Self::FileWrite { .. } => None,
        }
    }

    /// Stable machine-readable code used in JSON output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotElevated { .. } => "privilege",
            Self::PackageManager(_) => "package_manager",
            Self::ExistenceCheck { .. } => "existence_check",
            Self::Account(_) => "account",
            Self::DatabaseBootstrap(_) => "database_bootstrap",
            Self::FileWrite { .. } => "file_write",
            Self::ServiceControl(_) => "service_control",
            Self::ProxyValidation(_) => "proxy_validation",
            Self::CertificateAcquisition(_) => "certificate_acquisition",
            Self::Firewall(_) => "firewall",
        }
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to settings and operator input validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid domain name '{0}': expected a lowercase DNS name such as n8n.example.com")]
    InvalidDomain(String),

    #[error("Invalid user name '{0}': must match ^[a-z_][a-z0-9_-]{{0,31}}$")]
    InvalidUser(String),

    #[error("Invalid {field} '{value}': must match ^[a-z_][a-z0-9_]{{0,62}}$")]
    InvalidIdentifier { field: &'static str, value: String },

    #[error("Invalid service port: must be between 1 and 65535")]
    InvalidPort,

    #[error("Invalid app_package '{0}': expected an npm package such as n8n or n8n@1.2.3")]
    InvalidPackage(String),

    #[error("Invalid command_timeout_secs: must be at least 1")]
    InvalidTimeout,

    #[error("Invalid email address '{0}'")]
    InvalidEmail(String),

    #[error("Database password must not be empty")]
    EmptyPassword,

    #[error("{0} must not contain control characters")]
    ControlCharacter(&'static str),

    #[error("Settings file not found: {}", .0.display())]
    SettingsNotFound(PathBuf),
}
