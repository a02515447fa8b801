//! Provisioning steps and their outcomes.

use std::fmt;

use serde::Serialize;
use serde::ser::SerializeStruct;

use crate::domain::error::ProvisionError;

/// One step of the fixed provisioning sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    SyncPackages,
    ServiceAccount,
    Runtime,
    Application,
    DatabaseEngine,
    DatabaseBootstrap,
    EnvironmentFile,
    ServiceUnit,
    ReverseProxy,
    Certificate,
    Firewall,
    Hardening,
}

impl StepId {
    /// Every step in execution order.
    pub const ALL: [StepId; 12] = [
        StepId::SyncPackages,
        StepId::ServiceAccount,
        StepId::Runtime,
        StepId::Application,
        StepId::DatabaseEngine,
        StepId::DatabaseBootstrap,
        StepId::EnvironmentFile,
        StepId::ServiceUnit,
        StepId::ReverseProxy,
        StepId::Certificate,
        StepId::Firewall,
        StepId::Hardening,
    ];

    /// 1-based position in the sequence.
    #[must_use]
    pub fn number(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0) + 1
    }

    /// Stable kebab-case identifier.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::SyncPackages => "sync-packages",
            Self::ServiceAccount => "service-account",
            Self::Runtime => "runtime",
            Self::Application => "application",
            Self::DatabaseEngine => "database-engine",
            Self::DatabaseBootstrap => "database-bootstrap",
            Self::EnvironmentFile => "environment-file",
            Self::ServiceUnit => "service-unit",
            Self::ReverseProxy => "reverse-proxy",
            Self::Certificate => "certificate",
            Self::Firewall => "firewall",
            Self::Hardening => "hardening",
        }
    }

    /// Human-readable description shown while the step runs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::SyncPackages => "syncing OS packages",
            Self::ServiceAccount => "ensuring service account",
            Self::Runtime => "ensuring Node.js runtime",
            Self::Application => "installing application package",
            Self::DatabaseEngine => "installing PostgreSQL",
            Self::DatabaseBootstrap => "bootstrapping database",
            Self::EnvironmentFile => "writing environment file",
            Self::ServiceUnit => "registering systemd service",
            Self::ReverseProxy => "configuring nginx",
            Self::Certificate => "acquiring TLS certificate",
            Self::Firewall => "adjusting firewall",
            Self::Hardening => "removing temporary privileges",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Outcome of a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Success,
    Skipped(String),
    Failed(ProvisionError),
}

impl StepStatus {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// A step paired with its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub step: StepId,
    pub status: StepStatus,
}

impl Serialize for StepResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("StepResult", 4)?;
        s.serialize_field("step", &self.step)?;
        match &self.status {
            StepStatus::Success => {
                s.serialize_field("status", "success")?;
                s.skip_field("reason")?;
                s.skip_field("code")?;
            }
            StepStatus::Skipped(reason) => {
                s.serialize_field("status", "skipped")?;
                s.serialize_field("reason", reason)?;
                s.skip_field("code")?;
            }
            StepStatus::Failed(err) => {
                s.serialize_field("status", "failed")?;
                s.serialize_field("reason", &err.to_string())?;
                s.serialize_field("code", err.code())?;
            }
        }
        s.end()
    }
}

/// Ordered results of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub results: Vec<StepResult>,
}

impl RunReport {
    /// The failed step, if the run stopped early.
    #[must_use]
    pub fn failure(&self) -> Option<(StepId, &ProvisionError)> {
        self.results.iter().find_map(|r| match &r.status {
            StepStatus::Failed(err) => Some((r.step, err)),
            _ => None,
        })
    }

    /// `true` when every step ran and none failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.results.len() == StepId::ALL.len() && self.failure().is_none()
    }

    #[must_use]
    pub fn status_of(&self, step: StepId) -> Option<&StepStatus> {
        self.results
            .iter()
            .find(|r| r.step == step)
            .map(|r| &r.status)
    }
}
