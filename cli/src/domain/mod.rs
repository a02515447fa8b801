//! Domain layer: pure provisioning types, templates and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod sql;
pub mod step;
pub mod templates;

pub use config::{ProvisionSettings, ProvisioningConfig, Secret};
pub use error::{CommandFailure, ConfigError, ExitIndication, ProvisionError};
pub use step::{RunReport, StepId, StepResult, StepStatus};
