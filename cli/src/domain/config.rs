//! Provisioning settings and the immutable per-run configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Validation patterns ──────────────────────────────────────────────────────

/// Same rule `useradd` applies by default on Debian (`NAME_REGEX`).
pub static USER_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").expect("valid regex")
});

/// Unquoted-safe PostgreSQL identifier (max 63 bytes).
pub static SQL_IDENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").expect("valid regex")
});

/// A single DNS label.
pub static DNS_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("valid regex")
});

/// npm package name, optionally scoped (`@scope/name`).
pub static NPM_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^(@[a-z0-9][a-z0-9._~-]*/)?[a-z0-9][a-z0-9._~-]*$").expect("valid regex")
});

pub static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex")
});

/// Directory for state this tool keeps between runs.
pub const STATE_DIR: &str = "/var/lib/n8n-provision";

// ── Settings file schema ─────────────────────────────────────────────────────

/// Operator-tunable, non-secret settings, optionally loaded from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisionSettings {
    /// Dedicated service account that runs the application.
    pub target_user: String,
    /// Local port the application listens on.
    pub service_port: u16,
    pub database_name: String,
    pub database_user: String,
    /// Public domain name. Prompted for when absent.
    pub domain: Option<String>,
    /// Contact address for the certificate authority.
    pub admin_email: Option<String>,
    /// npm package installed globally.
    pub app_package: String,
    /// Absolute path of the installed application binary.
    pub binary_path: PathBuf,
    /// Node.js major version installed from NodeSource.
    pub node_major: u8,
    /// Add the service account to `sudo` during setup and remove it at the end.
    pub temporary_sudo: bool,
    /// Watchdog timeout applied to every external command.
    pub command_timeout_secs: u64,
}

impl ProvisionSettings {
    /// Check the settings that are used before a run configuration exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimeout`] for a zero command timeout and
    /// [`ConfigError::InvalidPackage`] for an unusable `app_package`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        validate_package(&self.app_package)
    }
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            target_user: "n8n".to_string(),
            service_port: 5678,
            database_name: "n8n".to_string(),
            database_user: "n8n".to_string(),
            domain: None,
            admin_email: None,
            app_package: "n8n".to_string(),
            binary_path: PathBuf::from("/usr/bin/n8n"),
            node_major: 20,
            temporary_sudo: true,
            command_timeout_secs: 3600,
        }
    }
}

// ── Secret ───────────────────────────────────────────────────────────────────

/// A string that never shows up in `Debug` or `Display` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying value. Callers must not log it.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(********)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("********")
    }
}

// ── Per-run configuration ────────────────────────────────────────────────────

/// Immutable configuration for one provisioning run.
///
/// Built once from [`ProvisionSettings`] plus operator input, then passed by
/// shared reference to every step.
#[derive(Debug, Clone)]
pub struct ProvisioningConfig {
    pub target_user: String,
    pub service_port: u16,
    pub domain_name: String,
    pub database_name: String,
    pub database_user: String,
    pub database_password: Secret,
    pub admin_email: Option<String>,
    pub app_package: String,
    pub binary_path: PathBuf,
    pub node_major: u8,
    pub temporary_sudo: bool,
}

impl ProvisioningConfig {
    /// Validate settings and operator input into a run configuration.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn new(
        settings: &ProvisionSettings,
        domain: &str,
        password: Secret,
    ) -> Result<Self, ConfigError> {
        validate_user(&settings.target_user)?;
        validate_identifier("database_name", &settings.database_name)?;
        validate_identifier("database_user", &settings.database_user)?;
        if settings.service_port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        validate_domain(domain)?;
        validate_password(&password)?;
        if let Some(email) = &settings.admin_email {
            validate_email(email)?;
        }
        validate_package(&settings.app_package)?;

        Ok(Self {
            target_user: settings.target_user.clone(),
            service_port: settings.service_port,
            domain_name: domain.to_string(),
            database_name: settings.database_name.clone(),
            database_user: settings.database_user.clone(),
            database_password: password,
            admin_email: settings.admin_email.clone(),
            app_package: settings.app_package.clone(),
            binary_path: settings.binary_path.clone(),
            node_major: settings.node_major,
            temporary_sudo: settings.temporary_sudo,
        })
    }

    /// Home directory of the service account.
    #[must_use]
    pub fn home_dir(&self) -> PathBuf {
        PathBuf::from("/home").join(&self.target_user)
    }

    /// Application data directory under the service account's home.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.home_dir().join(".n8n")
    }

    #[must_use]
    pub fn env_file_path(&self) -> PathBuf {
        self.data_dir().join(".env")
    }

    /// systemd unit name, e.g. `n8n.service`.
    #[must_use]
    pub fn unit_name(&self) -> String {
        format!("{}.service", self.service_name())
    }

    /// Service name derived from the package name (`@scope/pkg@1.2` → `pkg`).
    #[must_use]
    pub fn service_name(&self) -> &str {
        let (name, _) = split_package_spec(&self.app_package);
        name.rsplit('/').next().unwrap_or(name)
    }

    /// Root-owned record of a temporary `sudo` grant to the service account.
    #[must_use]
    pub fn sudo_grant_marker(&self) -> PathBuf {
        PathBuf::from(STATE_DIR)
            .join("sudo-grants")
            .join(&self.target_user)
    }

    #[must_use]
    pub fn unit_path(&self) -> PathBuf {
        PathBuf::from("/etc/systemd/system").join(self.unit_name())
    }

    #[must_use]
    pub fn site_available_path(&self) -> PathBuf {
        PathBuf::from("/etc/nginx/sites-available").join(&self.domain_name)
    }

    #[must_use]
    pub fn site_enabled_path(&self) -> PathBuf {
        PathBuf::from("/etc/nginx/sites-enabled").join(&self.domain_name)
    }

    /// Certificate file certbot writes for the domain.
    #[must_use]
    pub fn certificate_path(&self) -> PathBuf {
        PathBuf::from("/etc/letsencrypt/live")
            .join(&self.domain_name)
            .join("fullchain.pem")
    }

    #[must_use]
    pub fn https_url(&self) -> String {
        format!("https://{}/", self.domain_name)
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a system account name.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidUser`] if the name is not accepted by `useradd`.
pub fn validate_user(name: &str) -> Result<(), ConfigError> {
    if USER_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidUser(name.to_string()))
    }
}

/// Validates a database or role name.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidIdentifier`] naming `field`.
pub fn validate_identifier(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if SQL_IDENT_RE.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            field,
            value: value.to_string(),
        })
    }
}

/// Validates a public domain name (at least two labels, lowercase).
///
/// # Errors
///
/// Returns [`ConfigError::InvalidDomain`].
pub fn validate_domain(domain: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidDomain(domain.to_string());
    if domain.is_empty() || domain.len() > 253 {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || !labels.iter().all(|l| DNS_LABEL_RE.is_match(l)) {
        return Err(invalid());
    }
    // The top-level label is never all digits; rules out bare IPv4 addresses.
    if labels
        .last()
        .is_some_and(|tld| tld.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(invalid());
    }
    Ok(())
}

/// Validates the database role password.
///
/// # Errors
///
/// Returns an error if the password is empty or contains control characters.
pub fn validate_password(password: &Secret) -> Result<(), ConfigError> {
    let value = password.expose();
    if value.is_empty() {
        return Err(ConfigError::EmptyPassword);
    }
    if value.chars().any(char::is_control) {
        return Err(ConfigError::ControlCharacter("database password"));
    }
    Ok(())
}

/// Split an npm install spec into package name and optional version
/// (`@scope/pkg@^1` → `("@scope/pkg", Some("^1"))`).
#[must_use]
pub fn split_package_spec(spec: &str) -> (&str, Option<&str>) {
    let search_from = usize::from(spec.starts_with('@'));
    match spec[search_from..].find('@') {
        Some(at) => {
            let at = at + search_from;
            (&spec[..at], Some(&spec[at + 1..]))
        }
        None => (spec, None),
    }
}

/// Validates the npm install spec for the application package.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPackage`] if the name is not a valid npm
/// package name or the version is empty or contains whitespace.
pub fn validate_package(spec: &str) -> Result<(), ConfigError> {
    let (name, version) = split_package_spec(spec);
    let version_ok = version.is_none_or(|v| {
        !v.is_empty() && !v.chars().any(|c| c.is_whitespace() || c.is_control())
    });
    if NPM_NAME_RE.is_match(name) && version_ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidPackage(spec.to_string()))
    }
}

/// Validates the certificate contact address.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEmail`].
pub fn validate_email(email: &str) -> Result<(), ConfigError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ConfigError::InvalidEmail(email.to_string()))
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
