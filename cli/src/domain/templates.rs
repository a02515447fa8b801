//! Structured renderers for the files the provisioner writes.
//!
//! Values are substituted into typed fields rather than spliced into free
//! text. Operator-supplied strings are either validated up front (domain,
//! identifiers) or escaped here (environment values).

use std::fmt::Write as _;
use std::path::PathBuf;

use crate::domain::config::ProvisioningConfig;

/// PostgreSQL listens here after the engine step.
pub const DATABASE_HOST: &str = "localhost";
pub const DATABASE_PORT: u16 = 5432;

// ── Environment file ─────────────────────────────────────────────────────────

/// One `KEY="value"` line.
#[derive(Debug, Clone)]
pub struct EnvEntry {
    pub key: &'static str,
    pub value: String,
    /// Masked by [`EnvFile::render_redacted`].
    pub secret: bool,
}

/// `EnvironmentFile=` content for the application service.
#[derive(Debug, Clone)]
pub struct EnvFile {
    pub entries: Vec<EnvEntry>,
}

impl EnvFile {
    #[must_use]
    pub fn for_config(cfg: &ProvisioningConfig) -> Self {
        let plain = |key, value: String| EnvEntry {
            key,
            value,
            secret: false,
        };
        Self {
            entries: vec![
                plain("N8N_HOST", cfg.domain_name.clone()),
                plain("N8N_PORT", cfg.service_port.to_string()),
                plain("N8N_PROTOCOL", "https".to_string()),
                plain("WEBHOOK_URL", cfg.https_url()),
                plain("DB_TYPE", "postgresdb".to_string()),
                plain("DB_POSTGRESDB_HOST", DATABASE_HOST.to_string()),
                plain("DB_POSTGRESDB_PORT", DATABASE_PORT.to_string()),
                plain("DB_POSTGRESDB_DATABASE", cfg.database_name.clone()),
                plain("DB_POSTGRESDB_USER", cfg.database_user.clone()),
                EnvEntry {
                    key: "DB_POSTGRESDB_PASSWORD",
                    value: cfg.database_password.expose().to_string(),
                    secret: true,
                },
            ],
        }
    }

    /// Render with real values. The result contains secrets.
    #[must_use]
    pub fn render(&self) -> String {
        self.render_with(|e| e.value.clone())
    }

    /// Render with secret values replaced by `********`.
    #[must_use]
    pub fn render_redacted(&self) -> String {
        self.render_with(|e| {
            if e.secret {
                "********".to_string()
            } else {
                e.value.clone()
            }
        })
    }

    fn render_with(&self, value: impl Fn(&EnvEntry) -> String) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(out, "{}=\"{}\"", entry.key, escape_env_value(&value(entry)));
        }
        out
    }
}

/// Escape a value for a double-quoted systemd `EnvironmentFile` assignment.
///
/// Backslash, double quote and `$` are escaped; line breaks become `\n` so a
/// value can never start a new assignment.
#[must_use]
pub fn escape_env_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

// ── systemd unit ─────────────────────────────────────────────────────────────

/// Service-manager unit for the application.
#[derive(Debug, Clone)]
pub struct SystemdUnit {
    pub description: String,
    pub user: String,
    pub working_directory: PathBuf,
    pub environment_file: PathBuf,
    pub exec_start: String,
    pub restart_sec: u32,
    pub timeout_start_sec: u32,
    pub timeout_stop_sec: u32,
}

impl SystemdUnit {
    #[must_use]
    pub fn for_config(cfg: &ProvisioningConfig) -> Self {
        Self {
            description: format!("{} workflow automation", cfg.service_name()),
            user: cfg.target_user.clone(),
            working_directory: cfg.home_dir(),
            environment_file: cfg.env_file_path(),
            exec_start: format!("{} start", cfg.binary_path.display()),
            restart_sec: 10,
            timeout_start_sec: 60,
            timeout_stop_sec: 60,
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "[Unit]\n\
             Description={description}\n\
             After=network.target postgresql.service\n\
             Wants=postgresql.service\n\
             \n\
             [Service]\n\
             Type=simple\n\
             User={user}\n\
             Group={user}\n\
             WorkingDirectory={workdir}\n\
             EnvironmentFile={envfile}\n\
             ExecStart={exec}\n\
             Restart=on-failure\n\
             RestartSec={restart}\n\
             TimeoutStartSec={tstart}\n\
             TimeoutStopSec={tstop}\n\
             \n\
             [Install]\n\
             WantedBy=multi-user.target\n",
            description = self.description,
            user = self.user,
            workdir = self.working_directory.display(),
            envfile = self.environment_file.display(),
            exec = self.exec_start,
            restart = self.restart_sec,
            tstart = self.timeout_start_sec,
            tstop = self.timeout_stop_sec,
        )
    }
}

// ── nginx virtual host ───────────────────────────────────────────────────────

/// Reverse-proxy virtual host routing the domain to the local service.
#[derive(Debug, Clone)]
pub struct NginxSite {
    pub server_name: String,
    pub upstream_port: u16,
}

impl NginxSite {
    #[must_use]
    pub fn for_config(cfg: &ProvisioningConfig) -> Self {
        Self {
            server_name: cfg.domain_name.clone(),
            upstream_port: cfg.service_port,
        }
    }

    /// Backend address every path is forwarded to.
    #[must_use]
    pub fn upstream(&self) -> String {
        format!("http://localhost:{}", self.upstream_port)
    }

    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "server {{\n\
             \x20   listen 80;\n\
             \x20   listen [::]:80;\n\
             \x20   server_name {server};\n\
             \n\
             \x20   location / {{\n\
             \x20       proxy_pass {upstream};\n\
             \x20       proxy_http_version 1.1;\n\
             \x20       proxy_set_header Upgrade $http_upgrade;\n\
             \x20       proxy_set_header Connection \"upgrade\";\n\
             \x20       proxy_set_header Host $host;\n\
             \x20       proxy_set_header X-Real-IP $remote_addr;\n\
             \x20       proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;\n\
             \x20       proxy_set_header X-Forwarded-Proto $scheme;\n\
             \x20       proxy_buffering off;\n\
             \x20       proxy_cache off;\n\
             \x20       proxy_read_timeout 3600s;\n\
             \x20       chunked_transfer_encoding off;\n\
             \x20   }}\n\
             }}\n",
            server = self.server_name,
            upstream = self.upstream(),
        )
    }
}

// ── Preview ──────────────────────────────────────────────────────────────────

/// A file the provisioner writes, rendered for display.
#[derive(Debug, Clone)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub content: String,
}

/// The three files a run writes, in step order, with secrets masked.
#[must_use]
pub fn preview(cfg: &ProvisioningConfig) -> Vec<RenderedFile> {
    vec![
        RenderedFile {
            path: cfg.env_file_path(),
            content: EnvFile::for_config(cfg).render_redacted(),
        },
        RenderedFile {
            path: cfg.unit_path(),
            content: SystemdUnit::for_config(cfg).render(),
        },
        RenderedFile {
            path: cfg.site_available_path(),
            content: NginxSite::for_config(cfg).render(),
        },
    ]
}
