//! SQL statements for the database bootstrap step.
//!
//! Statements are sent to `psql` on stdin, never as arguments, so the
//! role password does not show up in the process table.

use crate::domain::config::ProvisioningConfig;

/// Quote a PostgreSQL identifier: `"name"` with embedded quotes doubled.
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a PostgreSQL string literal: `'value'` with embedded quotes doubled.
///
/// Uses the standard-conforming form, so backslashes are literal.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `CREATE DATABASE "<name>";`
#[must_use]
pub fn create_database(cfg: &ProvisioningConfig) -> String {
    format!("CREATE DATABASE {};\n", quote_ident(&cfg.database_name))
}

/// `CREATE ROLE "<user>" WITH LOGIN PASSWORD '<password>';`
#[must_use]
pub fn create_role(cfg: &ProvisioningConfig) -> String {
    format!(
        "CREATE ROLE {} WITH LOGIN PASSWORD {};\n",
        quote_ident(&cfg.database_user),
        quote_literal(cfg.database_password.expose())
    )
}

/// `GRANT ALL PRIVILEGES ON DATABASE "<name>" TO "<user>";`
#[must_use]
pub fn grant_privileges(cfg: &ProvisioningConfig) -> String {
    format!(
        "GRANT ALL PRIVILEGES ON DATABASE {} TO {};\n",
        quote_ident(&cfg.database_name),
        quote_ident(&cfg.database_user)
    )
}

/// `GRANT CREATE ON SCHEMA public TO "<user>";`
///
/// PostgreSQL 15 and later no longer let every role create objects in
/// `public`, and the database-level grant does not cover schemas. This is
/// not part of the bootstrap; it is offered to the operator after a run.
#[must_use]
pub fn public_schema_grant(cfg: &ProvisioningConfig) -> String {
    format!(
        "GRANT CREATE ON SCHEMA public TO {};",
        quote_ident(&cfg.database_user)
    )
}

/// Shell command that applies [`public_schema_grant`] inside the
/// application database.
#[must_use]
pub fn public_schema_grant_command(cfg: &ProvisioningConfig) -> String {
    format!(
        "sudo -u postgres psql -d {} -c '{}'",
        cfg.database_name,
        public_schema_grant(cfg)
    )
}
