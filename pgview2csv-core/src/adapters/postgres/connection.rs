//! Mapping of connection descriptors onto sqlx connect options.
//!
//! # Security Features
//! - Every session starts with `default_transaction_read_only=on`
//! - The password is handed to the driver directly and never formatted

use crate::descriptor::{ConnectionDescriptor, normalize_key};
use crate::{ExportError, Result};
use sqlx::postgres::{PgConnectOptions, PgSslMode};

/// Builds driver connect options from a descriptor.
///
/// Fields left unset in the descriptor fall back to the driver defaults
/// (including the libpq environment variables sqlx reads itself). Of the
/// additional options only `SSL Mode` is understood; anything else is
/// logged and skipped.
///
/// # Errors
/// Returns a configuration error for an unknown SSL mode value.
pub(crate) fn connect_options(descriptor: &ConnectionDescriptor) -> Result<PgConnectOptions> {
    let mut options =
        PgConnectOptions::new().options([("default_transaction_read_only", "on")]);

    if let Some(host) = descriptor.host.as_deref() {
        options = options.host(host);
    }
    if let Some(port) = descriptor.port {
        options = options.port(port);
    }
    if let Some(username) = descriptor.username.as_deref() {
        options = options.username(username);
    }
    if let Some(password) = descriptor.password.as_ref() {
        options = options.password(password.expose_secret());
    }
    if let Some(database) = descriptor.database.as_deref() {
        options = options.database(database);
    }
    if let Some(application_name) = descriptor.application_name.as_deref() {
        options = options.application_name(application_name);
    }

    for (key, value) in descriptor.options() {
        match normalize_key(key).as_str() {
            "sslmode" => options = options.ssl_mode(parse_ssl_mode(value)?),
            _ => tracing::warn!("Ignoring unsupported connection option '{}'", key),
        }
    }

    Ok(options)
}

/// Parses an SSL mode in either libpq (`verify-full`) or .NET
/// (`VerifyFull`) spelling.
fn parse_ssl_mode(value: &str) -> Result<PgSslMode> {
    let normalized: String = value
        .trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .map(|c| c.to_ascii_lowercase())
        .collect();

    match normalized.as_str() {
        "disable" => Ok(PgSslMode::Disable),
        "allow" => Ok(PgSslMode::Allow),
        "prefer" => Ok(PgSslMode::Prefer),
        "require" => Ok(PgSslMode::Require),
        "verifyca" => Ok(PgSslMode::VerifyCa),
        "verifyfull" => Ok(PgSslMode::VerifyFull),
        _ => Err(ExportError::configuration(format!(
            "Unsupported SSL mode '{}'. Expected one of: disable, allow, prefer, require, verify-ca, verify-full",
            value
        ))),
    }
}
