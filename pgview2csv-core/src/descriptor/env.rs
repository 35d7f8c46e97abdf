//! Descriptor construction from `PG*` environment variables.

use super::{ConnectionDescriptor, parse_port};
use crate::security::Password;

/// Server host variable.
pub const PG_HOST: &str = "PGHOST";
/// Login role variable.
pub const PG_USER: &str = "PGUSER";
/// Server port variable.
pub const PG_PORT: &str = "PGPORT";
/// Database name variable.
pub const PG_DATABASE: &str = "PGDATABASE";
/// Password variable.
pub const PG_PASSWORD: &str = "PGPASSWORD";

/// Builds a descriptor from an environment-style mapping.
///
/// Only `PGHOST`, `PGUSER`, `PGPORT`, `PGDATABASE` and `PGPASSWORD` are
/// read (exact, case-sensitive names); every other key is ignored. An entry
/// that is missing or blank after trimming leaves its field unset. Host,
/// user, database and port are stored trimmed; the password is kept as given.
///
/// # Errors
/// Returns a configuration error when `PGPORT` is not a valid port number.
///
/// # Example
/// ```rust
/// use pgview2csv_core::descriptor::from_env_mapping;
///
/// let descriptor = from_env_mapping([("PGHOST", "localhost"), ("PGPORT", "5433")])?;
/// assert_eq!(descriptor.host.as_deref(), Some("localhost"));
/// assert_eq!(descriptor.port, Some(5433));
/// assert!(descriptor.username.is_none());
/// # Ok::<(), pgview2csv_core::ExportError>(())
/// ```
pub fn from_env_mapping<I, K, V>(mapping: I) -> crate::Result<ConnectionDescriptor>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut descriptor = ConnectionDescriptor::new();

    for (key, value) in mapping {
        let raw = value.as_ref();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        match key.as_ref() {
            PG_HOST => descriptor.host = Some(trimmed.to_string()),
            PG_USER => descriptor.username = Some(trimmed.to_string()),
            PG_PORT => {
                let port = parse_port(trimmed).map_err(|e| {
                    tracing::error!("{} is not a valid port number", PG_PORT);
                    e
                })?;
                descriptor.port = Some(port);
            }
            PG_DATABASE => descriptor.database = Some(trimmed.to_string()),
            PG_PASSWORD => descriptor.password = Some(Password::new(raw)),
            _ => {}
        }
    }

    Ok(descriptor)
}

/// Builds a descriptor from the current process environment.
///
/// Variables whose name or value is not valid Unicode are skipped.
///
/// # Errors
/// Same as [`from_env_mapping`].
pub fn from_process_env() -> crate::Result<ConnectionDescriptor> {
    from_env_mapping(std::env::vars_os().filter_map(|(key, value)| {
        Some((key.into_string().ok()?, value.into_string().ok()?))
    }))
}
