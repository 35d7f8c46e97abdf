//! Credential-free rendering of connection descriptors.
//!
//! Redaction only ever removes: the output is the regular connection
//! string with the password field (and any option naming a credential)
//! left out. Nothing in the output is derived from the password.

use crate::descriptor::{ConnectionDescriptor, connection_string_without, normalize_key};

/// Option keys that carry credentials and are dropped alongside the password.
const CREDENTIAL_OPTION_KEYS: &[&str] = &["password", "pwd", "psw", "passfile", "sslpassword"];

/// Marker returned when a connection string cannot be parsed for redaction.
pub const REDACTED_MARKER: &str = "<redacted>";

/// Renders a descriptor as a connection string without its password.
///
/// Intended for logs and console output only; the result cannot be used to
/// reconnect when the server requires a password.
///
/// # Example
///
/// ```rust
/// use pgview2csv_core::{ConnectionDescriptor, security::redact};
///
/// let descriptor = ConnectionDescriptor::new()
///     .with_host("localhost")
///     .with_username("admin")
///     .with_password("secret");
///
/// let safe = redact(&descriptor);
/// assert_eq!(safe, "Host=localhost;Username=admin");
/// assert!(!safe.contains("secret"));
/// ```
pub fn redact(descriptor: &ConnectionDescriptor) -> String {
    connection_string_without(descriptor, |key| {
        !CREDENTIAL_OPTION_KEYS.contains(&normalize_key(key).as_str())
    })
}

/// Parses a connection string and renders it without its password.
///
/// A string that does not parse is replaced by [`REDACTED_MARKER`] so it is
/// never echoed back.
///
/// # Example
///
/// ```rust
/// use pgview2csv_core::security::redact_connection_string;
///
/// assert_eq!(
///     redact_connection_string("Host=db;Password=secret;Database=app"),
///     "Host=db;Database=app"
/// );
/// assert_eq!(redact_connection_string("Password=\"open"), "<redacted>");
/// ```
pub fn redact_connection_string(connection_string: &str) -> String {
    match connection_string.parse::<ConnectionDescriptor>() {
        Ok(descriptor) => redact(&descriptor),
        Err(_) => REDACTED_MARKER.to_string(),
    }
}
