//! PostgreSQL connection descriptors.
//!
//! A [`ConnectionDescriptor`] is the structured form of a connection
//! string. It can be built from the `PG*` environment variables, parsed from
//! a `key=value;...` string (or a `postgres://` URL) and serialized back.
//!
//! # Module Structure
//! - `env`: construction from an environment-style key/value mapping
//! - `connection_string`: `key=value;...` serialization and parsing

mod connection_string;
mod env;

use crate::security::Password;
use std::str::FromStr;

pub(crate) use connection_string::connection_string_without;
pub use connection_string::{parse_connection_string, to_connection_string};
pub use env::{
    PG_DATABASE, PG_HOST, PG_PASSWORD, PG_PORT, PG_USER, from_env_mapping, from_process_env,
};

/// Separator used by [`ConnectionDescriptor::append_application_name`] callers by default.
pub const DEFAULT_APPLICATION_NAME_SEPARATOR: &str = "_";

/// Structured PostgreSQL connection parameters.
///
/// Every field is optional; unset fields are left out of the serialized
/// form instead of being defaulted. The password is kept in a zeroizing
/// container and is masked in `Debug` output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Server host name or address
    pub host: Option<String>,
    /// Server port
    pub port: Option<u16>,
    /// Login role
    pub username: Option<String>,
    /// Login password
    pub password: Option<Password>,
    /// Database name
    pub database: Option<String>,
    /// Value reported as `application_name` by the server
    pub application_name: Option<String>,
    /// Additional `key=value` pairs, in the order they were given.
    /// Never holds one of the named fields above.
    options: Vec<(String, String)>,
}

/// Field addressed by a connection-string key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    Host,
    Port,
    Username,
    Password,
    Database,
    ApplicationName,
}

impl Field {
    /// Resolves a key, ignoring case, spaces and underscores.
    pub(crate) fn from_key(key: &str) -> Option<Self> {
        match normalize_key(key).as_str() {
            "host" | "server" => Some(Self::Host),
            "port" => Some(Self::Port),
            "username" | "user" | "userid" => Some(Self::Username),
            "password" | "pwd" | "psw" => Some(Self::Password),
            "database" | "db" | "dbname" => Some(Self::Database),
            "applicationname" => Some(Self::ApplicationName),
            _ => None,
        }
    }

    /// Canonical key written by [`to_connection_string`].
    pub(crate) const fn key(self) -> &'static str {
        match self {
            Self::Host => "Host",
            Self::Port => "Port",
            Self::Username => "Username",
            Self::Password => "Password",
            Self::Database => "Database",
            Self::ApplicationName => "Application Name",
        }
    }
}

/// Lowercases a key and strips spaces and underscores.
pub(crate) fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, ' ' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

impl ConnectionDescriptor {
    /// Creates an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Builder method to set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Builder method to set the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Builder method to set the password.
    pub fn with_password(mut self, password: impl Into<Password>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Builder method to set the database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Returns true when no field and no option is set.
    pub fn is_empty(&self) -> bool {
        self.host.is_none()
            && self.port.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.database.is_none()
            && self.application_name.is_none()
            && self.options.is_empty()
    }

    /// Additional options that are not one of the named fields.
    pub fn options(&self) -> &[(String, String)] {
        &self.options
    }

    /// Looks up an additional option, matching keys like the parser does.
    pub fn option(&self, key: &str) -> Option<&str> {
        let wanted = normalize_key(key);
        self.options
            .iter()
            .find(|(k, _)| normalize_key(k) == wanted)
            .map(|(_, v)| v.as_str())
    }

    /// Sets a value by connection-string key.
    ///
    /// Known keys (and their aliases) update the named field, anything else
    /// is stored as an additional option, replacing an earlier option with
    /// the same key.
    ///
    /// # Errors
    /// Returns a configuration error when the key is empty or a port value
    /// is not a valid port number.
    pub fn set_option(&mut self, key: &str, value: impl Into<String>) -> crate::Result<()> {
        let value = value.into();
        let key = key.trim();
        if key.is_empty() {
            return Err(crate::ExportError::configuration(
                "Connection string contains an empty key",
            ));
        }

        match Field::from_key(key) {
            Some(Field::Host) => self.host = Some(value),
            Some(Field::Port) => self.port = Some(parse_port(&value)?),
            Some(Field::Username) => self.username = Some(value),
            Some(Field::Password) => self.password = Some(Password::new(value)),
            Some(Field::Database) => self.database = Some(value),
            Some(Field::ApplicationName) => self.application_name = Some(value),
            None => {
                let wanted = normalize_key(key);
                match self
                    .options
                    .iter_mut()
                    .find(|(k, _)| normalize_key(k) == wanted)
                {
                    Some(existing) => existing.1 = value,
                    None => self.options.push((key.to_string(), value)),
                }
            }
        }

        Ok(())
    }

    /// Returns a copy with the application name replaced.
    pub fn set_application_name(&self, name: impl Into<String>) -> Self {
        let mut descriptor = self.clone();
        descriptor.application_name = Some(name.into());
        descriptor
    }

    /// Returns a copy with `suffix` appended to the application name.
    ///
    /// An unset or empty application name is simply replaced by `suffix`;
    /// otherwise the result is `existing + separator + suffix`. Calling this
    /// repeatedly keeps appending, there is no deduplication.
    ///
    /// # Example
    /// ```rust
    /// use pgview2csv_core::ConnectionDescriptor;
    ///
    /// let d = ConnectionDescriptor::new().append_application_name("etl", "_");
    /// assert_eq!(d.application_name.as_deref(), Some("etl"));
    ///
    /// let d = d.append_application_name("export", "_");
    /// assert_eq!(d.application_name.as_deref(), Some("etl_export"));
    /// ```
    pub fn append_application_name(&self, suffix: &str, separator: &str) -> Self {
        match self.application_name.as_deref() {
            Some(existing) if !existing.is_empty() => {
                self.set_application_name(format!("{}{}{}", existing, separator, suffix))
            }
            _ => self.set_application_name(suffix),
        }
    }
}

impl FromStr for ConnectionDescriptor {
    type Err = crate::ExportError;

    fn from_str(s: &str) -> crate::Result<Self> {
        parse_connection_string(s)
    }
}

impl std::fmt::Display for ConnectionDescriptor {
    /// Displays the redacted connection string.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::security::redact(self))
    }
}

/// Parses a port number, reporting failures as configuration errors.
pub(crate) fn parse_port(value: &str) -> crate::Result<u16> {
    value.trim().parse::<u16>().map_err(|e| {
        crate::ExportError::configuration(format!("Invalid port '{}': {}", value.trim(), e))
    })
}
