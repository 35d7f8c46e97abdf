//! `key=value;...` connection strings.
//!
//! Serialization writes the named fields in a fixed order (`Host`, `Port`,
//! `Username`, `Password`, `Database`, `Application Name`) followed by the
//! additional options in their original order. Values that would be
//! ambiguous unquoted are wrapped in double quotes with embedded quotes
//! doubled, so parsing the output always reconstructs the same descriptor.

use super::{ConnectionDescriptor, Field, parse_port};
use crate::ExportError;
use crate::security::Password;
use percent_encoding::percent_decode_str;

/// Serializes a descriptor into a `key=value;...` connection string.
///
/// Unset fields are omitted; an empty descriptor gives an empty string.
///
/// # Security
/// The output contains the password when one is set. Use
/// [`crate::security::redact`] for anything that is displayed or logged.
///
/// # Example
/// ```rust
/// use pgview2csv_core::{ConnectionDescriptor, descriptor::to_connection_string};
///
/// let descriptor = ConnectionDescriptor::new()
///     .with_host("localhost")
///     .with_port(5432)
///     .with_database("sales");
/// assert_eq!(
///     to_connection_string(&descriptor),
///     "Host=localhost;Port=5432;Database=sales"
/// );
/// ```
pub fn to_connection_string(descriptor: &ConnectionDescriptor) -> String {
    let password = descriptor
        .password
        .as_ref()
        .map(|p| p.expose_secret().to_string());
    render(descriptor, password.as_deref(), |_| true)
}

/// Serializes a descriptor without its password, keeping only the options
/// accepted by `keep_option`.
pub(crate) fn connection_string_without(
    descriptor: &ConnectionDescriptor,
    keep_option: impl Fn(&str) -> bool,
) -> String {
    render(descriptor, None, keep_option)
}

fn render(
    descriptor: &ConnectionDescriptor,
    password: Option<&str>,
    keep_option: impl Fn(&str) -> bool,
) -> String {
    let port = descriptor.port.map(|p| p.to_string());
    let named = [
        (Field::Host, descriptor.host.as_deref()),
        (Field::Port, port.as_deref()),
        (Field::Username, descriptor.username.as_deref()),
        (Field::Password, password),
        (Field::Database, descriptor.database.as_deref()),
        (Field::ApplicationName, descriptor.application_name.as_deref()),
    ];

    let mut pairs: Vec<String> = named
        .iter()
        .filter_map(|(field, value)| value.map(|v| format!("{}={}", field.key(), quote_value(v))))
        .collect();

    pairs.extend(
        descriptor
            .options()
            .iter()
            .filter(|(key, _)| keep_option(key))
            .map(|(key, value)| format!("{}={}", key, quote_value(value))),
    );

    pairs.join(";")
}

/// Quotes a value when it is empty, carries separator or quote characters,
/// or has surrounding whitespace.
fn quote_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.contains([';', '=', '"', '\''])
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace);

    if needs_quotes {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Parses a connection string into a descriptor.
///
/// Accepts the `key=value;...` form produced by [`to_connection_string`]
/// (keys are case-insensitive and the usual aliases such as `Server`,
/// `User Id` or `Pwd` are understood) as well as `postgres://` and
/// `postgresql://` URLs. Later duplicates of a key win.
///
/// # Errors
/// Returns a configuration error for a segment without `=`, an empty key,
/// an unterminated quoted value, an invalid port or a malformed URL. The
/// error message never includes the input text.
///
/// # Example
/// ```rust
/// use pgview2csv_core::descriptor::parse_connection_string;
///
/// let descriptor = parse_connection_string("Server=db;User Id=app;Pwd=x;Port=6432")?;
/// assert_eq!(descriptor.host.as_deref(), Some("db"));
/// assert_eq!(descriptor.username.as_deref(), Some("app"));
/// assert_eq!(descriptor.port, Some(6432));
/// # Ok::<(), pgview2csv_core::ExportError>(())
/// ```
pub fn parse_connection_string(text: &str) -> crate::Result<ConnectionDescriptor> {
    let trimmed = text.trim_start();
    if trimmed.starts_with("postgres://") || trimmed.starts_with("postgresql://") {
        return parse_url(trimmed.trim_end());
    }

    let mut descriptor = ConnectionDescriptor::new();
    for (key, value) in tokenize(text)? {
        descriptor.set_option(&key, value)?;
    }
    Ok(descriptor)
}

/// Splits `key=value;...` text into key/value pairs.
fn tokenize(text: &str) -> crate::Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    let mut chars = text.chars().peekable();

    loop {
        // Key
        let mut key = String::new();
        let mut saw_equals = false;
        for c in chars.by_ref() {
            match c {
                '=' => {
                    saw_equals = true;
                    break;
                }
                ';' => break,
                _ => key.push(c),
            }
        }

        if !saw_equals {
            // The segment text is not echoed: it may be a misplaced secret.
            if !key.trim().is_empty() {
                return Err(ExportError::configuration(format!(
                    "Connection string segment {} is missing '='",
                    pairs.len() + 1
                )));
            }
            if chars.peek().is_none() {
                break;
            }
            continue;
        }

        let key = key.trim().to_string();
        if key.is_empty() {
            return Err(ExportError::configuration(
                "Connection string contains an empty key",
            ));
        }

        // Value
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let value = match chars.peek().copied() {
            Some(quote @ ('"' | '\'')) => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    if c == quote {
                        if chars.next_if_eq(&quote).is_some() {
                            value.push(quote);
                        } else {
                            closed = true;
                            break;
                        }
                    } else {
                        value.push(c);
                    }
                }
                if !closed {
                    return Err(ExportError::configuration(format!(
                        "Unterminated quoted value for key '{}'",
                        key
                    )));
                }
                while chars.next_if(|c| c.is_whitespace()).is_some() {}
                match chars.next() {
                    None | Some(';') => {}
                    Some(_) => {
                        return Err(ExportError::configuration(format!(
                            "Unexpected characters after quoted value for key '{}'",
                            key
                        )));
                    }
                }
                value
            }
            _ => {
                let mut value = String::new();
                for c in chars.by_ref() {
                    if c == ';' {
                        break;
                    }
                    value.push(c);
                }
                value.trim().to_string()
            }
        };

        pairs.push((key, value));

        if chars.peek().is_none() {
            break;
        }
    }

    Ok(pairs)
}

/// Maps a `postgres://` URL onto descriptor fields.
fn parse_url(text: &str) -> crate::Result<ConnectionDescriptor> {
    let url = url::Url::parse(text).map_err(|e| {
        ExportError::configuration(format!("Invalid connection string format: {}", e))
    })?;

    let mut descriptor = ConnectionDescriptor::new();

    if let Some(host) = url.host_str().filter(|h| !h.is_empty()) {
        descriptor.host = Some(host.to_string());
    }
    descriptor.port = url.port();

    if !url.username().is_empty() {
        descriptor.username = Some(decode_component(url.username())?);
    }
    if let Some(password) = url.password() {
        descriptor.password = Some(Password::new(decode_component(password)?));
    }

    let database = url.path().trim_start_matches('/');
    if !database.is_empty() {
        descriptor.database = Some(decode_component(database)?);
    }

    for (key, value) in url.query_pairs() {
        if Field::from_key(&key) == Some(Field::Port) {
            descriptor.port = Some(parse_port(&value)?);
        } else {
            descriptor.set_option(&key, value.into_owned())?;
        }
    }

    Ok(descriptor)
}

fn decode_component(component: &str) -> crate::Result<String> {
    percent_decode_str(component)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ExportError::configuration("Connection URL contains invalid UTF-8"))
}
