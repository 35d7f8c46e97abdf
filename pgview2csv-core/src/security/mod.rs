//! Credential protection for connection handling.
//!
//! # Security Guarantees
//! - Passwords are stored in `Zeroizing` containers and masked in `Debug`
//! - Connection strings are redacted before they reach logs or errors
//! - Redaction removes fields; it never rewrites or hashes them
//!
//! # Module Structure
//! - `credentials`: zeroizing `Password` container
//! - `redaction`: password-free rendering of descriptors and strings

mod credentials;
mod redaction;

pub use credentials::Password;
pub use redaction::{REDACTED_MARKER, redact, redact_connection_string};
