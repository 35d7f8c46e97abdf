//! Password container with automatic memory zeroing.
//!
//! # Security
//! - The secret lives in a `Zeroizing<String>` and is cleared on drop
//! - `Debug` never prints the secret, so descriptors can be logged with `{:?}`
//! - The only way to read the value is the explicit `expose_secret` call

use zeroize::Zeroizing;

/// Database password that zeroes its memory on drop.
///
/// # Example
///
/// ```rust
/// use pgview2csv_core::security::Password;
///
/// let password = Password::new("s3cret");
/// assert_eq!(password.expose_secret(), "s3cret");
/// assert_eq!(format!("{:?}", password), "Password(****)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Password(Zeroizing<String>);

impl Password {
    /// Wraps a password in a zeroizing container.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    /// Returns the plain password.
    ///
    /// Only connection setup and connection-string serialization call this.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Checks whether the password is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(****)")
    }
}

impl From<String> for Password {
    fn from(secret: String) -> Self {
        Self::new(secret)
    }
}

impl From<&str> for Password {
    fn from(secret: &str) -> Self {
        Self::new(secret)
    }
}
