//! Error types for the decryption subsystem.
//!
//! This module defines all error types that can occur while reading an
//! encryption dictionary, validating a password or decrypting object data.

/// Result type alias for decryption operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during PDF decryption.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Structural problem in the encryption dictionary (wrong types, missing
    /// fields for the declared revision, bad lengths).
    #[error("Malformed encryption dictionary: {0}")]
    MalformedEncryptionDictionary(String),

    /// Recognized but unimplemented security handler or crypt filter method
    #[error("Unsupported encryption method: {0}")]
    UnsupportedEncryptionMethod(String),

    /// No attempted password validated against either /O or /U
    #[error("Invalid password")]
    InvalidPassword,

    /// Secondary integrity check (/Perms) failed after the password validated
    #[error("Integrity check failed: {0}")]
    IntegrityCheckFailed(String),

    /// Cipher input rejected (key length, block alignment, padding)
    #[error("Cipher error: {0}")]
    Cipher(String),
}

impl Error {
    /// Whether the caller may retry with a different password.
    pub fn is_password_error(&self) -> bool {
        matches!(self, Error::InvalidPassword)
    }
}
