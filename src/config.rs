//! Decryption options for controlling strict/lenient behavior.
//!
//! # Example
//!
//! ```
//! use pdf_crypt::config::{DecryptOptions, PermsCheck};
//!
//! // Strict mode - fail on any integrity or padding problem
//! let strict = DecryptOptions::strict();
//!
//! // Lenient mode - recover where the plaintext is still usable (default)
//! let lenient = DecryptOptions::lenient();
//!
//! // Custom configuration
//! let custom = DecryptOptions::default().with_perms_check(PermsCheck::Ignore);
//! assert!(!custom.strict_padding);
//! ```

use serde::{Deserialize, Serialize};

/// Which RC4 implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rc4Preference {
    /// Probe the native primitive once, fall back to the computed one
    #[default]
    Auto,
    /// Use the native primitive (still falls back if it is not compiled in)
    Native,
    /// Always use the computed implementation
    Computed,
}

/// How to treat the /Perms check for revision 5 and later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermsCheck {
    /// Skip the check
    Ignore,
    /// Run the check and log a mismatch
    #[default]
    Warn,
    /// A mismatch fails with `Error::IntegrityCheckFailed`
    Enforce,
}

/// Options for opening an encrypted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecryptOptions {
    /// RC4 backend selection
    pub rc4_backend: Rc4Preference,

    /// /Perms handling for R5/R6
    ///
    /// The check runs only after the password validated and never decides
    /// whether a password is accepted.
    pub perms_check: PermsCheck,

    /// Reject AES data with a misaligned body or invalid PKCS#7 padding
    ///
    /// When false, a trailing partial block is dropped and bad padding is
    /// left in place, with a warning.
    pub strict_padding: bool,
}

impl Default for DecryptOptions {
    /// Default configuration: lenient mode
    fn default() -> Self {
        Self::lenient()
    }
}

impl DecryptOptions {
    /// Strict mode: fail on any integrity or padding problem
    pub fn strict() -> Self {
        Self {
            rc4_backend: Rc4Preference::Auto,
            perms_check: PermsCheck::Enforce,
            strict_padding: true,
        }
    }

    /// Lenient mode: recover where the plaintext is still usable
    pub fn lenient() -> Self {
        Self {
            rc4_backend: Rc4Preference::Auto,
            perms_check: PermsCheck::Warn,
            strict_padding: false,
        }
    }

    /// Set the RC4 backend preference.
    pub fn with_rc4_backend(mut self, preference: Rc4Preference) -> Self {
        self.rc4_backend = preference;
        self
    }

    /// Set the /Perms handling.
    pub fn with_perms_check(mut self, check: PermsCheck) -> Self {
        self.perms_check = check;
        self
    }

    /// Enable or disable strict AES padding.
    pub fn with_strict_padding(mut self, strict: bool) -> Self {
        self.strict_padding = strict;
        self
    }
}
