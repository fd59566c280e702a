// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF Crypt
//!
//! Decryption for PDF documents protected by the Standard Security Handler.
//!
//! ## Core Features
//!
//! - **All standard revisions**: R2-R4 (RC4 and AES-128, MD5 key derivation)
//!   and R5-R6 (AES-256, SHA-2 key derivation)
//! - **User and owner passwords**: the empty password is tried first, owner
//!   passwords recover the user password (Algorithm 7)
//! - **Crypt filters**: V4/V5 `/StmF` and `/StrF` with `V2`, `AESV2`,
//!   `AESV3` and `Identity`
//! - **Streaming**: chunked decryption of large streams with the same output
//!   as a single call
//! - **Validate before use**: no decryption is possible without a key that
//!   matched /U or /O
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_crypt::{EncryptionHandler, EncryptionInfo};
//!
//! # fn main() -> pdf_crypt::Result<()> {
//! // `encrypt_dict` and `id` come from the document trailer
//! let info = EncryptionInfo::parse(&encrypt_dict, &id)?;
//! let handler = EncryptionHandler::open(info, Some(b"secret"))?;
//!
//! let plain = handler.decrypt_string(&ciphertext, 12, 0)?;
//! # Ok(())
//! # }
//! ```
//!
//! PDF Spec: ISO 32000-1:2008 Section 7.6, ISO 32000-2:2020 Section 7.6

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Dictionary tokens handed over by the document parser
pub mod token;

// Decryption options
pub mod config;

// Key derivation and ciphers
pub mod encryption;

pub use config::{DecryptOptions, PermsCheck, Rc4Preference};
pub use encryption::{
    CryptFilterMethod, DerivedKey, EncryptionHandler, EncryptionInfo, FileKey, FileKeyDeriver,
    ObjectKind, PasswordRole, Permissions, PermsStatus, StreamDecryptor,
};
pub use error::{Error, Result};
pub use token::{Token, TokenKind};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.starts_with("0."));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "pdf_crypt");
    }
}
