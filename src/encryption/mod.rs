//! PDF encryption support.
//!
//! This module implements PDF decryption according to the PDF specification
//! (ISO 32000-1:2008, Section 7.6 and ISO 32000-2:2020 for revision 6). It supports:
//!
//! - RC4 encryption (40-bit to 128-bit) for PDF 1.4-1.5
//! - AES encryption (128-bit and 256-bit) for PDF 1.6+
//! - Standard Security Handler (password validation, permissions)
//!
//! # Key Derivation Families
//!
//! ## Revisions 2-4
//! - MD5 hash chain over the padded password, /O, /P and the file ID (Algorithm 2)
//! - User password checked by re-encrypting the padding string (Algorithm 6)
//! - Owner password unwraps the user password from /O (Algorithm 7)
//!
//! ## Revisions 5-6
//! - SHA-256 (R5) or the iterated SHA-2/AES hash (R6, Algorithm 2.B)
//! - File key unwrapped from /UE or /OE with AES-256 (Algorithm 2.A)
//!
//! # Security Considerations
//!
//! - RC4-40 is cryptographically weak and should only be used for legacy documents
//! - Password validation uses constant-time comparison to prevent timing attacks
//! - A file key is only handed out after its password validated
//!
//! # References
//!
//! - PDF Spec Section 7.6: Encryption
//! - PDF Spec Section 7.6.3: Standard Security Handler
//! - PDF 2.0 Spec Section 7.6.4.3: Algorithms 2.A and 2.B

use crate::error::{Error, Result};
use crate::token::Token;

mod aes;
mod algorithms;
mod algorithms_r5;
mod handler;
mod key;
pub mod rc4;

pub use self::aes::AesCbcStream;
pub use handler::{EncryptionHandler, ObjectKind, StreamDecryptor};
pub use key::{DerivedKey, FileKey, FileKeyDeriver, PasswordRole, PermsStatus};
pub use rc4::{CipherMode, Rc4Backend, Rc4Context};

/// Crypt filter method applied to strings or streams.
///
/// PDF Spec: Table 25 - Entries common to all crypt filter dictionaries (CFM)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptFilterMethod {
    /// RC4 (/V2, or V=1/2 documents without crypt filters)
    Rc4,
    /// AES-128 in CBC mode (/AESV2)
    AesV2,
    /// AES-256 in CBC mode (/AESV3)
    AesV3,
    /// No encryption
    Identity,
}

impl CryptFilterMethod {
    /// Check if this is an AES method.
    pub fn is_aes(&self) -> bool {
        matches!(self, CryptFilterMethod::AesV2 | CryptFilterMethod::AesV3)
    }
}

bitflags::bitflags! {
    /// PDF encryption permissions (P field).
    ///
    /// PDF Spec: Table 22 - User access permissions
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u32 {
        /// Print the document (bit 3)
        const PRINT = 1 << 2;
        /// Modify the contents (bit 4)
        const MODIFY = 1 << 3;
        /// Copy or extract text and graphics (bit 5)
        const COPY = 1 << 4;
        /// Add or modify annotations (bit 6)
        const ANNOTATE = 1 << 5;
        /// Fill in form fields (bit 9, R>=3)
        const FILL_FORMS = 1 << 8;
        /// Extract for accessibility (bit 10, R>=3)
        const EXTRACT_ACCESSIBILITY = 1 << 9;
        /// Assemble the document (bit 11, R>=3)
        const ASSEMBLE = 1 << 10;
        /// Faithful high-quality print (bit 12, R>=3)
        const PRINT_HIGH_QUALITY = 1 << 11;

        const _ = !0;
    }
}

impl Permissions {
    /// Create permissions from the P field value.
    pub fn from_p(p: i32) -> Self {
        Self::from_bits_retain(p as u32)
    }

    /// Check if printing is allowed.
    pub fn can_print(&self) -> bool {
        self.contains(Permissions::PRINT)
    }

    /// Check if modifying the document is allowed.
    pub fn can_modify(&self) -> bool {
        self.contains(Permissions::MODIFY)
    }

    /// Check if copying text/graphics is allowed.
    pub fn can_copy(&self) -> bool {
        self.contains(Permissions::COPY)
    }

    /// Check if adding/modifying annotations is allowed.
    pub fn can_annotate(&self) -> bool {
        self.contains(Permissions::ANNOTATE)
    }

    /// Check if filling form fields is allowed (R>=3).
    pub fn can_fill_forms(&self) -> bool {
        self.contains(Permissions::FILL_FORMS)
    }

    /// Check if content extraction for accessibility is allowed (R>=3).
    pub fn can_extract_accessibility(&self) -> bool {
        self.contains(Permissions::EXTRACT_ACCESSIBILITY)
    }

    /// Check if assembling the document is allowed (R>=3).
    pub fn can_assemble(&self) -> bool {
        self.contains(Permissions::ASSEMBLE)
    }

    /// Check if high-quality printing is allowed (R>=3).
    pub fn can_print_high_quality(&self) -> bool {
        self.contains(Permissions::PRINT_HIGH_QUALITY)
    }
}

/// One 48-byte /O or /U entry of revision 5 and later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedPassword {
    raw: [u8; 48],
}

impl HashedPassword {
    fn from_slice(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; 48] = bytes.try_into().ok()?;
        Some(Self { raw })
    }

    /// The 32-byte password hash.
    pub fn hash(&self) -> &[u8] {
        &self.raw[..32]
    }

    /// The 8-byte validation salt.
    pub fn validation_salt(&self) -> &[u8] {
        &self.raw[32..40]
    }

    /// The 8-byte key salt.
    pub fn key_salt(&self) -> &[u8] {
        &self.raw[40..48]
    }

    /// The full 48-byte entry.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// Password verification data, by revision family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordData {
    /// Revisions 2-4: 32-byte /O and /U
    Legacy {
        /// /O entry
        owner: [u8; 32],
        /// /U entry
        user: [u8; 32],
    },
    /// Revisions 5-6: hashed passwords plus wrapped keys
    Aes256 {
        /// /O entry
        owner: HashedPassword,
        /// /U entry
        user: HashedPassword,
        /// /OE entry
        owner_key: [u8; 32],
        /// /UE entry
        user_key: [u8; 32],
        /// /Perms entry
        perms: [u8; 16],
    },
}

/// Normalized encryption dictionary (/Encrypt entry in trailer) plus file ID.
///
/// PDF Spec: Section 7.6.1 - General, Table 20 and Table 21
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionInfo {
    version: u32,
    revision: u32,
    key_length_bits: u32,
    permissions: i32,
    encrypt_metadata: bool,
    stream_filter: CryptFilterMethod,
    string_filter: CryptFilterMethod,
    passwords: PasswordData,
    file_id: Vec<u8>,
}

fn malformed(msg: impl Into<String>) -> Error {
    Error::MalformedEncryptionDictionary(msg.into())
}

/// Read an optional integer entry, rejecting any other token type.
fn integer_entry(dict: &Token, key: &str) -> Result<Option<i64>> {
    match dict.get(key) {
        None => Ok(None),
        Some(tok) => tok.as_integer().map(Some).ok_or_else(|| {
            malformed(format!(
                "/{} must be an integer, found {} at byte {}",
                key,
                tok.type_name(),
                tok.offset
            ))
        }),
    }
}

/// Read an optional string entry, rejecting any other token type.
fn string_entry(dict: &Token, key: &str) -> Result<Option<Vec<u8>>> {
    match dict.get(key) {
        None => Ok(None),
        Some(tok) => tok.as_bytes().map(Some).ok_or_else(|| {
            malformed(format!(
                "/{} must be a string, found {} at byte {}",
                key,
                tok.type_name(),
                tok.offset
            ))
        }),
    }
}

fn required<T>(value: Option<T>, key: &str) -> Result<T> {
    value.ok_or_else(|| malformed(format!("Encrypt dictionary missing /{}", key)))
}

fn fixed<const N: usize>(bytes: Vec<u8>, key: &str) -> Result<[u8; N]> {
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| malformed(format!("/{} must be {} bytes, got {}", key, N, len)))
}

impl EncryptionInfo {
    /// Normalize a raw encryption dictionary and the trailer /ID array.
    ///
    /// V=3 is an unpublished algorithm and is rejected as unsupported along
    /// with any V outside 1-5.
    ///
    /// # Arguments
    ///
    /// * `dict` - The /Encrypt dictionary token
    /// * `file_id` - Elements of the /ID array (may be empty)
    pub fn parse(dict: &Token, file_id: &[Token]) -> Result<Self> {
        if !dict.is_dictionary() {
            return Err(malformed(format!(
                "Encrypt entry is not a dictionary (found {})",
                dict.type_name()
            )));
        }

        let filter = required(dict.get("Filter"), "Filter")?;
        match filter.as_name() {
            Some("Standard") => {},
            Some(other) => {
                return Err(Error::UnsupportedEncryptionMethod(format!(
                    "Security handler /{} (only /Standard is supported)",
                    other
                )))
            },
            None => return Err(malformed("/Filter must be a name")),
        }

        let version = required(integer_entry(dict, "V")?, "V")?;
        let revision = required(integer_entry(dict, "R")?, "R")?;
        let length = integer_entry(dict, "Length")?;

        if !matches!(version, 1 | 2 | 4 | 5) {
            return Err(Error::UnsupportedEncryptionMethod(format!(
                "Unsupported encryption version V={}",
                version
            )));
        }
        if !(2..=6).contains(&revision) {
            return Err(Error::UnsupportedEncryptionMethod(format!(
                "Unsupported security handler revision R={}",
                revision
            )));
        }
        let (version, revision) = (version as u32, revision as u32);
        if (version == 5) != (revision >= 5) {
            return Err(malformed(format!(
                "V={} is inconsistent with R={}",
                version, revision
            )));
        }

        let key_length_bits = Self::key_length(version, revision, length)?;

        let p = required(integer_entry(dict, "P")?, "P")?;
        // Some writers store P as an unsigned 32-bit value
        let permissions = i32::try_from(p)
            .or_else(|_| u32::try_from(p).map(|p| p as i32))
            .map_err(|_| malformed(format!("/P out of 32-bit range: {}", p)))?;

        let encrypt_metadata = match dict.get("EncryptMetadata") {
            None => true,
            Some(tok) => tok
                .as_bool()
                .ok_or_else(|| malformed("/EncryptMetadata must be a boolean"))?,
        };

        let owner = required(string_entry(dict, "O")?, "O")?;
        let user = required(string_entry(dict, "U")?, "U")?;

        let passwords = if revision >= 5 {
            let owner = HashedPassword::from_slice(&owner)
                .ok_or_else(|| malformed(format!("/O must be 48 bytes, got {}", owner.len())))?;
            let user = HashedPassword::from_slice(&user)
                .ok_or_else(|| malformed(format!("/U must be 48 bytes, got {}", user.len())))?;
            PasswordData::Aes256 {
                owner,
                user,
                owner_key: fixed(required(string_entry(dict, "OE")?, "OE")?, "OE")?,
                user_key: fixed(required(string_entry(dict, "UE")?, "UE")?, "UE")?,
                perms: fixed(required(string_entry(dict, "Perms")?, "Perms")?, "Perms")?,
            }
        } else {
            PasswordData::Legacy {
                owner: fixed(owner, "O")?,
                user: fixed(user, "U")?,
            }
        };

        let (stream_filter, string_filter) = if version >= 4 {
            (
                Self::crypt_filter(dict, "StmF", revision)?,
                Self::crypt_filter(dict, "StrF", revision)?,
            )
        } else {
            (CryptFilterMethod::Rc4, CryptFilterMethod::Rc4)
        };

        let file_id = match file_id.first() {
            None => Vec::new(),
            Some(tok) => tok.as_bytes().ok_or_else(|| {
                malformed(format!("/ID element must be a string, found {}", tok.type_name()))
            })?,
        };

        log::debug!(
            "Encryption dictionary: V={}, R={}, {} bits, streams {:?}, strings {:?}",
            version,
            revision,
            key_length_bits,
            stream_filter,
            string_filter
        );

        Ok(Self {
            version,
            revision,
            key_length_bits,
            permissions,
            encrypt_metadata,
            stream_filter,
            string_filter,
            passwords,
            file_id,
        })
    }

    /// Effective key length in bits.
    fn key_length(version: u32, revision: u32, length: Option<i64>) -> Result<u32> {
        if let Some(bits) = length {
            if bits <= 0 || bits > 256 || bits % 8 != 0 {
                return Err(malformed(format!(
                    "/Length must be a positive multiple of 8 up to 256, got {}",
                    bits
                )));
            }
        }

        let bits = match (version, length) {
            _ if revision >= 5 => 256,
            (1, _) => 40,
            (_, Some(bits)) => bits as u32,
            (4, None) => 128,
            (_, None) => 40,
        };

        // The MD5 digest bounds the key for R<=4
        if revision <= 4 && !(40..=128).contains(&bits) {
            return Err(malformed(format!(
                "Key length {} bits not supported for R={}",
                bits, revision
            )));
        }

        Ok(bits)
    }

    /// Resolve /StmF or /StrF through the /CF dictionary.
    ///
    /// PDF Spec: Section 7.6.5 - Crypt Filters
    fn crypt_filter(dict: &Token, key: &str, revision: u32) -> Result<CryptFilterMethod> {
        let name = match dict.get(key) {
            None => return Ok(CryptFilterMethod::Identity),
            Some(tok) => tok
                .as_name()
                .ok_or_else(|| malformed(format!("/{} must be a name", key)))?,
        };
        if name == "Identity" {
            return Ok(CryptFilterMethod::Identity);
        }

        let filter = dict
            .get("CF")
            .and_then(|cf| cf.get(name))
            .filter(|f| f.is_dictionary())
            .ok_or_else(|| malformed(format!("Crypt filter /{} not found in /CF", name)))?;

        let method = match filter.get("CFM").map(|cfm| cfm.as_name()) {
            Some(Some("V2")) => CryptFilterMethod::Rc4,
            Some(Some("AESV2")) => CryptFilterMethod::AesV2,
            Some(Some("AESV3")) => CryptFilterMethod::AesV3,
            Some(Some(other)) => {
                return Err(Error::UnsupportedEncryptionMethod(format!(
                    "Crypt filter method /{}",
                    other
                )))
            },
            Some(None) => return Err(malformed("/CFM must be a name")),
            None => {
                return Err(Error::UnsupportedEncryptionMethod(format!(
                    "Crypt filter /{} has no /CFM",
                    name
                )))
            },
        };

        let allowed = if revision >= 5 {
            method == CryptFilterMethod::AesV3
        } else {
            method != CryptFilterMethod::AesV3
        };
        if !allowed {
            return Err(malformed(format!(
                "Crypt filter method {:?} cannot be used with R={}",
                method, revision
            )));
        }

        Ok(method)
    }

    /// Algorithm version (V).
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Security handler revision (R).
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Key length in bits.
    pub fn key_length_bits(&self) -> u32 {
        self.key_length_bits
    }

    /// Key length in bytes.
    pub fn key_length_bytes(&self) -> usize {
        (self.key_length_bits / 8) as usize
    }

    /// Raw /P value.
    pub fn p(&self) -> i32 {
        self.permissions
    }

    /// Typed permission flags.
    pub fn permissions(&self) -> Permissions {
        Permissions::from_p(self.permissions)
    }

    /// Whether metadata streams are encrypted.
    pub fn encrypt_metadata(&self) -> bool {
        self.encrypt_metadata
    }

    /// Crypt filter method for streams.
    pub fn crypt_filter_method(&self) -> CryptFilterMethod {
        self.stream_filter
    }

    /// Crypt filter method for strings.
    pub fn string_filter_method(&self) -> CryptFilterMethod {
        self.string_filter
    }

    /// Password verification data.
    pub fn passwords(&self) -> &PasswordData {
        &self.passwords
    }

    /// /O entry.
    pub fn o(&self) -> &[u8] {
        match &self.passwords {
            PasswordData::Legacy { owner, .. } => owner,
            PasswordData::Aes256 { owner, .. } => owner.as_bytes(),
        }
    }

    /// /U entry.
    pub fn u(&self) -> &[u8] {
        match &self.passwords {
            PasswordData::Legacy { user, .. } => user,
            PasswordData::Aes256 { user, .. } => user.as_bytes(),
        }
    }

    /// /OE entry (R>=5 only).
    pub fn oe(&self) -> Option<&[u8]> {
        match &self.passwords {
            PasswordData::Aes256 { owner_key, .. } => Some(&owner_key[..]),
            PasswordData::Legacy { .. } => None,
        }
    }

    /// /UE entry (R>=5 only).
    pub fn ue(&self) -> Option<&[u8]> {
        match &self.passwords {
            PasswordData::Aes256 { user_key, .. } => Some(&user_key[..]),
            PasswordData::Legacy { .. } => None,
        }
    }

    /// /Perms entry (R>=5 only).
    pub fn perms(&self) -> Option<&[u8]> {
        match &self.passwords {
            PasswordData::Aes256 { perms, .. } => Some(&perms[..]),
            PasswordData::Legacy { .. } => None,
        }
    }

    /// First element of the file identifier.
    pub fn file_id(&self) -> &[u8] {
        &self.file_id
    }
}
