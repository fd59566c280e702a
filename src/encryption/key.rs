//! File key derivation.
//!
//! A [`FileKey`] only exists after a password validated against /U or /O,
//! so nothing downstream can decrypt with an unchecked key.

use super::algorithms::{self, LegacyParams};
use super::algorithms_r5;
use super::rc4::Rc4Backend;
use super::{EncryptionInfo, PasswordData};
use crate::error::{Error, Result};

/// A validated file encryption key.
#[derive(Clone, PartialEq, Eq)]
pub struct FileKey {
    bytes: Vec<u8>,
}

impl FileKey {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Key length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the key is empty (never true for a derived key).
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for FileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKey")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// Which password validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRole {
    /// Matched /U
    User,
    /// Matched /O
    Owner,
}

/// Outcome of the /Perms check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermsStatus {
    /// Revisions 2-4 have no /Perms entry
    NotApplicable,
    /// Decrypted /Perms agrees with /P and /EncryptMetadata
    Valid,
    /// Decrypted /Perms disagrees; the message says how
    Mismatch(String),
}

/// The dictionary entries a key was validated against.
#[derive(Clone, PartialEq, Eq)]
struct KeyOrigin {
    revision: u32,
    owner: Vec<u8>,
    user: Vec<u8>,
    file_id: Vec<u8>,
}

impl KeyOrigin {
    fn of(info: &EncryptionInfo) -> Self {
        Self {
            revision: info.revision(),
            owner: info.o().to_vec(),
            user: info.u().to_vec(),
            file_id: info.file_id().to_vec(),
        }
    }
}

/// Result of a successful derivation.
///
/// Remembers the dictionary it was derived from; see
/// [`DerivedKey::belongs_to`].
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey {
    key: FileKey,
    role: PasswordRole,
    perms: PermsStatus,
    origin: KeyOrigin,
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &self.key)
            .field("role", &self.role)
            .field("perms", &self.perms)
            .field("revision", &self.origin.revision)
            .finish_non_exhaustive()
    }
}

impl DerivedKey {
    fn new(info: &EncryptionInfo, key: Vec<u8>, role: PasswordRole, perms: PermsStatus) -> Self {
        Self {
            key: FileKey::new(key),
            role,
            perms,
            origin: KeyOrigin::of(info),
        }
    }

    /// Whether this key was derived from `info` (same revision, /O, /U and
    /// file ID).
    pub fn belongs_to(&self, info: &EncryptionInfo) -> bool {
        self.origin == KeyOrigin::of(info)
    }

    /// The file key.
    pub fn key(&self) -> &FileKey {
        &self.key
    }

    /// The role of the password that validated.
    pub fn role(&self) -> PasswordRole {
        self.role
    }

    /// The /Perms check outcome.
    pub fn perms(&self) -> &PermsStatus {
        &self.perms
    }

    /// Consume into the file key.
    pub fn into_key(self) -> FileKey {
        self.key
    }
}

/// Validates passwords and derives the file key.
#[derive(Debug, Clone, Copy)]
pub struct FileKeyDeriver {
    backend: Rc4Backend,
}

impl Default for FileKeyDeriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FileKeyDeriver {
    /// Create a deriver, probing for the native RC4 backend.
    pub fn new() -> Self {
        Self::with_backend(Rc4Backend::detect())
    }

    /// Create a deriver with an explicit RC4 backend.
    pub fn with_backend(backend: Rc4Backend) -> Self {
        Self { backend }
    }

    /// The RC4 backend in use.
    pub fn backend(&self) -> Rc4Backend {
        self.backend
    }

    /// Validate `password` as the user password, then as the owner password.
    ///
    /// Fails with [`Error::InvalidPassword`] when neither matches.
    pub fn derive(&self, info: &EncryptionInfo, password: &[u8]) -> Result<DerivedKey> {
        let derived = match info.passwords() {
            PasswordData::Legacy { owner, user } => {
                let params = LegacyParams {
                    revision: info.revision(),
                    key_length: info.key_length_bytes(),
                    owner_key: owner,
                    user_key: user,
                    permissions: info.p(),
                    file_id: info.file_id(),
                    encrypt_metadata: info.encrypt_metadata(),
                };
                self.derive_legacy(&params, password)?.map(|(key, role)| {
                    DerivedKey::new(info, key, role, PermsStatus::NotApplicable)
                })
            },
            PasswordData::Aes256 {
                owner,
                user,
                owner_key,
                user_key,
                perms,
            } => {
                let revision = info.revision();
                // A hash match only proves the password; the key unwrapped
                // from /UE or /OE must still decrypt /Perms to the marker.
                let unwrapped = |key: [u8; 32], role: PasswordRole| -> Result<Option<DerivedKey>> {
                    let status = algorithms_r5::validate_perms(
                        &key,
                        perms,
                        info.p(),
                        info.encrypt_metadata(),
                    )?;
                    if status.is_none() {
                        log::debug!("{:?} password matched but /Perms rejects its key", role);
                    }
                    Ok(status.map(|status| DerivedKey::new(info, key.to_vec(), role, status)))
                };

                let mut found = None;
                if let Some(key) =
                    algorithms_r5::authenticate_user(revision, password, user, user_key)?
                {
                    found = unwrapped(key, PasswordRole::User)?;
                }
                if found.is_none() {
                    if let Some(key) = algorithms_r5::authenticate_owner(
                        revision, password, owner, user, owner_key,
                    )? {
                        found = unwrapped(key, PasswordRole::Owner)?;
                    }
                }
                found
            },
        };

        match derived {
            Some(derived) => {
                log::info!("Successfully authenticated with {:?} password", derived.role);
                Ok(derived)
            },
            None => {
                log::warn!("Password authentication failed (R={})", info.revision());
                Err(Error::InvalidPassword)
            },
        }
    }

    fn derive_legacy(
        &self,
        params: &LegacyParams<'_>,
        password: &[u8],
    ) -> Result<Option<(Vec<u8>, PasswordRole)>> {
        Ok(
            match algorithms::authenticate_user_password(self.backend, password, params)? {
                Some(key) => Some((key, PasswordRole::User)),
                None => algorithms::authenticate_owner_password(self.backend, password, params)?
                    .map(|key| (key, PasswordRole::Owner)),
            },
        )
    }

    /// Try the empty password first, then `password` if one is given.
    ///
    /// Most encrypted documents only carry an owner password, so the empty
    /// user password opens them.
    pub fn derive_with_fallback(
        &self,
        info: &EncryptionInfo,
        password: Option<&[u8]>,
    ) -> Result<DerivedKey> {
        match self.derive(info, b"") {
            Ok(derived) => Ok(derived),
            Err(Error::InvalidPassword) => match password {
                Some(password) if !password.is_empty() => self.derive(info, password),
                _ => Err(Error::InvalidPassword),
            },
            Err(e) => Err(e),
        }
    }
}
