//! Encryption handler for PDF documents.
//!
//! This module provides the main interface for decrypting an encrypted
//! PDF: it validates a password once, then decrypts strings and streams
//! object by object.

use super::aes::{aes_cbc_decrypt, AesCbcStream};
use super::algorithms;
use super::key::{DerivedKey, FileKey, FileKeyDeriver, PasswordRole, PermsStatus};
use super::rc4::{rc4_crypt, CipherMode, Rc4Backend, Rc4Context};
use super::{CryptFilterMethod, EncryptionInfo, Permissions};
use crate::config::{DecryptOptions, PermsCheck};
use crate::error::{Error, Result};

/// Which crypt filter applies to a piece of data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// String objects (/StrF)
    String,
    /// Stream data (/StmF)
    Stream,
}

/// Main encryption handler for PDF documents.
///
/// Built only from a validated key, so every decryption it performs uses a
/// key that matched /U or /O. Immutable after construction; distinct
/// objects can be decrypted from several threads at once.
#[derive(Debug, Clone)]
pub struct EncryptionHandler {
    /// Normalized encryption dictionary
    info: EncryptionInfo,
    /// Validated file key
    key: DerivedKey,
    /// RC4 backend chosen at open time
    backend: Rc4Backend,
    /// Options in effect
    options: DecryptOptions,
}

impl EncryptionHandler {
    /// Open with the default (lenient) options.
    ///
    /// The empty password is tried first, then `password` if given.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPassword`] if neither password validates.
    pub fn open(info: EncryptionInfo, password: Option<&[u8]>) -> Result<Self> {
        Self::open_with_options(info, password, DecryptOptions::default())
    }

    /// Open with explicit options.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPassword`] if neither password validates, or
    /// [`Error::IntegrityCheckFailed`] if /Perms disagrees under
    /// [`PermsCheck::Enforce`].
    pub fn open_with_options(
        info: EncryptionInfo,
        password: Option<&[u8]>,
        options: DecryptOptions,
    ) -> Result<Self> {
        log::info!(
            "PDF is encrypted with {:?} (V={}, R={}, {} bits)",
            info.crypt_filter_method(),
            info.version(),
            info.revision(),
            info.key_length_bits()
        );

        let backend = Rc4Backend::from_preference(options.rc4_backend);
        let key = FileKeyDeriver::with_backend(backend).derive_with_fallback(&info, password)?;
        Self::assemble(info, key, options, backend)
    }

    /// Build a handler from a key the deriver already validated.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPassword`] if `key` was derived from a different
    /// dictionary than `info`.
    pub fn from_derived_key(
        info: EncryptionInfo,
        key: DerivedKey,
        options: DecryptOptions,
    ) -> Result<Self> {
        if !key.belongs_to(&info) {
            log::warn!("Derived key does not belong to this encryption dictionary");
            return Err(Error::InvalidPassword);
        }
        let backend = Rc4Backend::from_preference(options.rc4_backend);
        Self::assemble(info, key, options, backend)
    }

    fn assemble(
        info: EncryptionInfo,
        key: DerivedKey,
        options: DecryptOptions,
        backend: Rc4Backend,
    ) -> Result<Self> {
        if let PermsStatus::Mismatch(reason) = key.perms() {
            match options.perms_check {
                PermsCheck::Ignore => log::debug!("Ignoring /Perms mismatch: {}", reason),
                PermsCheck::Warn => log::warn!("/Perms integrity check failed: {}", reason),
                PermsCheck::Enforce => return Err(Error::IntegrityCheckFailed(reason.clone())),
            }
        }

        Ok(Self {
            info,
            key,
            backend,
            options,
        })
    }

    /// The normalized encryption dictionary.
    pub fn info(&self) -> &EncryptionInfo {
        &self.info
    }

    /// The validated file key.
    pub fn file_key(&self) -> &FileKey {
        self.key.key()
    }

    /// Which password opened the document.
    pub fn role(&self) -> PasswordRole {
        self.key.role()
    }

    /// The /Perms check outcome.
    pub fn perms_status(&self) -> &PermsStatus {
        self.key.perms()
    }

    /// Get the permissions.
    pub fn permissions(&self) -> Permissions {
        self.info.permissions()
    }

    /// The RC4 backend in use.
    pub fn backend(&self) -> Rc4Backend {
        self.backend
    }

    /// Options in effect.
    pub fn options(&self) -> &DecryptOptions {
        &self.options
    }

    fn method(&self, kind: ObjectKind) -> CryptFilterMethod {
        match kind {
            ObjectKind::String => self.info.string_filter_method(),
            ObjectKind::Stream => self.info.crypt_filter_method(),
        }
    }

    /// Key for one object: the file key itself for R>=5, else Algorithm 1.
    fn cipher_key(&self, method: CryptFilterMethod, obj_num: u32, gen_num: u32) -> Vec<u8> {
        let file_key = self.key.key().as_bytes();
        if self.info.revision() >= 5 {
            return file_key.to_vec();
        }
        let aes = method == CryptFilterMethod::AesV2;
        algorithms::compute_object_key(file_key, obj_num, gen_num, aes)
    }

    /// Decrypt a stream using the stream crypt filter.
    ///
    /// PDF Spec: Section 7.6.2 - General Encryption Algorithm
    ///
    /// # Arguments
    ///
    /// * `data` - The encrypted stream data
    /// * `obj_num` - Object number
    /// * `gen_num` - Generation number
    pub fn decrypt_stream(&self, data: &[u8], obj_num: u32, gen_num: u32) -> Result<Vec<u8>> {
        self.decrypt_object(data, obj_num, gen_num, ObjectKind::Stream)
    }

    /// Decrypt a string using the string crypt filter.
    pub fn decrypt_string(&self, data: &[u8], obj_num: u32, gen_num: u32) -> Result<Vec<u8>> {
        self.decrypt_object(data, obj_num, gen_num, ObjectKind::String)
    }

    /// Decrypt object data; same as [`Self::decrypt_stream`].
    pub fn decrypt(&self, data: &[u8], obj_num: u32, gen_num: u32) -> Result<Vec<u8>> {
        self.decrypt_stream(data, obj_num, gen_num)
    }

    /// Decrypt one string or stream in a single call.
    pub fn decrypt_object(
        &self,
        data: &[u8],
        obj_num: u32,
        gen_num: u32,
        kind: ObjectKind,
    ) -> Result<Vec<u8>> {
        let method = self.method(kind);
        if method == CryptFilterMethod::Identity || data.is_empty() {
            return Ok(data.to_vec());
        }

        let key = self.cipher_key(method, obj_num, gen_num);
        if method.is_aes() {
            aes_cbc_decrypt(&key, data, self.options.strict_padding)
        } else {
            rc4_crypt(self.backend, &key, data)
        }
    }

    /// Start an incremental decryption of one stream's data.
    pub fn stream_decryptor(&self, obj_num: u32, gen_num: u32) -> Result<StreamDecryptor> {
        self.object_decryptor(obj_num, gen_num, ObjectKind::Stream)
    }

    /// Start an incremental decryption of one object under either filter.
    pub fn object_decryptor(
        &self,
        obj_num: u32,
        gen_num: u32,
        kind: ObjectKind,
    ) -> Result<StreamDecryptor> {
        let method = self.method(kind);
        let key = self.cipher_key(method, obj_num, gen_num);

        Ok(if method == CryptFilterMethod::Identity {
            StreamDecryptor::Identity
        } else if method.is_aes() {
            StreamDecryptor::Aes(AesCbcStream::new(&key, self.options.strict_padding)?)
        } else {
            StreamDecryptor::Rc4(Rc4Context::new(self.backend, &key, CipherMode::Continuous)?)
        })
    }
}

/// Incremental decryptor for one object's data.
///
/// Feed ciphertext in order with [`StreamDecryptor::update`], then call
/// [`StreamDecryptor::finish`]. The concatenated output equals a single
/// [`EncryptionHandler::decrypt_object`] call over the whole input.
pub enum StreamDecryptor {
    /// Pass-through
    Identity,
    /// Continuous-mode RC4
    Rc4(Rc4Context),
    /// Block-buffering AES-CBC
    Aes(AesCbcStream),
}

impl std::fmt::Debug for StreamDecryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamDecryptor::Identity => f.write_str("StreamDecryptor::Identity"),
            StreamDecryptor::Rc4(ctx) => f.debug_tuple("StreamDecryptor::Rc4").field(ctx).finish(),
            StreamDecryptor::Aes(_) => f.write_str("StreamDecryptor::Aes"),
        }
    }
}

impl StreamDecryptor {
    /// Feed the next chunk of ciphertext.
    pub fn update(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        match self {
            StreamDecryptor::Identity => Ok(chunk.to_vec()),
            StreamDecryptor::Rc4(ctx) => Ok(ctx.decrypt(chunk)),
            StreamDecryptor::Aes(stream) => stream.update(chunk),
        }
    }

    /// Flush what is left (the final AES block, unpadded).
    pub fn finish(self) -> Result<Vec<u8>> {
        match self {
            StreamDecryptor::Identity | StreamDecryptor::Rc4(_) => Ok(Vec::new()),
            StreamDecryptor::Aes(stream) => stream.finish(),
        }
    }
}
