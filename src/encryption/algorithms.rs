//! PDF encryption algorithms for revisions 2-4.
//!
//! This module implements the MD5/RC4 key derivation and password
//! validation of the Standard Security Handler.
//!
//! PDF Spec: Section 7.6.3 - Standard Security Handler

use md5::{Digest, Md5};

use super::rc4::{rc4_crypt, Rc4Backend};
use crate::error::Result;

/// Padding string used in PDF encryption (32 bytes).
///
/// PDF Spec: Algorithm 2, step 1
pub const PADDING: &[u8; 32] = b"\x28\xBF\x4E\x5E\x4E\x75\x8A\x41\
                              \x64\x00\x4E\x56\xFF\xFA\x01\x08\
                              \x2E\x2E\x00\xB6\xD0\x68\x3E\x80\
                              \x2F\x0C\xA9\xFE\x64\x53\x69\x7A";

/// Inputs shared by every revision 2-4 algorithm.
#[derive(Debug, Clone, Copy)]
pub struct LegacyParams<'a> {
    /// Revision number (R field)
    pub revision: u32,
    /// Key length in bytes (5-16)
    pub key_length: usize,
    /// 32-byte owner password hash (O field)
    pub owner_key: &'a [u8],
    /// 32-byte user password hash (U field)
    pub user_key: &'a [u8],
    /// User access permissions (P field)
    pub permissions: i32,
    /// First element of file identifier array
    pub file_id: &'a [u8],
    /// Whether metadata is encrypted
    pub encrypt_metadata: bool,
}

/// Pad or truncate a password to 32 bytes using the standard padding.
///
/// PDF Spec: Algorithm 2, step 1
pub fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let pass_len = password.len().min(32);
    padded[..pass_len].copy_from_slice(&password[..pass_len]);
    padded[pass_len..].copy_from_slice(&PADDING[..(32 - pass_len)]);
    padded
}

/// Re-hash the first `key_length` bytes of the digest 50 times (R>=3).
fn stretch(mut hash: Vec<u8>, key_length: usize) -> Vec<u8> {
    for _ in 0..50 {
        hash = Md5::digest(&hash[..key_length]).to_vec();
    }
    hash
}

/// Compute the encryption key from a password (Algorithm 2).
///
/// PDF Spec: Section 7.6.3.3 - Algorithm 2: Computing an encryption key
///
/// The result is a candidate only; it must pass [`authenticate_user_password`]
/// before it can decrypt anything.
pub fn compute_encryption_key(password: &[u8], params: &LegacyParams<'_>) -> Vec<u8> {
    let mut hasher = Md5::new();

    // Steps a-b: Pad or truncate the password to 32 bytes and pass it to MD5
    hasher.update(pad_password(password));

    // Step c: Pass the owner password hash
    hasher.update(params.owner_key);

    // Step d: Pass permissions as 32-bit little-endian
    hasher.update(params.permissions.to_le_bytes());

    // Step e: Pass the file identifier
    hasher.update(params.file_id);

    // Step f: For R >= 4, if EncryptMetadata is false, pass 0xFFFFFFFF
    if params.revision >= 4 && !params.encrypt_metadata {
        hasher.update([0xFF, 0xFF, 0xFF, 0xFF]);
    }

    let mut hash = hasher.finalize().to_vec();

    // Step h: For R >= 3, do 50 additional MD5 iterations on first key_length bytes
    if params.revision >= 3 {
        hash = stretch(hash, params.key_length);
    }

    hash.truncate(params.key_length);
    hash
}

/// Compute the user password hash for R=2 (Algorithm 4).
///
/// PDF Spec: Section 7.6.3.4 - Algorithm 4
fn compute_user_key_r2(backend: Rc4Backend, key: &[u8]) -> Result<Vec<u8>> {
    rc4_crypt(backend, key, PADDING)
}

/// Compute the significant 16 bytes of the user password hash for R>=3 (Algorithm 5).
///
/// PDF Spec: Section 7.6.3.4 - Algorithm 5
fn compute_user_key_r3(backend: Rc4Backend, key: &[u8], file_id: &[u8]) -> Result<Vec<u8>> {
    // Step b-c: MD5 hash of padding + file ID
    let mut hasher = Md5::new();
    hasher.update(PADDING);
    hasher.update(file_id);
    let mut hash = hasher.finalize().to_vec();

    // Step d-e: Encrypt the hash 20 times, pass n using key XOR n
    for i in 0..20u8 {
        let modified_key: Vec<u8> = key.iter().map(|byte| byte ^ i).collect();
        hash = rc4_crypt(backend, &modified_key, &hash)?;
    }

    Ok(hash)
}

/// Authenticate the user password (Algorithm 6).
///
/// PDF Spec: Section 7.6.3.4 - Algorithm 6: Authenticating the user password
///
/// Returns the file key if authentication succeeds.
pub fn authenticate_user_password(
    backend: Rc4Backend,
    password: &[u8],
    params: &LegacyParams<'_>,
) -> Result<Option<Vec<u8>>> {
    let key = compute_encryption_key(password, params);

    let matches = if params.revision >= 3 {
        let expected = compute_user_key_r3(backend, &key, params.file_id)?;
        // Only the first 16 bytes are significant; the rest is arbitrary padding
        params.user_key.len() >= 16 && constant_time_compare(&params.user_key[..16], &expected)
    } else {
        let expected = compute_user_key_r2(backend, &key)?;
        constant_time_compare(params.user_key, &expected)
    };

    Ok(matches.then_some(key))
}

/// Compute the RC4 key that wraps the user password in /O.
///
/// PDF Spec: Algorithm 3, steps a-d
fn compute_owner_rc4_key(owner_password: &[u8], revision: u32, key_length: usize) -> Vec<u8> {
    let mut hash = Md5::digest(pad_password(owner_password)).to_vec();

    if revision >= 3 {
        hash = stretch(hash, key_length);
    }

    hash.truncate(key_length);
    hash
}

/// Recover the (padded) user password implied by an owner password.
///
/// PDF Spec: Algorithm 7, step b
pub fn recover_user_password(
    backend: Rc4Backend,
    owner_password: &[u8],
    params: &LegacyParams<'_>,
) -> Result<Vec<u8>> {
    let rc4_key = compute_owner_rc4_key(owner_password, params.revision, params.key_length);

    if params.revision == 2 {
        return rc4_crypt(backend, &rc4_key, params.owner_key);
    }

    // R>=3: undo the 20 encryption passes, last key first
    let mut result = params.owner_key.to_vec();
    for i in (0..20u8).rev() {
        let modified_key: Vec<u8> = rc4_key.iter().map(|byte| byte ^ i).collect();
        result = rc4_crypt(backend, &modified_key, &result)?;
    }

    Ok(result)
}

/// Authenticate the owner password (Algorithm 7).
///
/// PDF Spec: Section 7.6.3.4 - Algorithm 7: Authenticating the owner password
///
/// Returns the file key if authentication succeeds.
pub fn authenticate_owner_password(
    backend: Rc4Backend,
    owner_password: &[u8],
    params: &LegacyParams<'_>,
) -> Result<Option<Vec<u8>>> {
    let user_password = recover_user_password(backend, owner_password, params)?;
    authenticate_user_password(backend, &user_password, params)
}

/// Compute the object-specific key (Algorithm 1, steps a-d).
///
/// PDF Spec: Section 7.6.2 - Algorithm 1: Encryption of data using RC4 or AES
pub fn compute_object_key(file_key: &[u8], obj_num: u32, gen_num: u32, aes: bool) -> Vec<u8> {
    let mut hasher = Md5::new();

    hasher.update(file_key);
    hasher.update(&obj_num.to_le_bytes()[..3]); // Low 3 bytes
    hasher.update(&gen_num.to_le_bytes()[..2]); // Low 2 bytes

    // For AES, add "sAlT" string
    if aes {
        hasher.update(b"sAlT");
    }

    let hash = hasher.finalize();

    // Key is first (n + 5) bytes, max 16
    let key_len = (file_key.len() + 5).min(16);
    hash[..key_len].to_vec()
}

/// Constant-time comparison to prevent timing attacks.
///
/// Returns true if the slices are equal.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}
