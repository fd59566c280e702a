//! PDF 2.0 encryption algorithms for revisions 5 and 6 (AES-256).
//!
//! Password validation compares a SHA-2 based hash against the 48-byte /U or
//! /O entry; the file key is then unwrapped from /UE or /OE.
//!
//! PDF 2.0 Spec: Section 7.6.4.3 - Algorithms 2.A, 2.B, 11, 12 and 13

use sha2::{Digest, Sha256, Sha384, Sha512};

use super::aes::{aes128_cbc_encrypt_in_place, aes256_decrypt_block, aes256_unwrap_key};
use super::algorithms::constant_time_compare;
use super::key::PermsStatus;
use super::HashedPassword;
use crate::error::Result;

/// Maximum password length in bytes for R>=5.
pub const MAX_PASSWORD_LEN: usize = 127;

/// Truncate password to 127 bytes for UTF-8 (R>=5 requirement).
///
/// Truncation never splits a multi-byte UTF-8 sequence.
pub fn truncate_password_utf8(password: &[u8]) -> &[u8] {
    if password.len() <= MAX_PASSWORD_LEN {
        return password;
    }

    // Back off while the first dropped byte is a continuation byte
    let mut end = MAX_PASSWORD_LEN;
    while end > 0 && (password[end] & 0xC0) == 0x80 {
        end -= 1;
    }
    &password[..end]
}

/// Compute a password hash (Algorithm 2.B, or plain SHA-256 for R=5).
///
/// `udata` is the 48-byte /U entry when checking the owner password and
/// empty otherwise.
pub fn compute_hash(revision: u32, password: &[u8], salt: &[u8], udata: &[u8]) -> Result<[u8; 32]> {
    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.update(salt);
    hasher.update(udata);
    let mut k = hasher.finalize().to_vec();

    if revision >= 6 {
        let mut k1 = Vec::with_capacity(64 * (password.len() + 64 + udata.len()));
        let mut round = 0u32;

        loop {
            round += 1;

            // K1 = 64 repetitions of (password || K || udata)
            k1.clear();
            for _ in 0..64 {
                k1.extend_from_slice(password);
                k1.extend_from_slice(&k);
                k1.extend_from_slice(udata);
            }

            // E = AES-128-CBC(K1), key K[0..16], IV K[16..32], no padding
            aes128_cbc_encrypt_in_place(&k[..16], &k[16..32], &mut k1)?;
            let e = &k1;

            // The first 16 bytes of E as a big-endian number mod 3. Since
            // 256 = 1 (mod 3) this is the byte sum mod 3.
            let selector = e[..16].iter().map(|&b| u32::from(b)).sum::<u32>() % 3;
            k = match selector {
                0 => Sha256::digest(e).to_vec(),
                1 => Sha384::digest(e).to_vec(),
                _ => Sha512::digest(e).to_vec(),
            };

            let last = u32::from(e[e.len() - 1]);
            if round >= 64 && last + 32 <= round {
                break;
            }
        }
    }

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&k[..32]);
    Ok(hash)
}

/// Authenticate the user password (Algorithm 11) and unwrap /UE (Algorithm 2.A).
///
/// Returns the 32-byte file key if the password matches.
pub fn authenticate_user(
    revision: u32,
    password: &[u8],
    user: &HashedPassword,
    user_key: &[u8; 32],
) -> Result<Option<[u8; 32]>> {
    let password = truncate_password_utf8(password);

    let hash = compute_hash(revision, password, user.validation_salt(), &[])?;
    if !constant_time_compare(&hash, user.hash()) {
        return Ok(None);
    }

    let intermediate = compute_hash(revision, password, user.key_salt(), &[])?;
    aes256_unwrap_key(&intermediate, user_key).map(Some)
}

/// Authenticate the owner password (Algorithm 12) and unwrap /OE (Algorithm 2.A).
///
/// The hash input additionally carries the full 48-byte /U entry.
pub fn authenticate_owner(
    revision: u32,
    password: &[u8],
    owner: &HashedPassword,
    user: &HashedPassword,
    owner_key: &[u8; 32],
) -> Result<Option<[u8; 32]>> {
    let password = truncate_password_utf8(password);
    let udata = user.as_bytes();

    let hash = compute_hash(revision, password, owner.validation_salt(), udata)?;
    if !constant_time_compare(&hash, owner.hash()) {
        return Ok(None);
    }

    let intermediate = compute_hash(revision, password, owner.key_salt(), udata)?;
    aes256_unwrap_key(&intermediate, owner_key).map(Some)
}

/// Check the decrypted /Perms entry against /P and /EncryptMetadata (Algorithm 13).
///
/// Returns `None` when the decrypted block lacks the `adb` marker: the key
/// unwrapped from /UE or /OE is wrong and must not be used. Disagreement
/// with /P or /EncryptMetadata is reported, not raised.
pub fn validate_perms(
    file_key: &[u8],
    perms: &[u8; 16],
    permissions: i32,
    encrypt_metadata: bool,
) -> Result<Option<PermsStatus>> {
    let decrypted = aes256_decrypt_block(file_key, perms)?;

    if &decrypted[9..12] != b"adb" {
        return Ok(None);
    }

    if decrypted[..4] != permissions.to_le_bytes() {
        return Ok(Some(PermsStatus::Mismatch(format!(
            "/Perms permissions {:#010x} do not match /P {:#010x}",
            u32::from_le_bytes([decrypted[0], decrypted[1], decrypted[2], decrypted[3]]),
            permissions as u32
        ))));
    }

    let expected = if encrypt_metadata { b'T' } else { b'F' };
    if decrypted[8] != expected {
        return Ok(Some(PermsStatus::Mismatch(format!(
            "/Perms metadata flag {:?} does not match /EncryptMetadata {}",
            decrypted[8] as char, encrypt_metadata
        ))));
    }

    Ok(Some(PermsStatus::Valid))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_EMPTY_R6: [u8; 32] = [
        0x43, 0x9f, 0xeb, 0xa0, 0x99, 0xa6, 0x3d, 0x0d, 0x03, 0x5a, 0x1e, 0x5f, 0xb6, 0x7f, 0xf3,
        0x07, 0x32, 0x91, 0x89, 0x58, 0x49, 0x56, 0x42, 0x5a, 0xff, 0x2d, 0x3b, 0xd3, 0xd1, 0x5e,
        0xdc, 0x60,
    ];

    const KEY_R5: [u8; 32] = [
        0x3b, 0x10, 0xe7, 0x16, 0x72, 0x01, 0xbd, 0x86, 0xd9, 0xcc, 0x89, 0x3c, 0x48, 0x55, 0x3a,
        0xcf, 0xbe, 0xbd, 0x4a, 0x0f, 0x7d, 0x57, 0x67, 0xf9, 0xeb, 0x0f, 0x08, 0xd2, 0xcc, 0xd3,
        0x66, 0xa9,
    ];
    const PERMS_R5: [u8; 16] = [
        0x2d, 0x21, 0xf7, 0x6c, 0x4f, 0xfd, 0x6a, 0xd1, 0x75, 0x28, 0xc6, 0x8f, 0xdb, 0x84, 0xf1,
        0x2f,
    ];

    fn hashed(bytes: &[u8]) -> HashedPassword {
        HashedPassword::from_slice(bytes).unwrap()
    }

    #[test]
    fn test_truncate_short_password() {
        assert_eq!(truncate_password_utf8(b"secret"), b"secret");
    }

    #[test]
    fn test_truncate_long_ascii_password() {
        let password = vec![b'a'; 200];
        assert_eq!(truncate_password_utf8(&password).len(), 127);
    }

    #[test]
    fn test_truncate_respects_utf8_boundary() {
        // 126 ASCII bytes followed by a 2-byte character straddling the limit
        let mut password = vec![b'a'; 126];
        password.extend_from_slice("é".as_bytes());
        password.extend_from_slice(b"tail");
        assert_eq!(truncate_password_utf8(&password).len(), 126);
    }

    #[test]
    fn test_r5_hash_is_plain_sha256() {
        let hash = compute_hash(5, b"pw", b"saltsalt", b"").unwrap();
        let expected = Sha256::digest(b"pwsaltsalt");
        assert_eq!(&hash[..], &expected[..]);
    }

    #[test]
    fn test_r6_hash_known_vector() {
        let hash = compute_hash(6, b"", &[0u8; 8], b"").unwrap();
        assert_eq!(hash, HASH_EMPTY_R6);
    }

    #[test]
    fn test_r6_hash_depends_on_udata() {
        let plain = compute_hash(6, b"owner", b"12345678", b"").unwrap();
        let with_u = compute_hash(6, b"owner", b"12345678", &[0x55; 48]).unwrap();
        assert_ne!(plain, with_u);
    }

    #[test]
    fn test_user_mismatch_returns_none() {
        let user = hashed(&[0u8; 48]);
        let result = authenticate_user(5, b"anything", &user, &[0u8; 32]).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_owner_mismatch_returns_none() {
        let owner = hashed(&[1u8; 48]);
        let user = hashed(&[2u8; 48]);
        let result = authenticate_owner(6, b"anything", &owner, &user, &[0u8; 32]).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_perms_valid() {
        let status = validate_perms(&KEY_R5, &PERMS_R5, -3392, true).unwrap();
        assert_eq!(status, Some(PermsStatus::Valid));
    }

    #[test]
    fn test_perms_mismatch_on_p() {
        let status = validate_perms(&KEY_R5, &PERMS_R5, -4, true).unwrap();
        assert!(matches!(status, Some(PermsStatus::Mismatch(msg)) if msg.contains("/P")));
    }

    #[test]
    fn test_perms_mismatch_on_metadata_flag() {
        let status = validate_perms(&KEY_R5, &PERMS_R5, -3392, false).unwrap();
        assert!(matches!(
            status,
            Some(PermsStatus::Mismatch(msg)) if msg.contains("EncryptMetadata")
        ));
    }

    #[test]
    fn test_perms_wrong_key_has_no_marker() {
        let status = validate_perms(&[0u8; 32], &PERMS_R5, -3392, true).unwrap();
        assert_eq!(status, None);
    }
}
