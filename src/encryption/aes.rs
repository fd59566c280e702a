//! AES decryption for PDF.
//!
//! AES (Advanced Encryption Standard) is used in PDF 1.6+ for stronger encryption.
//! PDFs use AES in CBC (Cipher Block Chaining) mode with PKCS#7 padding, the
//! IV being the first 16 bytes of each string or stream.
//!
//! Supported algorithms:
//! - AES-128: 16-byte key (PDF 1.6+, V=4, AESV2)
//! - AES-256: 32-byte key (PDF 2.0, V=5, AESV3)
//!
//! The key derivation for R5/R6 additionally needs raw (unpadded) CBC for
//! key unwrapping and hashing, and single-block ECB for the /Perms check.
//!
//! PDF Spec: Section 7.6.2 - General Encryption Algorithm

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecrypt, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use aes::{Aes128, Aes256};
use cbc::{Decryptor, Encryptor};

use crate::error::{Error, Result};

type Aes128CbcEnc = Encryptor<Aes128>;
type Aes128CbcDec = Decryptor<Aes128>;
type Aes256CbcDec = Decryptor<Aes256>;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// CBC decryptor for either key size.
enum CbcDecryptor {
    Aes128(Aes128CbcDec),
    Aes256(Aes256CbcDec),
}

impl CbcDecryptor {
    fn new(key: &[u8], iv: &[u8]) -> Result<Self> {
        match key.len() {
            16 => Aes128CbcDec::new_from_slices(key, iv).map(CbcDecryptor::Aes128),
            32 => Aes256CbcDec::new_from_slices(key, iv).map(CbcDecryptor::Aes256),
            n => {
                return Err(Error::Cipher(format!(
                    "AES key must be 16 or 32 bytes, got {}",
                    n
                )))
            },
        }
        .map_err(|_| Error::Cipher("Invalid AES key or IV length".to_string()))
    }

    /// Decrypt whole blocks in place, carrying the chaining value.
    fn decrypt_blocks(&mut self, data: &mut [u8]) {
        for block in data.chunks_exact_mut(BLOCK_SIZE) {
            let block = aes::Block::from_mut_slice(block);
            match self {
                CbcDecryptor::Aes128(dec) => dec.decrypt_block_mut(block),
                CbcDecryptor::Aes256(dec) => dec.decrypt_block_mut(block),
            }
        }
    }
}

/// Incremental AES-CBC decryption of one string or stream.
///
/// The first 16 bytes fed in are the IV. The last complete block is held
/// back until [`AesCbcStream::finish`] so that its PKCS#7 padding can be
/// removed.
pub struct AesCbcStream {
    key: Vec<u8>,
    decryptor: Option<CbcDecryptor>,
    pending: Vec<u8>,
    strict: bool,
}

impl AesCbcStream {
    /// Create a stream for a 16- or 32-byte key.
    pub fn new(key: &[u8], strict: bool) -> Result<Self> {
        if key.len() != 16 && key.len() != 32 {
            return Err(Error::Cipher(format!(
                "AES key must be 16 or 32 bytes, got {}",
                key.len()
            )));
        }

        Ok(Self {
            key: key.to_vec(),
            decryptor: None,
            pending: Vec::new(),
            strict,
        })
    }

    /// Feed ciphertext, returning the plaintext that is already final.
    pub fn update(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        self.pending.extend_from_slice(chunk);

        if self.decryptor.is_none() {
            if self.pending.len() < BLOCK_SIZE {
                return Ok(Vec::new());
            }
            let iv: Vec<u8> = self.pending.drain(..BLOCK_SIZE).collect();
            self.decryptor = Some(CbcDecryptor::new(&self.key, &iv)?);
        }

        // The last complete block (and any partial one) stays pending
        let ready = (self.pending.len() / BLOCK_SIZE).saturating_sub(1) * BLOCK_SIZE;
        if ready == 0 {
            return Ok(Vec::new());
        }

        let mut out: Vec<u8> = self.pending.drain(..ready).collect();
        if let Some(decryptor) = self.decryptor.as_mut() {
            decryptor.decrypt_blocks(&mut out);
        }
        Ok(out)
    }

    /// Decrypt the held-back data and strip the padding.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let Some(mut decryptor) = self.decryptor.take() else {
            if self.pending.is_empty() {
                return Ok(Vec::new());
            }
            if self.strict {
                return Err(Error::Cipher(format!(
                    "AES data too short for IV: {} bytes",
                    self.pending.len()
                )));
            }
            log::warn!(
                "AES data shorter than its IV ({} bytes), returning empty",
                self.pending.len()
            );
            return Ok(Vec::new());
        };

        let mut tail = std::mem::take(&mut self.pending);
        let partial = tail.len() % BLOCK_SIZE;
        if partial != 0 {
            if self.strict {
                return Err(Error::Cipher(
                    "Encrypted data length must be multiple of 16".to_string(),
                ));
            }
            log::warn!("Dropping {} trailing bytes of misaligned AES data", partial);
            tail.truncate(tail.len() - partial);
        }
        if tail.is_empty() {
            return Ok(Vec::new());
        }

        decryptor.decrypt_blocks(&mut tail);
        strip_pkcs7(tail, self.strict)
    }
}

/// Remove PKCS#7 padding from the final decrypted block(s).
fn strip_pkcs7(mut decrypted: Vec<u8>, strict: bool) -> Result<Vec<u8>> {
    let padding_len = decrypted.last().copied().unwrap_or(0) as usize;
    let valid = (1..=BLOCK_SIZE).contains(&padding_len)
        && padding_len <= decrypted.len()
        && decrypted[decrypted.len() - padding_len..]
            .iter()
            .all(|&byte| byte as usize == padding_len);

    if !valid {
        if strict {
            return Err(Error::Cipher("Invalid PKCS#7 padding".to_string()));
        }
        log::warn!("Invalid PKCS#7 padding, keeping decrypted block as is");
        return Ok(decrypted);
    }

    decrypted.truncate(decrypted.len() - padding_len);
    Ok(decrypted)
}

/// Decrypt `IV || ciphertext` with AES-CBC and remove PKCS#7 padding.
///
/// # Arguments
///
/// * `key` - 16-byte (AESV2) or 32-byte (AESV3) key
/// * `data` - The encrypted data, IV first
/// * `strict` - Reject misaligned data and bad padding instead of recovering
pub fn aes_cbc_decrypt(key: &[u8], data: &[u8], strict: bool) -> Result<Vec<u8>> {
    let mut stream = AesCbcStream::new(key, strict)?;
    let mut out = stream.update(data)?;
    out.extend(stream.finish()?);
    Ok(out)
}

/// Unwrap a 32-byte file key from /UE or /OE.
///
/// PDF 2.0 Spec: Algorithm 2.A steps (d)/(e) - AES-256 CBC, zero IV, no padding.
pub fn aes256_unwrap_key(key: &[u8], wrapped: &[u8]) -> Result<[u8; 32]> {
    if wrapped.len() != 32 {
        return Err(Error::Cipher(format!(
            "Wrapped file key must be 32 bytes, got {}",
            wrapped.len()
        )));
    }

    let mut buffer = [0u8; 32];
    buffer.copy_from_slice(wrapped);
    Aes256CbcDec::new_from_slices(key, &[0u8; BLOCK_SIZE])
        .map_err(|_| Error::Cipher("AES-256 key must be 32 bytes".to_string()))?
        .decrypt_padded_mut::<NoPadding>(&mut buffer)
        .map_err(|_| Error::Cipher("Key unwrapping failed".to_string()))?;

    Ok(buffer)
}

/// Decrypt a single block with AES-256 in ECB mode (used for /Perms).
pub fn aes256_decrypt_block(key: &[u8], data: &[u8]) -> Result<[u8; 16]> {
    if data.len() != BLOCK_SIZE {
        return Err(Error::Cipher(format!("Expected one AES block, got {} bytes", data.len())));
    }

    let cipher = Aes256::new_from_slice(key)
        .map_err(|_| Error::Cipher("AES-256 key must be 32 bytes".to_string()))?;
    let mut block = aes::Block::clone_from_slice(data);
    cipher.decrypt_block(&mut block);

    let mut out = [0u8; 16];
    out.copy_from_slice(&block);
    Ok(out)
}

/// Encrypt block-aligned data in place with AES-128-CBC, no padding.
///
/// Used by the revision 6 hash (Algorithm 2.B).
pub fn aes128_cbc_encrypt_in_place(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()> {
    let len = data.len();
    if len % BLOCK_SIZE != 0 {
        return Err(Error::Cipher(
            "Data length must be a multiple of 16".to_string(),
        ));
    }

    Aes128CbcEnc::new_from_slices(key, iv)
        .map_err(|_| Error::Cipher("AES-128 key and IV must be 16 bytes".to_string()))?
        .encrypt_padded_mut::<NoPadding>(data, len)
        .map_err(|_| Error::Cipher("Encryption failed".to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_128: [u8; 16] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f,
    ];

    fn encrypt_128(iv: &[u8], plaintext: &[u8]) -> Vec<u8> {
        let mut padded = plaintext.to_vec();
        let padding_len = 16 - (plaintext.len() % 16);
        padded.extend(std::iter::repeat(padding_len as u8).take(padding_len));
        aes128_cbc_encrypt_in_place(&KEY_128, iv, &mut padded).unwrap();

        let mut out = iv.to_vec();
        out.extend(padded);
        out
    }

    #[test]
    fn test_aes128_round_trip() {
        let iv = b"fedcba9876543210";
        let plaintext = b"Hello, AES encryption!";

        let ciphertext = encrypt_128(iv, plaintext);
        let decrypted = aes_cbc_decrypt(&KEY_128, &ciphertext, true).unwrap();

        assert_eq!(plaintext, &decrypted[..]);
    }

    #[test]
    fn test_aes128_block_aligned() {
        let iv = b"fedcba9876543210";
        let plaintext = b"Exactly16bytes!!";

        let ciphertext = encrypt_128(iv, plaintext);
        assert_eq!(ciphertext.len(), 16 + 32);
        let decrypted = aes_cbc_decrypt(&KEY_128, &ciphertext, true).unwrap();

        assert_eq!(plaintext, &decrypted[..]);
    }

    #[test]
    fn test_empty_and_iv_only() {
        assert!(aes_cbc_decrypt(&KEY_128, b"", true).unwrap().is_empty());
        assert!(aes_cbc_decrypt(&KEY_128, &[0u8; 16], true).unwrap().is_empty());
    }

    #[test]
    fn test_short_data() {
        assert!(aes_cbc_decrypt(&KEY_128, &[0u8; 7], true).is_err());
        assert!(aes_cbc_decrypt(&KEY_128, &[0u8; 7], false).unwrap().is_empty());
    }

    #[test]
    fn test_misaligned_data() {
        let mut ciphertext = encrypt_128(b"fedcba9876543210", b"Secret message");
        ciphertext.extend_from_slice(&[1, 2, 3]);

        assert!(matches!(
            aes_cbc_decrypt(&KEY_128, &ciphertext, true),
            Err(Error::Cipher(_))
        ));
        assert_eq!(
            aes_cbc_decrypt(&KEY_128, &ciphertext, false).unwrap(),
            b"Secret message"
        );
    }

    #[test]
    fn test_bad_padding() {
        let iv = [0u8; 16];
        let mut block = *b"no padding here!";
        aes128_cbc_encrypt_in_place(&KEY_128, &iv, &mut block).unwrap();
        let mut data = iv.to_vec();
        data.extend_from_slice(&block);

        assert!(aes_cbc_decrypt(&KEY_128, &data, true).is_err());
        assert_eq!(aes_cbc_decrypt(&KEY_128, &data, false).unwrap(), b"no padding here!");
    }

    #[test]
    fn test_invalid_key_length() {
        assert!(AesCbcStream::new(b"short", true).is_err());
        assert!(aes_cbc_decrypt(&[0u8; 24], &[0u8; 32], true).is_err());
    }

    #[test]
    fn test_stream_chunking_matches_one_shot() {
        let plaintext: Vec<u8> = (0..100u8).collect();
        let ciphertext = encrypt_128(b"0123456789abcdef", &plaintext);

        for chunk_size in [1, 5, 16, 17, 33] {
            let mut stream = AesCbcStream::new(&KEY_128, true).unwrap();
            let mut out = Vec::new();
            for chunk in ciphertext.chunks(chunk_size) {
                out.extend(stream.update(chunk).unwrap());
            }
            out.extend(stream.finish().unwrap());
            assert_eq!(out, plaintext, "chunk size {}", chunk_size);
        }
    }

    #[test]
    fn test_unwrap_requires_32_bytes() {
        assert!(aes256_unwrap_key(&[0u8; 32], &[0u8; 16]).is_err());
        assert!(aes256_unwrap_key(&[0u8; 16], &[0u8; 32]).is_err());
        assert!(aes256_unwrap_key(&[0u8; 32], &[0u8; 32]).is_ok());
    }

    #[test]
    fn test_decrypt_block_length() {
        assert!(aes256_decrypt_block(&[0u8; 32], &[0u8; 15]).is_err());
        assert!(aes256_decrypt_block(&[0u8; 32], &[0u8; 16]).is_ok());
    }
}
