//! RC4 encryption/decryption for PDF.
//!
//! RC4 is a stream cipher used by revisions 2-4 of the Standard Security
//! Handler, both for object data and for the password validation steps.
//! While cryptographically weak by modern standards, it's still widely used
//! in legacy PDFs.
//!
//! PDF Spec: Section 7.6.2 - General Encryption Algorithm
//!
//! Two interchangeable backends produce identical keystreams:
//!
//! - [`Rc4Backend::Native`]: the RustCrypto `rc4` crate (feature `native-rc4`)
//! - [`Rc4Backend::Computed`]: the straightforward table implementation below
//!
//! [`Rc4Backend::detect`] picks one by running a known vector through the
//! native primitive. The choice is stored by whoever owns the cipher
//! contexts; there is no global switch.

use crate::error::{Error, Result};

/// Known-answer probe: "hello" under sixteen '.' bytes.
const PROBE_KEY: &[u8; 16] = b"................";
const PROBE_PLAINTEXT: &[u8; 5] = b"hello";
const PROBE_CIPHERTEXT: [u8; 5] = [0x15, 0x6b, 0xd1, 0xe9, 0xe9];

/// Maximum RC4 key length in bytes.
pub const MAX_KEY_LEN: usize = 256;

/// RC4 implementation selected for a cipher context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rc4Backend {
    /// Platform primitive (RustCrypto `rc4`)
    Native,
    /// Pure computed fallback
    Computed,
}

impl Rc4Backend {
    /// Probe the native primitive and return the backend to use.
    ///
    /// Returns `Native` only if the primitive is compiled in and reproduces
    /// the known vector.
    pub fn detect() -> Self {
        #[cfg(feature = "native-rc4")]
        {
            if let Some(mut cipher) = native::NativeRc4::new(PROBE_KEY) {
                let mut buf = *PROBE_PLAINTEXT;
                cipher.apply_keystream(&mut buf);
                if buf == PROBE_CIPHERTEXT {
                    log::debug!("RC4 probe succeeded, using native backend");
                    return Rc4Backend::Native;
                }
                log::warn!("Native RC4 produced an unexpected keystream, using computed backend");
            }
        }

        log::debug!("Using computed RC4 backend");
        Rc4Backend::Computed
    }

    /// Resolve a configured preference to a concrete backend.
    pub fn from_preference(preference: crate::config::Rc4Preference) -> Self {
        use crate::config::Rc4Preference;

        match preference {
            Rc4Preference::Computed => Rc4Backend::Computed,
            Rc4Preference::Auto | Rc4Preference::Native => Self::detect(),
        }
    }
}

/// How successive calls on one context relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    /// Every call starts from a freshly scheduled key
    OneShot,
    /// Permutation and indices carry over between calls
    Continuous,
}

/// Caller-owned RC4 cipher context.
///
/// A context is bound to one key. In [`CipherMode::Continuous`] it must only
/// ever see the bytes of a single object, in order.
pub struct Rc4Context {
    backend: Rc4Backend,
    mode: CipherMode,
    key: Vec<u8>,
    state: Option<Keystream>,
}

impl std::fmt::Debug for Rc4Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rc4Context")
            .field("backend", &self.backend)
            .field("mode", &self.mode)
            .field("key_len", &self.key.len())
            .finish()
    }
}

impl Rc4Context {
    /// Create a context for `key` (1-256 bytes).
    pub fn new(backend: Rc4Backend, key: &[u8], mode: CipherMode) -> Result<Self> {
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            return Err(Error::Cipher(format!(
                "RC4 key must be 1-{} bytes, got {}",
                MAX_KEY_LEN,
                key.len()
            )));
        }

        Ok(Self {
            backend,
            mode,
            key: key.to_vec(),
            state: None,
        })
    }

    /// Backend this context runs on.
    pub fn backend(&self) -> Rc4Backend {
        self.backend
    }

    /// Invocation mode of this context.
    pub fn mode(&self) -> CipherMode {
        self.mode
    }

    /// XOR `data` with the keystream in place.
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        match self.mode {
            CipherMode::OneShot => Keystream::schedule(self.backend, &self.key).apply(data),
            CipherMode::Continuous => {
                let backend = self.backend;
                let key = &self.key;
                self.state
                    .get_or_insert_with(|| Keystream::schedule(backend, key))
                    .apply(data)
            },
        }
    }

    /// Encrypt `plaintext`.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Vec<u8> {
        let mut out = plaintext.to_vec();
        self.apply_keystream(&mut out);
        out
    }

    /// Decrypt `ciphertext` (the same operation as [`Self::encrypt`]).
    pub fn decrypt(&mut self, ciphertext: &[u8]) -> Vec<u8> {
        self.encrypt(ciphertext)
    }
}

/// One-shot RC4 over `data`.
///
/// RC4 is symmetric, so encryption and decryption are the same operation.
pub fn rc4_crypt(backend: Rc4Backend, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    Ok(Rc4Context::new(backend, key, CipherMode::OneShot)?.encrypt(data))
}

/// Scheduled keystream generator for either backend.
enum Keystream {
    Computed(Rc4Cipher),
    #[cfg(feature = "native-rc4")]
    Native(native::NativeRc4),
}

impl Keystream {
    fn schedule(backend: Rc4Backend, key: &[u8]) -> Self {
        #[cfg(feature = "native-rc4")]
        {
            // Key lengths without a native instantiation use the computed path
            if backend == Rc4Backend::Native {
                if let Some(cipher) = native::NativeRc4::new(key) {
                    return Keystream::Native(cipher);
                }
            }
        }
        #[cfg(not(feature = "native-rc4"))]
        let _ = backend;

        Keystream::Computed(Rc4Cipher::new(key))
    }

    fn apply(&mut self, data: &mut [u8]) {
        match self {
            Keystream::Computed(cipher) => cipher.apply_keystream(data),
            #[cfg(feature = "native-rc4")]
            Keystream::Native(cipher) => cipher.apply_keystream(data),
        }
    }
}

/// Simple RC4 cipher implementation.
///
/// RC4 is a stream cipher that generates a pseudorandom keystream based on the key.
struct Rc4Cipher {
    s: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4Cipher {
    /// Initialize RC4 cipher with a non-empty key (KSA).
    fn new(key: &[u8]) -> Self {
        let mut s = [0u8; 256];
        for (i, val) in s.iter_mut().enumerate() {
            *val = i as u8;
        }

        let mut j = 0u8;
        for i in 0..256 {
            j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
            s.swap(i, j as usize);
        }

        Self { s, i: 0, j: 0 }
    }

    /// Generate the next byte of keystream (PRGA).
    fn next_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.s[self.i as usize]);
        self.s.swap(self.i as usize, self.j as usize);
        let k = self.s[self.i as usize].wrapping_add(self.s[self.j as usize]);
        self.s[k as usize]
    }

    /// Apply keystream to data (XOR operation).
    fn apply_keystream(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            *byte ^= self.next_byte();
        }
    }
}

#[cfg(feature = "native-rc4")]
mod native {
    use rc4::consts::*;
    use rc4::{KeyInit, Rc4, StreamCipher};

    macro_rules! native_rc4 {
        ($($len:literal => $size:ident),* $(,)?) => {
            /// RustCrypto RC4, one instantiation per supported key length.
            pub(super) enum NativeRc4 {
                $($size(Rc4<$size>),)*
            }

            impl NativeRc4 {
                pub(super) fn new(key: &[u8]) -> Option<Self> {
                    match key.len() {
                        $($len => Rc4::<$size>::new_from_slice(key).ok().map(NativeRc4::$size),)*
                        _ => None,
                    }
                }

                pub(super) fn apply_keystream(&mut self, data: &mut [u8]) {
                    match self {
                        $(NativeRc4::$size(cipher) => cipher.apply_keystream(data),)*
                    }
                }
            }
        };
    }

    native_rc4! {
        1 => U1, 2 => U2, 3 => U3, 4 => U4, 5 => U5, 6 => U6, 7 => U7, 8 => U8,
        9 => U9, 10 => U10, 11 => U11, 12 => U12, 13 => U13, 14 => U14, 15 => U15, 16 => U16,
        17 => U17, 18 => U18, 19 => U19, 20 => U20, 21 => U21, 22 => U22, 23 => U23, 24 => U24,
        25 => U25, 26 => U26, 27 => U27, 28 => U28, 29 => U29, 30 => U30, 31 => U31, 32 => U32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn computed(key: &[u8], data: &[u8]) -> Vec<u8> {
        rc4_crypt(Rc4Backend::Computed, key, data).unwrap()
    }

    #[test]
    fn test_rc4_symmetric() {
        let key = b"testkey";
        let plaintext = b"Hello, World!";

        let ciphertext = computed(key, plaintext);
        let decrypted = computed(key, &ciphertext);

        assert_eq!(plaintext, &decrypted[..]);
        assert_ne!(plaintext, &ciphertext[..]);
    }

    #[test]
    fn test_rc4_empty() {
        let result = computed(b"testkey", b"");
        assert_eq!(result.len(), 0);
    }

    #[test]
    fn test_rc4_different_keys() {
        let plaintext = b"Secret message";

        let encrypted1 = computed(b"key1", plaintext);
        let encrypted2 = computed(b"key2", plaintext);

        assert_ne!(encrypted1, encrypted2);
    }

    #[test]
    fn test_rc4_known_vector() {
        // Key: "Key", Plaintext: "Plaintext" -> BBF316E8D940AF0AD3
        let ciphertext = computed(b"Key", b"Plaintext");
        assert_eq!(ciphertext, [0xBB, 0xF3, 0x16, 0xE8, 0xD9, 0x40, 0xAF, 0x0A, 0xD3]);
    }

    #[test]
    fn test_probe_vector() {
        let ciphertext = computed(PROBE_KEY, PROBE_PLAINTEXT);
        assert_eq!(ciphertext, PROBE_CIPHERTEXT);
        assert_eq!(computed(PROBE_KEY, &ciphertext), PROBE_PLAINTEXT);
    }

    #[test]
    fn test_key_length_bounds() {
        assert!(matches!(
            Rc4Context::new(Rc4Backend::Computed, b"", CipherMode::OneShot),
            Err(Error::Cipher(_))
        ));
        assert!(Rc4Context::new(Rc4Backend::Computed, &[7u8; 256], CipherMode::OneShot).is_ok());
        assert!(Rc4Context::new(Rc4Backend::Computed, &[7u8; 257], CipherMode::OneShot).is_err());
    }

    #[test]
    fn test_one_shot_resets_between_calls() {
        let mut ctx = Rc4Context::new(Rc4Backend::Computed, b"Key", CipherMode::OneShot).unwrap();
        let first = ctx.encrypt(b"Plaintext");
        let second = ctx.encrypt(b"Plaintext");
        assert_eq!(first, second);
    }

    #[test]
    fn test_continuous_carries_state() {
        let whole = computed(b"Key", b"Plaintext");

        let mut ctx =
            Rc4Context::new(Rc4Backend::Computed, b"Key", CipherMode::Continuous).unwrap();
        let mut chunked = ctx.encrypt(b"Plain");
        chunked.extend(ctx.encrypt(b"text"));

        assert_eq!(whole, chunked);
    }

    #[test]
    fn test_detect_returns_working_backend() {
        let backend = Rc4Backend::detect();
        let ciphertext = rc4_crypt(backend, PROBE_KEY, PROBE_PLAINTEXT).unwrap();
        assert_eq!(ciphertext, PROBE_CIPHERTEXT);
    }

    #[cfg(feature = "native-rc4")]
    #[test]
    fn test_native_matches_computed() {
        assert_eq!(Rc4Backend::detect(), Rc4Backend::Native);
        for len in 1..=40usize {
            let key: Vec<u8> = (0..len).map(|i| (i * 31 + 7) as u8).collect();
            let data: Vec<u8> = (0..300).map(|i| (i * 13) as u8).collect();
            assert_eq!(
                rc4_crypt(Rc4Backend::Native, &key, &data).unwrap(),
                rc4_crypt(Rc4Backend::Computed, &key, &data).unwrap(),
                "key length {}",
                len
            );
        }
    }

    #[test]
    fn test_from_preference() {
        use crate::config::Rc4Preference;
        assert_eq!(
            Rc4Backend::from_preference(Rc4Preference::Computed),
            Rc4Backend::Computed
        );
        assert_eq!(Rc4Backend::from_preference(Rc4Preference::Auto), Rc4Backend::detect());
    }
}
