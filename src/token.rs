//! Raw token tree handed over by the tokenizer.
//!
//! The encryption dictionary is read from the file trailer before any object
//! can be decrypted, so it arrives here as a loosely-typed token tree rather
//! than as a resolved object. Every token keeps the byte offset it was read
//! from so that error messages can point back into the file.
//!
//! Dictionaries keep the tokenizer's flat layout: a sequence of alternating
//! name and value tokens.

/// A single token together with its source offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Typed token payload
    pub kind: TokenKind,
    /// Byte offset in the source file
    pub offset: usize,
}

/// Token payload, mirroring the PDF token shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `null`
    Null,
    /// `true` / `false`
    Boolean(bool),
    /// Numeric token, kept as written (`128`, `-1340`, `1.5`)
    Numeric(String),
    /// Name without the leading `/`
    Name(String),
    /// Literal string `( ... )`, escapes already resolved
    LiteralString(Vec<u8>),
    /// Hex string `< ... >`, raw hex digits as written
    HexString(String),
    /// Array `[ ... ]`
    Array(Vec<Token>),
    /// Dictionary `<< ... >>` as alternating key/value tokens
    Dictionary(Vec<Token>),
}

impl Token {
    /// Create a token at the given offset.
    pub fn new(kind: TokenKind, offset: usize) -> Self {
        Self { kind, offset }
    }

    /// Create a name token.
    pub fn name(name: &str, offset: usize) -> Self {
        Self::new(TokenKind::Name(name.to_string()), offset)
    }

    /// Create a numeric token.
    pub fn numeric(text: &str, offset: usize) -> Self {
        Self::new(TokenKind::Numeric(text.to_string()), offset)
    }

    /// Create a boolean token.
    pub fn boolean(value: bool, offset: usize) -> Self {
        Self::new(TokenKind::Boolean(value), offset)
    }

    /// Create a literal string token.
    pub fn literal(bytes: &[u8], offset: usize) -> Self {
        Self::new(TokenKind::LiteralString(bytes.to_vec()), offset)
    }

    /// Create a hex string token from its hex digits.
    pub fn hex(digits: &str, offset: usize) -> Self {
        Self::new(TokenKind::HexString(digits.to_string()), offset)
    }

    /// Create a dictionary token from `(key, value)` pairs.
    pub fn dictionary(entries: Vec<(Token, Token)>, offset: usize) -> Self {
        let flat = entries
            .into_iter()
            .flat_map(|(key, value)| [key, value])
            .collect();
        Self::new(TokenKind::Dictionary(flat), offset)
    }

    /// Get the type name of this token (without data).
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            TokenKind::Null => "Null",
            TokenKind::Boolean(_) => "Boolean",
            TokenKind::Numeric(_) => "Numeric",
            TokenKind::Name(_) => "Name",
            TokenKind::LiteralString(_) => "LiteralString",
            TokenKind::HexString(_) => "HexString",
            TokenKind::Array(_) => "Array",
            TokenKind::Dictionary(_) => "Dictionary",
        }
    }

    /// Try to read as an integer. Reals and malformed numbers yield `None`.
    pub fn as_integer(&self) -> Option<i64> {
        match &self.kind {
            TokenKind::Numeric(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self.kind {
            TokenKind::Boolean(b) => Some(b),
            _ => None,
        }
    }

    /// Try to read as string bytes. Hex strings are decoded.
    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        match &self.kind {
            TokenKind::LiteralString(bytes) => Some(bytes.clone()),
            TokenKind::HexString(digits) => Some(decode_hex_string(digits)),
            _ => None,
        }
    }

    /// Whether this token is a dictionary.
    pub fn is_dictionary(&self) -> bool {
        matches!(self.kind, TokenKind::Dictionary(_))
    }

    /// Iterate over the `(key, value)` entries of a dictionary token.
    ///
    /// Pairs whose key is not a name are skipped, as is a trailing key
    /// without a value. Non-dictionary tokens yield nothing.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Token)> {
        let flat: &[Token] = match &self.kind {
            TokenKind::Dictionary(flat) => flat,
            _ => &[],
        };
        flat.chunks_exact(2)
            .filter_map(|pair| pair[0].as_name().map(|key| (key, &pair[1])))
    }

    /// Look up a dictionary entry by key.
    pub fn get(&self, key: &str) -> Option<&Token> {
        self.entries()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value)
    }
}

/// Decode the digits of a hex string.
///
/// PDF Spec: Section 7.3.4.3 - whitespace is ignored, a missing final digit
/// is taken as 0. Other non-hex characters are skipped.
pub fn decode_hex_string(digits: &str) -> Vec<u8> {
    let nibbles: Vec<u8> = digits
        .bytes()
        .filter_map(|c| (c as char).to_digit(16).map(|d| d as u8))
        .collect();

    nibbles
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}
