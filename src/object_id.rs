//! SHA-1 object identifiers and content addressing.
//!
//! Pack objects are addressed by the SHA-1 of their framed form,
//! `"<kind> <size>\0" || payload`, matching Git's loose-object hashing.
//! `OidBytes` is a fixed-size, zero-heap id with stable lexicographic
//! ordering and lowercase-hex rendering.

use std::fmt;

use sha1::{Digest, Sha1};

use crate::entry::ObjectKind;

/// SHA-1 object id length in bytes.
pub const OID_LEN: usize = 20;

/// Fixed-size SHA-1 object id.
///
/// Compares and hashes by byte content. `Display` renders lowercase hex,
/// matching Git's canonical OID rendering.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OidBytes([u8; OID_LEN]);

impl OidBytes {
    /// Creates an id from raw bytes.
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; OID_LEN]) -> Self {
        Self(bytes)
    }

    /// Creates an id from a slice, returning `None` for invalid lengths.
    ///
    /// Use this for untrusted input where panicking is undesirable.
    #[must_use]
    pub fn try_from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != OID_LEN {
            return None;
        }
        let mut storage = [0u8; OID_LEN];
        storage.copy_from_slice(bytes);
        Some(Self(storage))
    }

    /// Creates an id from a slice.
    ///
    /// This is intended for trusted inputs where an invalid length
    /// indicates a programming error.
    ///
    /// # Panics
    ///
    /// Panics if `bytes.len()` is not 20.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::try_from_slice(bytes).expect("OID must be 20 bytes")
    }

    /// Parses a 40-character lowercase-or-uppercase hex id.
    #[must_use]
    pub fn from_hex(hex: &[u8]) -> Option<Self> {
        if hex.len() != OID_LEN * 2 {
            return None;
        }
        let mut bytes = [0u8; OID_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let hi = hex_digit(hex[i * 2])?;
            let lo = hex_digit(hex[i * 2 + 1])?;
            *byte = (hi << 4) | lo;
        }
        Some(Self(bytes))
    }

    /// Returns the id bytes as a slice.
    #[inline]
    #[must_use]
    pub const fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns the id as an owned byte array.
    #[inline]
    #[must_use]
    pub const fn into_bytes(self) -> [u8; OID_LEN] {
        self.0
    }

    /// Returns true if every byte is zero.
    ///
    /// This check is not constant-time; do not use it for secret material.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl fmt::Debug for OidBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OidBytes({self})")
    }
}

impl fmt::Display for OidBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; OID_LEN]> for OidBytes {
    fn from(bytes: [u8; OID_LEN]) -> Self {
        Self(bytes)
    }
}

/// Computes the framed object id `SHA1("<kind> <size>\0" || payload)`.
#[must_use]
pub fn oid_for_object(kind: ObjectKind, payload: &[u8]) -> OidBytes {
    let mut hasher = Sha1::new();
    hasher.update(kind.frame_name());
    hasher.update(b" ");
    hasher.update(payload.len().to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(payload);
    OidBytes(hasher.finalize().into())
}

#[inline]
fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
