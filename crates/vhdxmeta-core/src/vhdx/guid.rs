//! GUID codec.
//!
//! VHDX stores identifiers in the mixed-endian layout used by Windows: the
//! first three groups of the canonical text form are little-endian, the last
//! eight bytes are kept in document order. Known identifiers are written in
//! their canonical text form and converted here before comparison.

use std::fmt;

use uuid::Uuid;

use crate::error::{Error, Result};

/// Size of an on-disk GUID in bytes.
pub const GUID_SIZE: usize = 16;

/// A 16-byte identifier in on-disk (mixed-endian) byte order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid([u8; GUID_SIZE]);

impl Guid {
    /// The all-zero identifier.
    pub const NIL: Guid = Guid([0u8; GUID_SIZE]);

    /// Wraps raw on-disk bytes.
    pub const fn from_bytes(bytes: [u8; GUID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Copies the first 16 bytes of `data`.
    ///
    /// Callers are expected to have checked the slice length.
    pub(crate) fn from_slice(data: &[u8]) -> Self {
        let mut bytes = [0u8; GUID_SIZE];
        bytes.copy_from_slice(&data[..GUID_SIZE]);
        Self(bytes)
    }

    /// Parses the canonical hyphenated text form into on-disk byte order.
    ///
    /// Hyphens are ignored; what remains must be exactly 32 hex digits.
    pub fn parse(text: &str) -> Result<Self> {
        let digits: String = text.chars().filter(|c| *c != '-').collect();
        if digits.len() != 32 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::malformed_guid(text));
        }

        let uuid = Uuid::try_parse(&digits).map_err(|_| Error::malformed_guid(text))?;
        Ok(Self(uuid.to_bytes_le()))
    }

    /// Returns the raw on-disk bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; GUID_SIZE] {
        &self.0
    }

    /// Returns true if these bytes encode the GUID given in text form.
    ///
    /// Malformed text never matches.
    pub fn matches(&self, text: &str) -> bool {
        equals(&self.0, text)
    }

    fn to_uuid(self) -> Uuid {
        Uuid::from_bytes_le(self.0)
    }
}

impl fmt::Display for Guid {
    /// Formats as canonical uppercase hyphenated text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.to_uuid().hyphenated())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self)
    }
}

/// Encodes canonical GUID text into its 16 on-disk bytes.
pub fn encode(text: &str) -> Result<[u8; GUID_SIZE]> {
    Guid::parse(text).map(|guid| guid.0)
}

/// Compares raw on-disk bytes against a GUID in canonical text form.
pub fn equals(bytes: &[u8; GUID_SIZE], text: &str) -> bool {
    match encode(text) {
        Ok(encoded) => encoded == *bytes,
        Err(_) => false,
    }
}
