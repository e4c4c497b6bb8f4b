//! Parent locator decoding.
//!
//! A differencing disk names its parent through a locator item: a 20-byte
//! header, a table of 12-byte key/value records, then a blob holding every
//! key and value string as UTF-16LE, back to back.

use std::char::{decode_utf16, REPLACEMENT_CHARACTER};

use tracing::{debug, warn};

use super::guid::Guid;
use super::{le_u16, le_u32};

/// Size of the parent locator header.
pub const PARENT_LOCATOR_HEADER_SIZE: usize = 20;

/// Size of one key/value record.
pub const KEY_VALUE_ENTRY_SIZE: usize = 12;

/// Locator type written by Hyper-V for VHDX parents.
pub const VHDX_PARENT_LOCATOR_TYPE: &str = "B04AEFB7-D19E-4A81-B789-25B8E9445913";

/// Well-known locator keys.
pub mod keys {
    pub const PARENT_LINKAGE: &str = "parent_linkage";
    pub const PARENT_LINKAGE2: &str = "parent_linkage2";
    pub const RELATIVE_PATH: &str = "relative_path";
    pub const VOLUME_PATH: &str = "volume_path";
    pub const ABSOLUTE_WIN32_PATH: &str = "absolute_win32_path";
}

/// The fixed prefix of a parent locator payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLocatorHeader {
    /// Identifies the locator encoding.
    pub locator_type: Guid,
    /// Number of key/value records that follow.
    pub key_value_count: u16,
}

impl ParentLocatorHeader {
    /// Parses the header, or `None` if the payload is too short.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < PARENT_LOCATOR_HEADER_SIZE {
            return None;
        }

        Some(Self {
            locator_type: Guid::from_slice(&data[0..16]),
            key_value_count: le_u16(data, 18),
        })
    }

    /// Offset of the text blob within the payload.
    pub fn blob_offset(&self) -> usize {
        PARENT_LOCATOR_HEADER_SIZE + self.key_value_count as usize * KEY_VALUE_ENTRY_SIZE
    }
}

/// A key/value record; offsets are relative to the start of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyValueEntry {
    pub key_offset: u32,
    pub value_offset: u32,
    pub key_length: u16,
    pub value_length: u16,
}

impl KeyValueEntry {
    fn from_bytes(data: &[u8]) -> Self {
        Self {
            key_offset: le_u32(data, 0),
            value_offset: le_u32(data, 4),
            key_length: le_u16(data, 8),
            value_length: le_u16(data, 10),
        }
    }

    fn resolve(&self, payload: &[u8]) -> Option<(String, String)> {
        let key = slice(payload, self.key_offset, self.key_length)?;
        let value = slice(payload, self.value_offset, self.value_length)?;
        Some((decode_utf16le(key), decode_utf16le(value)))
    }
}

fn slice(payload: &[u8], offset: u32, length: u16) -> Option<&[u8]> {
    let start = offset as usize;
    let end = start.checked_add(length as usize)?;
    payload.get(start..end)
}

/// A decoded parent locator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentLocator {
    /// Identifies the locator encoding.
    pub locator_type: Guid,
    /// The whole text blob decoded as one string.
    pub text: String,
    /// Key/value pairs in table order.
    pub entries: Vec<(String, String)>,
}

impl ParentLocator {
    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn parent_linkage(&self) -> Option<&str> {
        self.get(keys::PARENT_LINKAGE)
    }

    pub fn parent_linkage2(&self) -> Option<&str> {
        self.get(keys::PARENT_LINKAGE2)
    }

    pub fn relative_path(&self) -> Option<&str> {
        self.get(keys::RELATIVE_PATH)
    }

    pub fn volume_path(&self) -> Option<&str> {
        self.get(keys::VOLUME_PATH)
    }

    pub fn absolute_win32_path(&self) -> Option<&str> {
        self.get(keys::ABSOLUTE_WIN32_PATH)
    }

    /// True if the locator type is the one used for VHDX parents.
    pub fn is_vhdx_locator(&self) -> bool {
        self.locator_type.matches(VHDX_PARENT_LOCATOR_TYPE)
    }
}

/// Decodes UTF-16LE bytes, substituting U+FFFD for unpaired surrogates.
///
/// A trailing odd byte is kept as a Latin-1 character.
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let pairs = bytes.chunks_exact(2);
    let tail = pairs.remainder();

    let mut text: String = decode_utf16(pairs.map(|pair| u16::from_le_bytes([pair[0], pair[1]])))
        .map(|r| r.unwrap_or(REPLACEMENT_CHARACTER))
        .collect();

    if let [last] = tail {
        warn!(byte = *last, "odd-length UTF-16 text, keeping trailing byte");
        text.push(char::from(*last));
    }
    text
}

/// Decodes a parent locator payload.
///
/// [`ParentLocator::text`] is the entire trailing blob decoded as a single
/// string, keys and values run together. A payload too short for the header
/// decodes to an empty locator.
pub fn decode_parent_locator(payload: &[u8]) -> ParentLocator {
    let header = match ParentLocatorHeader::from_bytes(payload) {
        Some(header) => header,
        None => return ParentLocator::default(),
    };

    let text = payload
        .get(header.blob_offset()..)
        .map(decode_utf16le)
        .unwrap_or_default();

    let mut entries = Vec::with_capacity(header.key_value_count as usize);
    let table = &payload[PARENT_LOCATOR_HEADER_SIZE..];
    for (index, record) in table
        .chunks_exact(KEY_VALUE_ENTRY_SIZE)
        .take(header.key_value_count as usize)
        .enumerate()
    {
        let record = KeyValueEntry::from_bytes(record);
        match record.resolve(payload) {
            Some(pair) => entries.push(pair),
            None => warn!(index, ?record, "parent locator entry outside payload, skipped"),
        }
    }

    debug!(
        locator_type = %header.locator_type,
        key_value_count = header.key_value_count,
        resolved = entries.len(),
        "decoded parent locator"
    );

    ParentLocator {
        locator_type: header.locator_type,
        text,
        entries,
    }
}
