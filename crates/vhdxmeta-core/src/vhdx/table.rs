//! Metadata table reading.
//!
//! The metadata region opens with a 32-byte header followed by a packed array
//! of 32-byte entry descriptors. Each descriptor points at a payload stored
//! elsewhere in the region.

use tracing::debug;

use super::guid::Guid;
use super::source::ImageSource;
use super::{le_u16, le_u32};
use crate::error::{Error, Result};

/// Expected signature at the start of the metadata table.
pub const METADATA_SIGNATURE: &[u8; 8] = b"metadata";

/// Size of the metadata table header.
pub const METADATA_HEADER_SIZE: usize = 32;

/// Size of one metadata table entry.
pub const METADATA_ENTRY_SIZE: usize = 32;

/// The metadata table header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataTableHeader {
    /// Signature bytes.
    pub signature: [u8; 8],
    /// Number of entries following the header.
    pub entry_count: u16,
}

impl MetadataTableHeader {
    /// Parse the header from its raw bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < METADATA_HEADER_SIZE {
            return Err(Error::truncated(
                0,
                METADATA_HEADER_SIZE as u64,
                data.len() as u64,
            ));
        }

        let mut signature = [0u8; 8];
        signature.copy_from_slice(&data[0..8]);

        Ok(Self {
            signature,
            entry_count: le_u16(data, 10),
        })
    }

    /// Returns true if the signature matches `metadata`.
    pub fn has_valid_signature(&self) -> bool {
        &self.signature == METADATA_SIGNATURE
    }

    /// Fails with [`Error::InvalidSignature`] on a signature mismatch.
    pub fn validate(&self) -> Result<()> {
        if self.has_valid_signature() {
            Ok(())
        } else {
            Err(Error::invalid_signature(METADATA_SIGNATURE, &self.signature))
        }
    }
}

/// One metadata table entry descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataTableEntry {
    /// Identifier of the metadata item.
    pub item_id: Guid,
    /// Payload offset relative to the metadata region start.
    pub offset: u32,
    /// Payload length in bytes.
    pub length: u32,
    /// Item is user-defined rather than system-defined.
    pub is_user: bool,
    /// Item describes the virtual disk rather than the file.
    pub is_virtual_disk: bool,
    /// Readers must understand this item.
    pub is_required: bool,
}

impl MetadataTableEntry {
    /// Parse an entry from its raw bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < METADATA_ENTRY_SIZE {
            return Err(Error::truncated(
                0,
                METADATA_ENTRY_SIZE as u64,
                data.len() as u64,
            ));
        }

        Ok(Self {
            item_id: Guid::from_slice(&data[0..16]),
            offset: le_u32(data, 16),
            length: le_u32(data, 20),
            is_user: data[24] != 0,
            is_virtual_disk: data[25] != 0,
            is_required: data[26] != 0,
        })
    }

    /// Absolute offset of this entry's payload.
    #[inline]
    pub fn payload_offset(&self, region_offset: u64) -> u64 {
        region_offset + u64::from(self.offset)
    }
}

/// The metadata table: header, entries, and the region it was read from.
#[derive(Debug, Clone)]
pub struct MetadataTable {
    /// Absolute offset of the metadata region.
    pub region_offset: u64,
    /// Table header.
    pub header: MetadataTableHeader,
    /// Entries in on-disk order.
    pub entries: Vec<MetadataTableEntry>,
}

/// Reads the metadata table header and its entries at `region_offset`.
///
/// With `verify_signature` set, a header whose signature is not `metadata`
/// fails with [`Error::InvalidSignature`]. The entry count is trusted as-is.
pub fn read_metadata_table(
    source: &ImageSource,
    region_offset: u64,
    verify_signature: bool,
) -> Result<MetadataTable> {
    let header =
        MetadataTableHeader::from_bytes(source.read_at(region_offset, METADATA_HEADER_SIZE)?)?;
    if verify_signature {
        header.validate()?;
    }

    debug!(
        region_offset,
        signature = %String::from_utf8_lossy(&header.signature),
        entry_count = header.entry_count,
        "read metadata table header"
    );

    let entries_offset = region_offset + METADATA_HEADER_SIZE as u64;
    let raw = source.read_at(
        entries_offset,
        header.entry_count as usize * METADATA_ENTRY_SIZE,
    )?;

    let entries = raw
        .chunks_exact(METADATA_ENTRY_SIZE)
        .map(MetadataTableEntry::from_bytes)
        .collect::<Result<Vec<_>>>()?;

    Ok(MetadataTable {
        region_offset,
        header,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(signature: &[u8; 8], count: u16) -> Vec<u8> {
        let mut header = vec![0u8; METADATA_HEADER_SIZE];
        header[0..8].copy_from_slice(signature);
        header[10..12].copy_from_slice(&count.to_le_bytes());
        header
    }

    #[test]
    fn test_parse_header() {
        let header = MetadataTableHeader::from_bytes(&header_bytes(METADATA_SIGNATURE, 5)).unwrap();
        assert_eq!(header.entry_count, 5);
        assert!(header.validate().is_ok());
    }

    #[test]
    fn test_header_bad_signature() {
        let header = MetadataTableHeader::from_bytes(&header_bytes(b"garbage!", 0)).unwrap();
        assert!(matches!(
            header.validate(),
            Err(Error::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_parse_entry_flags() {
        let mut raw = vec![0u8; METADATA_ENTRY_SIZE];
        raw[16..20].copy_from_slice(&0x1_0000u32.to_le_bytes());
        raw[20..24].copy_from_slice(&8u32.to_le_bytes());
        raw[25] = 1;
        raw[26] = 1;
        let entry = MetadataTableEntry::from_bytes(&raw).unwrap();
        assert_eq!(entry.offset, 0x1_0000);
        assert_eq!(entry.length, 8);
        assert!(!entry.is_user);
        assert!(entry.is_virtual_disk);
        assert!(entry.is_required);
        assert_eq!(entry.payload_offset(0x20_0000), 0x21_0000);
    }

    #[test]
    fn test_read_table_entries() {
        let mut image = vec![0u8; 64];
        image.extend(header_bytes(METADATA_SIGNATURE, 2));
        for offset in [0x100u32, 0x200] {
            let mut entry = vec![0u8; METADATA_ENTRY_SIZE];
            entry[16..20].copy_from_slice(&offset.to_le_bytes());
            entry[20..24].copy_from_slice(&4u32.to_le_bytes());
            image.extend(entry);
        }

        let source = ImageSource::from_bytes(image);
        let table = read_metadata_table(&source, 64, true).unwrap();
        assert_eq!(table.region_offset, 64);
        assert_eq!(table.entries.len(), 2);
        assert_eq!(table.entries[0].offset, 0x100);
        assert_eq!(table.entries[1].offset, 0x200);
    }

    #[test]
    fn test_read_table_unverified_signature() {
        let mut image = header_bytes(b"\0\0\0\0\0\0\0\0", 0);
        image.extend(vec![0u8; 32]);
        let source = ImageSource::from_bytes(image);
        assert!(read_metadata_table(&source, 0, false).is_ok());
        assert!(matches!(
            read_metadata_table(&source, 0, true),
            Err(Error::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_read_table_truncated_entries() {
        let mut image = header_bytes(METADATA_SIGNATURE, 3);
        image.extend(vec![0u8; METADATA_ENTRY_SIZE]);
        let source = ImageSource::from_bytes(image);
        assert!(matches!(
            read_metadata_table(&source, 0, true),
            Err(Error::TruncatedRead { .. })
        ));
    }
}
