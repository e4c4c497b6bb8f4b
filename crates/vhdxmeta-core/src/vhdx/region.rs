//! Region table reading.
//!
//! The region table lives after the file identifier and the two header
//! blocks. It names the offset-addressed regions of the container; only the
//! metadata region is followed here.

use tracing::{debug, warn};

use super::guid::Guid;
use super::source::ImageSource;
use super::{le_u32, le_u64};
use crate::error::{Error, Result};

/// Size of each fixed header block at the start of the container.
pub const HEADER_BLOCK_SIZE: u64 = 64 * 1024;

/// Absolute offset of the region table header.
pub const REGION_TABLE_OFFSET: u64 = 3 * HEADER_BLOCK_SIZE;

/// Size of the region table header preceding the entries.
pub const REGION_TABLE_HEADER_SIZE: usize = 16;

/// Size of one region table entry.
pub const REGION_ENTRY_SIZE: usize = 32;

/// Largest entry count the format allows.
pub const MAX_REGION_ENTRIES: u32 = 2047;

/// Number of slots read when the header does not declare a usable count.
pub const LEGACY_REGION_SLOTS: usize = 2;

/// Identifier of the metadata region.
pub const METADATA_REGION: &str = "8B7CA206-4790-4B9A-B8FE-575F050F886E";

/// Identifier of the block allocation table region.
pub const BAT_REGION: &str = "2DC27766-F623-4200-9D64-115E9BFD4A08";

/// The 16-byte header in front of the region table entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionTableHeader {
    /// Signature bytes, `regi` on a well-formed image. Not validated.
    pub signature: [u8; 4],
    /// CRC-32C over the table. Not validated.
    pub checksum: u32,
    /// Declared number of entries.
    pub entry_count: u32,
}

impl RegionTableHeader {
    /// Parse the header from its raw bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < REGION_TABLE_HEADER_SIZE {
            return Err(Error::truncated(
                REGION_TABLE_OFFSET,
                REGION_TABLE_HEADER_SIZE as u64,
                data.len() as u64,
            ));
        }

        Ok(Self {
            signature: [data[0], data[1], data[2], data[3]],
            checksum: le_u32(data, 4),
            entry_count: le_u32(data, 8),
        })
    }

    /// Number of entry slots to scan for this header.
    ///
    /// Never fewer than the two legacy slots, even when the header declares
    /// a single entry.
    fn slots(&self) -> usize {
        if (1..=MAX_REGION_ENTRIES).contains(&self.entry_count) {
            (self.entry_count as usize).max(LEGACY_REGION_SLOTS)
        } else {
            warn!(
                entry_count = self.entry_count,
                "region table entry count out of range, reading {} slots", LEGACY_REGION_SLOTS
            );
            LEGACY_REGION_SLOTS
        }
    }
}

/// One 32-byte region table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionTableEntry {
    /// Region identifier.
    pub guid: Guid,
    /// Absolute byte offset of the region.
    pub file_offset: u64,
    /// Region length in bytes.
    pub length: u32,
    /// Whether readers must understand this region.
    pub required: bool,
}

impl RegionTableEntry {
    /// Parse an entry from its raw bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < REGION_ENTRY_SIZE {
            return Err(Error::truncated(
                0,
                REGION_ENTRY_SIZE as u64,
                data.len() as u64,
            ));
        }

        Ok(Self {
            guid: Guid::from_slice(&data[0..16]),
            file_offset: le_u64(data, 16),
            length: le_u32(data, 24),
            required: le_u32(data, 28) & 1 != 0,
        })
    }

    /// True if this entry describes the metadata region.
    pub fn is_metadata(&self) -> bool {
        self.guid.matches(METADATA_REGION)
    }

    /// True if this entry describes the block allocation table.
    pub fn is_bat(&self) -> bool {
        self.guid.matches(BAT_REGION)
    }

    /// Short display name for the region kind.
    pub fn kind(&self) -> &'static str {
        if self.is_metadata() {
            "Metadata"
        } else if self.is_bat() {
            "BAT"
        } else {
            "Unknown"
        }
    }
}

/// Parse every complete 32-byte entry in `window`.
///
/// A trailing partial entry is ignored.
pub fn parse_region_entries(window: &[u8]) -> Vec<RegionTableEntry> {
    window
        .chunks_exact(REGION_ENTRY_SIZE)
        .filter_map(|chunk| RegionTableEntry::from_bytes(chunk).ok())
        .collect()
}

/// Returns the file offset of the metadata region described in `window`.
///
/// The window holds consecutive region table entries, normally the 64 bytes
/// following the region table header.
///
/// # Errors
///
/// Returns [`Error::RegionNotFound`] if no entry carries the metadata region
/// identifier.
pub fn locate_metadata_region(window: &[u8]) -> Result<u64> {
    parse_region_entries(window)
        .iter()
        .find(|entry| entry.is_metadata())
        .map(|entry| entry.file_offset)
        .ok_or(Error::RegionNotFound)
}

/// The parsed region table.
#[derive(Debug, Clone)]
pub struct RegionTable {
    /// Table header.
    pub header: RegionTableHeader,
    /// Entries in on-disk order.
    pub entries: Vec<RegionTableEntry>,
}

impl RegionTable {
    /// Returns the metadata region entry.
    pub fn metadata_region(&self) -> Result<&RegionTableEntry> {
        self.entries
            .iter()
            .find(|entry| entry.is_metadata())
            .ok_or(Error::RegionNotFound)
    }

    /// Returns the absolute offset of the metadata region.
    pub fn metadata_offset(&self) -> Result<u64> {
        self.metadata_region().map(|entry| entry.file_offset)
    }
}

/// Reads the region table from the container.
pub fn read_region_table(source: &ImageSource) -> Result<RegionTable> {
    let header = RegionTableHeader::from_bytes(
        source.read_at(REGION_TABLE_OFFSET, REGION_TABLE_HEADER_SIZE)?,
    )?;
    let entries_offset = REGION_TABLE_OFFSET + REGION_TABLE_HEADER_SIZE as u64;
    let wanted = header.slots() * REGION_ENTRY_SIZE;

    // The two-slot window is mandatory; declared entries past the end of the
    // image are dropped rather than failing the decode.
    let available = usize::try_from(source.size().saturating_sub(entries_offset))
        .unwrap_or(usize::MAX);
    let len = wanted
        .min(available)
        .max(LEGACY_REGION_SLOTS * REGION_ENTRY_SIZE);
    if len < wanted {
        warn!(
            declared = header.entry_count,
            available_slots = len / REGION_ENTRY_SIZE,
            "region table runs past end of image, scanning available slots"
        );
    }

    let window = source.read_at(entries_offset, len)?;
    let entries = parse_region_entries(window);

    debug!(
        declared = header.entry_count,
        read = entries.len(),
        "read region table"
    );
    for entry in &entries {
        debug!(
            guid = %entry.guid,
            kind = entry.kind(),
            file_offset = entry.file_offset,
            length = entry.length,
            "region entry"
        );
    }

    Ok(RegionTable { header, entries })
}
