//! VHDX on-disk structures.
//!
//! This module walks the container from the region table down to the
//! individual metadata items. All multi-byte integers are little-endian.

pub mod fields;
pub mod guid;
pub mod locator;
pub mod region;
pub mod source;
pub mod table;

pub use fields::{decode_field, FieldTable, FieldValue, KnownField};
pub use guid::{Guid, GUID_SIZE};
pub use locator::{decode_parent_locator, KeyValueEntry, ParentLocator, ParentLocatorHeader};
pub use region::{
    locate_metadata_region, parse_region_entries, read_region_table, RegionTable,
    RegionTableEntry, RegionTableHeader, BAT_REGION, HEADER_BLOCK_SIZE, METADATA_REGION,
    REGION_TABLE_OFFSET,
};
pub use source::ImageSource;
pub use table::{
    read_metadata_table, MetadataTable, MetadataTableEntry, MetadataTableHeader,
    METADATA_SIGNATURE,
};

#[inline]
pub(crate) fn le_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

#[inline]
pub(crate) fn le_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[inline]
pub(crate) fn le_u64(data: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
        data[offset + 4],
        data[offset + 5],
        data[offset + 6],
        data[offset + 7],
    ])
}
