//! Metadata item dispatch.
//!
//! Each metadata table entry is matched by identifier against a table of
//! known items. Matched payloads are read at the region offset plus the
//! entry offset and decoded according to the item's fixed layout; unknown
//! identifiers are skipped.

use std::fmt;

use rayon::prelude::*;
use tracing::{debug, trace};

use super::guid::Guid;
use super::locator::{decode_parent_locator, ParentLocator};
use super::source::ImageSource;
use super::table::{MetadataTable, MetadataTableEntry};
use super::{le_u32, le_u64};
use crate::error::{Error, Result};

/// File Parameters item identifier.
pub const FILE_PARAMETERS: &str = "CAA16737-FA36-4D43-B3B6-33F0AA44E76B";
/// Virtual Disk Size item identifier.
pub const VIRTUAL_DISK_SIZE: &str = "2FA54224-CD1B-4876-B211-5DBED83BF4B8";
/// Virtual Disk ID item identifier.
pub const VIRTUAL_DISK_ID: &str = "BECA12AB-B2E6-4523-93EF-C309E000C746";
/// Logical Sector Size item identifier.
pub const LOGICAL_SECTOR_SIZE: &str = "8141BF1D-A96F-4709-BA47-F233A8FAAB5F";
/// Physical Sector Size item identifier.
pub const PHYSICAL_SECTOR_SIZE: &str = "CDA348C7-445D-4471-9CC9-E9885251C556";
/// Parent Locator item identifier.
pub const PARENT_LOCATOR: &str = "A8D35F2D-B30B-454D-ABF7-D3D84834AB0C";

/// A metadata item this crate knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownField {
    FileParameters,
    VirtualDiskSize,
    VirtualDiskId,
    LogicalSectorSize,
    PhysicalSectorSize,
    ParentLocator,
}

impl KnownField {
    /// Every known item, in table order.
    pub const ALL: [KnownField; 6] = [
        KnownField::FileParameters,
        KnownField::VirtualDiskSize,
        KnownField::VirtualDiskId,
        KnownField::LogicalSectorSize,
        KnownField::PhysicalSectorSize,
        KnownField::ParentLocator,
    ];

    /// Canonical identifier text.
    pub fn guid_text(self) -> &'static str {
        match self {
            KnownField::FileParameters => FILE_PARAMETERS,
            KnownField::VirtualDiskSize => VIRTUAL_DISK_SIZE,
            KnownField::VirtualDiskId => VIRTUAL_DISK_ID,
            KnownField::LogicalSectorSize => LOGICAL_SECTOR_SIZE,
            KnownField::PhysicalSectorSize => PHYSICAL_SECTOR_SIZE,
            KnownField::ParentLocator => PARENT_LOCATOR,
        }
    }

    /// Fewest payload bytes the fixed layout needs.
    pub fn min_length(self) -> usize {
        match self {
            KnownField::FileParameters => 7,
            KnownField::VirtualDiskSize => 8,
            KnownField::VirtualDiskId => 16,
            KnownField::LogicalSectorSize | KnownField::PhysicalSectorSize => 4,
            KnownField::ParentLocator => 0,
        }
    }
}

impl fmt::Display for KnownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnownField::FileParameters => write!(f, "File Parameters"),
            KnownField::VirtualDiskSize => write!(f, "Virtual Disk Size"),
            KnownField::VirtualDiskId => write!(f, "Virtual Disk ID"),
            KnownField::LogicalSectorSize => write!(f, "Logical Sector Size"),
            KnownField::PhysicalSectorSize => write!(f, "Physical Sector Size"),
            KnownField::ParentLocator => write!(f, "Parent Locator"),
        }
    }
}

/// Lookup table from on-disk identifier to known item.
#[derive(Debug, Clone)]
pub struct FieldTable {
    fields: Vec<(Guid, KnownField)>,
}

impl FieldTable {
    /// Builds the table of standard VHDX metadata items.
    pub fn standard() -> Result<Self> {
        let mut fields = Vec::with_capacity(KnownField::ALL.len());
        for field in KnownField::ALL {
            fields.push((Guid::parse(field.guid_text())?, field));
        }
        Ok(Self { fields })
    }

    /// Returns the known item with this identifier, if any.
    pub fn lookup(&self, id: &Guid) -> Option<KnownField> {
        self.fields
            .iter()
            .find(|(guid, _)| guid == id)
            .map(|&(_, field)| field)
    }
}

/// A decoded metadata item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    FileParameters {
        block_size: u32,
        leave_block_allocated: u8,
        has_parent: u8,
    },
    VirtualDiskSize(u64),
    VirtualDiskId(Guid),
    LogicalSectorSize(u32),
    PhysicalSectorSize(u32),
    ParentLocator(ParentLocator),
}

/// Decodes a payload read from absolute `offset` as `field`.
///
/// # Errors
///
/// Returns [`Error::TruncatedRead`] if the payload is shorter than the
/// field's fixed layout.
pub fn decode_field(field: KnownField, payload: &[u8], offset: u64) -> Result<FieldValue> {
    if payload.len() < field.min_length() {
        return Err(Error::truncated(
            offset,
            field.min_length() as u64,
            payload.len() as u64,
        ));
    }

    let value = match field {
        KnownField::FileParameters => FieldValue::FileParameters {
            block_size: le_u32(payload, 0),
            leave_block_allocated: payload[5],
            has_parent: payload[6],
        },
        KnownField::VirtualDiskSize => FieldValue::VirtualDiskSize(le_u64(payload, 0)),
        KnownField::VirtualDiskId => FieldValue::VirtualDiskId(Guid::from_slice(payload)),
        KnownField::LogicalSectorSize => FieldValue::LogicalSectorSize(le_u32(payload, 0)),
        KnownField::PhysicalSectorSize => FieldValue::PhysicalSectorSize(le_u32(payload, 0)),
        KnownField::ParentLocator => FieldValue::ParentLocator(decode_parent_locator(payload)),
    };

    Ok(value)
}

/// Reads and decodes one entry's payload.
pub fn read_field(
    source: &ImageSource,
    region_offset: u64,
    entry: &MetadataTableEntry,
    field: KnownField,
) -> Result<FieldValue> {
    let offset = entry.payload_offset(region_offset);
    let payload = source.read_at(offset, entry.length as usize)?;
    let value = decode_field(field, payload, offset)?;

    debug!(%field, offset, length = entry.length, "decoded metadata item");
    Ok(value)
}

/// Decodes every known entry of `table`, in on-disk order.
///
/// With `parallel` set the payloads are decoded on the rayon pool; each read
/// is positional, and results keep entry order.
pub fn dispatch_entries(
    source: &ImageSource,
    table: &MetadataTable,
    fields: &FieldTable,
    parallel: bool,
) -> Result<Vec<FieldValue>> {
    let matched: Vec<(&MetadataTableEntry, KnownField)> = table
        .entries
        .iter()
        .filter_map(|entry| match fields.lookup(&entry.item_id) {
            Some(field) => Some((entry, field)),
            None => {
                trace!(item_id = %entry.item_id, "skipping unknown metadata item");
                None
            }
        })
        .collect();

    let region_offset = table.region_offset;
    if parallel {
        matched
            .par_iter()
            .map(|&(entry, field)| read_field(source, region_offset, entry, field))
            .collect()
    } else {
        matched
            .iter()
            .map(|&(entry, field)| read_field(source, region_offset, entry, field))
            .collect()
    }
}
