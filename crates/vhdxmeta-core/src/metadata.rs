//! The decoded metadata record.

use serde::Serialize;

use crate::vhdx::{FieldValue, ParentLocator};

/// Metadata decoded from a VHDX/AVHDX container.
///
/// Serializes to a document with PascalCase field names. Flag fields carry
/// the raw byte read from the File Parameters item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Metadata {
    /// Parent locator text, empty when the disk has no parent.
    pub parent_locator_string: String,
    /// Bytes per allocation block.
    pub block_size: u32,
    /// Non-zero for differencing disks.
    pub has_parent: u8,
    /// Non-zero if blocks stay allocated (fixed disks).
    pub leave_block_allocated: u8,
    /// Logical sector size in bytes.
    pub logical_sector_size: u32,
    /// Physical sector size in bytes.
    pub physical_sector_size: u32,
    /// Virtual disk size in bytes.
    pub virtual_disk_size: u64,

    #[serde(skip)]
    parent_locator: Option<ParentLocator>,
}

impl Metadata {
    /// Folds one decoded item into the record.
    ///
    /// The virtual disk identifier is not retained.
    pub fn apply(&mut self, value: FieldValue) {
        match value {
            FieldValue::FileParameters {
                block_size,
                leave_block_allocated,
                has_parent,
            } => {
                self.block_size = block_size;
                self.leave_block_allocated = leave_block_allocated;
                self.has_parent = has_parent;
            }
            FieldValue::VirtualDiskSize(size) => self.virtual_disk_size = size,
            FieldValue::VirtualDiskId(_) => {}
            FieldValue::LogicalSectorSize(size) => self.logical_sector_size = size,
            FieldValue::PhysicalSectorSize(size) => self.physical_sector_size = size,
            FieldValue::ParentLocator(locator) => {
                self.parent_locator_string = locator.text.clone();
                self.parent_locator = Some(locator);
            }
        }
    }

    /// Builds a record from decoded items, applied in order.
    pub fn from_values(values: impl IntoIterator<Item = FieldValue>) -> Self {
        let mut metadata = Self::default();
        for value in values {
            metadata.apply(value);
        }
        metadata
    }

    /// The structured parent locator, if the image has one.
    pub fn parent_locator(&self) -> Option<&ParentLocator> {
        self.parent_locator.as_ref()
    }

    /// True if the image is a differencing disk.
    pub fn is_differencing(&self) -> bool {
        self.has_parent != 0
    }

    /// Serializes to compact JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serializes to indented JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
