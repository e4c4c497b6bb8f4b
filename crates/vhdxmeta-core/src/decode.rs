//! Decode orchestrator.
//!
//! This module runs the full metadata walk:
//! 1. Read the region table and find the metadata region
//! 2. Read the metadata table header and its entry descriptors
//! 3. Decode every known entry and fold it into a [`Metadata`] record
//!
//! # Example
//!
//! ```no_run
//! use vhdxmeta_core::decode::{decode_file, DecodeOptions};
//! use std::path::Path;
//!
//! let metadata = decode_file(Path::new("/path/to/disk.avhdx"), &DecodeOptions::default()).unwrap();
//! println!("{}", metadata.to_json().unwrap());
//! ```

use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;
use crate::metadata::Metadata;
use crate::vhdx::fields::dispatch_entries;
use crate::vhdx::{
    read_metadata_table, read_region_table, FieldTable, ImageSource, KnownField, MetadataTable,
    MetadataTableEntry, RegionTable,
};

/// Options for the decode process.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Reject a metadata table whose signature is not `metadata`.
    pub verify_signature: bool,
    /// Decode metadata items on the rayon thread pool.
    pub parallel: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            verify_signature: true,
            parallel: false,
        }
    }
}

impl DecodeOptions {
    /// Create decode options with specified settings.
    pub fn new(verify_signature: bool, parallel: bool) -> Self {
        Self {
            verify_signature,
            parallel,
        }
    }

    /// Create options that accept any metadata table signature.
    pub fn lenient() -> Self {
        Self {
            verify_signature: false,
            ..Self::default()
        }
    }

    /// Create options that decode items in parallel.
    pub fn parallel() -> Self {
        Self {
            parallel: true,
            ..Self::default()
        }
    }
}

/// Decode the metadata of the container at `path`.
///
/// # Errors
///
/// Any structural read failure aborts the decode; no partial record is
/// returned.
pub fn decode_file(path: &Path, options: &DecodeOptions) -> Result<Metadata> {
    let source = ImageSource::open(path)?;
    info!(path = %path.display(), size = source.size(), "decoding metadata");
    decode_source(&source, options)
}

/// Decode the metadata of an already opened container.
pub fn decode_source(source: &ImageSource, options: &DecodeOptions) -> Result<Metadata> {
    let regions = read_region_table(source)?;
    let region_offset = regions.metadata_offset()?;
    let table = read_metadata_table(source, region_offset, options.verify_signature)?;

    let fields = FieldTable::standard()?;
    let values = dispatch_entries(source, &table, &fields, options.parallel)?;
    debug!(
        entries = table.entries.len(),
        decoded = values.len(),
        "dispatched metadata entries"
    );

    Ok(Metadata::from_values(values))
}

/// One metadata table entry together with the item it was recognized as.
#[derive(Debug, Clone)]
pub struct EntryDetail {
    /// The raw entry descriptor.
    pub entry: MetadataTableEntry,
    /// The known item, or `None` for unrecognized identifiers.
    pub field: Option<KnownField>,
    /// Absolute payload offset.
    pub payload_offset: u64,
}

/// Structural layout of a container's metadata.
#[derive(Debug, Clone)]
pub struct ImageLayout {
    /// Size of the container in bytes.
    pub file_size: u64,
    /// The region table.
    pub regions: RegionTable,
    /// The metadata table.
    pub table: MetadataTable,
    /// Each entry with its recognized item.
    pub entries: Vec<EntryDetail>,
}

/// Read the region and metadata tables of the container at `path` without
/// decoding item payloads.
pub fn inspect_file(path: &Path, options: &DecodeOptions) -> Result<ImageLayout> {
    let source = ImageSource::open(path)?;
    inspect_source(&source, options)
}

/// Read the region and metadata tables of an already opened container.
pub fn inspect_source(source: &ImageSource, options: &DecodeOptions) -> Result<ImageLayout> {
    let regions = read_region_table(source)?;
    let region_offset = regions.metadata_offset()?;
    let table = read_metadata_table(source, region_offset, options.verify_signature)?;
    let fields = FieldTable::standard()?;

    let entries = table
        .entries
        .iter()
        .map(|entry| EntryDetail {
            entry: *entry,
            field: fields.lookup(&entry.item_id),
            payload_offset: entry.payload_offset(region_offset),
        })
        .collect();

    Ok(ImageLayout {
        file_size: source.size(),
        regions,
        table,
        entries,
    })
}
