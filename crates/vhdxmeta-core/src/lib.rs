//! vhdxmeta Core Library
//!
//! This crate decodes the metadata region of VHDX/AVHDX virtual disk
//! containers into a [`Metadata`] record.
//!
//! # Overview
//!
//! The decode walks the container in a single pass: the region table names
//! the metadata region, whose table lists the metadata items. Each known item
//! is decoded from its fixed layout. The main entry point is [`decode_file`].
//!
//! # Modules
//!
//! - [`error`] - Error types and Result alias
//! - [`vhdx`] - On-disk structures (GUIDs, region table, metadata table, items)
//! - [`metadata`] - The decoded metadata record and its serialization
//! - [`decode`] - Decode orchestrator
//!
//! # Quick Start
//!
//! ```no_run
//! use vhdxmeta_core::{decode_file, DecodeOptions};
//! use std::path::Path;
//!
//! let metadata = decode_file(Path::new("/path/to/disk.avhdx"), &DecodeOptions::default()).unwrap();
//! println!("block size: {}", metadata.block_size);
//! ```

pub mod decode;
pub mod error;
pub mod metadata;
pub mod vhdx;

pub use error::{Error, Result};

// Re-export main decode functionality for convenience
pub use decode::{
    decode_file, decode_source, inspect_file, inspect_source, DecodeOptions, EntryDetail,
    ImageLayout,
};
pub use metadata::Metadata;
