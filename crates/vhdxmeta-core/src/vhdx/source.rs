//! Positional byte source for container images.
//!
//! Container files are memory-mapped read-only, so every structure is read at
//! an absolute offset without a shared cursor. In-memory images are supported
//! for callers that already hold the bytes.

use crate::error::{Error, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

/// A read-only view of a VHDX container image.
///
/// # Example
///
/// ```no_run
/// use vhdxmeta_core::vhdx::source::ImageSource;
/// use std::path::Path;
///
/// let source = ImageSource::open(Path::new("disk.vhdx")).unwrap();
/// let region_table_header = source.read_at(3 * 65536, 16).unwrap();
/// assert_eq!(region_table_header.len(), 16);
/// ```
pub struct ImageSource {
    backing: Backing,
}

impl ImageSource {
    /// Opens a container file and maps it into memory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file does not exist
    /// - The file cannot be opened (permissions, etc.)
    /// - Memory mapping fails
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(e, path))?;

        let size = file.metadata().map_err(|e| Error::io(e, path))?.len();
        if size == 0 {
            // Nothing to map; every read will report truncation.
            return Ok(Self::from_bytes(Vec::new()));
        }

        // Safety: the file is opened read-only and the map is never written.
        // Concurrent truncation by another process is outside our control.
        let mmap = unsafe { Mmap::map(&file).map_err(|e| Error::io(e, path))? };

        Ok(Self {
            backing: Backing::Mapped(mmap),
        })
    }

    /// Wraps an in-memory image.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            backing: Backing::Owned(data),
        }
    }

    /// Returns the full image contents.
    #[inline]
    pub fn data(&self) -> &[u8] {
        match &self.backing {
            Backing::Mapped(mmap) => &mmap[..],
            Backing::Owned(data) => data.as_slice(),
        }
    }

    /// Returns the image size in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.data().len() as u64
    }

    /// Returns exactly `len` bytes starting at the absolute `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TruncatedRead`] when the image ends before
    /// `offset + len`, reporting how many bytes were actually available.
    pub fn read_at(&self, offset: u64, len: usize) -> Result<&[u8]> {
        let data = self.data();
        let size = data.len() as u64;
        let available = size.saturating_sub(offset);

        if available < len as u64 {
            return Err(Error::truncated(offset, len as u64, available));
        }

        let start = offset as usize;
        Ok(&data[start..start + len])
    }
}
