//! Sandbox linear memory.
//!
//! A backend module owns one fixed, growable, byte-addressable memory
//! region with page granularity. The rotate preprocessor marshals pixel
//! buffers through this region directly, so reads and writes are
//! bounds-checked ranges rather than raw pointer arithmetic.

use thiserror::Error;

/// Page granularity of sandbox linear memory, 64 KiB.
pub const PAGE_SIZE: usize = 64 * 1024;

/// Out-of-range access against a [`LinearMemory`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("linear memory access out of bounds: {len} bytes at offset {offset} exceed size {size}")]
pub struct MemoryError {
    pub offset: usize,
    pub len: usize,
    pub size: usize,
}

/// Zero-filled, page-granular byte region owned by one module instance.
#[derive(Clone, Debug)]
pub struct LinearMemory {
    bytes: Vec<u8>,
}

impl LinearMemory {
    /// Memory spanning `pages` zero-filled pages.
    pub fn with_pages(pages: usize) -> Self {
        Self {
            bytes: vec![0; pages * PAGE_SIZE],
        }
    }

    /// Current size in bytes. Always a multiple of [`PAGE_SIZE`].
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the memory spans zero pages.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Current size in pages.
    pub fn page_count(&self) -> usize {
        self.bytes.len() / PAGE_SIZE
    }

    /// Grow by `additional_pages` zero-filled pages.
    pub fn grow(&mut self, additional_pages: usize) {
        self.bytes
            .resize(self.bytes.len() + additional_pages * PAGE_SIZE, 0);
    }

    /// Grow so the memory holds at least `min_bytes`, a whole number of
    /// pages at a time. Returns the number of pages added (zero when the
    /// memory is already large enough).
    pub fn grow_to_fit(&mut self, min_bytes: usize) -> usize {
        let deficit = min_bytes.saturating_sub(self.bytes.len());
        let pages = deficit.div_ceil(PAGE_SIZE);
        if pages > 0 {
            self.grow(pages);
        }
        pages
    }

    /// Read `len` bytes starting at `offset`.
    pub fn read(&self, offset: usize, len: usize) -> Result<&[u8], MemoryError> {
        let end = offset.checked_add(len).ok_or(MemoryError {
            offset,
            len,
            size: self.bytes.len(),
        })?;
        self.bytes.get(offset..end).ok_or(MemoryError {
            offset,
            len,
            size: self.bytes.len(),
        })
    }

    /// Write `data` starting at `offset`.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), MemoryError> {
        let size = self.bytes.len();
        let end = offset.checked_add(data.len()).ok_or(MemoryError {
            offset,
            len: data.len(),
            size,
        })?;
        let dst = self.bytes.get_mut(offset..end).ok_or(MemoryError {
            offset,
            len: data.len(),
            size,
        })?;
        dst.copy_from_slice(data);
        Ok(())
    }
}
