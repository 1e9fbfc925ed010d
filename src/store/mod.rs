//! Contiguous byte regions which typed arrays can be laid over.
use std::fmt::Debug;

use crate::{Error, Result};

mod memory;
pub use memory::MemoryStore;
mod file;
pub use file::FileStore;
mod mmap;
pub use mmap::MmapStore;

/// Largest single mapping [`MmapStore`] makes; longer regions are mapped in segments.
pub const DEFAULT_SEGMENT_SIZE: u64 = 1 << 30;

/// How an array or byte region may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
    Update,
}

impl AccessMode {
    pub fn is_readable(self) -> bool {
        matches!(self, AccessMode::Read | AccessMode::Update)
    }

    pub fn is_writable(self) -> bool {
        matches!(self, AccessMode::Write | AccessMode::Update)
    }

    /// The mode allowing exactly the given capabilities, if any.
    pub fn from_flags(readable: bool, writable: bool) -> Option<Self> {
        match (readable, writable) {
            (true, true) => Some(AccessMode::Update),
            (true, false) => Some(AccessMode::Read),
            (false, true) => Some(AccessMode::Write),
            (false, false) => None,
        }
    }
}

/// A fixed-length, randomly addressable region of bytes.
///
/// Positions are relative to the start of the region.
/// Implementations are shared between cursors, so all methods take `&self`.
pub trait ByteStore: Debug + Send + Sync {
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn mode(&self) -> AccessMode;

    /// Fill `buf` with the bytes starting at `pos`.
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<()>;

    /// Overwrite the bytes starting at `pos` with `data`.
    fn write_at(&self, pos: u64, data: &[u8]) -> Result<()>;

    /// Push any buffered writes to the underlying medium.
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Whether independent cursors may interleave transfers.
    fn multiple_access(&self) -> bool {
        true
    }
}

/// Fail unless `len` bytes from `pos` lie within a region of `total` bytes.
pub(crate) fn check_span(pos: u64, len: usize, total: u64) -> Result<()> {
    match pos.checked_add(len as u64) {
        Some(end) if end <= total => Ok(()),
        _ => Err(Error::out_of_bounds(format!(
            "bytes {}..{} beyond region of {} bytes",
            pos,
            pos.saturating_add(len as u64),
            total
        ))),
    }
}

pub(crate) fn check_readable(mode: AccessMode) -> Result<()> {
    if mode.is_readable() {
        Ok(())
    } else {
        Err(Error::unsupported("byte store is not readable"))
    }
}

pub(crate) fn check_writable(mode: AccessMode) -> Result<()> {
    if mode.is_writable() {
        Ok(())
    } else {
        Err(Error::unsupported("byte store is not writable"))
    }
}
