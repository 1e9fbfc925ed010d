use std::{fs::File, sync::RwLock};

use log::debug;
use memmap2::{Mmap, MmapMut, MmapOptions};

use super::{
    AccessMode, ByteStore, DEFAULT_SEGMENT_SIZE, check_readable, check_span, check_writable,
};
use crate::{Error, Result};

#[derive(Debug)]
enum Segment {
    ReadOnly(Mmap),
    Writable(RwLock<MmapMut>),
}

/// A region of a file mapped into memory.
///
/// Regions longer than the segment size are mapped as several consecutive segments,
/// and transfers spanning a segment boundary are split transparently.
#[derive(Debug)]
pub struct MmapStore {
    segments: Vec<Segment>,
    segment_size: u64,
    len: u64,
    mode: AccessMode,
}

impl MmapStore {
    /// Map `len` bytes of `file` from `start` using [`DEFAULT_SEGMENT_SIZE`] segments.
    ///
    /// Writable modes need the file opened for both reading and writing.
    pub fn new(file: &File, start: u64, len: u64, mode: AccessMode) -> Result<Self> {
        Self::with_segment_size(file, start, len, mode, DEFAULT_SEGMENT_SIZE)
    }

    pub fn with_segment_size(
        file: &File,
        start: u64,
        len: u64,
        mode: AccessMode,
        segment_size: u64,
    ) -> Result<Self> {
        if segment_size == 0 || usize::try_from(segment_size).is_err() {
            return Err(Error::invalid(format!(
                "segment size {segment_size} is not mappable"
            )));
        }
        let file_len = file.metadata()?.len();
        if start.checked_add(len).is_none_or(|end| end > file_len) {
            return Err(Error::invalid(format!(
                "region of {len} bytes at {start} beyond file of {file_len} bytes"
            )));
        }
        let mut segments = Vec::new();
        let mut mapped = 0;
        while mapped < len {
            let seg_len = segment_size.min(len - mapped);
            let mut opts = MmapOptions::new();
            opts.offset(start + mapped).len(seg_len as usize);
            // SAFETY: the mapping is only reached through this store's methods, which
            // bounds-check every transfer; concurrent truncation of the file by another
            // process is outside the guarantees memory mapping can give.
            let segment = if mode.is_writable() {
                Segment::Writable(RwLock::new(unsafe { opts.map_mut(file)? }))
            } else {
                Segment::ReadOnly(unsafe { opts.map(file)? })
            };
            segments.push(segment);
            mapped += seg_len;
        }
        debug!(
            "mapped {} bytes at {} in {} segment(s)",
            len,
            start,
            segments.len()
        );
        Ok(Self {
            segments,
            segment_size,
            len,
            mode,
        })
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    /// Split `len` bytes from `pos` into (segment, offset in segment, offset in transfer, length).
    fn pieces(&self, pos: u64, len: usize) -> impl Iterator<Item = (usize, usize, usize, usize)> {
        let seg_size = self.segment_size;
        let mut done = 0usize;
        std::iter::from_fn(move || {
            if done >= len {
                return None;
            }
            let at = pos + done as u64;
            let seg = (at / seg_size) as usize;
            let seg_off = (at % seg_size) as usize;
            let n = ((seg_size as usize) - seg_off).min(len - done);
            let piece = (seg, seg_off, done, n);
            done += n;
            Some(piece)
        })
    }
}

impl ByteStore for MmapStore {
    fn len(&self) -> u64 {
        self.len
    }

    fn mode(&self) -> AccessMode {
        self.mode
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        check_readable(self.mode)?;
        check_span(pos, buf.len(), self.len)?;
        for (seg, seg_off, done, n) in self.pieces(pos, buf.len()) {
            let dst = &mut buf[done..done + n];
            match &self.segments[seg] {
                Segment::ReadOnly(m) => dst.copy_from_slice(&m[seg_off..seg_off + n]),
                Segment::Writable(m) => dst.copy_from_slice(&m.read()?[seg_off..seg_off + n]),
            }
        }
        Ok(())
    }

    fn write_at(&self, pos: u64, data: &[u8]) -> Result<()> {
        check_writable(self.mode)?;
        check_span(pos, data.len(), self.len)?;
        for (seg, seg_off, done, n) in self.pieces(pos, data.len()) {
            match &self.segments[seg] {
                Segment::Writable(m) => {
                    m.write()?[seg_off..seg_off + n].copy_from_slice(&data[done..done + n])
                }
                Segment::ReadOnly(_) => {
                    return Err(Error::unsupported("segment was mapped read-only"));
                }
            }
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        for segment in self.segments.iter() {
            if let Segment::Writable(m) = segment {
                m.read()?.flush()?;
            }
        }
        Ok(())
    }
}
