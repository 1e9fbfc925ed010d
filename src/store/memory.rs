use std::sync::RwLock;

use super::{AccessMode, ByteStore, check_readable, check_span, check_writable};
use crate::Result;

/// A byte region held in memory.
#[derive(Debug)]
pub struct MemoryStore {
    data: RwLock<Vec<u8>>,
    mode: AccessMode,
}

impl MemoryStore {
    /// A zero-filled region of `len` bytes.
    pub fn new(len: usize, mode: AccessMode) -> Self {
        Self::from_bytes(vec![0; len], mode)
    }

    pub fn from_bytes(bytes: Vec<u8>, mode: AccessMode) -> Self {
        Self {
            data: RwLock::new(bytes),
            mode,
        }
    }

    /// A copy of the current contents.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        Ok(self.data.read()?.clone())
    }
}

impl ByteStore for MemoryStore {
    fn len(&self) -> u64 {
        self.data.read().map_or(0, |d| d.len() as u64)
    }

    fn mode(&self) -> AccessMode {
        self.mode
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        check_readable(self.mode)?;
        let data = self.data.read()?;
        check_span(pos, buf.len(), data.len() as u64)?;
        let start = pos as usize;
        buf.copy_from_slice(&data[start..start + buf.len()]);
        Ok(())
    }

    fn write_at(&self, pos: u64, bytes: &[u8]) -> Result<()> {
        check_writable(self.mode)?;
        let mut data = self.data.write()?;
        check_span(pos, bytes.len(), data.len() as u64)?;
        let start = pos as usize;
        data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}
