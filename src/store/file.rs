use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
    sync::Mutex,
};

use log::debug;

use super::{AccessMode, ByteStore, check_readable, check_span, check_writable};
use crate::{Error, Result};

/// A region of a file, accessed by seeking.
///
/// Every transfer seeks then reads or writes under a lock,
/// so cursors sharing the store do not disturb one another's position.
#[derive(Debug)]
pub struct FileStore {
    file: Mutex<File>,
    start: u64,
    len: u64,
    mode: AccessMode,
}

impl FileStore {
    /// Open an existing file as one region, in the given mode.
    pub fn open(path: impl AsRef<Path>, mode: AccessMode) -> Result<Self> {
        let file = OpenOptions::new()
            .read(mode.is_readable())
            .write(mode.is_writable())
            .open(path.as_ref())?;
        let len = file.metadata()?.len();
        debug!("opened {} bytes of {}", len, path.as_ref().display());
        Self::new(file, 0, len, mode)
    }

    /// Create (or truncate) a file of `len` zero bytes, open for update.
    pub fn create(path: impl AsRef<Path>, len: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        file.set_len(len)?;
        debug!("created {} bytes at {}", len, path.as_ref().display());
        Self::new(file, 0, len, AccessMode::Update)
    }

    /// The `len` bytes of an open file starting at `start`.
    ///
    /// The file must have been opened with permissions matching `mode`
    /// and be at least `start + len` bytes long.
    pub fn new(file: File, start: u64, len: u64, mode: AccessMode) -> Result<Self> {
        let file_len = file.metadata()?.len();
        if start.checked_add(len).is_none_or(|end| end > file_len) {
            return Err(Error::invalid(format!(
                "region of {len} bytes at {start} beyond file of {file_len} bytes"
            )));
        }
        Ok(Self {
            file: Mutex::new(file),
            start,
            len,
            mode,
        })
    }
}

impl ByteStore for FileStore {
    fn len(&self) -> u64 {
        self.len
    }

    fn mode(&self) -> AccessMode {
        self.mode
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        check_readable(self.mode)?;
        check_span(pos, buf.len(), self.len)?;
        let mut file = self.file.lock()?;
        file.seek(SeekFrom::Start(self.start + pos))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&self, pos: u64, data: &[u8]) -> Result<()> {
        check_writable(self.mode)?;
        check_span(pos, data.len(), self.len)?;
        let mut file = self.file.lock()?;
        file.seek(SeekFrom::Start(self.start + pos))?;
        file.write_all(data)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        if self.mode.is_writable() {
            self.file.lock()?.sync_data()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_write_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        {
            let store = FileStore::create(&path, 16).unwrap();
            store.write_at(4, &[7, 8, 9]).unwrap();
            store.flush().unwrap();
        }
        let store = FileStore::open(&path, AccessMode::Read).unwrap();
        assert_eq!(store.len(), 16);
        let mut buf = [0u8; 5];
        store.read_at(3, &mut buf).unwrap();
        assert_eq!(buf, [0, 7, 8, 9, 0]);
        assert!(matches!(store.write_at(0, &[1]), Err(Error::Unsupported(_))));
        assert!(matches!(
            store.read_at(12, &mut buf),
            Err(Error::IndexOutOfBounds(_))
        ));
    }

    #[test]
    fn test_subregion() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, [0u8, 1, 2, 3, 4, 5, 6, 7]).unwrap();
        let file = File::open(&path).unwrap();
        let store = FileStore::new(file, 2, 4, AccessMode::Read).unwrap();
        let mut buf = [0u8; 4];
        store.read_at(0, &mut buf).unwrap();
        assert_eq!(buf, [2, 3, 4, 5]);

        let file = File::open(&path).unwrap();
        assert!(FileStore::new(file, 6, 4, AccessMode::Read).is_err());
    }
}
