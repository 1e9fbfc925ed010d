use std::sync::{Arc, RwLock};

use super::{AccessImpl, ArrayImpl, memory_len};
use crate::{BadHandler, Buffer, Error, OrderedShape, Result, SharedBuffer, Type};

/// An array held in a single in-memory buffer.
///
/// Readable, writable, random, multi-access and mappable.
/// Cursors share the buffer, so writes through one are immediately visible to all.
#[derive(Debug, Clone)]
pub struct ScratchArrayImpl {
    shape: OrderedShape,
    bad_handler: BadHandler,
    buffer: SharedBuffer,
}

impl ScratchArrayImpl {
    /// A zero-filled array using the type's default bad handler.
    ///
    /// Fails if the pixel count cannot be held in memory.
    pub fn new(shape: OrderedShape, data_type: Type) -> Result<Self> {
        Self::with_bad_handler(shape, data_type.default_bad_handler())
    }

    pub fn with_bad_handler(shape: OrderedShape, bad_handler: BadHandler) -> Result<Self> {
        let len = memory_len(&shape)?;
        let buffer = bad_handler.data_type().new_buffer(len);
        Ok(Self {
            shape,
            bad_handler,
            buffer: Arc::new(RwLock::new(buffer)),
        })
    }

    /// An array over existing data, which must hold exactly one element per pixel
    /// of the handler's type.
    pub fn from_buffer(
        shape: OrderedShape,
        bad_handler: BadHandler,
        buffer: Buffer,
    ) -> Result<Self> {
        let len = memory_len(&shape)?;
        bad_handler.data_type().check_buffer(&buffer, len)?;
        if buffer.len() != len {
            return Err(Error::invalid(format!(
                "buffer of {} elements for {} pixels",
                buffer.len(),
                len
            )));
        }
        Ok(Self {
            shape,
            bad_handler,
            buffer: Arc::new(RwLock::new(buffer)),
        })
    }
}

impl ArrayImpl for ScratchArrayImpl {
    fn shape(&self) -> &OrderedShape {
        &self.shape
    }

    fn data_type(&self) -> Type {
        self.bad_handler.data_type()
    }

    fn bad_handler(&self) -> &BadHandler {
        &self.bad_handler
    }

    fn is_readable(&self) -> bool {
        true
    }

    fn is_writable(&self) -> bool {
        true
    }

    fn is_random(&self) -> bool {
        true
    }

    fn multiple_access(&self) -> bool {
        true
    }

    fn can_map(&self) -> bool {
        true
    }

    fn mapped(&self) -> Option<SharedBuffer> {
        Some(self.buffer.clone())
    }

    fn access(&self) -> Result<Box<dyn AccessImpl>> {
        Ok(Box::new(ScratchAccess {
            buffer: self.buffer.clone(),
            offset: 0,
        }))
    }
}

struct ScratchAccess {
    buffer: SharedBuffer,
    offset: usize,
}

impl AccessImpl for ScratchAccess {
    fn set_offset(&mut self, offset: u64) -> Result<()> {
        self.offset = offset as usize;
        Ok(())
    }

    fn read(&mut self, buf: &mut Buffer, start: usize, len: usize) -> Result<()> {
        let data = self.buffer.read()?;
        buf.copy_from(start, &data, self.offset, len)?;
        self.offset += len;
        Ok(())
    }

    fn write(&mut self, buf: &Buffer, start: usize, len: usize) -> Result<()> {
        let mut data = self.buffer.write()?;
        data.copy_from(self.offset, buf, start, len)?;
        self.offset += len;
        Ok(())
    }
}
