use std::sync::Arc;

use super::{AccessImpl, ArrayImpl};
use crate::{
    ArrayAccess, BadHandler, Buffer, Converter, Error, NdArray, OrderedShape, Result, SharedBuffer,
    Type,
};

/// Presents another array converted to a different type and/or bad-value handling.
///
/// Reads convert from the base's representation with [`Converter::convert12`];
/// writes convert back with [`Converter::convert21`].
/// Capabilities are those of the base.
#[derive(Debug, Clone)]
pub struct ConvertArrayImpl {
    base: NdArray,
    converter: Arc<dyn Converter>,
}

impl ConvertArrayImpl {
    /// Fails unless the converter's first side matches the base array.
    pub fn new(base: NdArray, converter: Arc<dyn Converter>) -> Result<Self> {
        if converter.bad_handler1() != base.bad_handler() {
            return Err(Error::invalid(format!(
                "converter from {} cannot read {}",
                converter.bad_handler1(),
                base
            )));
        }
        Ok(Self { base, converter })
    }

    pub fn base(&self) -> &NdArray {
        &self.base
    }

    pub fn converter(&self) -> &Arc<dyn Converter> {
        &self.converter
    }
}

impl ArrayImpl for ConvertArrayImpl {
    fn shape(&self) -> &OrderedShape {
        self.base.shape()
    }

    fn data_type(&self) -> Type {
        self.converter.type2()
    }

    fn bad_handler(&self) -> &BadHandler {
        self.converter.bad_handler2()
    }

    fn is_readable(&self) -> bool {
        self.base.is_readable()
    }

    fn is_writable(&self) -> bool {
        self.base.is_writable()
    }

    fn is_random(&self) -> bool {
        self.base.is_random()
    }

    fn multiple_access(&self) -> bool {
        self.base.multiple_access()
    }

    fn can_map(&self) -> bool {
        self.converter.is_unit12() && self.base.can_map()
    }

    fn mapped(&self) -> Option<SharedBuffer> {
        if self.converter.is_unit12() {
            self.base.mapped()
        } else {
            None
        }
    }

    fn access(&self) -> Result<Box<dyn AccessImpl>> {
        let base = self.base.access()?;
        if self.converter.is_unit12() && self.converter.is_unit21() {
            return Ok(Box::new(base));
        }
        Ok(Box::new(ConvertAccess {
            base,
            converter: self.converter.clone(),
            scratch: self.converter.type1().new_buffer(0),
        }))
    }
}

struct ConvertAccess {
    base: ArrayAccess,
    converter: Arc<dyn Converter>,
    scratch: Buffer,
}

impl ConvertAccess {
    fn scratch(&mut self, len: usize) -> &mut Buffer {
        if self.scratch.len() < len {
            self.scratch = self.converter.type1().new_buffer(len);
        }
        &mut self.scratch
    }
}

impl AccessImpl for ConvertAccess {
    fn set_offset(&mut self, offset: u64) -> Result<()> {
        self.base.set_offset(offset)
    }

    fn read(&mut self, buf: &mut Buffer, start: usize, len: usize) -> Result<()> {
        self.scratch(len);
        self.base.read(&mut self.scratch, 0, len)?;
        self.converter.convert12(&self.scratch, 0, buf, start, len)
    }

    fn write(&mut self, buf: &Buffer, start: usize, len: usize) -> Result<()> {
        self.scratch(len);
        self.converter.convert21(buf, start, &mut self.scratch, 0, len)?;
        self.base.write(&self.scratch, 0, len)
    }

    fn close(&mut self) -> Result<()> {
        self.base.close()
    }
}
