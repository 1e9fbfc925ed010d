use std::{fmt, sync::Arc};

use super::{AccessImpl, ArrayImpl};
use crate::{
    BadHandler, Buffer, Element, Error, OrderedShape, Result, Type, types::with_element,
};

type PixelFn = Arc<dyn Fn(u64) -> f64 + Send + Sync>;

/// A read-only array whose pixel values are a pure function of their offset.
///
/// Values which are NaN or not representable in the array's type read as bad.
/// There is no backing storage; random and multi-access.
#[derive(Clone)]
pub struct GeneratorArrayImpl {
    shape: OrderedShape,
    bad_handler: BadHandler,
    func: PixelFn,
}

impl GeneratorArrayImpl {
    pub fn new<F>(shape: OrderedShape, bad_handler: BadHandler, func: F) -> Self
    where
        F: Fn(u64) -> f64 + Send + Sync + 'static,
    {
        Self {
            shape,
            bad_handler,
            func: Arc::new(func),
        }
    }

    /// Pixel values cycling through `0..period` with the offset.
    pub fn ramp(shape: OrderedShape, data_type: Type, period: u64) -> Result<Self> {
        if period == 0 {
            return Err(Error::invalid("ramp period must be positive"));
        }
        Ok(Self::new(
            shape,
            data_type.default_bad_handler(),
            move |offset| (offset % period) as f64,
        ))
    }

    /// The value the generator gives at `offset`, before conversion to the array's type.
    pub fn value_at(&self, offset: u64) -> f64 {
        (self.func)(offset)
    }
}

impl fmt::Debug for GeneratorArrayImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorArrayImpl")
            .field("shape", &self.shape)
            .field("bad_handler", &self.bad_handler)
            .finish_non_exhaustive()
    }
}

impl ArrayImpl for GeneratorArrayImpl {
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
        false
    }

    fn is_random(&self) -> bool {
        true
    }

    fn multiple_access(&self) -> bool {
        true
    }

    fn access(&self) -> Result<Box<dyn AccessImpl>> {
        Ok(Box::new(GeneratorAccess {
            bad_handler: self.bad_handler.clone(),
            func: self.func.clone(),
            offset: 0,
        }))
    }
}

struct GeneratorAccess {
    bad_handler: BadHandler,
    func: PixelFn,
    offset: u64,
}

impl GeneratorAccess {
    fn fill<T: Element>(&self, buf: &mut Buffer, start: usize, len: usize) -> Result<()> {
        let bad = self.bad_handler.typed::<T>()?;
        let slice = T::slice_mut(buf)
            .ok_or_else(|| Error::invalid("buffer type does not match generator"))?;
        for (i, v) in slice[start..start + len].iter_mut().enumerate() {
            let x = (self.func)(self.offset + i as u64);
            *v = if x.is_nan() {
                bad.bad_value()
            } else {
                T::from_f64(x).unwrap_or(bad.bad_value())
            };
        }
        Ok(())
    }
}

impl AccessImpl for GeneratorAccess {
    fn set_offset(&mut self, offset: u64) -> Result<()> {
        self.offset = offset;
        Ok(())
    }

    fn read(&mut self, buf: &mut Buffer, start: usize, len: usize) -> Result<()> {
        with_element!(self.bad_handler.data_type(), T => self.fill::<T>(buf, start, len))?;
        self.offset += len as u64;
        Ok(())
    }

    fn write(&mut self, _buf: &Buffer, _start: usize, _len: usize) -> Result<()> {
        Err(Error::unsupported("generated arrays are read-only"))
    }
}
