use super::{AccessImpl, ArrayImpl};
use crate::{
    ArrayAccess, BadHandler, Buffer, Error, NdArray, OrderedShape, Result, Shape, Type,
    shape::{RunIter, clip_run},
};

/// Presents a rectangular window onto another array, in the base array's pixel order.
///
/// Window pixels outside the base read as bad, and writes to them are discarded.
/// The base must support random access.
#[derive(Debug, Clone)]
pub struct WindowArrayImpl {
    base: NdArray,
    shape: OrderedShape,
}

impl WindowArrayImpl {
    pub fn new(base: NdArray, window: Shape) -> Result<Self> {
        if window.ndim() != base.shape().ndim() {
            return Err(Error::invalid(format!(
                "{}-dimensional window on {}",
                window.ndim(),
                base
            )));
        }
        if !base.is_random() {
            return Err(Error::unsupported(format!(
                "cannot window {} without random access",
                base
            )));
        }
        let shape = OrderedShape::new(window, base.shape().order());
        Ok(Self { base, shape })
    }

    pub fn base(&self) -> &NdArray {
        &self.base
    }
}

impl ArrayImpl for WindowArrayImpl {
    fn shape(&self) -> &OrderedShape {
        &self.shape
    }

    fn data_type(&self) -> Type {
        self.base.data_type()
    }

    fn bad_handler(&self) -> &BadHandler {
        self.base.bad_handler()
    }

    fn is_readable(&self) -> bool {
        self.base.is_readable()
    }

    fn is_writable(&self) -> bool {
        self.base.is_writable()
    }

    fn is_random(&self) -> bool {
        true
    }

    fn multiple_access(&self) -> bool {
        self.base.multiple_access()
    }

    fn access(&self) -> Result<Box<dyn AccessImpl>> {
        Ok(Box::new(WindowAccess {
            base: self.base.access()?,
            shape: self.shape.clone(),
            inner: self.base.shape().shape().clone(),
            bad_handler: self.base.bad_handler().clone(),
            offset: 0,
        }))
    }
}

struct WindowAccess {
    base: ArrayAccess,
    shape: OrderedShape,
    inner: Shape,
    bad_handler: BadHandler,
    offset: u64,
}

impl AccessImpl for WindowAccess {
    fn set_offset(&mut self, offset: u64) -> Result<()> {
        self.offset = offset;
        Ok(())
    }

    fn read(&mut self, buf: &mut Buffer, start: usize, len: usize) -> Result<()> {
        self.bad_handler.put_bad_range(buf, start, len)?;
        let axis = self.shape.fastest_axis();
        for run in RunIter::new(&self.shape, self.offset, len as u64) {
            if let Some((skip, n)) = clip_run(&run, axis, &self.inner) {
                let mut pos = run.position;
                pos[axis] += skip as i64;
                self.base.set_position(&pos)?;
                self.base
                    .read(buf, start + (run.index + skip) as usize, n as usize)?;
            }
        }
        self.offset += len as u64;
        Ok(())
    }

    fn write(&mut self, buf: &Buffer, start: usize, len: usize) -> Result<()> {
        let axis = self.shape.fastest_axis();
        for run in RunIter::new(&self.shape, self.offset, len as u64) {
            if let Some((skip, n)) = clip_run(&run, axis, &self.inner) {
                let mut pos = run.position;
                pos[axis] += skip as i64;
                self.base.set_position(&pos)?;
                self.base
                    .write(buf, start + (run.index + skip) as usize, n as usize)?;
            }
        }
        self.offset += len as u64;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.base.close()
    }
}
