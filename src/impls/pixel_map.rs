use std::{fmt, sync::Arc};

use super::{AccessImpl, ArrayImpl};
use crate::{
    ArrayAccess, BadHandler, Buffer, Error, NdArray, Order, OrderedShape, Result, Shape, Type,
};

/// Maps offsets of an outer array onto offsets of an inner one.
pub trait OffsetMapper: Send + Sync {
    /// The inner offset holding the outer pixel at `offset`,
    /// or `None` if there is no such pixel.
    fn map(&self, offset: u64) -> Option<u64>;
}

impl<F> OffsetMapper for F
where
    F: Fn(u64) -> Option<u64> + Send + Sync,
{
    fn map(&self, offset: u64) -> Option<u64> {
        self(offset)
    }
}

/// Maps between two ordered shapes by pixel position:
/// an outer offset goes to the inner offset of the same position, if the inner shape has it.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeMapper {
    outer: OrderedShape,
    inner: OrderedShape,
}

impl ShapeMapper {
    pub fn new(outer: OrderedShape, inner: OrderedShape) -> Result<Self> {
        if outer.ndim() != inner.ndim() {
            return Err(Error::invalid(format!(
                "cannot map pixels of {outer} onto {inner}"
            )));
        }
        Ok(Self { outer, inner })
    }

    /// Visit the pixels of `shape`, stored in `from` order, in `to` order.
    pub fn reordering(shape: &Shape, from: Option<Order>, to: Option<Order>) -> Self {
        Self {
            outer: OrderedShape::new(shape.clone(), to),
            inner: OrderedShape::new(shape.clone(), from),
        }
    }
}

impl OffsetMapper for ShapeMapper {
    fn map(&self, offset: u64) -> Option<u64> {
        let pos = self.outer.offset_to_position(offset).ok()?;
        self.inner.position_to_offset(&pos).ok()
    }
}

/// Presents an arbitrary pixel mapping of another array under a new shape.
///
/// Outer pixels the mapper has no inner offset for read as bad,
/// and writes to them are discarded.
/// Runs of consecutive inner offsets are transferred in one go.
/// The base must support random access.
#[derive(Clone)]
pub struct PixelMapArrayImpl {
    base: NdArray,
    shape: OrderedShape,
    mapper: Arc<dyn OffsetMapper>,
}

impl PixelMapArrayImpl {
    pub fn new(
        base: NdArray,
        shape: OrderedShape,
        mapper: impl OffsetMapper + 'static,
    ) -> Result<Self> {
        Self::from_arc(base, shape, Arc::new(mapper))
    }

    pub fn from_arc(
        base: NdArray,
        shape: OrderedShape,
        mapper: Arc<dyn OffsetMapper>,
    ) -> Result<Self> {
        if !base.is_random() {
            return Err(Error::unsupported(format!(
                "cannot remap pixels of {base} without random access"
            )));
        }
        Ok(Self {
            base,
            shape,
            mapper,
        })
    }

    /// The pixels of `base` visited in another order.
    pub fn reordered(base: NdArray, order: Order) -> Result<Self> {
        let mapper = ShapeMapper::reordering(base.shape(), base.shape().order(), Some(order));
        let shape = base.shape().with_order(Some(order));
        Self::new(base, shape, mapper)
    }

    pub fn base(&self) -> &NdArray {
        &self.base
    }
}

impl fmt::Debug for PixelMapArrayImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelMapArrayImpl")
            .field("base", &self.base)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

impl ArrayImpl for PixelMapArrayImpl {
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
        Ok(Box::new(PixelMapAccess {
            base: self.base.access()?,
            mapper: self.mapper.clone(),
            bad_handler: self.base.bad_handler().clone(),
            offset: 0,
        }))
    }
}

struct PixelMapAccess {
    base: ArrayAccess,
    mapper: Arc<dyn OffsetMapper>,
    bad_handler: BadHandler,
    offset: u64,
}

/// A stretch of outer pixels: either mapped to consecutive inner offsets, or unmapped.
struct Span {
    inner: Option<u64>,
    len: usize,
}

impl PixelMapAccess {
    fn span(&self, from: usize, to: usize) -> Span {
        let first = self.mapper.map(self.offset + from as u64);
        let mut len = 1;
        while from + len < to {
            let next = self.mapper.map(self.offset + (from + len) as u64);
            let contiguous = match first {
                Some(k) => next == Some(k + len as u64),
                None => next.is_none(),
            };
            if !contiguous {
                break;
            }
            len += 1;
        }
        Span { inner: first, len }
    }
}

impl AccessImpl for PixelMapAccess {
    fn set_offset(&mut self, offset: u64) -> Result<()> {
        self.offset = offset;
        Ok(())
    }

    fn read(&mut self, buf: &mut Buffer, start: usize, len: usize) -> Result<()> {
        let mut i = 0;
        while i < len {
            let span = self.span(i, len);
            match span.inner {
                Some(k) => {
                    self.base.set_offset(k)?;
                    self.base.read(buf, start + i, span.len)?;
                }
                None => self.bad_handler.put_bad_range(buf, start + i, span.len)?,
            }
            i += span.len;
        }
        self.offset += len as u64;
        Ok(())
    }

    fn write(&mut self, buf: &Buffer, start: usize, len: usize) -> Result<()> {
        let mut i = 0;
        while i < len {
            let span = self.span(i, len);
            if let Some(k) = span.inner {
                self.base.set_offset(k)?;
                self.base.write(buf, start + i, span.len)?;
            }
            i += span.len;
        }
        self.offset += len as u64;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.base.close()
    }
}
