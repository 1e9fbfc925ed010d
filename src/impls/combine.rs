use std::{fmt, sync::Arc};

use log::debug;

use super::{AccessImpl, ArrayImpl};
use crate::{
    AccessMode, ArrayAccess, BadHandler, Buffer, Element, Error, NdArray, OrderedShape,
    Requirements, Result, Type, ndarrays::to_required_array, types::with_element,
};

/// A pixel-wise binary operation on floating-point values.
pub trait Combiner: Send + Sync {
    fn combine(&self, x: f64, y: f64) -> f64;
}

impl<F> Combiner for F
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    fn combine(&self, x: f64, y: f64) -> f64 {
        self(x, y)
    }
}

/// A read-only array whose pixels combine the pixels at the same position in two others.
///
/// Both inputs are read as `f64` over the result's shape;
/// a result pixel is bad if either input pixel is bad or missing,
/// or if the combined value is NaN or not representable in the result's type.
#[derive(Clone)]
pub struct CombineArrayImpl {
    a: NdArray,
    b: NdArray,
    shape: OrderedShape,
    bad_handler: BadHandler,
    combiner: Arc<dyn Combiner>,
}

impl CombineArrayImpl {
    /// `shape` defaults to the intersection of the inputs' shapes, in the first input's order.
    pub fn new(
        a: &NdArray,
        b: &NdArray,
        combiner: impl Combiner + 'static,
        shape: Option<OrderedShape>,
        bad_handler: BadHandler,
    ) -> Result<Self> {
        if !a.is_readable() || !b.is_readable() {
            return Err(Error::unsupported("combined arrays must be readable"));
        }
        if a.shape().ndim() != b.shape().ndim() {
            return Err(Error::invalid(format!("cannot combine {a} with {b}")));
        }
        let shape = match shape {
            Some(s) => s,
            None => OrderedShape::new(a.shape().intersection(b.shape())?, a.shape().order()),
        };
        let req = Requirements::new()
            .with_mode(AccessMode::Read)
            .with_data_type(Type::Float64)?
            .with_window(shape.shape().clone())
            .with_order(shape.effective_order());
        debug!("combining {a} and {b} over {shape}");
        Ok(Self {
            a: to_required_array(a, &req)?,
            b: to_required_array(b, &req)?,
            shape,
            bad_handler,
            combiner: Arc::new(combiner),
        })
    }
}

impl fmt::Debug for CombineArrayImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombineArrayImpl")
            .field("a", &self.a)
            .field("b", &self.b)
            .field("shape", &self.shape)
            .field("bad_handler", &self.bad_handler)
            .finish_non_exhaustive()
    }
}

impl ArrayImpl for CombineArrayImpl {
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
        self.a.is_random() && self.b.is_random()
    }

    fn multiple_access(&self) -> bool {
        self.a.multiple_access() && self.b.multiple_access()
    }

    fn access(&self) -> Result<Box<dyn AccessImpl>> {
        Ok(Box::new(CombineAccess {
            a: self.a.access()?,
            b: self.b.access()?,
            combiner: self.combiner.clone(),
            bad_handler: self.bad_handler.clone(),
            xa: Type::Float64.new_buffer(0),
            xb: Type::Float64.new_buffer(0),
        }))
    }
}

struct CombineAccess {
    a: ArrayAccess,
    b: ArrayAccess,
    combiner: Arc<dyn Combiner>,
    bad_handler: BadHandler,
    xa: Buffer,
    xb: Buffer,
}

impl CombineAccess {
    fn combine_into<T: Element>(&self, buf: &mut Buffer, start: usize, len: usize) -> Result<()> {
        let bad = self.bad_handler.typed::<T>()?;
        let fill = bad.bad_value();
        let (Some(xa), Some(xb)) = (f64::slice(&self.xa), f64::slice(&self.xb)) else {
            return Err(Error::invalid("combination buffers must be float64"));
        };
        let out = T::slice_mut(buf).ok_or_else(|| Error::invalid("buffer type mismatch"))?;
        for ((v, x), y) in out[start..start + len].iter_mut().zip(xa).zip(xb) {
            *v = if x.is_nan() || y.is_nan() {
                fill
            } else {
                let r = self.combiner.combine(*x, *y);
                if r.is_nan() {
                    fill
                } else {
                    T::from_f64(r).unwrap_or(fill)
                }
            };
        }
        Ok(())
    }
}

impl AccessImpl for CombineAccess {
    fn set_offset(&mut self, offset: u64) -> Result<()> {
        self.a.set_offset(offset)?;
        self.b.set_offset(offset)
    }

    fn read(&mut self, buf: &mut Buffer, start: usize, len: usize) -> Result<()> {
        if self.xa.len() != len {
            self.xa = Type::Float64.new_buffer(len);
            self.xb = Type::Float64.new_buffer(len);
        }
        self.a.read(&mut self.xa, 0, len)?;
        self.b.read(&mut self.xb, 0, len)?;
        with_element!(self.bad_handler.data_type(), T => self.combine_into::<T>(buf, start, len))
    }

    fn write(&mut self, _buf: &Buffer, _start: usize, _len: usize) -> Result<()> {
        Err(Error::unsupported("combined arrays are read-only"))
    }

    fn close(&mut self) -> Result<()> {
        self.a.close()?;
        self.b.close()
    }
}
