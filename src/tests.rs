use std::sync::{Arc, RwLock};

use faer::rand::{Rng, SeedableRng, rngs::SmallRng};

use crate::{
    AccessImpl, ArrayImpl, BadHandler, Buffer, Chunk, Element, NdArray, Order, OrderedShape,
    Result, ScratchArrayImpl, Shape, SharedBuffer, Type, types::with_element,
};

pub fn init_logger() {
    #[allow(unused_must_use)]
    env_logger::try_init();
}

fn ordered(origin: &[i64], dims: &[i64], order: Order) -> OrderedShape {
    OrderedShape::new(Shape::try_new(origin, dims).unwrap(), Some(order))
}

/// Values `first, first + 1, ...` of the given type.
pub fn counting(data_type: Type, len: usize, first: f64) -> Buffer {
    with_element!(data_type, T => T::wrap(
        (0..len)
            .map(|i| T::from_f64(first + i as f64).unwrap_or_default())
            .collect(),
    ))
}

/// A scratch array whose pixel at offset `k` holds `k + 1`.
pub fn filled_array(origin: &[i64], dims: &[i64], order: Order, data_type: Type) -> NdArray {
    let shape = ordered(origin, dims, order);
    let n = shape.num_pixels() as usize;
    let imp = ScratchArrayImpl::from_buffer(
        shape,
        data_type.default_bad_handler(),
        counting(data_type, n, 1.0),
    )
    .unwrap();
    NdArray::new(imp).unwrap()
}

/// Every pixel of an array, in its offset order.
pub fn read_all(nda: &NdArray) -> Buffer {
    let n = nda.shape().num_pixels() as usize;
    let mut buf = nda.data_type().new_buffer(n);
    let mut acc = nda.access().unwrap();
    acc.read(&mut buf, 0, n).unwrap();
    buf
}

/// Chunks of random sizes covering `0..length`.
pub struct RandomChunkStepper {
    rng: SmallRng,
    length: u64,
    max_size: usize,
    base: u64,
}

impl RandomChunkStepper {
    pub fn new(length: u64, max_size: usize) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(1991),
            length,
            max_size,
            base: 0,
        }
    }
}

impl Iterator for RandomChunkStepper {
    type Item = Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        if self.base >= self.length {
            return None;
        }
        let remaining = (self.length - self.base).min(self.max_size as u64) as usize;
        let size = self.rng.random_range(1..=remaining);
        let chunk = Chunk {
            base: self.base,
            size,
        };
        self.base += size as u64;
        Some(chunk)
    }
}

/// An in-memory array which is neither random nor multi-access,
/// standing in for streams.
#[derive(Debug)]
pub struct SequentialArrayImpl {
    shape: OrderedShape,
    bad_handler: BadHandler,
    data: SharedBuffer,
    readable: bool,
    writable: bool,
}

impl SequentialArrayImpl {
    fn with_data(dims: &[i64], data: Buffer, readable: bool, writable: bool) -> Self {
        let origin = vec![0; dims.len()];
        Self {
            shape: ordered(&origin, dims, Order::RowMajor),
            bad_handler: data.data_type().default_bad_handler(),
            data: Arc::new(RwLock::new(data)),
            readable,
            writable,
        }
    }

    /// Read-only; the pixel at offset `k` holds `k`.
    pub fn ramp(dims: &[i64], data_type: Type) -> Self {
        let n = dims.iter().product::<i64>() as usize;
        Self::with_data(dims, counting(data_type, n, 0.0), true, false)
    }

    pub fn write_only(dims: &[i64], data_type: Type) -> Self {
        Self::recording(dims, data_type).0
    }

    /// Write-only, with the buffer that receives the writes.
    pub fn recording(dims: &[i64], data_type: Type) -> (Self, SharedBuffer) {
        let n = dims.iter().product::<i64>() as usize;
        let imp = Self::with_data(dims, data_type.new_buffer(n), false, true);
        let sink = imp.data.clone();
        (imp, sink)
    }
}

impl ArrayImpl for SequentialArrayImpl {
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
        self.readable
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn is_random(&self) -> bool {
        false
    }

    fn multiple_access(&self) -> bool {
        false
    }

    fn access(&self) -> Result<Box<dyn AccessImpl>> {
        Ok(Box::new(SequentialAccess {
            data: self.data.clone(),
            offset: 0,
        }))
    }
}

struct SequentialAccess {
    data: SharedBuffer,
    offset: usize,
}

impl AccessImpl for SequentialAccess {
    fn set_offset(&mut self, offset: u64) -> Result<()> {
        assert_eq!(offset as usize, self.offset, "sequential cursor moved");
        Ok(())
    }

    fn read(&mut self, buf: &mut Buffer, start: usize, len: usize) -> Result<()> {
        buf.copy_from(start, &*self.data.read()?, self.offset, len)?;
        self.offset += len;
        Ok(())
    }

    fn write(&mut self, buf: &Buffer, start: usize, len: usize) -> Result<()> {
        self.data.write()?.copy_from(self.offset, buf, start, len)?;
        self.offset += len;
        Ok(())
    }
}

