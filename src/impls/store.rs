use std::sync::Arc;

use log::debug;

use super::{AccessImpl, ArrayImpl};
use crate::{
    BadHandler, Buffer, ByteOrder, ByteStore, Element, Error, OrderedShape, Result, Type,
    types::with_element,
};

/// An array laid over a region of a [`ByteStore`]: fixed-width elements in offset order,
/// starting at a byte position, encoded with a declared [`ByteOrder`].
///
/// Readable and writable according to the store's mode; random;
/// multi-access if the store is.
/// Never mappable, since elements are decoded on every transfer;
/// take a [`scratch_copy`](crate::ndarrays::scratch_copy) for direct buffer access.
#[derive(Debug, Clone)]
pub struct StoreArrayImpl {
    shape: OrderedShape,
    bad_handler: BadHandler,
    store: Arc<dyn ByteStore>,
    start: u64,
    byte_order: ByteOrder,
}

impl StoreArrayImpl {
    /// Fails if the store is too short to hold every pixel from `start`.
    pub fn new(
        store: Arc<dyn ByteStore>,
        start: u64,
        shape: OrderedShape,
        bad_handler: BadHandler,
        byte_order: ByteOrder,
    ) -> Result<Self> {
        let width = bad_handler.data_type().num_bytes() as u64;
        let needed = shape
            .num_pixels()
            .checked_mul(width)
            .and_then(|n| n.checked_add(start));
        if needed.is_none_or(|n| n > store.len()) {
            return Err(Error::invalid(format!(
                "{} pixels of {} at byte {} do not fit in a store of {} bytes",
                shape.num_pixels(),
                bad_handler.data_type(),
                start,
                store.len()
            )));
        }
        Ok(Self {
            shape,
            bad_handler,
            store,
            start,
            byte_order,
        })
    }

    pub fn store(&self) -> &Arc<dyn ByteStore> {
        &self.store
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }
}

impl ArrayImpl for StoreArrayImpl {
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
        self.store.mode().is_readable()
    }

    fn is_writable(&self) -> bool {
        self.store.mode().is_writable()
    }

    fn is_random(&self) -> bool {
        true
    }

    fn multiple_access(&self) -> bool {
        self.store.multiple_access()
    }

    fn access(&self) -> Result<Box<dyn AccessImpl>> {
        Ok(Box::new(StoreAccess {
            store: self.store.clone(),
            start: self.start,
            data_type: self.data_type(),
            byte_order: self.byte_order,
            offset: 0,
            bytes: Vec::new(),
        }))
    }

    fn close(&self) -> Result<()> {
        if self.is_writable() {
            debug!("flushing {} byte store", self.store.len());
            self.store.flush()?;
        }
        Ok(())
    }
}

struct StoreAccess {
    store: Arc<dyn ByteStore>,
    start: u64,
    data_type: Type,
    byte_order: ByteOrder,
    offset: u64,
    bytes: Vec<u8>,
}

impl StoreAccess {
    fn position(&self) -> u64 {
        self.start + self.offset * self.data_type.num_bytes() as u64
    }

    fn decode<T: Element>(&self, buf: &mut Buffer, start: usize, len: usize) -> Result<()> {
        let width = T::TYPE.num_bytes();
        let slice = T::slice_mut(buf).ok_or_else(|| Error::invalid("buffer type mismatch"))?;
        for (v, raw) in slice[start..start + len]
            .iter_mut()
            .zip(self.bytes.chunks_exact(width))
        {
            *v = T::read_bytes(raw, self.byte_order);
        }
        Ok(())
    }

    fn encode<T: Element>(&mut self, buf: &Buffer, start: usize, len: usize) -> Result<()> {
        let width = T::TYPE.num_bytes();
        let slice = T::slice(buf).ok_or_else(|| Error::invalid("buffer type mismatch"))?;
        for (v, raw) in slice[start..start + len]
            .iter()
            .zip(self.bytes.chunks_exact_mut(width))
        {
            v.write_bytes(raw, self.byte_order);
        }
        Ok(())
    }
}

impl AccessImpl for StoreAccess {
    fn set_offset(&mut self, offset: u64) -> Result<()> {
        self.offset = offset;
        Ok(())
    }

    fn read(&mut self, buf: &mut Buffer, start: usize, len: usize) -> Result<()> {
        let pos = self.position();
        self.bytes.resize(len * self.data_type.num_bytes(), 0);
        self.store.read_at(pos, &mut self.bytes)?;
        with_element!(self.data_type, T => self.decode::<T>(buf, start, len))?;
        self.offset += len as u64;
        Ok(())
    }

    fn write(&mut self, buf: &Buffer, start: usize, len: usize) -> Result<()> {
        let data_type = self.data_type;
        self.bytes.resize(len * data_type.num_bytes(), 0);
        with_element!(data_type, T => self.encode::<T>(buf, start, len))?;
        self.store.write_at(self.position(), &self.bytes)?;
        self.offset += len as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccessMode, MemoryStore, MmapStore, NdArray, Order, Shape, tests::init_logger};

    fn shape(dims: &[i64]) -> OrderedShape {
        let origin = vec![0; dims.len()];
        OrderedShape::new(Shape::try_new(&origin, dims).unwrap(), Some(Order::RowMajor))
    }

    #[test]
    fn test_big_endian_layout() {
        init_logger();
        let store = Arc::new(MemoryStore::from_bytes(
            vec![0xff, 0xff, 0x00, 0x01, 0x01, 0x00, 0x00, 0x00],
            AccessMode::Update,
        ));
        let imp = StoreArrayImpl::new(
            store.clone(),
            2,
            shape(&[3]),
            Type::Int16.default_bad_handler(),
            ByteOrder::BigEndian,
        )
        .unwrap();
        let nda = NdArray::new(imp).unwrap();
        let mut acc = nda.access().unwrap();
        let mut buf = Type::Int16.new_buffer(3);
        acc.read(&mut buf, 0, 3).unwrap();
        assert_eq!(buf, Buffer::from(vec![1i16, 256, 0]));

        acc.set_offset(2).unwrap();
        acc.write(&Buffer::from(vec![-2i16]), 0, 1).unwrap();
        assert_eq!(store.to_vec().unwrap()[6..], [0xff, 0xfe]);
    }

    #[test]
    fn test_scratch_copy_is_mappable() {
        let store = Arc::new(MemoryStore::from_bytes(
            vec![0x00, 0x07, 0x00, 0x08],
            AccessMode::Read,
        ));
        let imp = StoreArrayImpl::new(
            store,
            0,
            shape(&[2]),
            Type::Int16.default_bad_handler(),
            ByteOrder::BigEndian,
        )
        .unwrap();
        assert!(!imp.can_map());
        let nda = NdArray::new(imp).unwrap();
        assert!(nda.mapped().is_none());
        let copy = crate::ndarrays::scratch_copy(&nda).unwrap();
        let mapped = copy.mapped().unwrap();
        assert_eq!(*mapped.read().unwrap(), Buffer::from(vec![7i16, 8]));
    }

    #[test]
    fn test_little_endian_floats() {
        let mut bytes = Vec::new();
        for v in [1.5f64, -0.25] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let store = Arc::new(MemoryStore::from_bytes(bytes, AccessMode::Read));
        let imp = StoreArrayImpl::new(
            store,
            0,
            shape(&[2]),
            Type::Float64.default_bad_handler(),
            ByteOrder::LittleEndian,
        )
        .unwrap();
        assert!(imp.is_readable() && !imp.is_writable());
        let nda = NdArray::new(imp).unwrap();
        let mut buf = Type::Float64.new_buffer(2);
        nda.access().unwrap().read(&mut buf, 0, 2).unwrap();
        assert_eq!(buf, Buffer::from(vec![1.5f64, -0.25]));
    }

    #[test]
    fn test_too_short() {
        let store = Arc::new(MemoryStore::new(7, AccessMode::Read));
        assert!(matches!(
            StoreArrayImpl::new(
                store,
                0,
                shape(&[2]),
                Type::Float32.default_bad_handler(),
                ByteOrder::BigEndian
            ),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_mapped_file_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cube.bin");
        std::fs::write(&path, vec![0u8; 4 * 24]).unwrap();
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        let store = Arc::new(
            MmapStore::with_segment_size(&file, 0, 4 * 24, AccessMode::Update, 20).unwrap(),
        );
        let imp = StoreArrayImpl::new(
            store,
            0,
            shape(&[2, 3, 4]),
            Type::Int32.default_bad_handler(),
            ByteOrder::BigEndian,
        )
        .unwrap();
        let nda = NdArray::new(imp).unwrap();
        let data: Vec<i32> = (0..24).map(|i| i * 1000 - 7).collect();
        nda.access()
            .unwrap()
            .write(&Buffer::from(data.clone()), 0, 24)
            .unwrap();
        nda.close().unwrap();

        let on_disk = std::fs::read(&path).unwrap();
        let decoded: Vec<i32> = on_disk
            .chunks_exact(4)
            .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(decoded, data);
    }
}
