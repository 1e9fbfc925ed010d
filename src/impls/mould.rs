use super::{AccessImpl, ArrayImpl};
use crate::{
    BadHandler, Error, NdArray, OrderedShape, Result, Shape, SharedBuffer, Type,
};

/// Presents the pixels of another array, in the same offset sequence,
/// under a different shape with the same pixel count.
///
/// Typically used to move an array to a different origin.
/// All capabilities are those of the base array.
#[derive(Debug, Clone)]
pub struct MouldArrayImpl {
    base: NdArray,
    shape: OrderedShape,
}

impl MouldArrayImpl {
    pub fn new(base: NdArray, shape: OrderedShape) -> Result<Self> {
        if shape.num_pixels() != base.shape().num_pixels() {
            return Err(Error::ShapeMismatch(format!(
                "cannot mould {} pixels into {}",
                base.shape().num_pixels(),
                shape
            )));
        }
        Ok(Self { base, shape })
    }

    /// The base array with its origin moved to `origin`.
    pub fn translated(base: NdArray, origin: &[i64]) -> Result<Self> {
        let shape = Shape::try_new(origin, base.shape().dims())?;
        let shape = OrderedShape::new(shape, base.shape().order());
        Self::new(base, shape)
    }

    pub fn base(&self) -> &NdArray {
        &self.base
    }
}

impl ArrayImpl for MouldArrayImpl {
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
        self.base.is_random()
    }

    fn multiple_access(&self) -> bool {
        self.base.multiple_access()
    }

    fn can_map(&self) -> bool {
        self.base.can_map()
    }

    fn mapped(&self) -> Option<SharedBuffer> {
        self.base.mapped()
    }

    fn access(&self) -> Result<Box<dyn AccessImpl>> {
        Ok(Box::new(self.base.access()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Buffer, Order, tests::filled_array};

    #[test]
    fn test_translated() {
        let base = filled_array(&[0, 0], &[3, 2], Order::RowMajor, Type::Int16);
        let imp = MouldArrayImpl::translated(base.clone(), &[10, -5]).unwrap();
        let nda = NdArray::new(imp).unwrap();
        assert_eq!(nda.shape().origin(), &[10, -5]);
        assert_eq!(nda.shape().dims(), &[3, 2]);
        assert!(nda.can_map());

        let mut acc = nda.access().unwrap();
        acc.set_position(&[11, -4]).unwrap();
        let mut buf = Type::Int16.new_buffer(1);
        acc.read(&mut buf, 0, 1).unwrap();
        assert_eq!(buf, Buffer::from(vec![5i16]));

        acc.set_position(&[10, -5]).unwrap();
        acc.write(&Buffer::from(vec![-9i16]), 0, 1).unwrap();
        let mut check = base.access().unwrap();
        check.read(&mut buf, 0, 1).unwrap();
        assert_eq!(buf, Buffer::from(vec![-9i16]));
    }

    #[test]
    fn test_pixel_count_must_match() {
        let base = filled_array(&[0], &[6], Order::RowMajor, Type::Int8);
        let ok = OrderedShape::new(Shape::from_dims(&[2, 3]).unwrap(), None);
        assert!(MouldArrayImpl::new(base.clone(), ok).is_ok());
        let bad = OrderedShape::new(Shape::from_dims(&[7]).unwrap(), None);
        assert!(matches!(
            MouldArrayImpl::new(base, bad),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_base_stays_open() {
        let base = filled_array(&[0], &[4], Order::RowMajor, Type::Float32);
        let nda = NdArray::new(MouldArrayImpl::translated(base.clone(), &[3]).unwrap()).unwrap();
        nda.close().unwrap();
        assert!(base.access().is_ok());
    }
}
