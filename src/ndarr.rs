//! Conversions to and from [`ndarray`] arrays.
//!
//! ndarray's standard layout, with the last axis varying fastest, is [`Order::ColumnMajor`].
//! Origins are not represented in ndarray, so they are dropped on the way out
//! and supplied on the way in.
use ndarray::{ArrayD, ArrayViewD, IxDyn};

use crate::{
    AccessMode, BadHandler, Element, Error, NdArray, Order, OrderedShape, Requirements, Result,
    ScratchArrayImpl, Shape, ndarrays::to_required_array,
};

/// Read every pixel of `nda` into an ndarray, converting to `T` first if necessary.
///
/// Bad pixels hold the bad value of `T`'s default handler (NaN for floating types).
pub fn to_ndarray<T: Element>(nda: &NdArray) -> Result<ArrayD<T>> {
    let req = Requirements::new()
        .with_mode(AccessMode::Read)
        .with_data_type(T::TYPE)?
        .with_order(Order::ColumnMajor);
    let adapted = to_required_array(nda, &req)?;
    let n = crate::impls::memory_len(adapted.shape())?;
    let mut buf = T::TYPE.new_buffer(n);
    let mut acc = adapted.access()?;
    acc.read(&mut buf, 0, n)?;
    acc.close()?;
    let values = T::slice(&buf)
        .ok_or_else(|| Error::invalid("buffer type mismatch"))?
        .to_vec();
    let dims: Vec<usize> = nda.shape().dims().iter().map(|d| *d as usize).collect();
    ArrayD::from_shape_vec(IxDyn(&dims), values).map_err(|e| Error::ShapeMismatch(e.to_string()))
}

/// A scratch array holding a copy of `view`, with its first pixel at `origin`.
pub fn from_ndarray<T: Element>(
    view: ArrayViewD<'_, T>,
    origin: &[i64],
    bad_handler: BadHandler,
) -> Result<NdArray> {
    if bad_handler.data_type() != T::TYPE {
        return Err(Error::invalid(format!(
            "{} bad handler for {} data",
            bad_handler.data_type(),
            T::TYPE
        )));
    }
    let dims = view
        .shape()
        .iter()
        .map(|d| i64::try_from(*d).map_err(|_| Error::invalid("dimension too large")))
        .collect::<Result<Vec<_>>>()?;
    let shape = OrderedShape::new(Shape::try_new(origin, &dims)?, Some(Order::ColumnMajor));
    let values: Vec<T> = view.iter().copied().collect();
    NdArray::new(ScratchArrayImpl::from_buffer(shape, bad_handler, T::wrap(values))?)
}
