use std::sync::{Arc, RwLock};

use crate::{Element, Error, Result, Scalar, Type, types::with_element};

/// A homogeneous buffer of one of the five element types.
#[derive(Debug, Clone, PartialEq)]
pub enum Buffer {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

/// Storage shared between an array and all of its cursors.
pub type SharedBuffer = Arc<RwLock<Buffer>>;

impl Buffer {
    pub fn zeros(data_type: Type, len: usize) -> Self {
        with_element!(data_type, T => T::wrap(vec![T::default(); len]))
    }

    pub fn data_type(&self) -> Type {
        match self {
            Buffer::Int8(_) => Type::Int8,
            Buffer::Int16(_) => Type::Int16,
            Buffer::Int32(_) => Type::Int32,
            Buffer::Float32(_) => Type::Float32,
            Buffer::Float64(_) => Type::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Buffer::Int8(v) => v.len(),
            Buffer::Int16(v) => v.len(),
            Buffer::Int32(v) => v.len(),
            Buffer::Float32(v) => v.len(),
            Buffer::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw stored value at `pos`, regardless of bad-value semantics.
    pub fn get(&self, pos: usize) -> Option<Scalar> {
        with_element!(self.data_type(), T => {
            T::slice(self).and_then(|s| s.get(pos)).map(|v| v.into_scalar())
        })
    }

    /// Typed view of the elements, if `T` matches the buffer type.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice(self)
    }

    pub fn as_mut_slice<T: Element>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(self)
    }

    /// Copy `len` elements of `src` starting at `src_start` into `self` at `dst_start`.
    pub fn copy_from(
        &mut self,
        dst_start: usize,
        src: &Buffer,
        src_start: usize,
        len: usize,
    ) -> Result<()> {
        with_element!(self.data_type(), T => copy_elements::<T>(self, dst_start, src, src_start, len))
    }
}

fn copy_elements<T: Element>(
    dst: &mut Buffer,
    dst_start: usize,
    src: &Buffer,
    src_start: usize,
    len: usize,
) -> Result<()> {
    let src_type = src.data_type();
    let s = T::slice(src).ok_or_else(|| {
        Error::invalid(format!("cannot copy {} into {}", src_type, T::TYPE))
    })?;
    let d = T::slice_mut(dst).ok_or_else(|| Error::invalid("destination type mismatch"))?;
    let s = checked_range(s, src_start, len)?;
    let d_len = d.len();
    let d = d.get_mut(dst_start..dst_start + len).ok_or_else(|| {
        Error::out_of_bounds(format!(
            "range {}..{} beyond buffer of length {}",
            dst_start,
            dst_start + len,
            d_len
        ))
    })?;
    d.copy_from_slice(s);
    Ok(())
}

/// Borrow `len` elements from `start`, failing rather than panicking if out of range.
pub(crate) fn checked_range<T>(slice: &[T], start: usize, len: usize) -> Result<&[T]> {
    slice.get(start..start + len).ok_or_else(|| {
        Error::out_of_bounds(format!(
            "range {}..{} beyond buffer of length {}",
            start,
            start + len,
            slice.len()
        ))
    })
}

pub(crate) fn checked_range_mut<T>(slice: &mut [T], start: usize, len: usize) -> Result<&mut [T]> {
    let slice_len = slice.len();
    slice.get_mut(start..start + len).ok_or_else(|| {
        Error::out_of_bounds(format!(
            "range {}..{} beyond buffer of length {}",
            start,
            start + len,
            slice_len
        ))
    })
}

impl<T: Element> From<Vec<T>> for Buffer {
    fn from(values: Vec<T>) -> Self {
        T::wrap(values)
    }
}
