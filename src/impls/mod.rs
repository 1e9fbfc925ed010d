//! The capability interface of array implementations, and the implementations themselves.
//!
//! Storage-owning implementations ([`ScratchArrayImpl`], [`StoreArrayImpl`],
//! [`GeneratorArrayImpl`]) produce data; decorators ([`MouldArrayImpl`],
//! [`WindowArrayImpl`], [`PixelMapArrayImpl`], [`CombineArrayImpl`],
//! [`ConvertArrayImpl`], [`CopyArrayImpl`]) present views of other [`NdArray`](crate::NdArray)s.
//! A decorator co-owns the handles it wraps but never closes them.
use std::fmt::{self, Debug};

use crate::{BadHandler, Buffer, Error, OrderedShape, Result, SharedBuffer, Type};

mod scratch;
pub use scratch::ScratchArrayImpl;
mod generator;
pub use generator::GeneratorArrayImpl;
mod store;
pub use store::StoreArrayImpl;
mod mould;
pub use mould::MouldArrayImpl;
mod window;
pub use window::WindowArrayImpl;
mod pixel_map;
pub use pixel_map::{OffsetMapper, PixelMapArrayImpl, ShapeMapper};
mod combine;
pub use combine::{CombineArrayImpl, Combiner};
mod convert;
pub use convert::ConvertArrayImpl;
mod copy;
pub use copy::CopyArrayImpl;

/// Lifecycle of an array: created, opened once, closed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Unopened,
    Open,
    Closed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Unopened => "unopened",
            State::Open => "open",
            State::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// The low-level description and capabilities of an N-dimensional array.
///
/// Implementations need not police their own lifecycle or validate transfers:
/// [`NdArray`](crate::NdArray) calls [`ArrayImpl::open`] and [`ArrayImpl::close`] once each,
/// only requests cursors while open, and only once unless
/// [`ArrayImpl::multiple_access`] is true.
/// The cursors it hands out check offsets, lengths and buffer types
/// before reaching an [`AccessImpl`].
pub trait ArrayImpl: Debug + Send + Sync {
    fn shape(&self) -> &OrderedShape;

    fn data_type(&self) -> Type;

    fn bad_handler(&self) -> &BadHandler;

    fn is_readable(&self) -> bool;

    fn is_writable(&self) -> bool;

    /// Whether cursors may be positioned anywhere, rather than only moving forward
    /// by transferring data.
    fn is_random(&self) -> bool;

    /// Whether more than one cursor may be requested.
    fn multiple_access(&self) -> bool;

    /// Acquire any resources needed before cursors are created.
    fn open(&self) -> Result<()> {
        Ok(())
    }

    /// Whether [`ArrayImpl::mapped`] gives direct access to the whole array.
    fn can_map(&self) -> bool {
        false
    }

    /// The typed buffer holding every pixel in offset order, if there is one.
    fn mapped(&self) -> Option<SharedBuffer> {
        None
    }

    /// A new cursor positioned at offset 0.
    fn access(&self) -> Result<Box<dyn AccessImpl>>;

    /// Release resources acquired by this implementation (not those of wrapped arrays).
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A cursor over the pixels of an [`ArrayImpl`].
///
/// Callers guarantee offsets lie in `0..=num_pixels`, transfers stay within
/// the array and the buffer, buffers have the array's type,
/// and, for non-random arrays, that `set_offset` is only called with the current offset.
pub trait AccessImpl: Send {
    fn set_offset(&mut self, offset: u64) -> Result<()>;

    /// Read `len` pixels from the current offset into `buf[start..start + len]`, then advance.
    fn read(&mut self, buf: &mut Buffer, start: usize, len: usize) -> Result<()>;

    /// Write `buf[start..start + len]` to `len` pixels from the current offset, then advance.
    fn write(&mut self, buf: &Buffer, start: usize, len: usize) -> Result<()>;

    /// Release cursor-local resources.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Pixel count as an in-memory length.
pub(crate) fn memory_len(shape: &OrderedShape) -> Result<usize> {
    usize::try_from(shape.num_pixels()).map_err(|_| {
        Error::invalid(format!(
            "{} pixels cannot be held in memory",
            shape.num_pixels()
        ))
    })
}

