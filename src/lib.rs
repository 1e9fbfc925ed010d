//! Storage and access for large, regularly shaped N-dimensional numeric arrays.
//!
//! An array is described by an [`ArrayImpl`]: an [`OrderedShape`], an element [`Type`],
//! a [`BadHandler`] saying which stored values mean "missing", capability flags and an
//! open/close lifecycle. Data is read and written through cursors ([`ArrayAccess`]),
//! several of which may be live on the same array at once.
//!
//! Implementations either own storage (in-memory scratch buffers, byte stores such as
//! memory-mapped files) or decorate other arrays without copying: translating their shape,
//! windowing them, remapping pixels, combining two arrays pixel-wise
//! or converting between types and bad values.
//! [`ndarrays::to_required_array`] composes the decorators needed
//! to turn any array into one matching a set of [`Requirements`].
//!
//! ```
//! use nd_access::{NdArray, Order, OrderedShape, ScratchArrayImpl, Shape, Type, Buffer};
//!
//! let shape = OrderedShape::new(Shape::try_new(&[0, 0], &[3, 2]).unwrap(), Some(Order::RowMajor));
//! let nda = NdArray::new(ScratchArrayImpl::new(shape, Type::Int16).unwrap()).unwrap();
//! let mut acc = nda.access().unwrap();
//! acc.write(&Buffer::from(vec![1i16, 2, 3, 4, 5, 6]), 0, 6).unwrap();
//! acc.set_position(&[1, 1]).unwrap();
//! let mut buf = Type::Int16.new_buffer(1);
//! acc.read(&mut buf, 0, 1).unwrap();
//! assert_eq!(buf, Buffer::from(vec![5i16]));
//! ```
use smallvec::SmallVec;

#[cfg(test)]
mod tests;

mod error;
pub use error::{Error, Result};

mod types;
pub use types::{ByteOrder, Element, Scalar, Type};

mod buffer;
pub use buffer::{Buffer, SharedBuffer};

mod bad;
pub use bad::{BadHandler, TypedBad};

pub mod shape;
pub use shape::{Order, OrderedShape, PixelIter, Shape};

pub mod chunk;
pub use chunk::{Chunk, ChunkStepper};

pub mod convert;
pub use convert::{Converter, LinearScaler, Scaler, TypeConverter};

pub mod store;
pub use store::{AccessMode, ByteStore, FileStore, MemoryStore, MmapStore};

pub mod impls;
pub use impls::{
    AccessImpl, ArrayImpl, CombineArrayImpl, Combiner, ConvertArrayImpl, CopyArrayImpl,
    GeneratorArrayImpl, MouldArrayImpl, OffsetMapper, PixelMapArrayImpl, ScratchArrayImpl,
    ShapeMapper, State, StoreArrayImpl, WindowArrayImpl,
};

mod access;
pub use access::ArrayAccess;

mod array;
pub use array::NdArray;

mod requirements;
pub use requirements::Requirements;

pub mod ndarrays;

#[cfg(feature = "ndarray")]
pub mod ndarr;

pub const COORD_SIZE: usize = 6;

/// A short vector type alias for coordinates and per-axis quantities,
/// which stay on the stack for arrays of up to [`COORD_SIZE`] dimensions.
pub type ShortVec<T> = SmallVec<[T; COORD_SIZE]>;
