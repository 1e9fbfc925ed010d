use std::sync::PoisonError;

use thiserror::Error;

/// Errors raised by array construction, adaptation and access.
#[derive(Debug, Error)]
pub enum Error {
    /// A malformed shape, buffer, handler or requirement was supplied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A coordinate or offset lies outside the valid range.
    #[error("index out of bounds: {0}")]
    IndexOutOfBounds(String),
    /// A bulk transfer would run past the last pixel.
    #[error("end of data: transfer of {size} pixels at offset {offset} exceeds {len} pixels")]
    EndOfData { offset: u64, size: usize, len: u64 },
    /// Two arrays which must have matching shapes do not.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    /// The array or cursor lacks the capability the operation needs.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    /// The operation is not valid in the current lifecycle state.
    #[error("invalid state: {0}")]
    State(String),
    /// Failure in the underlying byte storage.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn out_of_bounds(msg: impl Into<String>) -> Self {
        Self::IndexOutOfBounds(msg.into())
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub(crate) fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Self::State("storage lock poisoned by a panicking cursor".into())
    }
}
