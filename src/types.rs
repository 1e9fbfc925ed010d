use std::{
    fmt,
    hash::{Hash, Hasher},
};

use crate::{BadHandler, Buffer, Error, Result};

/// The primitive element types an array may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Type {
    Int8,
    Int16,
    Int32,
    Float32,
    Float64,
}

impl Type {
    pub const ALL: [Type; 5] = [
        Type::Int8,
        Type::Int16,
        Type::Int32,
        Type::Float32,
        Type::Float64,
    ];

    /// Number of bytes one element occupies in byte storage.
    pub fn num_bytes(self) -> usize {
        match self {
            Type::Int8 => 1,
            Type::Int16 => 2,
            Type::Int32 => 4,
            Type::Float32 => 4,
            Type::Float64 => 8,
        }
    }

    pub fn is_floating(self) -> bool {
        matches!(self, Type::Float32 | Type::Float64)
    }

    pub fn name(self) -> &'static str {
        match self {
            Type::Int8 => "int8",
            Type::Int16 => "int16",
            Type::Int32 => "int32",
            Type::Float32 => "float32",
            Type::Float64 => "float64",
        }
    }

    /// The sentinel written by [`Type::default_bad_handler`]:
    /// the minimum value for integer types, NaN for floating types.
    pub fn default_bad_value(self) -> Scalar {
        match self {
            Type::Int8 => Scalar::Int8(i8::MIN),
            Type::Int16 => Scalar::Int16(i16::MIN),
            Type::Int32 => Scalar::Int32(i32::MIN),
            Type::Float32 => Scalar::Float32(f32::NAN),
            Type::Float64 => Scalar::Float64(f64::NAN),
        }
    }

    /// Smallest representable (finite) value.
    pub fn min_value(self) -> f64 {
        match self {
            Type::Int8 => i8::MIN as f64,
            Type::Int16 => i16::MIN as f64,
            Type::Int32 => i32::MIN as f64,
            Type::Float32 => f32::MIN as f64,
            Type::Float64 => f64::MIN,
        }
    }

    /// Largest representable (finite) value.
    pub fn max_value(self) -> f64 {
        match self {
            Type::Int8 => i8::MAX as f64,
            Type::Int16 => i16::MAX as f64,
            Type::Int32 => i32::MAX as f64,
            Type::Float32 => f32::MAX as f64,
            Type::Float64 => f64::MAX,
        }
    }

    /// Allocate a zero-filled buffer of `len` elements of this type.
    pub fn new_buffer(self, len: usize) -> Buffer {
        Buffer::zeros(self, len)
    }

    /// Fail unless `buf` holds elements of this type and at least `len` of them.
    pub fn check_buffer(self, buf: &Buffer, len: usize) -> Result<()> {
        if buf.data_type() != self {
            return Err(Error::invalid(format!(
                "buffer holds {} elements, {} required",
                buf.data_type(),
                self
            )));
        }
        if buf.len() < len {
            return Err(Error::invalid(format!(
                "buffer of length {} is shorter than {}",
                buf.len(),
                len
            )));
        }
        Ok(())
    }

    /// A handler using [`Type::default_bad_value`] as its sentinel.
    pub fn default_bad_handler(self) -> BadHandler {
        BadHandler::with_default(self)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run `$body` with `$T` aliased to the primitive type corresponding to a [`Type`].
///
/// This is how generic element code is instantiated once per call
/// rather than dispatched per element.
macro_rules! with_element {
    ($type:expr, $T:ident => $body:expr) => {
        match $type {
            $crate::Type::Int8 => {
                type $T = i8;
                $body
            }
            $crate::Type::Int16 => {
                type $T = i16;
                $body
            }
            $crate::Type::Int32 => {
                type $T = i32;
                $body
            }
            $crate::Type::Float32 => {
                type $T = f32;
                $body
            }
            $crate::Type::Float64 => {
                type $T = f64;
                $body
            }
        }
    };
}
pub(crate) use with_element;

/// Byte layout of elements in byte storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

/// A single value of one of the five element types.
///
/// Equality and hashing compare the type and the raw bit pattern,
/// so two NaNs with the same bits are equal and `0.0 != -0.0`.
#[derive(Debug, Clone, Copy)]
pub enum Scalar {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Float32(f32),
    Float64(f64),
}

impl Scalar {
    pub fn data_type(&self) -> Type {
        match self {
            Scalar::Int8(_) => Type::Int8,
            Scalar::Int16(_) => Type::Int16,
            Scalar::Int32(_) => Type::Int32,
            Scalar::Float32(_) => Type::Float32,
            Scalar::Float64(_) => Type::Float64,
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Scalar::Int8(v) => v.to_f64(),
            Scalar::Int16(v) => v.to_f64(),
            Scalar::Int32(v) => v.to_f64(),
            Scalar::Float32(v) => v.to_f64(),
            Scalar::Float64(v) => v,
        }
    }

    fn bits(self) -> u64 {
        match self {
            Scalar::Int8(v) => v.to_bits64(),
            Scalar::Int16(v) => v.to_bits64(),
            Scalar::Int32(v) => v.to_bits64(),
            Scalar::Float32(v) => v.to_bits64(),
            Scalar::Float64(v) => v.to_bits64(),
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.data_type() == other.data_type() && self.bits() == other.bits()
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data_type().hash(state);
        self.bits().hash(state);
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int8(v) => write!(f, "{v}"),
            Scalar::Int16(v) => write!(f, "{v}"),
            Scalar::Int32(v) => write!(f, "{v}"),
            Scalar::Float32(v) => write!(f, "{v}"),
            Scalar::Float64(v) => write!(f, "{v}"),
        }
    }
}

/// Implemented by the primitive types backing the variants of [`Type`].
pub trait Element:
    Copy + PartialEq + PartialOrd + Default + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    const TYPE: Type;

    fn to_f64(self) -> f64;

    /// Convert from `f64`, rounding to nearest for integer types.
    /// `None` if the value is not representable.
    fn from_f64(value: f64) -> Option<Self>;

    /// Raw bit pattern, for identity (rather than numeric) comparison.
    fn to_bits64(self) -> u64;

    fn is_nan(self) -> bool;

    /// Decode from the first `Self::TYPE.num_bytes()` bytes of `bytes`.
    fn read_bytes(bytes: &[u8], order: ByteOrder) -> Self;

    /// Encode into the first `Self::TYPE.num_bytes()` bytes of `bytes`.
    fn write_bytes(self, bytes: &mut [u8], order: ByteOrder);

    fn into_scalar(self) -> Scalar;

    fn from_scalar(scalar: Scalar) -> Option<Self>;

    fn slice(buf: &Buffer) -> Option<&[Self]>;

    fn slice_mut(buf: &mut Buffer) -> Option<&mut [Self]>;

    fn wrap(values: Vec<Self>) -> Buffer;
}

macro_rules! impl_element_common {
    ($t:ty, $variant:ident) => {
        const TYPE: Type = Type::$variant;

        fn read_bytes(bytes: &[u8], order: ByteOrder) -> Self {
            let mut raw = [0u8; std::mem::size_of::<$t>()];
            raw.copy_from_slice(&bytes[..std::mem::size_of::<$t>()]);
            match order {
                ByteOrder::BigEndian => <$t>::from_be_bytes(raw),
                ByteOrder::LittleEndian => <$t>::from_le_bytes(raw),
            }
        }

        fn write_bytes(self, bytes: &mut [u8], order: ByteOrder) {
            let raw = match order {
                ByteOrder::BigEndian => self.to_be_bytes(),
                ByteOrder::LittleEndian => self.to_le_bytes(),
            };
            bytes[..raw.len()].copy_from_slice(&raw);
        }

        fn into_scalar(self) -> Scalar {
            Scalar::$variant(self)
        }

        fn from_scalar(scalar: Scalar) -> Option<Self> {
            match scalar {
                Scalar::$variant(v) => Some(v),
                _ => None,
            }
        }

        fn slice(buf: &Buffer) -> Option<&[Self]> {
            match buf {
                Buffer::$variant(v) => Some(v.as_slice()),
                _ => None,
            }
        }

        fn slice_mut(buf: &mut Buffer) -> Option<&mut [Self]> {
            match buf {
                Buffer::$variant(v) => Some(v.as_mut_slice()),
                _ => None,
            }
        }

        fn wrap(values: Vec<Self>) -> Buffer {
            Buffer::$variant(values)
        }
    };
}

macro_rules! impl_int_element {
    ($t:ty, $variant:ident) => {
        impl Element for $t {
            impl_element_common!($t, $variant);

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(value: f64) -> Option<Self> {
                let rounded = value.round();
                // NaN fails both comparisons
                if rounded >= <$t>::MIN as f64 && rounded <= <$t>::MAX as f64 {
                    Some(rounded as $t)
                } else {
                    None
                }
            }

            fn to_bits64(self) -> u64 {
                self as i64 as u64
            }

            fn is_nan(self) -> bool {
                false
            }
        }

        impl From<$t> for Scalar {
            fn from(value: $t) -> Self {
                Scalar::$variant(value)
            }
        }
    };
}

impl_int_element!(i8, Int8);
impl_int_element!(i16, Int16);
impl_int_element!(i32, Int32);

impl Element for f32 {
    impl_element_common!(f32, Float32);

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Option<Self> {
        if value.is_finite() && value.abs() > f32::MAX as f64 {
            None
        } else {
            Some(value as f32)
        }
    }

    fn to_bits64(self) -> u64 {
        self.to_bits() as u64
    }

    fn is_nan(self) -> bool {
        f32::is_nan(self)
    }
}

impl Element for f64 {
    impl_element_common!(f64, Float64);

    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Option<Self> {
        Some(value)
    }

    fn to_bits64(self) -> u64 {
        self.to_bits()
    }

    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }
}

impl From<f32> for Scalar {
    fn from(value: f32) -> Self {
        Scalar::Float32(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float64(value)
    }
}
