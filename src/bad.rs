use std::fmt;

use crate::{
    Buffer, Element, Error, Result, Scalar, Type,
    buffer::checked_range_mut,
    types::with_element,
};

/// Decides which stored values of one [`Type`] represent missing ("bad") data.
///
/// A handler is bound to a type and an optional sentinel.
/// - Integer types without a sentinel have no bad values;
///   [`BadHandler::put_bad`] still writes [`Type::default_bad_value`].
/// - Floating types always treat every NaN bit pattern as bad.
///   Without an explicit sentinel the canonical NaN is used, and is written by `put_bad`.
/// - With a sentinel, a value is bad if its bit pattern equals the sentinel's.
///
/// Two handlers are equal if they have the same type and sentinel bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BadHandler {
    data_type: Type,
    bad_value: Option<Scalar>,
}

impl BadHandler {
    /// Fails if `bad_value` is not of type `data_type`.
    pub fn new(data_type: Type, bad_value: Option<Scalar>) -> Result<Self> {
        if let Some(v) = bad_value {
            if v.data_type() != data_type {
                return Err(Error::invalid(format!(
                    "bad value {} is {}, not {}",
                    v,
                    v.data_type(),
                    data_type
                )));
            }
        }
        let bad_value = match bad_value {
            None if data_type.is_floating() => Some(data_type.default_bad_value()),
            other => other,
        };
        Ok(Self {
            data_type,
            bad_value,
        })
    }

    /// A handler with no explicit sentinel.
    pub fn null(data_type: Type) -> Self {
        Self {
            data_type,
            bad_value: data_type
                .is_floating()
                .then(|| data_type.default_bad_value()),
        }
    }

    pub(crate) fn with_default(data_type: Type) -> Self {
        Self {
            data_type,
            bad_value: Some(data_type.default_bad_value()),
        }
    }

    pub fn data_type(&self) -> Type {
        self.data_type
    }

    /// The sentinel, or `None` if no value of an integer type is bad.
    pub fn bad_value(&self) -> Option<Scalar> {
        self.bad_value
    }

    /// A handler specialised to the primitive type `T`,
    /// for testing and writing many elements without repeated dispatch.
    pub fn typed<T: Element>(&self) -> Result<TypedBad<T>> {
        if T::TYPE != self.data_type {
            return Err(Error::invalid(format!(
                "{} handler used for {} data",
                self.data_type,
                T::TYPE
            )));
        }
        let sentinel = self.bad_value.and_then(T::from_scalar);
        let fill = sentinel
            .or_else(|| T::from_scalar(T::TYPE.default_bad_value()))
            .unwrap_or_default();
        Ok(TypedBad {
            sentinel,
            fill,
            floating: T::TYPE.is_floating(),
        })
    }

    /// Whether the element at `pos` of `buf` is bad.
    pub fn is_bad(&self, buf: &Buffer, pos: usize) -> Result<bool> {
        with_element!(self.data_type, T => {
            let handler = self.typed::<T>()?;
            let value = element::<T>(buf, pos)?;
            Ok(handler.is_bad(value))
        })
    }

    /// Write a bad value at `pos`.
    pub fn put_bad(&self, buf: &mut Buffer, pos: usize) -> Result<()> {
        self.put_bad_range(buf, pos, 1)
    }

    /// Write bad values to `len` elements starting at `start`.
    pub fn put_bad_range(&self, buf: &mut Buffer, start: usize, len: usize) -> Result<()> {
        with_element!(self.data_type, T => {
            let handler = self.typed::<T>()?;
            let actual = buf.data_type();
            let slice = T::slice_mut(buf).ok_or_else(|| mismatch(T::TYPE, actual))?;
            handler.put_bad(checked_range_mut(slice, start, len)?);
            Ok(())
        })
    }

    /// The value at `pos`, or `None` if it is bad.
    pub fn to_number(&self, buf: &Buffer, pos: usize) -> Result<Option<Scalar>> {
        with_element!(self.data_type, T => {
            let handler = self.typed::<T>()?;
            let value = element::<T>(buf, pos)?;
            Ok(handler.to_value(value).map(Element::into_scalar))
        })
    }
}

impl fmt::Display for BadHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bad_value {
            Some(v) => write!(f, "BadHandler:{}:{}", self.data_type, v),
            None => write!(f, "BadHandler:{}:none", self.data_type),
        }
    }
}

fn mismatch(expected: Type, actual: Type) -> Error {
    Error::invalid(format!("{expected} handler applied to {actual} buffer"))
}

fn element<T: Element>(buf: &Buffer, pos: usize) -> Result<T> {
    let slice = T::slice(buf).ok_or_else(|| mismatch(T::TYPE, buf.data_type()))?;
    slice.get(pos).copied().ok_or_else(|| {
        Error::out_of_bounds(format!("position {} in buffer of length {}", pos, slice.len()))
    })
}

/// Bad-value rules of a [`BadHandler`] for a known primitive type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypedBad<T: Element> {
    sentinel: Option<T>,
    fill: T,
    floating: bool,
}

impl<T: Element> TypedBad<T> {
    #[inline]
    pub fn is_bad(&self, value: T) -> bool {
        (self.floating && value.is_nan())
            || self
                .sentinel
                .is_some_and(|s| s.to_bits64() == value.to_bits64())
    }

    /// The value written in place of bad data.
    #[inline]
    pub fn bad_value(&self) -> T {
        self.fill
    }

    #[inline]
    pub fn to_value(&self, value: T) -> Option<T> {
        (!self.is_bad(value)).then_some(value)
    }

    pub fn put_bad(&self, slice: &mut [T]) {
        slice.fill(self.fill);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_sentinel() {
        let bh = BadHandler::new(Type::Int8, Some(Scalar::Int8(-126))).unwrap();
        let buf = Buffer::from(vec![0i8, 1, 2, -126, 4]);
        for i in 0..5 {
            assert_eq!(bh.is_bad(&buf, i).unwrap(), i == 3);
        }
        assert_eq!(bh.to_number(&buf, 3).unwrap(), None);
        assert_eq!(bh.to_number(&buf, 4).unwrap(), Some(Scalar::Int8(4)));
        assert_eq!(bh.to_number(&buf, 0).unwrap(), Some(Scalar::Int8(0)));
    }

    #[test]
    fn test_put_bad_then_is_bad() {
        let sentinels = [
            Scalar::Int8(7),
            Scalar::Int16(-1),
            Scalar::Int32(i32::MAX),
            Scalar::Float32(-99.0),
            Scalar::Float64(1e30),
        ];
        for s in sentinels {
            let t = s.data_type();
            let bh = BadHandler::new(t, Some(s)).unwrap();
            let mut buf = t.new_buffer(6);
            bh.put_bad(&mut buf, 2).unwrap();
            bh.put_bad_range(&mut buf, 4, 2).unwrap();
            let expected = [false, false, true, false, true, true];
            for (i, e) in expected.iter().enumerate() {
                assert_eq!(bh.is_bad(&buf, i).unwrap(), *e, "{bh} at {i}");
            }
            assert_eq!(buf.get(2), Some(s));
        }
    }

    #[test]
    fn test_null_integer_handler() {
        let bh = BadHandler::null(Type::Int16);
        assert_eq!(bh.bad_value(), None);
        let mut buf = Buffer::from(vec![i16::MIN, 3]);
        assert!(!bh.is_bad(&buf, 0).unwrap());
        bh.put_bad(&mut buf, 1).unwrap();
        assert_eq!(buf.get(1), Some(Scalar::Int16(i16::MIN)));
        assert!(!bh.is_bad(&buf, 1).unwrap());
    }

    #[test]
    fn test_float_default_any_nan() {
        let bh = BadHandler::null(Type::Float32);
        assert_eq!(bh, Type::Float32.default_bad_handler());
        let odd_nan = f32::from_bits(0x7fc0_1234);
        let negative_nan = f32::from_bits(0xffc0_0000);
        let buf = Buffer::from(vec![1.0f32, odd_nan, negative_nan, f32::INFINITY]);
        assert!(!bh.is_bad(&buf, 0).unwrap());
        assert!(bh.is_bad(&buf, 1).unwrap());
        assert!(bh.is_bad(&buf, 2).unwrap());
        assert!(!bh.is_bad(&buf, 3).unwrap());
    }

    #[test]
    fn test_float_sentinel_bit_pattern() {
        let bh = BadHandler::new(Type::Float64, Some(Scalar::Float64(-0.0))).unwrap();
        let buf = Buffer::from(vec![0.0f64, -0.0, f64::NAN]);
        assert!(!bh.is_bad(&buf, 0).unwrap());
        assert!(bh.is_bad(&buf, 1).unwrap());
        assert!(bh.is_bad(&buf, 2).unwrap());
    }

    #[test]
    fn test_equality() {
        let a = BadHandler::new(Type::Int32, Some(Scalar::Int32(-1))).unwrap();
        let b = BadHandler::new(Type::Int32, Some(Scalar::Int32(-1))).unwrap();
        let c = BadHandler::new(Type::Int32, None).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(c, BadHandler::null(Type::Int32));
        assert_ne!(c, Type::Int32.default_bad_handler());
        assert_eq!(
            BadHandler::new(Type::Float64, None).unwrap(),
            BadHandler::new(Type::Float64, Some(Scalar::Float64(f64::NAN))).unwrap()
        );
    }

    #[test]
    fn test_rejects_mismatched_types() {
        assert!(matches!(
            BadHandler::new(Type::Int8, Some(Scalar::Int16(1))),
            Err(Error::InvalidArgument(_))
        ));
        let bh = Type::Int8.default_bad_handler();
        let buf = Type::Int16.new_buffer(2);
        assert!(bh.is_bad(&buf, 0).is_err());
        assert!(bh.typed::<f32>().is_err());
        let buf = Type::Int8.new_buffer(2);
        assert!(matches!(
            bh.is_bad(&buf, 2),
            Err(Error::IndexOutOfBounds(_))
        ));
    }
}
