//! Two-way conversion between buffers of differing type and bad-value conventions.
use std::{fmt::Debug, sync::Arc};

use crate::{BadHandler, Buffer, Element, Error, Result, Type, TypedBad, types::with_element};

/// A monotonic numeric mapping applied while converting, with its inverse.
pub trait Scaler: Debug + Send + Sync {
    /// Map a value of the first type's data to the second's.
    fn scale(&self, value: f64) -> f64;

    /// Map a value of the second type's data back to the first's.
    fn inverse(&self, value: f64) -> f64;

    /// Whether both directions are the identity.
    fn is_unit(&self) -> bool {
        false
    }
}

/// `scale(x) = x * factor + offset`, as used for scaled integer storage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScaler {
    factor: f64,
    offset: f64,
}

impl LinearScaler {
    /// Fails unless `factor` is finite and non-zero and `offset` is finite.
    pub fn new(factor: f64, offset: f64) -> Result<Self> {
        if !factor.is_finite() || factor == 0.0 || !offset.is_finite() {
            return Err(Error::invalid(format!(
                "linear scaling needs a finite non-zero factor and finite offset, got {factor} and {offset}"
            )));
        }
        Ok(Self { factor, offset })
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }
}

impl Scaler for LinearScaler {
    fn scale(&self, value: f64) -> f64 {
        value * self.factor + self.offset
    }

    fn inverse(&self, value: f64) -> f64 {
        (value - self.offset) / self.factor
    }

    fn is_unit(&self) -> bool {
        self.factor == 1.0 && self.offset == 0.0
    }
}

/// Converts runs of elements between a first (type, bad handler) pair and a second.
///
/// Bad elements on either side convert to bad elements on the other,
/// and so do values not representable in the destination type.
pub trait Converter: Debug + Send + Sync {
    fn bad_handler1(&self) -> &BadHandler;

    fn bad_handler2(&self) -> &BadHandler;

    fn type1(&self) -> Type {
        self.bad_handler1().data_type()
    }

    fn type2(&self) -> Type {
        self.bad_handler2().data_type()
    }

    /// Convert `len` first-type elements of `src` from `src_start` into `dst` at `dst_start`.
    fn convert12(
        &self,
        src: &Buffer,
        src_start: usize,
        dst: &mut Buffer,
        dst_start: usize,
        len: usize,
    ) -> Result<()>;

    /// Convert `len` second-type elements of `src` from `src_start` into `dst` at `dst_start`.
    fn convert21(
        &self,
        src: &Buffer,
        src_start: usize,
        dst: &mut Buffer,
        dst_start: usize,
        len: usize,
    ) -> Result<()>;

    /// Whether first-to-second conversion copies elements unchanged.
    fn is_unit12(&self) -> bool;

    /// Whether second-to-first conversion copies elements unchanged.
    fn is_unit21(&self) -> bool;
}

/// The standard [`Converter`]: numeric conversion with optional rescaling.
///
/// Integer destinations round to nearest (halves away from zero).
#[derive(Debug, Clone)]
pub struct TypeConverter {
    bad1: BadHandler,
    bad2: BadHandler,
    scaler: Option<Arc<dyn Scaler>>,
    unit: bool,
}

impl TypeConverter {
    pub fn new(bad1: BadHandler, bad2: BadHandler) -> Self {
        Self::with_scaler(bad1, bad2, None)
    }

    /// Values of the first type are mapped through [`Scaler::scale`] on the way to the second,
    /// and through [`Scaler::inverse`] on the way back.
    pub fn with_scaler(
        bad1: BadHandler,
        bad2: BadHandler,
        scaler: Option<Arc<dyn Scaler>>,
    ) -> Self {
        let scaler = scaler.filter(|s| !s.is_unit());
        let unit = bad1 == bad2 && scaler.is_none();
        Self {
            bad1,
            bad2,
            scaler,
            unit,
        }
    }

    pub fn scaler(&self) -> Option<&Arc<dyn Scaler>> {
        self.scaler.as_ref()
    }
}

impl Converter for TypeConverter {
    fn bad_handler1(&self) -> &BadHandler {
        &self.bad1
    }

    fn bad_handler2(&self) -> &BadHandler {
        &self.bad2
    }

    fn convert12(
        &self,
        src: &Buffer,
        src_start: usize,
        dst: &mut Buffer,
        dst_start: usize,
        len: usize,
    ) -> Result<()> {
        if self.unit {
            self.type1().check_buffer(src, src_start + len)?;
            return dst.copy_from(dst_start, src, src_start, len);
        }
        let scale = self.scaler.as_ref().map(|s| move |v: f64| s.scale(v));
        convert(
            &self.bad1,
            src,
            src_start,
            &self.bad2,
            dst,
            dst_start,
            len,
            scale,
        )
    }

    fn convert21(
        &self,
        src: &Buffer,
        src_start: usize,
        dst: &mut Buffer,
        dst_start: usize,
        len: usize,
    ) -> Result<()> {
        if self.unit {
            self.type2().check_buffer(src, src_start + len)?;
            return dst.copy_from(dst_start, src, src_start, len);
        }
        let scale = self.scaler.as_ref().map(|s| move |v: f64| s.inverse(v));
        convert(
            &self.bad2,
            src,
            src_start,
            &self.bad1,
            dst,
            dst_start,
            len,
            scale,
        )
    }

    fn is_unit12(&self) -> bool {
        self.unit
    }

    fn is_unit21(&self) -> bool {
        self.unit
    }
}

#[allow(clippy::too_many_arguments)]
fn convert<F: Fn(f64) -> f64>(
    bad_src: &BadHandler,
    src: &Buffer,
    src_start: usize,
    bad_dst: &BadHandler,
    dst: &mut Buffer,
    dst_start: usize,
    len: usize,
    scale: Option<F>,
) -> Result<()> {
    bad_src.data_type().check_buffer(src, src_start + len)?;
    bad_dst.data_type().check_buffer(dst, dst_start + len)?;
    with_element!(bad_src.data_type(), S => {
        with_element!(bad_dst.data_type(), D => {
            let s = S::slice(src).ok_or_else(|| Error::invalid("source type mismatch"))?;
            let d = D::slice_mut(dst).ok_or_else(|| Error::invalid("destination type mismatch"))?;
            convert_elements(
                &s[src_start..src_start + len],
                bad_src.typed::<S>()?,
                &mut d[dst_start..dst_start + len],
                bad_dst.typed::<D>()?,
                scale,
            );
            Ok(())
        })
    })
}

/// Element-wise conversion between slices of equal length.
pub(crate) fn convert_elements<S: Element, D: Element, F: Fn(f64) -> f64>(
    src: &[S],
    bad_src: TypedBad<S>,
    dst: &mut [D],
    bad_dst: TypedBad<D>,
    scale: Option<F>,
) {
    let fill = bad_dst.bad_value();
    match scale {
        None => {
            for (s, d) in src.iter().zip(dst.iter_mut()) {
                *d = if bad_src.is_bad(*s) {
                    fill
                } else {
                    D::from_f64(s.to_f64()).unwrap_or(fill)
                };
            }
        }
        Some(f) => {
            for (s, d) in src.iter().zip(dst.iter_mut()) {
                *d = if bad_src.is_bad(*s) {
                    fill
                } else {
                    D::from_f64(f(s.to_f64())).unwrap_or(fill)
                };
            }
        }
    }
}
