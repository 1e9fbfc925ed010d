//! N-dimensional rectangular regions and their pixel orderings.
use std::fmt;

use smallvec::ToSmallVec;

use crate::{Error, Result, ShortVec};

mod order;
pub use order::{Order, OrderedShape};
mod iter;
pub use iter::PixelIter;
pub(crate) use iter::{RunIter, clip_run};

/// Origin used when only the dimensions of a shape are given.
pub const DEFAULT_ORIGIN: i64 = 1;

/// Extent placeholder meaning "unbounded", rendered as `*` by [`Shape::dims_to_string`].
pub const UNBOUNDED: i64 = i64::MIN;

/// A rectangular region: a signed origin and a non-negative extent per axis.
///
/// Every pixel position `p` within the shape satisfies
/// `origin[i] <= p[i] < origin[i] + dims[i]` on each axis `i`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    origin: ShortVec<i64>,
    dims: ShortVec<i64>,
    num_pixels: u64,
}

impl Shape {
    /// Fails if the dimensionalities differ or are zero, an extent is negative,
    /// an upper bound overflows, or the pixel count overflows `i64`.
    pub fn try_new(origin: &[i64], dims: &[i64]) -> Result<Self> {
        if origin.len() != dims.len() {
            return Err(Error::invalid(format!(
                "origin has {} axes but dims has {}",
                origin.len(),
                dims.len()
            )));
        }
        if dims.is_empty() {
            return Err(Error::invalid("shape must have at least one axis"));
        }
        let mut num_pixels: i64 = 1;
        for (o, d) in origin.iter().zip(dims.iter()) {
            if *d < 0 {
                return Err(Error::invalid(format!(
                    "negative extent in dims {}",
                    Shape::dims_to_string(dims)
                )));
            }
            if o.checked_add(*d).is_none() {
                return Err(Error::invalid("shape upper bound overflows"));
            }
            num_pixels = num_pixels
                .checked_mul(*d)
                .ok_or_else(|| Error::invalid("shape pixel count overflows"))?;
        }
        Ok(Self {
            origin: origin.to_smallvec(),
            dims: dims.to_smallvec(),
            num_pixels: num_pixels as u64,
        })
    }

    /// A shape with every axis starting at [`DEFAULT_ORIGIN`].
    pub fn from_dims(dims: &[i64]) -> Result<Self> {
        let origin: ShortVec<i64> = dims.iter().map(|_| DEFAULT_ORIGIN).collect();
        Self::try_new(&origin, dims)
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn origin(&self) -> &[i64] {
        &self.origin
    }

    pub fn dims(&self) -> &[i64] {
        &self.dims
    }

    /// Exclusive upper bound per axis (`origin + dims`).
    pub fn limits(&self) -> ShortVec<i64> {
        self.origin
            .iter()
            .zip(self.dims.iter())
            .map(|(o, d)| o + d)
            .collect()
    }

    /// Inclusive upper bound per axis (`origin + dims - 1`).
    pub fn upper_bounds(&self) -> ShortVec<i64> {
        self.limits().iter().map(|l| l - 1).collect()
    }

    pub fn num_pixels(&self) -> u64 {
        self.num_pixels
    }

    pub fn is_empty(&self) -> bool {
        self.num_pixels == 0
    }

    /// Whether `pos` is a pixel position of this shape.
    /// Positions of the wrong dimensionality are never within.
    pub fn within(&self, pos: &[i64]) -> bool {
        pos.len() == self.ndim()
            && pos
                .iter()
                .zip(self.origin.iter().zip(self.dims.iter()))
                .all(|(p, (o, d))| *p >= *o && *p < *o + *d)
    }

    /// Whether every pixel of `other` is also a pixel of `self`.
    /// An empty `other` of the same dimensionality is always contained.
    pub fn contains(&self, other: &Shape) -> bool {
        if other.ndim() != self.ndim() {
            return false;
        }
        if other.is_empty() {
            return true;
        }
        self.origin
            .iter()
            .zip(self.limits())
            .zip(other.origin.iter().zip(other.limits()))
            .all(|((o1, l1), (o2, l2))| o1 <= o2 && l2 <= l1)
    }

    /// The region common to both shapes; disjoint shapes give an empty shape.
    pub fn intersection(&self, other: &Shape) -> Result<Shape> {
        self.check_ndim(other)?;
        let mut origin = ShortVec::with_capacity(self.ndim());
        let mut dims = ShortVec::with_capacity(self.ndim());
        for ((o1, l1), (o2, l2)) in self
            .origin
            .iter()
            .zip(self.limits())
            .zip(other.origin.iter().zip(other.limits()))
        {
            let lo = *o1.max(o2);
            let hi = l1.min(l2);
            origin.push(lo);
            // hi - lo cannot exceed either extent once hi > lo
            dims.push(if hi > lo { hi - lo } else { 0 });
        }
        Shape::try_new(&origin, &dims)
    }

    /// The smallest shape containing both shapes.
    pub fn union(&self, other: &Shape) -> Result<Shape> {
        self.check_ndim(other)?;
        let mut origin = ShortVec::with_capacity(self.ndim());
        let mut dims = ShortVec::with_capacity(self.ndim());
        for ((o1, l1), (o2, l2)) in self
            .origin
            .iter()
            .zip(self.limits())
            .zip(other.origin.iter().zip(other.limits()))
        {
            let lo = *o1.min(o2);
            let extent = l1
                .max(l2)
                .checked_sub(lo)
                .ok_or_else(|| Error::invalid("union extent overflows"))?;
            origin.push(lo);
            dims.push(extent);
        }
        Shape::try_new(&origin, &dims)
    }

    /// Render dimensions as `(2,3,4)`, with `*` for [`UNBOUNDED`] extents.
    pub fn dims_to_string(dims: &[i64]) -> String {
        let parts: Vec<String> = dims
            .iter()
            .map(|d| {
                if *d == UNBOUNDED {
                    "*".to_string()
                } else {
                    d.to_string()
                }
            })
            .collect();
        format!("({})", parts.join(","))
    }

    /// Render the inclusive bounds as `(0:1,10:12,20:23)`.
    pub fn bounds_string(&self) -> String {
        let parts: Vec<String> = self
            .origin
            .iter()
            .zip(self.upper_bounds())
            .map(|(lo, hi)| format!("{lo}:{hi}"))
            .collect();
        format!("({})", parts.join(","))
    }

    fn check_ndim(&self, other: &Shape) -> Result<()> {
        if self.ndim() != other.ndim() {
            return Err(Error::invalid(format!(
                "shapes have {} and {} dimensions",
                self.ndim(),
                other.ndim()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Shape::dims_to_string(&self.dims))
    }
}
