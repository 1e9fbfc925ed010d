use std::{fmt, ops::Deref};

use crate::{Error, Result, Shape, ShortVec};

use super::PixelIter;

/// The order in which the pixels of a shape are enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    /// The first axis varies fastest.
    RowMajor,
    /// The last axis varies fastest.
    ColumnMajor,
}

impl Order {
    /// Axis indices from fastest- to slowest-varying.
    pub fn axes(self, ndim: usize) -> ShortVec<usize> {
        match self {
            Order::RowMajor => (0..ndim).collect(),
            Order::ColumnMajor => (0..ndim).rev().collect(),
        }
    }

    pub fn fastest_axis(self, ndim: usize) -> usize {
        match self {
            Order::RowMajor => 0,
            Order::ColumnMajor => ndim.saturating_sub(1),
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::RowMajor => f.write_str("row-major"),
            Order::ColumnMajor => f.write_str("column-major"),
        }
    }
}

/// A [`Shape`] with a fixed enumeration order, mapping between
/// pixel positions and linear offsets in `0..num_pixels()`.
///
/// An unspecified order enumerates as [`Order::RowMajor`], but is not equal to
/// an explicitly row-major shape; use [`OrderedShape::same_sequence`] to compare
/// enumerations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderedShape {
    shape: Shape,
    order: Option<Order>,
    strides: ShortVec<u64>,
}

impl OrderedShape {
    pub fn new(shape: Shape, order: Option<Order>) -> Self {
        let effective = order.unwrap_or(Order::RowMajor);
        let mut strides: ShortVec<u64> = smallvec::smallvec![0; shape.ndim()];
        let mut step = 1u64;
        for axis in effective.axes(shape.ndim()) {
            strides[axis] = step;
            step = step.saturating_mul(shape.dims()[axis] as u64);
        }
        Self {
            shape,
            order,
            strides,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn into_shape(self) -> Shape {
        self.shape
    }

    pub fn order(&self) -> Option<Order> {
        self.order
    }

    /// The order actually used for enumeration.
    pub fn effective_order(&self) -> Order {
        self.order.unwrap_or(Order::RowMajor)
    }

    /// The same shape enumerated in `order`.
    pub fn with_order(&self, order: Option<Order>) -> OrderedShape {
        OrderedShape::new(self.shape.clone(), order)
    }

    pub fn fastest_axis(&self) -> usize {
        self.effective_order().fastest_axis(self.ndim())
    }

    /// Offset step between neighbouring pixels along each axis.
    pub fn strides(&self) -> &[u64] {
        &self.strides
    }

    pub fn offset_to_position(&self, offset: u64) -> Result<ShortVec<i64>> {
        if offset >= self.num_pixels() {
            return Err(Error::out_of_bounds(format!(
                "offset {} outside shape {} of {} pixels",
                offset,
                self.shape,
                self.num_pixels()
            )));
        }
        Ok(self
            .strides
            .iter()
            .zip(self.shape.origin().iter().zip(self.shape.dims().iter()))
            .map(|(stride, (o, d))| o + ((offset / stride) % (*d as u64)) as i64)
            .collect())
    }

    pub fn position_to_offset(&self, pos: &[i64]) -> Result<u64> {
        if !self.shape.within(pos) {
            return Err(Error::out_of_bounds(format!(
                "position {:?} outside shape {}",
                pos,
                self.shape.bounds_string()
            )));
        }
        Ok(pos
            .iter()
            .zip(self.shape.origin().iter())
            .zip(self.strides.iter())
            .map(|((p, o), stride)| (p - o) as u64 * stride)
            .sum())
    }

    /// Whether both shapes map every position to the same offset.
    ///
    /// Shapes with at most one pixel, or in which at most one axis is longer than 1,
    /// enumerate identically whatever their order.
    pub fn same_sequence(&self, other: &OrderedShape) -> bool {
        self.shape == other.shape
            && (self.effective_order() == other.effective_order() || self.is_degenerate())
    }

    fn is_degenerate(&self) -> bool {
        self.num_pixels() <= 1 || self.shape.dims().iter().filter(|d| **d > 1).count() <= 1
    }

    /// Iterate over pixel positions in enumeration order, starting at offset `start`
    /// and yielding at most `max_count` positions (all remaining if `None`).
    ///
    /// Fails if `start` is not a pixel offset, except that an empty shape may be
    /// iterated from 0.
    pub fn pixel_iter(&self, start: u64, max_count: Option<u64>) -> Result<PixelIter> {
        let npix = self.num_pixels();
        if start >= npix && !(npix == 0 && start == 0) {
            return Err(Error::invalid(format!(
                "iteration start {start} outside 0..{npix}"
            )));
        }
        let available = npix - start;
        let count = max_count.map_or(available, |m| m.min(available));
        let pos = if count > 0 {
            self.offset_to_position(start)?
        } else {
            ShortVec::from_slice(self.shape.origin())
        };
        Ok(PixelIter::new(
            &self.shape,
            self.effective_order(),
            pos,
            count,
        ))
    }

    /// Iterate over every pixel position in enumeration order.
    pub fn pixels(&self) -> PixelIter {
        PixelIter::new(
            &self.shape,
            self.effective_order(),
            ShortVec::from_slice(self.shape.origin()),
            self.num_pixels(),
        )
    }
}

impl Deref for OrderedShape {
    type Target = Shape;

    fn deref(&self) -> &Self::Target {
        &self.shape
    }
}

impl fmt::Display for OrderedShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.order {
            Some(order) => write!(f, "{} {}", self.shape, order),
            None => write!(f, "{} unordered", self.shape),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn ordered(origin: &[i64], dims: &[i64], order: Order) -> OrderedShape {
        OrderedShape::new(Shape::try_new(origin, dims).unwrap(), Some(order))
    }

    #[test]
    fn test_row_major_positions() {
        let os = ordered(&[0, 10, 20], &[2, 3, 4], Order::RowMajor);
        assert_eq!(os.offset_to_position(0).unwrap().as_slice(), &[0, 10, 20]);
        assert_eq!(os.offset_to_position(1).unwrap().as_slice(), &[1, 10, 20]);
        assert_eq!(os.offset_to_position(2).unwrap().as_slice(), &[0, 11, 20]);
        assert_eq!(os.offset_to_position(23).unwrap().as_slice(), &[1, 12, 23]);
        assert_eq!(os.position_to_offset(&[1, 11, 21]).unwrap(), 1 + 2 + 6);
    }

    #[test]
    fn test_column_major_positions() {
        let os = ordered(&[0, 10, 20], &[2, 3, 4], Order::ColumnMajor);
        assert_eq!(os.offset_to_position(1).unwrap().as_slice(), &[0, 10, 21]);
        assert_eq!(os.offset_to_position(4).unwrap().as_slice(), &[0, 11, 20]);
        assert_eq!(os.position_to_offset(&[1, 11, 21]).unwrap(), 12 + 4 + 1);
    }

    #[test]
    fn test_round_trip() {
        for order in [Order::RowMajor, Order::ColumnMajor] {
            let os = ordered(&[-3, 7, 0, 2], &[3, 1, 4, 5], order);
            for k in 0..os.num_pixels() {
                let pos = os.offset_to_position(k).unwrap();
                assert!(os.within(&pos));
                assert_eq!(os.position_to_offset(&pos).unwrap(), k);
            }
        }
    }

    #[test]
    fn test_out_of_range() {
        let os = ordered(&[0, 0], &[2, 2], Order::RowMajor);
        assert!(matches!(
            os.offset_to_position(4),
            Err(Error::IndexOutOfBounds(_))
        ));
        assert!(matches!(
            os.position_to_offset(&[2, 0]),
            Err(Error::IndexOutOfBounds(_))
        ));
        assert!(matches!(
            os.position_to_offset(&[0]),
            Err(Error::IndexOutOfBounds(_))
        ));
    }

    #[test]
    fn test_orders_visit_same_pixels() {
        let row = ordered(&[1, 1, 1], &[3, 2, 4], Order::RowMajor);
        let col = row.with_order(Some(Order::ColumnMajor));
        let row_pixels: Vec<_> = row.pixels().collect();
        let col_pixels: Vec<_> = col.pixels().collect();
        assert_eq!(row_pixels.len(), 24);
        assert_ne!(row_pixels, col_pixels);
        let row_set: HashSet<_> = row_pixels.into_iter().collect();
        let col_set: HashSet<_> = col_pixels.into_iter().collect();
        assert_eq!(row_set.len(), 24);
        assert_eq!(row_set, col_set);
    }

    #[test]
    fn test_same_sequence() {
        let row = ordered(&[0, 0], &[3, 4], Order::RowMajor);
        let col = row.with_order(Some(Order::ColumnMajor));
        let unordered = row.with_order(None);
        assert!(!row.same_sequence(&col));
        assert_ne!(row, unordered);
        assert!(row.same_sequence(&unordered));

        let line = ordered(&[0, 0, 0], &[1, 7, 1], Order::RowMajor);
        assert!(line.same_sequence(&line.with_order(Some(Order::ColumnMajor))));
        let other = ordered(&[1, 0, 0], &[1, 7, 1], Order::RowMajor);
        assert!(!line.same_sequence(&other));
    }

    #[test]
    fn test_empty_same_sequence() {
        let empty = ordered(&[0, 0, 0], &[0, 3, 3], Order::RowMajor);
        assert!(empty.same_sequence(&empty.with_order(Some(Order::ColumnMajor))));
        assert!(empty.same_sequence(&empty.with_order(None)));
    }

    #[test]
    fn test_pixel_iter_window() {
        let os = ordered(&[0, 0], &[3, 2], Order::RowMajor);
        let pixels: Vec<_> = os
            .pixel_iter(2, Some(3))
            .unwrap()
            .map(|p| p.to_vec())
            .collect();
        assert_eq!(pixels, vec![vec![2, 0], vec![0, 1], vec![1, 1]]);
        assert_eq!(os.pixel_iter(4, None).unwrap().count(), 2);
        assert_eq!(os.pixel_iter(4, Some(100)).unwrap().count(), 2);
    }

    #[test]
    fn test_pixel_iter_bounds() {
        let os = ordered(&[0, 0], &[3, 2], Order::RowMajor);
        assert!(matches!(
            os.pixel_iter(6, None),
            Err(Error::InvalidArgument(_))
        ));
        let empty = ordered(&[0, 0], &[0, 2], Order::RowMajor);
        assert_eq!(empty.pixel_iter(0, None).unwrap().count(), 0);
        assert!(empty.pixel_iter(1, None).is_err());
    }

    #[test]
    fn test_pixel_iter_fused() {
        let os = ordered(&[5], &[2], Order::ColumnMajor);
        let mut it = os.pixels();
        assert_eq!(it.next().unwrap().as_slice(), &[5]);
        assert_eq!(it.next().unwrap().as_slice(), &[6]);
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }
}
