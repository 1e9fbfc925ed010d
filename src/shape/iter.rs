use std::iter::FusedIterator;

use crate::{Order, OrderedShape, Shape, ShortVec};

/// Lazy iterator over pixel positions in enumeration order.
///
/// Created by [`OrderedShape::pixel_iter`] or [`OrderedShape::pixels`];
/// once exhausted it stays exhausted.
#[derive(Debug, Clone)]
pub struct PixelIter {
    origin: ShortVec<i64>,
    limits: ShortVec<i64>,
    axes: ShortVec<usize>,
    pos: ShortVec<i64>,
    remaining: u64,
}

impl PixelIter {
    pub(super) fn new(shape: &Shape, order: Order, pos: ShortVec<i64>, count: u64) -> Self {
        Self {
            origin: ShortVec::from_slice(shape.origin()),
            limits: shape.limits(),
            axes: order.axes(shape.ndim()),
            pos,
            remaining: count,
        }
    }

    /// Positions still to be yielded.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Iterator for PixelIter {
    type Item = ShortVec<i64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let out = self.pos.clone();
        self.remaining -= 1;
        if self.remaining > 0 {
            for &axis in self.axes.iter() {
                self.pos[axis] += 1;
                if self.pos[axis] < self.limits[axis] {
                    break;
                }
                self.pos[axis] = self.origin[axis];
            }
        }
        Some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl FusedIterator for PixelIter {}

/// A stretch of consecutive offsets along the fastest-varying axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Run {
    /// Position of the first pixel of the run.
    pub position: ShortVec<i64>,
    /// Index of the first pixel relative to the start of the iteration.
    pub index: u64,
    pub len: u64,
}

/// Splits `len` pixels from offset `start` of an ordered shape into [`Run`]s,
/// none of which crosses a step on any axis but the fastest.
pub(crate) struct RunIter<'a> {
    shape: &'a OrderedShape,
    start: u64,
    offset: u64,
    end: u64,
}

impl<'a> RunIter<'a> {
    /// Callers guarantee `start + len <= shape.num_pixels()`.
    pub fn new(shape: &'a OrderedShape, start: u64, len: u64) -> Self {
        Self {
            shape,
            start,
            offset: start,
            end: start + len,
        }
    }
}

impl Iterator for RunIter<'_> {
    type Item = Run;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.end {
            return None;
        }
        let position = self.shape.offset_to_position(self.offset).ok()?;
        let axis = self.shape.fastest_axis();
        let to_edge = (self.shape.limits()[axis] - position[axis]) as u64;
        let len = to_edge.min(self.end - self.offset);
        let run = Run {
            position,
            index: self.offset - self.start,
            len,
        };
        self.offset += len;
        Some(run)
    }
}

/// The part of a run which lies inside `inner`,
/// as (skip from the run start, length), or `None` if the run misses `inner` entirely.
pub(crate) fn clip_run(run: &Run, axis: usize, inner: &Shape) -> Option<(u64, u64)> {
    if run.position.len() != inner.ndim() {
        return None;
    }
    let origin = inner.origin();
    let dims = inner.dims();
    for (a, p) in run.position.iter().enumerate() {
        if a != axis && !(*p >= origin[a] && *p < origin[a] + dims[a]) {
            return None;
        }
    }
    let first = run.position[axis];
    let lo = first.max(origin[axis]);
    let hi = (first + run.len as i64).min(origin[axis] + dims[axis]);
    (lo < hi).then(|| ((lo - first) as u64, (hi - lo) as u64))
}
