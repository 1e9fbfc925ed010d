use std::fmt;

use log::warn;

use crate::{
    AccessImpl, BadHandler, Buffer, Error, NdArray, OrderedShape, Result, Shape, SharedBuffer,
    ShortVec, Type,
    shape::{RunIter, clip_run},
};

/// A cursor over the pixels of an [`NdArray`], tracking a current offset.
///
/// Every transfer is validated before it reaches the implementation:
/// offsets lie in `0..=num_pixels` (the last being "at end", where nothing can be read),
/// transfers may not run past the last pixel, buffers must have the array's type,
/// and cursors on non-random arrays may not be repositioned.
///
/// After a failed transfer the cursor's position is unspecified; reposition it
/// before retrying.
pub struct ArrayAccess {
    array: NdArray,
    imp: Box<dyn AccessImpl>,
    offset: u64,
    closed: bool,
}

impl ArrayAccess {
    pub(crate) fn new(array: NdArray, imp: Box<dyn AccessImpl>) -> Self {
        Self {
            array,
            imp,
            offset: 0,
            closed: false,
        }
    }

    /// The array this cursor belongs to.
    pub fn array(&self) -> &NdArray {
        &self.array
    }

    pub fn shape(&self) -> &OrderedShape {
        self.array.shape()
    }

    pub fn data_type(&self) -> Type {
        self.array.data_type()
    }

    pub fn bad_handler(&self) -> &BadHandler {
        self.array.bad_handler()
    }

    pub fn is_readable(&self) -> bool {
        self.array.is_readable()
    }

    pub fn is_writable(&self) -> bool {
        self.array.is_writable()
    }

    pub fn is_random(&self) -> bool {
        self.array.is_random()
    }

    pub fn mapped(&self) -> Option<SharedBuffer> {
        self.array.mapped()
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The position of the pixel at the current offset; fails at the end of the array.
    pub fn position(&self) -> Result<ShortVec<i64>> {
        self.shape().offset_to_position(self.offset)
    }

    pub fn set_offset(&mut self, offset: u64) -> Result<()> {
        self.check_usable()?;
        let npix = self.shape().num_pixels();
        if offset > npix {
            return Err(Error::out_of_bounds(format!(
                "offset {offset} beyond {npix} pixels"
            )));
        }
        if offset == self.offset {
            return Ok(());
        }
        if !self.is_random() {
            return Err(Error::unsupported(format!(
                "cannot move from offset {} to {} without random access",
                self.offset, offset
            )));
        }
        self.imp.set_offset(offset)?;
        self.offset = offset;
        Ok(())
    }

    pub fn set_position(&mut self, pos: &[i64]) -> Result<()> {
        let offset = self.shape().position_to_offset(pos)?;
        self.set_offset(offset)
    }

    /// Read `len` pixels from the current offset into `buf[start..start + len]`.
    pub fn read(&mut self, buf: &mut Buffer, start: usize, len: usize) -> Result<()> {
        if !self.is_readable() {
            return Err(Error::unsupported("array is not readable"));
        }
        self.check_transfer(buf, start, len)?;
        self.imp.read(buf, start, len)?;
        self.offset += len as u64;
        Ok(())
    }

    /// Write `buf[start..start + len]` to `len` pixels from the current offset.
    pub fn write(&mut self, buf: &Buffer, start: usize, len: usize) -> Result<()> {
        if !self.is_writable() {
            return Err(Error::unsupported("array is not writable"));
        }
        self.check_transfer(buf, start, len)?;
        self.imp.write(buf, start, len)?;
        self.offset += len as u64;
        Ok(())
    }

    /// Read every pixel of `tile` into the start of `buf`, in the array's order.
    ///
    /// Pixels of the tile outside the array are bad.
    /// Leaves the cursor at an unspecified offset.
    pub fn read_tile(&mut self, buf: &mut Buffer, tile: &Shape) -> Result<()> {
        if tile.ndim() != self.shape().ndim() {
            return Err(Error::invalid(format!(
                "{}-dimensional tile of {}-dimensional array",
                tile.ndim(),
                self.shape().ndim()
            )));
        }
        let n = usize::try_from(tile.num_pixels())
            .map_err(|_| Error::invalid("tile too large for memory"))?;
        self.data_type().check_buffer(buf, n)?;
        if tile == self.shape().shape() {
            self.set_offset(0)?;
            return self.read(buf, 0, n);
        }
        if !self.is_random() {
            return Err(Error::unsupported(
                "reading a tile of a different shape needs random access",
            ));
        }
        let inner = self.shape().shape().clone();
        let tile_shape = OrderedShape::new(tile.clone(), Some(self.shape().effective_order()));
        let axis = tile_shape.fastest_axis();
        self.bad_handler().put_bad_range(buf, 0, n)?;
        for run in RunIter::new(&tile_shape, 0, n as u64) {
            if let Some((skip, len)) = clip_run(&run, axis, &inner) {
                let mut pos = run.position;
                pos[axis] += skip as i64;
                self.set_position(&pos)?;
                self.read(buf, (run.index + skip) as usize, len as usize)?;
            }
        }
        Ok(())
    }

    /// Release cursor-local resources. Further transfers fail.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.imp.close()
    }

    fn check_usable(&self) -> Result<()> {
        if self.closed {
            return Err(Error::state("cursor is closed"));
        }
        self.array.check_open()
    }

    fn check_transfer(&self, buf: &Buffer, start: usize, len: usize) -> Result<()> {
        self.check_usable()?;
        let end = start
            .checked_add(len)
            .ok_or_else(|| Error::invalid("buffer range overflows"))?;
        self.data_type().check_buffer(buf, end)?;
        let npix = self.shape().num_pixels();
        if self.offset + len as u64 > npix {
            return Err(Error::EndOfData {
                offset: self.offset,
                size: len,
                len: npix,
            });
        }
        Ok(())
    }
}

/// Cursors are themselves usable as the cursors of decorators
/// which present another array's pixels unchanged.
impl AccessImpl for ArrayAccess {
    fn set_offset(&mut self, offset: u64) -> Result<()> {
        ArrayAccess::set_offset(self, offset)
    }

    fn read(&mut self, buf: &mut Buffer, start: usize, len: usize) -> Result<()> {
        ArrayAccess::read(self, buf, start, len)
    }

    fn write(&mut self, buf: &Buffer, start: usize, len: usize) -> Result<()> {
        ArrayAccess::write(self, buf, start, len)
    }

    fn close(&mut self) -> Result<()> {
        ArrayAccess::close(self)
    }
}

impl Drop for ArrayAccess {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("closing dropped cursor failed: {e}");
        }
    }
}

impl fmt::Debug for ArrayAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayAccess")
            .field("array", &self.array)
            .field("offset", &self.offset)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Order, Scalar, ScratchArrayImpl,
        tests::{SequentialArrayImpl, filled_array, init_logger},
    };

    #[test]
    fn test_offsets_and_positions() {
        init_logger();
        let nda = filled_array(&[0, 10, 20], &[2, 3, 4], Order::RowMajor, Type::Int32);
        let mut acc = nda.access().unwrap();
        acc.set_position(&[1, 12, 23]).unwrap();
        assert_eq!(acc.offset(), 23);
        assert_eq!(acc.position().unwrap().as_slice(), &[1, 12, 23]);
        acc.set_offset(24).unwrap();
        assert!(acc.position().is_err());
        assert!(matches!(
            acc.set_offset(25),
            Err(Error::IndexOutOfBounds(_))
        ));
        assert!(matches!(
            acc.set_position(&[2, 10, 20]),
            Err(Error::IndexOutOfBounds(_))
        ));
    }

    #[test]
    fn test_end_of_data() {
        let nda = filled_array(&[0], &[10], Order::RowMajor, Type::Int8);
        let mut acc = nda.access().unwrap();
        let mut buf = Type::Int8.new_buffer(10);
        acc.set_offset(7).unwrap();
        assert!(matches!(
            acc.read(&mut buf, 0, 4),
            Err(Error::EndOfData {
                offset: 7,
                size: 4,
                len: 10
            })
        ));
        acc.set_offset(7).unwrap();
        acc.read(&mut buf, 0, 3).unwrap();
        assert_eq!(acc.offset(), 10);
        assert!(matches!(
            acc.read(&mut buf, 0, 1),
            Err(Error::EndOfData { .. })
        ));
        acc.read(&mut buf, 0, 0).unwrap();
    }

    #[test]
    fn test_buffer_checks() {
        let nda = filled_array(&[0], &[10], Order::RowMajor, Type::Int8);
        let mut acc = nda.access().unwrap();
        let mut wrong = Type::Int16.new_buffer(10);
        assert!(matches!(
            acc.read(&mut wrong, 0, 2),
            Err(Error::InvalidArgument(_))
        ));
        let mut short = Type::Int8.new_buffer(3);
        assert!(matches!(
            acc.read(&mut short, 2, 2),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_sequential_cursor() {
        let nda = NdArray::new(SequentialArrayImpl::ramp(&[6], Type::Int16)).unwrap();
        let mut acc = nda.access().unwrap();
        let mut buf = Type::Int16.new_buffer(6);
        acc.set_offset(0).unwrap();
        acc.read(&mut buf, 0, 2).unwrap();
        assert!(matches!(acc.set_offset(0), Err(Error::Unsupported(_))));
        acc.set_offset(2).unwrap();
        acc.read(&mut buf, 2, 4).unwrap();
        assert_eq!(buf, Buffer::from(vec![0i16, 1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_closed_cursor() {
        let nda = filled_array(&[0], &[4], Order::RowMajor, Type::Float64);
        let mut acc = nda.access().unwrap();
        acc.close().unwrap();
        let mut buf = Type::Float64.new_buffer(1);
        assert!(matches!(acc.read(&mut buf, 0, 1), Err(Error::State(_))));

        let mut acc = nda.access().unwrap();
        nda.close().unwrap();
        assert!(matches!(acc.read(&mut buf, 0, 1), Err(Error::State(_))));
    }

    #[test]
    fn test_read_only_and_write_only() {
        let nda = NdArray::new(
            crate::GeneratorArrayImpl::ramp(
                OrderedShape::new(Shape::from_dims(&[3]).unwrap(), None),
                Type::Int32,
                10,
            )
            .unwrap(),
        )
        .unwrap();
        let mut acc = nda.access().unwrap();
        let buf = Type::Int32.new_buffer(1);
        assert!(matches!(acc.write(&buf, 0, 1), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_read_tile() {
        let nda = filled_array(&[0, 0], &[3, 2], Order::RowMajor, Type::Int16);
        let mut acc = nda.access().unwrap();
        let tile = Shape::try_new(&[-1, 1], &[5, 2]).unwrap();
        let mut buf = Type::Int16.new_buffer(10);
        acc.read_tile(&mut buf, &tile).unwrap();
        let bad = i16::MIN;
        // filled values are offset + 1: row y=1 holds 4, 5, 6
        assert_eq!(
            buf,
            Buffer::from(vec![bad, 4i16, 5, 6, bad, bad, bad, bad, bad, bad])
        );

        let mut whole = Type::Int16.new_buffer(6);
        acc.read_tile(&mut whole, nda.shape().shape()).unwrap();
        assert_eq!(whole, Buffer::from(vec![1i16, 2, 3, 4, 5, 6]));
    }

    #[test]
    fn test_read_tile_column_major() {
        let nda = filled_array(&[0, 0], &[2, 3], Order::ColumnMajor, Type::Int32);
        let mut acc = nda.access().unwrap();
        let tile = Shape::try_new(&[1, 1], &[2, 2]).unwrap();
        let mut buf = Type::Int32.new_buffer(4);
        acc.read_tile(&mut buf, &tile).unwrap();
        // position (x, y) holds x * 3 + y + 1
        assert_eq!(buf.get(0), Some(Scalar::Int32(5)));
        assert_eq!(buf.get(1), Some(Scalar::Int32(6)));
        assert_eq!(buf.get(2), Some(Scalar::Int32(i32::MIN)));
        assert_eq!(buf.get(3), Some(Scalar::Int32(i32::MIN)));
    }

    #[test]
    fn test_access_as_impl() {
        let nda = NdArray::new(
            ScratchArrayImpl::new(
                OrderedShape::new(Shape::from_dims(&[4]).unwrap(), None),
                Type::Int8,
            )
            .unwrap(),
        )
        .unwrap();
        let mut boxed: Box<dyn AccessImpl> = Box::new(nda.access().unwrap());
        boxed.write(&Buffer::from(vec![1i8, 2, 3, 4]), 0, 4).unwrap();
        assert!(boxed.write(&Buffer::from(vec![5i8]), 0, 1).is_err());
    }
}
