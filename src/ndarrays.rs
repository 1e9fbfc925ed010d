//! Operations on whole arrays: adapting them to requirements, copying and comparing.
use std::sync::Arc;

use log::{debug, trace};

use crate::{
    AccessMode, ArrayAccess, BadHandler, Buffer, Chunk, ChunkStepper, ConvertArrayImpl, Converter,
    CopyArrayImpl, Element, Error, NdArray, OrderedShape, PixelMapArrayImpl, Requirements, Result,
    ScratchArrayImpl, ShapeMapper, TypeConverter, WindowArrayImpl, impls::memory_len,
    types::with_element,
};

/// An array presenting the data of `nda` with the properties `req` asks for.
///
/// Returns (a clone of) `nda` itself if it already complies.
/// Otherwise decorators are layered on in this order:
/// type/bad-value conversion; an in-memory copy, if random access, reordering or windowing
/// is needed of an array without random access; then either a reordering pixel map
/// (which also applies any window) or a window.
///
/// When `req` has no mode, one is derived from the readability and writability of `nda`.
/// A copy made with a writable mode is written back to `nda` when closed or dropped.
pub fn to_required_array(nda: &NdArray, req: &Requirements) -> Result<NdArray> {
    let mode = match req.mode() {
        Some(m) => m,
        None => AccessMode::from_flags(nda.is_readable(), nda.is_writable())
            .unwrap_or(AccessMode::Read),
    };
    if mode.is_readable() && !nda.is_readable() {
        return Err(Error::invalid(format!("{nda} is not readable")));
    }
    if mode.is_writable() && !nda.is_writable() {
        return Err(Error::invalid(format!("{nda} is not writable")));
    }
    let mut nda = nda.clone();

    let target = match (req.bad_handler(), req.data_type()) {
        (Some(bh), _) => Some(bh.clone()),
        (None, Some(t)) if t != nda.data_type() => Some(t.default_bad_handler()),
        _ => None,
    };
    if let Some(target) = target.filter(|bh| bh != nda.bad_handler()) {
        debug!("converting {nda} to {target}");
        let conv = TypeConverter::new(nda.bad_handler().clone(), target);
        nda = NdArray::new(ConvertArrayImpl::new(nda, Arc::new(conv))?)?;
    }

    let reorder = req
        .order()
        .filter(|o| !nda.shape().same_sequence(&nda.shape().with_order(Some(*o))));
    let window = req
        .window()
        .filter(|w| *w != nda.shape().shape())
        .cloned();

    if (req.random() || reorder.is_some() || window.is_some()) && !nda.is_random() {
        debug!("copying {nda} for random access");
        nda = NdArray::new(CopyArrayImpl::new(nda, mode)?)?;
    }

    if let Some(order) = reorder {
        let outer = OrderedShape::new(
            window.unwrap_or_else(|| nda.shape().shape().clone()),
            Some(order),
        );
        debug!("presenting {nda} as {outer}");
        let mapper = ShapeMapper::new(outer.clone(), nda.shape().clone())?;
        nda = NdArray::new(PixelMapArrayImpl::new(nda, outer, mapper)?)?;
    } else if let Some(window) = window {
        debug!("windowing {nda} to {}", window.bounds_string());
        nda = NdArray::new(WindowArrayImpl::new(nda, window)?)?;
    }
    Ok(nda)
}

/// Copy every pixel of `src` into `dst`, translating between their bad values.
///
/// The arrays need the same type and number of pixels; use
/// [`to_required_array`] first to copy between types. If their shapes are equal,
/// pixels are copied by position; otherwise by offset.
/// All checks happen before either array's cursor is taken.
pub fn copy(src: &NdArray, dst: &NdArray) -> Result<()> {
    check_pixel_counts(src.shape(), dst.shape())?;
    if src.data_type() != dst.data_type() {
        return Err(Error::invalid(format!(
            "cannot copy {} data into {} data",
            src.data_type(),
            dst.data_type()
        )));
    }
    if !src.is_readable() {
        return Err(Error::unsupported(format!("{src} is not readable")));
    }
    if !dst.is_writable() {
        return Err(Error::unsupported(format!("{dst} is not writable")));
    }
    let mut s = src.access()?;
    let mut d = dst.access()?;
    copy_access(&mut s, &mut d)?;
    s.close()?;
    d.close()
}

/// An independent in-memory array holding the same data as `nda`.
pub fn scratch_copy(nda: &NdArray) -> Result<NdArray> {
    let imp = ScratchArrayImpl::with_bad_handler(nda.shape().clone(), nda.bad_handler().clone())?;
    let copy = NdArray::new(imp)?;
    self::copy(nda, &copy)?;
    Ok(copy)
}

/// Whether two arrays have the same type, shape and pixel values.
///
/// Pixels which are bad according to each array's own handler match each other,
/// whatever their stored values.
pub fn equals(a: &NdArray, b: &NdArray) -> Result<bool> {
    if a.data_type() != b.data_type() || a.shape().shape() != b.shape().shape() {
        return Ok(false);
    }
    let (a2, b2) = if a.shape().same_sequence(b.shape()) {
        (a.clone(), b.clone())
    } else if a.is_random() {
        let req = Requirements::new()
            .with_mode(AccessMode::Read)
            .with_order(b.shape().effective_order());
        (to_required_array(a, &req)?, b.clone())
    } else {
        let req = Requirements::new()
            .with_mode(AccessMode::Read)
            .with_order(a.shape().effective_order());
        (a.clone(), to_required_array(b, &req)?)
    };

    let data_type = a.data_type();
    let stepper = ChunkStepper::new(a.shape().num_pixels());
    let mut buf1 = data_type.new_buffer(stepper.max_chunk_size());
    let mut buf2 = data_type.new_buffer(stepper.max_chunk_size());
    let mut acc1 = a2.access()?;
    let mut acc2 = b2.access()?;
    for chunk in stepper {
        acc1.read(&mut buf1, 0, chunk.size)?;
        acc2.read(&mut buf2, 0, chunk.size)?;
        let same = with_element!(data_type, T => {
            chunk_matches::<T>(&buf1, a.bad_handler(), &buf2, b.bad_handler(), chunk.size)
        })?;
        if !same {
            return Ok(false);
        }
    }
    acc1.close()?;
    acc2.close()?;
    Ok(true)
}

fn chunk_matches<T: Element>(
    buf1: &Buffer,
    bad1: &BadHandler,
    buf2: &Buffer,
    bad2: &BadHandler,
    len: usize,
) -> Result<bool> {
    let (bad1, bad2) = (bad1.typed::<T>()?, bad2.typed::<T>()?);
    let (Some(s1), Some(s2)) = (T::slice(buf1), T::slice(buf2)) else {
        return Err(Error::invalid("comparison buffers have the wrong type"));
    };
    Ok(s1[..len]
        .iter()
        .zip(&s2[..len])
        .all(|(x, y)| match (bad1.is_bad(*x), bad2.is_bad(*y)) {
            (true, true) => true,
            (false, false) => x == y,
            _ => false,
        }))
}

fn check_pixel_counts(src: &OrderedShape, dst: &OrderedShape) -> Result<()> {
    if src.num_pixels() != dst.num_pixels() {
        return Err(Error::ShapeMismatch(format!(
            "cannot copy {} pixels of {src} into {} pixels of {dst}",
            src.num_pixels(),
            dst.num_pixels()
        )));
    }
    Ok(())
}

/// Copy everything from a fresh source cursor to a fresh destination cursor.
pub(crate) fn copy_access(src: &mut ArrayAccess, dst: &mut ArrayAccess) -> Result<()> {
    check_pixel_counts(src.shape(), dst.shape())?;
    let npix = src.shape().num_pixels();
    let conv = TypeConverter::new(src.bad_handler().clone(), dst.bad_handler().clone());

    if src.shape().shape() != dst.shape().shape() || src.shape().same_sequence(dst.shape()) {
        if src.is_readable() && dst.is_writable() {
            if let (Some(sm), Some(dm)) = (src.mapped(), dst.mapped()) {
                if !Arc::ptr_eq(&sm, &dm) {
                    trace!("copying {npix} pixels between mapped buffers");
                    let n = memory_len(src.shape())?;
                    let s = sm.read()?;
                    let mut d = dm.write()?;
                    return conv.convert12(&s, 0, &mut d, 0, n);
                }
            }
        }
        trace!("copying {npix} pixels in chunks");
        let stepper = ChunkStepper::new(npix);
        let size = stepper.max_chunk_size();
        return copy_chunks(src, dst, &conv, stepper, size);
    }

    if src.is_random() {
        trace!("copying {npix} pixels in destination order");
        let positions = dst.shape().pixels();
        copy_pixels(src, dst, &conv, positions, true)
    } else if dst.is_random() {
        trace!("copying {npix} pixels in source order");
        let positions = src.shape().pixels();
        copy_pixels(src, dst, &conv, positions, false)
    } else {
        trace!("copying {npix} pixels through memory to reorder them");
        let scratch = NdArray::new(ScratchArrayImpl::with_bad_handler(
            src.shape().clone(),
            src.bad_handler().clone(),
        )?)?;
        copy_access(src, &mut scratch.access()?)?;
        copy_access(&mut scratch.access()?, dst)?;
        scratch.close()
    }
}

fn copy_chunks(
    src: &mut ArrayAccess,
    dst: &mut ArrayAccess,
    conv: &TypeConverter,
    chunks: impl Iterator<Item = Chunk>,
    max_size: usize,
) -> Result<()> {
    let unit = conv.is_unit12();
    let mut sbuf = src.data_type().new_buffer(max_size);
    let mut dbuf = dst.data_type().new_buffer(if unit { 0 } else { max_size });
    for chunk in chunks {
        src.read(&mut sbuf, 0, chunk.size)?;
        if unit {
            dst.write(&sbuf, 0, chunk.size)?;
        } else {
            conv.convert12(&sbuf, 0, &mut dbuf, 0, chunk.size)?;
            dst.write(&dbuf, 0, chunk.size)?;
        }
    }
    Ok(())
}

/// One pixel at a time, positioning the source (`seek_src`) or the destination
/// at each position in turn.
fn copy_pixels(
    src: &mut ArrayAccess,
    dst: &mut ArrayAccess,
    conv: &TypeConverter,
    positions: impl Iterator<Item = crate::ShortVec<i64>>,
    seek_src: bool,
) -> Result<()> {
    let mut sbuf = src.data_type().new_buffer(1);
    let mut dbuf = dst.data_type().new_buffer(1);
    for pos in positions {
        if seek_src {
            src.set_position(&pos)?;
        } else {
            dst.set_position(&pos)?;
        }
        src.read(&mut sbuf, 0, 1)?;
        conv.convert12(&sbuf, 0, &mut dbuf, 0, 1)?;
        dst.write(&dbuf, 0, 1)?;
    }
    Ok(())
}
