use log::debug;

use super::{AccessImpl, ArrayImpl, ScratchArrayImpl};
use crate::{
    AccessMode, BadHandler, Error, NdArray, OrderedShape, Result, SharedBuffer, Type,
    ndarrays::copy_access,
};

/// An in-memory copy of another array, giving random and multiple access
/// to arrays which lack them.
///
/// With a readable mode the base's data is copied in on construction.
/// With a writable mode the copy's data is written back to the base when this array is closed.
/// [`AccessMode::Update`] reads and later writes the base,
/// so needs a base which allows more than one cursor.
#[derive(Debug, Clone)]
pub struct CopyArrayImpl {
    base: NdArray,
    copy: NdArray,
    mode: AccessMode,
}

impl CopyArrayImpl {
    pub fn new(base: NdArray, mode: AccessMode) -> Result<Self> {
        if mode.is_readable() && !base.is_readable() {
            return Err(Error::unsupported(format!("cannot copy unreadable {base}")));
        }
        if mode.is_writable() && !base.is_writable() {
            return Err(Error::unsupported(format!(
                "cannot write back to unwritable {base}"
            )));
        }
        if mode == AccessMode::Update && !base.multiple_access() {
            return Err(Error::unsupported(format!(
                "updating a copy of {base} needs multiple access"
            )));
        }
        let scratch =
            ScratchArrayImpl::with_bad_handler(base.shape().clone(), base.bad_handler().clone())?;
        let copy = NdArray::new(scratch)?;
        if mode.is_readable() {
            debug!("copying {base} into memory");
            let mut src = base.access()?;
            let mut dst = copy.access()?;
            copy_access(&mut src, &mut dst)?;
            src.close()?;
        }
        Ok(Self { base, copy, mode })
    }

    pub fn base(&self) -> &NdArray {
        &self.base
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }
}

impl ArrayImpl for CopyArrayImpl {
    fn shape(&self) -> &OrderedShape {
        self.base.shape()
    }

    fn data_type(&self) -> Type {
        self.base.data_type()
    }

    fn bad_handler(&self) -> &BadHandler {
        self.base.bad_handler()
    }

    fn is_readable(&self) -> bool {
        self.mode.is_readable()
    }

    fn is_writable(&self) -> bool {
        self.mode.is_writable()
    }

    fn is_random(&self) -> bool {
        true
    }

    fn multiple_access(&self) -> bool {
        true
    }

    fn can_map(&self) -> bool {
        true
    }

    fn mapped(&self) -> Option<SharedBuffer> {
        self.copy.mapped()
    }

    fn access(&self) -> Result<Box<dyn AccessImpl>> {
        Ok(Box::new(self.copy.access()?))
    }

    fn close(&self) -> Result<()> {
        if self.mode.is_writable() {
            debug!("writing copy back to {}", self.base);
            let mut src = self.copy.access()?;
            let mut dst = self.base.access()?;
            copy_access(&mut src, &mut dst)?;
            dst.close()?;
        }
        self.copy.close()
    }
}
