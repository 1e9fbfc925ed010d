use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU8, Ordering},
    },
};

use log::{debug, warn};

use crate::{
    ArrayAccess, ArrayImpl, BadHandler, Error, OrderedShape, Result, SharedBuffer, State, Type,
};

const UNOPENED: u8 = 0;
const OPEN: u8 = 1;
const CLOSED: u8 = 2;

fn decode_state(raw: u8) -> State {
    match raw {
        UNOPENED => State::Unopened,
        OPEN => State::Open,
        _ => State::Closed,
    }
}

struct Inner {
    imp: Box<dyn ArrayImpl>,
    state: AtomicU8,
    accessed: AtomicBool,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if self.state.swap(CLOSED, Ordering::AcqRel) == OPEN {
            if let Err(e) = self.imp.close() {
                warn!("closing dropped array failed: {e}");
            }
        }
    }
}

/// A shared handle on an [`ArrayImpl`] which enforces its lifecycle
/// and hands out validated cursors.
///
/// Clones refer to the same array. The implementation is closed by
/// [`NdArray::close`], or when the last handle and cursor are dropped.
/// Decorators hold clones of the handles they wrap, so wrapped arrays
/// stay usable for as long as any view of them exists.
#[derive(Clone)]
pub struct NdArray {
    inner: Arc<Inner>,
}

impl NdArray {
    /// Wrap and open an implementation.
    pub fn new(imp: impl ArrayImpl + 'static) -> Result<Self> {
        Self::from_boxed(Box::new(imp))
    }

    pub fn from_boxed(imp: Box<dyn ArrayImpl>) -> Result<Self> {
        let nda = Self::unopened(imp);
        nda.open()?;
        Ok(nda)
    }

    /// Wrap an implementation without opening it; see [`NdArray::open`].
    pub fn unopened(imp: Box<dyn ArrayImpl>) -> Self {
        Self {
            inner: Arc::new(Inner {
                imp,
                state: AtomicU8::new(UNOPENED),
                accessed: AtomicBool::new(false),
            }),
        }
    }

    /// Open the implementation. Fails unless the array is unopened.
    pub fn open(&self) -> Result<()> {
        self.inner
            .state
            .compare_exchange(UNOPENED, OPEN, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|s| Error::state(format!("cannot open {} array", decode_state(s))))?;
        if let Err(e) = self.inner.imp.open() {
            self.inner.state.store(UNOPENED, Ordering::Release);
            return Err(e);
        }
        debug!("opened {self}");
        Ok(())
    }

    /// Close the implementation, releasing its resources.
    /// Closing a closed array does nothing.
    pub fn close(&self) -> Result<()> {
        match self.inner.state.swap(CLOSED, Ordering::AcqRel) {
            OPEN => {
                debug!("closing {self}");
                self.inner.imp.close()
            }
            _ => Ok(()),
        }
    }

    pub fn state(&self) -> State {
        decode_state(self.inner.state.load(Ordering::Acquire))
    }

    pub(crate) fn check_open(&self) -> Result<()> {
        match self.state() {
            State::Open => Ok(()),
            s => Err(Error::state(format!("array is {s}"))),
        }
    }

    /// A new cursor at offset 0.
    ///
    /// Fails if the array is not open, or if it does not support multiple access
    /// and a cursor has already been requested.
    pub fn access(&self) -> Result<ArrayAccess> {
        self.check_open()?;
        if !self.multiple_access() && self.inner.accessed.swap(true, Ordering::AcqRel) {
            return Err(Error::unsupported(format!(
                "{self} allows only a single cursor"
            )));
        }
        let imp = self.inner.imp.access()?;
        Ok(ArrayAccess::new(self.clone(), imp))
    }

    pub fn shape(&self) -> &OrderedShape {
        self.inner.imp.shape()
    }

    pub fn data_type(&self) -> Type {
        self.inner.imp.data_type()
    }

    pub fn bad_handler(&self) -> &BadHandler {
        self.inner.imp.bad_handler()
    }

    pub fn is_readable(&self) -> bool {
        self.inner.imp.is_readable()
    }

    pub fn is_writable(&self) -> bool {
        self.inner.imp.is_writable()
    }

    pub fn is_random(&self) -> bool {
        self.inner.imp.is_random()
    }

    pub fn multiple_access(&self) -> bool {
        self.inner.imp.multiple_access()
    }

    pub fn can_map(&self) -> bool {
        self.inner.imp.can_map()
    }

    /// The whole array as one buffer, if mappable and open.
    pub fn mapped(&self) -> Option<SharedBuffer> {
        match self.state() {
            State::Open => self.inner.imp.mapped(),
            _ => None,
        }
    }

    /// Whether both handles refer to the same array.
    pub fn ptr_eq(&self, other: &NdArray) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for NdArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NdArray")
            .field("imp", &self.inner.imp)
            .field("state", &self.state())
            .finish()
    }
}

impl fmt::Display for NdArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} array {}", self.data_type(), self.shape())
    }
}
