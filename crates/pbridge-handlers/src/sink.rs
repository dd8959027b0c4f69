use std::ptr::NonNull;

/// Type-erased pointer to the current write target of a decode.
///
/// A sink carries no lifetime: callbacks agree among themselves on what it
/// points to. The decoder only copies sinks around and never dereferences them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Sink(NonNull<()>);

impl Sink {
    pub fn new<T>(target: &mut T) -> Self {
        Self(NonNull::from(target).cast())
    }

    pub fn from_raw<T>(ptr: NonNull<T>) -> Self {
        Self(ptr.cast())
    }

    pub fn as_ptr<T>(self) -> *mut T {
        self.0.as_ptr().cast()
    }

    /// # Safety
    /// The sink must point to a live `T` with no other active reference for
    /// the duration of `'a`.
    pub unsafe fn cast<'a, T>(self) -> &'a mut T {
        unsafe { &mut *self.as_ptr::<T>() }
    }
}
