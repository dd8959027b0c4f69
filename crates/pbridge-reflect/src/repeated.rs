//! Repeated field containers.
//!
//! [`RepeatedField`] stores values inline. [`RepeatedPtrField`] stores boxed
//! elements and keeps cleared ones around for reuse: after `clear()` the
//! elements stay allocated past `len()` and [`add_from_cleared`] hands them
//! back out before anything new is allocated.
//!
//! [`add_from_cleared`]: RepeatedPtrField::add_from_cleared

use std::ptr::NonNull;

/// Inline repeated storage for scalar values.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct RepeatedField<T> {
    items: Vec<T>,
}

impl<T> RepeatedField<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, value: T) {
        self.items.push(value);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.items.last_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<'a, T> IntoIterator for &'a RepeatedField<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// An element type that a [`RepeatedPtrField`] can own.
pub trait PtrElement {
    /// Reset the element to its empty state so it can be handed out again.
    fn clear(&mut self);

    /// Release an element the container owns.
    ///
    /// # Safety
    /// `elem` must be a live element allocated the way this type expects and
    /// must not be used afterwards.
    unsafe fn destroy(elem: NonNull<Self>);
}

impl PtrElement for Vec<u8> {
    fn clear(&mut self) {
        Vec::clear(self);
    }

    unsafe fn destroy(elem: NonNull<Self>) {
        drop(unsafe { Box::from_raw(elem.as_ptr()) });
    }
}

/// Decides what happens when [`RepeatedPtrField::add_allocated`] has to
/// discard a cleared element to make room.
pub trait ElementPolicy<T: ?Sized> {
    fn delete(&self, elem: NonNull<T>);
}

/// Policy that releases discarded elements normally.
#[derive(Clone, Copy, Debug, Default)]
pub struct OwnedElements;

impl<T: PtrElement> ElementPolicy<T> for OwnedElements {
    fn delete(&self, elem: NonNull<T>) {
        // SAFETY: the container passes only elements it owns and forgets them.
        unsafe { T::destroy(elem) }
    }
}

/// Repeated storage of individually allocated elements.
///
/// `elems[..len]` are live; `elems[len..]` are cleared and ready for reuse.
pub struct RepeatedPtrField<T: PtrElement> {
    elems: Vec<NonNull<T>>,
    len: usize,
}

// SAFETY: the container uniquely owns its elements.
unsafe impl<T: PtrElement + Send> Send for RepeatedPtrField<T> {}
unsafe impl<T: PtrElement + Sync> Sync for RepeatedPtrField<T> {}

impl<T: PtrElement> Default for RepeatedPtrField<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PtrElement> RepeatedPtrField<T> {
    pub fn new() -> Self {
        Self {
            elems: Vec::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of cleared elements waiting for reuse.
    pub fn cleared_count(&self) -> usize {
        self.elems.len() - self.len
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        // SAFETY: live elements are valid and owned by `self`.
        Some(unsafe { self.elems[index].as_ref() })
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len {
            return None;
        }
        // SAFETY: as above; `&mut self` guarantees exclusivity.
        Some(unsafe { self.elems[index].as_mut() })
    }

    pub fn last_mut(&mut self) -> Option<&mut T> {
        let last = self.len.checked_sub(1)?;
        self.get_mut(last)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        // SAFETY: live elements are valid and owned by `self`.
        self.elems[..self.len].iter().map(|p| unsafe { p.as_ref() })
    }

    /// Reuse a cleared element, if one is available, appending it to the live range.
    pub fn add_from_cleared(&mut self) -> Option<NonNull<T>> {
        if self.len == self.elems.len() {
            return None;
        }
        let elem = self.elems[self.len];
        self.len += 1;
        Some(elem)
    }

    /// Append an element allocated by the caller; the container takes ownership.
    ///
    /// When cleared elements are waiting past the live range, the one in the
    /// way is handed to `policy` for deletion and replaced.
    pub fn add_allocated<P: ElementPolicy<T>>(&mut self, policy: &P, elem: NonNull<T>) {
        if self.len < self.elems.len() {
            let discarded = std::mem::replace(&mut self.elems[self.len], elem);
            self.len += 1;
            policy.delete(discarded);
            return;
        }
        self.elems.push(elem);
        self.len += 1;
    }

    /// Mark every element cleared. Elements stay allocated for reuse.
    pub fn clear(&mut self) {
        for elem in &mut self.elems[..self.len] {
            // SAFETY: live elements are valid and owned by `self`.
            unsafe { elem.as_mut() }.clear();
        }
        self.len = 0;
    }
}

impl<T: PtrElement + Default> RepeatedPtrField<T> {
    /// Append an empty element, reusing a cleared one when possible.
    pub fn add(&mut self) -> &mut T {
        let mut elem = match self.add_from_cleared() {
            Some(elem) => elem,
            None => {
                let elem = NonNull::from(Box::leak(Box::<T>::default()));
                self.elems.push(elem);
                self.len += 1;
                elem
            }
        };
        // SAFETY: `elem` is now a live element owned by `self`.
        unsafe { elem.as_mut() }
    }
}

impl<T: PtrElement> Drop for RepeatedPtrField<T> {
    fn drop(&mut self) {
        for elem in self.elems.drain(..) {
            // SAFETY: every stored element, live or cleared, is owned by `self`.
            unsafe { T::destroy(elem) };
        }
    }
}

impl<T: PtrElement + std::fmt::Debug> std::fmt::Debug for RepeatedPtrField<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
