use std::ptr::{self, NonNull};

use pbridge_core::FieldDescriptor;
use pbridge_reflect::{GeneratedReflection, Message};

use crate::layout::{compute_hasbit, compute_offset};

/// Where one field lives inside instances of one class.
///
/// Built once per field and shared by every callback of that field. All raw
/// address arithmetic into messages goes through here. A handle is only
/// meaningful for instances of the class it was built from; callers check
/// the class once per decode, not per write.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FieldOffset {
    offset: usize,
    repeated: bool,
    hasbyte: usize,
    mask: u8,
}

impl FieldOffset {
    pub fn new(field: &FieldDescriptor, reflection: &GeneratedReflection) -> Self {
        let offset = compute_offset(field, reflection);
        if field.is_repeated() {
            return Self {
                offset,
                repeated: true,
                hasbyte: 0,
                mask: 0,
            };
        }
        let hasbit = compute_hasbit(field, reflection);
        Self {
            offset,
            repeated: false,
            hasbyte: (hasbit / 8) as usize,
            mask: 1 << (hasbit % 8),
        }
    }

    /// Handle for the class's unknown-field set. It has no presence bit.
    pub fn unknown_fields(reflection: &GeneratedReflection) -> Self {
        Self {
            offset: reflection.unknown_fields_offset(),
            repeated: true,
            hasbyte: 0,
            mask: 0,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_repeated(&self) -> bool {
        self.repeated
    }

    pub fn hasbyte(&self) -> usize {
        self.hasbyte
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }

    /// Pointer to the field's slot inside `msg`.
    ///
    /// The result is only valid to dereference as `T` when `msg` is an
    /// instance of the class this handle was built from and `T` is the
    /// slot's type.
    pub fn field_ptr<T>(&self, msg: &mut Message) -> *mut T {
        msg.as_mut_ptr().wrapping_add(self.offset).cast()
    }

    /// The field's slot in `msg`, viewed as a `T`.
    ///
    /// Handles are created by the builders only after the class has been
    /// checked to store this field as the builder's `T`, and callbacks only
    /// run on instances of that class.
    pub(crate) fn get_mut<'a, T>(&self, msg: &'a mut Message) -> &'a mut T {
        // SAFETY: see above; the slot is initialized for every instance.
        unsafe { &mut *self.field_ptr::<T>(msg) }
    }

    /// Store `value` in the field's slot.
    pub(crate) fn write<T: Copy>(&self, msg: &mut Message, value: T) {
        *self.get_mut::<T>(msg) = value;
    }

    /// The instance a pointer slot refers to, made private first.
    ///
    /// A slot that is null or still points at `shared` is pointed at a new
    /// value from `make`, which the message then owns. Otherwise the value
    /// already owned by the message is returned.
    pub(crate) fn owned_target<'a, T>(
        &self,
        msg: &'a mut Message,
        shared: *const T,
        make: impl FnOnce() -> NonNull<T>,
    ) -> &'a mut T {
        let slot = self.get_mut::<*mut T>(msg);
        if slot.is_null() || ptr::eq(*slot, shared) {
            *slot = make().as_ptr();
        }
        // SAFETY: the slot now points at a live value owned by `msg`.
        unsafe { &mut **slot }
    }

    /// Mark the field present in `msg`.
    pub fn set_hasbit(&self, msg: &mut Message) {
        assert!(!self.repeated, "set_hasbit on a repeated field handle");
        // SAFETY: `hasbyte` lies in the has-bits area of every instance of
        // the class this handle was built from.
        unsafe { *msg.as_mut_ptr().add(self.hasbyte) |= self.mask };
    }

    /// Whether the field is marked present in `msg`.
    pub fn has(&self, msg: &Message) -> bool {
        assert!(!self.repeated, "presence of a repeated field handle");
        // SAFETY: as in `set_hasbit`.
        unsafe { *msg.as_ptr().add(self.hasbyte) & self.mask != 0 }
    }
}
