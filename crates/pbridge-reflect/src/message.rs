//! Raw message instances.
//!
//! A [`Message`] is only ever seen behind a pointer: the header below sits at
//! offset 0 of an allocation sized by its class, with field slots following
//! at the offsets recorded in the [`ClassLayout`]. [`MessageBox`] owns one
//! such allocation.
//!
//! A reference to the header only covers the header's own bytes. Slot
//! addresses are therefore computed from the `base` pointer stored in the
//! header, which was taken from the allocation itself and may address every
//! byte of the instance.
//!
//! [`ClassLayout`]: crate::ClassLayout

use std::alloc::{Layout, alloc_zeroed, dealloc, handle_alloc_error};
use std::mem::size_of;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::sync::Arc;

use pbridge_core::{DefaultValue, MessageDescriptor};

use crate::class::{MessageClass, ScalarKind, SlotKind};
use crate::reflection::{Reflection, Value};
use crate::repeated::{PtrElement, RepeatedField, RepeatedPtrField};
use crate::unknown::UnknownFieldSet;

#[cfg(feature = "platform-strings")]
use crate::strings::{Cord, StringPieceField};

/// Header flags.
pub mod flags {
    /// The instance is a class prototype: shared, immutable, never freed
    /// through a parent.
    pub const PROTOTYPE: u32 = 0x0001;
}

/// Message header, at offset 0 of every instance.
#[repr(C)]
pub struct Message {
    /// Strong reference, released when the instance is destroyed.
    class: *const MessageClass,
    /// Start of the allocation; every slot address derives from it.
    base: *mut u8,
    flags: u32,
    _reserved: u32,
}

pub(crate) const HEADER_SIZE: usize = size_of::<Message>();
pub(crate) const MESSAGE_ALIGN: usize = 8;

const _: () = assert!(HEADER_SIZE % MESSAGE_ALIGN == 0);

// SAFETY: a message exclusively owns its fields; the class is `Send + Sync`.
unsafe impl Send for Message {}
unsafe impl Sync for Message {}

/// Run `$body` with `$r` bound to the typed `RepeatedField` behind `$at`.
macro_rules! with_repeated {
    ($kind:expr, $at:expr, |$r:ident| $body:expr) => {
        match $kind {
            ScalarKind::I32 | ScalarKind::Enum => {
                let $r = $at.cast::<RepeatedField<i32>>();
                $body
            }
            ScalarKind::I64 => {
                let $r = $at.cast::<RepeatedField<i64>>();
                $body
            }
            ScalarKind::U32 => {
                let $r = $at.cast::<RepeatedField<u32>>();
                $body
            }
            ScalarKind::U64 => {
                let $r = $at.cast::<RepeatedField<u64>>();
                $body
            }
            ScalarKind::F32 => {
                let $r = $at.cast::<RepeatedField<f32>>();
                $body
            }
            ScalarKind::F64 => {
                let $r = $at.cast::<RepeatedField<f64>>();
                $body
            }
            ScalarKind::Bool => {
                let $r = $at.cast::<RepeatedField<bool>>();
                $body
            }
        }
    };
}
pub(crate) use with_repeated;

impl Message {
    pub fn class(&self) -> &MessageClass {
        // SAFETY: the header holds a strong reference for the instance's lifetime.
        unsafe { &*self.class }
    }

    /// A new strong reference to the instance's class.
    pub fn class_arc(&self) -> Arc<MessageClass> {
        // SAFETY: `self.class` came from `Arc::into_raw` and is still owned by us.
        unsafe {
            Arc::increment_strong_count(self.class);
            Arc::from_raw(self.class)
        }
    }

    pub fn descriptor(&self) -> &MessageDescriptor {
        self.class().descriptor()
    }

    pub fn reflection(&self) -> &dyn Reflection {
        self.class().reflection()
    }

    pub fn is_prototype(&self) -> bool {
        self.flags & flags::PROTOTYPE != 0
    }

    /// Whether this instance was built from `class`.
    pub fn is_instance_of(&self, class: &MessageClass) -> bool {
        ptr::eq(self.class, class)
    }

    /// Allocate a fresh, empty instance of the same class.
    pub fn new_instance(&self) -> MessageBox {
        MessageBox::allocate(&self.class_arc(), 0)
    }

    /// Base address of the instance, valid for the whole instance.
    pub fn as_ptr(&self) -> *const u8 {
        self.base
    }

    /// Mutable base address of the instance, valid for the whole instance.
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.base
    }

    pub fn unknown_fields(&self) -> &UnknownFieldSet {
        let offset = self.class().layout().unknown_fields_offset();
        // SAFETY: every instance initializes its unknown-field set.
        unsafe { self.slot::<UnknownFieldSet>(offset) }
    }

    pub fn mutable_unknown_fields(&mut self) -> &mut UnknownFieldSet {
        let offset = self.class().layout().unknown_fields_offset();
        // SAFETY: as above.
        unsafe { self.slot_mut::<UnknownFieldSet>(offset) }
    }

    /// # Safety
    /// A `T` must live at `offset`.
    pub(crate) unsafe fn slot<T>(&self, offset: usize) -> &T {
        unsafe { &*self.as_ptr().add(offset).cast::<T>() }
    }

    /// # Safety
    /// A `T` must live at `offset`.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn slot_mut<T>(&mut self, offset: usize) -> &mut T {
        unsafe { &mut *self.as_mut_ptr().add(offset).cast::<T>() }
    }

    pub(crate) fn has_bit(&self, index: usize) -> bool {
        let byte = self.class().layout().has_bits_offset() + index / 8;
        // SAFETY: the has-bits area covers every declared field.
        (unsafe { *self.slot::<u8>(byte) }) & (1 << (index % 8)) != 0
    }

    pub(crate) fn set_has_bit(&mut self, index: usize) {
        let byte = self.class().layout().has_bits_offset() + index / 8;
        // SAFETY: as above.
        unsafe { *self.slot_mut::<u8>(byte) |= 1 << (index % 8) };
    }

    /// Reset every field to its default. Allocated strings, submessages and
    /// repeated elements are kept for reuse.
    pub fn clear(&mut self) {
        assert!(!self.is_prototype(), "Message::clear: prototypes are immutable");

        let class = self.class_arc();
        let layout = class.layout();
        let base = self.as_mut_ptr();

        // SAFETY: offsets come from this instance's own layout.
        unsafe {
            ptr::write_bytes(
                base.add(layout.has_bits_offset()),
                0,
                layout.has_bits_len(),
            );
            (*base.add(layout.unknown_fields_offset()).cast::<UnknownFieldSet>()).clear();

            for (index, slot) in layout.slots().iter().enumerate() {
                let Some(slot) = slot else { continue };
                let at = base.add(slot.offset);
                match slot.kind {
                    SlotKind::Scalar(kind) => write_scalar(at, &scalar_default(&class, index, kind)),
                    SlotKind::Repeated(kind) => with_repeated!(kind, at, |r| (*r).clear()),
                    SlotKind::String => {
                        let s = *at.cast::<*mut Vec<u8>>();
                        if s != class.default_string_ptr(index) {
                            (*s).clear();
                            (*s).extend_from_slice(default_bytes(&class, index));
                        }
                    }
                    SlotKind::RepeatedString => (*at.cast::<RepeatedPtrField<Vec<u8>>>()).clear(),
                    #[cfg(feature = "platform-strings")]
                    SlotKind::Cord => {
                        let cord = &mut *at.cast::<Cord>();
                        cord.clear();
                        cord.append(default_bytes(&class, index));
                    }
                    #[cfg(feature = "platform-strings")]
                    SlotKind::RepeatedCord => (*at.cast::<RepeatedField<Cord>>()).clear(),
                    #[cfg(feature = "platform-strings")]
                    SlotKind::StringPiece => {
                        (*at.cast::<StringPieceField>()).copy_from(default_bytes(&class, index));
                    }
                    #[cfg(feature = "platform-strings")]
                    SlotKind::RepeatedStringPiece => {
                        (*at.cast::<RepeatedPtrField<StringPieceField>>()).clear()
                    }
                    SlotKind::Message => {
                        let sub = *at.cast::<*mut Message>();
                        if !sub.is_null() && !(*sub).is_prototype() {
                            (*sub).clear();
                        }
                    }
                    SlotKind::RepeatedMessage => (*at.cast::<RepeatedPtrField<Message>>()).clear(),
                }
            }
        }
    }

    /// Drop every field and free the allocation.
    ///
    /// # Safety
    /// `this` must be a live instance created by [`MessageBox::allocate`],
    /// not referenced anywhere else.
    pub(crate) unsafe fn destroy(this: NonNull<Message>) {
        unsafe {
            let msg = this.as_ptr();
            let class_ptr = (*msg).class;
            let class = &*class_ptr;
            let layout = class.layout();
            let base = (*msg).base;
            let prototype = (*msg).is_prototype();

            ptr::drop_in_place(base.add(layout.unknown_fields_offset()).cast::<UnknownFieldSet>());

            for (index, slot) in layout.slots().iter().enumerate() {
                let Some(slot) = slot else { continue };
                let at = base.add(slot.offset);
                match slot.kind {
                    SlotKind::Scalar(_) => {}
                    SlotKind::Repeated(kind) => with_repeated!(kind, at, |r| ptr::drop_in_place(r)),
                    SlotKind::String => {
                        let s = *at.cast::<*mut Vec<u8>>();
                        if s != class.default_string_ptr(index) {
                            drop(Box::from_raw(s));
                        }
                    }
                    SlotKind::RepeatedString => {
                        ptr::drop_in_place(at.cast::<RepeatedPtrField<Vec<u8>>>())
                    }
                    #[cfg(feature = "platform-strings")]
                    SlotKind::Cord => ptr::drop_in_place(at.cast::<Cord>()),
                    #[cfg(feature = "platform-strings")]
                    SlotKind::RepeatedCord => ptr::drop_in_place(at.cast::<RepeatedField<Cord>>()),
                    #[cfg(feature = "platform-strings")]
                    SlotKind::StringPiece => ptr::drop_in_place(at.cast::<StringPieceField>()),
                    #[cfg(feature = "platform-strings")]
                    SlotKind::RepeatedStringPiece => {
                        ptr::drop_in_place(at.cast::<RepeatedPtrField<StringPieceField>>())
                    }
                    SlotKind::Message => {
                        let sub = *at.cast::<*mut Message>();
                        if !prototype && !sub.is_null() && !(*sub).is_prototype() {
                            Message::destroy(NonNull::new_unchecked(sub));
                        }
                    }
                    SlotKind::RepeatedMessage => {
                        ptr::drop_in_place(at.cast::<RepeatedPtrField<Message>>())
                    }
                }
            }

            let alloc_layout = instance_layout(class);
            drop(Arc::from_raw(class_ptr));
            dealloc(base, alloc_layout);
        }
    }
}

impl PtrElement for Message {
    fn clear(&mut self) {
        Message::clear(self);
    }

    unsafe fn destroy(elem: NonNull<Self>) {
        unsafe { Message::destroy(elem) }
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("class", &self.descriptor().full_name())
            .field("prototype", &self.is_prototype())
            .finish_non_exhaustive()
    }
}

fn instance_layout(class: &MessageClass) -> Layout {
    Layout::from_size_align(class.layout().size(), MESSAGE_ALIGN)
        .expect("class layout size fits in isize")
}

fn default_bytes(class: &MessageClass, index: usize) -> &[u8] {
    class.default_string(index).map_or(&[], |d| d.as_slice())
}

/// The value a scalar field holds before it is first written.
pub(crate) fn scalar_default(class: &MessageClass, index: usize, kind: ScalarKind) -> Value {
    let declared = class.scalar_default(index);
    match (kind, declared) {
        (ScalarKind::I32, Some(DefaultValue::Int(v))) => Value::I32(*v as i32),
        (ScalarKind::I64, Some(DefaultValue::Int(v))) => Value::I64(*v),
        (ScalarKind::U32, Some(DefaultValue::UInt(v))) => Value::U32(*v as u32),
        (ScalarKind::U64, Some(DefaultValue::UInt(v))) => Value::U64(*v),
        (ScalarKind::F32, Some(DefaultValue::Float(v))) => Value::F32(*v as f32),
        (ScalarKind::F64, Some(DefaultValue::Float(v))) => Value::F64(*v),
        (ScalarKind::Bool, Some(DefaultValue::Bool(v))) => Value::Bool(*v),
        (ScalarKind::Enum, Some(DefaultValue::Enum(v))) => Value::Enum(*v),
        (ScalarKind::Enum, _) => {
            let field = class.descriptor().field(index);
            let number = field
                .enum_type()
                .map_or(0, |id| class.pool().enum_type(id).default_number());
            Value::Enum(number)
        }
        (kind, _) => Value::zero(kind),
    }
}

/// # Safety
/// `at` must point at a slot of the value's scalar type.
pub(crate) unsafe fn write_scalar(at: *mut u8, value: &Value) {
    unsafe {
        match *value {
            Value::I32(v) | Value::Enum(v) => at.cast::<i32>().write(v),
            Value::I64(v) => at.cast::<i64>().write(v),
            Value::U32(v) => at.cast::<u32>().write(v),
            Value::U64(v) => at.cast::<u64>().write(v),
            Value::F32(v) => at.cast::<f32>().write(v),
            Value::F64(v) => at.cast::<f64>().write(v),
            Value::Bool(v) => at.cast::<bool>().write(v),
            Value::Bytes(_) => panic!("write_scalar: bytes are not a scalar"),
        }
    }
}

/// # Safety
/// `at` must point at a slot of scalar type `kind`.
pub(crate) unsafe fn read_scalar(at: *const u8, kind: ScalarKind) -> Value {
    unsafe {
        match kind {
            ScalarKind::I32 => Value::I32(*at.cast::<i32>()),
            ScalarKind::Enum => Value::Enum(*at.cast::<i32>()),
            ScalarKind::I64 => Value::I64(*at.cast::<i64>()),
            ScalarKind::U32 => Value::U32(*at.cast::<u32>()),
            ScalarKind::U64 => Value::U64(*at.cast::<u64>()),
            ScalarKind::F32 => Value::F32(*at.cast::<f32>()),
            ScalarKind::F64 => Value::F64(*at.cast::<f64>()),
            ScalarKind::Bool => Value::Bool(*at.cast::<bool>()),
        }
    }
}

/// Owning handle to a message instance.
pub struct MessageBox(NonNull<Message>);

// SAFETY: `MessageBox` is the unique owner of its instance.
unsafe impl Send for MessageBox {}
unsafe impl Sync for MessageBox {}

impl MessageBox {
    pub(crate) fn allocate(class: &Arc<MessageClass>, flags: u32) -> Self {
        let layout = instance_layout(class);
        // SAFETY: layouts always include the header, so the size is non-zero.
        let raw = unsafe { alloc_zeroed(layout) };
        let Some(base) = NonNull::new(raw) else {
            handle_alloc_error(layout);
        };

        let msg = base.cast::<Message>();
        // SAFETY: fresh allocation sized and aligned for this class.
        unsafe {
            msg.as_ptr().write(Message {
                class: Arc::into_raw(Arc::clone(class)),
                base: base.as_ptr(),
                flags,
                _reserved: 0,
            });
            init_fields(base.as_ptr(), class);
        }
        Self(msg)
    }

    /// Give up ownership; the caller must eventually pass the pointer back
    /// through [`MessageBox::from_raw`] or hand it to an owning container.
    pub fn into_raw(self) -> NonNull<Message> {
        let ptr = self.0;
        std::mem::forget(self);
        ptr
    }

    /// # Safety
    /// `ptr` must come from [`MessageBox::into_raw`] and not be owned elsewhere.
    pub unsafe fn from_raw(ptr: NonNull<Message>) -> Self {
        Self(ptr)
    }

    pub fn as_ptr(&self) -> *mut Message {
        self.0.as_ptr()
    }
}

impl Deref for MessageBox {
    type Target = Message;

    fn deref(&self) -> &Message {
        // SAFETY: owned, live instance.
        unsafe { self.0.as_ref() }
    }
}

impl DerefMut for MessageBox {
    fn deref_mut(&mut self) -> &mut Message {
        // SAFETY: owned, live instance; `&mut self` guarantees exclusivity.
        unsafe { self.0.as_mut() }
    }
}

impl Drop for MessageBox {
    fn drop(&mut self) {
        // SAFETY: we own the instance and nobody else refers to it.
        unsafe { Message::destroy(self.0) }
    }
}

impl std::fmt::Debug for MessageBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        (**self).fmt(f)
    }
}

/// # Safety
/// `base` must be a zeroed allocation laid out for `class`.
unsafe fn init_fields(base: *mut u8, class: &MessageClass) {
    let layout = class.layout();
    unsafe {
        base.add(layout.unknown_fields_offset())
            .cast::<UnknownFieldSet>()
            .write(UnknownFieldSet::new());

        for (index, slot) in layout.slots().iter().enumerate() {
            let Some(slot) = slot else { continue };
            let at = base.add(slot.offset);
            match slot.kind {
                SlotKind::Scalar(kind) => write_scalar(at, &scalar_default(class, index, kind)),
                SlotKind::Repeated(kind) => with_repeated!(kind, at, |r| r.write(RepeatedField::new())),
                SlotKind::String => at
                    .cast::<*mut Vec<u8>>()
                    .write(class.default_string_ptr(index)),
                SlotKind::RepeatedString => at
                    .cast::<RepeatedPtrField<Vec<u8>>>()
                    .write(RepeatedPtrField::new()),
                #[cfg(feature = "platform-strings")]
                SlotKind::Cord => {
                    let mut cord = Cord::new();
                    cord.append(default_bytes(class, index));
                    at.cast::<Cord>().write(cord);
                }
                #[cfg(feature = "platform-strings")]
                SlotKind::RepeatedCord => at.cast::<RepeatedField<Cord>>().write(RepeatedField::new()),
                #[cfg(feature = "platform-strings")]
                SlotKind::StringPiece => {
                    let mut piece = StringPieceField::new();
                    piece.copy_from(default_bytes(class, index));
                    at.cast::<StringPieceField>().write(piece);
                }
                #[cfg(feature = "platform-strings")]
                SlotKind::RepeatedStringPiece => at
                    .cast::<RepeatedPtrField<StringPieceField>>()
                    .write(RepeatedPtrField::new()),
                SlotKind::Message => at.cast::<*mut Message>().write(ptr::null_mut()),
                SlotKind::RepeatedMessage => at
                    .cast::<RepeatedPtrField<Message>>()
                    .write(RepeatedPtrField::new()),
            }
        }
    }
}
