//! Generic per-field access to message instances.
//!
//! [`Reflection`] is the slow path: every read or write goes through a
//! virtual call that looks the field's slot up by index. Classes built with
//! [`ReflectionKind::Generated`] use [`GeneratedReflection`], which also
//! exposes the class layout so callers can address slots directly.
//!
//! [`ReflectionKind::Generated`]: crate::ReflectionKind::Generated

use std::any::Any;
use std::ptr::NonNull;
use std::sync::{Arc, Weak};

use pbridge_core::{FieldDescriptor, MessageId};

use crate::class::{ClassLayout, FieldSlot, MessageClass, ScalarKind, SlotKind};
use crate::factory::MessageFactory;
use crate::message::{Message, read_scalar, write_scalar};
use crate::repeated::{OwnedElements, RepeatedField, RepeatedPtrField};
use crate::unknown::UnknownFieldSet;

#[cfg(feature = "platform-strings")]
use crate::strings::{Cord, StringPieceField};

/// A field value, as read or written through reflection.
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Enum(i32),
    Bytes(Vec<u8>),
}

impl Value {
    pub(crate) fn zero(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::I32 => Self::I32(0),
            ScalarKind::I64 => Self::I64(0),
            ScalarKind::U32 => Self::U32(0),
            ScalarKind::U64 => Self::U64(0),
            ScalarKind::F32 => Self::F32(0.0),
            ScalarKind::F64 => Self::F64(0.0),
            ScalarKind::Bool => Self::Bool(false),
            ScalarKind::Enum => Self::Enum(0),
        }
    }

    /// `None` for bytes.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        Some(match self {
            Self::I32(_) => ScalarKind::I32,
            Self::I64(_) => ScalarKind::I64,
            Self::U32(_) => ScalarKind::U32,
            Self::U64(_) => ScalarKind::U64,
            Self::F32(_) => ScalarKind::F32,
            Self::F64(_) => ScalarKind::F64,
            Self::Bool(_) => ScalarKind::Bool,
            Self::Enum(_) => ScalarKind::Enum,
            Self::Bytes(_) => return None,
        })
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// Per-class field access.
///
/// Contract violations (a field of another message type, a value of the wrong
/// kind, a singular accessor on a repeated field, writing a prototype) panic.
pub trait Reflection: Any + Send + Sync {
    /// Capability check: callers downcast to a concrete reflection type.
    fn as_any(&self) -> &dyn Any;

    /// Singular: presence bit. Repeated: non-empty.
    fn has_field(&self, msg: &Message, field: &FieldDescriptor) -> bool;

    /// Singular: 0 or 1. Repeated: element count.
    fn field_len(&self, msg: &Message, field: &FieldDescriptor) -> usize;

    /// Current value of a singular scalar or string field (its default when unset).
    fn get(&self, msg: &Message, field: &FieldDescriptor) -> Value;

    fn get_repeated(&self, msg: &Message, field: &FieldDescriptor, index: usize) -> Value;

    /// Store a singular value and mark the field present.
    fn set(&self, msg: &mut Message, field: &FieldDescriptor, value: Value);

    /// Append to a repeated scalar or string field.
    fn add(&self, msg: &mut Message, field: &FieldDescriptor, value: Value);

    /// Append bytes to a singular string, or to the last element of a repeated one.
    fn append_string(&self, msg: &mut Message, field: &FieldDescriptor, bytes: &[u8]);

    /// The submessage, if present.
    fn message<'a>(&self, msg: &'a Message, field: &FieldDescriptor) -> Option<&'a Message>;

    fn repeated_message<'a>(
        &self,
        msg: &'a Message,
        field: &FieldDescriptor,
        index: usize,
    ) -> &'a Message;

    /// Mark the submessage present, allocating it on first use.
    fn mutable_message<'a>(&self, msg: &'a mut Message, field: &FieldDescriptor)
    -> &'a mut Message;

    /// Append a submessage, reusing a cleared element when possible.
    fn add_message<'a>(&self, msg: &'a mut Message, field: &FieldDescriptor) -> &'a mut Message;

    fn unknown_fields<'a>(&self, msg: &'a Message) -> &'a UnknownFieldSet;

    fn mutable_unknown_fields<'a>(&self, msg: &'a mut Message) -> &'a mut UnknownFieldSet;

    /// Reset every field of `msg`.
    fn clear(&self, msg: &mut Message);

    /// The factory that built this class, while it is alive. Submessage
    /// prototypes are found through it.
    fn message_factory(&self) -> Option<Arc<MessageFactory>>;
}

/// Reflection for classes laid out by this crate.
///
/// Besides the [`Reflection`] methods it publishes the class layout:
/// [`offset_of`](Self::offset_of), [`has_bits_offset`](Self::has_bits_offset)
/// and [`unknown_fields_offset`](Self::unknown_fields_offset). The layout
/// rules are pinned by [`LAYOUT_VERSION`](Self::LAYOUT_VERSION).
#[derive(Debug)]
pub struct GeneratedReflection {
    id: MessageId,
    slots: Vec<Option<FieldSlot>>,
    has_bits_offset: usize,
    unknown_fields_offset: usize,
    factory: Weak<MessageFactory>,
}

impl GeneratedReflection {
    /// Bumped whenever the byte layout of instances changes.
    pub const LAYOUT_VERSION: u32 = 2;

    pub(crate) fn new(id: MessageId, layout: &ClassLayout, factory: Weak<MessageFactory>) -> Self {
        Self {
            id,
            slots: layout.slots().to_vec(),
            has_bits_offset: layout.has_bits_offset(),
            unknown_fields_offset: layout.unknown_fields_offset(),
            factory,
        }
    }

    pub fn message_id(&self) -> MessageId {
        self.id
    }

    /// Byte offset of the field's slot. `None` for extensions.
    pub fn offset_of(&self, index: usize) -> Option<usize> {
        self.slots.get(index).copied().flatten().map(|s| s.offset)
    }

    /// Physical representation of the field's slot. `None` for extensions.
    pub fn slot_kind(&self, index: usize) -> Option<SlotKind> {
        self.slots.get(index).copied().flatten().map(|s| s.kind)
    }

    /// Byte offset of the has-bits area; field `i`'s bit is bit `i` from here.
    pub fn has_bits_offset(&self) -> usize {
        self.has_bits_offset
    }

    pub fn unknown_fields_offset(&self) -> usize {
        self.unknown_fields_offset
    }

    fn sub_class(&self, field: &FieldDescriptor) -> Arc<MessageClass> {
        let sub = field
            .message_type()
            .expect("message fields always resolve a message type");
        let factory = self
            .message_factory()
            .expect("MessageFactory dropped while its messages are in use");
        Arc::clone(factory.class(sub))
    }

    fn string_ptr(msg: &mut Message, slot: FieldSlot, index: usize) -> &mut Vec<u8> {
        // SAFETY: `slot` is a conventional string slot of this class.
        unsafe {
            let default = msg.class().default_string_ptr(index);
            let s = msg.slot_mut::<*mut Vec<u8>>(slot.offset);
            if *s == default {
                *s = Box::into_raw(Box::new((*default).clone()));
            }
            &mut **s
        }
    }
}

/// # Safety
/// A `RepeatedField<T>` must live at `offset` in `msg`.
unsafe fn repeated_at<T: Copy>(msg: &Message, offset: usize, index: usize) -> T {
    let r = unsafe { msg.slot::<RepeatedField<T>>(offset) };
    *r.get(index)
        .unwrap_or_else(|| panic!("repeated index {index} out of range ({})", r.len()))
}

/// # Safety
/// A `RepeatedField<T>` must live at `offset` in `msg`.
unsafe fn push_at<T>(msg: &mut Message, offset: usize, value: T) {
    unsafe { msg.slot_mut::<RepeatedField<T>>(offset) }.push(value);
}

impl Reflection for GeneratedReflection {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn has_field(&self, msg: &Message, field: &FieldDescriptor) -> bool {
        let slot = self.ensure_slot(msg, field);
        if slot.kind.is_repeated() {
            self.field_len(msg, field) > 0
        } else {
            msg.has_bit(field.index())
        }
    }

    fn field_len(&self, msg: &Message, field: &FieldDescriptor) -> usize {
        let slot = self.ensure_slot(msg, field);
        // SAFETY: the slot kind says what lives at the offset.
        unsafe {
            match slot.kind {
                SlotKind::Repeated(kind) => {
                    let at = msg.as_ptr().add(slot.offset).cast_mut();
                    crate::message::with_repeated!(kind, at, |r| (*r).len())
                }
                SlotKind::RepeatedString => {
                    msg.slot::<RepeatedPtrField<Vec<u8>>>(slot.offset).len()
                }
                #[cfg(feature = "platform-strings")]
                SlotKind::RepeatedCord => msg.slot::<RepeatedField<Cord>>(slot.offset).len(),
                #[cfg(feature = "platform-strings")]
                SlotKind::RepeatedStringPiece => msg
                    .slot::<RepeatedPtrField<StringPieceField>>(slot.offset)
                    .len(),
                SlotKind::RepeatedMessage => {
                    msg.slot::<RepeatedPtrField<Message>>(slot.offset).len()
                }
                _ => usize::from(msg.has_bit(field.index())),
            }
        }
    }

    fn get(&self, msg: &Message, field: &FieldDescriptor) -> Value {
        let slot = self.ensure_slot(msg, field);
        // SAFETY: the slot kind says what lives at the offset.
        unsafe {
            match slot.kind {
                SlotKind::Scalar(kind) => read_scalar(msg.as_ptr().add(slot.offset), kind),
                SlotKind::String => Value::Bytes((**msg.slot::<*mut Vec<u8>>(slot.offset)).clone()),
                #[cfg(feature = "platform-strings")]
                SlotKind::Cord => Value::Bytes(msg.slot::<Cord>(slot.offset).to_vec()),
                #[cfg(feature = "platform-strings")]
                SlotKind::StringPiece => {
                    Value::Bytes(msg.slot::<StringPieceField>(slot.offset).as_bytes().to_vec())
                }
                kind => panic!(
                    "Reflection::get: `{}` has slot {kind:?}, not a singular value",
                    field.name()
                ),
            }
        }
    }

    fn get_repeated(&self, msg: &Message, field: &FieldDescriptor, index: usize) -> Value {
        let slot = self.ensure_slot(msg, field);
        let offset = slot.offset;
        // SAFETY: the slot kind says what lives at the offset.
        unsafe {
            match slot.kind {
                SlotKind::Repeated(kind) => match kind {
                    ScalarKind::I32 => Value::I32(repeated_at(msg, offset, index)),
                    ScalarKind::Enum => Value::Enum(repeated_at(msg, offset, index)),
                    ScalarKind::I64 => Value::I64(repeated_at(msg, offset, index)),
                    ScalarKind::U32 => Value::U32(repeated_at(msg, offset, index)),
                    ScalarKind::U64 => Value::U64(repeated_at(msg, offset, index)),
                    ScalarKind::F32 => Value::F32(repeated_at(msg, offset, index)),
                    ScalarKind::F64 => Value::F64(repeated_at(msg, offset, index)),
                    ScalarKind::Bool => Value::Bool(repeated_at(msg, offset, index)),
                },
                SlotKind::RepeatedString => {
                    let r = msg.slot::<RepeatedPtrField<Vec<u8>>>(offset);
                    Value::Bytes(r.get(index).expect("repeated index out of range").clone())
                }
                #[cfg(feature = "platform-strings")]
                SlotKind::RepeatedCord => {
                    let r = msg.slot::<RepeatedField<Cord>>(offset);
                    Value::Bytes(r.get(index).expect("repeated index out of range").to_vec())
                }
                #[cfg(feature = "platform-strings")]
                SlotKind::RepeatedStringPiece => {
                    let r = msg.slot::<RepeatedPtrField<StringPieceField>>(offset);
                    let piece = r.get(index).expect("repeated index out of range");
                    Value::Bytes(piece.as_bytes().to_vec())
                }
                kind => panic!(
                    "Reflection::get_repeated: `{}` has slot {kind:?}, not a repeated value",
                    field.name()
                ),
            }
        }
    }

    fn set(&self, msg: &mut Message, field: &FieldDescriptor, value: Value) {
        let slot = self.ensure_writable_slot(msg, field);
        match (slot.kind, value) {
            (SlotKind::Scalar(kind), value) if value.scalar_kind() == Some(kind) => {
                // SAFETY: the slot holds a scalar of the value's kind.
                unsafe { write_scalar(msg.as_mut_ptr().add(slot.offset), &value) };
            }
            (SlotKind::String, Value::Bytes(bytes)) => {
                let s = Self::string_ptr(msg, slot, field.index());
                s.clear();
                s.extend_from_slice(&bytes);
            }
            #[cfg(feature = "platform-strings")]
            (SlotKind::Cord, Value::Bytes(bytes)) => {
                // SAFETY: cord slot.
                let cord = unsafe { msg.slot_mut::<Cord>(slot.offset) };
                cord.clear();
                cord.append(&bytes);
            }
            #[cfg(feature = "platform-strings")]
            (SlotKind::StringPiece, Value::Bytes(bytes)) => {
                // SAFETY: string piece slot.
                unsafe { msg.slot_mut::<StringPieceField>(slot.offset) }.copy_from(&bytes);
            }
            (kind, value) => panic!(
                "Reflection::set: cannot store {value:?} in `{}` (slot {kind:?})",
                field.name()
            ),
        }
        msg.set_has_bit(field.index());
    }

    fn add(&self, msg: &mut Message, field: &FieldDescriptor, value: Value) {
        let slot = self.ensure_writable_slot(msg, field);
        let offset = slot.offset;
        // SAFETY: each arm matches the slot kind to the container type.
        unsafe {
            match (slot.kind, value) {
                (SlotKind::Repeated(ScalarKind::I32), Value::I32(v))
                | (SlotKind::Repeated(ScalarKind::Enum), Value::Enum(v)) => push_at(msg, offset, v),
                (SlotKind::Repeated(ScalarKind::I64), Value::I64(v)) => push_at(msg, offset, v),
                (SlotKind::Repeated(ScalarKind::U32), Value::U32(v)) => push_at(msg, offset, v),
                (SlotKind::Repeated(ScalarKind::U64), Value::U64(v)) => push_at(msg, offset, v),
                (SlotKind::Repeated(ScalarKind::F32), Value::F32(v)) => push_at(msg, offset, v),
                (SlotKind::Repeated(ScalarKind::F64), Value::F64(v)) => push_at(msg, offset, v),
                (SlotKind::Repeated(ScalarKind::Bool), Value::Bool(v)) => push_at(msg, offset, v),
                (SlotKind::RepeatedString, Value::Bytes(bytes)) => msg
                    .slot_mut::<RepeatedPtrField<Vec<u8>>>(offset)
                    .add()
                    .extend_from_slice(&bytes),
                #[cfg(feature = "platform-strings")]
                (SlotKind::RepeatedCord, Value::Bytes(bytes)) => {
                    let mut cord = Cord::new();
                    cord.append(&bytes);
                    msg.slot_mut::<RepeatedField<Cord>>(offset).push(cord);
                }
                #[cfg(feature = "platform-strings")]
                (SlotKind::RepeatedStringPiece, Value::Bytes(bytes)) => msg
                    .slot_mut::<RepeatedPtrField<StringPieceField>>(offset)
                    .add()
                    .copy_from(&bytes),
                (kind, value) => panic!(
                    "Reflection::add: cannot append {value:?} to `{}` (slot {kind:?})",
                    field.name()
                ),
            }
        }
    }

    fn append_string(&self, msg: &mut Message, field: &FieldDescriptor, bytes: &[u8]) {
        let slot = self.ensure_writable_slot(msg, field);
        let offset = slot.offset;
        let name = field.name();
        // SAFETY: each arm matches the slot kind to the container type.
        unsafe {
            match slot.kind {
                SlotKind::String => {
                    Self::string_ptr(msg, slot, field.index()).extend_from_slice(bytes)
                }
                SlotKind::RepeatedString => msg
                    .slot_mut::<RepeatedPtrField<Vec<u8>>>(offset)
                    .last_mut()
                    .unwrap_or_else(|| panic!("append_string: `{name}` has no element"))
                    .extend_from_slice(bytes),
                #[cfg(feature = "platform-strings")]
                SlotKind::Cord => msg.slot_mut::<Cord>(offset).append(bytes),
                #[cfg(feature = "platform-strings")]
                SlotKind::RepeatedCord => msg
                    .slot_mut::<RepeatedField<Cord>>(offset)
                    .last_mut()
                    .unwrap_or_else(|| panic!("append_string: `{name}` has no element"))
                    .append(bytes),
                #[cfg(feature = "platform-strings")]
                SlotKind::StringPiece => {
                    let piece = msg.slot_mut::<StringPieceField>(offset);
                    let joined = [piece.as_bytes(), bytes].concat();
                    piece.copy_from(&joined);
                }
                #[cfg(feature = "platform-strings")]
                SlotKind::RepeatedStringPiece => {
                    let piece = msg
                        .slot_mut::<RepeatedPtrField<StringPieceField>>(offset)
                        .last_mut()
                        .unwrap_or_else(|| panic!("append_string: `{name}` has no element"));
                    let joined = [piece.as_bytes(), bytes].concat();
                    piece.copy_from(&joined);
                }
                kind => panic!("append_string: `{name}` has slot {kind:?}, not a string"),
            }
        }
    }

    fn message<'a>(&self, msg: &'a Message, field: &FieldDescriptor) -> Option<&'a Message> {
        let slot = self.ensure_slot(msg, field);
        assert_eq!(
            slot.kind,
            SlotKind::Message,
            "Reflection::message: `{}` is not a singular message",
            field.name()
        );
        if !msg.has_bit(field.index()) {
            return None;
        }
        // SAFETY: message slot; non-null pointers are live instances.
        unsafe { (*msg.slot::<*mut Message>(slot.offset)).as_ref() }
    }

    fn repeated_message<'a>(
        &self,
        msg: &'a Message,
        field: &FieldDescriptor,
        index: usize,
    ) -> &'a Message {
        let slot = self.ensure_slot(msg, field);
        assert_eq!(
            slot.kind,
            SlotKind::RepeatedMessage,
            "Reflection::repeated_message: `{}` is not a repeated message",
            field.name()
        );
        // SAFETY: repeated message slot.
        unsafe { msg.slot::<RepeatedPtrField<Message>>(slot.offset) }
            .get(index)
            .expect("repeated index out of range")
    }

    fn mutable_message<'a>(
        &self,
        msg: &'a mut Message,
        field: &FieldDescriptor,
    ) -> &'a mut Message {
        let slot = self.ensure_writable_slot(msg, field);
        assert_eq!(
            slot.kind,
            SlotKind::Message,
            "Reflection::mutable_message: `{}` is not a singular message",
            field.name()
        );
        msg.set_has_bit(field.index());
        // SAFETY: message slot; the instance owns any non-prototype pointee.
        unsafe {
            let sub = msg.slot_mut::<*mut Message>(slot.offset);
            if sub.is_null() || (**sub).is_prototype() {
                *sub = self.sub_class(field).new_instance().into_raw().as_ptr();
            }
            &mut **sub
        }
    }

    fn add_message<'a>(&self, msg: &'a mut Message, field: &FieldDescriptor) -> &'a mut Message {
        let slot = self.ensure_writable_slot(msg, field);
        assert_eq!(
            slot.kind,
            SlotKind::RepeatedMessage,
            "Reflection::add_message: `{}` is not a repeated message",
            field.name()
        );
        // SAFETY: repeated message slot.
        let repeated = unsafe { msg.slot_mut::<RepeatedPtrField<Message>>(slot.offset) };
        let mut elem = match repeated.add_from_cleared() {
            Some(elem) => elem,
            None => {
                let elem: NonNull<Message> = self.sub_class(field).new_instance().into_raw();
                repeated.add_allocated(&OwnedElements, elem);
                elem
            }
        };
        // SAFETY: `elem` is a live element owned by `msg`.
        unsafe { elem.as_mut() }
    }

    fn unknown_fields<'a>(&self, msg: &'a Message) -> &'a UnknownFieldSet {
        self.ensure_class(msg);
        // SAFETY: every instance of this class has its set here.
        unsafe { msg.slot::<UnknownFieldSet>(self.unknown_fields_offset) }
    }

    fn mutable_unknown_fields<'a>(&self, msg: &'a mut Message) -> &'a mut UnknownFieldSet {
        self.ensure_class(msg);
        // SAFETY: as above.
        unsafe { msg.slot_mut::<UnknownFieldSet>(self.unknown_fields_offset) }
    }

    fn clear(&self, msg: &mut Message) {
        self.ensure_class(msg);
        msg.clear();
    }

    fn message_factory(&self) -> Option<Arc<MessageFactory>> {
        self.factory.upgrade()
    }
}

/// Reflection that hides its layout.
///
/// Behaves exactly like the [`GeneratedReflection`] it wraps, but a downcast
/// to `GeneratedReflection` fails, so callers must stay on the generic path.
#[derive(Debug)]
pub struct OpaqueReflection {
    inner: GeneratedReflection,
}

impl OpaqueReflection {
    pub(crate) fn new(inner: GeneratedReflection) -> Self {
        Self { inner }
    }
}

impl Reflection for OpaqueReflection {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn has_field(&self, msg: &Message, field: &FieldDescriptor) -> bool {
        self.inner.has_field(msg, field)
    }

    fn field_len(&self, msg: &Message, field: &FieldDescriptor) -> usize {
        self.inner.field_len(msg, field)
    }

    fn get(&self, msg: &Message, field: &FieldDescriptor) -> Value {
        self.inner.get(msg, field)
    }

    fn get_repeated(&self, msg: &Message, field: &FieldDescriptor, index: usize) -> Value {
        self.inner.get_repeated(msg, field, index)
    }

    fn set(&self, msg: &mut Message, field: &FieldDescriptor, value: Value) {
        self.inner.set(msg, field, value)
    }

    fn add(&self, msg: &mut Message, field: &FieldDescriptor, value: Value) {
        self.inner.add(msg, field, value)
    }

    fn append_string(&self, msg: &mut Message, field: &FieldDescriptor, bytes: &[u8]) {
        self.inner.append_string(msg, field, bytes)
    }

    fn message<'a>(&self, msg: &'a Message, field: &FieldDescriptor) -> Option<&'a Message> {
        self.inner.message(msg, field)
    }

    fn repeated_message<'a>(
        &self,
        msg: &'a Message,
        field: &FieldDescriptor,
        index: usize,
    ) -> &'a Message {
        self.inner.repeated_message(msg, field, index)
    }

    fn mutable_message<'a>(
        &self,
        msg: &'a mut Message,
        field: &FieldDescriptor,
    ) -> &'a mut Message {
        self.inner.mutable_message(msg, field)
    }

    fn add_message<'a>(&self, msg: &'a mut Message, field: &FieldDescriptor) -> &'a mut Message {
        self.inner.add_message(msg, field)
    }

    fn unknown_fields<'a>(&self, msg: &'a Message) -> &'a UnknownFieldSet {
        self.inner.unknown_fields(msg)
    }

    fn mutable_unknown_fields<'a>(&self, msg: &'a mut Message) -> &'a mut UnknownFieldSet {
        self.inner.mutable_unknown_fields(msg)
    }

    fn clear(&self, msg: &mut Message) {
        self.inner.clear(msg)
    }

    fn message_factory(&self) -> Option<Arc<MessageFactory>> {
        self.inner.message_factory()
    }
}
