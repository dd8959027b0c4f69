//! Message classes: the physical layout of one compiled message type.
//!
//! A message instance is a single allocation:
//!
//! ```text
//! [ header | has-bits | unknown fields | field slots ... ]
//! ```
//!
//! The header holds the class pointer and flags. The has-bits area reserves
//! one bit per declared field, in declaration order. Field slots follow,
//! each aligned for its slot type. Extension fields get no slot.

use std::mem::{align_of, size_of};
use std::sync::{Arc, Weak};

use pbridge_core::{
    CType, DefaultValue, DescriptorPool, FieldDescriptor, MessageDescriptor, MessageId,
    StorageKind,
};

use crate::factory::{MessageFactory, ReflectionKind};
use crate::message::{HEADER_SIZE, MESSAGE_ALIGN, Message, MessageBox};
use crate::reflection::{GeneratedReflection, OpaqueReflection, Reflection};
use crate::repeated::{RepeatedField, RepeatedPtrField};
use crate::unknown::UnknownFieldSet;

#[cfg(feature = "platform-strings")]
use crate::strings::{Cord, StringPieceField};

/// In-memory type of a scalar slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ScalarKind {
    I32,
    I64,
    U32,
    U64,
    F32,
    F64,
    Bool,
    /// Stored as `i32`.
    Enum,
}

impl ScalarKind {
    pub fn of(kind: StorageKind) -> Option<Self> {
        Some(match kind {
            StorageKind::Int32 => Self::I32,
            StorageKind::Int64 => Self::I64,
            StorageKind::UInt32 => Self::U32,
            StorageKind::UInt64 => Self::U64,
            StorageKind::Float => Self::F32,
            StorageKind::Double => Self::F64,
            StorageKind::Bool => Self::Bool,
            StorageKind::Enum => Self::Enum,
            StorageKind::String | StorageKind::Message => return None,
        })
    }

    fn size_align(self) -> (usize, usize) {
        match self {
            Self::I32 | Self::Enum => (size_of::<i32>(), align_of::<i32>()),
            Self::I64 => (size_of::<i64>(), align_of::<i64>()),
            Self::U32 => (size_of::<u32>(), align_of::<u32>()),
            Self::U64 => (size_of::<u64>(), align_of::<u64>()),
            Self::F32 => (size_of::<f32>(), align_of::<f32>()),
            Self::F64 => (size_of::<f64>(), align_of::<f64>()),
            Self::Bool => (size_of::<bool>(), align_of::<bool>()),
        }
    }
}

/// Physical representation of one field slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SlotKind {
    /// The value itself.
    Scalar(ScalarKind),
    /// `RepeatedField<T>` of the scalar type.
    Repeated(ScalarKind),
    /// `*mut Vec<u8>`, pointing at the class default until first written.
    String,
    /// `RepeatedPtrField<Vec<u8>>`.
    RepeatedString,
    /// `Cord`, inline.
    #[cfg(feature = "platform-strings")]
    Cord,
    /// `RepeatedField<Cord>`.
    #[cfg(feature = "platform-strings")]
    RepeatedCord,
    /// `StringPieceField`, inline.
    #[cfg(feature = "platform-strings")]
    StringPiece,
    /// `RepeatedPtrField<StringPieceField>`.
    #[cfg(feature = "platform-strings")]
    RepeatedStringPiece,
    /// `*mut Message`: null in fresh instances, another prototype in prototypes.
    Message,
    /// `RepeatedPtrField<Message>`.
    RepeatedMessage,
}

impl SlotKind {
    /// The representation a field is stored with.
    ///
    /// Without `platform-strings`, every string field is a conventional string
    /// regardless of its declared `ctype`.
    pub fn for_field(field: &FieldDescriptor) -> Self {
        let repeated = field.is_repeated();
        match field.storage_kind() {
            StorageKind::Message if repeated => Self::RepeatedMessage,
            StorageKind::Message => Self::Message,
            StorageKind::String => Self::string_slot(field.options().effective_ctype(), repeated),
            kind => {
                let scalar = ScalarKind::of(kind).expect("non-scalar kinds handled above");
                if repeated {
                    Self::Repeated(scalar)
                } else {
                    Self::Scalar(scalar)
                }
            }
        }
    }

    #[cfg(feature = "platform-strings")]
    fn string_slot(ctype: CType, repeated: bool) -> Self {
        match (ctype, repeated) {
            (CType::String, false) => Self::String,
            (CType::String, true) => Self::RepeatedString,
            (CType::Cord, false) => Self::Cord,
            (CType::Cord, true) => Self::RepeatedCord,
            (CType::StringPiece, false) => Self::StringPiece,
            (CType::StringPiece, true) => Self::RepeatedStringPiece,
        }
    }

    #[cfg(not(feature = "platform-strings"))]
    fn string_slot(_ctype: CType, repeated: bool) -> Self {
        if repeated {
            Self::RepeatedString
        } else {
            Self::String
        }
    }

    pub fn is_repeated(self) -> bool {
        match self {
            Self::Repeated(_) | Self::RepeatedString | Self::RepeatedMessage => true,
            #[cfg(feature = "platform-strings")]
            Self::RepeatedCord | Self::RepeatedStringPiece => true,
            _ => false,
        }
    }

    fn size_align(self) -> (usize, usize) {
        fn of<T>() -> (usize, usize) {
            (size_of::<T>(), align_of::<T>())
        }
        match self {
            Self::Scalar(kind) => kind.size_align(),
            Self::Repeated(_) => of::<RepeatedField<u64>>(),
            Self::String => of::<*mut Vec<u8>>(),
            Self::RepeatedString => of::<RepeatedPtrField<Vec<u8>>>(),
            #[cfg(feature = "platform-strings")]
            Self::Cord => of::<Cord>(),
            #[cfg(feature = "platform-strings")]
            Self::RepeatedCord => of::<RepeatedField<Cord>>(),
            #[cfg(feature = "platform-strings")]
            Self::StringPiece => of::<StringPieceField>(),
            #[cfg(feature = "platform-strings")]
            Self::RepeatedStringPiece => of::<RepeatedPtrField<StringPieceField>>(),
            Self::Message => of::<*mut Message>(),
            Self::RepeatedMessage => of::<RepeatedPtrField<Message>>(),
        }
    }
}

/// Where one field lives inside an instance.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FieldSlot {
    pub offset: usize,
    pub kind: SlotKind,
}

/// Byte layout of a message class.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ClassLayout {
    size: usize,
    has_bits_offset: usize,
    has_bits_len: usize,
    unknown_fields_offset: usize,
    slots: Vec<Option<FieldSlot>>,
}

fn align_up(offset: usize, align: usize) -> usize {
    offset.next_multiple_of(align)
}

impl ClassLayout {
    pub fn compute(desc: &MessageDescriptor) -> Self {
        let has_bits_offset = HEADER_SIZE;
        let has_bits_len = desc.field_count().div_ceil(8);

        let unknown_fields_offset = align_up(
            has_bits_offset + has_bits_len,
            align_of::<UnknownFieldSet>(),
        );
        let mut cursor = unknown_fields_offset + size_of::<UnknownFieldSet>();

        let slots = desc
            .fields()
            .iter()
            .map(|field| {
                if field.is_extension() {
                    return None;
                }
                let kind = SlotKind::for_field(field);
                let (size, align) = kind.size_align();
                debug_assert!(align <= MESSAGE_ALIGN);
                cursor = align_up(cursor, align);
                let slot = FieldSlot {
                    offset: cursor,
                    kind,
                };
                cursor += size;
                Some(slot)
            })
            .collect();

        Self {
            size: align_up(cursor, MESSAGE_ALIGN),
            has_bits_offset,
            has_bits_len,
            unknown_fields_offset,
            slots,
        }
    }

    /// Total instance size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn has_bits_offset(&self) -> usize {
        self.has_bits_offset
    }

    pub fn has_bits_len(&self) -> usize {
        self.has_bits_len
    }

    pub fn unknown_fields_offset(&self) -> usize {
        self.unknown_fields_offset
    }

    /// `None` for extension fields.
    pub fn slot(&self, index: usize) -> Option<FieldSlot> {
        self.slots.get(index).copied().flatten()
    }

    pub fn slots(&self) -> &[Option<FieldSlot>] {
        &self.slots
    }
}

/// One compiled message type: descriptor, layout, default strings and reflection.
pub struct MessageClass {
    pool: Arc<DescriptorPool>,
    id: MessageId,
    layout: ClassLayout,
    /// Shared default instance per singular string field, by field index.
    default_strings: Vec<Option<Box<Vec<u8>>>>,
    reflection: Box<dyn Reflection>,
}

impl MessageClass {
    pub(crate) fn new(
        pool: Arc<DescriptorPool>,
        id: MessageId,
        kind: ReflectionKind,
        factory: Weak<MessageFactory>,
    ) -> Self {
        let desc = pool.message(id);
        let layout = ClassLayout::compute(desc);

        let default_strings = desc
            .fields()
            .iter()
            .zip(layout.slots())
            .map(|(field, slot)| {
                let slot = (*slot)?;
                if slot.kind.is_repeated() || field.storage_kind() != StorageKind::String {
                    return None;
                }
                let bytes = match field.default_value() {
                    Some(DefaultValue::Bytes(b)) => b.clone(),
                    _ => Vec::new(),
                };
                Some(Box::new(bytes))
            })
            .collect();

        let generated = GeneratedReflection::new(id, &layout, factory);
        let reflection: Box<dyn Reflection> = match kind {
            ReflectionKind::Generated => Box::new(generated),
            ReflectionKind::Opaque => Box::new(OpaqueReflection::new(generated)),
        };

        Self {
            pool,
            id,
            layout,
            default_strings,
            reflection,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn pool(&self) -> &Arc<DescriptorPool> {
        &self.pool
    }

    pub fn descriptor(&self) -> &MessageDescriptor {
        self.pool.message(self.id)
    }

    pub fn layout(&self) -> &ClassLayout {
        &self.layout
    }

    pub fn reflection(&self) -> &dyn Reflection {
        self.reflection.as_ref()
    }

    /// Default contents of a singular string field.
    pub fn default_string(&self, index: usize) -> Option<&Vec<u8>> {
        self.default_strings.get(index)?.as_deref()
    }

    /// Address of the shared default string a fresh instance's slot points at.
    ///
    /// The pointee is never written through this pointer; writers replace the
    /// slot with an owned string first.
    pub(crate) fn default_string_ptr(&self, index: usize) -> *mut Vec<u8> {
        let default = self.ensure_default_string(index);
        default as *const Vec<u8> as *mut Vec<u8>
    }

    /// Allocate a fresh instance: scalars at their defaults, strings at the
    /// shared defaults, submessages null, containers empty.
    pub fn new_instance(self: &Arc<Self>) -> MessageBox {
        MessageBox::allocate(self, 0)
    }

    pub(crate) fn scalar_default(&self, index: usize) -> Option<&DefaultValue> {
        self.descriptor().field(index).default_value()
    }
}

impl std::fmt::Debug for MessageClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageClass")
            .field("name", &self.descriptor().full_name())
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}
