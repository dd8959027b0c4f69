//! Resolved schema nodes: messages, fields and enums.
//!
//! Descriptors are immutable once a pool is built. All cross references are
//! plain indices ([`MessageId`], [`EnumId`]) into the owning [`DescriptorPool`].
//!
//! [`DescriptorPool`]: crate::DescriptorPool

use serde::{Deserialize, Serialize};

/// Index of a message type inside its pool.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct MessageId(pub u32);

impl MessageId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of an enum type inside its pool.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct EnumId(pub u32);

impl EnumId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named type in the pool.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum TypeRef {
    Message(MessageId),
    Enum(EnumId),
}

/// Declared field type, as written in the schema.
///
/// Several declared types share one in-memory representation; see
/// [`FieldType::storage_kind`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Double,
    Float,
    Int64,
    UInt64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Group,
    Message,
    Bytes,
    UInt32,
    Enum,
    SFixed32,
    SFixed64,
    SInt32,
    SInt64,
}

/// Physical kind of a field: the representation a compiled message stores.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum StorageKind {
    Int32,
    Int64,
    UInt32,
    UInt64,
    Double,
    Float,
    Bool,
    Enum,
    String,
    Message,
}

/// Wire encoding of a single value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    Fixed32 = 5,
}

impl WireType {
    /// Convert from the low three bits of a tag.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Varint),
            1 => Some(Self::Fixed64),
            2 => Some(Self::LengthDelimited),
            3 => Some(Self::StartGroup),
            4 => Some(Self::EndGroup),
            5 => Some(Self::Fixed32),
            _ => None,
        }
    }
}

impl FieldType {
    pub fn storage_kind(self) -> StorageKind {
        match self {
            Self::Double => StorageKind::Double,
            Self::Float => StorageKind::Float,
            Self::Int64 | Self::SFixed64 | Self::SInt64 => StorageKind::Int64,
            Self::UInt64 | Self::Fixed64 => StorageKind::UInt64,
            Self::Int32 | Self::SFixed32 | Self::SInt32 => StorageKind::Int32,
            Self::UInt32 | Self::Fixed32 => StorageKind::UInt32,
            Self::Bool => StorageKind::Bool,
            Self::String | Self::Bytes => StorageKind::String,
            Self::Group | Self::Message => StorageKind::Message,
            Self::Enum => StorageKind::Enum,
        }
    }

    /// Wire type of one unpacked value of this field type.
    pub fn wire_type(self) -> WireType {
        match self {
            Self::Double | Self::Fixed64 | Self::SFixed64 => WireType::Fixed64,
            Self::Float | Self::Fixed32 | Self::SFixed32 => WireType::Fixed32,
            Self::Int64
            | Self::UInt64
            | Self::Int32
            | Self::Bool
            | Self::UInt32
            | Self::Enum
            | Self::SInt32
            | Self::SInt64 => WireType::Varint,
            Self::String | Self::Bytes | Self::Message => WireType::LengthDelimited,
            Self::Group => WireType::StartGroup,
        }
    }

    /// Whether repeated fields of this type may use the packed encoding.
    pub fn is_packable(self) -> bool {
        matches!(
            self.wire_type(),
            WireType::Varint | WireType::Fixed32 | WireType::Fixed64
        )
    }

    /// Whether the type refers to a named message or enum type.
    pub fn needs_type_name(self) -> bool {
        matches!(self, Self::Group | Self::Message | Self::Enum)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Float => "float",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Int32 => "int32",
            Self::Fixed64 => "fixed64",
            Self::Fixed32 => "fixed32",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Group => "group",
            Self::Message => "message",
            Self::Bytes => "bytes",
            Self::UInt32 => "uint32",
            Self::Enum => "enum",
            Self::SFixed32 => "sfixed32",
            Self::SFixed64 => "sfixed64",
            Self::SInt32 => "sint32",
            Self::SInt64 => "sint64",
        }
    }
}

/// Field cardinality.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    #[default]
    Optional,
    Required,
    Repeated,
}

/// Declared physical encoding of a string field (`ctype` option).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CType {
    #[default]
    String,
    Cord,
    StringPiece,
}

/// Field options consumed by the storage layer.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct FieldOptions {
    /// `None` when the schema did not declare a `ctype`.
    pub ctype: Option<CType>,
    /// Deferred materialization of a submessage.
    pub lazy: bool,
    /// Packed encoding preferred when serializing; decoding accepts both.
    pub packed: bool,
}

impl FieldOptions {
    /// The effective string encoding: `STRING` unless declared otherwise.
    pub fn effective_ctype(&self) -> CType {
        self.ctype.unwrap_or_default()
    }
}

/// Default value of a singular scalar field.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum DefaultValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Enum(i32),
}

/// One field of a message type.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub(crate) name: String,
    pub(crate) number: u32,
    pub(crate) index: u32,
    pub(crate) field_type: FieldType,
    pub(crate) label: Label,
    pub(crate) containing_type: MessageId,
    pub(crate) type_ref: Option<TypeRef>,
    pub(crate) extension: bool,
    pub(crate) options: FieldOptions,
    pub(crate) default: Option<DefaultValue>,
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Declaration index within the containing message.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.field_type.storage_kind()
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }

    pub fn is_extension(&self) -> bool {
        self.extension
    }

    pub fn options(&self) -> &FieldOptions {
        &self.options
    }

    pub fn containing_type(&self) -> MessageId {
        self.containing_type
    }

    /// Message type of a message or group field.
    pub fn message_type(&self) -> Option<MessageId> {
        match self.type_ref {
            Some(TypeRef::Message(id)) => Some(id),
            _ => None,
        }
    }

    /// Enum type of an enum field.
    pub fn enum_type(&self) -> Option<EnumId> {
        match self.type_ref {
            Some(TypeRef::Enum(id)) => Some(id),
            _ => None,
        }
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }
}

/// A message type.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct MessageDescriptor {
    pub(crate) id: MessageId,
    pub(crate) full_name: String,
    pub(crate) fields: Vec<FieldDescriptor>,
    /// `(number, index)` pairs sorted by number for binary search.
    pub(crate) by_number: Vec<(u32, u32)>,
}

impl MessageDescriptor {
    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Short name (last path component).
    pub fn name(&self) -> &str {
        self.full_name
            .rsplit_once('.')
            .map_or(self.full_name.as_str(), |(_, name)| name)
    }

    /// Fields in declaration order; `fields()[i].index() == i`.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, index: usize) -> &FieldDescriptor {
        &self.fields[index]
    }

    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.by_number
            .binary_search_by_key(&number, |&(n, _)| n)
            .ok()
            .map(|pos| &self.fields[self.by_number[pos].1 as usize])
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub(crate) fn index_numbers(&mut self) {
        let mut by_number: Vec<(u32, u32)> =
            self.fields.iter().map(|f| (f.number, f.index)).collect();
        by_number.sort_unstable();
        self.by_number = by_number;
    }
}

/// One declared enumerator.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub number: i32,
}

/// An enum type.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct EnumDescriptor {
    pub(crate) id: EnumId,
    pub(crate) full_name: String,
    pub(crate) values: Vec<EnumValue>,
}

impl EnumDescriptor {
    pub fn id(&self) -> EnumId {
        self.id
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Enumerators in declaration order. Aliases (same number) are allowed.
    pub fn values(&self) -> &[EnumValue] {
        &self.values
    }

    pub fn find_value_by_number(&self, number: i32) -> Option<&EnumValue> {
        self.values.iter().find(|v| v.number == number)
    }

    pub fn find_value_by_name(&self, name: &str) -> Option<&EnumValue> {
        self.values.iter().find(|v| v.name == name)
    }

    /// The value a singular enum field takes when unset.
    pub fn default_number(&self) -> i32 {
        self.values.first().map_or(0, |v| v.number)
    }
}
