//! Choosing and installing the direct-to-memory handlers of one field.

use std::fmt;

use pbridge_core::{CType, FieldDescriptor, StorageKind};
use pbridge_handlers::{FieldHandlers, Handlers};
use pbridge_reflect::{GeneratedReflection, Message, SlotKind};

use crate::enums::{EnumGate, enum_handlers};
use crate::field_offset::FieldOffset;
use crate::primitive::primitive_handlers;
use crate::string::string_handlers;
use crate::submessage::{get_field_prototype, submessage_handlers};

/// Why a field was left to the reflection path.
#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum Abstain {
    #[error("class does not publish a compatible layout")]
    IncompatibleLayout,

    #[error("extension fields have no slot in the class")]
    Extension,

    #[error("string encoding {0:?} is not supported")]
    UnsupportedStringEncoding(CType),

    #[error("lazy submessages are not supported")]
    LazySubMessage,

    #[error("submessage prototype is not reachable through the factory")]
    MissingPrototype,
}

/// The physical representation a field was wired up for.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DirectKind {
    Primitive,
    Enum,
    String,
    Cord,
    StringPiece,
    SubMessage,
}

impl DirectKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Primitive => "primitive",
            Self::Enum => "enum",
            Self::String => "string",
            Self::Cord => "cord",
            Self::StringPiece => "string-piece",
            Self::SubMessage => "submessage",
        }
    }
}

impl fmt::Display for DirectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Install handlers that write `field` straight into instances of
/// `prototype`'s class.
///
/// Returns `false`, with nothing installed, when the class layout cannot be
/// used for this field; the caller is expected to fall back to reflection.
///
/// # Panics
///
/// If `handlers` belongs to another message type, or `field` already has
/// handlers installed.
pub fn try_set_handlers(field: &FieldDescriptor, prototype: &Message, handlers: &mut Handlers) -> bool {
    match set_direct(field, prototype, handlers) {
        Ok(kind) => {
            log::debug!("`{}`: direct {kind}", field.name());
            true
        }
        Err(reason) => {
            log::debug!("`{}`: no direct handlers, {reason}", field.name());
            false
        }
    }
}

/// Same as [`try_set_handlers`], reporting what was installed or why not.
pub(crate) fn set_direct(
    field: &FieldDescriptor,
    prototype: &Message,
    handlers: &mut Handlers,
) -> Result<DirectKind, Abstain> {
    let reflection = prototype
        .reflection()
        .as_any()
        .downcast_ref::<GeneratedReflection>()
        .ok_or(Abstain::IncompatibleLayout)?;

    if field.is_extension() {
        return Err(Abstain::Extension);
    }
    if field.containing_type() != reflection.message_id()
        || reflection.slot_kind(field.index()) != Some(SlotKind::for_field(field))
    {
        return Err(Abstain::IncompatibleLayout);
    }

    let (kind, built) = build(field, prototype, reflection)?;
    handlers
        .install(field, built)
        .unwrap_or_else(|e| panic!("try_set_handlers: {e}"));
    Ok(kind)
}

fn build(
    field: &FieldDescriptor,
    prototype: &Message,
    reflection: &GeneratedReflection,
) -> Result<(DirectKind, FieldHandlers), Abstain> {
    match field.storage_kind() {
        StorageKind::Enum => {
            let id = field.enum_type().ok_or(Abstain::IncompatibleLayout)?;
            let enum_desc = prototype.class().pool().enum_type(id);
            let gate = EnumGate::new(field, enum_desc, reflection);
            Ok((DirectKind::Enum, enum_handlers(gate)))
        }
        StorageKind::String => build_string(field, prototype, reflection),
        StorageKind::Message => {
            if field.options().lazy {
                return Err(Abstain::LazySubMessage);
            }
            let sub = get_field_prototype(field, prototype).ok_or(Abstain::MissingPrototype)?;
            let offset = FieldOffset::new(field, reflection);
            Ok((DirectKind::SubMessage, submessage_handlers(offset, sub)))
        }
        _ => {
            let offset = FieldOffset::new(field, reflection);
            Ok((DirectKind::Primitive, primitive_handlers(field, offset)))
        }
    }
}

fn build_string(
    field: &FieldDescriptor,
    prototype: &Message,
    reflection: &GeneratedReflection,
) -> Result<(DirectKind, FieldHandlers), Abstain> {
    let offset = FieldOffset::new(field, reflection);
    match field.options().effective_ctype() {
        CType::String => Ok((DirectKind::String, string_handlers(offset, prototype))),
        #[cfg(feature = "platform-strings")]
        CType::Cord => Ok((
            DirectKind::Cord,
            crate::platform_string::cord_handlers(offset),
        )),
        #[cfg(feature = "platform-strings")]
        CType::StringPiece => Ok((
            DirectKind::StringPiece,
            crate::platform_string::string_piece_handlers(offset),
        )),
        #[cfg(not(feature = "platform-strings"))]
        ctype => Err(Abstain::UnsupportedStringEncoding(ctype)),
    }
}
