//! Shared fixtures for unit tests.

use std::convert::Infallible;
use std::sync::Arc;

use indoc::indoc;
use pbridge_core::{DescriptorPool, FieldDescriptor};
use pbridge_decoder::{DecodeError, DecodeLimits};
use pbridge_handlers::{HandlerSet, Handlers, Sink};
use pbridge_reflect::{FactoryOptions, GeneratedReflection, Message, MessageFactory};

pub(crate) const TEAM_POOL: &str = indoc! {r#"
    {
      "package": "demo",
      "messages": [
        {
          "name": "Person",
          "fields": [
            { "name": "name", "number": 1, "type": "string" },
            { "name": "tags", "number": 2, "type": "string", "label": "repeated" },
            { "name": "role", "number": 3, "type": "enum", "type_name": "Role" },
            { "name": "address", "number": 4, "type": "message", "type_name": "Address" },
            { "name": "scores", "number": 5, "type": "sint32", "label": "repeated" },
            { "name": "friends", "number": 6, "type": "message", "type_name": "Person", "label": "repeated" },
            { "name": "nick", "number": 7, "type": "string", "default": "anon" },
            { "name": "active", "number": 8, "type": "bool" },
            { "name": "height", "number": 9, "type": "double", "default": 1.75 },
            { "name": "ext", "number": 100, "type": "int32", "extension": true }
          ]
        },
        {
          "name": "Address",
          "fields": [
            { "name": "city", "number": 1, "type": "string" },
            { "name": "zip", "number": 2, "type": "uint32" }
          ]
        },
        {
          "name": "Team",
          "fields": [
            { "name": "roles", "number": 1, "type": "enum", "type_name": "Role", "label": "repeated" },
            { "name": "lead", "number": 2, "type": "message", "type_name": "Person" },
            { "name": "members", "number": 3, "type": "message", "type_name": "Person", "label": "repeated" },
            { "name": "budget", "number": 4, "type": "int64" },
            { "name": "ratio", "number": 5, "type": "float" },
            { "name": "serial", "number": 6, "type": "fixed64" },
            { "name": "size", "number": 7, "type": "uint32" },
            { "name": "archive", "number": 8, "type": "message", "type_name": "Address", "lazy": true },
            { "name": "body", "number": 9, "type": "bytes", "ctype": "CORD" },
            { "name": "parts", "number": 10, "type": "bytes", "ctype": "CORD", "label": "repeated" },
            { "name": "key", "number": 11, "type": "string", "ctype": "STRING_PIECE", "default": "k" },
            { "name": "keys", "number": 12, "type": "string", "ctype": "STRING_PIECE", "label": "repeated" },
            { "name": "office", "number": 13, "type": "group", "type_name": "Address" }
          ]
        }
      ],
      "enums": [
        { "name": "Role", "values": [ { "name": "ADMIN", "number": 1 }, { "name": "USER", "number": 2 } ] }
      ]
    }
"#};

pub(crate) fn team_pool() -> Arc<DescriptorPool> {
    Arc::new(DescriptorPool::from_json(TEAM_POOL).expect("fixture pool is valid"))
}

pub(crate) fn factory() -> Arc<MessageFactory> {
    MessageFactory::new(team_pool())
}

/// Factory whose `demo.Person` class hides its layout.
pub(crate) fn opaque_person_factory() -> Arc<MessageFactory> {
    let options = FactoryOptions::new().opaque_message("demo.Person");
    MessageFactory::with_options(team_pool(), &options)
}

/// Owned copy of a field descriptor, so tests can hold it across `&mut` borrows.
pub(crate) fn field(factory: &MessageFactory, message: &str, name: &str) -> FieldDescriptor {
    factory
        .pool()
        .find_message(message)
        .and_then(|m| m.field_by_name(name))
        .unwrap_or_else(|| panic!("fixture has no field {message}.{name}"))
        .clone()
}

pub(crate) fn empty_handlers(factory: &MessageFactory, message: &str) -> Handlers {
    Handlers::new(factory.pool().find_message(message).expect("fixture message"))
}

pub(crate) fn generated(msg: &Message) -> &GeneratedReflection {
    msg.reflection()
        .as_any()
        .downcast_ref::<GeneratedReflection>()
        .expect("fixture class publishes its layout")
}

/// Pointer to the slot at `offset` inside `msg`.
pub(crate) fn slot<T>(msg: &Message, offset: usize) -> *const T {
    msg.as_ptr().wrapping_add(offset).cast()
}

/// Handlers for `message` and its reachable types: direct wherever the
/// layout allows, nothing elsewhere.
pub(crate) fn direct_set(factory: &MessageFactory, message: &str) -> HandlerSet {
    let root = factory.pool().find_message(message).expect("fixture message").id();
    HandlerSet::build::<_, Infallible>(Arc::clone(factory.pool()), root, |desc, handlers| {
        let prototype = factory.prototype(desc.id());
        for field in desc.fields() {
            crate::try_set_handlers(field, prototype, handlers);
        }
        Ok(())
    })
    .unwrap()
}

pub(crate) fn decode(
    set: &HandlerSet,
    msg: &mut Message,
    bytes: &[u8],
    limits: &DecodeLimits,
) -> Result<(), DecodeError> {
    pbridge_decoder::decode(set, bytes, Sink::new(msg), limits)
}

/// Limits that split every string into one-byte buffers.
pub(crate) fn byte_chunks() -> DecodeLimits {
    DecodeLimits::new().string_chunk(1)
}
