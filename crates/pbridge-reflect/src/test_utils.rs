//! Shared fixtures for unit tests.

use std::sync::Arc;

use indoc::indoc;
use pbridge_core::{DescriptorPool, FieldDescriptor};

use crate::factory::{FactoryOptions, MessageFactory};

pub(crate) const PERSON_POOL: &str = indoc! {r#"
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
        }
      ],
      "enums": [
        { "name": "Role", "values": [ { "name": "ADMIN", "number": 1 }, { "name": "USER", "number": 2 } ] }
      ]
    }
"#};

pub(crate) fn person_pool() -> Arc<DescriptorPool> {
    Arc::new(DescriptorPool::from_json(PERSON_POOL).expect("fixture pool is valid"))
}

pub(crate) fn person_factory() -> Arc<MessageFactory> {
    MessageFactory::new(person_pool())
}

pub(crate) fn opaque_person_factory() -> Arc<MessageFactory> {
    let options = FactoryOptions::new().opaque_message("demo.Person");
    MessageFactory::with_options(person_pool(), &options)
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
