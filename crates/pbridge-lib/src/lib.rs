//! Direct-to-memory decode handlers for compiled messages.
//!
//! Writing a decoded field through [`Reflection`] costs a virtual call and a
//! slot lookup per value. For classes whose reflection is a
//! [`GeneratedReflection`], the layout is known: [`try_set_handlers`] reads a
//! field's offset and has-bit once and registers callbacks that store decoded
//! values straight into that memory. When a precondition cannot be proven it
//! registers nothing and returns `false`, leaving the field to the generic
//! path.
//!
//! [`new_write_handlers`] applies this to every field reachable from a
//! prototype and fills the gaps with reflection-based handlers.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use pbridge_core::DescriptorPool;
//! use pbridge_decoder::{DecodeLimits, Encoder};
//! use pbridge_lib::new_write_handlers;
//! use pbridge_reflect::{MessageFactory, text};
//!
//! let pool = DescriptorPool::from_json(r#"{
//!     "messages": [{ "name": "Point", "fields": [
//!         { "name": "x", "number": 1, "type": "int32" },
//!         { "name": "label", "number": 2, "type": "string" }
//!     ]}]
//! }"#).unwrap();
//! let factory = MessageFactory::new(Arc::new(pool));
//! let prototype = factory.find_prototype("Point").unwrap();
//!
//! let handlers = new_write_handlers(prototype).unwrap();
//! let mut point = prototype.new_instance();
//! let bytes = Encoder::new().int32(1, 7).string(2, "origin").finish();
//! handlers.decode_into(&bytes, &mut point, &DecodeLimits::new()).unwrap();
//!
//! assert_eq!(text::format(&point), "x: 7\nlabel: \"origin\"\n");
//! ```
//!
//! [`Reflection`]: pbridge_reflect::Reflection
//! [`GeneratedReflection`]: pbridge_reflect::GeneratedReflection

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod accessor;
mod bridge;
mod enums;
mod fallback;
mod field_offset;
mod layout;
#[cfg(feature = "platform-strings")]
mod platform_string;
mod primitive;
mod string;
mod submessage;

#[cfg(test)]
mod bridge_tests;
#[cfg(all(test, feature = "platform-strings"))]
mod platform_string_tests;
#[cfg(test)]
mod submessage_tests;
#[cfg(test)]
mod test_utils;

pub use accessor::{Abstain, DirectKind, try_set_handlers};
pub use bridge::{FieldPlan, MessagePlan, WriteHandlers, new_write_handlers};
pub use field_offset::FieldOffset;
pub use layout::{compute_hasbit, compute_offset};
pub use submessage::{PrototypeRef, get_field_prototype};

/// Errors from building write handlers or decoding through them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Handlers(#[from] pbridge_handlers::HandlersError),

    #[error(transparent)]
    Decode(#[from] pbridge_decoder::DecodeError),
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;
