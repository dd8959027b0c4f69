#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Schema types for pbridge.
//!
//! Two layers:
//! - **Deserialization layer**: 1:1 mapping to the JSON pool format
//! - **Resolved layer**: ID-indexed descriptors with every type reference resolved
//!
//! A resolved [`DescriptorPool`] can be stored in a compact binary format
//! (checksummed header + postcard payload) and loaded back without re-resolving.

mod binary;
mod colors;
mod descriptor;
mod error;
mod invariants;
mod json;
mod pool;

#[cfg(test)]
mod binary_tests;
#[cfg(test)]
mod descriptor_tests;

pub use binary::{BINARY_HEADER_SIZE, BINARY_MAGIC, BINARY_VERSION};
pub use colors::Colors;
pub use descriptor::{
    CType, DefaultValue, EnumDescriptor, EnumId, EnumValue, FieldDescriptor, FieldOptions,
    FieldType, Label, MessageDescriptor, MessageId, StorageKind, TypeRef, WireType,
};
pub use error::PoolError;
pub use pool::DescriptorPool;

/// Largest field number allowed on the wire (2^29 - 1).
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;
