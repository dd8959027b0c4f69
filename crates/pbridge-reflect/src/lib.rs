#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Compiled-message object model.
//!
//! A [`MessageFactory`] turns every message type of a [`DescriptorPool`] into a
//! [`MessageClass`] with a fixed byte layout and a shared prototype. Instances
//! ([`MessageBox`]) are raw allocations addressed through that layout, either
//! generically via [`Reflection`] or directly via the offsets published by
//! [`GeneratedReflection`].
//!
//! The `platform-strings` feature stores `CORD` and `STRING_PIECE` string
//! fields as [`Cord`] and [`StringPieceField`]; without it every string field
//! is a conventional owned string.
//!
//! [`DescriptorPool`]: pbridge_core::DescriptorPool

mod class;
mod factory;
mod invariants;
mod message;
mod reflection;
mod repeated;
#[cfg(feature = "platform-strings")]
mod strings;
pub mod text;
mod unknown;

#[cfg(test)]
mod class_tests;
#[cfg(test)]
mod message_tests;
#[cfg(test)]
mod repeated_tests;
#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod text_tests;

pub use class::{ClassLayout, FieldSlot, MessageClass, ScalarKind, SlotKind};
pub use factory::{FactoryOptions, MessageFactory, ReflectionKind};
pub use message::{Message, MessageBox, flags};
pub use reflection::{GeneratedReflection, OpaqueReflection, Reflection, Value};
pub use repeated::{ElementPolicy, OwnedElements, PtrElement, RepeatedField, RepeatedPtrField};
#[cfg(feature = "platform-strings")]
pub use strings::{Cord, StringPieceField};
pub use unknown::{UnknownField, UnknownFieldSet};
