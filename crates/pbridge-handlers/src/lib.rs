#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Handler registry for push-style decoding.
//!
//! A decoder walks encoded bytes and, for every field it meets, invokes the
//! callbacks registered for that field's roles. Every callback receives a
//! [`Sink`]: an opaque pointer to whatever the previous callback decided the
//! data should flow into. Start-type callbacks return the sink for the
//! nested scope; an unset start callback passes the current sink through.
//!
//! Handlers are collected per message type in [`Handlers`] and frozen into a
//! [`HandlerSet`] that covers a root type and every type reachable from it.

mod error;
mod field;
mod handlers;
mod sink;
mod value;


pub use error::HandlersError;
pub use field::{EndFn, FieldHandlers, HandlerRole, StartFn, StartStrFn, StringFn};
pub use handlers::{HandlerSet, Handlers};
pub use sink::Sink;
pub use value::{HandlerValue, ValueHandler, ValueType};
