#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Protocol buffer wire decoder.
//!
//! [`decode`] walks encoded bytes and drives a [`HandlerSet`]: no values are
//! materialized here, every field is pushed to the callbacks registered for
//! it. Fields without callbacks and fields of unknown numbers are skipped.
//!
//! [`HandlerSet`]: pbridge_handlers::HandlerSet

mod decode;
mod encode;
mod error;
mod limits;
mod reader;


pub use decode::decode;
pub use encode::Encoder;
pub use error::DecodeError;
pub use limits::DecodeLimits;
