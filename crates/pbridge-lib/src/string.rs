//! Conventional string fields: a slot pointing at an owned byte string.
//!
//! A fresh instance's slot points at the class's shared default. The first
//! write replaces it with an owned string; later writes reuse that string.

use std::ptr::NonNull;
use std::sync::Arc;

use pbridge_handlers::{FieldHandlers, Sink};
use pbridge_reflect::{Message, MessageClass, RepeatedPtrField};

use crate::field_offset::FieldOffset;

/// Address of a class's shared default string.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct DefaultString(*mut Vec<u8>);

// SAFETY: only compared against, never dereferenced.
unsafe impl Send for DefaultString {}
unsafe impl Sync for DefaultString {}

#[derive(Debug)]
struct StringContext {
    offset: FieldOffset,
    default: DefaultString,
    /// Keeps the default string alive.
    _class: Arc<MessageClass>,
}

/// Appends a buffer to the string the sink points at.
fn append_bytes(sink: Sink, buf: &[u8]) -> usize {
    // SAFETY: string sinks are `Vec<u8>`s opened by a start-string callback.
    unsafe { sink.cast::<Vec<u8>>() }.extend_from_slice(buf);
    buf.len()
}

/// Handlers for a conventional string field of `prototype`'s class.
pub(crate) fn string_handlers(offset: FieldOffset, prototype: &Message) -> FieldHandlers {
    if offset.is_repeated() {
        return FieldHandlers::new()
            .on_start_sequence(move |sink| {
                // SAFETY: the sink of a field callback is the enclosing message.
                let msg = unsafe { sink.cast::<Message>() };
                Some(Sink::new(offset.get_mut::<RepeatedPtrField<Vec<u8>>>(msg)))
            })
            .on_start_string(|sink, _| {
                // SAFETY: the sequence sink is the field's container.
                let r = unsafe { sink.cast::<RepeatedPtrField<Vec<u8>>>() };
                let s = r.add();
                s.clear();
                Some(Sink::new(s))
            })
            .on_string(append_bytes);
    }

    // Read the default through a fresh instance, as every instance starts
    // out pointing at it.
    let mut fresh = prototype.new_instance();
    let default = *offset.get_mut::<*mut Vec<u8>>(&mut fresh);
    let ctx = Arc::new(StringContext {
        offset,
        default: DefaultString(default),
        _class: prototype.class_arc(),
    });

    FieldHandlers::new()
        .on_start_string(move |sink, _| {
            // SAFETY: the sink of a field callback is the enclosing message.
            let msg = unsafe { sink.cast::<Message>() };
            ctx.offset.set_hasbit(msg);
            let s = ctx.offset.owned_target(msg, ctx.default.0, || {
                NonNull::from(Box::leak(Box::<Vec<u8>>::default()))
            });
            s.clear();
            Some(Sink::new(s))
        })
        .on_string(append_bytes)
}
