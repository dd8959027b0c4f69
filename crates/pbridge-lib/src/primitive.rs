//! Numeric and bool fields.

use std::sync::Arc;

use pbridge_core::{FieldDescriptor, StorageKind};
use pbridge_handlers::{FieldHandlers, HandlerValue, Sink};
use pbridge_reflect::{Message, RepeatedField};

use crate::field_offset::FieldOffset;

/// Handlers for a scalar or repeated primitive field.
pub(crate) fn primitive_handlers(field: &FieldDescriptor, offset: FieldOffset) -> FieldHandlers {
    match field.storage_kind() {
        StorageKind::Int32 => typed::<i32>(offset),
        StorageKind::Int64 => typed::<i64>(offset),
        StorageKind::UInt32 => typed::<u32>(offset),
        StorageKind::UInt64 => typed::<u64>(offset),
        StorageKind::Float => typed::<f32>(offset),
        StorageKind::Double => typed::<f64>(offset),
        StorageKind::Bool => typed::<bool>(offset),
        kind => unreachable!("primitive_handlers: {kind:?} is not a primitive"),
    }
}

fn typed<T: HandlerValue>(offset: FieldOffset) -> FieldHandlers {
    let offset = Arc::new(offset);

    if offset.is_repeated() {
        return FieldHandlers::new()
            .on_start_sequence(move |sink| {
                // SAFETY: the sink of a field callback is the enclosing message.
                let msg = unsafe { sink.cast::<Message>() };
                Some(Sink::new(offset.get_mut::<RepeatedField<T>>(msg)))
            })
            .on_value(|sink, v: T| {
                // SAFETY: the sequence sink is the field's `RepeatedField<T>`.
                unsafe { sink.cast::<RepeatedField<T>>() }.push(v);
                true
            });
    }

    FieldHandlers::new().on_value(move |sink, v: T| {
        // SAFETY: the sink of a field callback is the enclosing message.
        let msg = unsafe { sink.cast::<Message>() };
        offset.write(msg, v);
        offset.set_hasbit(msg);
        true
    })
}
