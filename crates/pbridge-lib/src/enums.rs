//! Enum fields and the validity gate.

use std::sync::Arc;

use pbridge_core::{EnumDescriptor, EnumId, FieldDescriptor};
use pbridge_handlers::FieldHandlers;
use pbridge_reflect::{GeneratedReflection, Message, RepeatedField, UnknownFieldSet};

use crate::field_offset::FieldOffset;

/// Per-field state deciding where a decoded enum value goes.
///
/// Declared values land in the field's slot; anything else is kept as an
/// unknown varint under the field's wire number. A value is never written to
/// both, and never dropped.
#[derive(Debug)]
pub(crate) struct EnumGate {
    offset: FieldOffset,
    unknown: FieldOffset,
    number: u32,
    enum_type: EnumId,
    /// Declared numbers, sorted and deduplicated.
    declared: Vec<i32>,
}

impl EnumGate {
    pub(crate) fn new(
        field: &FieldDescriptor,
        enum_desc: &EnumDescriptor,
        reflection: &GeneratedReflection,
    ) -> Self {
        let mut declared: Vec<i32> = enum_desc.values().iter().map(|v| v.number).collect();
        declared.sort_unstable();
        declared.dedup();
        Self {
            offset: FieldOffset::new(field, reflection),
            unknown: FieldOffset::unknown_fields(reflection),
            number: field.number(),
            enum_type: enum_desc.id(),
            declared,
        }
    }

    pub(crate) fn is_declared(&self, value: i32) -> bool {
        self.declared.binary_search(&value).is_ok()
    }

    fn reject(&self, msg: &mut Message, value: i32) {
        log::trace!(
            "field {}: {value} is not a value of enum {}",
            self.number,
            self.enum_type.0
        );
        self.unknown
            .get_mut::<UnknownFieldSet>(msg)
            .add_varint(self.number, i64::from(value) as u64);
    }
}

/// Handlers for an enum field.
///
/// Repeated enums have no start-sequence callback: the value callback needs
/// the message itself, since rejected values go to its unknown-field set.
pub(crate) fn enum_handlers(gate: EnumGate) -> FieldHandlers {
    let gate = Arc::new(gate);

    if gate.offset.is_repeated() {
        return FieldHandlers::new().on_value(move |sink, v: i32| {
            // SAFETY: the sink of a field callback is the enclosing message.
            let msg = unsafe { sink.cast::<Message>() };
            if gate.is_declared(v) {
                gate.offset.get_mut::<RepeatedField<i32>>(msg).push(v);
            } else {
                gate.reject(msg, v);
            }
            true
        });
    }

    FieldHandlers::new().on_value(move |sink, v: i32| {
        // SAFETY: the sink of a field callback is the enclosing message.
        let msg = unsafe { sink.cast::<Message>() };
        if gate.is_declared(v) {
            gate.offset.write(msg, v);
            gate.offset.set_hasbit(msg);
        } else {
            gate.reject(msg, v);
        }
        true
    })
}
