//! Handlers that write through [`Reflection`], one call per value.
//!
//! Used for every field the direct path abstains on. They work with any
//! reflection flavour.
//!
//! [`Reflection`]: pbridge_reflect::Reflection

use std::sync::Arc;

use pbridge_core::{FieldDescriptor, StorageKind};
use pbridge_handlers::{FieldHandlers, HandlerValue, Sink};
use pbridge_reflect::{Message, MessageClass, MessageFactory, Value};

/// What every fallback callback of one field needs.
struct Target {
    class: Arc<MessageClass>,
    field: FieldDescriptor,
    /// Reflection finds submessage classes through the factory, which it
    /// only references weakly.
    _factory: Option<Arc<MessageFactory>>,
}

impl Target {
    fn store(&self, msg: &mut Message, value: Value) {
        let r = self.class.reflection();
        if self.field.is_repeated() {
            r.add(msg, &self.field, value);
        } else {
            r.set(msg, &self.field, value);
        }
    }
}

/// Reflection-based handlers for `field` of `class`.
pub(crate) fn fallback_handlers(field: &FieldDescriptor, class: &Arc<MessageClass>) -> FieldHandlers {
    let target = Arc::new(Target {
        class: Arc::clone(class),
        field: field.clone(),
        _factory: field
            .message_type()
            .and_then(|_| class.reflection().message_factory()),
    });

    match field.storage_kind() {
        StorageKind::Int32 => scalar(target, Value::I32),
        StorageKind::Int64 => scalar(target, Value::I64),
        StorageKind::UInt32 => scalar(target, Value::U32),
        StorageKind::UInt64 => scalar(target, Value::U64),
        StorageKind::Float => scalar(target, Value::F32),
        StorageKind::Double => scalar(target, Value::F64),
        StorageKind::Bool => scalar(target, Value::Bool),
        StorageKind::Enum => enumeration(target),
        StorageKind::String => string(target),
        StorageKind::Message => submessage(target),
    }
}

fn scalar<T: HandlerValue>(target: Arc<Target>, wrap: fn(T) -> Value) -> FieldHandlers {
    FieldHandlers::new().on_value(move |sink, v: T| {
        // SAFETY: fallback handlers never open a sequence sink, so every
        // callback receives the enclosing message.
        let msg = unsafe { sink.cast::<Message>() };
        target.store(msg, wrap(v));
        true
    })
}

fn enumeration(target: Arc<Target>) -> FieldHandlers {
    let pool = target.class.pool();
    let enum_desc = target
        .field
        .enum_type()
        .map(|id| pool.enum_type(id))
        .expect("enum field resolves to an enum type");
    let mut declared: Vec<i32> = enum_desc.values().iter().map(|v| v.number).collect();
    declared.sort_unstable();
    declared.dedup();

    FieldHandlers::new().on_value(move |sink, v: i32| {
        // SAFETY: as in `scalar`.
        let msg = unsafe { sink.cast::<Message>() };
        if declared.binary_search(&v).is_ok() {
            target.store(msg, Value::Enum(v));
        } else {
            target
                .class
                .reflection()
                .mutable_unknown_fields(msg)
                .add_varint(target.field.number(), i64::from(v) as u64);
        }
        true
    })
}

fn string(target: Arc<Target>) -> FieldHandlers {
    let append = Arc::clone(&target);
    FieldHandlers::new()
        .on_start_string(move |sink, _| {
            // SAFETY: as in `scalar`.
            let msg = unsafe { sink.cast::<Message>() };
            target.store(msg, Value::Bytes(Vec::new()));
            Some(sink)
        })
        .on_string(move |sink, buf| {
            // SAFETY: the start-string callback passes the message through.
            let msg = unsafe { sink.cast::<Message>() };
            append
                .class
                .reflection()
                .append_string(msg, &append.field, buf);
            buf.len()
        })
}

fn submessage(target: Arc<Target>) -> FieldHandlers {
    FieldHandlers::new().on_start_submessage(move |sink| {
        // SAFETY: as in `scalar`.
        let msg = unsafe { sink.cast::<Message>() };
        let r = target.class.reflection();
        let sub = if target.field.is_repeated() {
            r.add_message(msg, &target.field)
        } else {
            r.mutable_message(msg, &target.field)
        };
        Some(Sink::new(sub))
    })
}
