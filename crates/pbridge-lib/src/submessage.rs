//! Submessage fields and prototype lookup.

use std::ptr::NonNull;
use std::sync::Arc;

use pbridge_core::{FieldDescriptor, MessageId};
use pbridge_handlers::{FieldHandlers, Sink};
use pbridge_reflect::{ElementPolicy, Message, MessageFactory, RepeatedPtrField};

use crate::field_offset::FieldOffset;

/// Shared handle to the prototype of a message type.
///
/// Holds the factory alive, so the prototype outlives every handler that
/// allocates from it.
#[derive(Clone)]
pub struct PrototypeRef {
    factory: Arc<MessageFactory>,
    id: MessageId,
}

impl PrototypeRef {
    pub fn new(factory: Arc<MessageFactory>, id: MessageId) -> Self {
        Self { factory, id }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn get(&self) -> &Message {
        self.factory.prototype(self.id)
    }
}

impl std::fmt::Debug for PrototypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PrototypeRef")
            .field(&self.get().descriptor().full_name())
            .finish()
    }
}

/// The prototype of the message type of `field`, a submessage field of
/// `prototype`'s type.
///
/// `None` when the field is not a submessage or when `prototype`'s
/// reflection does not expose the factory it came from.
pub fn get_field_prototype(field: &FieldDescriptor, prototype: &Message) -> Option<PrototypeRef> {
    let id = field.message_type()?;
    let factory = prototype.reflection().message_factory()?;
    Some(PrototypeRef::new(factory, id))
}

/// Deletion policy for repeated submessage containers fed by the decoder.
///
/// New elements are only appended once cleared ones are used up, so the
/// container never has one to discard.
struct NoDiscard;

impl ElementPolicy<Message> for NoDiscard {
    fn delete(&self, _elem: NonNull<Message>) {
        panic!("repeated submessage container discarded an element while appending");
    }
}

/// Handlers for a submessage or group field.
pub(crate) fn submessage_handlers(offset: FieldOffset, prototype: PrototypeRef) -> FieldHandlers {
    let prototype = Arc::new(prototype);

    if offset.is_repeated() {
        return FieldHandlers::new()
            .on_start_sequence(move |sink| {
                // SAFETY: the sink of a field callback is the enclosing message.
                let msg = unsafe { sink.cast::<Message>() };
                Some(Sink::new(offset.get_mut::<RepeatedPtrField<Message>>(msg)))
            })
            .on_start_submessage(move |sink| {
                // SAFETY: the sequence sink is the field's container.
                let r = unsafe { sink.cast::<RepeatedPtrField<Message>>() };
                let elem = match r.add_from_cleared() {
                    Some(elem) => elem,
                    None => {
                        let elem = prototype.get().new_instance().into_raw();
                        r.add_allocated(&NoDiscard, elem);
                        elem
                    }
                };
                Some(Sink::from_raw(elem))
            });
    }

    FieldHandlers::new().on_start_submessage(move |sink| {
        // SAFETY: the sink of a field callback is the enclosing message.
        let msg = unsafe { sink.cast::<Message>() };
        offset.set_hasbit(msg);
        let proto = prototype.get();
        let sub = offset.owned_target(msg, proto, || proto.new_instance().into_raw());
        Some(Sink::new(sub))
    })
}
