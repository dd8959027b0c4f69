//! Invariant checks excluded from coverage reports.

#![cfg_attr(coverage_nightly, coverage(off))]

use std::sync::Arc;

use pbridge_core::{FieldDescriptor, MessageId};

use crate::class::{FieldSlot, MessageClass};
use crate::factory::MessageFactory;
use crate::message::{Message, MessageBox};
use crate::reflection::GeneratedReflection;

impl GeneratedReflection {
    pub(crate) fn ensure_class(&self, msg: &Message) {
        let actual = msg.class().id();
        assert!(
            actual == self.message_id(),
            "Reflection: message of type {} passed to reflection of type {}",
            actual.0,
            self.message_id().0
        );
    }

    pub(crate) fn ensure_slot(&self, msg: &Message, field: &FieldDescriptor) -> FieldSlot {
        self.ensure_class(msg);
        assert!(
            field.containing_type() == self.message_id(),
            "Reflection: field `{}` belongs to another message type",
            field.name()
        );
        msg.class()
            .layout()
            .slot(field.index())
            .unwrap_or_else(|| panic!("Reflection: field `{}` has no storage", field.name()))
    }

    pub(crate) fn ensure_writable_slot(
        &self,
        msg: &Message,
        field: &FieldDescriptor,
    ) -> FieldSlot {
        assert!(
            !msg.is_prototype(),
            "Reflection: cannot write `{}` of a prototype",
            field.name()
        );
        self.ensure_slot(msg, field)
    }
}

impl MessageClass {
    pub(crate) fn ensure_default_string(&self, index: usize) -> &Vec<u8> {
        self.default_string(index).unwrap_or_else(|| {
            panic!(
                "MessageClass: field {index} of `{}` is not a singular string",
                self.descriptor().full_name()
            )
        })
    }
}

impl MessageFactory {
    pub(crate) fn ensure_class(&self, id: MessageId) -> &Arc<MessageClass> {
        self.classes().get(id.index()).unwrap_or_else(|| {
            panic!(
                "MessageFactory: message id {} out of range ({} classes)",
                id.0,
                self.classes().len()
            )
        })
    }

    pub(crate) fn ensure_prototype(&self, id: MessageId) -> &Message {
        self.prototypes()
            .get(id.index())
            .map(|p: &MessageBox| &**p)
            .unwrap_or_else(|| panic!("MessageFactory: message id {} out of range", id.0))
    }
}
