//! Per-message handler tables and the frozen set covering a message graph.

use std::sync::Arc;

use pbridge_core::{DescriptorPool, FieldDescriptor, MessageDescriptor, MessageId, StorageKind};

use crate::error::HandlersError;
use crate::field::{FieldHandlers, HandlerRole};
use crate::value::ValueType;

/// Callbacks for the fields of one message type, indexed by field index.
#[derive(Debug)]
pub struct Handlers {
    message: MessageId,
    fields: Vec<Option<FieldHandlers>>,
}

impl Handlers {
    pub fn new(desc: &MessageDescriptor) -> Self {
        Self {
            message: desc.id(),
            fields: std::iter::repeat_with(|| None)
                .take(desc.field_count())
                .collect(),
        }
    }

    pub fn message(&self) -> MessageId {
        self.message
    }

    pub fn field(&self, index: usize) -> Option<&FieldHandlers> {
        self.fields.get(index).and_then(Option::as_ref)
    }

    /// Number of fields with handlers installed.
    pub fn installed_count(&self) -> usize {
        self.fields.iter().flatten().count()
    }

    /// Install every callback of `field` at once.
    ///
    /// Nothing is stored when validation fails, so a field never ends up with
    /// a partial set of roles.
    pub fn install(
        &mut self,
        field: &FieldDescriptor,
        handlers: FieldHandlers,
    ) -> Result<(), HandlersError> {
        if field.containing_type() != self.message || field.index() >= self.fields.len() {
            return Err(HandlersError::FieldNotInMessage {
                field: field.name().to_owned(),
                message: self.message,
            });
        }
        if self.fields[field.index()].is_some() {
            return Err(HandlersError::AlreadyInstalled {
                field: field.name().to_owned(),
            });
        }
        validate(field, &handlers)?;

        log::trace!("handlers for `{}`: {handlers:?}", field.name());
        self.fields[field.index()] = Some(handlers);
        Ok(())
    }
}

fn validate(field: &FieldDescriptor, handlers: &FieldHandlers) -> Result<(), HandlersError> {
    let kind = field.storage_kind();
    let invalid = |role, reason| HandlersError::InvalidRole {
        field: field.name().to_owned(),
        field_type: field.field_type(),
        role,
        reason,
    };

    for role in handlers.roles() {
        match role {
            HandlerRole::StartSequence | HandlerRole::EndSequence if !field.is_repeated() => {
                return Err(invalid(role, "field is not repeated"));
            }
            HandlerRole::Value if ValueType::of(kind).is_none() => {
                return Err(invalid(role, "field does not decode to a scalar"));
            }
            HandlerRole::StartString | HandlerRole::String | HandlerRole::EndString
                if kind != StorageKind::String =>
            {
                return Err(invalid(role, "field is not a string"));
            }
            HandlerRole::StartSubMessage | HandlerRole::EndSubMessage
                if kind != StorageKind::Message =>
            {
                return Err(invalid(role, "field is not a message"));
            }
            _ => {}
        }
    }

    if let (Some(value), Some(expected)) = (handlers.value(), ValueType::of(kind))
        && value.value_type() != expected
    {
        return Err(HandlersError::ValueTypeMismatch {
            field: field.name().to_owned(),
            expected,
            actual: value.value_type(),
        });
    }
    Ok(())
}

/// Frozen handlers for a root message type and every type reachable from it.
///
/// Immutable once built; shareable across threads and concurrent decodes.
#[derive(Debug)]
pub struct HandlerSet {
    pool: Arc<DescriptorPool>,
    root: MessageId,
    messages: Vec<Option<Handlers>>,
}

impl HandlerSet {
    /// Build handlers for `root` and its reachable types, calling `install`
    /// once per type, root first.
    pub fn build<F, E>(pool: Arc<DescriptorPool>, root: MessageId, mut install: F) -> Result<Self, E>
    where
        F: FnMut(&MessageDescriptor, &mut Handlers) -> Result<(), E>,
    {
        let mut messages: Vec<Option<Handlers>> = std::iter::repeat_with(|| None)
            .take(pool.message_count())
            .collect();

        for id in pool.reachable_messages(root) {
            let desc = pool.message(id);
            let mut handlers = Handlers::new(desc);
            install(desc, &mut handlers)?;
            log::debug!(
                "handlers for `{}`: {}/{} fields",
                desc.full_name(),
                handlers.installed_count(),
                desc.field_count()
            );
            messages[id.index()] = Some(handlers);
        }

        Ok(Self {
            pool,
            root,
            messages,
        })
    }

    pub fn pool(&self) -> &Arc<DescriptorPool> {
        &self.pool
    }

    pub fn root(&self) -> MessageId {
        self.root
    }

    /// Handlers of `id`, when it is part of this set.
    pub fn handlers(&self, id: MessageId) -> Option<&Handlers> {
        self.messages.get(id.index()).and_then(Option::as_ref)
    }

    /// Message types covered by the set, in id order.
    pub fn message_ids(&self) -> impl Iterator<Item = MessageId> + '_ {
        self.messages
            .iter()
            .flatten()
            .map(Handlers::message)
    }
}
