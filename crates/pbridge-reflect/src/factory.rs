//! Building the classes and prototypes of a whole pool.

use std::sync::Arc;

use pbridge_core::{DescriptorPool, MessageId};

use crate::class::{FieldSlot, MessageClass, SlotKind};
use crate::message::{Message, MessageBox, flags};

/// Which reflection a class is built with.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum ReflectionKind {
    /// [`GeneratedReflection`](crate::GeneratedReflection): layout is published.
    #[default]
    Generated,
    /// [`OpaqueReflection`](crate::OpaqueReflection): layout is hidden.
    Opaque,
}

/// Options for [`MessageFactory::with_options`].
#[derive(Clone, Debug, Default)]
pub struct FactoryOptions {
    reflection: ReflectionKind,
    opaque: Vec<String>,
}

impl FactoryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reflection used for every class not overridden by [`opaque_message`](Self::opaque_message).
    pub fn reflection(mut self, kind: ReflectionKind) -> Self {
        self.reflection = kind;
        self
    }

    /// Build this one message type with opaque reflection.
    pub fn opaque_message(mut self, full_name: impl Into<String>) -> Self {
        self.opaque.push(full_name.into());
        self
    }

    pub fn reflection_for(&self, full_name: &str) -> ReflectionKind {
        if self.opaque.iter().any(|n| n == full_name) {
            ReflectionKind::Opaque
        } else {
            self.reflection
        }
    }
}

/// Owns one class and one prototype per message type of a pool.
///
/// Prototypes are immutable default instances. Their singular submessage
/// slots point at the prototypes of the submessage types, so a prototype
/// graph may be cyclic.
pub struct MessageFactory {
    pool: Arc<DescriptorPool>,
    classes: Vec<Arc<MessageClass>>,
    prototypes: Vec<MessageBox>,
}

impl MessageFactory {
    pub fn new(pool: Arc<DescriptorPool>) -> Arc<Self> {
        Self::with_options(pool, &FactoryOptions::default())
    }

    pub fn with_options(pool: Arc<DescriptorPool>, options: &FactoryOptions) -> Arc<Self> {
        Arc::new_cyclic(|factory| {
            let classes: Vec<Arc<MessageClass>> = pool
                .messages()
                .iter()
                .map(|desc| {
                    Arc::new(MessageClass::new(
                        Arc::clone(&pool),
                        desc.id(),
                        options.reflection_for(desc.full_name()),
                        factory.clone(),
                    ))
                })
                .collect();

            let mut prototypes: Vec<MessageBox> = classes
                .iter()
                .map(|class| MessageBox::allocate(class, flags::PROTOTYPE))
                .collect();
            let addresses: Vec<*mut Message> = prototypes.iter().map(MessageBox::as_ptr).collect();

            for (proto, class) in prototypes.iter_mut().zip(&classes) {
                let fields = class.descriptor().fields();
                for (field, slot) in fields.iter().zip(class.layout().slots()) {
                    let Some(FieldSlot {
                        offset,
                        kind: SlotKind::Message,
                    }) = *slot
                    else {
                        continue;
                    };
                    let sub = field
                        .message_type()
                        .expect("message fields always resolve a message type");
                    // SAFETY: singular message slot of this prototype's class.
                    unsafe { *proto.slot_mut::<*mut Message>(offset) = addresses[sub.index()] };
                }
            }

            log::debug!("built {} message classes", classes.len());

            Self {
                pool,
                classes,
                prototypes,
            }
        })
    }

    pub fn pool(&self) -> &Arc<DescriptorPool> {
        &self.pool
    }

    pub fn class(&self, id: MessageId) -> &Arc<MessageClass> {
        self.ensure_class(id)
    }

    pub fn prototype(&self, id: MessageId) -> &Message {
        self.ensure_prototype(id)
    }

    pub fn find_prototype(&self, full_name: &str) -> Option<&Message> {
        let desc = self.pool.find_message(full_name)?;
        Some(self.prototype(desc.id()))
    }

    /// A fresh, empty instance of message type `id`.
    pub fn new_message(&self, id: MessageId) -> MessageBox {
        self.class(id).new_instance()
    }

    pub(crate) fn classes(&self) -> &[Arc<MessageClass>] {
        &self.classes
    }

    pub(crate) fn prototypes(&self) -> &[MessageBox] {
        &self.prototypes
    }
}

impl std::fmt::Debug for MessageFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageFactory")
            .field("classes", &self.classes.len())
            .finish_non_exhaustive()
    }
}
