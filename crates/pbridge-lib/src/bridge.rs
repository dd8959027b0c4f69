//! Write handlers for a whole message graph.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use pbridge_core::{Colors, MessageDescriptor, MessageId};
use pbridge_decoder::DecodeLimits;
use pbridge_handlers::{HandlerSet, Handlers, Sink};
use pbridge_reflect::{GeneratedReflection, Message, MessageClass};

use crate::Result;
use crate::accessor::{Abstain, DirectKind, set_direct};
use crate::fallback::fallback_handlers;
use crate::submessage::{PrototypeRef, get_field_prototype};

/// How one field is written during decoding.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FieldPlan {
    /// Straight into the class layout.
    Direct(DirectKind),
    /// Through reflection, for the given reason.
    Fallback(Abstain),
    /// Not written at all; its data is skipped.
    Skipped,
}

/// The field plans of one message type, in declaration order.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MessagePlan {
    pub id: MessageId,
    pub full_name: String,
    pub fields: Vec<(String, FieldPlan)>,
}

impl MessagePlan {
    pub fn field(&self, name: &str) -> Option<FieldPlan> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, plan)| *plan)
    }

    pub fn direct_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|(_, plan)| matches!(plan, FieldPlan::Direct(_)))
            .count()
    }
}

/// Frozen handlers that decode into instances of one message class.
#[derive(Debug)]
pub struct WriteHandlers {
    set: HandlerSet,
    class: Arc<MessageClass>,
    plans: Vec<MessagePlan>,
}

impl WriteHandlers {
    pub fn handler_set(&self) -> &HandlerSet {
        &self.set
    }

    pub fn class(&self) -> &Arc<MessageClass> {
        &self.class
    }

    /// Plans of the root type and every reachable type, root first.
    pub fn plans(&self) -> &[MessagePlan] {
        &self.plans
    }

    pub fn plan(&self, full_name: &str) -> Option<&MessagePlan> {
        self.plans.iter().find(|p| p.full_name == full_name)
    }

    /// Decode `bytes` into `msg`, merging into whatever it already holds.
    ///
    /// # Panics
    ///
    /// If `msg` is not an instance of the class these handlers were built
    /// for, or is a prototype.
    pub fn decode_into(&self, bytes: &[u8], msg: &mut Message, limits: &DecodeLimits) -> Result<()> {
        assert!(
            msg.is_instance_of(&self.class),
            "decode_into: handlers for `{}` cannot write a `{}`",
            self.class.descriptor().full_name(),
            msg.descriptor().full_name()
        );
        assert!(!msg.is_prototype(), "decode_into: prototypes are immutable");

        pbridge_decoder::decode(&self.set, bytes, Sink::new(msg), limits)?;
        Ok(())
    }

    /// Human-readable plan listing, one line per field.
    pub fn report(&self, colors: Colors) -> String {
        let c = colors;
        let mut out = String::new();
        for plan in &self.plans {
            let _ = writeln!(
                out,
                "{}{}{} {}({}/{} direct){}",
                c.blue,
                plan.full_name,
                c.reset,
                c.dim,
                plan.direct_count(),
                plan.fields.len(),
                c.reset
            );
            for (name, field) in &plan.fields {
                let _ = match field {
                    FieldPlan::Direct(kind) => writeln!(out, "  {name}: {kind}"),
                    FieldPlan::Fallback(reason) => {
                        writeln!(out, "  {name}: {}reflection ({reason}){}", c.dim, c.reset)
                    }
                    FieldPlan::Skipped => writeln!(out, "  {name}: {}skipped{}", c.dim, c.reset),
                };
            }
        }
        out
    }
}

impl fmt::Display for WriteHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report(Colors::OFF))
    }
}

/// Build write handlers for `prototype`'s type and every type reachable
/// from it.
///
/// Fields the direct path abstains on get reflection handlers, so every
/// field is decoded either way. Extensions have no storage and are skipped.
/// Prototypes of nested types are found through the factory of the type
/// that references them.
pub fn new_write_handlers(prototype: &Message) -> Result<WriteHandlers> {
    let class = prototype.class_arc();
    let pool = Arc::clone(class.pool());
    let root = class.id();

    let mut prototypes: Vec<Option<PrototypeRef>> = vec![None; pool.message_count()];
    let mut plans = Vec::new();

    let set = HandlerSet::build::<_, crate::Error>(pool, root, |desc, handlers| {
        let found = prototypes[desc.id().index()].clone();
        let current = match (&found, desc.id() == root) {
            (_, true) => prototype,
            (Some(found), false) => found.get(),
            (None, false) => {
                log::warn!(
                    "`{}`: no prototype reachable, its fields are skipped",
                    desc.full_name()
                );
                plans.push(skipped_plan(desc));
                return Ok(());
            }
        };

        let plan = install_message(desc, current, handlers)?;
        for field in desc.fields() {
            if let Some(id) = field.message_type()
                && prototypes[id.index()].is_none()
                && id != root
            {
                prototypes[id.index()] = get_field_prototype(field, current);
            }
        }
        plans.push(plan);
        Ok(())
    })?;

    Ok(WriteHandlers { set, class, plans })
}

fn install_message(
    desc: &MessageDescriptor,
    prototype: &Message,
    handlers: &mut Handlers,
) -> Result<MessagePlan> {
    if !prototype.reflection().as_any().is::<GeneratedReflection>() {
        log::warn!(
            "`{}`: layout is not published, every field goes through reflection",
            desc.full_name()
        );
    }

    let class = prototype.class_arc();
    let mut fields = Vec::with_capacity(desc.field_count());
    for field in desc.fields() {
        let plan = if field.is_extension() {
            log::debug!("`{}`: extension skipped", field.name());
            FieldPlan::Skipped
        } else {
            match set_direct(field, prototype, handlers) {
                Ok(kind) => {
                    log::debug!("`{}`: direct {kind}", field.name());
                    FieldPlan::Direct(kind)
                }
                Err(reason) => {
                    log::debug!("`{}`: reflection, {reason}", field.name());
                    handlers.install(field, fallback_handlers(field, &class))?;
                    FieldPlan::Fallback(reason)
                }
            }
        };
        fields.push((field.name().to_owned(), plan));
    }

    Ok(MessagePlan {
        id: desc.id(),
        full_name: desc.full_name().to_owned(),
        fields,
    })
}

fn skipped_plan(desc: &MessageDescriptor) -> MessagePlan {
    MessagePlan {
        id: desc.id(),
        full_name: desc.full_name().to_owned(),
        fields: desc
            .fields()
            .iter()
            .map(|f| (f.name().to_owned(), FieldPlan::Skipped))
            .collect(),
    }
}
