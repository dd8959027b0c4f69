//! Callbacks registered for one field.

use std::fmt;

use crate::sink::Sink;
use crate::value::{HandlerValue, ValueHandler};

/// Opens a nested scope and returns its sink; `None` stops the decode.
pub type StartFn = Box<dyn Fn(Sink) -> Option<Sink> + Send + Sync>;
/// Closes a scope opened by the matching start callback; `false` stops the decode.
pub type EndFn = Box<dyn Fn(Sink) -> bool + Send + Sync>;
/// Opens a string of the given total length.
pub type StartStrFn = Box<dyn Fn(Sink, usize) -> Option<Sink> + Send + Sync>;
/// Receives one buffer of string bytes; returns how many bytes were consumed.
pub type StringFn = Box<dyn Fn(Sink, &[u8]) -> usize + Send + Sync>;

/// The distinct callback slots of a field.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum HandlerRole {
    StartSequence,
    EndSequence,
    Value,
    StartString,
    String,
    EndString,
    StartSubMessage,
    EndSubMessage,
}

impl HandlerRole {
    pub fn name(self) -> &'static str {
        match self {
            Self::StartSequence => "start-sequence",
            Self::EndSequence => "end-sequence",
            Self::Value => "value",
            Self::StartString => "start-string",
            Self::String => "string",
            Self::EndString => "end-string",
            Self::StartSubMessage => "start-submessage",
            Self::EndSubMessage => "end-submessage",
        }
    }
}

impl fmt::Display for HandlerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builder collecting every callback of one field.
///
/// The set is installed as a unit through [`Handlers::install`], which
/// validates it against the field's kind and cardinality.
///
/// [`Handlers::install`]: crate::Handlers::install
#[derive(Default)]
pub struct FieldHandlers {
    start_seq: Option<StartFn>,
    end_seq: Option<EndFn>,
    value: Option<ValueHandler>,
    start_str: Option<StartStrFn>,
    string: Option<StringFn>,
    end_str: Option<EndFn>,
    start_submsg: Option<StartFn>,
    end_submsg: Option<EndFn>,
}

impl FieldHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start_sequence(
        mut self,
        f: impl Fn(Sink) -> Option<Sink> + Send + Sync + 'static,
    ) -> Self {
        self.start_seq = Some(Box::new(f));
        self
    }

    pub fn on_end_sequence(mut self, f: impl Fn(Sink) -> bool + Send + Sync + 'static) -> Self {
        self.end_seq = Some(Box::new(f));
        self
    }

    pub fn on_value<T: HandlerValue>(
        mut self,
        f: impl Fn(Sink, T) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.value = Some(T::into_handler(Box::new(f)));
        self
    }

    pub fn on_start_string(
        mut self,
        f: impl Fn(Sink, usize) -> Option<Sink> + Send + Sync + 'static,
    ) -> Self {
        self.start_str = Some(Box::new(f));
        self
    }

    pub fn on_string(mut self, f: impl Fn(Sink, &[u8]) -> usize + Send + Sync + 'static) -> Self {
        self.string = Some(Box::new(f));
        self
    }

    pub fn on_end_string(mut self, f: impl Fn(Sink) -> bool + Send + Sync + 'static) -> Self {
        self.end_str = Some(Box::new(f));
        self
    }

    pub fn on_start_submessage(
        mut self,
        f: impl Fn(Sink) -> Option<Sink> + Send + Sync + 'static,
    ) -> Self {
        self.start_submsg = Some(Box::new(f));
        self
    }

    pub fn on_end_submessage(mut self, f: impl Fn(Sink) -> bool + Send + Sync + 'static) -> Self {
        self.end_submsg = Some(Box::new(f));
        self
    }

    pub fn start_sequence(&self) -> Option<&StartFn> {
        self.start_seq.as_ref()
    }

    pub fn end_sequence(&self) -> Option<&EndFn> {
        self.end_seq.as_ref()
    }

    pub fn value(&self) -> Option<&ValueHandler> {
        self.value.as_ref()
    }

    pub fn start_string(&self) -> Option<&StartStrFn> {
        self.start_str.as_ref()
    }

    pub fn string(&self) -> Option<&StringFn> {
        self.string.as_ref()
    }

    pub fn end_string(&self) -> Option<&EndFn> {
        self.end_str.as_ref()
    }

    pub fn start_submessage(&self) -> Option<&StartFn> {
        self.start_submsg.as_ref()
    }

    pub fn end_submessage(&self) -> Option<&EndFn> {
        self.end_submsg.as_ref()
    }

    /// Roles that have a callback, in declaration order.
    pub fn roles(&self) -> Vec<HandlerRole> {
        let slots = [
            (self.start_seq.is_some(), HandlerRole::StartSequence),
            (self.end_seq.is_some(), HandlerRole::EndSequence),
            (self.value.is_some(), HandlerRole::Value),
            (self.start_str.is_some(), HandlerRole::StartString),
            (self.string.is_some(), HandlerRole::String),
            (self.end_str.is_some(), HandlerRole::EndString),
            (self.start_submsg.is_some(), HandlerRole::StartSubMessage),
            (self.end_submsg.is_some(), HandlerRole::EndSubMessage),
        ];
        slots
            .into_iter()
            .filter_map(|(set, role)| set.then_some(role))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.roles().is_empty()
    }
}

impl fmt::Debug for FieldHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for role in self.roles() {
            match (role, &self.value) {
                (HandlerRole::Value, Some(v)) => list.entry(&format_args!("value({:?})", v.value_type())),
                _ => list.entry(&format_args!("{role}")),
            };
        }
        list.finish()
    }
}
