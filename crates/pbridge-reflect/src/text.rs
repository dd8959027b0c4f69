//! Debug text rendering of message instances.
//!
//! Output resembles the protobuf text format: one `name: value` line per
//! present value, nested messages in braces, unknown entries last as
//! `number: varint`. Rendering goes through [`Reflection`], so classes with
//! opaque reflection render the same as generated ones.
//!
//! [`Reflection`]: crate::Reflection

use std::fmt::Write;

use pbridge_core::{Colors, FieldDescriptor};

use crate::message::Message;
use crate::reflection::Value;

/// Render `msg` without colors.
pub fn format(msg: &Message) -> String {
    format_colored(msg, Colors::OFF)
}

pub fn format_colored(msg: &Message, colors: Colors) -> String {
    let mut out = String::new();
    Printer {
        out: &mut out,
        colors,
    }
    .message(msg, 0);
    out
}

struct Printer<'a> {
    out: &'a mut String,
    colors: Colors,
}

impl Printer<'_> {
    fn message(&mut self, msg: &Message, depth: usize) {
        let reflection = msg.reflection();

        for field in msg.descriptor().fields() {
            if field.is_extension() {
                continue;
            }

            let is_message = field.message_type().is_some();
            if field.is_repeated() {
                for i in 0..reflection.field_len(msg, field) {
                    if is_message {
                        self.nested(field, reflection.repeated_message(msg, field, i), depth);
                    } else {
                        let value = reflection.get_repeated(msg, field, i);
                        self.value_line(msg, field, &value, depth);
                    }
                }
            } else if is_message {
                if let Some(sub) = reflection.message(msg, field) {
                    self.nested(field, sub, depth);
                }
            } else if reflection.has_field(msg, field) {
                let value = reflection.get(msg, field);
                self.value_line(msg, field, &value, depth);
            }
        }

        let c = self.colors;
        for unknown in reflection.unknown_fields(msg) {
            self.indent(depth);
            let _ = writeln!(
                self.out,
                "{}{}: {}{}",
                c.dim, unknown.number, unknown.value, c.reset
            );
        }
    }

    fn nested(&mut self, field: &FieldDescriptor, sub: &Message, depth: usize) {
        let c = self.colors;
        self.indent(depth);
        let _ = writeln!(self.out, "{}{}{} {}{{{}", c.blue, field.name(), c.reset, c.dim, c.reset);
        self.message(sub, depth + 1);
        self.indent(depth);
        let _ = writeln!(self.out, "{}}}{}", c.dim, c.reset);
    }

    fn value_line(&mut self, msg: &Message, field: &FieldDescriptor, value: &Value, depth: usize) {
        let c = self.colors;
        self.indent(depth);
        let _ = write!(self.out, "{}{}{}: ", c.blue, field.name(), c.reset);
        let _ = match value {
            Value::I32(v) => writeln!(self.out, "{v}"),
            Value::I64(v) => writeln!(self.out, "{v}"),
            Value::U32(v) => writeln!(self.out, "{v}"),
            Value::U64(v) => writeln!(self.out, "{v}"),
            Value::F32(v) => writeln!(self.out, "{v}"),
            Value::F64(v) => writeln!(self.out, "{v}"),
            Value::Bool(v) => writeln!(self.out, "{v}"),
            Value::Enum(n) => {
                let name = field
                    .enum_type()
                    .map(|id| msg.class().pool().enum_type(id))
                    .and_then(|e| e.find_value_by_number(*n))
                    .map(|v| v.name.as_str());
                match name {
                    Some(name) => writeln!(self.out, "{}{name}{}", c.green, c.reset),
                    None => writeln!(self.out, "{n}"),
                }
            }
            Value::Bytes(b) => writeln!(self.out, "{}\"{}\"{}", c.green, b.escape_ascii(), c.reset),
        };
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str("  ");
        }
    }
}
