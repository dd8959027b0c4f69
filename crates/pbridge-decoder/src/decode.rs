//! Drives a handler set from encoded bytes.

use pbridge_core::{FieldDescriptor, FieldType, MessageDescriptor, StorageKind, WireType};
use pbridge_handlers::{FieldHandlers, HandlerSet, Handlers, Sink, ValueHandler};

use crate::error::DecodeError;
use crate::limits::DecodeLimits;
use crate::reader::Reader;

/// Decode `bytes` as the root message of `set`, pushing every field to its
/// callbacks with `root` as the initial sink.
///
/// Sink rules: a start callback's result becomes the sink of the scope it
/// opens; an unset start callback passes its input through. End callbacks
/// receive the sink their start callback returned. A repeated field's
/// sequence opens on its first element and closes when another handled field
/// starts or the enclosing message ends.
pub fn decode(
    set: &HandlerSet,
    bytes: &[u8],
    root: Sink,
    limits: &DecodeLimits,
) -> Result<(), DecodeError> {
    let handlers = set
        .handlers(set.root())
        .expect("handler sets always cover their root");
    let mut decoder = Decoder {
        set,
        limits,
        depth: 0,
    };
    decoder.message(handlers, &mut Reader::new(bytes), root, None)
}

struct Decoder<'s> {
    set: &'s HandlerSet,
    limits: &'s DecodeLimits,
    depth: u32,
}

/// The repeated field whose sequence is currently open, and its sink.
type OpenSequence = Option<(usize, Sink)>;

fn stopped(field: &FieldDescriptor) -> DecodeError {
    DecodeError::Stopped {
        field: field.name().to_owned(),
    }
}

impl<'s> Decoder<'s> {
    /// Decode fields until the reader is exhausted or, for a group, until
    /// its end tag.
    fn message(
        &mut self,
        handlers: &'s Handlers,
        reader: &mut Reader<'_>,
        closure: Sink,
        group: Option<u32>,
    ) -> Result<(), DecodeError> {
        let desc = self.set.pool().message(handlers.message());
        let mut seq: OpenSequence = None;

        while !reader.is_empty() {
            let tag_offset = reader.offset();
            let (number, wire) = reader.tag()?;

            if wire == WireType::EndGroup {
                if group == Some(number) {
                    return close_sequence(desc, handlers, &mut seq);
                }
                return Err(DecodeError::UnexpectedEndGroup {
                    number,
                    offset: tag_offset,
                });
            }

            let Some((field, fh)) = desc
                .field_by_number(number)
                .and_then(|f| Some((f, handlers.field(f.index())?)))
            else {
                log::trace!("{}: skipping field {number} ({wire:?})", desc.full_name());
                self.skip(reader, number, wire)?;
                continue;
            };

            let field_type = field.field_type();
            let packed =
                wire == WireType::LengthDelimited && field.is_repeated() && field_type.is_packable();
            if wire != field_type.wire_type() && !packed {
                log::trace!(
                    "{}.{}: wire type {wire:?} does not match {}, skipping",
                    desc.full_name(),
                    field.name(),
                    field_type.name()
                );
                self.skip(reader, number, wire)?;
                continue;
            }

            log::trace!("{}.{}: {wire:?}", desc.full_name(), field.name());
            let sink = if field.is_repeated() {
                enter_sequence(desc, handlers, field, fh, closure, &mut seq)?
            } else {
                close_sequence(desc, handlers, &mut seq)?;
                closure
            };

            match field.storage_kind() {
                StorageKind::String => self.string(field, fh, reader, sink)?,
                StorageKind::Message => self.submessage(field, fh, reader, sink, wire)?,
                _ if packed => {
                    let mut values = reader.sub_reader()?;
                    while !values.is_empty() {
                        let raw = values.scalar(field_type.wire_type())?;
                        deliver_value(field, fh, sink, raw)?;
                    }
                }
                _ => {
                    let raw = reader.scalar(wire)?;
                    deliver_value(field, fh, sink, raw)?;
                }
            }
        }

        if let Some(number) = group {
            return Err(DecodeError::UnterminatedGroup { number });
        }
        close_sequence(desc, handlers, &mut seq)
    }

    fn string(
        &mut self,
        field: &FieldDescriptor,
        fh: &FieldHandlers,
        reader: &mut Reader<'_>,
        sink: Sink,
    ) -> Result<(), DecodeError> {
        let data = reader.delimited()?;
        let sink = match fh.start_string() {
            Some(start) => start(sink, data.len()).ok_or_else(|| stopped(field))?,
            None => sink,
        };
        if let Some(append) = fh.string() {
            let chunk = self.limits.string_chunk.unwrap_or(usize::MAX);
            for buf in data.chunks(chunk) {
                if append(sink, buf) < buf.len() {
                    return Err(stopped(field));
                }
            }
        }
        if let Some(end) = fh.end_string()
            && !end(sink)
        {
            return Err(stopped(field));
        }
        Ok(())
    }

    fn submessage(
        &mut self,
        field: &FieldDescriptor,
        fh: &FieldHandlers,
        reader: &mut Reader<'_>,
        sink: Sink,
        wire: WireType,
    ) -> Result<(), DecodeError> {
        let sub_id = field
            .message_type()
            .expect("message fields always resolve a message type");
        let sub_handlers = self
            .set
            .handlers(sub_id)
            .expect("handler sets cover every reachable message type");
        if self.depth >= self.limits.max_depth {
            return Err(DecodeError::DepthLimitExceeded {
                limit: self.limits.max_depth,
            });
        }

        let mut body = match wire {
            WireType::StartGroup => None,
            _ => Some(reader.sub_reader()?),
        };
        let sub = match fh.start_submessage() {
            Some(start) => start(sink).ok_or_else(|| stopped(field))?,
            None => sink,
        };

        self.depth += 1;
        let res = match &mut body {
            Some(body) => self.message(sub_handlers, body, sub, None),
            None => self.message(sub_handlers, reader, sub, Some(field.number())),
        };
        self.depth -= 1;
        res?;

        if let Some(end) = fh.end_submessage()
            && !end(sub)
        {
            return Err(stopped(field));
        }
        Ok(())
    }

    fn skip(&self, reader: &mut Reader<'_>, number: u32, wire: WireType) -> Result<(), DecodeError> {
        let limit = self.limits.max_depth;
        reader.skip(number, wire, limit.saturating_sub(self.depth), limit)
    }
}

fn enter_sequence(
    desc: &MessageDescriptor,
    handlers: &Handlers,
    field: &FieldDescriptor,
    fh: &FieldHandlers,
    closure: Sink,
    seq: &mut OpenSequence,
) -> Result<Sink, DecodeError> {
    if let Some((index, sink)) = *seq
        && index == field.index()
    {
        return Ok(sink);
    }
    close_sequence(desc, handlers, seq)?;
    let sink = match fh.start_sequence() {
        Some(start) => start(closure).ok_or_else(|| stopped(field))?,
        None => closure,
    };
    *seq = Some((field.index(), sink));
    Ok(sink)
}

fn close_sequence(
    desc: &MessageDescriptor,
    handlers: &Handlers,
    seq: &mut OpenSequence,
) -> Result<(), DecodeError> {
    let Some((index, sink)) = seq.take() else {
        return Ok(());
    };
    if let Some(end) = handlers.field(index).and_then(FieldHandlers::end_sequence)
        && !end(sink)
    {
        return Err(stopped(desc.field(index)));
    }
    Ok(())
}

fn zigzag32(raw: u32) -> i32 {
    ((raw >> 1) as i32) ^ -((raw & 1) as i32)
}

fn zigzag64(raw: u64) -> i64 {
    ((raw >> 1) as i64) ^ -((raw & 1) as i64)
}

/// Convert raw wire bits to the handler's value type and call it.
fn deliver_value(
    field: &FieldDescriptor,
    fh: &FieldHandlers,
    sink: Sink,
    raw: u64,
) -> Result<(), DecodeError> {
    let Some(handler) = fh.value() else {
        return Ok(());
    };
    let ok = match handler {
        ValueHandler::I32(f) => f(
            sink,
            match field.field_type() {
                FieldType::SInt32 => zigzag32(raw as u32),
                _ => raw as i32,
            },
        ),
        ValueHandler::I64(f) => f(
            sink,
            match field.field_type() {
                FieldType::SInt64 => zigzag64(raw),
                _ => raw as i64,
            },
        ),
        ValueHandler::U32(f) => f(sink, raw as u32),
        ValueHandler::U64(f) => f(sink, raw),
        ValueHandler::F32(f) => f(sink, f32::from_bits(raw as u32)),
        ValueHandler::F64(f) => f(sink, f64::from_bits(raw)),
        ValueHandler::Bool(f) => f(sink, raw != 0),
    };
    if ok { Ok(()) } else { Err(stopped(field)) }
}
