//! String fields declared with `ctype = CORD` or `ctype = STRING_PIECE`.

use pbridge_handlers::{FieldHandlers, Sink};
use pbridge_reflect::{Cord, Message, RepeatedField, RepeatedPtrField, StringPieceField};

use crate::field_offset::FieldOffset;

/// Handlers for a cord field. Chunks are appended without copying what is
/// already there.
pub(crate) fn cord_handlers(offset: FieldOffset) -> FieldHandlers {
    let append = |sink: Sink, buf: &[u8]| {
        // SAFETY: cord string sinks are opened by the start-string callback below.
        unsafe { sink.cast::<Cord>() }.append(buf);
        buf.len()
    };

    if offset.is_repeated() {
        return FieldHandlers::new()
            .on_start_sequence(move |sink| {
                // SAFETY: the sink of a field callback is the enclosing message.
                let msg = unsafe { sink.cast::<Message>() };
                Some(Sink::new(offset.get_mut::<RepeatedField<Cord>>(msg)))
            })
            .on_start_string(|sink, _| {
                // SAFETY: the sequence sink is the field's `RepeatedField<Cord>`.
                let r = unsafe { sink.cast::<RepeatedField<Cord>>() };
                r.push(Cord::new());
                r.last_mut().map(Sink::new)
            })
            .on_string(append);
    }

    FieldHandlers::new()
        .on_start_string(move |sink, _| {
            // SAFETY: the sink of a field callback is the enclosing message.
            let msg = unsafe { sink.cast::<Message>() };
            offset.set_hasbit(msg);
            let cord = offset.get_mut::<Cord>(msg);
            cord.clear();
            Some(Sink::new(cord))
        })
        .on_string(append)
}

/// Handlers for a string-piece field.
///
/// A piece has no in-place append, so each chunk allocates a buffer holding
/// the old contents plus the chunk and replaces the piece with it.
pub(crate) fn string_piece_handlers(offset: FieldOffset) -> FieldHandlers {
    let append = |sink: Sink, buf: &[u8]| {
        // SAFETY: piece string sinks are opened by the start-string callbacks below.
        let piece = unsafe { sink.cast::<StringPieceField>() };
        let joined = [piece.as_bytes(), buf].concat();
        piece.copy_from(&joined);
        buf.len()
    };

    if offset.is_repeated() {
        return FieldHandlers::new()
            .on_start_sequence(move |sink| {
                // SAFETY: the sink of a field callback is the enclosing message.
                let msg = unsafe { sink.cast::<Message>() };
                Some(Sink::new(offset.get_mut::<RepeatedPtrField<StringPieceField>>(msg)))
            })
            .on_start_string(|sink, _| {
                // SAFETY: the sequence sink is the field's container.
                let r = unsafe { sink.cast::<RepeatedPtrField<StringPieceField>>() };
                let piece = r.add();
                piece.clear();
                Some(Sink::new(piece))
            })
            .on_string(append);
    }

    FieldHandlers::new()
        .on_start_string(move |sink, _| {
            // SAFETY: the sink of a field callback is the enclosing message.
            let msg = unsafe { sink.cast::<Message>() };
            offset.set_hasbit(msg);
            let piece = offset.get_mut::<StringPieceField>(msg);
            piece.clear();
            Some(Sink::new(piece))
        })
        .on_string(append)
}
