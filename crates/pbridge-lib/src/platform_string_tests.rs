use pbridge_decoder::{DecodeLimits, Encoder};
use pbridge_reflect::{Cord, RepeatedField, RepeatedPtrField, StringPieceField, Value};

use crate::DirectKind;
use crate::accessor::set_direct;
use crate::test_utils::{
    byte_chunks, decode, direct_set, empty_handlers, factory, field, generated, slot,
};

#[test]
fn ctype_selects_the_builder() {
    let factory = factory();
    let prototype = factory.find_prototype("demo.Team").unwrap();
    let mut handlers = empty_handlers(&factory, "demo.Team");

    let kinds: Vec<_> = ["body", "parts", "key", "keys"]
        .into_iter()
        .map(|name| set_direct(&field(&factory, "demo.Team", name), prototype, &mut handlers))
        .collect();

    assert_eq!(
        kinds,
        [
            Ok(DirectKind::Cord),
            Ok(DirectKind::Cord),
            Ok(DirectKind::StringPiece),
            Ok(DirectKind::StringPiece),
        ]
    );
}

#[test]
fn cord_keeps_each_buffer_as_a_chunk() {
    let factory = factory();
    let set = direct_set(&factory, "demo.Team");
    let prototype = factory.find_prototype("demo.Team").unwrap();
    let mut team = prototype.new_instance();
    let body = field(&factory, "demo.Team", "body");
    let offset = generated(prototype).offset_of(body.index()).unwrap();

    let bytes = Encoder::new().bytes(9, b"rope").finish();
    decode(&set, &mut team, &bytes, &byte_chunks()).unwrap();

    // SAFETY: `body` is stored as an inline cord.
    let cord = unsafe { &*slot::<Cord>(&team, offset) };
    assert_eq!(cord.to_vec(), b"rope");
    assert_eq!(cord.chunk_count(), 4);
    assert!(prototype.reflection().has_field(&team, &body));
}

#[test]
fn cord_restarts_on_each_occurrence() {
    let factory = factory();
    let set = direct_set(&factory, "demo.Team");
    let prototype = factory.find_prototype("demo.Team").unwrap();
    let mut team = prototype.new_instance();
    let body = field(&factory, "demo.Team", "body");

    let bytes = Encoder::new().bytes(9, b"old").bytes(9, b"new").finish();
    decode(&set, &mut team, &bytes, &DecodeLimits::new()).unwrap();

    assert_eq!(
        prototype.reflection().get(&team, &body),
        Value::Bytes(b"new".to_vec())
    );
}

#[test]
fn repeated_cords() {
    let factory = factory();
    let set = direct_set(&factory, "demo.Team");
    let prototype = factory.find_prototype("demo.Team").unwrap();
    let mut team = prototype.new_instance();
    let parts = field(&factory, "demo.Team", "parts");
    let offset = generated(prototype).offset_of(parts.index()).unwrap();

    let bytes = Encoder::new().bytes(10, b"ab").bytes(10, b"c").finish();
    decode(&set, &mut team, &bytes, &byte_chunks()).unwrap();

    // SAFETY: `parts` is stored as a `RepeatedField<Cord>`.
    let cords = unsafe { &*slot::<RepeatedField<Cord>>(&team, offset) };
    let got: Vec<_> = cords.iter().map(Cord::to_vec).collect();
    assert_eq!(got, [b"ab".to_vec(), b"c".to_vec()]);
}

#[test]
fn string_piece_is_replaced_per_buffer() {
    let factory = factory();
    let set = direct_set(&factory, "demo.Team");
    let prototype = factory.find_prototype("demo.Team").unwrap();
    let mut team = prototype.new_instance();
    let key = field(&factory, "demo.Team", "key");

    let r = prototype.reflection();
    assert_eq!(r.get(&team, &key), Value::Bytes(b"k".to_vec()));

    let bytes = Encoder::new().string(11, "piece").finish();
    decode(&set, &mut team, &bytes, &byte_chunks()).unwrap();

    assert!(r.has_field(&team, &key));
    assert_eq!(r.get(&team, &key), Value::Bytes(b"piece".to_vec()));
}

#[test]
fn repeated_string_pieces_reuse_cleared_elements() {
    let factory = factory();
    let set = direct_set(&factory, "demo.Team");
    let prototype = factory.find_prototype("demo.Team").unwrap();
    let mut team = prototype.new_instance();
    let keys = field(&factory, "demo.Team", "keys");
    let offset = generated(prototype).offset_of(keys.index()).unwrap();

    let first = Encoder::new().string(12, "a").string(12, "b").finish();
    decode(&set, &mut team, &first, &DecodeLimits::new()).unwrap();
    team.clear();
    let second = Encoder::new().string(12, "zz").finish();
    decode(&set, &mut team, &second, &byte_chunks()).unwrap();

    // SAFETY: `keys` is stored as a `RepeatedPtrField<StringPieceField>`.
    let pieces = unsafe { &*slot::<RepeatedPtrField<StringPieceField>>(&team, offset) };
    let got: Vec<_> = pieces.iter().map(StringPieceField::as_bytes).collect();
    assert_eq!(got, [b"zz".as_slice()]);
    assert_eq!(pieces.cleared_count(), 1);
}
