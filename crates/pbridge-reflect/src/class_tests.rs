use std::fmt::Write;

use crate::message::HEADER_SIZE;
use crate::test_utils::{person_factory, person_pool};
use crate::{ClassLayout, ReflectionKind, ScalarKind, SlotKind};

fn dump_layout(layout: &ClassLayout, names: &[&str]) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "size={} has_bits={}+{} unknown={}",
        layout.size(),
        layout.has_bits_offset(),
        layout.has_bits_len(),
        layout.unknown_fields_offset()
    )
    .unwrap();
    for (slot, name) in layout.slots().iter().zip(names) {
        match slot {
            Some(slot) => writeln!(out, "{:>4} {name}: {:?}", slot.offset, slot.kind).unwrap(),
            None => writeln!(out, "   - {name}").unwrap(),
        }
    }
    out
}

#[test]
#[cfg(target_pointer_width = "64")]
fn person_layout() {
    let pool = person_pool();
    let desc = pool.find_message("demo.Person").unwrap();
    let names: Vec<_> = desc.fields().iter().map(|f| f.name()).collect();

    let res = dump_layout(&ClassLayout::compute(desc), &names);

    insta::assert_snapshot!(res, @r"
    size=192 has_bits=24+2 unknown=32
      56 name: String
      64 tags: RepeatedString
      96 role: Scalar(Enum)
     104 address: Message
     112 scores: Repeated(I32)
     136 friends: RepeatedMessage
     168 nick: String
     176 active: Scalar(Bool)
     184 height: Scalar(F64)
       - ext
    ");
}

#[test]
fn slots_are_aligned_and_disjoint() {
    let pool = person_pool();
    for desc in pool.messages() {
        let layout = ClassLayout::compute(desc);
        let mut end = layout.unknown_fields_offset();
        for slot in layout.slots().iter().flatten() {
            assert!(slot.offset >= end, "{slot:?} overlaps previous slot");
            let align = match slot.kind {
                SlotKind::Scalar(ScalarKind::Bool) => 1,
                SlotKind::Scalar(ScalarKind::I32 | ScalarKind::Enum) => 4,
                _ => 8,
            };
            assert_eq!(slot.offset % align, 0, "{slot:?} misaligned");
            end = slot.offset + 1;
        }
        assert!(layout.size() >= end);
        assert_eq!(layout.size() % 8, 0);
    }
}

#[test]
fn has_bits_cover_every_field() {
    let pool = person_pool();
    let desc = pool.find_message("demo.Address").unwrap();
    let layout = ClassLayout::compute(desc);

    assert_eq!(layout.has_bits_offset(), HEADER_SIZE);
    assert_eq!(layout.has_bits_len(), 1);
}

#[test]
fn string_defaults_live_in_the_class() {
    let factory = person_factory();
    let person = factory.pool().find_message("demo.Person").unwrap();
    let class = factory.class(person.id());

    let nick = person.field_by_name("nick").unwrap().index();
    let name = person.field_by_name("name").unwrap().index();
    let tags = person.field_by_name("tags").unwrap().index();

    assert_eq!(class.default_string(nick).unwrap().as_slice(), b"anon");
    assert!(class.default_string(name).unwrap().is_empty());
    assert!(class.default_string(tags).is_none());
}

#[test]
fn reflection_flavour_follows_options() {
    let factory = crate::test_utils::opaque_person_factory();
    let pool = factory.pool();

    let person = factory.class(pool.find_message("demo.Person").unwrap().id());
    let address = factory.class(pool.find_message("demo.Address").unwrap().id());

    let is_generated =
        |r: &dyn crate::Reflection| r.as_any().is::<crate::GeneratedReflection>();
    assert!(!is_generated(person.reflection()));
    assert!(is_generated(address.reflection()));

    let options = crate::FactoryOptions::new().reflection(ReflectionKind::Opaque);
    assert_eq!(options.reflection_for("demo.Address"), ReflectionKind::Opaque);
}
