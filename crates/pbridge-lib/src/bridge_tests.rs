use std::sync::Arc;

use pbridge_decoder::{DecodeError, DecodeLimits, Encoder};
use pbridge_reflect::{Message, MessageFactory, Value, text};

use crate::test_utils::{byte_chunks, factory, field, opaque_person_factory};
use crate::{Abstain, DirectKind, Error, FieldPlan, WriteHandlers, new_write_handlers};

fn unknowns(msg: &Message) -> Vec<(u32, u64)> {
    msg.unknown_fields().iter().map(|u| (u.number, u.value)).collect()
}

fn person_bytes() -> Vec<u8> {
    Encoder::new()
        .string(1, "Al")
        .string(2, "a")
        .string(2, "b")
        .int32(3, 3)
        .finish()
}

#[test]
fn person_with_undeclared_role() {
    let factory = factory();
    let prototype = factory.find_prototype("demo.Person").unwrap();
    let handlers = new_write_handlers(prototype).unwrap();
    let mut person = prototype.new_instance();

    handlers
        .decode_into(&person_bytes(), &mut person, &DecodeLimits::new())
        .unwrap();

    let r = prototype.reflection();
    let name = field(&factory, "demo.Person", "name");
    let tags = field(&factory, "demo.Person", "tags");
    let role = field(&factory, "demo.Person", "role");
    assert_eq!(r.get(&person, &name), Value::Bytes(b"Al".to_vec()));
    assert_eq!(r.field_len(&person, &tags), 2);
    assert_eq!(r.get_repeated(&person, &tags, 0), Value::Bytes(b"a".to_vec()));
    assert_eq!(r.get_repeated(&person, &tags, 1), Value::Bytes(b"b".to_vec()));
    assert!(!r.has_field(&person, &role));
    assert_eq!(unknowns(&person), [(3, 3)]);
}

#[test]
fn person_plan() {
    let factory = factory();
    let handlers = new_write_handlers(factory.find_prototype("demo.Person").unwrap()).unwrap();

    insta::assert_snapshot!(handlers.to_string(), @r"
    demo.Person (9/10 direct)
      name: string
      tags: string
      role: enum
      address: submessage
      scores: primitive
      friends: submessage
      nick: string
      active: primitive
      height: primitive
      ext: skipped
    demo.Address (2/2 direct)
      city: string
      zip: primitive
    ");
}

#[test]
fn opaque_class_falls_back_per_field() {
    let factory = opaque_person_factory();
    let handlers = new_write_handlers(factory.find_prototype("demo.Person").unwrap()).unwrap();

    let person = handlers.plan("demo.Person").unwrap();
    assert_eq!(person.direct_count(), 0);
    assert_eq!(
        person.field("name"),
        Some(FieldPlan::Fallback(Abstain::IncompatibleLayout))
    );
    assert_eq!(person.field("ext"), Some(FieldPlan::Skipped));
    assert_eq!(
        handlers.plan("demo.Address").unwrap().field("city"),
        Some(FieldPlan::Direct(DirectKind::String))
    );
}

#[test]
fn fallback_submessages_outlive_the_factory() {
    let (handlers, mut person) = {
        let factory = opaque_person_factory();
        let prototype = factory.find_prototype("demo.Person").unwrap();
        (new_write_handlers(prototype).unwrap(), prototype.new_instance())
    };
    assert_eq!(
        handlers.plan("demo.Person").unwrap().field("address"),
        Some(FieldPlan::Fallback(Abstain::IncompatibleLayout))
    );

    let bytes = Encoder::new().message(4, |a| a.string(1, "Oslo")).finish();
    handlers
        .decode_into(&bytes, &mut person, &DecodeLimits::new())
        .unwrap();

    insta::assert_snapshot!(text::format(&person), @r#"
    address {
      city: "Oslo"
    }
    "#);
}

#[test]
fn fallback_and_direct_decode_alike() {
    let bytes = Encoder::new()
        .string(1, "Al")
        .string(2, "a")
        .int32(3, 2)
        .message(4, |a| a.string(1, "Oslo").int32(2, 150))
        .packed_varints(5, &[1, 6])
        .sint32(5, -7)
        .message(6, |f| f.string(1, "Bo").int32(3, 9))
        .message(6, |f| f.bool(8, true))
        .string(7, "nick")
        .bool(8, true)
        .double(9, 2.5)
        .int32(100, 1)
        .finish();

    let render = |factory: Arc<MessageFactory>| {
        let prototype = factory.find_prototype("demo.Person").unwrap();
        let handlers = new_write_handlers(prototype).unwrap();
        let mut person = prototype.new_instance();
        handlers.decode_into(&bytes, &mut person, &byte_chunks()).unwrap();
        text::format(&person)
    };

    let direct = render(factory());
    let fallback = render(opaque_person_factory());

    assert_eq!(direct, fallback);
    insta::assert_snapshot!(direct, @r#"
    name: "Al"
    tags: "a"
    role: USER
    address {
      city: "Oslo"
      zip: 150
    }
    scores: -1
    scores: 3
    scores: -7
    friends {
      name: "Bo"
      3: 9
    }
    friends {
      active: true
    }
    nick: "nick"
    active: true
    height: 2.5
    "#);
}

#[test]
fn lazy_submessage_decodes_through_reflection() {
    let factory = factory();
    let prototype = factory.find_prototype("demo.Team").unwrap();
    let handlers = new_write_handlers(prototype).unwrap();
    let mut team = prototype.new_instance();

    assert_eq!(
        handlers.plan("demo.Team").unwrap().field("archive"),
        Some(FieldPlan::Fallback(Abstain::LazySubMessage))
    );

    let bytes = Encoder::new()
        .message(8, |a| a.string(1, "Old").int32(2, 1))
        .int64(4, -5)
        .finish();
    handlers
        .decode_into(&bytes, &mut team, &DecodeLimits::new())
        .unwrap();

    insta::assert_snapshot!(text::format(&team), @r#"
    budget: -5
    archive {
      city: "Old"
      zip: 1
    }
    "#);
}

#[test]
fn malformed_input_is_reported() {
    let factory = factory();
    let prototype = factory.find_prototype("demo.Person").unwrap();
    let handlers = new_write_handlers(prototype).unwrap();
    let mut person = prototype.new_instance();

    let mut bytes = Encoder::new().string(1, "Alphonse").finish();
    bytes.truncate(4);
    let err = handlers
        .decode_into(&bytes, &mut person, &DecodeLimits::new())
        .unwrap_err();

    assert!(matches!(err, Error::Decode(DecodeError::Truncated { .. })));
}

#[test]
#[should_panic(expected = "handlers for `demo.Person` cannot write a `demo.Address`")]
fn decoding_into_another_class_panics() {
    let factory = factory();
    let handlers = new_write_handlers(factory.find_prototype("demo.Person").unwrap()).unwrap();
    let mut address = factory.find_prototype("demo.Address").unwrap().new_instance();

    let _ = handlers.decode_into(&person_bytes(), &mut address, &DecodeLimits::new());
}

#[test]
fn handlers_are_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<WriteHandlers>();

    let factory = factory();
    let prototype = factory.find_prototype("demo.Person").unwrap();
    let handlers = new_write_handlers(prototype).unwrap();
    let bytes = person_bytes();

    let rendered: Vec<String> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    let mut person = prototype.new_instance();
                    handlers
                        .decode_into(&bytes, &mut person, &DecodeLimits::new())
                        .unwrap();
                    text::format(&person)
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert!(rendered.windows(2).all(|w| w[0] == w[1]));
    assert!(rendered[0].contains("3: 3"));
}
