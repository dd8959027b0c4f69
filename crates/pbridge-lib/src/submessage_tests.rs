use std::ptr;

use pbridge_decoder::{DecodeLimits, Encoder};
use pbridge_reflect::{Message, Value, text};

use crate::test_utils::{decode, direct_set, factory, field, generated};
use crate::{FieldOffset, get_field_prototype};

#[test]
fn field_prototype_comes_from_the_factory() {
    let factory = factory();
    let person = factory.find_prototype("demo.Person").unwrap();
    let address = field(&factory, "demo.Person", "address");
    let name = field(&factory, "demo.Person", "name");

    let found = get_field_prototype(&address, person).unwrap();

    assert!(ptr::eq(found.get(), factory.find_prototype("demo.Address").unwrap()));
    assert!(get_field_prototype(&name, person).is_none());
    insta::assert_snapshot!(format!("{found:?}"), @r#"PrototypeRef("demo.Address")"#);
}

#[test]
fn first_start_allocates_second_reuses() {
    let factory = factory();
    let set = direct_set(&factory, "demo.Person");
    let prototype = factory.find_prototype("demo.Person").unwrap();
    let mut person = prototype.new_instance();
    let address = field(&factory, "demo.Person", "address");
    let r = prototype.reflection();

    let first = Encoder::new()
        .message(4, |m| m.string(1, "Oslo").int32(2, 150))
        .finish();
    decode(&set, &mut person, &first, &DecodeLimits::new()).unwrap();
    let allocated = r.message(&person, &address).unwrap() as *const Message;

    let second = Encoder::new().message(4, |m| m.string(1, "Bergen")).finish();
    decode(&set, &mut person, &second, &DecodeLimits::new()).unwrap();
    let reused = r.message(&person, &address).unwrap();

    assert!(ptr::eq(reused, allocated));
    assert!(!reused.is_prototype());
    insta::assert_snapshot!(text::format(&person), @r#"
    address {
      city: "Bergen"
      zip: 150
    }
    "#);
}

#[test]
fn slot_holding_the_prototype_gets_a_fresh_instance() {
    let factory = factory();
    let set = direct_set(&factory, "demo.Person");
    let prototype = factory.find_prototype("demo.Person").unwrap();
    let address_proto = factory.find_prototype("demo.Address").unwrap();
    let mut person = prototype.new_instance();
    let address = field(&factory, "demo.Person", "address");
    let city = field(&factory, "demo.Address", "city");

    let handle = FieldOffset::new(&address, generated(prototype));
    // SAFETY: `address` is a submessage slot; prototypes are never freed
    // through an instance.
    unsafe {
        handle
            .field_ptr::<*const Message>(&mut person)
            .write(address_proto as *const Message)
    };

    let bytes = Encoder::new().message(4, |m| m.string(1, "Oslo")).finish();
    decode(&set, &mut person, &bytes, &DecodeLimits::new()).unwrap();

    let sub = prototype.reflection().message(&person, &address).unwrap();
    assert!(!ptr::eq(sub, address_proto));
    assert_eq!(
        address_proto.reflection().get(address_proto, &city),
        Value::Bytes(Vec::new())
    );
    assert_eq!(
        address_proto.reflection().get(sub, &city),
        Value::Bytes(b"Oslo".to_vec())
    );
}

#[test]
fn repeated_submessages_reuse_cleared_elements() {
    let factory = factory();
    let set = direct_set(&factory, "demo.Person");
    let prototype = factory.find_prototype("demo.Person").unwrap();
    let mut person = prototype.new_instance();
    let friends = field(&factory, "demo.Person", "friends");
    let r = prototype.reflection();

    let bytes = Encoder::new()
        .message(6, |f| f.string(1, "Bo").message(6, |ff| ff.string(1, "Cy")))
        .message(6, |f| f.string(1, "Di"))
        .finish();
    decode(&set, &mut person, &bytes, &DecodeLimits::new()).unwrap();
    assert_eq!(r.field_len(&person, &friends), 2);
    let first = r.repeated_message(&person, &friends, 0) as *const Message;

    person.clear();
    let again = Encoder::new().message(6, |f| f.string(1, "Ed")).finish();
    decode(&set, &mut person, &again, &DecodeLimits::new()).unwrap();

    assert_eq!(r.field_len(&person, &friends), 1);
    assert!(ptr::eq(r.repeated_message(&person, &friends, 0), first));
    insta::assert_snapshot!(text::format(&person), @r#"
    friends {
      name: "Ed"
    }
    "#);
}

#[test]
fn nested_repeated_submessages() {
    let factory = factory();
    let set = direct_set(&factory, "demo.Team");
    let prototype = factory.find_prototype("demo.Team").unwrap();
    let mut team = prototype.new_instance();

    let bytes = Encoder::new()
        .message(2, |lead| lead.string(1, "Al").bool(8, true))
        .message(3, |m| m.string(1, "Bo").message(4, |a| a.int32(2, 7)))
        .message(3, |m| m.sint32(5, -3).sint32(5, 4))
        .finish();
    decode(&set, &mut team, &bytes, &DecodeLimits::new()).unwrap();

    insta::assert_snapshot!(text::format(&team), @r#"
    lead {
      name: "Al"
      active: true
    }
    members {
      name: "Bo"
      address {
        zip: 7
      }
    }
    members {
      scores: -3
      scores: 4
    }
    "#);
}

#[test]
fn group_fields_decode_as_submessages() {
    let factory = factory();
    let set = direct_set(&factory, "demo.Team");
    let prototype = factory.find_prototype("demo.Team").unwrap();
    let mut team = prototype.new_instance();
    let office = field(&factory, "demo.Team", "office");

    let bytes = Encoder::new()
        .group(13, |g| g.string(1, "HQ"))
        .int64(4, 10)
        .finish();
    decode(&set, &mut team, &bytes, &DecodeLimits::new()).unwrap();

    assert!(prototype.reflection().has_field(&team, &office));
    insta::assert_snapshot!(text::format(&team), @r#"
    budget: 10
    office {
      city: "HQ"
    }
    "#);
}
