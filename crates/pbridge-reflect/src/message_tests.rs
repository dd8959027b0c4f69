use crate::message::HEADER_SIZE;
use crate::test_utils::{field, person_factory};
use crate::{GeneratedReflection, Message, Value};

#[test]
fn fresh_instance_holds_defaults() {
    let factory = person_factory();
    let person = factory.find_prototype("demo.Person").unwrap().new_instance();
    let r = person.reflection();

    let nick = field(&factory, "demo.Person", "nick");
    let height = field(&factory, "demo.Person", "height");
    let role = field(&factory, "demo.Person", "role");
    let address = field(&factory, "demo.Person", "address");

    assert_eq!(r.get(&person, &nick), Value::Bytes(b"anon".to_vec()));
    assert_eq!(r.get(&person, &height), Value::F64(1.75));
    assert_eq!(r.get(&person, &role), Value::Enum(1));
    assert!(!r.has_field(&person, &nick));
    assert!(r.message(&person, &address).is_none());
    assert!(!person.is_prototype());
}

#[test]
fn prototypes_link_to_submessage_prototypes() {
    let factory = person_factory();
    let person = factory.find_prototype("demo.Person").unwrap();
    let address = factory.find_prototype("demo.Address").unwrap();
    let generated = person
        .reflection()
        .as_any()
        .downcast_ref::<GeneratedReflection>()
        .unwrap();

    let index = field(&factory, "demo.Person", "address").index();
    let offset = generated.offset_of(index).unwrap();
    // SAFETY: `offset` is the singular message slot of `person`.
    let linked = unsafe { *person.as_ptr().add(offset).cast::<*const Message>() };

    assert!(person.is_prototype());
    assert_eq!(linked, address as *const Message);
}

#[test]
fn new_instance_does_not_share_prototype_links() {
    let factory = person_factory();
    let mut person = factory.find_prototype("demo.Person").unwrap().new_instance();
    let address = field(&factory, "demo.Person", "address");
    let city = field(&factory, "demo.Address", "city");

    let r = factory.find_prototype("demo.Person").unwrap().reflection();
    let prototype = factory.find_prototype("demo.Address").unwrap();

    let sub = r.mutable_message(&mut person, &address);
    assert!(!sub.is_prototype());
    prototype
        .reflection()
        .set(sub, &city, Value::Bytes(b"Oslo".to_vec()));

    assert_eq!(
        prototype.reflection().get(prototype, &city),
        Value::Bytes(Vec::new())
    );
}

#[test]
fn clear_resets_values_and_keeps_allocations() {
    let factory = person_factory();
    let mut person = factory.find_prototype("demo.Person").unwrap().new_instance();
    let r = factory.find_prototype("demo.Person").unwrap().reflection();

    let name = field(&factory, "demo.Person", "name");
    let height = field(&factory, "demo.Person", "height");
    let friends = field(&factory, "demo.Person", "friends");

    r.set(&mut person, &name, Value::Bytes(b"Al".to_vec()));
    r.set(&mut person, &height, Value::F64(2.0));
    let first = r.add_message(&mut person, &friends) as *mut Message;
    r.add_message(&mut person, &friends);
    person.mutable_unknown_fields().add_varint(3, 9);

    person.clear();

    assert!(!r.has_field(&person, &name));
    assert_eq!(r.get(&person, &name), Value::Bytes(Vec::new()));
    assert_eq!(r.get(&person, &height), Value::F64(1.75));
    assert_eq!(r.field_len(&person, &friends), 0);
    assert!(person.unknown_fields().is_empty());

    let reused = r.add_message(&mut person, &friends) as *mut Message;
    assert_eq!(reused, first);
}

#[test]
fn instance_of_checks_class_identity() {
    let factory = person_factory();
    let person = factory.find_prototype("demo.Person").unwrap().new_instance();
    let address_id = factory.pool().find_message("demo.Address").unwrap().id();

    assert!(person.is_instance_of(person.class()));
    assert!(!person.is_instance_of(factory.class(address_id)));
}

#[test]
fn nested_instances_drop_cleanly() {
    let factory = person_factory();
    let mut person = factory.find_prototype("demo.Person").unwrap().new_instance();
    let friends = field(&factory, "demo.Person", "friends");
    let address = field(&factory, "demo.Person", "address");
    let r = factory.find_prototype("demo.Person").unwrap().reflection();

    let friend = r.add_message(&mut person, &friends);
    let friend_of_friend = r.add_message(friend, &friends);
    r.mutable_message(friend_of_friend, &address);
    r.mutable_message(&mut person, &address);

    drop(person);
    drop(factory);
}

#[test]
fn instances_outlive_their_factory() {
    let factory = person_factory();
    let mut person = factory.find_prototype("demo.Person").unwrap().new_instance();
    let name = field(&factory, "demo.Person", "name");
    drop(factory);

    let class = person.class_arc();
    let r = class.reflection();
    r.set(&mut person, &name, Value::Bytes(b"kept".to_vec()));
    assert_eq!(r.get(&person, &name), Value::Bytes(b"kept".to_vec()));
}

#[test]
fn slot_addresses_span_the_whole_allocation() {
    let factory = person_factory();
    let prototype = factory.find_prototype("demo.Person").unwrap();
    let mut person = prototype.new_instance();
    let height = field(&factory, "demo.Person", "height");
    let layout = prototype.class().layout();

    assert_eq!(person.as_ptr().cast::<u8>(), person.as_mut_ptr());
    let offset = layout.slot(height.index()).unwrap().offset;
    assert!(offset >= HEADER_SIZE);
    assert!(offset + 8 <= layout.size());

    let r = prototype.reflection();
    r.set(&mut person, &height, Value::F64(1.5));
    assert_eq!(r.get(&person, &height), Value::F64(1.5));
}
