use crate::test_utils::{field, person_factory};
use crate::text;
use crate::Value;

#[test]
fn empty_message_prints_nothing() {
    let factory = person_factory();
    let person = factory.find_prototype("demo.Person").unwrap().new_instance();

    assert_eq!(text::format(&person), "");
}

#[test]
fn nested_values_and_unknowns() {
    let factory = person_factory();
    let mut person = factory.find_prototype("demo.Person").unwrap().new_instance();
    let r = factory.find_prototype("demo.Person").unwrap().reflection();
    let a = factory.find_prototype("demo.Address").unwrap().reflection();

    let name = field(&factory, "demo.Person", "name");
    let tags = field(&factory, "demo.Person", "tags");
    let role = field(&factory, "demo.Person", "role");
    let address = field(&factory, "demo.Person", "address");
    let scores = field(&factory, "demo.Person", "scores");
    let friends = field(&factory, "demo.Person", "friends");
    let city = field(&factory, "demo.Address", "city");
    let zip = field(&factory, "demo.Address", "zip");

    r.set(&mut person, &name, Value::Bytes(b"Al \"A\"".to_vec()));
    r.add(&mut person, &tags, Value::Bytes(b"x".to_vec()));
    r.add(&mut person, &tags, Value::Bytes(b"y".to_vec()));
    r.set(&mut person, &role, Value::Enum(2));
    let home = r.mutable_message(&mut person, &address);
    a.set(home, &city, Value::Bytes(b"Oslo".to_vec()));
    a.set(home, &zip, Value::U32(150));
    r.add(&mut person, &scores, Value::I32(-4));
    let friend = r.add_message(&mut person, &friends);
    r.set(friend, &name, Value::Bytes(b"Bo".to_vec()));
    r.set(friend, &role, Value::Enum(9));
    person.mutable_unknown_fields().add_varint(3, 7);

    insta::assert_snapshot!(text::format(&person), @r#"
    name: "Al \"A\""
    tags: "x"
    tags: "y"
    role: USER
    address {
      city: "Oslo"
      zip: 150
    }
    scores: -4
    friends {
      name: "Bo"
      role: 9
    }
    3: 7
    "#);
}
