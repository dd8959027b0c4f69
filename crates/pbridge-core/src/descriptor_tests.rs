use crate::{CType, DescriptorPool, FieldOptions, FieldType, MessageId, StorageKind, WireType};

#[test]
fn storage_kind_collapses_wire_variants() {
    assert_eq!(FieldType::SInt32.storage_kind(), StorageKind::Int32);
    assert_eq!(FieldType::SFixed64.storage_kind(), StorageKind::Int64);
    assert_eq!(FieldType::Fixed32.storage_kind(), StorageKind::UInt32);
    assert_eq!(FieldType::Bytes.storage_kind(), StorageKind::String);
    assert_eq!(FieldType::Group.storage_kind(), StorageKind::Message);
}

#[test]
fn wire_types() {
    assert_eq!(FieldType::Double.wire_type(), WireType::Fixed64);
    assert_eq!(FieldType::Float.wire_type(), WireType::Fixed32);
    assert_eq!(FieldType::Enum.wire_type(), WireType::Varint);
    assert_eq!(FieldType::Bytes.wire_type(), WireType::LengthDelimited);
    assert_eq!(FieldType::Group.wire_type(), WireType::StartGroup);

    assert!(FieldType::SInt64.is_packable());
    assert!(!FieldType::String.is_packable());
    assert_eq!(WireType::from_u8(5), Some(WireType::Fixed32));
    assert_eq!(WireType::from_u8(6), None);
}

#[test]
fn ctype_defaults_to_string() {
    assert_eq!(FieldOptions::default().effective_ctype(), CType::String);
}

#[test]
fn field_lookup_by_number_ignores_declaration_order() {
    let json = r#"{ "messages": [ { "name": "M", "fields": [
        { "name": "c", "number": 30, "type": "bool" },
        { "name": "a", "number": 1, "type": "bool" },
        { "name": "b", "number": 7, "type": "bool" }
    ] } ] }"#;

    let pool = DescriptorPool::from_json(json).unwrap();
    let msg = pool.message(MessageId(0));

    assert_eq!(msg.field_by_number(7).unwrap().name(), "b");
    assert_eq!(msg.field_by_number(30).unwrap().index(), 0);
    assert!(msg.field_by_number(2).is_none());
}

#[test]
fn reachable_messages_handles_cycles_and_skips_extensions() {
    let json = r#"{ "messages": [
        { "name": "Node", "fields": [
            { "name": "next", "number": 1, "type": "message", "type_name": "Node" },
            { "name": "leaf", "number": 2, "type": "message", "type_name": "Leaf", "label": "repeated" },
            { "name": "ext", "number": 100, "type": "message", "type_name": "Ext", "extension": true }
        ] },
        { "name": "Leaf" },
        { "name": "Ext" }
    ] }"#;

    let pool = DescriptorPool::from_json(json).unwrap();
    let reachable = pool.reachable_messages(MessageId(0));

    assert_eq!(reachable, [MessageId(0), MessageId(1)]);
}

#[test]
fn enum_default_number_is_first_value() {
    let json = r#"{ "enums": [ { "name": "E", "values": [
        { "name": "X", "number": 4 },
        { "name": "Y", "number": 0 }
    ] } ] }"#;

    let pool = DescriptorPool::from_json(json).unwrap();
    let e = pool.find_enum("E").unwrap();

    assert_eq!(e.default_number(), 4);
    assert!(e.find_value_by_number(0).is_some());
    assert!(e.find_value_by_number(5).is_none());
    assert!(pool.find_message("E").is_none());
}
