use indexmap::IndexMap;

use crate::{
    BINARY_HEADER_SIZE, BINARY_MAGIC, DefaultValue, DescriptorPool, MessageDescriptor, MessageId,
    PoolError, TypeRef,
};

const POOL: &str = r#"{
    "package": "t",
    "messages": [
        { "name": "Outer", "fields": [
            { "name": "inner", "number": 1, "type": "message", "type_name": "Inner" },
            { "name": "kind", "number": 2, "type": "enum", "type_name": "Kind", "default": "B" }
        ] },
        { "name": "Inner", "fields": [
            { "name": "x", "number": 1, "type": "double", "default": 1.5 }
        ] }
    ],
    "enums": [ { "name": "Kind", "values": [ { "name": "A", "number": 0 }, { "name": "B", "number": 1 } ] } ]
}"#;

#[test]
fn roundtrip() {
    let pool = DescriptorPool::from_json(POOL).unwrap();
    let binary = pool.to_binary();
    let decoded = DescriptorPool::from_binary(&binary).unwrap();

    assert_eq!(pool, decoded);
    assert!(decoded.find_message("t.Inner").is_some());
}

#[test]
fn roundtrip_preserves_order() {
    let pool = DescriptorPool::from_json(POOL).unwrap();
    let decoded = DescriptorPool::from_binary(&pool.to_binary()).unwrap();

    let names: Vec<_> = decoded.messages().iter().map(|m| m.full_name()).collect();
    assert_eq!(names, ["t.Outer", "t.Inner"]);
}

#[test]
fn header_layout() {
    let pool = DescriptorPool::from_json(POOL).unwrap();
    let binary = pool.to_binary();

    assert_eq!(binary[0..4], BINARY_MAGIC);
    let len = u32::from_le_bytes(binary[12..16].try_into().unwrap()) as usize;
    assert_eq!(binary.len(), BINARY_HEADER_SIZE + len);
}

#[test]
fn rejects_bad_magic() {
    let mut binary = DescriptorPool::from_json(POOL).unwrap().to_binary();
    binary[0] = b'X';

    let err = DescriptorPool::from_binary(&binary).unwrap_err();
    assert!(matches!(err, PoolError::InvalidMagic));
}

#[test]
fn rejects_unknown_version() {
    let mut binary = DescriptorPool::from_json(POOL).unwrap().to_binary();
    binary[4..8].copy_from_slice(&9u32.to_le_bytes());

    let err = DescriptorPool::from_binary(&binary).unwrap_err();
    assert_eq!(err.to_string(), "unsupported version: 9 (expected 1)");
}

#[test]
fn rejects_corrupted_payload() {
    let mut binary = DescriptorPool::from_json(POOL).unwrap().to_binary();
    let last = binary.len() - 1;
    binary[last] ^= 0xff;

    let err = DescriptorPool::from_binary(&binary).unwrap_err();
    assert!(matches!(err, PoolError::ChecksumMismatch { .. }));
}

#[test]
fn rejects_truncated_input() {
    let binary = DescriptorPool::from_json(POOL).unwrap().to_binary();

    let err = DescriptorPool::from_binary(&binary[..10]).unwrap_err();
    assert!(matches!(
        err,
        PoolError::Truncated {
            expected: 16,
            actual: 10
        }
    ));

    let err = DescriptorPool::from_binary(&binary[..binary.len() - 1]).unwrap_err();
    assert!(matches!(err, PoolError::Truncated { .. }));
}

/// Re-encode `pool` after `edit` has tampered with a copy of its messages.
fn tampered(pool: &DescriptorPool, edit: impl FnOnce(&mut Vec<MessageDescriptor>)) -> Vec<u8> {
    let mut messages = pool.messages().to_vec();
    edit(&mut messages);
    let mut names = IndexMap::new();
    for m in &messages {
        names.insert(m.full_name().to_owned(), TypeRef::Message(m.id()));
    }
    for e in pool.enums() {
        names.insert(e.full_name().to_owned(), TypeRef::Enum(e.id()));
    }
    DescriptorPool::new(messages, pool.enums().to_vec(), names).to_binary()
}

#[test]
fn rejects_dangling_type_reference() {
    let pool = DescriptorPool::from_json(POOL).unwrap();
    let binary = tampered(&pool, |messages| {
        messages[0].fields[0].type_ref = Some(TypeRef::Message(MessageId(99)));
    });

    let err = DescriptorPool::from_binary(&binary).unwrap_err();
    assert!(matches!(err, PoolError::UnresolvedType { .. }));
    insta::assert_snapshot!(err.to_string(), @"`t.Outer.inner`: unknown type `message #99`");
}

#[test]
fn rejects_stale_number_index() {
    let pool = DescriptorPool::from_json(POOL).unwrap();
    let binary = tampered(&pool, |messages| {
        messages[0].by_number.pop();
    });

    let err = DescriptorPool::from_binary(&binary).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"inconsistent pool: number index of `t.Outer` does not match its fields"
    );
}

#[test]
fn rejects_default_of_the_wrong_kind() {
    let pool = DescriptorPool::from_json(POOL).unwrap();
    let binary = tampered(&pool, |messages| {
        messages[1].fields[0].default = Some(DefaultValue::Bool(true));
    });

    let err = DescriptorPool::from_binary(&binary).unwrap_err();
    assert!(matches!(err, PoolError::InvalidDefault { .. }));
}
