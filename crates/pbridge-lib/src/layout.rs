//! Physical facts about a field, read from generated reflection.
//!
//! Callers must have confirmed that the class's reflection is a
//! [`GeneratedReflection`] and that the field has storage.

use pbridge_core::FieldDescriptor;
use pbridge_reflect::GeneratedReflection;

/// Byte offset of the field's slot from the start of an instance.
pub fn compute_offset(field: &FieldDescriptor, reflection: &GeneratedReflection) -> usize {
    reflection.offset_of(field.index()).unwrap_or_else(|| {
        panic!(
            "compute_offset: field `{}` has no storage in this class",
            field.name()
        )
    })
}

/// Bit position of the field's presence flag, counted from the start of an
/// instance: byte `hasbit / 8`, mask `1 << (hasbit % 8)`.
pub fn compute_hasbit(field: &FieldDescriptor, reflection: &GeneratedReflection) -> u64 {
    assert!(
        !field.is_repeated(),
        "compute_hasbit: repeated field `{}` has no presence bit",
        field.name()
    );
    reflection.has_bits_offset() as u64 * 8 + field.index() as u64
}
