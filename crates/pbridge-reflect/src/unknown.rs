//! Storage for wire data that did not land in a declared field.

/// One unknown varint entry, keyed by wire number.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct UnknownField {
    pub number: u32,
    pub value: u64,
}

/// Per-message list of unknown entries, in arrival order.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct UnknownFieldSet {
    fields: Vec<UnknownField>,
}

impl UnknownFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a varint. Negative `i32` enum values arrive sign-extended, as on the wire.
    pub fn add_varint(&mut self, number: u32, value: u64) {
        self.fields.push(UnknownField { number, value });
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UnknownField> {
        self.fields.iter()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }
}

impl<'a> IntoIterator for &'a UnknownFieldSet {
    type Item = &'a UnknownField;
    type IntoIter = std::slice::Iter<'a, UnknownField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
