//! Alternative string representations selected by the `ctype` field option.

use std::ptr::NonNull;

use crate::repeated::PtrElement;

/// A rope of byte chunks. Appends never copy existing content.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Cord {
    chunks: Vec<Box<[u8]>>,
    len: usize,
}

impl Cord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.chunks.push(bytes.into());
        self.len += bytes.len();
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &[u8]> {
        self.chunks.iter().map(|c| &c[..])
    }

    /// Flatten into one contiguous buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }
}

impl std::fmt::Debug for Cord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cord({:?})", self.to_vec().escape_ascii().to_string())
    }
}

/// A string field whose contents can only be replaced wholesale.
///
/// There is no in-place append: growing it means building a new buffer and
/// calling [`copy_from`](Self::copy_from).
#[derive(Clone, PartialEq, Eq, Default)]
pub struct StringPieceField {
    data: Box<[u8]>,
}

impl StringPieceField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copy_from(&mut self, bytes: &[u8]) {
        self.data = bytes.into();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data = Box::default();
    }
}

impl std::fmt::Debug for StringPieceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "StringPieceField({:?})",
            self.data.escape_ascii().to_string()
        )
    }
}

impl PtrElement for StringPieceField {
    fn clear(&mut self) {
        StringPieceField::clear(self);
    }

    unsafe fn destroy(elem: NonNull<Self>) {
        drop(unsafe { Box::from_raw(elem.as_ptr()) });
    }
}
