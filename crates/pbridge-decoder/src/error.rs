/// Errors from decoding.
///
/// Offsets are byte positions in the top-level input.
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unexpected end of input at byte {offset}")]
    Truncated { offset: usize },

    #[error("malformed varint at byte {offset}")]
    MalformedVarint { offset: usize },

    #[error("invalid wire type {wire_type} at byte {offset}")]
    InvalidWireType { wire_type: u8, offset: usize },

    #[error("invalid field number {number} at byte {offset}")]
    InvalidFieldNumber { number: u64, offset: usize },

    #[error("nesting deeper than {limit} levels")]
    DepthLimitExceeded { limit: u32 },

    #[error("decoding stopped by a handler of `{field}`")]
    Stopped { field: String },

    #[error("group {number} is not terminated")]
    UnterminatedGroup { number: u32 },

    #[error("unexpected end of group {number} at byte {offset}")]
    UnexpectedEndGroup { number: u32, offset: usize },
}
