//! Errors raised while loading or resolving a descriptor pool.

use crate::binary::BINARY_VERSION;

/// Error during descriptor pool loading.
#[derive(Debug)]
pub enum PoolError {
    Json(serde_json::Error),
    Binary(postcard::Error),
    /// Binary input does not start with `PBDP`.
    InvalidMagic,
    UnsupportedVersion(u32),
    ChecksumMismatch {
        expected: u32,
        actual: u32,
    },
    /// Binary input shorter than its header claims.
    Truncated {
        expected: usize,
        actual: usize,
    },
    DuplicateName(String),
    DuplicateFieldNumber {
        message: String,
        number: u32,
    },
    InvalidFieldNumber {
        message: String,
        field: String,
        number: u32,
    },
    UnresolvedType {
        message: String,
        field: String,
        type_name: String,
    },
    /// `type_name` resolves, but to a message where an enum is required or vice versa.
    TypeKindMismatch {
        message: String,
        field: String,
        type_name: String,
    },
    InvalidDefault {
        message: String,
        field: String,
        reason: String,
    },
    EmptyEnum(String),
    /// A binary pool whose ids or indices contradict each other.
    Inconsistent(String),
}

impl std::fmt::Display for PoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Binary(e) => write!(f, "binary decode error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic: expected PBDP"),
            Self::UnsupportedVersion(v) => {
                write!(f, "unsupported version: {v} (expected {BINARY_VERSION})")
            }
            Self::ChecksumMismatch { expected, actual } => write!(
                f,
                "checksum mismatch: header says {expected:#010x}, payload hashes to {actual:#010x}"
            ),
            Self::Truncated { expected, actual } => {
                write!(f, "truncated input: expected {expected} bytes, got {actual}")
            }
            Self::DuplicateName(name) => write!(f, "duplicate type name `{name}`"),
            Self::DuplicateFieldNumber { message, number } => {
                write!(f, "`{message}`: field number {number} used twice")
            }
            Self::InvalidFieldNumber {
                message,
                field,
                number,
            } => write!(f, "`{message}.{field}`: invalid field number {number}"),
            Self::UnresolvedType {
                message,
                field,
                type_name,
            } => write!(f, "`{message}.{field}`: unknown type `{type_name}`"),
            Self::TypeKindMismatch {
                message,
                field,
                type_name,
            } => write!(
                f,
                "`{message}.{field}`: `{type_name}` is not the kind of type the field declares"
            ),
            Self::InvalidDefault {
                message,
                field,
                reason,
            } => write!(f, "`{message}.{field}`: invalid default: {reason}"),
            Self::EmptyEnum(name) => write!(f, "enum `{name}` declares no values"),
            Self::Inconsistent(reason) => write!(f, "inconsistent pool: {reason}"),
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::Binary(e) => Some(e),
            _ => None,
        }
    }
}
