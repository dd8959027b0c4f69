//! Typed value callbacks.

use pbridge_core::StorageKind;

use crate::sink::Sink;

/// In-memory type delivered to a value callback.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ValueType {
    I32,
    I64,
    U32,
    U64,
    F32,
    F64,
    Bool,
}

impl ValueType {
    /// The value type decoded for fields of `kind`. Enums arrive as `I32`.
    pub fn of(kind: StorageKind) -> Option<Self> {
        Some(match kind {
            StorageKind::Int32 | StorageKind::Enum => Self::I32,
            StorageKind::Int64 => Self::I64,
            StorageKind::UInt32 => Self::U32,
            StorageKind::UInt64 => Self::U64,
            StorageKind::Float => Self::F32,
            StorageKind::Double => Self::F64,
            StorageKind::Bool => Self::Bool,
            StorageKind::String | StorageKind::Message => return None,
        })
    }
}

/// Boxed callback for one decoded value. Returning `false` stops the decode.
pub enum ValueHandler {
    I32(Box<dyn Fn(Sink, i32) -> bool + Send + Sync>),
    I64(Box<dyn Fn(Sink, i64) -> bool + Send + Sync>),
    U32(Box<dyn Fn(Sink, u32) -> bool + Send + Sync>),
    U64(Box<dyn Fn(Sink, u64) -> bool + Send + Sync>),
    F32(Box<dyn Fn(Sink, f32) -> bool + Send + Sync>),
    F64(Box<dyn Fn(Sink, f64) -> bool + Send + Sync>),
    Bool(Box<dyn Fn(Sink, bool) -> bool + Send + Sync>),
}

impl ValueHandler {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::I32(_) => ValueType::I32,
            Self::I64(_) => ValueType::I64,
            Self::U32(_) => ValueType::U32,
            Self::U64(_) => ValueType::U64,
            Self::F32(_) => ValueType::F32,
            Self::F64(_) => ValueType::F64,
            Self::Bool(_) => ValueType::Bool,
        }
    }
}

impl std::fmt::Debug for ValueHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ValueHandler::{:?}", self.value_type())
    }
}

/// Rust types a value callback can take.
pub trait HandlerValue: Copy + Send + Sync + 'static {
    const TYPE: ValueType;

    fn into_handler(f: Box<dyn Fn(Sink, Self) -> bool + Send + Sync>) -> ValueHandler;
}

macro_rules! handler_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl HandlerValue for $ty {
                const TYPE: ValueType = ValueType::$variant;

                fn into_handler(f: Box<dyn Fn(Sink, Self) -> bool + Send + Sync>) -> ValueHandler {
                    ValueHandler::$variant(f)
                }
            }
        )*
    };
}

handler_value! {
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
}
