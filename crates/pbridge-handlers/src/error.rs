use pbridge_core::{FieldType, MessageId};

use crate::field::HandlerRole;
use crate::value::ValueType;

/// Errors from installing handlers.
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum HandlersError {
    #[error("field `{field}` does not belong to message {}", .message.0)]
    FieldNotInMessage { field: String, message: MessageId },

    #[error("field `{field}` ({kind}): {role} handler not allowed: {reason}", kind = .field_type.name())]
    InvalidRole {
        field: String,
        field_type: FieldType,
        role: HandlerRole,
        reason: &'static str,
    },

    #[error("field `{field}`: value handler takes {actual:?}, field decodes as {expected:?}")]
    ValueTypeMismatch {
        field: String,
        expected: ValueType,
        actual: ValueType,
    },

    #[error("field `{field}` already has handlers")]
    AlreadyInstalled { field: String },
}
