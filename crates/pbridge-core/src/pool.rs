//! The resolved, ID-indexed descriptor pool.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::MAX_FIELD_NUMBER;
use crate::descriptor::{
    DefaultValue, EnumDescriptor, EnumId, FieldDescriptor, FieldType, Label, MessageDescriptor,
    MessageId, StorageKind, TypeRef,
};
use crate::error::PoolError;

/// All message and enum types of one schema, with every reference resolved.
///
/// Messages and enums are addressed by dense ids; `names` maps fully
/// qualified names to ids in declaration order.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct DescriptorPool {
    messages: Vec<MessageDescriptor>,
    enums: Vec<EnumDescriptor>,
    names: IndexMap<String, TypeRef>,
}

impl DescriptorPool {
    pub(crate) fn new(
        messages: Vec<MessageDescriptor>,
        enums: Vec<EnumDescriptor>,
        names: IndexMap<String, TypeRef>,
    ) -> Self {
        Self {
            messages,
            enums,
            names,
        }
    }

    pub fn messages(&self) -> &[MessageDescriptor] {
        &self.messages
    }

    pub fn enums(&self) -> &[EnumDescriptor] {
        &self.enums
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Panics if `id` does not belong to this pool.
    pub fn message(&self, id: MessageId) -> &MessageDescriptor {
        self.ensure_message(id)
    }

    /// Panics if `id` does not belong to this pool.
    pub fn enum_type(&self, id: EnumId) -> &EnumDescriptor {
        self.ensure_enum(id)
    }

    pub fn get_message(&self, id: MessageId) -> Option<&MessageDescriptor> {
        self.messages.get(id.index())
    }

    pub fn find_message(&self, full_name: &str) -> Option<&MessageDescriptor> {
        match self.names.get(full_name.strip_prefix('.').unwrap_or(full_name))? {
            TypeRef::Message(id) => Some(&self.messages[id.index()]),
            TypeRef::Enum(_) => None,
        }
    }

    pub fn find_enum(&self, full_name: &str) -> Option<&EnumDescriptor> {
        match self.names.get(full_name.strip_prefix('.').unwrap_or(full_name))? {
            TypeRef::Enum(id) => Some(&self.enums[id.index()]),
            TypeRef::Message(_) => None,
        }
    }

    /// Message types reachable from `root` through message fields, `root` first.
    ///
    /// Extension fields are not followed.
    pub fn reachable_messages(&self, root: MessageId) -> Vec<MessageId> {
        let mut seen = vec![false; self.messages.len()];
        let mut order = Vec::new();
        let mut stack = vec![root];
        seen[root.index()] = true;

        while let Some(id) = stack.pop() {
            order.push(id);
            for field in self.message(id).fields() {
                if field.is_extension() {
                    continue;
                }
                if let Some(sub) = field.message_type()
                    && !seen[sub.index()]
                {
                    seen[sub.index()] = true;
                    stack.push(sub);
                }
            }
        }

        order
    }
}

/// Consistency checks for pools that did not come through resolution.
impl DescriptorPool {
    /// Check every id, index and type reference against the pool itself.
    ///
    /// Resolution establishes all of this; a pool read back from its binary
    /// form only has the checksum to vouch for it.
    pub(crate) fn validate(&self) -> Result<(), PoolError> {
        for (i, en) in self.enums.iter().enumerate() {
            if en.id.index() != i {
                return Err(corrupt(format!("enum `{}` stored under id {i}", en.full_name)));
            }
            if en.values.is_empty() {
                return Err(PoolError::EmptyEnum(en.full_name.clone()));
            }
        }

        for (i, msg) in self.messages.iter().enumerate() {
            if msg.id.index() != i {
                return Err(corrupt(format!("message `{}` stored under id {i}", msg.full_name)));
            }
            self.validate_message(msg)?;
        }

        if self.names.len() != self.messages.len() + self.enums.len() {
            return Err(corrupt("name index does not cover every type".into()));
        }
        for (name, type_ref) in &self.names {
            let declared = match *type_ref {
                TypeRef::Message(id) => self.get_message(id).map(|m| m.full_name()),
                TypeRef::Enum(id) => self.enums.get(id.index()).map(|e| e.full_name()),
            };
            if declared != Some(name.as_str()) {
                return Err(corrupt(format!("name `{name}` points at another type")));
            }
        }

        Ok(())
    }

    fn validate_message(&self, msg: &MessageDescriptor) -> Result<(), PoolError> {
        let mut numbers = Vec::with_capacity(msg.fields.len());
        for (index, field) in msg.fields.iter().enumerate() {
            if field.index() != index || field.containing_type != msg.id {
                return Err(corrupt(format!(
                    "field `{}.{}` is filed under the wrong message or index",
                    msg.full_name, field.name
                )));
            }
            if field.number == 0 || field.number > MAX_FIELD_NUMBER {
                return Err(PoolError::InvalidFieldNumber {
                    message: msg.full_name.clone(),
                    field: field.name.clone(),
                    number: field.number,
                });
            }
            numbers.push((field.number, field.index));
            self.validate_type_ref(msg, field)?;
            self.validate_default(msg, field)?;
        }

        numbers.sort_unstable();
        if let Some(pair) = numbers.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(PoolError::DuplicateFieldNumber {
                message: msg.full_name.clone(),
                number: pair[0].0,
            });
        }
        if numbers != msg.by_number {
            return Err(corrupt(format!(
                "number index of `{}` does not match its fields",
                msg.full_name
            )));
        }
        Ok(())
    }

    fn validate_type_ref(
        &self,
        msg: &MessageDescriptor,
        field: &FieldDescriptor,
    ) -> Result<(), PoolError> {
        let unresolved = |type_name: String| PoolError::UnresolvedType {
            message: msg.full_name.clone(),
            field: field.name.clone(),
            type_name,
        };

        let target = match field.type_ref {
            None if field.field_type.needs_type_name() => return Err(unresolved(String::new())),
            None => return Ok(()),
            Some(TypeRef::Message(id)) => self
                .get_message(id)
                .map(|m| m.full_name())
                .ok_or_else(|| unresolved(format!("message #{}", id.0)))?,
            Some(TypeRef::Enum(id)) => self
                .enums
                .get(id.index())
                .map(|e| e.full_name())
                .ok_or_else(|| unresolved(format!("enum #{}", id.0)))?,
        };

        let kind_ok = matches!(
            (field.field_type, field.type_ref),
            (FieldType::Enum, Some(TypeRef::Enum(_)))
                | (FieldType::Message | FieldType::Group, Some(TypeRef::Message(_)))
        );
        if !kind_ok {
            return Err(PoolError::TypeKindMismatch {
                message: msg.full_name.clone(),
                field: field.name.clone(),
                type_name: target.to_owned(),
            });
        }
        Ok(())
    }

    fn validate_default(
        &self,
        msg: &MessageDescriptor,
        field: &FieldDescriptor,
    ) -> Result<(), PoolError> {
        let Some(default) = &field.default else {
            return Ok(());
        };
        let invalid = |reason: &str| PoolError::InvalidDefault {
            message: msg.full_name.clone(),
            field: field.name.clone(),
            reason: reason.to_owned(),
        };

        if field.label == Label::Repeated {
            return Err(invalid("repeated fields cannot have a default"));
        }
        let fits = match (field.storage_kind(), default) {
            (StorageKind::Int32 | StorageKind::Int64, DefaultValue::Int(_)) => true,
            (StorageKind::UInt32 | StorageKind::UInt64, DefaultValue::UInt(_)) => true,
            (StorageKind::Float | StorageKind::Double, DefaultValue::Float(_)) => true,
            (StorageKind::Bool, DefaultValue::Bool(_)) => true,
            (StorageKind::String, DefaultValue::Bytes(_)) => true,
            (StorageKind::Enum, DefaultValue::Enum(number)) => field
                .enum_type()
                .and_then(|id| self.enums.get(id.index()))
                .is_some_and(|e| e.find_value_by_number(*number).is_some()),
            _ => false,
        };
        if !fits {
            return Err(invalid("stored default does not fit the field type"));
        }
        Ok(())
    }
}

fn corrupt(reason: String) -> PoolError {
    PoolError::Inconsistent(reason)
}
