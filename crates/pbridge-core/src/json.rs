//! JSON deserialization for descriptor pools.
//!
//! The JSON form is a flat list of messages and enums. Type references in
//! `type_name` are either fully qualified (leading `.`) or relative to the
//! pool's `package`.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::descriptor::{
    DefaultValue, EnumDescriptor, EnumId, EnumValue, FieldDescriptor, FieldOptions, FieldType,
    Label, MessageDescriptor, MessageId, TypeRef,
};
use crate::error::PoolError;
use crate::pool::DescriptorPool;
use crate::{CType, MAX_FIELD_NUMBER};

impl DescriptorPool {
    /// Parse and resolve a pool from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, PoolError> {
        let raw: RawPool = serde_json::from_str(json).map_err(PoolError::Json)?;
        raw.resolve()
    }
}

/// Raw pool structure matching the JSON format.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPool {
    #[serde(default)]
    package: Option<String>,
    #[serde(default)]
    messages: Vec<RawMessage>,
    #[serde(default)]
    enums: Vec<RawEnum>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMessage {
    name: String,
    #[serde(default)]
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawField {
    name: String,
    number: u32,
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default)]
    label: Label,
    #[serde(default)]
    type_name: Option<String>,
    #[serde(default)]
    extension: bool,
    #[serde(default)]
    ctype: Option<CType>,
    #[serde(default)]
    lazy: bool,
    #[serde(default)]
    packed: bool,
    #[serde(default)]
    default: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEnum {
    name: String,
    values: Vec<RawEnumValue>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEnumValue {
    name: String,
    number: i32,
}

impl RawPool {
    fn qualify(&self, name: &str) -> String {
        match &self.package {
            Some(pkg) if !pkg.is_empty() => format!("{pkg}.{name}"),
            _ => name.to_owned(),
        }
    }

    fn resolve(self) -> Result<DescriptorPool, PoolError> {
        // Pass 1: assign ids to every named type so fields can refer forward.
        let mut names: IndexMap<String, TypeRef> = IndexMap::new();
        for (i, msg) in self.messages.iter().enumerate() {
            let full = self.qualify(&msg.name);
            let id = TypeRef::Message(MessageId(i as u32));
            if names.insert(full.clone(), id).is_some() {
                return Err(PoolError::DuplicateName(full));
            }
        }
        for (i, en) in self.enums.iter().enumerate() {
            let full = self.qualify(&en.name);
            let id = TypeRef::Enum(EnumId(i as u32));
            if names.insert(full.clone(), id).is_some() {
                return Err(PoolError::DuplicateName(full));
            }
        }

        let enums = self
            .enums
            .iter()
            .enumerate()
            .map(|(i, en)| {
                let full_name = self.qualify(&en.name);
                if en.values.is_empty() {
                    return Err(PoolError::EmptyEnum(full_name));
                }
                Ok(EnumDescriptor {
                    id: EnumId(i as u32),
                    full_name,
                    values: en
                        .values
                        .iter()
                        .map(|v| EnumValue {
                            name: v.name.clone(),
                            number: v.number,
                        })
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Pass 2: resolve fields.
        let mut messages = Vec::with_capacity(self.messages.len());
        for (i, raw_msg) in self.messages.iter().enumerate() {
            let id = MessageId(i as u32);
            let full_name = self.qualify(&raw_msg.name);
            let mut seen = Vec::with_capacity(raw_msg.fields.len());
            let mut fields = Vec::with_capacity(raw_msg.fields.len());

            for (index, raw) in raw_msg.fields.iter().enumerate() {
                if raw.number == 0 || raw.number > MAX_FIELD_NUMBER {
                    return Err(PoolError::InvalidFieldNumber {
                        message: full_name.clone(),
                        field: raw.name.clone(),
                        number: raw.number,
                    });
                }
                if seen.contains(&raw.number) {
                    return Err(PoolError::DuplicateFieldNumber {
                        message: full_name.clone(),
                        number: raw.number,
                    });
                }
                seen.push(raw.number);

                let type_ref = self.resolve_type_ref(&names, &full_name, raw)?;
                let default = resolve_default(&full_name, raw, type_ref, &enums)?;

                fields.push(FieldDescriptor {
                    name: raw.name.clone(),
                    number: raw.number,
                    index: index as u32,
                    field_type: raw.field_type,
                    label: raw.label,
                    containing_type: id,
                    type_ref,
                    extension: raw.extension,
                    options: FieldOptions {
                        ctype: raw.ctype,
                        lazy: raw.lazy,
                        packed: raw.packed,
                    },
                    default,
                });
            }

            let mut desc = MessageDescriptor {
                id,
                full_name,
                fields,
                by_number: Vec::new(),
            };
            desc.index_numbers();
            messages.push(desc);
        }

        Ok(DescriptorPool::new(messages, enums, names))
    }

    fn resolve_type_ref(
        &self,
        names: &IndexMap<String, TypeRef>,
        message: &str,
        raw: &RawField,
    ) -> Result<Option<TypeRef>, PoolError> {
        if !raw.field_type.needs_type_name() {
            return Ok(None);
        }

        let unresolved = |type_name: &str| PoolError::UnresolvedType {
            message: message.to_owned(),
            field: raw.name.clone(),
            type_name: type_name.to_owned(),
        };

        let Some(type_name) = raw.type_name.as_deref() else {
            return Err(unresolved(""));
        };

        let found = match type_name.strip_prefix('.') {
            Some(absolute) => names.get(absolute),
            None => names
                .get(&self.qualify(type_name))
                .or_else(|| names.get(type_name)),
        };
        let type_ref = *found.ok_or_else(|| unresolved(type_name))?;

        let kind_ok = match (raw.field_type, type_ref) {
            (FieldType::Enum, TypeRef::Enum(_)) => true,
            (FieldType::Message | FieldType::Group, TypeRef::Message(_)) => true,
            _ => false,
        };
        if !kind_ok {
            return Err(PoolError::TypeKindMismatch {
                message: message.to_owned(),
                field: raw.name.clone(),
                type_name: type_name.to_owned(),
            });
        }

        Ok(Some(type_ref))
    }
}

fn resolve_default(
    message: &str,
    raw: &RawField,
    type_ref: Option<TypeRef>,
    enums: &[EnumDescriptor],
) -> Result<Option<DefaultValue>, PoolError> {
    let Some(value) = &raw.default else {
        return Ok(None);
    };

    let invalid = |reason: String| PoolError::InvalidDefault {
        message: message.to_owned(),
        field: raw.name.clone(),
        reason,
    };

    if raw.label == Label::Repeated {
        return Err(invalid("repeated fields cannot have a default".into()));
    }

    let type_name = raw.field_type.name();
    let mismatch = || invalid(format!("{value} is not a valid {type_name}"));

    let default = match raw.field_type {
        FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => {
            let v = value.as_i64().ok_or_else(mismatch)?;
            i32::try_from(v).map_err(|_| mismatch())?;
            DefaultValue::Int(v)
        }
        FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => {
            DefaultValue::Int(value.as_i64().ok_or_else(mismatch)?)
        }
        FieldType::UInt32 | FieldType::Fixed32 => {
            let v = value.as_u64().ok_or_else(mismatch)?;
            u32::try_from(v).map_err(|_| mismatch())?;
            DefaultValue::UInt(v)
        }
        FieldType::UInt64 | FieldType::Fixed64 => {
            DefaultValue::UInt(value.as_u64().ok_or_else(mismatch)?)
        }
        FieldType::Double | FieldType::Float => {
            DefaultValue::Float(value.as_f64().ok_or_else(mismatch)?)
        }
        FieldType::Bool => DefaultValue::Bool(value.as_bool().ok_or_else(mismatch)?),
        FieldType::String | FieldType::Bytes => {
            DefaultValue::Bytes(value.as_str().ok_or_else(mismatch)?.as_bytes().to_vec())
        }
        FieldType::Enum => {
            let name = value.as_str().ok_or_else(mismatch)?;
            let Some(TypeRef::Enum(id)) = type_ref else {
                return Err(mismatch());
            };
            let number = enums[id.index()]
                .find_value_by_name(name)
                .ok_or_else(|| invalid(format!("`{name}` is not a value of the enum")))?
                .number;
            DefaultValue::Enum(number)
        }
        FieldType::Message | FieldType::Group => {
            return Err(invalid("message fields cannot have a default".into()));
        }
    };

    Ok(Some(default))
}
