//! Message -> `serde_json::Value` conversion.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Number, Value as Json};

use crate::descriptor::{Cardinality, FieldDescriptor, Kind};
use crate::error::JsonError;
use crate::json::JsonOptions;
use crate::message::Message;
use crate::value::{MapKey, Value};

/// Convert a message to its JSON form (an object, or a well-known type's
/// distinguished shape).
pub(crate) fn message_to_value(msg: &Message, options: &JsonOptions) -> Result<Json, JsonError> {
    if let Some(special) = crate::well_known::emit_special(msg, options)? {
        return Ok(special);
    }

    let desc = msg.descriptor();
    let mut obj = Map::new();
    for field in desc.fields() {
        let key = options.casing.apply(field.name);
        let stored = msg.fields.get(&field.number);
        match field.cardinality {
            Cardinality::Repeated => {
                let items = stored.and_then(Value::as_list).unwrap_or(&[]);
                if items.is_empty() && !options.include_default_values {
                    continue;
                }
                let array = items
                    .iter()
                    .map(|item| field_value_to_json(field, item, options))
                    .collect::<Result<Vec<_>, _>>()?;
                obj.insert(key, Json::Array(array));
            }
            Cardinality::Map => {
                let mut map_obj = Map::new();
                if let Some(entries) = stored.and_then(Value::as_map) {
                    for (entry_key, entry_value) in entries {
                        map_obj.insert(
                            map_key_string(entry_key),
                            field_value_to_json(field, entry_value, options)?,
                        );
                    }
                }
                if map_obj.is_empty() && !options.include_default_values {
                    continue;
                }
                obj.insert(key, Json::Object(map_obj));
            }
            Cardinality::Singular => match stored {
                Some(value) => {
                    // Sub-messages are emitted whenever present; scalars are
                    // elided at their default unless the field is the active
                    // member of its oneof group (presence information).
                    let elide = !options.include_default_values
                        && value.is_default()
                        && !matches!(field.kind, Kind::Message(_))
                        && field.oneof.is_none();
                    if elide {
                        continue;
                    }
                    obj.insert(key, field_value_to_json(field, value, options)?);
                }
                None => {
                    // Unset oneof members stay hidden even when defaults are
                    // requested; emitting them would fabricate presence.
                    if !options.include_default_values || field.oneof.is_some() {
                        continue;
                    }
                    let json = match field.kind {
                        Kind::Message(_) => Json::Null,
                        _ => field_value_to_json(field, &Value::default_of(field.kind), options)?,
                    };
                    obj.insert(key, json);
                }
            },
        }
    }
    Ok(Json::Object(obj))
}

/// Convert one element value of a field (the singular value, a repeated
/// element, or a map value).
fn field_value_to_json(
    field: &FieldDescriptor,
    value: &Value,
    options: &JsonOptions,
) -> Result<Json, JsonError> {
    match field.kind {
        Kind::Message(_) => match value {
            Value::Message(nested) => message_to_value(nested, options),
            _ => Ok(Json::Null),
        },
        Kind::Enum(desc) => {
            let number = value.as_i32().unwrap_or(0);
            Ok(match desc().name_of(number) {
                Some(name) => Json::String(name.to_owned()),
                // Unknown enum integers round-trip as integers.
                None => Json::Number(number.into()),
            })
        }
        kind => scalar_to_json(kind, value),
    }
}

/// The §"Scalar mappings" table: 32-bit integers as numbers, 64-bit as
/// decimal strings, non-finite floats as strings, bytes as padded base64.
pub(crate) fn scalar_to_json(kind: Kind, value: &Value) -> Result<Json, JsonError> {
    let json = match kind {
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
            Json::Number(value.as_i32().unwrap_or(0).into())
        }
        Kind::Uint32 | Kind::Fixed32 => Json::Number(value.as_u32().unwrap_or(0).into()),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => {
            Json::String(value.as_i64().unwrap_or(0).to_string())
        }
        Kind::Uint64 | Kind::Fixed64 => Json::String(value.as_u64().unwrap_or(0).to_string()),
        Kind::Bool => Json::Bool(value.as_bool().unwrap_or(false)),
        Kind::Float => {
            let v = value.as_f32().unwrap_or(0.0);
            // Widening an f32 picks up spurious digits; round-trip through
            // its own shortest decimal form so 0.1f32 emits as 0.1.
            let shortest = v.to_string().parse().unwrap_or_else(|_| f64::from(v));
            float_to_json(f64::from(v), Some(shortest))
        }
        Kind::Double => float_to_json(value.as_f64().unwrap_or(0.0), None),
        Kind::String => Json::String(value.as_str().unwrap_or("").to_owned()),
        Kind::Bytes => {
            let bytes: &[u8] = value.as_bytes().map(|b| b.as_ref()).unwrap_or(&[]);
            Json::String(STANDARD.encode(bytes))
        }
        Kind::Enum(_) | Kind::Message(_) => Json::Null,
    };
    Ok(json)
}

fn float_to_json(value: f64, shortened: Option<f64>) -> Json {
    if value.is_nan() {
        return Json::String("NaN".to_owned());
    }
    if value.is_infinite() {
        let name = if value.is_sign_positive() {
            "Infinity"
        } else {
            "-Infinity"
        };
        return Json::String(name.to_owned());
    }
    Number::from_f64(shortened.unwrap_or(value))
        .map(Json::Number)
        .unwrap_or(Json::Null)
}

/// Map keys are stringified: integers and bools take their decimal /
/// `"true"`/`"false"` forms, strings are used as-is.
fn map_key_string(key: &MapKey) -> String {
    match key {
        MapKey::Bool(v) => v.to_string(),
        MapKey::I32(v) => v.to_string(),
        MapKey::I64(v) => v.to_string(),
        MapKey::U32(v) => v.to_string(),
        MapKey::U64(v) => v.to_string(),
        MapKey::String(v) => v.clone(),
    }
}
