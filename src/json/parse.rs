//! `serde_json::Value` -> message conversion.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use bytes::Bytes;
use serde_json::Value as Json;

use crate::descriptor::{Cardinality, FieldDescriptor, Kind, MessageDescriptor};
use crate::error::JsonError;
use crate::message::Message;
use crate::value::{MapKey, Value};

/// Parse a message from its JSON form.
///
/// Field names are accepted in both their declared snake_case and
/// lowerCamelCase spellings. Unknown keys are ignored. `null` means
/// "absent" for every field except `google.protobuf.Value`.
pub(crate) fn message_from_value(
    desc: &'static MessageDescriptor,
    json: &Json,
) -> Result<Message, JsonError> {
    if let Some(special) = crate::well_known::parse_special(desc, json)? {
        return Ok(special);
    }

    let Json::Object(obj) = json else {
        return Err(JsonError::WrongType {
            field: desc.full_name().to_owned(),
            expected: "object",
            got: json_kind(json),
        });
    };

    let mut msg = Message::new(desc);
    for (key, value) in obj {
        let Some(field) = desc.field_by_name(key) else {
            continue;
        };

        if value.is_null() {
            // JSON null sets nothing, except a `google.protobuf.Value`
            // field where null IS the value.
            if let (Cardinality::Singular, Kind::Message(nested)) =
                (field.cardinality, field.kind)
            {
                if nested().full_name() == "google.protobuf.Value" {
                    let parsed = message_from_value(nested(), value)?;
                    msg.store(field, Value::Message(parsed));
                }
            }
            continue;
        }

        match field.cardinality {
            Cardinality::Singular => {
                let parsed = field_value_from_json(field, value)?;
                msg.store(field, parsed);
            }
            Cardinality::Repeated => {
                let Json::Array(items) = value else {
                    return Err(JsonError::WrongType {
                        field: field.name.to_owned(),
                        expected: "array",
                        got: json_kind(value),
                    });
                };
                let parsed = items
                    .iter()
                    .map(|item| field_value_from_json(field, item))
                    .collect::<Result<Vec<_>, _>>()?;
                msg.store(field, Value::List(parsed));
            }
            Cardinality::Map => {
                let Json::Object(entries) = value else {
                    return Err(JsonError::WrongType {
                        field: field.name.to_owned(),
                        expected: "object",
                        got: json_kind(value),
                    });
                };
                let key_kind = field.map_key.unwrap_or(Kind::String);
                let mut map = std::collections::BTreeMap::new();
                for (entry_key, entry_value) in entries {
                    let parsed_key = map_key_from_str(key_kind, entry_key, field.name)?;
                    let parsed_value = field_value_from_json(field, entry_value)?;
                    map.insert(parsed_key, parsed_value);
                }
                msg.store(field, Value::Map(map));
            }
        }
    }

    msg.from_wire = true;
    Ok(msg)
}

/// Parse one element value of a field.
fn field_value_from_json(field: &FieldDescriptor, json: &Json) -> Result<Value, JsonError> {
    match field.kind {
        Kind::Message(nested) => {
            Ok(Value::Message(message_from_value(nested(), json)?))
        }
        Kind::Enum(desc) => match json {
            // Accept either the declared name or a raw integer; unknown
            // integers are preserved (open enums).
            Json::String(name) => match desc().number_of(name) {
                Some(number) => Ok(Value::Enum(number)),
                None => Err(JsonError::InvalidValue {
                    field: field.name.to_owned(),
                    reason: format!("unknown enum value name '{name}'"),
                }),
            },
            Json::Number(_) => {
                let number = json_to_i64(json, field.name)?;
                let number = i32::try_from(number).map_err(|_| JsonError::InvalidValue {
                    field: field.name.to_owned(),
                    reason: format!("enum value {number} out of range"),
                })?;
                Ok(Value::Enum(number))
            }
            other => Err(JsonError::WrongType {
                field: field.name.to_owned(),
                expected: "string or number",
                got: json_kind(other),
            }),
        },
        kind => scalar_from_json(kind, json, field.name),
    }
}

/// Parse a scalar per the §"Scalar mappings" table. Numeric kinds accept
/// both JSON numbers and decimal strings; floats additionally accept
/// `"NaN"`, `"Infinity"`, and `"-Infinity"`.
pub(crate) fn scalar_from_json(
    kind: Kind,
    json: &Json,
    field_name: &str,
) -> Result<Value, JsonError> {
    match kind {
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
            let v = json_to_i64(json, field_name)?;
            let v = i32::try_from(v).map_err(|_| out_of_range(field_name, "int32"))?;
            Ok(Value::I32(v))
        }
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => {
            Ok(Value::I64(json_to_i64(json, field_name)?))
        }
        Kind::Uint32 | Kind::Fixed32 => {
            let v = json_to_u64(json, field_name)?;
            let v = u32::try_from(v).map_err(|_| out_of_range(field_name, "uint32"))?;
            Ok(Value::U32(v))
        }
        Kind::Uint64 | Kind::Fixed64 => Ok(Value::U64(json_to_u64(json, field_name)?)),
        Kind::Bool => match json {
            Json::Bool(v) => Ok(Value::Bool(*v)),
            other => Err(JsonError::WrongType {
                field: field_name.to_owned(),
                expected: "boolean",
                got: json_kind(other),
            }),
        },
        Kind::Float => {
            let v = json_to_f64(json, field_name)?;
            Ok(Value::F32(v as f32))
        }
        Kind::Double => Ok(Value::F64(json_to_f64(json, field_name)?)),
        Kind::String => match json {
            Json::String(v) => Ok(Value::String(v.clone())),
            other => Err(JsonError::WrongType {
                field: field_name.to_owned(),
                expected: "string",
                got: json_kind(other),
            }),
        },
        Kind::Bytes => match json {
            Json::String(v) => Ok(Value::Bytes(decode_base64(v, field_name)?)),
            other => Err(JsonError::WrongType {
                field: field_name.to_owned(),
                expected: "base64 string",
                got: json_kind(other),
            }),
        },
        Kind::Enum(_) | Kind::Message(_) => Err(JsonError::WrongType {
            field: field_name.to_owned(),
            expected: "scalar",
            got: json_kind(json),
        }),
    }
}

/// Standard base64 with padding is canonical; the URL-safe alphabet and
/// unpadded forms are accepted too.
fn decode_base64(input: &str, field_name: &str) -> Result<Bytes, JsonError> {
    STANDARD
        .decode(input)
        .or_else(|_| STANDARD_NO_PAD.decode(input))
        .or_else(|_| URL_SAFE.decode(input))
        .or_else(|_| URL_SAFE_NO_PAD.decode(input))
        .map(Bytes::from)
        .map_err(|_| JsonError::InvalidValue {
            field: field_name.to_owned(),
            reason: "invalid base64".to_owned(),
        })
}

/// Parse a stringified map key back through the key kind's domain.
fn map_key_from_str(kind: Kind, key: &str, field_name: &str) -> Result<MapKey, JsonError> {
    let parsed = match kind {
        Kind::Bool => match key {
            "true" => MapKey::Bool(true),
            "false" => MapKey::Bool(false),
            _ => {
                return Err(JsonError::InvalidValue {
                    field: field_name.to_owned(),
                    reason: format!("invalid bool map key '{key}'"),
                })
            }
        },
        Kind::String => MapKey::String(key.to_owned()),
        _ => {
            let number = Json::String(key.to_owned());
            match MapKey::from_value(scalar_from_json(kind, &number, field_name)?) {
                Some(parsed) => parsed,
                None => {
                    return Err(JsonError::InvalidValue {
                        field: field_name.to_owned(),
                        reason: format!("invalid map key '{key}'"),
                    })
                }
            }
        }
    };
    Ok(parsed)
}

fn json_to_i64(json: &Json, field_name: &str) -> Result<i64, JsonError> {
    match json {
        Json::Number(n) => {
            if let Some(v) = n.as_i64() {
                return Ok(v);
            }
            // Tolerate integer-valued floats like 1e3.
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                    return Ok(f as i64);
                }
            }
            Err(out_of_range(field_name, "int64"))
        }
        Json::String(s) => s
            .parse::<i64>()
            .map_err(|_| JsonError::InvalidValue {
                field: field_name.to_owned(),
                reason: format!("'{s}' is not a decimal integer"),
            }),
        other => Err(JsonError::WrongType {
            field: field_name.to_owned(),
            expected: "number or decimal string",
            got: json_kind(other),
        }),
    }
}

fn json_to_u64(json: &Json, field_name: &str) -> Result<u64, JsonError> {
    match json {
        Json::Number(n) => {
            if let Some(v) = n.as_u64() {
                return Ok(v);
            }
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f >= 0.0 && f <= u64::MAX as f64 {
                    return Ok(f as u64);
                }
            }
            Err(out_of_range(field_name, "uint64"))
        }
        Json::String(s) => s
            .parse::<u64>()
            .map_err(|_| JsonError::InvalidValue {
                field: field_name.to_owned(),
                reason: format!("'{s}' is not a decimal unsigned integer"),
            }),
        other => Err(JsonError::WrongType {
            field: field_name.to_owned(),
            expected: "number or decimal string",
            got: json_kind(other),
        }),
    }
}

fn json_to_f64(json: &Json, field_name: &str) -> Result<f64, JsonError> {
    match json {
        Json::Number(n) => n.as_f64().ok_or_else(|| out_of_range(field_name, "double")),
        Json::String(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            _ => s.parse::<f64>().map_err(|_| JsonError::InvalidValue {
                field: field_name.to_owned(),
                reason: format!("'{s}' is not a number"),
            }),
        },
        other => Err(JsonError::WrongType {
            field: field_name.to_owned(),
            expected: "number or string",
            got: json_kind(other),
        }),
    }
}

fn out_of_range(field_name: &str, ty: &'static str) -> JsonError {
    JsonError::InvalidValue {
        field: field_name.to_owned(),
        reason: format!("number outside the {ty} range"),
    }
}

pub(crate) fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
