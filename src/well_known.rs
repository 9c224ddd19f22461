//! The Google well-known types: descriptors, JSON shapes, and bridges to
//! natural runtime representations.
//!
//! On the wire these are ordinary messages; their JSON forms are
//! distinguished (RFC 3339 strings for `Timestamp`, `1.5s` strings for
//! `Duration`, bare scalars for the wrapper types, raw JSON for the
//! `Struct`/`Value`/`ListValue` family, a comma-joined path string for
//! `FieldMask`). The JSON codec dispatches here by full type name.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde_json::{Map, Number, Value as Json};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::descriptor::{EnumDescriptor, FieldDescriptor, Kind, MessageDescriptor};
use crate::error::JsonError;
use crate::json::{emit, names, parse, JsonOptions};
use crate::message::Message;
use crate::value::{MapKey, Value};

// RFC 3339 representable instants: 0001-01-01T00:00:00Z to
// 9999-12-31T23:59:59.999999999Z.
const TIMESTAMP_MIN_SECONDS: i64 = -62_135_596_800;
const TIMESTAMP_MAX_SECONDS: i64 = 253_402_300_799;
// Durations span about +/- 10,000 years.
const DURATION_MAX_SECONDS: i64 = 315_576_000_000;
const MAX_NANOS: i32 = 999_999_999;

macro_rules! wkt_descriptor {
    ($fn_name:ident, $static_name:ident, $full_name:literal, [$($field:expr),+ $(,)?]) => {
        static $static_name: LazyLock<MessageDescriptor> = LazyLock::new(|| {
            MessageDescriptor::new($full_name, vec![$($field),+])
                .expect("well-known descriptor is valid")
        });

        #[doc = concat!("The `", $full_name, "` descriptor.")]
        pub fn $fn_name() -> &'static MessageDescriptor {
            &$static_name
        }
    };
}

wkt_descriptor!(timestamp, TIMESTAMP, "google.protobuf.Timestamp", [
    FieldDescriptor::new(1, "seconds", Kind::Int64),
    FieldDescriptor::new(2, "nanos", Kind::Int32),
]);

wkt_descriptor!(duration, DURATION, "google.protobuf.Duration", [
    FieldDescriptor::new(1, "seconds", Kind::Int64),
    FieldDescriptor::new(2, "nanos", Kind::Int32),
]);

wkt_descriptor!(bool_value, BOOL_VALUE, "google.protobuf.BoolValue", [
    FieldDescriptor::new(1, "value", Kind::Bool),
]);

wkt_descriptor!(int32_value, INT32_VALUE, "google.protobuf.Int32Value", [
    FieldDescriptor::new(1, "value", Kind::Int32),
]);

wkt_descriptor!(int64_value, INT64_VALUE, "google.protobuf.Int64Value", [
    FieldDescriptor::new(1, "value", Kind::Int64),
]);

wkt_descriptor!(uint32_value, UINT32_VALUE, "google.protobuf.UInt32Value", [
    FieldDescriptor::new(1, "value", Kind::Uint32),
]);

wkt_descriptor!(uint64_value, UINT64_VALUE, "google.protobuf.UInt64Value", [
    FieldDescriptor::new(1, "value", Kind::Uint64),
]);

wkt_descriptor!(float_value, FLOAT_VALUE, "google.protobuf.FloatValue", [
    FieldDescriptor::new(1, "value", Kind::Float),
]);

wkt_descriptor!(double_value, DOUBLE_VALUE, "google.protobuf.DoubleValue", [
    FieldDescriptor::new(1, "value", Kind::Double),
]);

wkt_descriptor!(string_value, STRING_VALUE, "google.protobuf.StringValue", [
    FieldDescriptor::new(1, "value", Kind::String),
]);

wkt_descriptor!(bytes_value, BYTES_VALUE, "google.protobuf.BytesValue", [
    FieldDescriptor::new(1, "value", Kind::Bytes),
]);

wkt_descriptor!(field_mask, FIELD_MASK, "google.protobuf.FieldMask", [
    FieldDescriptor::new(1, "paths", Kind::String).repeated(),
]);

wkt_descriptor!(json_struct, JSON_STRUCT, "google.protobuf.Struct", [
    FieldDescriptor::new(1, "fields", Kind::Message(json_value)).map(Kind::String),
]);

wkt_descriptor!(json_value, JSON_VALUE, "google.protobuf.Value", [
    FieldDescriptor::new(1, "null_value", Kind::Enum(null_value)).in_oneof("kind"),
    FieldDescriptor::new(2, "number_value", Kind::Double).in_oneof("kind"),
    FieldDescriptor::new(3, "string_value", Kind::String).in_oneof("kind"),
    FieldDescriptor::new(4, "bool_value", Kind::Bool).in_oneof("kind"),
    FieldDescriptor::new(5, "struct_value", Kind::Message(json_struct)).in_oneof("kind"),
    FieldDescriptor::new(6, "list_value", Kind::Message(list_value)).in_oneof("kind"),
]);

wkt_descriptor!(list_value, LIST_VALUE, "google.protobuf.ListValue", [
    FieldDescriptor::new(1, "values", Kind::Message(json_value)).repeated(),
]);

static EMPTY: LazyLock<MessageDescriptor> = LazyLock::new(|| {
    MessageDescriptor::new("google.protobuf.Empty", vec![])
        .expect("well-known descriptor is valid")
});

/// The `google.protobuf.Empty` descriptor.
pub fn empty() -> &'static MessageDescriptor {
    &EMPTY
}

static NULL_VALUE: LazyLock<EnumDescriptor> =
    LazyLock::new(|| EnumDescriptor::new("google.protobuf.NullValue", vec![("NULL_VALUE", 0)]));

/// The `google.protobuf.NullValue` descriptor.
pub fn null_value() -> &'static EnumDescriptor {
    &NULL_VALUE
}

/// The wrapped scalar kind, for the wrapper types only.
fn wrapper_kind(full_name: &str) -> Option<Kind> {
    match full_name {
        "google.protobuf.BoolValue" => Some(Kind::Bool),
        "google.protobuf.Int32Value" => Some(Kind::Int32),
        "google.protobuf.Int64Value" => Some(Kind::Int64),
        "google.protobuf.UInt32Value" => Some(Kind::Uint32),
        "google.protobuf.UInt64Value" => Some(Kind::Uint64),
        "google.protobuf.FloatValue" => Some(Kind::Float),
        "google.protobuf.DoubleValue" => Some(Kind::Double),
        "google.protobuf.StringValue" => Some(Kind::String),
        "google.protobuf.BytesValue" => Some(Kind::Bytes),
        _ => None,
    }
}

// ---- bridges to natural runtime representations ----

/// A `Timestamp` instance from an absolute instant.
pub fn new_timestamp(instant: OffsetDateTime) -> Message {
    let mut msg = Message::new(timestamp());
    set_field(&mut msg, "seconds", Value::I64(instant.unix_timestamp()));
    set_field(&mut msg, "nanos", Value::I32(instant.nanosecond() as i32));
    msg
}

/// The absolute instant a `Timestamp` instance represents.
pub fn timestamp_instant(msg: &Message) -> Result<OffsetDateTime, JsonError> {
    let seconds = get_i64(msg, "seconds");
    let nanos = get_i32(msg, "nanos");
    let base = OffsetDateTime::from_unix_timestamp(seconds)
        .map_err(|_| JsonError::Unrepresentable(format!("timestamp seconds {seconds} out of range")))?;
    base.checked_add(time::Duration::nanoseconds(i64::from(nanos)))
        .ok_or_else(|| JsonError::Unrepresentable("timestamp out of range".to_owned()))
}

/// A `Duration` instance from a signed span.
pub fn new_duration(span: time::Duration) -> Message {
    let mut msg = Message::new(duration());
    set_field(&mut msg, "seconds", Value::I64(span.whole_seconds()));
    set_field(&mut msg, "nanos", Value::I32(span.subsec_nanoseconds()));
    msg
}

/// The signed span a `Duration` instance represents.
pub fn duration_span(msg: &Message) -> time::Duration {
    time::Duration::new(get_i64(msg, "seconds"), get_i32(msg, "nanos"))
}

/// A wrapper instance (e.g. `BoolValue`) around a bare scalar.
///
/// "Absent" is expressed at the *field* level: leave the wrapper-typed field
/// of the enclosing message unset.
pub fn wrap(desc: &'static MessageDescriptor, value: impl Into<Value>) -> Message {
    let mut msg = Message::new(desc);
    set_field(&mut msg, "value", value.into());
    msg
}

/// The scalar a wrapper instance carries (its zero value when unset).
pub fn wrapped_value(msg: &Message) -> Value {
    let kind = wrapper_kind(msg.descriptor().full_name()).unwrap_or(Kind::String);
    msg.get("value")
        .cloned()
        .unwrap_or_else(|| Value::default_of(kind))
}

/// A `FieldMask` instance from snake_case paths.
pub fn new_field_mask(paths: &[&str]) -> Message {
    let mut msg = Message::new(field_mask());
    let items = paths
        .iter()
        .map(|p| Value::String((*p).to_owned()))
        .collect();
    set_field(&mut msg, "paths", Value::List(items));
    msg
}

/// The snake_case paths of a `FieldMask` instance, in order.
pub fn field_mask_paths(msg: &Message) -> Vec<String> {
    msg.get("paths")
        .and_then(Value::as_list)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// A `google.protobuf.Value` instance from any JSON value.
pub fn value_from_json(json: &Json) -> Message {
    let mut msg = Message::new(json_value());
    match json {
        Json::Null => set_field(&mut msg, "null_value", Value::Enum(0)),
        Json::Bool(v) => set_field(&mut msg, "bool_value", Value::Bool(*v)),
        Json::Number(n) => {
            set_field(&mut msg, "number_value", Value::F64(n.as_f64().unwrap_or(0.0)));
        }
        Json::String(s) => set_field(&mut msg, "string_value", Value::String(s.clone())),
        Json::Array(items) => {
            let values = items
                .iter()
                .map(|item| Value::Message(value_from_json(item)))
                .collect();
            let mut list = Message::new(list_value());
            set_field(&mut list, "values", Value::List(values));
            set_field(&mut msg, "list_value", Value::Message(list));
        }
        Json::Object(entries) => {
            set_field(&mut msg, "struct_value", Value::Message(struct_from_json(entries)));
        }
    }
    msg
}

/// The JSON value a `google.protobuf.Value` instance represents.
///
/// An instance with no member set reads as null.
pub fn value_to_json(msg: &Message) -> Result<Json, JsonError> {
    let json = match msg.which_member("kind") {
        None | Some(("null_value", _)) => Json::Null,
        Some(("number_value", value)) => {
            let number = value.as_f64().unwrap_or(0.0);
            if !number.is_finite() {
                return Err(JsonError::Unrepresentable(
                    "non-finite number_value has no JSON form".to_owned(),
                ));
            }
            Number::from_f64(number).map(Json::Number).unwrap_or(Json::Null)
        }
        Some(("string_value", value)) => Json::String(value.as_str().unwrap_or("").to_owned()),
        Some(("bool_value", value)) => Json::Bool(value.as_bool().unwrap_or(false)),
        Some(("struct_value", value)) => match value.as_message() {
            Some(nested) => struct_to_json(nested)?,
            None => Json::Null,
        },
        Some(("list_value", value)) => match value.as_message() {
            Some(nested) => list_to_json(nested)?,
            None => Json::Null,
        },
        Some(_) => Json::Null,
    };
    Ok(json)
}

/// A `Struct` instance from a JSON object.
pub fn struct_from_json(entries: &Map<String, Json>) -> Message {
    let mut fields = BTreeMap::new();
    for (key, value) in entries {
        fields.insert(
            MapKey::String(key.clone()),
            Value::Message(value_from_json(value)),
        );
    }
    let mut msg = Message::new(json_struct());
    set_field(&mut msg, "fields", Value::Map(fields));
    msg
}

/// The JSON object a `Struct` instance represents.
pub fn struct_to_json(msg: &Message) -> Result<Json, JsonError> {
    let mut obj = Map::new();
    if let Some(entries) = msg.get("fields").and_then(Value::as_map) {
        for (key, value) in entries {
            let MapKey::String(key) = key else { continue };
            let json = match value.as_message() {
                Some(nested) => value_to_json(nested)?,
                None => Json::Null,
            };
            obj.insert(key.clone(), json);
        }
    }
    Ok(Json::Object(obj))
}

fn list_to_json(msg: &Message) -> Result<Json, JsonError> {
    let mut array = Vec::new();
    if let Some(items) = msg.get("values").and_then(Value::as_list) {
        for item in items {
            array.push(match item.as_message() {
                Some(nested) => value_to_json(nested)?,
                None => Json::Null,
            });
        }
    }
    Ok(Json::Array(array))
}

// ---- JSON codec dispatch ----

/// The distinguished JSON shape of a well-known type instance, or `None`
/// when `msg` is an ordinary message.
pub(crate) fn emit_special(
    msg: &Message,
    _options: &JsonOptions,
) -> Result<Option<Json>, JsonError> {
    let full_name = msg.descriptor().full_name();

    if let Some(kind) = wrapper_kind(full_name) {
        let value = msg
            .get("value")
            .cloned()
            .unwrap_or_else(|| Value::default_of(kind));
        return emit::scalar_to_json(kind, &value).map(Some);
    }

    let json = match full_name {
        "google.protobuf.Timestamp" => {
            Json::String(format_timestamp(get_i64(msg, "seconds"), get_i32(msg, "nanos"))?)
        }
        "google.protobuf.Duration" => {
            Json::String(format_duration(get_i64(msg, "seconds"), get_i32(msg, "nanos"))?)
        }
        "google.protobuf.FieldMask" => {
            let paths = field_mask_paths(msg);
            let camel: Vec<String> = paths.iter().map(|p| names::snake_to_camel(p)).collect();
            Json::String(camel.join(","))
        }
        "google.protobuf.Struct" => struct_to_json(msg)?,
        "google.protobuf.Value" => value_to_json(msg)?,
        "google.protobuf.ListValue" => list_to_json(msg)?,
        "google.protobuf.Empty" => Json::Object(Map::new()),
        _ => return Ok(None),
    };
    Ok(Some(json))
}

/// Parse a well-known type instance from its distinguished JSON shape, or
/// `None` when `desc` is an ordinary message type.
pub(crate) fn parse_special(
    desc: &'static MessageDescriptor,
    json: &Json,
) -> Result<Option<Message>, JsonError> {
    let full_name = desc.full_name();

    if let Some(kind) = wrapper_kind(full_name) {
        let mut msg = Message::new(desc);
        if !json.is_null() {
            let value = parse::scalar_from_json(kind, json, "value")?;
            set_field(&mut msg, "value", value);
        }
        msg.from_wire = true;
        return Ok(Some(msg));
    }

    let msg = match full_name {
        "google.protobuf.Timestamp" => {
            let text = expect_string(json, full_name)?;
            let (seconds, nanos) = parse_timestamp(text)?;
            let mut msg = Message::new(desc);
            set_field(&mut msg, "seconds", Value::I64(seconds));
            set_field(&mut msg, "nanos", Value::I32(nanos));
            msg
        }
        "google.protobuf.Duration" => {
            let text = expect_string(json, full_name)?;
            let (seconds, nanos) = parse_duration(text)?;
            let mut msg = Message::new(desc);
            set_field(&mut msg, "seconds", Value::I64(seconds));
            set_field(&mut msg, "nanos", Value::I32(nanos));
            msg
        }
        "google.protobuf.FieldMask" => {
            let text = expect_string(json, full_name)?;
            let paths: Vec<Value> = text
                .split(',')
                .filter(|p| !p.is_empty())
                .map(|p| Value::String(names::camel_to_snake(p)))
                .collect();
            let mut msg = Message::new(desc);
            set_field(&mut msg, "paths", Value::List(paths));
            msg
        }
        "google.protobuf.Struct" => match json {
            Json::Object(entries) => struct_from_json(entries),
            other => {
                return Err(JsonError::WrongType {
                    field: full_name.to_owned(),
                    expected: "object",
                    got: parse::json_kind(other),
                })
            }
        },
        "google.protobuf.Value" => value_from_json(json),
        "google.protobuf.ListValue" => match json {
            Json::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| Value::Message(value_from_json(item)))
                    .collect();
                let mut msg = Message::new(desc);
                set_field(&mut msg, "values", Value::List(values));
                msg
            }
            other => {
                return Err(JsonError::WrongType {
                    field: full_name.to_owned(),
                    expected: "array",
                    got: parse::json_kind(other),
                })
            }
        },
        "google.protobuf.Empty" => match json {
            Json::Object(_) => Message::new(desc),
            other => {
                return Err(JsonError::WrongType {
                    field: full_name.to_owned(),
                    expected: "object",
                    got: parse::json_kind(other),
                })
            }
        },
        _ => return Ok(None),
    };

    let mut msg = msg;
    msg.from_wire = true;
    Ok(Some(msg))
}

// ---- canonical text forms ----

/// RFC 3339 with `Z` suffix; fractional seconds take the smallest of 0, 3,
/// 6, or 9 digits that losslessly represents `nanos`.
pub(crate) fn format_timestamp(seconds: i64, nanos: i32) -> Result<String, JsonError> {
    if !(TIMESTAMP_MIN_SECONDS..=TIMESTAMP_MAX_SECONDS).contains(&seconds) {
        return Err(JsonError::Unrepresentable(format!(
            "timestamp seconds {seconds} outside years 0001-9999"
        )));
    }
    if !(0..=MAX_NANOS).contains(&nanos) {
        return Err(JsonError::Unrepresentable(format!(
            "timestamp nanos {nanos} outside 0..=999999999"
        )));
    }

    let instant = OffsetDateTime::from_unix_timestamp(seconds)
        .map_err(|_| JsonError::Unrepresentable(format!("timestamp seconds {seconds} out of range")))?;
    Ok(format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}{}Z",
        instant.year(),
        u8::from(instant.month()),
        instant.day(),
        instant.hour(),
        instant.minute(),
        instant.second(),
        fractional_seconds(nanos.unsigned_abs()),
    ))
}

/// Parse RFC 3339, accepting any UTC offset and normalizing to UTC.
pub(crate) fn parse_timestamp(text: &str) -> Result<(i64, i32), JsonError> {
    let instant = OffsetDateTime::parse(text, &Rfc3339).map_err(|_| JsonError::InvalidValue {
        field: "google.protobuf.Timestamp".to_owned(),
        reason: format!("'{text}' is not an RFC 3339 timestamp"),
    })?;
    let seconds = instant.unix_timestamp();
    if !(TIMESTAMP_MIN_SECONDS..=TIMESTAMP_MAX_SECONDS).contains(&seconds) {
        return Err(JsonError::InvalidValue {
            field: "google.protobuf.Timestamp".to_owned(),
            reason: format!("'{text}' outside years 0001-9999"),
        });
    }
    Ok((seconds, instant.nanosecond() as i32))
}

/// Decimal seconds with an `s` suffix and the sign on the whole; the
/// fractional part follows the 0/3/6/9 digit rule.
pub(crate) fn format_duration(seconds: i64, nanos: i32) -> Result<String, JsonError> {
    if seconds.abs() > DURATION_MAX_SECONDS {
        return Err(JsonError::Unrepresentable(format!(
            "duration seconds {seconds} out of range"
        )));
    }
    if nanos.abs() > MAX_NANOS {
        return Err(JsonError::Unrepresentable(format!(
            "duration nanos {nanos} outside +/-999999999"
        )));
    }
    if (seconds > 0 && nanos < 0) || (seconds < 0 && nanos > 0) {
        return Err(JsonError::Unrepresentable(
            "duration seconds and nanos must share a sign".to_owned(),
        ));
    }

    let sign = if seconds < 0 || nanos < 0 { "-" } else { "" };
    Ok(format!(
        "{sign}{}{}s",
        seconds.unsigned_abs(),
        fractional_seconds(nanos.unsigned_abs()),
    ))
}

pub(crate) fn parse_duration(text: &str) -> Result<(i64, i32), JsonError> {
    let invalid = |reason: String| JsonError::InvalidValue {
        field: "google.protobuf.Duration".to_owned(),
        reason,
    };

    let body = text
        .strip_suffix('s')
        .ok_or_else(|| invalid(format!("'{text}' does not end with 's'")))?;
    let (negative, body) = match body.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    let (sec_text, frac_text) = match body.split_once('.') {
        Some((sec, frac)) => (sec, frac),
        None => (body, ""),
    };

    let seconds: i64 = sec_text
        .parse()
        .map_err(|_| invalid(format!("'{text}' has no decimal seconds")))?;
    if seconds < 0 || seconds > DURATION_MAX_SECONDS {
        return Err(invalid(format!("'{text}' out of range")));
    }

    let nanos: i32 = if frac_text.is_empty() {
        0
    } else {
        if frac_text.len() > 9 || !frac_text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(format!("'{text}' has an invalid fraction")));
        }
        let mut padded = frac_text.to_owned();
        while padded.len() < 9 {
            padded.push('0');
        }
        padded
            .parse()
            .map_err(|_| invalid(format!("'{text}' has an invalid fraction")))?
    };

    if negative {
        Ok((-seconds, -nanos))
    } else {
        Ok((seconds, nanos))
    }
}

/// `""`, `".123"`, `".123456"`, or `".123456789"`.
fn fractional_seconds(nanos: u32) -> String {
    if nanos == 0 {
        String::new()
    } else if nanos % 1_000_000 == 0 {
        format!(".{:03}", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!(".{:06}", nanos / 1_000)
    } else {
        format!(".{nanos:09}")
    }
}

// ---- small field accessors over our own descriptors ----

fn set_field(msg: &mut Message, name: &str, value: Value) {
    if let Some(field) = msg.descriptor().field_by_name(name) {
        msg.store(field, value);
    }
}

fn get_i64(msg: &Message, name: &str) -> i64 {
    msg.get(name).and_then(Value::as_i64).unwrap_or(0)
}

fn get_i32(msg: &Message, name: &str) -> i32 {
    msg.get(name).and_then(Value::as_i32).unwrap_or(0)
}

fn expect_string<'a>(json: &'a Json, full_name: &str) -> Result<&'a str, JsonError> {
    match json {
        Json::String(text) => Ok(text),
        other => Err(JsonError::WrongType {
            field: full_name.to_owned(),
            expected: "string",
            got: parse::json_kind(other),
        }),
    }
}
