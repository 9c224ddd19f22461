//! Dynamic field values.
//!
//! [`Value`] is the runtime domain a message field ranges over. Integers keep
//! their declared signedness and width; enums are open (unknown numbers are
//! carried and re-emitted as-is); repeated fields are ordered lists and maps
//! are key-ordered.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::descriptor::{Cardinality, FieldDescriptor, Kind};
use crate::message::Message;

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Bytes),
    /// Enum values stay open: unknown numbers round-trip unchanged.
    Enum(i32),
    Message(Message),
    List(Vec<Value>),
    Map(BTreeMap<MapKey, Value>),
}

impl Value {
    /// The zero value for a singular field of the given kind.
    ///
    /// For message kinds this is an *empty instance*; singular message fields
    /// track absence separately (see [`Message::get`]).
    pub fn default_of(kind: Kind) -> Value {
        match kind {
            Kind::Bool => Value::Bool(false),
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => Value::I32(0),
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Value::I64(0),
            Kind::Uint32 | Kind::Fixed32 => Value::U32(0),
            Kind::Uint64 | Kind::Fixed64 => Value::U64(0),
            Kind::Float => Value::F32(0.0),
            Kind::Double => Value::F64(0.0),
            Kind::String => Value::String(String::new()),
            Kind::Bytes => Value::Bytes(Bytes::new()),
            Kind::Enum(_) => Value::Enum(0),
            Kind::Message(desc) => Value::Message(Message::new(desc())),
        }
    }

    /// The value a reader observes for an unset field.
    pub(crate) fn default_of_field(field: &FieldDescriptor) -> Value {
        match field.cardinality {
            Cardinality::Singular => Value::default_of(field.kind),
            Cardinality::Repeated => Value::List(Vec::new()),
            Cardinality::Map => Value::Map(BTreeMap::new()),
        }
    }

    /// True if this value is the proto3 default and would be elided from the
    /// wire (empty lists/maps included; messages are never "default" because
    /// their presence is tracked separately).
    pub fn is_default(&self) -> bool {
        match self {
            Value::Bool(v) => !v,
            Value::I32(v) => *v == 0,
            Value::I64(v) => *v == 0,
            Value::U32(v) => *v == 0,
            Value::U64(v) => *v == 0,
            Value::F32(v) => *v == 0.0,
            Value::F64(v) => *v == 0.0,
            Value::String(v) => v.is_empty(),
            Value::Bytes(v) => v.is_empty(),
            Value::Enum(v) => *v == 0,
            Value::Message(_) => false,
            Value::List(v) => v.is_empty(),
            Value::Map(v) => v.is_empty(),
        }
    }

    /// A short name for error messages.
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Enum(_) => "enum",
            Value::Message(_) => "message",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Whether this value can be stored in a singular field of `kind`.
    pub(crate) fn matches_kind(&self, kind: Kind) -> bool {
        match kind {
            Kind::Bool => matches!(self, Value::Bool(_)),
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => matches!(self, Value::I32(_)),
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => matches!(self, Value::I64(_)),
            Kind::Uint32 | Kind::Fixed32 => matches!(self, Value::U32(_)),
            Kind::Uint64 | Kind::Fixed64 => matches!(self, Value::U64(_)),
            Kind::Float => matches!(self, Value::F32(_)),
            Kind::Double => matches!(self, Value::F64(_)),
            Kind::String => matches!(self, Value::String(_)),
            Kind::Bytes => matches!(self, Value::Bytes(_)),
            Kind::Enum(_) => matches!(self, Value::Enum(_)),
            Kind::Message(desc) => match self {
                Value::Message(m) => m.descriptor().full_name() == desc().full_name(),
                _ => false,
            },
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) | Value::Enum(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Value::Message(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<MapKey, Value>> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v)
    }
}

impl From<Message> for Value {
    fn from(v: Message) -> Self {
        Value::Message(v)
    }
}

/// Map keys: the integral, bool, and string kinds only.
///
/// The `Ord` impl gives maps a deterministic (sorted) iteration order, a
/// legal refinement of the wire format's "any order" contract.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    String(String),
}

impl MapKey {
    /// The zero key for the given key kind.
    pub fn default_of(kind: Kind) -> MapKey {
        match kind {
            Kind::Bool => MapKey::Bool(false),
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => MapKey::I32(0),
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => MapKey::I64(0),
            Kind::Uint32 | Kind::Fixed32 => MapKey::U32(0),
            Kind::Uint64 | Kind::Fixed64 => MapKey::U64(0),
            // Everything else is rejected at descriptor construction.
            _ => MapKey::String(String::new()),
        }
    }

    /// Reinterpret a decoded scalar as a map key.
    pub(crate) fn from_value(value: Value) -> Option<MapKey> {
        match value {
            Value::Bool(v) => Some(MapKey::Bool(v)),
            Value::I32(v) => Some(MapKey::I32(v)),
            Value::I64(v) => Some(MapKey::I64(v)),
            Value::U32(v) => Some(MapKey::U32(v)),
            Value::U64(v) => Some(MapKey::U64(v)),
            Value::String(v) => Some(MapKey::String(v)),
            _ => None,
        }
    }

    /// View this key as a scalar value (for encoding).
    pub(crate) fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(v) => Value::Bool(*v),
            MapKey::I32(v) => Value::I32(*v),
            MapKey::I64(v) => Value::I64(*v),
            MapKey::U32(v) => Value::U32(*v),
            MapKey::U64(v) => Value::U64(*v),
            MapKey::String(v) => Value::String(v.clone()),
        }
    }

    /// Whether this key can live in a map keyed by `kind`.
    pub(crate) fn matches_kind(&self, kind: Kind) -> bool {
        self.to_value().matches_kind(kind)
    }
}

impl From<&str> for MapKey {
    fn from(v: &str) -> Self {
        MapKey::String(v.to_owned())
    }
}

impl From<String> for MapKey {
    fn from(v: String) -> Self {
        MapKey::String(v)
    }
}

impl From<i32> for MapKey {
    fn from(v: i32) -> Self {
        MapKey::I32(v)
    }
}

impl From<u32> for MapKey {
    fn from(v: u32) -> Self {
        MapKey::U32(v)
    }
}

impl From<i64> for MapKey {
    fn from(v: i64) -> Self {
        MapKey::I64(v)
    }
}

impl From<u64> for MapKey {
    fn from(v: u64) -> Self {
        MapKey::U64(v)
    }
}

impl From<bool> for MapKey {
    fn from(v: bool) -> Self {
        MapKey::Bool(v)
    }
}
