//! Message instances.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;

use crate::codec::{self, DecodeOptions};
use crate::descriptor::{Cardinality, FieldDescriptor, Kind, MessageDescriptor};
use crate::error::{DecodeError, JsonError, ValueError};
use crate::json::JsonOptions;
use crate::value::{MapKey, Value};

/// A mutable instance of a message type.
///
/// An instance is born at its per-field defaults and tracks, besides the set
/// field values: the bytes of any unknown fields seen while parsing, the
/// active member of each oneof group, and whether the instance was produced
/// by a parse call at all (see [`Message::was_serialized`]).
///
/// Instances are not thread-safe; the shared [`MessageDescriptor`] is.
#[derive(Clone)]
pub struct Message {
    pub(crate) desc: &'static MessageDescriptor,
    /// Set fields, keyed by field number. Absent entries read as defaults.
    pub(crate) fields: BTreeMap<u32, Value>,
    /// Active member per oneof group.
    pub(crate) oneof_active: BTreeMap<&'static str, u32>,
    /// Unknown field records, verbatim, in arrival order.
    pub(crate) unknown: Vec<u8>,
    pub(crate) from_wire: bool,
}

impl Message {
    /// A new instance at its default values.
    pub fn new(desc: &'static MessageDescriptor) -> Self {
        Message {
            desc,
            fields: BTreeMap::new(),
            oneof_active: BTreeMap::new(),
            unknown: Vec::new(),
            from_wire: false,
        }
    }

    /// The descriptor this instance was built from.
    #[inline]
    pub fn descriptor(&self) -> &'static MessageDescriptor {
        self.desc
    }

    /// The stored value of a field, if one has been set.
    ///
    /// Unset fields and cleared oneof members return `None`; use
    /// [`Message::get_or_default`] for the value a proto3 reader observes.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let field = self.desc.field_by_name(name)?;
        self.fields.get(&field.number)
    }

    /// The value a reader observes for a field: the stored value, or the
    /// zero value of its type.
    ///
    /// Singular message fields observe an *empty instance* when absent; use
    /// [`Message::get`] to distinguish absence.
    pub fn get_or_default(&self, name: &str) -> Result<Value, ValueError> {
        let field = self
            .desc
            .field_by_name(name)
            .ok_or_else(|| self.unknown_field(name))?;
        Ok(self
            .fields
            .get(&field.number)
            .cloned()
            .unwrap_or_else(|| Value::default_of_field(field)))
    }

    /// Assign a field, enforcing the declared kind and cardinality.
    ///
    /// Assigning a member of a oneof group clears the other members of that
    /// group and marks this one active.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ValueError> {
        let field = self
            .desc
            .field_by_name(name)
            .ok_or_else(|| self.unknown_field(name))?;
        let value = value.into();

        let ok = match field.cardinality {
            Cardinality::Singular => value.matches_kind(field.kind),
            Cardinality::Repeated => match &value {
                Value::List(items) => items.iter().all(|v| v.matches_kind(field.kind)),
                _ => false,
            },
            Cardinality::Map => match (&value, field.map_key) {
                (Value::Map(entries), Some(key_kind)) => entries
                    .iter()
                    .all(|(k, v)| k.matches_kind(key_kind) && v.matches_kind(field.kind)),
                _ => false,
            },
        };
        if !ok {
            return Err(ValueError::KindMismatch {
                name: field.name.to_owned(),
                got: value.kind_name(),
            });
        }

        self.store(field, value);
        Ok(())
    }

    /// Clear a field back to "unset".
    pub fn clear(&mut self, name: &str) -> Result<(), ValueError> {
        let field = self
            .desc
            .field_by_name(name)
            .ok_or_else(|| self.unknown_field(name))?;
        self.fields.remove(&field.number);
        if let Some(group) = field.oneof {
            if self.oneof_active.get(group) == Some(&field.number) {
                self.oneof_active.remove(group);
            }
        }
        Ok(())
    }

    /// The active member of a oneof group, with its value.
    ///
    /// Returns `None` when no member of the group is set (or the group does
    /// not exist).
    pub fn which_member(&self, group: &str) -> Option<(&'static str, &Value)> {
        let number = *self.oneof_active.get(group)?;
        let field = self.desc.field_by_number(number)?;
        let value = self.fields.get(&number)?;
        Some((field.name, value))
    }

    /// True iff this instance was produced by a parse call (wire, JSON, or
    /// dict), as opposed to being constructed locally.
    ///
    /// Distinguishes "sub-message transmitted but empty" from "sub-message
    /// never transmitted" in a proto3 world.
    #[inline]
    pub fn was_serialized(&self) -> bool {
        self.from_wire
    }

    /// The preserved unknown-field bytes, verbatim.
    #[inline]
    pub fn unknown_fields(&self) -> &[u8] {
        &self.unknown
    }

    // ---- wire codec ----

    /// Serialize into the provided buffer.
    pub fn encode<B: bytes::BufMut>(&self, buf: &mut B) {
        codec::encode::encode_message(self, buf);
    }

    /// Serialize to a fresh byte vector.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf
    }

    /// The exact number of bytes [`Message::encode`] will write.
    pub fn encoded_len(&self) -> usize {
        codec::encode::encoded_message_len(self)
    }

    /// Parse an instance from its wire encoding.
    pub fn decode(
        desc: &'static MessageDescriptor,
        buf: impl Into<Bytes>,
    ) -> Result<Message, DecodeError> {
        Self::decode_with_options(desc, buf, &DecodeOptions::default())
    }

    /// Parse with explicit resource bounds.
    pub fn decode_with_options(
        desc: &'static MessageDescriptor,
        buf: impl Into<Bytes>,
        options: &DecodeOptions,
    ) -> Result<Message, DecodeError> {
        let mut msg = Message::new(desc);
        codec::decode::merge_message(&mut msg, buf.into(), options, 0)?;
        Ok(msg)
    }

    /// Parse more wire bytes into this instance, following protobuf merge
    /// semantics: scalars overwrite, repeated fields and maps append, and
    /// sub-messages merge recursively.
    pub fn merge(&mut self, buf: impl Into<Bytes>) -> Result<(), DecodeError> {
        codec::decode::merge_message(self, buf.into(), &DecodeOptions::default(), 0)
    }

    // ---- JSON codec ----

    /// Render as a proto3 JSON string.
    pub fn to_json(&self, options: &JsonOptions) -> Result<String, JsonError> {
        crate::json::to_string(self, options)
    }

    /// Render as a nested mapping (the dict form of the JSON codec).
    pub fn to_dict(&self, options: &JsonOptions) -> Result<serde_json::Value, JsonError> {
        crate::json::emit::message_to_value(self, options)
    }

    /// Parse an instance from its proto3 JSON string form.
    pub fn from_json(
        desc: &'static MessageDescriptor,
        json: &str,
    ) -> Result<Message, JsonError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_dict(desc, &value)
    }

    /// Parse an instance from a nested mapping.
    pub fn from_dict(
        desc: &'static MessageDescriptor,
        dict: &serde_json::Value,
    ) -> Result<Message, JsonError> {
        crate::json::parse::message_from_value(desc, dict)
    }

    // ---- internal storage helpers ----

    fn unknown_field(&self, name: &str) -> ValueError {
        ValueError::UnknownField {
            message: self.desc.full_name().to_owned(),
            name: name.to_owned(),
        }
    }

    /// Store a value, maintaining the oneof group invariant: at most one
    /// member of a group holds storage, and the marker names it.
    pub(crate) fn store(&mut self, field: &FieldDescriptor, value: Value) {
        if let Some(group) = field.oneof {
            if let Some(oneof) = self.desc.oneof_by_name(group) {
                for member in self.desc.oneof_members(oneof) {
                    if member.number != field.number {
                        self.fields.remove(&member.number);
                    }
                }
            }
            self.oneof_active.insert(group, field.number);
        }
        self.fields.insert(field.number, value);
    }

    /// The list storage for a repeated field, created on first use.
    pub(crate) fn list_mut(&mut self, field: &FieldDescriptor) -> &mut Vec<Value> {
        let slot = self
            .fields
            .entry(field.number)
            .or_insert_with(|| Value::List(Vec::new()));
        if !matches!(slot, Value::List(_)) {
            *slot = Value::List(Vec::new());
        }
        match slot {
            Value::List(items) => items,
            _ => unreachable!("repeated storage holds a list"),
        }
    }

    /// The map storage for a map field, created on first use.
    pub(crate) fn map_mut(&mut self, field: &FieldDescriptor) -> &mut BTreeMap<MapKey, Value> {
        let slot = self
            .fields
            .entry(field.number)
            .or_insert_with(|| Value::Map(BTreeMap::new()));
        if !matches!(slot, Value::Map(_)) {
            *slot = Value::Map(BTreeMap::new());
        }
        match slot {
            Value::Map(entries) => entries,
            _ => unreachable!("map storage holds a map"),
        }
    }
}

/// Field-wise equality.
///
/// Two instances are equal iff every field reads equal (a field stored at its
/// default compares equal to an unset field), each oneof group is inactive in
/// both or active on the same member, and the unknown-field bytes match.
/// Presence is significant for singular sub-message fields.
impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        if self.desc.full_name() != other.desc.full_name() {
            return false;
        }
        if self.unknown != other.unknown {
            return false;
        }
        if self.oneof_active != other.oneof_active {
            return false;
        }

        for field in self.desc.fields() {
            let lhs = self.fields.get(&field.number);
            let rhs = other.fields.get(&field.number);
            let equal = match (field.cardinality, field.kind) {
                (Cardinality::Singular, Kind::Message(_)) => lhs == rhs,
                _ => {
                    let default = Value::default_of_field(field);
                    lhs.unwrap_or(&default) == rhs.unwrap_or(&default)
                }
            };
            if !equal {
                return false;
            }
        }
        true
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct(self.desc.full_name());
        for field in self.desc.fields() {
            if let Some(value) = self.fields.get(&field.number) {
                dbg.field(field.name, value);
            }
        }
        if !self.unknown.is_empty() {
            dbg.field("<unknown>", &format_args!("{} bytes", self.unknown.len()));
        }
        dbg.finish()
    }
}
