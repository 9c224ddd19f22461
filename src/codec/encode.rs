//! Serialization: declaration order, default elision, packed runs, maps.
//!
//! Sizing is two-pass: [`encoded_message_len`] computes the exact output
//! length so nested length prefixes never need temporary buffers.

use bytes::BufMut;

use crate::codec::scalar;
use crate::descriptor::{Cardinality, FieldDescriptor, Kind};
use crate::leb128::LebCodec;
use crate::message::Message;
use crate::value::{MapKey, Value};
use crate::wire::{self, WireType};

/// Serialize a message body (no outer length prefix).
///
/// Known fields are emitted in declaration order, then the preserved
/// unknown-field bytes verbatim.
pub(crate) fn encode_message<B: BufMut>(msg: &Message, buf: &mut B) {
    for field in msg.desc.fields() {
        let Some(value) = msg.fields.get(&field.number) else {
            continue;
        };
        match field.cardinality {
            Cardinality::Singular => {
                if !singular_on_wire(msg, field, value) {
                    continue;
                }
                wire::encode_key(field.kind.wire_type(), field.number, buf);
                scalar::encode_value(field.kind, value, buf);
            }
            Cardinality::Repeated => {
                let Value::List(items) = value else { continue };
                if items.is_empty() {
                    continue;
                }
                if field.is_packed() {
                    wire::encode_key(WireType::Len, field.number, buf);
                    let run: usize = items
                        .iter()
                        .map(|item| scalar::encoded_value_len(field.kind, item))
                        .sum();
                    (run as u64).encode_leb128(buf);
                    for item in items {
                        scalar::encode_value(field.kind, item, buf);
                    }
                } else {
                    for item in items {
                        wire::encode_key(field.kind.wire_type(), field.number, buf);
                        scalar::encode_value(field.kind, item, buf);
                    }
                }
            }
            Cardinality::Map => {
                let (Value::Map(entries), Some(key_kind)) = (value, field.map_key) else {
                    continue;
                };
                for (key, entry_value) in entries {
                    wire::encode_key(WireType::Len, field.number, buf);
                    encode_map_entry(key_kind, field.kind, key, entry_value, buf);
                }
            }
        }
    }

    buf.put_slice(&msg.unknown);
}

/// The exact number of bytes [`encode_message`] will write.
pub(crate) fn encoded_message_len(msg: &Message) -> usize {
    let mut len = 0;
    for field in msg.desc.fields() {
        let Some(value) = msg.fields.get(&field.number) else {
            continue;
        };
        match field.cardinality {
            Cardinality::Singular => {
                if !singular_on_wire(msg, field, value) {
                    continue;
                }
                len += wire::encoded_key_len(field.number)
                    + scalar::encoded_value_len(field.kind, value);
            }
            Cardinality::Repeated => {
                let Value::List(items) = value else { continue };
                if items.is_empty() {
                    continue;
                }
                if field.is_packed() {
                    let run: usize = items
                        .iter()
                        .map(|item| scalar::encoded_value_len(field.kind, item))
                        .sum();
                    len += wire::encoded_key_len(field.number)
                        + (run as u64).encoded_leb128_len()
                        + run;
                } else {
                    let key_len = wire::encoded_key_len(field.number);
                    len += items
                        .iter()
                        .map(|item| key_len + scalar::encoded_value_len(field.kind, item))
                        .sum::<usize>();
                }
            }
            Cardinality::Map => {
                let (Value::Map(entries), Some(key_kind)) = (value, field.map_key) else {
                    continue;
                };
                let key_len = wire::encoded_key_len(field.number);
                len += entries
                    .iter()
                    .map(|(key, entry_value)| {
                        key_len + encoded_map_entry_len(key_kind, field.kind, key, entry_value)
                    })
                    .sum::<usize>();
            }
        }
    }
    len + msg.unknown.len()
}

/// Whether a stored singular value rides the wire.
///
/// Defaults are elided, except that the active member of a oneof group is
/// always emitted to preserve set-ness, and present sub-messages are always
/// emitted (their presence is the information).
fn singular_on_wire(msg: &Message, field: &FieldDescriptor, value: &Value) -> bool {
    if matches!(field.kind, Kind::Message(_)) {
        return true;
    }
    if !value.is_default() {
        return true;
    }
    field
        .oneof
        .is_some_and(|group| msg.oneof_active.get(group) == Some(&field.number))
}

/// Encode one map entry as its synthetic two-field message:
/// `<entry_len> <key_tag> <key> <value_tag> <value>`.
fn encode_map_entry<B: BufMut>(
    key_kind: Kind,
    value_kind: Kind,
    key: &MapKey,
    value: &Value,
    buf: &mut B,
) {
    let key_field_len = wire::encoded_key_len(1) + scalar::encoded_map_key_len(key_kind, key);
    let value_field_len = wire::encoded_key_len(2) + scalar::encoded_value_len(value_kind, value);
    let entry_len = key_field_len + value_field_len;

    (entry_len as u64).encode_leb128(buf);

    wire::encode_key(key_kind.wire_type(), 1, buf);
    scalar::encode_map_key(key_kind, key, buf);

    wire::encode_key(value_kind.wire_type(), 2, buf);
    scalar::encode_value(value_kind, value, buf);
}

/// The encoded length of a map entry (without the outer field key).
fn encoded_map_entry_len(key_kind: Kind, value_kind: Kind, key: &MapKey, value: &Value) -> usize {
    let key_field_len = wire::encoded_key_len(1) + scalar::encoded_map_key_len(key_kind, key);
    let value_field_len = wire::encoded_key_len(2) + scalar::encoded_value_len(value_kind, value);
    let entry_len = key_field_len + value_field_len;
    (entry_len as u64).encoded_leb128_len() + entry_len
}
