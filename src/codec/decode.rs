//! Parsing: last-wins scalars, sub-message merge, oneof reset, packed and
//! unpacked acceptance, unknown-field capture, and the recursion bound.

use bytes::Bytes;

use crate::codec::{scalar, DecodeOptions};
use crate::descriptor::{Cardinality, FieldDescriptor, Kind, MessageDescriptor};
use crate::error::DecodeError;
use crate::message::Message;
use crate::value::{MapKey, Value};
use crate::wire::{self, WireType};

/// Decode a fresh message from its wire encoding.
pub(crate) fn decode_message(
    desc: &'static MessageDescriptor,
    data: Bytes,
    options: &DecodeOptions,
    depth: u32,
) -> Result<Message, DecodeError> {
    let mut msg = Message::new(desc);
    merge_message(&mut msg, data, options, depth)?;
    Ok(msg)
}

/// Decode wire bytes into an existing instance, applying proto3 merge
/// semantics. EOF terminates successfully; everything in `data` is consumed.
pub(crate) fn merge_message(
    msg: &mut Message,
    data: Bytes,
    options: &DecodeOptions,
    depth: u32,
) -> Result<(), DecodeError> {
    if depth > options.recursion_limit {
        return Err(DecodeError::RecursionLimitExceeded {
            limit: options.recursion_limit,
        });
    }

    let desc = msg.desc;
    let mut slice = &data[..];
    while !slice.is_empty() {
        let record_start = data.len() - slice.len();
        let (wire_type, number) = wire::decode_key(&mut slice)?;
        if wire_type.is_group() {
            return Err(DecodeError::InvalidWireType {
                value: wire_type.into_val(),
            });
        }

        match desc.field_by_number(number) {
            Some(field) => {
                decode_field(msg, field, wire_type, &data, &mut slice, options, depth)?;
            }
            None => {
                // Unknown field: capture the whole record (key included)
                // verbatim for re-emission.
                wire::skip_field(wire_type, &mut slice)?;
                let record_end = data.len() - slice.len();
                msg.unknown.extend_from_slice(&data[record_start..record_end]);
            }
        }
    }

    msg.from_wire = true;
    Ok(())
}

fn decode_field(
    msg: &mut Message,
    field: &FieldDescriptor,
    wire_type: WireType,
    data: &Bytes,
    slice: &mut &[u8],
    options: &DecodeOptions,
    depth: u32,
) -> Result<(), DecodeError> {
    match field.cardinality {
        Cardinality::Singular => {
            expect_wire_type(field, field.kind.wire_type(), wire_type)?;
            match field.kind {
                // Duplicate singular sub-messages merge; everything else is
                // last-one-wins. A oneof member never merges: parsing it
                // replaces the group's value outright.
                Kind::Message(desc_ref) if field.oneof.is_none() => {
                    let chunk = take_len_prefixed(data, slice)?;
                    match msg.fields.get_mut(&field.number) {
                        Some(Value::Message(existing)) => {
                            merge_message(existing, chunk, options, depth + 1)?;
                        }
                        _ => {
                            let nested = decode_message(desc_ref(), chunk, options, depth + 1)?;
                            msg.store(field, Value::Message(nested));
                        }
                    }
                }
                _ => {
                    let value = scalar::decode_value(field.kind, data, slice, options, depth)?;
                    msg.store(field, value);
                }
            }
        }
        Cardinality::Repeated => {
            if wire_type == WireType::Len && field.kind.is_packable() {
                // Packed run: the concatenated element encodings. Accepted
                // regardless of the descriptor's packed flag.
                let chunk = take_len_prefixed(data, slice)?;
                let mut chunk_slice = &chunk[..];
                let mut items = Vec::new();
                while !chunk_slice.is_empty() {
                    items.push(scalar::decode_value(
                        field.kind,
                        &chunk,
                        &mut chunk_slice,
                        options,
                        depth,
                    )?);
                }
                msg.list_mut(field).append(&mut items);
            } else if wire_type == field.kind.wire_type() {
                // One unpacked element.
                let value = scalar::decode_value(field.kind, data, slice, options, depth)?;
                msg.list_mut(field).push(value);
            } else {
                return Err(mismatch(field, wire_type));
            }
        }
        Cardinality::Map => {
            expect_wire_type(field, WireType::Len, wire_type)?;
            let (key, value) = decode_map_entry(field, data, slice, options, depth)?;
            msg.map_mut(field).insert(key, value);
        }
    }
    Ok(())
}

/// Decode one map entry: a two-field message with `key = 1`, `value = 2`.
/// Either field may be absent, defaulting to the zero of its type; a
/// duplicate key inside the entry follows last-one-wins like any scalar.
fn decode_map_entry(
    field: &FieldDescriptor,
    data: &Bytes,
    slice: &mut &[u8],
    options: &DecodeOptions,
    depth: u32,
) -> Result<(MapKey, Value), DecodeError> {
    let key_kind = field.map_key.unwrap_or(Kind::String);

    let chunk = take_len_prefixed(data, slice)?;
    let mut entry_slice = &chunk[..];
    let mut key = MapKey::default_of(key_kind);
    let mut value = Value::default_of(field.kind);

    while !entry_slice.is_empty() {
        let (wire_type, number) = wire::decode_key(&mut entry_slice)?;
        match number {
            1 => {
                expect_wire_type(field, key_kind.wire_type(), wire_type)?;
                let decoded =
                    scalar::decode_value(key_kind, &chunk, &mut entry_slice, options, depth)?;
                if let Some(decoded_key) = MapKey::from_value(decoded) {
                    key = decoded_key;
                }
            }
            2 => {
                expect_wire_type(field, field.kind.wire_type(), wire_type)?;
                value = scalar::decode_value(field.kind, &chunk, &mut entry_slice, options, depth)?;
            }
            _ => wire::skip_field(wire_type, &mut entry_slice)?,
        }
    }

    Ok((key, value))
}

/// Read a length prefix and slice that many bytes out of `data` zero-copy.
///
/// `slice` must be a cursor into `data`.
pub(crate) fn take_len_prefixed(data: &Bytes, slice: &mut &[u8]) -> Result<Bytes, DecodeError> {
    let len = wire::decode_len(slice)?;
    if slice.len() < len {
        return Err(DecodeError::UnexpectedEof);
    }
    let offset = data.len() - slice.len();
    let chunk = data.slice(offset..offset + len);
    *slice = &slice[len..];
    Ok(chunk)
}

#[inline]
fn expect_wire_type(
    field: &FieldDescriptor,
    expected: WireType,
    actual: WireType,
) -> Result<(), DecodeError> {
    if expected == actual {
        Ok(())
    } else {
        Err(mismatch(field, actual))
    }
}

fn mismatch(field: &FieldDescriptor, actual: WireType) -> DecodeError {
    DecodeError::WireTypeMismatch {
        field: field.number,
        expected: if field.cardinality == Cardinality::Map {
            WireType::Len.into_val()
        } else {
            field.kind.wire_type().into_val()
        },
        actual: actual.into_val(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use bytes::Bytes;

    use crate::codec::DecodeOptions;
    use crate::descriptor::{FieldDescriptor, Kind, MessageDescriptor};
    use crate::error::DecodeError;
    use crate::message::Message;
    use crate::value::{MapKey, Value};

    fn greeting() -> &'static MessageDescriptor {
        static DESC: LazyLock<MessageDescriptor> = LazyLock::new(|| {
            MessageDescriptor::new(
                "test.Greeting",
                vec![FieldDescriptor::new(1, "message", Kind::String)],
            )
            .expect("valid descriptor")
        });
        &DESC
    }

    fn numbers() -> &'static MessageDescriptor {
        static DESC: LazyLock<MessageDescriptor> = LazyLock::new(|| {
            MessageDescriptor::new(
                "test.Numbers",
                vec![FieldDescriptor::new(1, "values", Kind::Uint32).repeated()],
            )
            .expect("valid descriptor")
        });
        &DESC
    }

    fn scores() -> &'static MessageDescriptor {
        static DESC: LazyLock<MessageDescriptor> = LazyLock::new(|| {
            MessageDescriptor::new(
                "test.Scores",
                vec![FieldDescriptor::new(1, "scores", Kind::Int32).map(Kind::String)],
            )
            .expect("valid descriptor")
        });
        &DESC
    }

    fn nested() -> &'static MessageDescriptor {
        static DESC: LazyLock<MessageDescriptor> = LazyLock::new(|| {
            MessageDescriptor::new(
                "test.Nested",
                vec![FieldDescriptor::new(1, "inner", Kind::Message(nested))],
            )
            .expect("valid descriptor")
        });
        &DESC
    }

    #[test]
    fn test_parse_string_field() {
        let msg = Message::decode(greeting(), vec![0x0A, 0x04, 0x48, 0x65, 0x79, 0x21]).unwrap();
        assert_eq!(msg.get("message"), Some(&Value::String("Hey!".into())));
        assert!(msg.was_serialized());
    }

    #[test]
    fn test_packed_and_unpacked_parse_equal() {
        let packed =
            Message::decode(numbers(), vec![0x0A, 0x04, 0x01, 0xAC, 0x02, 0x80, 0x01]).unwrap();
        let unpacked =
            Message::decode(numbers(), vec![0x08, 0x01, 0x08, 0xAC, 0x02, 0x08, 0x80, 0x01])
                .unwrap();
        assert_eq!(packed, unpacked);
        assert_eq!(
            packed.get("values"),
            Some(&Value::List(vec![
                Value::U32(1),
                Value::U32(300),
                Value::U32(128)
            ]))
        );
    }

    #[test]
    fn test_last_occurrence_wins() {
        // message = "a", then message = "b".
        let bytes = vec![0x0A, 0x01, b'a', 0x0A, 0x01, b'b'];
        let msg = Message::decode(greeting(), bytes).unwrap();
        assert_eq!(msg.get("message"), Some(&Value::String("b".into())));
    }

    #[test]
    fn test_map_entry_defaults_and_overwrite() {
        // Empty entry: both key and value default.
        let msg = Message::decode(scores(), vec![0x0A, 0x00]).unwrap();
        let map = msg.get("scores").unwrap().as_map().unwrap();
        assert_eq!(map.get(&MapKey::from("")), Some(&Value::I32(0)));

        // Same key twice: the later entry wins.
        let bytes = vec![
            0x0A, 0x07, 0x0A, 0x01, b'a', 0x10, 0x64, // {"a": 100}
            0x0A, 0x08, 0x0A, 0x01, b'a', 0x10, 0xC8, 0x01, // {"a": 200}
        ];
        let msg = Message::decode(scores(), bytes).unwrap();
        let map = msg.get("scores").unwrap().as_map().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&MapKey::from("a")), Some(&Value::I32(200)));
    }

    #[test]
    fn test_unknown_fields_captured_verbatim() {
        // Known message="x" plus unknown field 99 (varint 42).
        let mut bytes = vec![0x0A, 0x01, b'x'];
        bytes.extend_from_slice(&[0x98, 0x06, 42]); // key = (99 << 3) | 0
        let msg = Message::decode(greeting(), Bytes::from(bytes.clone())).unwrap();

        assert_eq!(msg.unknown_fields(), &[0x98, 0x06, 42]);
        assert_eq!(msg.encode_to_vec(), bytes);
    }

    #[test]
    fn test_group_wire_types_rejected() {
        // Field 1, wire type 3 (SGroup).
        let err = Message::decode(greeting(), vec![0x0B]).unwrap_err();
        assert_eq!(err, DecodeError::InvalidWireType { value: 3 });
    }

    #[test]
    fn test_truncated_length_delimited() {
        let err = Message::decode(greeting(), vec![0x0A, 0x05, b'a', b'b']).unwrap_err();
        assert_eq!(err, DecodeError::UnexpectedEof);
    }

    #[test]
    fn test_wire_type_mismatch_on_known_field() {
        // Field 1 is a string; send it as a varint.
        let err = Message::decode(greeting(), vec![0x08, 0x01]).unwrap_err();
        assert!(matches!(err, DecodeError::WireTypeMismatch { field: 1, .. }));
    }

    #[test]
    fn test_recursion_limit() {
        // Build N levels of nesting: each level is field 1 wrapping the next.
        fn wrap(inner: Vec<u8>) -> Vec<u8> {
            let mut out = vec![0x0A, inner.len() as u8];
            out.extend(inner);
            out
        }

        let mut bytes = Vec::new();
        for _ in 0..5 {
            bytes = wrap(bytes);
        }
        let options = DecodeOptions { recursion_limit: 3 };
        let err = Message::decode_with_options(nested(), bytes.clone(), &options).unwrap_err();
        assert_eq!(err, DecodeError::RecursionLimitExceeded { limit: 3 });

        let options = DecodeOptions { recursion_limit: 10 };
        assert!(Message::decode_with_options(nested(), bytes, &options).is_ok());
    }

    #[test]
    fn test_singular_message_merge() {
        // Two occurrences of the same sub-message field merge.
        static OUTER: LazyLock<MessageDescriptor> = LazyLock::new(|| {
            MessageDescriptor::new(
                "test.Outer",
                vec![FieldDescriptor::new(1, "pair", Kind::Message(pair))],
            )
            .expect("valid descriptor")
        });
        static PAIR: LazyLock<MessageDescriptor> = LazyLock::new(|| {
            MessageDescriptor::new(
                "test.Pair",
                vec![
                    FieldDescriptor::new(1, "first", Kind::Int32),
                    FieldDescriptor::new(2, "second", Kind::Int32),
                ],
            )
            .expect("valid descriptor")
        });
        fn pair() -> &'static MessageDescriptor {
            &PAIR
        }

        // pair{first=1} ++ pair{second=2} => pair{first=1, second=2}
        let bytes = vec![0x0A, 0x02, 0x08, 0x01, 0x0A, 0x02, 0x10, 0x02];
        let msg = Message::decode(&*OUTER, bytes).unwrap();
        let inner = msg.get("pair").unwrap().as_message().unwrap();
        assert_eq!(inner.get_or_default("first").unwrap(), Value::I32(1));
        assert_eq!(inner.get_or_default("second").unwrap(), Value::I32(2));
    }
}
