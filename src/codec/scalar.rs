//! Per-kind value encoding and decoding, including the zig-zag transform.

use bytes::{Buf, BufMut, Bytes};

use crate::codec::DecodeOptions;
use crate::descriptor::Kind;
use crate::error::DecodeError;
use crate::leb128::LebCodec;
use crate::value::{MapKey, Value};

#[inline]
pub(crate) const fn zigzag_encode_32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

#[inline]
pub(crate) const fn zigzag_decode_32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ (-((n & 1) as i32))
}

#[inline]
pub(crate) const fn zigzag_encode_64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

#[inline]
pub(crate) const fn zigzag_decode_64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}

/// Encode one value payload (no field key) for the given kind.
///
/// The caller guarantees the value's variant matches `kind` (storage is
/// kind-checked on every write path); a mismatched variant encodes as the
/// kind's zero value.
pub(crate) fn encode_value<B: BufMut>(kind: Kind, value: &Value, buf: &mut B) {
    match kind {
        // Negative int32 values are sign-extended to 64 bits on the wire.
        Kind::Int32 => {
            (i64::from(value.as_i32().unwrap_or(0)) as u64).encode_leb128(buf);
        }
        Kind::Int64 => {
            (value.as_i64().unwrap_or(0) as u64).encode_leb128(buf);
        }
        Kind::Uint32 => {
            value.as_u32().unwrap_or(0).encode_leb128(buf);
        }
        Kind::Uint64 => {
            value.as_u64().unwrap_or(0).encode_leb128(buf);
        }
        Kind::Sint32 => {
            zigzag_encode_32(value.as_i32().unwrap_or(0)).encode_leb128(buf);
        }
        Kind::Sint64 => {
            zigzag_encode_64(value.as_i64().unwrap_or(0)).encode_leb128(buf);
        }
        Kind::Bool => buf.put_u8(u8::from(value.as_bool().unwrap_or(false))),
        Kind::Enum(_) => {
            (i64::from(value.as_i32().unwrap_or(0)) as u64).encode_leb128(buf);
        }
        Kind::Fixed32 => buf.put_u32_le(value.as_u32().unwrap_or(0)),
        Kind::Fixed64 => buf.put_u64_le(value.as_u64().unwrap_or(0)),
        Kind::Sfixed32 => buf.put_i32_le(value.as_i32().unwrap_or(0)),
        Kind::Sfixed64 => buf.put_i64_le(value.as_i64().unwrap_or(0)),
        Kind::Float => buf.put_f32_le(value.as_f32().unwrap_or(0.0)),
        Kind::Double => buf.put_f64_le(value.as_f64().unwrap_or(0.0)),
        Kind::String => {
            let s = value.as_str().unwrap_or("");
            (s.len() as u64).encode_leb128(buf);
            buf.put_slice(s.as_bytes());
        }
        Kind::Bytes => {
            let b: &[u8] = value.as_bytes().map(|b| b.as_ref()).unwrap_or(&[]);
            (b.len() as u64).encode_leb128(buf);
            buf.put_slice(b);
        }
        Kind::Message(_) => match value {
            Value::Message(msg) => {
                let len = msg.encoded_len();
                (len as u64).encode_leb128(buf);
                msg.encode(buf);
            }
            _ => {
                0u64.encode_leb128(buf);
            }
        },
    }
}

/// The number of bytes [`encode_value`] will write.
pub(crate) fn encoded_value_len(kind: Kind, value: &Value) -> usize {
    match kind {
        Kind::Int32 => (i64::from(value.as_i32().unwrap_or(0)) as u64).encoded_leb128_len(),
        Kind::Int64 => (value.as_i64().unwrap_or(0) as u64).encoded_leb128_len(),
        Kind::Uint32 => value.as_u32().unwrap_or(0).encoded_leb128_len(),
        Kind::Uint64 => value.as_u64().unwrap_or(0).encoded_leb128_len(),
        Kind::Sint32 => zigzag_encode_32(value.as_i32().unwrap_or(0)).encoded_leb128_len(),
        Kind::Sint64 => zigzag_encode_64(value.as_i64().unwrap_or(0)).encoded_leb128_len(),
        Kind::Bool => 1,
        Kind::Enum(_) => (i64::from(value.as_i32().unwrap_or(0)) as u64).encoded_leb128_len(),
        Kind::Fixed32 | Kind::Sfixed32 | Kind::Float => 4,
        Kind::Fixed64 | Kind::Sfixed64 | Kind::Double => 8,
        Kind::String => {
            let len = value.as_str().map(str::len).unwrap_or(0);
            (len as u64).encoded_leb128_len() + len
        }
        Kind::Bytes => {
            let len = value.as_bytes().map(Bytes::len).unwrap_or(0);
            (len as u64).encoded_leb128_len() + len
        }
        Kind::Message(_) => {
            let len = match value {
                Value::Message(msg) => msg.encoded_len(),
                _ => 0,
            };
            (len as u64).encoded_leb128_len() + len
        }
    }
}

/// Decode one value payload of the given kind.
///
/// `slice` is a cursor into `data`; the invariant lets length-delimited
/// payloads be sliced out of `data` without copying.
pub(crate) fn decode_value(
    kind: Kind,
    data: &Bytes,
    slice: &mut &[u8],
    options: &DecodeOptions,
    depth: u32,
) -> Result<Value, DecodeError> {
    let value = match kind {
        // Varint integers tolerate the full 10-byte form and truncate, the
        // same way every conformant decoder handles sign-extended int32.
        Kind::Int32 => Value::I32(u64::decode_leb128_buf(slice)? as i32),
        Kind::Int64 => Value::I64(u64::decode_leb128_buf(slice)? as i64),
        Kind::Uint32 => Value::U32(u64::decode_leb128_buf(slice)? as u32),
        Kind::Uint64 => Value::U64(u64::decode_leb128_buf(slice)?),
        Kind::Sint32 => Value::I32(zigzag_decode_32(u64::decode_leb128_buf(slice)? as u32)),
        Kind::Sint64 => Value::I64(zigzag_decode_64(u64::decode_leb128_buf(slice)?)),
        Kind::Bool => Value::Bool(u64::decode_leb128_buf(slice)? != 0),
        Kind::Enum(_) => Value::Enum(u64::decode_leb128_buf(slice)? as i32),
        Kind::Fixed32 => {
            check_remaining(slice, 4)?;
            Value::U32(slice.get_u32_le())
        }
        Kind::Fixed64 => {
            check_remaining(slice, 8)?;
            Value::U64(slice.get_u64_le())
        }
        Kind::Sfixed32 => {
            check_remaining(slice, 4)?;
            Value::I32(slice.get_i32_le())
        }
        Kind::Sfixed64 => {
            check_remaining(slice, 8)?;
            Value::I64(slice.get_i64_le())
        }
        Kind::Float => {
            check_remaining(slice, 4)?;
            Value::F32(slice.get_f32_le())
        }
        Kind::Double => {
            check_remaining(slice, 8)?;
            Value::F64(slice.get_f64_le())
        }
        Kind::String => {
            let chunk = super::decode::take_len_prefixed(data, slice)?;
            let s = String::from_utf8(chunk.to_vec()).map_err(|_| DecodeError::InvalidUtf8)?;
            Value::String(s)
        }
        Kind::Bytes => Value::Bytes(super::decode::take_len_prefixed(data, slice)?),
        Kind::Message(desc) => {
            let chunk = super::decode::take_len_prefixed(data, slice)?;
            Value::Message(super::decode::decode_message(
                desc(),
                chunk,
                options,
                depth + 1,
            )?)
        }
    };
    Ok(value)
}

/// Encode a map key payload (no field key).
pub(crate) fn encode_map_key<B: BufMut>(kind: Kind, key: &MapKey, buf: &mut B) {
    match key {
        MapKey::Bool(v) => buf.put_u8(u8::from(*v)),
        MapKey::I32(v) => match kind {
            Kind::Sint32 => {
                zigzag_encode_32(*v).encode_leb128(buf);
            }
            Kind::Sfixed32 => buf.put_i32_le(*v),
            _ => {
                (i64::from(*v) as u64).encode_leb128(buf);
            }
        },
        MapKey::I64(v) => match kind {
            Kind::Sint64 => {
                zigzag_encode_64(*v).encode_leb128(buf);
            }
            Kind::Sfixed64 => buf.put_i64_le(*v),
            _ => {
                (*v as u64).encode_leb128(buf);
            }
        },
        MapKey::U32(v) => match kind {
            Kind::Fixed32 => buf.put_u32_le(*v),
            _ => {
                v.encode_leb128(buf);
            }
        },
        MapKey::U64(v) => match kind {
            Kind::Fixed64 => buf.put_u64_le(*v),
            _ => {
                v.encode_leb128(buf);
            }
        },
        MapKey::String(s) => {
            (s.len() as u64).encode_leb128(buf);
            buf.put_slice(s.as_bytes());
        }
    }
}

/// The number of bytes [`encode_map_key`] will write.
pub(crate) fn encoded_map_key_len(kind: Kind, key: &MapKey) -> usize {
    match key {
        MapKey::Bool(_) => 1,
        MapKey::I32(v) => match kind {
            Kind::Sint32 => zigzag_encode_32(*v).encoded_leb128_len(),
            Kind::Sfixed32 => 4,
            _ => (i64::from(*v) as u64).encoded_leb128_len(),
        },
        MapKey::I64(v) => match kind {
            Kind::Sint64 => zigzag_encode_64(*v).encoded_leb128_len(),
            Kind::Sfixed64 => 8,
            _ => (*v as u64).encoded_leb128_len(),
        },
        MapKey::U32(v) => match kind {
            Kind::Fixed32 => 4,
            _ => v.encoded_leb128_len(),
        },
        MapKey::U64(v) => match kind {
            Kind::Fixed64 => 8,
            _ => v.encoded_leb128_len(),
        },
        MapKey::String(s) => (s.len() as u64).encoded_leb128_len() + s.len(),
    }
}

#[inline]
fn check_remaining(slice: &[u8], needed: usize) -> Result<(), DecodeError> {
    if slice.len() < needed {
        return Err(DecodeError::UnexpectedEof);
    }
    Ok(())
}
