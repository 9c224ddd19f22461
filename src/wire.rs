//! Wire format primitives for Google's Protocol Buffers, aka
//! [protobuf](https://protobuf.dev).

use crate::error::DecodeError;
use crate::leb128::LebCodec;

/// Minimum value of a protobuf field number.
pub const MINIMUM_FIELD_NUMBER: u32 = 1;
/// Maximum value of a protobuf field number.
pub const MAXIMUM_FIELD_NUMBER: u32 = (1 << 29) - 1;
/// Field numbers reserved for the protobuf implementation itself.
pub const RESERVED_FIELD_NUMBERS: core::ops::RangeInclusive<u32> = 19000..=19999;

/// Denotes the type of a field in an encoded protobuf message.
///
/// Protobuf messages are a series of key-value records. Each record's key
/// carries a field number and a [`WireType`]; the wire type indicates how
/// large the following payload is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum WireType {
    /// Variable length integer.
    ///
    /// Used for: `int32`, `int64`, `uint32`, `uint64`, `sint32`, `sint64`,
    /// `bool`, `enum`.
    Varint = 0,
    /// 64-bit integer.
    ///
    /// Used for: `fixed64`, `sfixed64`, `double`.
    I64 = 1,
    /// Variable length field.
    ///
    /// Used for: `string`, `bytes`, `message`, packed `repeated` fields.
    Len = 2,
    /// Group start (deprecated, always rejected).
    SGroup = 3,
    /// Group end (deprecated, always rejected).
    EGroup = 4,
    /// 32-bit integer.
    ///
    /// Used for: `fixed32`, `sfixed32`, `float`.
    I32 = 5,
}

impl WireType {
    /// Try to decode a [`WireType`] from the provided raw value.
    #[inline]
    fn try_from_val(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            3 => Ok(WireType::SGroup),
            4 => Ok(WireType::EGroup),
            5 => Ok(WireType::I32),
            _ => Err(DecodeError::InvalidWireType { value }),
        }
    }

    /// Return the raw value for this [`WireType`].
    #[inline]
    pub const fn into_val(self) -> u8 {
        self as u8
    }

    /// True for the deprecated group wire types, which this crate rejects.
    #[inline]
    pub const fn is_group(self) -> bool {
        matches!(self, WireType::SGroup | WireType::EGroup)
    }
}

impl TryFrom<u8> for WireType {
    type Error = DecodeError;

    #[inline]
    fn try_from(value: u8) -> Result<Self, DecodeError> {
        WireType::try_from_val(value)
    }
}

/// Encodes the provided field number and wire type as a protobuf field key.
///
/// Hot path for encoding - called for every field in every message.
#[inline]
pub fn encode_key<B: bytes::BufMut>(wire_type: WireType, number: u32, buf: &mut B) {
    let key = (number << 3) | u32::from(wire_type.into_val());
    key.encode_leb128(buf);
}

/// Returns the encoded length of a field key.
///
/// The wire type lives in the low 3 bits and never changes the length.
#[inline]
pub fn encoded_key_len(number: u32) -> usize {
    (number << 3).encoded_leb128_len()
}

/// Decodes a field key into its wire type and field number.
///
/// Follows the specification from <https://protobuf.dev/programming-guides/encoding>
/// under the "Message Structure" section.
#[inline]
pub fn decode_key<B: bytes::Buf>(buf: &mut B) -> Result<(WireType, u32), DecodeError> {
    if !buf.has_remaining() {
        return Err(DecodeError::InvalidKey {
            reason: "empty buffer",
        });
    }
    let raw = u32::decode_leb128_buf(buf)?;

    let wire_type = WireType::try_from_val((raw & 0b111) as u8)?;
    let number = raw >> 3;
    if number < MINIMUM_FIELD_NUMBER || number > MAXIMUM_FIELD_NUMBER {
        return Err(DecodeError::InvalidKey {
            reason: "field number out of range",
        });
    }

    Ok((wire_type, number))
}

/// Decodes the length prefix for a length-delimited field.
#[inline]
pub fn decode_len<B: bytes::Buf>(buf: &mut B) -> Result<usize, DecodeError> {
    let chunk = buf.chunk();
    // Fast path, most lengths fit in one byte (< 128).
    if !chunk.is_empty() && chunk[0] < 0x80 {
        let len = usize::from(chunk[0]);
        buf.advance(1);
        Ok(len)
    } else {
        let len = u64::decode_leb128_buf(buf)?;
        usize::try_from(len).map_err(|_| DecodeError::LengthOverflow { value: len })
    }
}

/// Skips over a field value based on its wire type.
///
/// Unknown fields are skipped (and captured by the caller) to preserve
/// forwards compatibility; this advances the buffer past the payload.
#[inline]
pub fn skip_field<B: bytes::Buf>(wire_type: WireType, buf: &mut B) -> Result<(), DecodeError> {
    let skip_len = match wire_type {
        WireType::Varint => {
            // Read and discard the varint.
            u64::decode_leb128_buf(buf)?;
            return Ok(());
        }
        WireType::I64 => 8,
        WireType::Len => decode_len(buf)?,
        WireType::I32 => 4,
        WireType::SGroup | WireType::EGroup => {
            return Err(DecodeError::InvalidWireType {
                value: wire_type.into_val(),
            });
        }
    };

    if buf.remaining() < skip_len {
        return Err(DecodeError::UnexpectedEof);
    }
    buf.advance(skip_len);
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{
        decode_key, decode_len, encode_key, encoded_key_len, skip_field, WireType,
        MAXIMUM_FIELD_NUMBER, MINIMUM_FIELD_NUMBER,
    };
    use crate::error::DecodeError;

    #[test]
    fn proptest_key_roundtrips() {
        fn arb_number() -> impl Strategy<Value = u32> {
            MINIMUM_FIELD_NUMBER..=MAXIMUM_FIELD_NUMBER
        }

        fn arb_wiretype() -> impl Strategy<Value = WireType> {
            (0..5u8).prop_map(|val| WireType::try_from(val).expect("known valid"))
        }

        fn test(number: u32, wire_type: WireType) {
            let mut buf = Vec::with_capacity(16);
            encode_key(wire_type, number, &mut buf);
            assert_eq!(buf.len(), encoded_key_len(number));

            let (rnd_wire_type, rnd_number) = decode_key(&mut &buf[..]).unwrap();
            assert_eq!(number, rnd_number);
            assert_eq!(wire_type, rnd_wire_type);
        }

        let strat = (arb_number(), arb_wiretype());
        proptest!(|((number, wire_type) in strat)| test(number, wire_type))
    }

    #[test]
    fn test_all_wire_type_values() {
        for i in u8::MIN..u8::MAX {
            let wire_type = WireType::try_from(i);
            match (i, wire_type) {
                (0, Ok(WireType::Varint))
                | (1, Ok(WireType::I64))
                | (2, Ok(WireType::Len))
                | (3, Ok(WireType::SGroup))
                | (4, Ok(WireType::EGroup))
                | (5, Ok(WireType::I32)) => (),
                (_, Err(_)) => (),
                other => panic!("unexpected value {other:?}"),
            }
        }
    }

    #[test]
    fn test_zero_field_number_rejected() {
        // Key with number 0 and wire type Varint.
        let buf = [0u8];
        assert!(decode_key(&mut &buf[..]).is_err());
    }

    #[test]
    fn test_decode_len() {
        let mut buf = &[0u8][..];
        assert_eq!(decode_len(&mut buf).unwrap(), 0);

        let mut buf = &[127u8][..];
        assert_eq!(decode_len(&mut buf).unwrap(), 127);

        let mut buf = &[0x80, 0x01][..];
        assert_eq!(decode_len(&mut buf).unwrap(), 128);

        let mut buf = &[0xAC, 0x02][..];
        assert_eq!(decode_len(&mut buf).unwrap(), 300);
    }

    #[test]
    fn test_skip_field_varint() {
        let mut buf = &[42u8, 99][..];
        skip_field(WireType::Varint, &mut buf).unwrap();
        assert_eq!(buf, &[99]);

        let mut buf = &[0x80, 0x01, 99][..];
        skip_field(WireType::Varint, &mut buf).unwrap();
        assert_eq!(buf, &[99]);
    }

    #[test]
    fn test_skip_field_fixed() {
        let mut buf = &[1, 2, 3, 4, 99][..];
        skip_field(WireType::I32, &mut buf).unwrap();
        assert_eq!(buf, &[99]);

        let mut buf = &[1, 2, 3, 4, 5, 6, 7, 8, 99][..];
        skip_field(WireType::I64, &mut buf).unwrap();
        assert_eq!(buf, &[99]);
    }

    #[test]
    fn test_skip_field_len() {
        let mut buf = &[3, 1, 2, 3, 99][..];
        skip_field(WireType::Len, &mut buf).unwrap();
        assert_eq!(buf, &[99]);

        let mut buf = &[0, 99][..];
        skip_field(WireType::Len, &mut buf).unwrap();
        assert_eq!(buf, &[99]);
    }

    #[test]
    fn test_skip_field_truncated() {
        let mut buf = &[5, 1, 2][..];
        assert_eq!(
            skip_field(WireType::Len, &mut buf),
            Err(DecodeError::UnexpectedEof)
        );
    }

    #[test]
    fn test_skip_field_groups_error() {
        let mut buf = &[0u8][..];
        assert!(skip_field(WireType::SGroup, &mut buf).is_err());
        assert!(skip_field(WireType::EGroup, &mut buf).is_err());
    }
}
