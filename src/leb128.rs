//! LEB128 variable-length integer encoding/decoding.

use crate::error::DecodeError;

/// Types with a LEB128 wire form.
pub trait LebCodec: Sized {
    /// Maximum number of bytes a value of this type can occupy on the wire.
    const MAX_LEB_BYTES: usize;

    /// Decode a LEB128 integer from the front of `buf`, advancing past it.
    fn decode_leb128_buf<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError>;

    /// Encode `self` as a LEB128 integer into the provided buffer.
    ///
    /// Returns the number of bytes written.
    fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize;

    /// The number of bytes [`LebCodec::encode_leb128`] will write.
    fn encoded_leb128_len(self) -> usize;
}

impl LebCodec for u64 {
    const MAX_LEB_BYTES: usize = 10;

    #[inline]
    fn decode_leb128_buf<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        // Fast path: single-byte varints dominate real messages.
        let chunk = buf.chunk();
        if !chunk.is_empty() && chunk[0] < 0x80 {
            let value = u64::from(chunk[0]);
            buf.advance(1);
            return Ok(value);
        }

        let mut value = 0u64;
        for i in 0..Self::MAX_LEB_BYTES {
            if !buf.has_remaining() {
                return Err(DecodeError::UnexpectedEof);
            }
            let byte = buf.get_u8();
            // The tenth byte carries only the final bit of a u64.
            if i == Self::MAX_LEB_BYTES - 1 && byte > 0x01 {
                return Err(DecodeError::InvalidVarint);
            }
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte < 0x80 {
                return Ok(value);
            }
        }
        Err(DecodeError::InvalidVarint)
    }

    #[inline]
    fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize {
        let mut value = self;
        let mut written = 0;
        loop {
            written += 1;
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                buf.put_u8(byte);
                return written;
            }
            buf.put_u8(byte | 0x80);
        }
    }

    /// LEB128 encodes 7 bits per byte, so the length is
    /// `ceil(significant_bits / 7)` with a minimum of 1 byte for zero.
    #[inline]
    fn encoded_leb128_len(self) -> usize {
        let bits = 64 - usize::try_from(self.leading_zeros()).unwrap_or(0);
        core::cmp::max(1, bits.div_ceil(7))
    }
}

impl LebCodec for u32 {
    const MAX_LEB_BYTES: usize = 5;

    #[inline]
    fn decode_leb128_buf<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        let chunk = buf.chunk();
        if !chunk.is_empty() && chunk[0] < 0x80 {
            let value = u32::from(chunk[0]);
            buf.advance(1);
            return Ok(value);
        }

        let mut value = 0u32;
        for i in 0..Self::MAX_LEB_BYTES {
            if !buf.has_remaining() {
                return Err(DecodeError::UnexpectedEof);
            }
            let byte = buf.get_u8();
            // The fifth byte carries only the top four bits of a u32.
            if i == Self::MAX_LEB_BYTES - 1 && byte > 0x0f {
                return Err(DecodeError::InvalidVarint);
            }
            value |= u32::from(byte & 0x7f) << (7 * i);
            if byte < 0x80 {
                return Ok(value);
            }
        }
        Err(DecodeError::InvalidVarint)
    }

    #[inline]
    fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize {
        let mut value = self;
        let mut written = 0;
        loop {
            written += 1;
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                buf.put_u8(byte);
                return written;
            }
            buf.put_u8(byte | 0x80);
        }
    }

    #[inline]
    fn encoded_leb128_len(self) -> usize {
        let bits = 32 - usize::try_from(self.leading_zeros()).unwrap_or(0);
        core::cmp::max(1, bits.div_ceil(7))
    }
}
