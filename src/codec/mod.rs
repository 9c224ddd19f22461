//! Encoding and decoding for the protobuf wire format.
//!
//! The codec is driven entirely by a message's [`MessageDescriptor`]: the
//! encoder walks fields in declaration order, eliding defaults and packing
//! repeated scalars; the decoder dispatches on field numbers, preserving
//! unknown fields verbatim and applying proto3 merge semantics.
//!
//! [`MessageDescriptor`]: crate::descriptor::MessageDescriptor

pub(crate) mod decode;
pub(crate) mod encode;
pub(crate) mod scalar;

/// Depth bound applied to nested messages by default.
pub const DEFAULT_RECURSION_LIMIT: u32 = 100;

/// Resource bounds applied while parsing.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Maximum nesting depth before parsing fails with
    /// [`DecodeError::RecursionLimitExceeded`].
    ///
    /// [`DecodeError::RecursionLimitExceeded`]: crate::error::DecodeError::RecursionLimitExceeded
    pub recursion_limit: u32,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}
