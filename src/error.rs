//! Error types for wire decoding, JSON conversion, and descriptor construction.

use thiserror::Error;

/// Errors raised while decoding the protobuf wire format.
///
/// All of these are detected synchronously; a failed decode never leaves a
/// partially constructed message in the caller's hands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The input ended in the middle of a value.
    #[error("unexpected end of buffer")]
    UnexpectedEof,

    /// A varint ran past its maximum encoded length.
    #[error("invalid leb128 varint")]
    InvalidVarint,

    /// The deprecated group wire types (3 and 4), or a wire type value that
    /// does not exist at all.
    #[error("invalid 'wire type' value: {value}")]
    InvalidWireType { value: u8 },

    /// A field key whose number component is zero or out of range.
    #[error("invalid key: '{reason}'")]
    InvalidKey { reason: &'static str },

    /// A known field arrived with a wire type its declared type cannot use.
    #[error("field {field} expects wire type {expected}, got {actual}")]
    WireTypeMismatch { field: u32, expected: u8, actual: u8 },

    /// A `string` field carried bytes that are not valid UTF-8.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    /// A length prefix larger than the platform can address.
    #[error("length prefix {value} exceeds platform addressable memory")]
    LengthOverflow { value: u64 },

    /// Nested messages exceeded the configured depth bound.
    #[error("message nesting exceeded the recursion limit of {limit}")]
    RecursionLimitExceeded { limit: u32 },
}

/// Errors raised while converting to or from the proto3 JSON mapping.
#[derive(Debug, Error)]
pub enum JsonError {
    /// The input was not structurally valid JSON.
    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    /// A well-formed JSON value of the wrong kind for the target field.
    #[error("field '{field}': expected {expected}, got {got}")]
    WrongType {
        field: String,
        expected: &'static str,
        got: &'static str,
    },

    /// A well-formed JSON value outside the target field's domain, e.g. an
    /// integer overflowing `int32` or a timestamp that is not RFC 3339.
    #[error("field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// The message holds a value the JSON mapping cannot represent, e.g. a
    /// timestamp outside years 0001-9999.
    #[error("{0}")]
    Unrepresentable(String),
}

/// Errors raised while constructing a [`MessageDescriptor`].
///
/// Descriptors come from generated code, so these indicate a schema (or
/// generator) bug rather than bad input data.
///
/// [`MessageDescriptor`]: crate::descriptor::MessageDescriptor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("field number {number} is used more than once")]
    DuplicateFieldNumber { number: u32 },

    #[error("field number {number} is outside the valid range 1..=536870911")]
    FieldNumberOutOfRange { number: u32 },

    #[error("field number {number} falls in the reserved range 19000..=19999")]
    ReservedFieldNumber { number: u32 },

    #[error("field name '{name}' is declared more than once")]
    DuplicateFieldName { name: String },

    #[error("map key type '{kind}' is not an integral, bool, or string type")]
    InvalidMapKeyKind { kind: &'static str },
}

/// Errors raised when assigning a value to a message field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("message '{message}' has no field named '{name}'")]
    UnknownField { message: String, name: String },

    #[error("field '{name}' cannot hold a {got} value")]
    KindMismatch { name: String, got: &'static str },
}
