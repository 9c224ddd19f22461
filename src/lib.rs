//! Runtime support for proto3 messages.
//!
//! `protolith` is the library a generated message type links against: a
//! descriptor-driven codec for the protobuf binary wire format, the
//! canonical proto3 JSON mapping, and bridges for the Google well-known
//! types (`Timestamp`, `Duration`, the wrapper types, `Struct`/`Value`,
//! `FieldMask`, `Empty`).
//!
//! Generated code describes each message type once, as a
//! [`MessageDescriptor`] held in a static; every instance of the type is a
//! [`Message`] carrying a reference to that descriptor. The codec handles
//! packed and unpacked repeated encodings, oneof exclusivity, map fields,
//! unknown-field preservation, and proto3 default elision.
//!
//! ```
//! use std::sync::LazyLock;
//! use protolith::{FieldDescriptor, Kind, Message, MessageDescriptor};
//!
//! static GREETING: LazyLock<MessageDescriptor> = LazyLock::new(|| {
//!     MessageDescriptor::new(
//!         "example.Greeting",
//!         vec![FieldDescriptor::new(1, "message", Kind::String)],
//!     )
//!     .expect("valid descriptor")
//! });
//!
//! let mut greeting = Message::new(&GREETING);
//! greeting.set("message", "Hey!").unwrap();
//!
//! let bytes = greeting.encode_to_vec();
//! assert_eq!(bytes, [0x0A, 0x04, 0x48, 0x65, 0x79, 0x21]);
//!
//! let parsed = Message::decode(&GREETING, bytes).unwrap();
//! assert_eq!(parsed, greeting);
//! ```
//!
//! The codec is purely computational: no I/O, no background work, no shared
//! mutable state. Descriptors are immutable once built and safe to share
//! across threads; instances are not thread-safe.

pub mod codec;
pub mod descriptor;
pub mod error;
pub mod json;
pub mod leb128;
pub mod message;
pub mod value;
pub mod well_known;
pub mod wire;

pub use codec::{DecodeOptions, DEFAULT_RECURSION_LIMIT};
pub use descriptor::{
    Cardinality, EnumDescriptor, EnumRef, FieldDescriptor, Kind, MessageDescriptor, MessageRef,
    OneofDescriptor,
};
pub use error::{DecodeError, DescriptorError, JsonError, ValueError};
pub use json::{Casing, JsonOptions};
pub use message::Message;
pub use value::{MapKey, Value};
