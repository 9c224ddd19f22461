//! Descriptors: the schema information a generated message type carries.
//!
//! A [`MessageDescriptor`] is built once per message type from the flat field
//! records the code generator emits, validated, and shared immutably
//! thereafter. Generated code keeps each descriptor in a `LazyLock` static
//! and hands `&'static` references to every instance of the type.

use std::collections::HashMap;

use crate::error::DescriptorError;
use crate::json::names::snake_to_camel;
use crate::wire::{WireType, MAXIMUM_FIELD_NUMBER, MINIMUM_FIELD_NUMBER, RESERVED_FIELD_NUMBERS};

/// Reference to a message descriptor, resolved lazily so mutually recursive
/// message types (e.g. `Struct` and `Value`) can link to each other.
pub type MessageRef = fn() -> &'static MessageDescriptor;

/// Reference to an enum descriptor.
pub type EnumRef = fn() -> &'static EnumDescriptor;

/// The proto type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Bool,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Float,
    Double,
    String,
    Bytes,
    Enum(EnumRef),
    Message(MessageRef),
}

impl Kind {
    /// The wire type values of this kind use on the wire.
    pub fn wire_type(self) -> WireType {
        match self {
            Kind::Int32
            | Kind::Int64
            | Kind::Uint32
            | Kind::Uint64
            | Kind::Sint32
            | Kind::Sint64
            | Kind::Bool
            | Kind::Enum(_) => WireType::Varint,
            Kind::Fixed64 | Kind::Sfixed64 | Kind::Double => WireType::I64,
            Kind::Fixed32 | Kind::Sfixed32 | Kind::Float => WireType::I32,
            Kind::String | Kind::Bytes | Kind::Message(_) => WireType::Len,
        }
    }

    /// Whether repeated fields of this kind may use the packed encoding.
    pub fn is_packable(self) -> bool {
        !matches!(self, Kind::String | Kind::Bytes | Kind::Message(_))
    }

    /// Valid map key kinds per the protobuf spec: integral types, bool,
    /// string. NOT valid: float, double, bytes, enum, messages.
    pub fn is_valid_map_key(self) -> bool {
        matches!(
            self,
            Kind::Int32
                | Kind::Int64
                | Kind::Uint32
                | Kind::Uint64
                | Kind::Sint32
                | Kind::Sint64
                | Kind::Fixed32
                | Kind::Fixed64
                | Kind::Sfixed32
                | Kind::Sfixed64
                | Kind::Bool
                | Kind::String
        )
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Sint32 => "sint32",
            Kind::Sint64 => "sint64",
            Kind::Bool => "bool",
            Kind::Fixed32 => "fixed32",
            Kind::Fixed64 => "fixed64",
            Kind::Sfixed32 => "sfixed32",
            Kind::Sfixed64 => "sfixed64",
            Kind::Float => "float",
            Kind::Double => "double",
            Kind::String => "string",
            Kind::Bytes => "bytes",
            Kind::Enum(_) => "enum",
            Kind::Message(_) => "message",
        }
    }
}

/// How many times a field may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// The field appears zero or one times.
    Singular,
    /// The field appears zero or more times, in order.
    Repeated,
    /// A key-value mapping, wire-encoded as a repeated two-field entry
    /// message with `key = 1` and `value = 2`.
    Map,
}

/// Description of one field, as emitted by the code generator.
///
/// For map fields, `kind` describes the map *value* and `map_key` the key.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub number: u32,
    /// The declared (snake_case) field name.
    pub name: &'static str,
    pub kind: Kind,
    pub cardinality: Cardinality,
    /// `None` resolves to the proto3 default: packed for packable kinds.
    pub packed: Option<bool>,
    /// Name of the oneof group this field belongs to, if any.
    pub oneof: Option<&'static str>,
    pub map_key: Option<Kind>,
}

impl FieldDescriptor {
    /// A singular field.
    pub fn new(number: u32, name: &'static str, kind: Kind) -> Self {
        FieldDescriptor {
            number,
            name,
            kind,
            cardinality: Cardinality::Singular,
            packed: None,
            oneof: None,
            map_key: None,
        }
    }

    /// Make this field repeated.
    pub fn repeated(mut self) -> Self {
        self.cardinality = Cardinality::Repeated;
        self
    }

    /// Make this field a map with the given key kind; `kind` is the value.
    pub fn map(mut self, key: Kind) -> Self {
        self.cardinality = Cardinality::Map;
        self.map_key = Some(key);
        self
    }

    /// Place this field in a oneof group.
    pub fn in_oneof(mut self, group: &'static str) -> Self {
        self.oneof = Some(group);
        self
    }

    /// Opt a repeated scalar field out of the packed encoding.
    pub fn unpacked(mut self) -> Self {
        self.packed = Some(false);
        self
    }

    /// True if this is a map field.
    #[inline]
    pub fn is_map(&self) -> bool {
        self.cardinality == Cardinality::Map
    }

    /// Whether this field serializes its elements as a single packed run.
    #[inline]
    pub fn is_packed(&self) -> bool {
        self.cardinality == Cardinality::Repeated
            && self.kind.is_packable()
            && self.packed.unwrap_or(true)
    }
}

/// A oneof group: a named set of fields of which at most one is set.
#[derive(Debug, Clone)]
pub struct OneofDescriptor {
    name: &'static str,
    /// Indices into the message's declaration-order field list.
    members: Vec<usize>,
}

impl OneofDescriptor {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn member_indices(&self) -> &[usize] {
        &self.members
    }
}

/// A protobuf message definition: the static-per-type record driving the
/// codec.
///
/// Provides constant-time lookup by field number (parsing) and by field name
/// (serialization and JSON), and enumerates fields in declaration order.
#[derive(Debug)]
pub struct MessageDescriptor {
    full_name: String,
    fields: Vec<FieldDescriptor>,
    by_number: HashMap<u32, usize>,
    /// Keyed on both the original snake_case name and its lowerCamelCase
    /// form, so JSON parsing accepts either spelling.
    by_name: HashMap<String, usize>,
    oneofs: Vec<OneofDescriptor>,
}

impl MessageDescriptor {
    /// Validate the field records and build the lookup tables.
    pub fn new(
        full_name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Self, DescriptorError> {
        let mut by_number = HashMap::with_capacity(fields.len());
        let mut by_name = HashMap::with_capacity(fields.len() * 2);
        let mut oneofs: Vec<OneofDescriptor> = Vec::new();

        for (idx, field) in fields.iter().enumerate() {
            if field.number < MINIMUM_FIELD_NUMBER || field.number > MAXIMUM_FIELD_NUMBER {
                return Err(DescriptorError::FieldNumberOutOfRange {
                    number: field.number,
                });
            }
            if RESERVED_FIELD_NUMBERS.contains(&field.number) {
                return Err(DescriptorError::ReservedFieldNumber {
                    number: field.number,
                });
            }
            if by_number.insert(field.number, idx).is_some() {
                return Err(DescriptorError::DuplicateFieldNumber {
                    number: field.number,
                });
            }

            match (field.cardinality, field.map_key) {
                (Cardinality::Map, None) => {
                    return Err(DescriptorError::InvalidMapKeyKind { kind: "missing" });
                }
                (_, Some(key)) if !key.is_valid_map_key() => {
                    return Err(DescriptorError::InvalidMapKeyKind { kind: key.name() });
                }
                _ => {}
            }

            if by_name.insert(field.name.to_owned(), idx).is_some() {
                return Err(DescriptorError::DuplicateFieldName {
                    name: field.name.to_owned(),
                });
            }
            let camel = snake_to_camel(field.name);
            if camel != field.name {
                // A camelCase spelling colliding with another declared name is
                // a generator bug; the declared name wins the table slot.
                by_name.entry(camel).or_insert(idx);
            }

            if let Some(group) = field.oneof {
                match oneofs.iter_mut().find(|o| o.name == group) {
                    Some(oneof) => oneof.members.push(idx),
                    None => oneofs.push(OneofDescriptor {
                        name: group,
                        members: vec![idx],
                    }),
                }
            }
        }

        Ok(MessageDescriptor {
            full_name: full_name.into(),
            fields,
            by_number,
            by_name,
            oneofs,
        })
    }

    /// The fully qualified message name, e.g. `google.protobuf.Timestamp`.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field by its number.
    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.by_number.get(&number).map(|&idx| &self.fields[idx])
    }

    /// Look up a field by its declared or lowerCamelCase name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.by_name.get(name).map(|&idx| &self.fields[idx])
    }

    /// The message's oneof groups, in order of first member declaration.
    pub fn oneofs(&self) -> &[OneofDescriptor] {
        &self.oneofs
    }

    /// Look up a oneof group by name.
    pub fn oneof_by_name(&self, name: &str) -> Option<&OneofDescriptor> {
        self.oneofs.iter().find(|o| o.name == name)
    }

    /// The member fields of a oneof group.
    pub fn oneof_members<'a>(
        &'a self,
        oneof: &'a OneofDescriptor,
    ) -> impl Iterator<Item = &'a FieldDescriptor> {
        oneof.member_indices().iter().map(|&idx| &self.fields[idx])
    }
}

/// A protobuf enum definition.
///
/// The value set is *open*: wire and JSON decoding accept integers with no
/// declared name and preserve them as-is.
#[derive(Debug)]
pub struct EnumDescriptor {
    full_name: String,
    values: Vec<(&'static str, i32)>,
    by_name: HashMap<&'static str, i32>,
    by_number: HashMap<i32, &'static str>,
}

impl EnumDescriptor {
    pub fn new(full_name: impl Into<String>, values: Vec<(&'static str, i32)>) -> Self {
        let mut by_name = HashMap::with_capacity(values.len());
        let mut by_number = HashMap::with_capacity(values.len());
        for &(name, number) in &values {
            by_name.insert(name, number);
            // Aliased numbers keep their first declared name.
            by_number.entry(number).or_insert(name);
        }
        EnumDescriptor {
            full_name: full_name.into(),
            values,
            by_name,
            by_number,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Declared values in declaration order.
    pub fn values(&self) -> &[(&'static str, i32)] {
        &self.values
    }

    /// The declared name for a number, if any.
    pub fn name_of(&self, number: i32) -> Option<&'static str> {
        self.by_number.get(&number).copied()
    }

    /// The number for a declared name, if any.
    pub fn number_of(&self, name: &str) -> Option<i32> {
        self.by_name.get(name).copied()
    }
}
