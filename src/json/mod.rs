//! The proto3 JSON codec.
//!
//! Converts between messages and the canonical proto3 JSON mapping:
//! lowerCamelCase names by default, 64-bit integers as decimal strings,
//! bytes as base64, enums as value names, and the distinguished shapes for
//! the well-known types.

pub(crate) mod emit;
pub(crate) mod names;
pub(crate) mod parse;

use serde_json::ser::{PrettyFormatter, Serializer};

use crate::error::JsonError;
use crate::message::Message;

/// The casing style used for field names on emit.
///
/// Parsing always accepts both the declared snake_case name and its
/// lowerCamelCase form, regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Casing {
    /// `some_field` -> `someField` (the proto3 JSON default).
    #[default]
    Camel,
    /// `someField` -> `some_field`.
    Snake,
    /// `some_field` -> `SomeField`.
    Pascal,
    /// The declared name, untouched.
    Original,
}

impl Casing {
    pub(crate) fn apply(self, name: &str) -> String {
        match self {
            Casing::Camel => names::snake_to_camel(name),
            Casing::Snake => names::camel_to_snake(name),
            Casing::Pascal => names::snake_to_pascal(name),
            Casing::Original => name.to_owned(),
        }
    }
}

/// Options controlling JSON emission.
#[derive(Debug, Clone, Default)]
pub struct JsonOptions {
    pub casing: Casing,
    /// Emit every known field, including those holding their default value.
    /// Absent sub-message fields (wrappers included) emit `null`.
    pub include_default_values: bool,
    /// Pretty-print with this many spaces of indentation.
    pub indent: Option<usize>,
}

impl JsonOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn casing(mut self, casing: Casing) -> Self {
        self.casing = casing;
        self
    }

    pub fn include_default_values(mut self) -> Self {
        self.include_default_values = true;
        self
    }

    pub fn indent(mut self, width: usize) -> Self {
        self.indent = Some(width);
        self
    }
}

/// Render a message as a JSON string.
pub(crate) fn to_string(msg: &Message, options: &JsonOptions) -> Result<String, JsonError> {
    let value = emit::message_to_value(msg, options)?;
    let out = match options.indent {
        None => serde_json::to_vec(&value)?,
        Some(width) => {
            let indent = " ".repeat(width);
            let mut out = Vec::new();
            let formatter = PrettyFormatter::with_indent(indent.as_bytes());
            let mut ser = Serializer::with_formatter(&mut out, formatter);
            serde::Serialize::serialize(&value, &mut ser)?;
            out
        }
    };
    // serde_json only ever produces valid UTF-8.
    Ok(String::from_utf8_lossy(&out).into_owned())
}
