//! Shared message descriptors for the integration tests.
//!
//! These play the role of generated code: each type's descriptor is built
//! once in a `LazyLock` static and handed out as `&'static`.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::LazyLock;

use bytes::Bytes;
use proptest::prelude::*;
use protolith::well_known;
use protolith::{EnumDescriptor, FieldDescriptor, Kind, MapKey, Message, MessageDescriptor, Value};

/// `message Greeting { string message = 1; }`
pub fn greeting() -> &'static MessageDescriptor {
    static DESC: LazyLock<MessageDescriptor> = LazyLock::new(|| {
        MessageDescriptor::new(
            "test.Greeting",
            vec![FieldDescriptor::new(1, "message", Kind::String)],
        )
        .expect("valid descriptor")
    });
    &DESC
}

/// `enum Color { COLOR_UNSPECIFIED = 0; COLOR_RED = 1; COLOR_BLUE = 2; }`
pub fn color() -> &'static EnumDescriptor {
    static DESC: LazyLock<EnumDescriptor> = LazyLock::new(|| {
        EnumDescriptor::new(
            "test.Color",
            vec![("COLOR_UNSPECIFIED", 0), ("COLOR_RED", 1), ("COLOR_BLUE", 2)],
        )
    });
    &DESC
}

/// One field of every scalar kind, plus a repeated and a map field.
pub fn everything() -> &'static MessageDescriptor {
    static DESC: LazyLock<MessageDescriptor> = LazyLock::new(|| {
        MessageDescriptor::new(
            "test.Everything",
            vec![
                FieldDescriptor::new(1, "an_int32", Kind::Int32),
                FieldDescriptor::new(2, "an_int64", Kind::Int64),
                FieldDescriptor::new(3, "a_uint32", Kind::Uint32),
                FieldDescriptor::new(4, "a_uint64", Kind::Uint64),
                FieldDescriptor::new(5, "a_sint32", Kind::Sint32),
                FieldDescriptor::new(6, "a_sint64", Kind::Sint64),
                FieldDescriptor::new(7, "a_bool", Kind::Bool),
                FieldDescriptor::new(8, "a_fixed32", Kind::Fixed32),
                FieldDescriptor::new(9, "a_fixed64", Kind::Fixed64),
                FieldDescriptor::new(10, "a_sfixed32", Kind::Sfixed32),
                FieldDescriptor::new(11, "a_sfixed64", Kind::Sfixed64),
                FieldDescriptor::new(12, "a_float", Kind::Float),
                FieldDescriptor::new(13, "a_double", Kind::Double),
                FieldDescriptor::new(14, "a_string", Kind::String),
                FieldDescriptor::new(15, "some_bytes", Kind::Bytes),
                FieldDescriptor::new(16, "a_color", Kind::Enum(color)),
                FieldDescriptor::new(17, "tags", Kind::String).repeated(),
                FieldDescriptor::new(18, "scores", Kind::Int32).map(Kind::String),
            ],
        )
        .expect("valid descriptor")
    });
    &DESC
}

/// `message Test { oneof foo { bool on = 1; uint32 count = 2; } }`
pub fn oneof_test() -> &'static MessageDescriptor {
    static DESC: LazyLock<MessageDescriptor> = LazyLock::new(|| {
        MessageDescriptor::new(
            "test.Test",
            vec![
                FieldDescriptor::new(1, "on", Kind::Bool).in_oneof("foo"),
                FieldDescriptor::new(2, "count", Kind::Uint32).in_oneof("foo"),
            ],
        )
        .expect("valid descriptor")
    });
    &DESC
}

/// `message Numbers { repeated uint32 values = 1; }`
pub fn numbers() -> &'static MessageDescriptor {
    static DESC: LazyLock<MessageDescriptor> = LazyLock::new(|| {
        MessageDescriptor::new(
            "test.Numbers",
            vec![FieldDescriptor::new(1, "values", Kind::Uint32).repeated()],
        )
        .expect("valid descriptor")
    });
    &DESC
}

/// `message Scores { map<string, int32> scores = 1; }`
pub fn scores() -> &'static MessageDescriptor {
    static DESC: LazyLock<MessageDescriptor> = LazyLock::new(|| {
        MessageDescriptor::new(
            "test.Scores",
            vec![FieldDescriptor::new(1, "scores", Kind::Int32).map(Kind::String)],
        )
        .expect("valid descriptor")
    });
    &DESC
}

/// `message Inner { int32 first = 1; int32 second = 2; string note = 3; }`
pub fn inner() -> &'static MessageDescriptor {
    static DESC: LazyLock<MessageDescriptor> = LazyLock::new(|| {
        MessageDescriptor::new(
            "test.Inner",
            vec![
                FieldDescriptor::new(1, "first", Kind::Int32),
                FieldDescriptor::new(2, "second", Kind::Int32),
                FieldDescriptor::new(3, "note", Kind::String),
            ],
        )
        .expect("valid descriptor")
    });
    &DESC
}

/// `message Outer { string name = 1; Inner inner = 2; repeated int32 xs = 3; }`
pub fn outer() -> &'static MessageDescriptor {
    static DESC: LazyLock<MessageDescriptor> = LazyLock::new(|| {
        MessageDescriptor::new(
            "test.Outer",
            vec![
                FieldDescriptor::new(1, "name", Kind::String),
                FieldDescriptor::new(2, "inner", Kind::Message(inner)),
                FieldDescriptor::new(3, "xs", Kind::Int32).repeated(),
            ],
        )
        .expect("valid descriptor")
    });
    &DESC
}

/// `message IntMap { map<int32, string> labels = 1; }`
pub fn int_map() -> &'static MessageDescriptor {
    static DESC: LazyLock<MessageDescriptor> = LazyLock::new(|| {
        MessageDescriptor::new(
            "test.IntMap",
            vec![FieldDescriptor::new(1, "labels", Kind::String).map(Kind::Int32)],
        )
        .expect("valid descriptor")
    });
    &DESC
}

/// `message FlagMap { map<bool, int32> flags = 1; }`
pub fn flag_map() -> &'static MessageDescriptor {
    static DESC: LazyLock<MessageDescriptor> = LazyLock::new(|| {
        MessageDescriptor::new(
            "test.FlagMap",
            vec![FieldDescriptor::new(1, "flags", Kind::Int32).map(Kind::Bool)],
        )
        .expect("valid descriptor")
    });
    &DESC
}

fn arb_finite_f32() -> impl Strategy<Value = f32> {
    any::<f32>().prop_map(|v| if v.is_finite() { v } else { 0.0 })
}

fn arb_finite_f64() -> impl Strategy<Value = f64> {
    any::<f64>().prop_map(|v| if v.is_finite() { v } else { 0.0 })
}

/// A randomized instance of [`everything`].
///
/// Floats are kept finite so instances stay reflexively equal.
pub fn arb_everything() -> impl Strategy<Value = Message> {
    let varints = (
        any::<i32>(),
        any::<i64>(),
        any::<u32>(),
        any::<u64>(),
        any::<i32>(),
        any::<i64>(),
        any::<bool>(),
    );
    let fixeds = (any::<u32>(), any::<u64>(), any::<i32>(), any::<i64>());
    let floats = (arb_finite_f32(), arb_finite_f64());
    let rest = (
        ".*",
        proptest::collection::vec(any::<u8>(), 0..32),
        any::<i32>(),
        proptest::collection::vec(".*", 0..4),
        proptest::collection::btree_map(".*", any::<i32>(), 0..4),
    );

    (varints, fixeds, floats, rest).prop_map(
        |(
            (an_int32, an_int64, a_uint32, a_uint64, a_sint32, a_sint64, a_bool),
            (a_fixed32, a_fixed64, a_sfixed32, a_sfixed64),
            (a_float, a_double),
            (a_string, some_bytes, a_color, tags, scores),
        )| {
            let mut msg = Message::new(everything());
            msg.set("an_int32", an_int32).unwrap();
            msg.set("an_int64", an_int64).unwrap();
            msg.set("a_uint32", a_uint32).unwrap();
            msg.set("a_uint64", a_uint64).unwrap();
            msg.set("a_sint32", a_sint32).unwrap();
            msg.set("a_sint64", a_sint64).unwrap();
            msg.set("a_bool", a_bool).unwrap();
            msg.set("a_fixed32", a_fixed32).unwrap();
            msg.set("a_fixed64", a_fixed64).unwrap();
            msg.set("a_sfixed32", a_sfixed32).unwrap();
            msg.set("a_sfixed64", a_sfixed64).unwrap();
            msg.set("a_float", a_float).unwrap();
            msg.set("a_double", a_double).unwrap();
            msg.set("a_string", a_string).unwrap();
            msg.set("some_bytes", Bytes::from(some_bytes)).unwrap();
            msg.set("a_color", Value::Enum(a_color)).unwrap();
            msg.set(
                "tags",
                Value::List(tags.into_iter().map(Value::String).collect()),
            )
            .unwrap();
            msg.set(
                "scores",
                Value::Map(
                    scores
                        .into_iter()
                        .map(|(k, v)| (MapKey::String(k), Value::I32(v)))
                        .collect::<BTreeMap<_, _>>(),
                ),
            )
            .unwrap();
            msg
        },
    )
}

/// A message holding well-known-typed fields:
/// `message Holder { BoolValue maybe = 1; Timestamp ts = 2; Duration duration = 3; }`
pub fn wkt_holder() -> &'static MessageDescriptor {
    static DESC: LazyLock<MessageDescriptor> = LazyLock::new(|| {
        MessageDescriptor::new(
            "test.Holder",
            vec![
                FieldDescriptor::new(1, "maybe", Kind::Message(well_known::bool_value)),
                FieldDescriptor::new(2, "ts", Kind::Message(well_known::timestamp)),
                FieldDescriptor::new(3, "duration", Kind::Message(well_known::duration)),
            ],
        )
        .expect("valid descriptor")
    });
    &DESC
}
