//! Well-known types: canonical JSON shapes, bridges, and wire behavior.

mod common;

use protolith::well_known;
use protolith::{JsonOptions, Message, Value};
use serde_json::json;
use time::macros::datetime;

#[test]
fn test_holder_scenario() {
    // Holder{maybe=BoolValue(true), ts=2019-01-01T12:00:00Z, duration=1.2s}
    // <=> {"maybe": true, "ts": "2019-01-01T12:00:00Z", "duration": "1.200s"}
    let mut msg = Message::new(common::wkt_holder());
    msg.set("maybe", well_known::wrap(well_known::bool_value(), true))
        .unwrap();
    msg.set(
        "ts",
        well_known::new_timestamp(datetime!(2019-01-01 12:00:00 UTC)),
    )
    .unwrap();
    msg.set(
        "duration",
        well_known::new_duration(time::Duration::new(1, 200_000_000)),
    )
    .unwrap();

    let dict = msg.to_dict(&JsonOptions::new()).unwrap();
    assert_eq!(
        dict,
        json!({"maybe": true, "ts": "2019-01-01T12:00:00Z", "duration": "1.200s"})
    );

    let parsed = Message::from_dict(common::wkt_holder(), &dict).unwrap();
    assert_eq!(parsed, msg);

    // Clearing the wrapper removes its key from the JSON output.
    msg.clear("maybe").unwrap();
    let dict = msg.to_dict(&JsonOptions::new()).unwrap();
    assert!(dict.get("maybe").is_none());
}

#[test]
fn test_absent_wrappers_emit_null_with_defaults() {
    let msg = Message::new(common::wkt_holder());
    let dict = msg
        .to_dict(&JsonOptions::new().include_default_values())
        .unwrap();
    assert_eq!(dict.get("maybe"), Some(&json!(null)));
    assert_eq!(dict.get("ts"), Some(&json!(null)));

    // null parses back to "absent".
    let parsed = Message::from_dict(common::wkt_holder(), &dict).unwrap();
    assert_eq!(parsed.get("maybe"), None);
    assert_eq!(parsed, msg);
}

#[test]
fn test_timestamp_json_shapes() {
    let msg = Message::from_json(well_known::timestamp(), r#""2019-01-01T12:00:00Z""#).unwrap();
    assert_eq!(msg.get_or_default("seconds").unwrap(), Value::I64(1_546_344_000));
    assert_eq!(msg.get_or_default("nanos").unwrap(), Value::I32(0));

    // Offsets normalize to UTC.
    let offset =
        Message::from_json(well_known::timestamp(), r#""2019-01-01T14:00:00+02:00""#).unwrap();
    assert_eq!(offset, msg);

    // Fractional digits come out as 0, 3, 6, or 9.
    let mut precise = Message::new(well_known::timestamp());
    precise.set("seconds", 1_546_344_000i64).unwrap();
    precise.set("nanos", 120_000_000i32).unwrap();
    assert_eq!(
        precise.to_json(&JsonOptions::new()).unwrap(),
        r#""2019-01-01T12:00:00.120Z""#
    );

    precise.set("nanos", 5i32).unwrap();
    assert_eq!(
        precise.to_json(&JsonOptions::new()).unwrap(),
        r#""2019-01-01T12:00:00.000000005Z""#
    );
}

#[test]
fn test_timestamp_rejects_out_of_domain() {
    assert!(Message::from_json(well_known::timestamp(), r#""yesterday""#).is_err());
    assert!(Message::from_json(well_known::timestamp(), "12").is_err());

    let mut msg = Message::new(well_known::timestamp());
    msg.set("seconds", 253_402_300_800i64).unwrap(); // year 10000
    assert!(msg.to_json(&JsonOptions::new()).is_err());
}

#[test]
fn test_duration_json_shapes() {
    let span = |secs, nanos| {
        let mut msg = Message::new(well_known::duration());
        msg.set("seconds", Value::I64(secs)).unwrap();
        msg.set("nanos", Value::I32(nanos)).unwrap();
        msg.to_json(&JsonOptions::new()).unwrap()
    };

    assert_eq!(span(0, 0), r#""0s""#);
    assert_eq!(span(3, 0), r#""3s""#);
    assert_eq!(span(1, 200_000_000), r#""1.200s""#);
    assert_eq!(span(-1, -200_000_000), r#""-1.200s""#);
    assert_eq!(span(0, -500_000_000), r#""-0.500s""#);

    let parsed = Message::from_json(well_known::duration(), r#""-1.5s""#).unwrap();
    assert_eq!(parsed.get_or_default("seconds").unwrap(), Value::I64(-1));
    assert_eq!(parsed.get_or_default("nanos").unwrap(), Value::I32(-500_000_000));

    // Mismatched signs have no canonical form.
    let mut bad = Message::new(well_known::duration());
    bad.set("seconds", Value::I64(1)).unwrap();
    bad.set("nanos", Value::I32(-1)).unwrap();
    assert!(bad.to_json(&JsonOptions::new()).is_err());
}

#[test]
fn test_wrapper_json_is_bare_scalar() {
    let wrapped = well_known::wrap(well_known::uint64_value(), u64::MAX);
    assert_eq!(
        wrapped.to_json(&JsonOptions::new()).unwrap(),
        r#""18446744073709551615""#
    );

    let int_wrap = Message::from_json(well_known::int32_value(), "42").unwrap();
    assert_eq!(well_known::wrapped_value(&int_wrap), Value::I32(42));

    let string_wrap = well_known::wrap(well_known::string_value(), "hi");
    assert_eq!(string_wrap.to_json(&JsonOptions::new()).unwrap(), r#""hi""#);
}

#[test]
fn test_field_mask_json() {
    let mask = well_known::new_field_mask(&["user_id", "display_name"]);
    assert_eq!(
        mask.to_json(&JsonOptions::new()).unwrap(),
        r#""userId,displayName""#
    );

    let parsed = Message::from_json(well_known::field_mask(), r#""userId,displayName""#).unwrap();
    assert_eq!(
        well_known::field_mask_paths(&parsed),
        ["user_id", "display_name"]
    );
    assert_eq!(parsed, mask);

    let empty = Message::from_json(well_known::field_mask(), r#""""#).unwrap();
    assert!(well_known::field_mask_paths(&empty).is_empty());
}

#[test]
fn test_struct_value_list_roundtrip() {
    let payload = json!({
        "title": "report",
        "pages": 12.0,
        "draft": false,
        "missing": null,
        "authors": ["ann", "ben"],
        "meta": {"depth": [1.5, null, {"leaf": true}]}
    });

    let msg = Message::from_dict(well_known::json_struct(), &payload).unwrap();
    let back = msg.to_dict(&JsonOptions::new()).unwrap();
    assert_eq!(back, payload);

    // The same dynamic tree survives the binary wire format too.
    let parsed = Message::decode(well_known::json_struct(), msg.encode_to_vec()).unwrap();
    assert_eq!(parsed.to_dict(&JsonOptions::new()).unwrap(), payload);
}

#[test]
fn test_value_top_level_forms() {
    for payload in [
        json!(null),
        json!(true),
        json!(2.5),
        json!("text"),
        json!([1.0, "two"]),
        json!({"k": "v"}),
    ] {
        let msg = Message::from_dict(well_known::json_value(), &payload).unwrap();
        assert_eq!(msg.to_dict(&JsonOptions::new()).unwrap(), payload);
    }
}

#[test]
fn test_empty_json() {
    let msg = Message::from_json(well_known::empty(), "{}").unwrap();
    assert_eq!(msg.to_json(&JsonOptions::new()).unwrap(), "{}");
    assert!(Message::from_json(well_known::empty(), "[]").is_err());
}

#[test]
fn test_wkt_wire_form_is_ordinary() {
    // On the wire a Timestamp is just {int64 seconds = 1, int32 nanos = 2}.
    let ts = well_known::new_timestamp(datetime!(1970-01-01 00:01:00 UTC));
    assert_eq!(ts.encode_to_vec(), [0x08, 0x3C]);

    let parsed = Message::decode(well_known::timestamp(), vec![0x08, 0x3C]).unwrap();
    assert_eq!(parsed, ts);
}

#[test]
fn test_timestamp_bridge_roundtrip() {
    let instant = datetime!(2019-01-01 12:00:00.25 UTC);
    let msg = well_known::new_timestamp(instant);
    assert_eq!(well_known::timestamp_instant(&msg).unwrap(), instant);
    assert_eq!(msg.get_or_default("nanos").unwrap(), Value::I32(250_000_000));
}
