use popchain_core::payload::{
    encode_object, generate_payload, properties_from_json, Encoder, PayloadSpec, PhpValue,
    StringLengths,
};
use serde_json::{json, Map, Value};

fn spec(class_name: &str, properties: Value) -> PayloadSpec {
    let properties = match properties {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    PayloadSpec { class_name: class_name.to_string(), properties }
}

#[test]
fn single_string_property_object() {
    let props = vec![("x".to_string(), PhpValue::Str("id".into()))];
    assert_eq!(encode_object("A", &props), r#"O:1:"A":1:{s:1:"x";s:2:"id";}}"#);
}

#[test]
fn empty_object_keeps_the_double_closing_brace() {
    assert_eq!(encode_object("Logger", &[]), r#"O:6:"Logger":0:{}}"#);
}

#[test]
fn mixed_json_properties_keep_insertion_order() {
    let payload = spec("A", json!({"n": 1, "f": true, "l": [1, "a"]}));
    let result = generate_payload(&payload, Encoder::default());
    assert_eq!(
        result.serialized,
        r#"O:1:"A":3:{s:1:"n";i:1;s:1:"f";b:1;s:1:"l";a:2:{i:0;i:1;i:1;s:1:"a";}}}"#
    );
    assert_eq!(result.structure["class"], "A");
    assert_eq!(result.structure["properties"]["n"], 1);
}

#[test]
fn nested_objects_floats_and_nulls() {
    let payload = spec("B", json!({"cfg": {"k": null}, "ratio": 2.5}));
    let props = properties_from_json(&payload.properties);
    assert_eq!(
        encode_object("B", &props),
        r#"O:1:"B":2:{s:3:"cfg";a:1:{s:1:"k";N;}s:5:"ratio";d:2.5;}}"#
    );
}

#[test]
fn byte_lengths_apply_to_class_and_values() {
    let payload = spec("Ä", json!({"v": "ü"}));
    let chars = generate_payload(&payload, Encoder::new(StringLengths::Chars));
    let bytes = generate_payload(&payload, Encoder::new(StringLengths::Bytes));
    assert_eq!(chars.serialized, r#"O:1:"Ä":1:{s:1:"v";s:1:"ü";}}"#);
    assert_eq!(bytes.serialized, r#"O:2:"Ä":1:{s:1:"v";s:2:"ü";}}"#);
}
