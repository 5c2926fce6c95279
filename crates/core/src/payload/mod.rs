//! Encoder for the PHP native serialization grammar.
//!
//! ```text
//! b:<0|1>;   i:<int>;   d:<float>;   s:<len>:"<text>";   N;
//! a:<count>:{<key><value>...}
//! O:<len(class)>:"<class>":<count>:{<s:key><value>...}}
//! ```
//!
//! The object wrapper closes with two braces. Consumers of this crate rely on that
//! exact byte sequence, so it is emitted verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// How `s:<len>:` lengths are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringLengths {
    /// Unicode scalar count. Matches byte length for ASCII only.
    #[default]
    Chars,
    /// UTF-8 byte count, which is what the runtime itself checks.
    Bytes,
}

/// Array key: integer or string.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayKey {
    Int(i64),
    Str(String),
}

/// Values the encoder understands.
#[derive(Debug, Clone, PartialEq)]
pub enum PhpValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Ordered mapping.
    Map(Vec<(ArrayKey, PhpValue)>),
    /// Sequence with implicit 0-based integer keys.
    List(Vec<PhpValue>),
}

impl From<&Value> for PhpValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => PhpValue::Null,
            Value::Bool(b) => PhpValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => PhpValue::Int(i),
                None => n.as_f64().map(PhpValue::Float).unwrap_or(PhpValue::Null),
            },
            Value::String(s) => PhpValue::Str(s.clone()),
            Value::Array(items) => PhpValue::List(items.iter().map(PhpValue::from).collect()),
            Value::Object(map) => PhpValue::Map(
                map.iter().map(|(k, v)| (ArrayKey::Str(k.clone()), PhpValue::from(v))).collect(),
            ),
        }
    }
}

/// Encoder carrying the string-length policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Encoder {
    pub string_lengths: StringLengths,
}

impl Encoder {
    pub fn new(string_lengths: StringLengths) -> Self {
        Self { string_lengths }
    }

    pub fn value(&self, value: &PhpValue) -> String {
        let mut out = String::new();
        self.write_value(&mut out, value);
        out
    }

    pub fn object(&self, class_name: &str, properties: &[(String, PhpValue)]) -> String {
        let mut out = format!(
            "O:{}:\"{}\":{}:{{",
            self.len(class_name),
            class_name,
            properties.len()
        );
        for (key, value) in properties {
            self.write_str(&mut out, key);
            self.write_value(&mut out, value);
        }
        out.push_str("}}");
        out
    }

    fn len(&self, text: &str) -> usize {
        match self.string_lengths {
            StringLengths::Chars => text.chars().count(),
            StringLengths::Bytes => text.len(),
        }
    }

    fn write_str(&self, out: &mut String, text: &str) {
        out.push_str(&format!("s:{}:\"{}\";", self.len(text), text));
    }

    fn write_key(&self, out: &mut String, key: &ArrayKey) {
        match key {
            ArrayKey::Int(i) => out.push_str(&format!("i:{i};")),
            ArrayKey::Str(s) => self.write_str(out, s),
        }
    }

    fn write_value(&self, out: &mut String, value: &PhpValue) {
        match value {
            PhpValue::Null => out.push_str("N;"),
            PhpValue::Bool(b) => out.push_str(if *b { "b:1;" } else { "b:0;" }),
            PhpValue::Int(i) => out.push_str(&format!("i:{i};")),
            PhpValue::Float(f) => out.push_str(&format!("d:{};", format_float(*f))),
            PhpValue::Str(s) => self.write_str(out, s),
            PhpValue::Map(entries) => {
                out.push_str(&format!("a:{}:{{", entries.len()));
                for (key, item) in entries {
                    self.write_key(out, key);
                    self.write_value(out, item);
                }
                out.push('}');
            }
            PhpValue::List(items) => {
                out.push_str(&format!("a:{}:{{", items.len()));
                for (index, item) in items.iter().enumerate() {
                    out.push_str(&format!("i:{index};"));
                    self.write_value(out, item);
                }
                out.push('}');
            }
        }
    }
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NAN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "INF".to_string() } else { "-INF".to_string() };
    }
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Encode a single value with character-count string lengths.
pub fn encode_value(value: &PhpValue) -> String {
    Encoder::default().value(value)
}

/// Encode an object with character-count string lengths.
pub fn encode_object(class_name: &str, properties: &[(String, PhpValue)]) -> String {
    Encoder::default().object(class_name, properties)
}

/// Convert an ordered JSON object into encoder properties.
pub fn properties_from_json(map: &Map<String, Value>) -> Vec<(String, PhpValue)> {
    map.iter().map(|(k, v)| (k.clone(), PhpValue::from(v))).collect()
}

/// Target class plus the property values to inject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadSpec {
    pub class_name: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadResult {
    pub serialized: String,
    pub structure: Value,
}

pub fn generate_payload(spec: &PayloadSpec, encoder: Encoder) -> PayloadResult {
    let serialized = encoder.object(&spec.class_name, &properties_from_json(&spec.properties));
    PayloadResult {
        serialized,
        structure: json!({ "class": spec.class_name, "properties": spec.properties }),
    }
}

/// Standalone PHP script that prints the payload raw, URL-encoded and base64-encoded.
pub fn payload_script(spec: &PayloadSpec, encoder: Encoder) -> String {
    let serialized = encoder.object(&spec.class_name, &properties_from_json(&spec.properties));
    let literal = serialized.replace('\\', "\\\\").replace('\'', "\\'");
    let mut script = String::new();
    script.push_str("<?php\n");
    script.push_str(&format!("// Object-injection payload targeting {}\n", spec.class_name));
    script.push_str(&format!("$payload = '{literal}';\n\n"));
    script.push_str("echo $payload, PHP_EOL;\n");
    script.push_str("echo urlencode($payload), PHP_EOL;\n");
    script.push_str("echo base64_encode($payload), PHP_EOL;\n");
    script
}
