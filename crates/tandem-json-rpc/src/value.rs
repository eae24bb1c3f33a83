//! Dynamic JSON value representation.
//!
//! `JsonValue` stands in wherever the shape of a payload is not statically
//! known: request parameters, response results, error data. Decoding tries a
//! scalar first (boolean, then integer, then double, then string), then an
//! array, then an object; the first structural match wins. Objects are kept
//! in a `BTreeMap`, so key order is deterministic and encoded bytes can be
//! asserted exactly in tests.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An untyped JSON value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JsonValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<JsonValue>),
    Object(BTreeMap<String, JsonValue>),
}

impl JsonValue {
    /// Decode a value from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Encode this value to JSON bytes.
    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Convert any serializable application type into the dynamic model.
    ///
    /// This is the extension point for application-specific composite types:
    /// anything with a `Serialize` impl participates without this module
    /// knowing about it.
    pub fn from_typed<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).and_then(serde_json::from_value)
    }

    /// Convert the dynamic value back into a typed application value.
    pub fn to_typed<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::to_value(self).and_then(serde_json::from_value)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JsonValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            JsonValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric accessor covering both integer and double variants.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            JsonValue::Int(i) => Some(*i as f64),
            JsonValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsonValue]> {
        match self {
            JsonValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, JsonValue>> {
        match self {
            JsonValue::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Look up a key in an object value.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.as_object()?.get(key)
    }

    /// Look up an element in an array value.
    pub fn get_index(&self, index: usize) -> Option<&JsonValue> {
        self.as_array()?.get(index)
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("<unencodable>"),
        }
    }
}

impl From<bool> for JsonValue {
    fn from(value: bool) -> Self {
        JsonValue::Bool(value)
    }
}

impl From<i64> for JsonValue {
    fn from(value: i64) -> Self {
        JsonValue::Int(value)
    }
}

impl From<i32> for JsonValue {
    fn from(value: i32) -> Self {
        JsonValue::Int(value.into())
    }
}

impl From<f64> for JsonValue {
    fn from(value: f64) -> Self {
        JsonValue::Double(value)
    }
}

impl From<&str> for JsonValue {
    fn from(value: &str) -> Self {
        JsonValue::String(value.to_string())
    }
}

impl From<String> for JsonValue {
    fn from(value: String) -> Self {
        JsonValue::String(value)
    }
}

impl From<Vec<JsonValue>> for JsonValue {
    fn from(value: Vec<JsonValue>) -> Self {
        JsonValue::Array(value)
    }
}

impl From<BTreeMap<String, JsonValue>> for JsonValue {
    fn from(value: BTreeMap<String, JsonValue>) -> Self {
        JsonValue::Object(value)
    }
}

impl<T: Into<JsonValue>> From<Option<T>> for JsonValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => JsonValue::Null,
        }
    }
}

impl Serialize for JsonValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            JsonValue::Null => serializer.serialize_unit(),
            JsonValue::Bool(b) => serializer.serialize_bool(*b),
            JsonValue::Int(i) => serializer.serialize_i64(*i),
            JsonValue::Double(d) => serializer.serialize_f64(*d),
            JsonValue::String(s) => serializer.serialize_str(s),
            JsonValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            JsonValue::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

struct JsonValueVisitor;

impl<'de> Visitor<'de> for JsonValueVisitor {
    type Value = JsonValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a recognizable JSON shape (scalar, array, or object)")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(JsonValue::Null)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(JsonValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E> {
        Ok(JsonValue::Bool(value))
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E> {
        Ok(JsonValue::Int(value))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E> {
        if let Ok(i) = i64::try_from(value) {
            Ok(JsonValue::Int(i))
        } else {
            Ok(JsonValue::Double(value as f64))
        }
    }

    fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E> {
        Ok(JsonValue::Double(value))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E> {
        Ok(JsonValue::String(value.to_string()))
    }

    fn visit_string<E>(self, value: String) -> Result<Self::Value, E> {
        Ok(JsonValue::String(value))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(JsonValue::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut fields = BTreeMap::new();
        while let Some((key, value)) = map.next_entry::<String, JsonValue>()? {
            fields.insert(key, value);
        }
        Ok(JsonValue::Object(fields))
    }
}

impl<'de> Deserialize<'de> for JsonValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(JsonValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: JsonValue) {
        let bytes = value.to_vec().unwrap();
        let decoded = JsonValue::from_slice(&bytes).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn scalars_round_trip() {
        roundtrip(JsonValue::Null);
        roundtrip(JsonValue::Bool(true));
        roundtrip(JsonValue::Int(-42));
        roundtrip(JsonValue::Double(2.5));
        roundtrip(JsonValue::String("Hello JSON-RPC".into()));
    }

    #[test]
    fn integers_decode_before_doubles() {
        assert_eq!(JsonValue::from_slice(b"7").unwrap(), JsonValue::Int(7));
        assert_eq!(JsonValue::from_slice(b"7.0").unwrap(), JsonValue::Double(7.0));
    }

    #[test]
    fn nested_arrays_round_trip() {
        roundtrip(JsonValue::Array(vec![
            JsonValue::Int(1),
            JsonValue::Null,
            JsonValue::Array(vec![JsonValue::Bool(false), JsonValue::String("x".into())]),
        ]));
    }

    #[test]
    fn nested_objects_round_trip() {
        let mut inner = BTreeMap::new();
        inner.insert("deep".to_string(), JsonValue::Array(vec![JsonValue::Int(3)]));
        let mut outer = BTreeMap::new();
        outer.insert("a".to_string(), JsonValue::Object(inner));
        outer.insert("b".to_string(), JsonValue::Null);
        roundtrip(JsonValue::Object(outer));
    }

    #[test]
    fn object_encoding_is_deterministic() {
        let mut fields = BTreeMap::new();
        fields.insert("zebra".to_string(), JsonValue::Int(1));
        fields.insert("apple".to_string(), JsonValue::Int(2));
        let bytes = JsonValue::Object(fields).to_vec().unwrap();
        assert_eq!(bytes, br#"{"apple":2,"zebra":1}"#);
    }

    #[test]
    fn typed_values_pass_through_the_dynamic_model() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Point {
            x: i64,
            y: i64,
        }

        let point = Point { x: 3, y: -4 };
        let value = JsonValue::from_typed(&point).unwrap();
        assert_eq!(value.get("x"), Some(&JsonValue::Int(3)));

        let back: Point = value.to_typed().unwrap();
        assert_eq!(back, point);
    }

    #[test]
    fn accessors() {
        let value = JsonValue::from_slice(br#"{"k":[1,"two",true]}"#).unwrap();
        let array = value.get("k").unwrap();
        assert_eq!(array.get_index(0).and_then(JsonValue::as_i64), Some(1));
        assert_eq!(array.get_index(1).and_then(JsonValue::as_str), Some("two"));
        assert_eq!(array.get_index(2).and_then(JsonValue::as_bool), Some(true));
        assert_eq!(array.get_index(3), None);
    }
}
