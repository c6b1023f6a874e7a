//! JSON mapping shared by the deployment and the test client.
//!
//! The same [`JsonMapper`] instance reads and writes request and response
//! bodies on both sides of a test, so mapper settings are observable end to
//! end.

use std::fmt;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Reads and writes JSON documents.
pub trait JsonMapper: Send + Sync + fmt::Debug {
    /// Serializes a JSON value to bytes.
    fn write_value(&self, value: &Value) -> Result<Vec<u8>, serde_json::Error>;

    /// Parses bytes into a JSON value.
    fn read_value(&self, bytes: &[u8]) -> Result<Value, serde_json::Error>;
}

impl<'a> dyn JsonMapper + 'a {
    /// Serializes any value through this mapper.
    pub fn to_vec<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, serde_json::Error> {
        self.write_value(&serde_json::to_value(value)?)
    }

    /// Deserializes any value through this mapper.
    pub fn from_slice<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.read_value(bytes)?)
    }
}

/// The default mapper, backed by `serde_json`.
#[derive(Debug, Clone, Default)]
pub struct StandardJsonMapper {
    pretty: bool,
    omit_nulls: bool,
}

impl StandardJsonMapper {
    /// Creates a compact mapper that keeps null fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indents written documents.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Drops object fields whose value is `null` when writing.
    pub fn omit_nulls(mut self, omit_nulls: bool) -> Self {
        self.omit_nulls = omit_nulls;
        self
    }
}

impl JsonMapper for StandardJsonMapper {
    fn write_value(&self, value: &Value) -> Result<Vec<u8>, serde_json::Error> {
        let stripped;
        let value = if self.omit_nulls {
            stripped = strip_nulls(value.clone());
            &stripped
        } else {
            value
        };

        if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        }
    }

    fn read_value(&self, bytes: &[u8]) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compact_by_default() {
        let mapper = StandardJsonMapper::new();
        let bytes = mapper.write_value(&json!({"a": 1})).unwrap();
        assert_eq!(bytes, br#"{"a":1}"#);
    }

    #[test]
    fn test_omit_nulls_is_recursive() {
        let mapper = StandardJsonMapper::new().omit_nulls(true);
        let bytes = mapper
            .write_value(&json!({"a": null, "b": {"c": null, "d": 2}, "e": [{"f": null}]}))
            .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({"b": {"d": 2}, "e": [{}]}));
    }

    #[test]
    fn test_typed_round_trip_through_dyn() {
        #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
        struct Person {
            name: String,
            age: u32,
        }

        let mapper: &dyn JsonMapper = &StandardJsonMapper::new().pretty(true);
        let bytes = mapper
            .to_vec(&Person {
                name: "Ada".to_string(),
                age: 36,
            })
            .unwrap();
        assert!(bytes.contains(&b'\n'));

        let person: Person = mapper.from_slice(&bytes).unwrap();
        assert_eq!(person.name, "Ada");
        assert_eq!(person.age, 36);
    }

    #[test]
    fn test_malformed_input_fails() {
        let mapper = StandardJsonMapper::new();
        assert!(mapper.read_value(b"{\"a\":").is_err());
    }
}
