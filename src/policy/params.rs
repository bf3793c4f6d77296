//! Tool parameters: an insertion-ordered map of scalar values.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParameterError;

/// A single parameter value. Tools only take scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl ParamValue {
    /// The value as a string slice, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a number, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The value as a boolean, if it is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "boolean",
            ParamValue::Number(_) => "number",
            ParamValue::String(_) => "string",
        }
    }

    /// Parse a CLI-style literal: `true`/`false`, a number, or a bare string.
    pub fn parse_literal(raw: &str) -> Self {
        match raw {
            "true" => ParamValue::Bool(true),
            "false" => ParamValue::Bool(false),
            _ => match raw.parse::<f64>() {
                Ok(n) if n.is_finite() => ParamValue::Number(n),
                _ => ParamValue::String(raw.to_string()),
            },
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            ParamValue::Bool(b) => serde_json::Value::Bool(*b),
            ParamValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ParamValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            // Whole numbers print without a trailing ".0" so reasons read naturally.
            ParamValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            ParamValue::Number(n) => write!(f, "{}", n),
            ParamValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Number(value as f64)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Number(f64::from(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Number(f64::from(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// Ordered mapping from parameter name to value.
///
/// Keeps insertion order so approval prompts and audit records list
/// arguments the way the caller supplied them. Inserting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    entries: Vec<(String, ParamValue)>,
}

impl Parameters {
    /// Create an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_str)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_f64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ParamValue::as_bool)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Convert to a JSON object (for hooks and tool schemas).
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }

    /// Build parameters from a JSON value.
    ///
    /// `null` is treated as "no arguments". Anything other than an object of
    /// scalars is rejected.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ParameterError> {
        let map = match value {
            serde_json::Value::Null => return Ok(Self::new()),
            serde_json::Value::Object(map) => map,
            other => return Err(ParameterError::NotAnObject(json_kind(other))),
        };

        let mut params = Self::new();
        for (name, value) in map {
            let value = match value {
                serde_json::Value::Bool(b) => ParamValue::Bool(*b),
                serde_json::Value::Number(n) => match n.as_f64() {
                    Some(n) => ParamValue::Number(n),
                    None => {
                        return Err(ParameterError::UnsupportedValue {
                            name: name.clone(),
                            kind: "number",
                        });
                    }
                },
                serde_json::Value::String(s) => ParamValue::String(s.clone()),
                other => {
                    return Err(ParameterError::UnsupportedValue {
                        name: name.clone(),
                        kind: json_kind(other),
                    });
                }
            };
            params.insert(name.clone(), value);
        }
        Ok(params)
    }

    /// Parse `key=value` pairs (as given on the command line).
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, ParameterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair
                .split_once('=')
                .filter(|(k, _)| !k.trim().is_empty())
                .ok_or_else(|| ParameterError::Malformed(pair.to_string()))?;
            params.insert(key.trim(), ParamValue::parse_literal(value));
        }
        Ok(params)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for Parameters
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl Serialize for Parameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Parameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParametersVisitor;

        impl<'de> Visitor<'de> for ParametersVisitor {
            type Value = Parameters;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of parameter names to string, number or boolean values")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Parameters, E> {
                Ok(Parameters::new())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Parameters, A::Error> {
                let mut params = Parameters::new();
                while let Some((k, v)) = access.next_entry::<String, ParamValue>()? {
                    params.insert(k, v);
                }
                Ok(params)
            }
        }

        deserializer.deserialize_any(ParametersVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order_and_replaces() {
        let mut params = Parameters::new().with("b", 1).with("a", "x");
        params.insert("b", 2);

        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(params.get_f64("b"), Some(2.0));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_from_json_object() {
        let params = Parameters::from_json(&serde_json::json!({
            "user_id": "12345",
            "amount": 250,
            "notify": true
        }))
        .unwrap();

        assert_eq!(params.get_str("user_id"), Some("12345"));
        assert_eq!(params.get_f64("amount"), Some(250.0));
        assert_eq!(params.get_bool("notify"), Some(true));
    }

    #[test]
    fn test_from_json_keeps_object_order() {
        let value: serde_json::Value =
            serde_json::from_str(r#"{"order_id": "A-1", "amount": 250, "currency": "EUR"}"#)
                .unwrap();
        let params = Parameters::from_json(&value).unwrap();

        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["order_id", "amount", "currency"]);
        assert_eq!(params.to_json(), value);
    }

    #[test]
    fn test_from_json_null_is_empty() {
        let params = Parameters::from_json(&serde_json::Value::Null).unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn test_from_json_rejects_nested_values() {
        let err = Parameters::from_json(&serde_json::json!({"tags": ["a", "b"]})).unwrap_err();
        assert!(err.to_string().contains("'tags'"));
        assert!(err.to_string().contains("array"));

        let err = Parameters::from_json(&serde_json::json!("just a string")).unwrap_err();
        assert!(matches!(err, ParameterError::NotAnObject("string")));
    }

    #[test]
    fn test_deserialize_preserves_document_order() {
        let params: Parameters =
            serde_json::from_str(r#"{"zeta": 1, "alpha": "two", "mid": false}"#).unwrap();
        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);

        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"zeta":1.0,"alpha":"two","mid":false}"#);
    }

    #[test]
    fn test_deserialize_rejects_null_value() {
        let result: Result<Parameters, _> = serde_json::from_str(r#"{"a": null}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_pairs() {
        let params =
            Parameters::from_pairs(["amount=250", "order_id=ORD-1", "urgent=true"]).unwrap();
        assert_eq!(params.get_f64("amount"), Some(250.0));
        assert_eq!(params.get_str("order_id"), Some("ORD-1"));
        assert_eq!(params.get_bool("urgent"), Some(true));

        assert!(Parameters::from_pairs(["novalue"]).is_err());
        assert!(Parameters::from_pairs(["=x"]).is_err());
    }

    #[test]
    fn test_display() {
        let params = Parameters::new().with("amount", 250).with("rate", 0.5);
        assert_eq!(params.to_string(), "amount=250, rate=0.5");
    }
}
