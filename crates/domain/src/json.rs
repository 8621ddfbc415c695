//! JSON value model
//!
//! `JsonValue` is the intermediate form every list payload goes through
//! before it is committed to a typed decode. Decoders sniff its shape with the
//! `as_*` projections, which return `None` on mismatch instead of failing.
//!
//! Objects keep insertion order, so "the first entry of an object" is
//! deterministic and matches the order keys appeared on the wire. Integers keep
//! their exact value; only numbers with a fraction or exponent become `f64`.

use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::{Result, SkylistError};

/// Ordered JSON object.
pub type JsonObject = IndexMap<String, JsonValue>;

/// Arbitrary decoded wire payload.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum JsonValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    UInteger(u64),
    Float(f64),
    String(String),
    Array(Vec<JsonValue>),
    Object(JsonObject),
}

impl JsonValue {
    /// Parse JSON text.
    ///
    /// # Errors
    /// Returns `SkylistError::Decode` when `text` is not valid JSON.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Any number, widened to `f64`.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::UInteger(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Exact integer value, if the number fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::UInteger(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::UInteger(_) | Self::Float(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsonValue]> {
        match self {
            Self::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&JsonObject> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Look up `key` when this value is an object.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// First entry of an object, in wire order.
    pub fn first_entry(&self) -> Option<(&str, &JsonValue)> {
        self.as_object().and_then(|map| map.first()).map(|(key, value)| (key.as_str(), value))
    }

    /// Strict conversion into a `serde_json::Value`.
    ///
    /// # Errors
    /// Returns `SkylistError::Decode` if the value contains a NaN or infinite
    /// number, which JSON cannot represent.
    pub fn to_serde(&self) -> Result<serde_json::Value> {
        Ok(match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(value) => serde_json::Value::Bool(*value),
            Self::Integer(value) => serde_json::Value::from(*value),
            Self::UInteger(value) => serde_json::Value::from(*value),
            Self::Float(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .ok_or_else(|| {
                    SkylistError::Decode(format!("number {value} is not representable in JSON"))
                })?,
            Self::String(value) => serde_json::Value::String(value.clone()),
            Self::Array(values) => serde_json::Value::Array(
                values.iter().map(Self::to_serde).collect::<Result<Vec<_>>>()?,
            ),
            Self::Object(map) => {
                let mut object = serde_json::Map::with_capacity(map.len());
                for (key, value) in map {
                    object.insert(key.clone(), value.to_serde()?);
                }
                serde_json::Value::Object(object)
            }
        })
    }
}

fn number_from_serde(number: &serde_json::Number) -> JsonValue {
    if let Some(value) = number.as_i64() {
        JsonValue::Integer(value)
    } else if let Some(value) = number.as_u64() {
        JsonValue::UInteger(value)
    } else {
        JsonValue::Float(number.as_f64().unwrap_or_default())
    }
}

impl Serialize for JsonValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::UInteger(value) => serializer.serialize_u64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::String(value) => serializer.serialize_str(value),
            Self::Array(values) => values.serialize(serializer),
            Self::Object(map) => map.serialize(serializer),
        }
    }
}

impl FromStr for JsonValue {
    type Err = SkylistError;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse(text)
    }
}

impl From<serde_json::Value> for JsonValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(value) => Self::Bool(value),
            serde_json::Value::Number(number) => number_from_serde(&number),
            serde_json::Value::String(value) => Self::String(value),
            serde_json::Value::Array(values) => {
                Self::Array(values.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(key, value)| (key, Self::from(value))).collect())
            }
        }
    }
}

impl From<&str> for JsonValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for JsonValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for JsonValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for JsonValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for JsonValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u64> for JsonValue {
    fn from(value: u64) -> Self {
        Self::UInteger(value)
    }
}

impl From<Vec<JsonValue>> for JsonValue {
    fn from(values: Vec<JsonValue>) -> Self {
        Self::Array(values)
    }
}

impl From<JsonObject> for JsonValue {
    fn from(map: JsonObject) -> Self {
        Self::Object(map)
    }
}
