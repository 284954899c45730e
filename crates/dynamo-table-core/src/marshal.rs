//! Conversion between native JSON documents and wire attribute values.
//!
//! The compilers never see wire values. Literals stay as `serde_json::Value`
//! until a request is finalized, and the [`Marshaller`] passed to the table
//! decides how they are encoded.

use std::collections::HashMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use dynamo_table_model::AttributeValue;
use dynamo_table_model::types::Item;
use serde_json::{Map, Number, Value};

use crate::error::MarshalError;

/// A native document: attribute name to JSON value.
pub type Document = Map<String, Value>;

/// Encodes native values to wire values and back.
pub trait Marshaller: Send + Sync + fmt::Debug {
    /// Encode one value.
    fn marshall_value(&self, value: &Value) -> Result<AttributeValue, MarshalError>;

    /// Decode one value.
    fn unmarshall_value(&self, value: &AttributeValue) -> Result<Value, MarshalError>;

    /// Encode a whole item.
    fn marshall_item(&self, item: &Document) -> Result<Item, MarshalError> {
        item.iter()
            .map(|(k, v)| Ok((k.clone(), self.marshall_value(v)?)))
            .collect()
    }

    /// Decode a whole item.
    fn unmarshall_item(&self, item: &Item) -> Result<Document, MarshalError> {
        item.iter()
            .map(|(k, v)| Ok((k.clone(), self.unmarshall_value(v)?)))
            .collect()
    }
}

/// The default marshaller.
///
/// | JSON      | wire   |
/// |-----------|--------|
/// | `null`    | `NULL` |
/// | bool      | `BOOL` |
/// | number    | `N`    |
/// | string    | `S`    |
/// | array     | `L`    |
/// | object    | `M`    |
///
/// Decoding maps `SS`/`NS` to arrays and `B`/`BS` to base64 strings. Sets do
/// not survive a round trip: a decoded set is written back as an `L` list.
/// Supply your own [`Marshaller`] through [`crate::Table::with_marshaller`]
/// when items carry string, number or binary sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMarshaller;

impl Marshaller for JsonMarshaller {
    fn marshall_value(&self, value: &Value) -> Result<AttributeValue, MarshalError> {
        Ok(match value {
            Value::Null => AttributeValue::Null(true),
            Value::Bool(b) => AttributeValue::Bool(*b),
            Value::Number(n) => AttributeValue::N(n.to_string()),
            Value::String(s) => AttributeValue::S(s.clone()),
            Value::Array(list) => AttributeValue::L(
                list.iter()
                    .map(|v| self.marshall_value(v))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => AttributeValue::M(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), self.marshall_value(v)?)))
                    .collect::<Result<HashMap<_, _>, MarshalError>>()?,
            ),
        })
    }

    fn unmarshall_value(&self, value: &AttributeValue) -> Result<Value, MarshalError> {
        Ok(match value {
            AttributeValue::S(s) => Value::String(s.clone()),
            AttributeValue::N(n) => Value::Number(parse_number(n)?),
            AttributeValue::B(b) => Value::String(STANDARD.encode(b)),
            AttributeValue::Ss(set) => set.iter().cloned().map(Value::String).collect(),
            AttributeValue::Ns(set) => set
                .iter()
                .map(|n| parse_number(n).map(Value::Number))
                .collect::<Result<_, _>>()?,
            AttributeValue::Bs(set) => set
                .iter()
                .map(|b| Value::String(STANDARD.encode(b)))
                .collect(),
            AttributeValue::Bool(b) => Value::Bool(*b),
            AttributeValue::Null(_) => Value::Null,
            AttributeValue::L(list) => list
                .iter()
                .map(|v| self.unmarshall_value(v))
                .collect::<Result<_, _>>()?,
            AttributeValue::M(map) => Value::Object(self.unmarshall_item(map)?),
        })
    }
}

fn parse_number(n: &str) -> Result<Number, MarshalError> {
    if let Ok(i) = n.parse::<i64>() {
        return Ok(i.into());
    }
    if let Ok(u) = n.parse::<u64>() {
        return Ok(u.into());
    }
    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| MarshalError::InvalidNumber(n.to_owned()))
}

/// Serializes any caller type into a document.
pub fn to_document<T: serde::Serialize + ?Sized>(value: &T) -> Result<Document, crate::TableError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(MarshalError::NotAnObject {
            found: json_type(&other),
        }
        .into()),
    }
}

/// Deserializes a document into any caller type.
pub fn from_document<T: serde::de::DeserializeOwned>(doc: Document) -> Result<T, crate::TableError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
