//! Placeholder registry shared by every clause of one request.
//!
//! Names and values draw from a single counter, so a request's tokens read
//! `#attr0`, `:val1`, `#attr2`, ... in allocation order. A name segment that was
//! already registered reuses its placeholder; values always get a fresh one.

use std::collections::HashMap;

use dynamo_table_model::types::{ExpressionAttributeNames, ExpressionAttributeValues};
use serde_json::Value;

use super::path::{AttributePath, PathElement};
use crate::error::MarshalError;
use crate::marshal::Marshaller;

/// Allocates `#attrN` / `:valN` placeholders for one request.
#[derive(Debug, Clone, Default)]
pub struct ExpressionAttributes {
    counter: usize,
    /// Attribute name -> placeholder.
    interned: HashMap<String, String>,
    /// Placeholder -> attribute name.
    names: HashMap<String, String>,
    /// Placeholder -> literal, in allocation order.
    values: Vec<(String, Value)>,
}

impl ExpressionAttributes {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every name segment of `path` and returns the escaped path,
    /// e.g. `#attr0.#attr1[2]`.
    pub fn add_name(&mut self, path: &AttributePath) -> String {
        let mut escaped = String::new();
        for element in path.elements() {
            match element {
                PathElement::Name(name) => {
                    if !escaped.is_empty() {
                        escaped.push('.');
                    }
                    let placeholder = self.intern(name);
                    escaped.push_str(&placeholder);
                }
                PathElement::Index(idx) => {
                    escaped.push('[');
                    escaped.push_str(&idx.to_string());
                    escaped.push(']');
                }
            }
        }
        escaped
    }

    /// Registers a literal and returns its fresh placeholder.
    pub fn add_value(&mut self, value: Value) -> String {
        let placeholder = format!(":val{}", self.next());
        self.values.push((placeholder.clone(), value));
        placeholder
    }

    /// Placeholder to attribute name.
    #[must_use]
    pub fn names(&self) -> &HashMap<String, String> {
        &self.names
    }

    /// Placeholder to literal, before marshalling.
    #[must_use]
    pub fn values(&self) -> HashMap<String, Value> {
        self.values.iter().cloned().collect()
    }

    /// Looks up the literal behind a value placeholder.
    #[must_use]
    pub fn value(&self, placeholder: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(p, _)| p == placeholder)
            .map(|(_, v)| v)
    }

    /// True when nothing was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.values.is_empty()
    }

    /// Encodes the values through `marshaller` and returns both maps, ready
    /// for `ExpressionAttributeNames` / `ExpressionAttributeValues`.
    pub fn into_parts(
        self,
        marshaller: &dyn Marshaller,
    ) -> Result<(ExpressionAttributeNames, ExpressionAttributeValues), MarshalError> {
        let values = self
            .values
            .into_iter()
            .map(|(placeholder, value)| Ok((placeholder, marshaller.marshall_value(&value)?)))
            .collect::<Result<_, MarshalError>>()?;
        Ok((self.names, values))
    }

    fn intern(&mut self, name: &str) -> String {
        if let Some(placeholder) = self.interned.get(name) {
            return placeholder.clone();
        }
        let placeholder = format!("#attr{}", self.next());
        self.interned.insert(name.to_owned(), placeholder.clone());
        self.names.insert(placeholder.clone(), name.to_owned());
        placeholder
    }

    fn next(&mut self) -> usize {
        let n = self.counter;
        self.counter += 1;
        n
    }
}
