//! Selectors and find options - structural query objects handed to collections
//!
//! Both are shallow JSON objects. Merging is shallow too: keys of the merged-in
//! object replace keys of the receiver.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Operator key for "is one of" constraints
pub const IN_OPERATOR: &str = "$in";

/// Attribute holding a document's identity
pub const ID_FIELD: &str = "_id";

/// Structural query constraint: exact matches per field plus `$in` lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(Map<String, Value>);

impl Selector {
    /// Create an empty selector (matches everything)
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Selector matching a single identity
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().eq(ID_FIELD, id.into())
    }

    /// Add an exact-match constraint
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Add an "is one of" constraint
    pub fn is_in<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let mut constraint = Map::new();
        constraint.insert(IN_OPERATOR.to_string(), Value::Array(values));
        self.0.insert(field.into(), Value::Object(constraint));
        self
    }

    /// Shallow merge; keys in `other` win
    pub fn merge(mut self, other: Selector) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Constraint for a field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Check whether a document's attributes satisfy every constraint.
    ///
    /// A missing attribute only matches a `null` constraint.
    pub fn matches(&self, attributes: &Map<String, Value>) -> bool {
        self.0.iter().all(|(field, constraint)| {
            let value = attributes.get(field).unwrap_or(&Value::Null);
            match in_list(constraint) {
                Some(candidates) => candidates.iter().any(|candidate| candidate == value),
                None => constraint == value,
            }
        })
    }
}

fn in_list(constraint: &Value) -> Option<&Vec<Value>> {
    let object = constraint.as_object()?;
    if object.len() != 1 {
        return None;
    }
    object.get(IN_OPERATOR)?.as_array()
}

impl From<Map<String, Value>> for Selector {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Selector> for Value {
    fn from(selector: Selector) -> Self {
        Value::Object(selector.0)
    }
}

/// Query parameters (projection, paging, sorting) passed alongside a selector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindOptions(Map<String, Value>);

impl FindOptions {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Set an arbitrary option
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Restrict the number of returned documents
    pub fn limit(self, limit: usize) -> Self {
        self.set("limit", limit)
    }

    /// Skip a number of leading documents
    pub fn skip(self, skip: usize) -> Self {
        self.set("skip", skip)
    }

    /// Project returned documents onto the given attributes (identity always kept)
    pub fn fields<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let projection: Map<String, Value> = fields
            .into_iter()
            .map(|field| (field.into(), Value::from(1)))
            .collect();
        self.set("fields", Value::Object(projection))
    }

    /// Shallow merge; keys in `other` win, keys only in `self` are kept
    pub fn merge(mut self, other: FindOptions) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.get("limit").and_then(Value::as_u64).map(|n| n as usize)
    }

    pub fn skip_value(&self) -> Option<usize> {
        self.get("skip").and_then(Value::as_u64).map(|n| n as usize)
    }

    /// Attributes selected by a `fields` projection, if any
    pub fn projected_fields(&self) -> Option<Vec<&str>> {
        let projection = self.get("fields")?.as_object()?;
        Some(
            projection
                .iter()
                .filter(|(_, include)| is_truthy(include))
                .map(|(field, _)| field.as_str())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::Null => false,
        _ => true,
    }
}

impl From<Map<String, Value>> for FindOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
