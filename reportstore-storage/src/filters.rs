//! Typed query filters, find options and per-document updates
//!
//! Field names are dotted paths into the document (`attachment.data`).
//! Adapters either translate these types into their native query language
//! or evaluate them directly against JSON documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A query predicate over report documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Matches every document
    All,
    /// Field equals the value
    Eq(String, Value),
    /// Field is present (`true`) or absent (`false`)
    Exists(String, bool),
    /// Field equals one of the values
    In(String, Vec<Value>),
    /// Field holds a string; missing and null fields do not match
    IsString(String),
    /// Every sub-filter matches
    And(Vec<Filter>),
}

/// Sort direction of an index key or a find sort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Options applied to a find
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindOptions {
    /// Only return these fields
    pub projection: Option<Vec<String>>,
    pub sort: Option<Vec<(String, SortDirection)>>,
    /// Documents fetched per round trip
    pub batch_size: Option<u32>,
}

/// One update inside a bulk write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOperation {
    /// Selects the document to update; at most one document is modified
    pub selector: Filter,
    pub set: Map<String, Value>,
    pub unset: Vec<String>,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Filter::Exists(field.into(), true)
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Filter::Exists(field.into(), false)
    }

    pub fn in_values<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn is_string(field: impl Into<String>) -> Self {
        Filter::IsString(field.into())
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    /// Evaluate the filter against a JSON document
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, expected) => lookup(document, field) == Some(expected),
            Filter::Exists(field, should_exist) => lookup(document, field).is_some() == *should_exist,
            Filter::In(field, candidates) => {
                lookup(document, field).is_some_and(|value| candidates.contains(value))
            }
            Filter::IsString(field) => matches!(lookup(document, field), Some(Value::String(_))),
            Filter::And(filters) => filters.iter().all(|f| f.matches(document)),
        }
    }
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_projection<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.get_or_insert_with(Vec::new).push((field.into(), direction));
        self
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = Some(batch_size);
        self
    }
}

impl SortDirection {
    /// Numeric form used by document stores (`1` / `-1`)
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

impl UpdateOperation {
    pub fn new(selector: Filter) -> Self {
        Self {
            selector,
            set: Map::new(),
            unset: Vec::new(),
        }
    }

    /// Update the single document whose `id` equals `id`
    pub fn for_id(id: impl Into<String>) -> Self {
        Self::new(Filter::eq(crate::document::ID_FIELD, id.into()))
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(field.into(), value.into());
        self
    }

    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.unset.push(field.into());
        self
    }

    /// Apply the set/unset pairs to a JSON document in place
    pub fn apply(&self, document: &mut Value) {
        for (field, value) in &self.set {
            set_path(document, field, value.clone());
        }
        for field in &self.unset {
            unset_path(document, field);
        }
    }
}

/// Resolve a dotted path inside a JSON document
pub fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
}

/// Write a value at a dotted path, creating intermediate objects
pub fn set_path(document: &mut Value, path: &str, value: Value) {
    if !document.is_object() {
        *document = Value::Object(Map::new());
    }
    let Some(object) = document.as_object_mut() else {
        return;
    };

    match path.split_once('.') {
        None => {
            object.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = object
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            set_path(child, rest, value);
        }
    }
}

/// Remove the value at a dotted path; missing paths are ignored
pub fn unset_path(document: &mut Value, path: &str) {
    let (parent, leaf) = match path.rsplit_once('.') {
        Some((parent, leaf)) => (lookup_mut(document, parent), leaf),
        None => (Some(document), path),
    };

    if let Some(Value::Object(object)) = parent {
        object.remove(leaf);
    }
}

fn lookup_mut<'a>(document: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.as_object_mut()?.get_mut(segment))
}
