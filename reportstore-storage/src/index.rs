//! Index specifications

use serde::{Deserialize, Serialize};

use crate::filters::SortDirection;

/// A named key mapping describing a required index
///
/// Two specifications describe the same index when their key mappings are
/// equal, field order included. The name and uniqueness flag only matter
/// when the index is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpecification {
    pub name: String,
    pub keys: Vec<(String, SortDirection)>,
    #[serde(default)]
    pub unique: bool,
}

impl IndexSpecification {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
            unique: false,
        }
    }

    pub fn ascending(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), SortDirection::Ascending));
        self
    }

    pub fn descending(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), SortDirection::Descending));
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Whether `other` covers the same key mapping
    pub fn same_keys(&self, other: &IndexSpecification) -> bool {
        self.keys == other.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping_comparison_ignores_name() {
        let a = IndexSpecification::new("by_id").ascending("id").unique();
        let b = IndexSpecification::new("id_1").ascending("id");
        assert!(a.same_keys(&b));
    }

    #[test]
    fn test_key_mapping_comparison_respects_order_and_direction() {
        let a = IndexSpecification::new("a").ascending("name").ascending("id");
        let b = IndexSpecification::new("b").ascending("id").ascending("name");
        let c = IndexSpecification::new("c").ascending("name").descending("id");
        assert!(!a.same_keys(&b));
        assert!(!a.same_keys(&c));
    }
}
