//! Core data model: normalized metadata trees and catalog patterns

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Current schema version for stored structures
/// 1.1 - Connector nodes folded into their owning element
/// 1.2 - Fingerprint excludes cosmetic attributes
pub const SCHEMA_VERSION: &str = "1.2";

// FNV-1a constants for 64-bit hash
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Compute a stable FNV-1a hash (deterministic across runs and platforms)
///
/// Used for pattern fingerprints and semantic-search cache keys.
pub fn fnv1a_hash(data: &str) -> u64 {
    let mut hash = FNV_OFFSET;
    for byte in data.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// A normalized metadata document: a type tag, an attribute mapping, and
/// ordered children.
///
/// Every parser lowers its document kind into this shape, so the anonymizer
/// and extractor never see raw XML or source text. Attributes use a BTreeMap
/// so serialization and fingerprinting are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaNode {
    /// Node type tag (e.g. "flow", "decision", "recordLookup")
    pub kind: String,

    /// Attribute mapping, deterministically ordered
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,

    /// Ordered child nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MetaNode>,
}

impl MetaNode {
    /// Create an empty node with the given kind
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter; empty values are dropped
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Set an attribute; empty values are dropped
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.attrs.insert(key.into(), value);
        }
    }

    /// Look up an attribute value
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Append a child node
    pub fn push_child(&mut self, child: MetaNode) {
        self.children.push(child);
    }

    /// Pre-order walk over the whole tree
    pub fn walk(&self, f: &mut impl FnMut(&MetaNode)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }

    /// Count nodes (including self) whose kind matches the predicate
    pub fn count_kinds(&self, pred: impl Fn(&str) -> bool) -> usize {
        let mut count = 0;
        self.walk(&mut |node| {
            if pred(&node.kind) {
                count += 1;
            }
        });
        count
    }
}

/// Display category for a pattern (fixed enumeration)
///
/// Serializes as its display label ("Flow Logic"), which is also the value
/// persisted in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    FlowLogic,
    DataValidation,
    DataModel,
    UiComponent,
    Reporting,
    PageLayout,
    ApexLogic,
}

impl Category {
    /// Human-readable label, also the value persisted in the catalog
    pub fn label(&self) -> &'static str {
        match self {
            Category::FlowLogic => "Flow Logic",
            Category::DataValidation => "Data Validation",
            Category::DataModel => "Data Model",
            Category::UiComponent => "UI Component",
            Category::Reporting => "Reporting",
            Category::PageLayout => "Page Layout",
            Category::ApexLogic => "Apex Logic",
        }
    }

    /// Lowercase slug for tags ("flow-logic", "data-validation", ...)
    pub fn slug(&self) -> String {
        self.label().to_lowercase().replace(' ', "-")
    }

    /// Parse a label back into a category (accepts label or slug)
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase().replace('-', " ");
        match normalized.as_str() {
            "flow logic" => Some(Category::FlowLogic),
            "data validation" => Some(Category::DataValidation),
            "data model" => Some(Category::DataModel),
            "ui component" => Some(Category::UiComponent),
            "reporting" => Some(Category::Reporting),
            "page layout" => Some(Category::PageLayout),
            "apex logic" => Some(Category::ApexLogic),
            _ => None,
        }
    }

    /// All categories, for stats aggregation
    pub fn all() -> &'static [Category] {
        &[
            Category::FlowLogic,
            Category::DataValidation,
            Category::DataModel,
            Category::UiComponent,
            Category::Reporting,
            Category::PageLayout,
            Category::ApexLogic,
        ]
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Category {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Category::from_label(&label)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown category \"{label}\"")))
    }
}

/// An extracted, anonymized pattern ready for insertion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPattern {
    /// Fine-grained label within the category (e.g. "flow_full", "validation_rule")
    pub pattern_type: String,

    /// Display category
    pub category: Category,

    /// Derived human-readable name
    pub name: String,

    /// Derived description
    pub description: String,

    /// Primary entity the source document described
    pub source_object: String,

    /// Source file name (path label, not sensitive)
    pub source_file: String,

    /// Metadata API version of the source document, if it carries one
    pub api_version: String,

    /// Structural complexity, 1..=5
    pub complexity_score: u8,

    /// Field API name references found in the structure
    pub field_references: Vec<String>,

    /// Search tags
    pub tags: Vec<String>,

    /// Anonymized structure
    pub structure: MetaNode,

    /// Stable hash over the structure's shape (16-char hex)
    pub fingerprint: String,
}

/// A stored catalog pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: i64,
    pub pattern_type: String,
    pub category: Category,
    pub name: String,
    pub description: String,
    pub source_object: String,
    pub source_file: String,
    pub api_version: String,
    pub complexity_score: u8,
    pub field_references: Vec<String>,
    pub tags: Vec<String>,
    pub structure: MetaNode,
    pub fingerprint: String,
    pub favorited: bool,
    pub use_count: i64,
    pub created_at: String,
}

impl Pattern {
    /// Lightweight view for list output and LLM context rows
    pub fn to_summary(&self) -> PatternSummary {
        PatternSummary {
            id: self.id,
            pattern_type: self.pattern_type.clone(),
            category: self.category,
            name: self.name.clone(),
            description: self.description.clone(),
            source_object: self.source_object.clone(),
            complexity_score: self.complexity_score,
            tags: self.tags.clone(),
            favorited: self.favorited,
            use_count: self.use_count,
        }
    }
}

/// Lightweight pattern view for grid/list output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSummary {
    pub id: i64,
    pub pattern_type: String,
    pub category: Category,
    pub name: String,
    pub description: String,
    pub source_object: String,
    pub complexity_score: u8,
    pub tags: Vec<String>,
    pub favorited: bool,
    pub use_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_deterministic() {
        assert_eq!(fnv1a_hash("decision"), fnv1a_hash("decision"));
        assert_ne!(fnv1a_hash("decision"), fnv1a_hash("loop"));
    }

    #[test]
    fn test_meta_node_attrs_drop_empty() {
        let node = MetaNode::new("flow")
            .with_attr("processType", "AutoLaunchedFlow")
            .with_attr("triggerType", "");
        assert_eq!(node.attr("processType"), Some("AutoLaunchedFlow"));
        assert_eq!(node.attr("triggerType"), None);
    }

    #[test]
    fn test_count_kinds_walks_nested_children() {
        let mut root = MetaNode::new("flow");
        let mut decision = MetaNode::new("decision");
        decision.push_child(MetaNode::new("rule"));
        decision.push_child(MetaNode::new("rule"));
        root.push_child(decision);
        root.push_child(MetaNode::new("loop"));

        assert_eq!(root.count_kinds(|k| k == "rule"), 2);
        assert_eq!(root.count_kinds(|k| k == "loop"), 1);
        assert_eq!(root.count_kinds(|_| true), 5);
    }

    #[test]
    fn test_category_label_round_trip() {
        for cat in Category::all() {
            assert_eq!(Category::from_label(cat.label()), Some(*cat));
            assert_eq!(Category::from_label(&cat.slug()), Some(*cat));
        }
        assert_eq!(Category::from_label("nonsense"), None);
    }
}
