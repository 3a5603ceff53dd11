//! Pattern extraction from anonymized trees
//!
//! Walks an anonymized [`MetaNode`] tree and derives the catalog row for
//! it: complexity score, tags, field references, display name, and the
//! structural fingerprint used as the dedup key.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::parsing::DocKind;
use crate::schema::{fnv1a_hash, Category, MetaNode, NewPattern};

/// Complexity is capped here; a score of 1 is the baseline
pub const MAX_COMPLEXITY: u8 = 5;

/// Node kinds that represent a decision branch
const DECISION_KINDS: &[&str] = &["decision", "conditional"];
/// Node kinds that represent a loop
const LOOP_KINDS: &[&str] = &["loop", "iteration"];
/// Node kinds that represent a fault/error path
const FAULT_KINDS: &[&str] = &["faultConnector"];
/// Node kinds that reference a reusable subcomponent
const SUBCOMPONENT_KINDS: &[&str] = &["subflow", "childComponent"];

/// Attribute values that are cosmetic: display text and formatting that do
/// not change a structure's meaning. Excluded from the fingerprint so two
/// documents differing only in labels or element names dedup together.
const COSMETIC_ATTRS: &[&str] = &[
    "label",
    "name",
    "fullName",
    "description",
    "helpText",
    "interviewLabel",
    "errorMessage",
    "inputText",
    "outputText",
    "choiceText",
    "apiVersion",
    "text",
    "targetReference",
];

static CUSTOM_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\w+__[cr]\b").expect("custom field regex"));
static DOTTED_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]\w+)\.([A-Z]\w+)\b").expect("dotted field regex"));
static GLOBAL_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\w+\.(\w+)").expect("global field regex"));

/// Derive a catalog pattern from an anonymized tree
pub fn extract_pattern(tree: &MetaNode, kind: DocKind, source_file: &str) -> NewPattern {
    let category = category_for(kind);
    let complexity_score = complexity(tree);
    let field_references = field_references(tree);
    let source_object = tree.attr("object").unwrap_or("Unknown").to_string();
    let api_version = tree.attr("apiVersion").unwrap_or("").to_string();
    let name = display_name(tree, kind);
    let description = describe(tree, kind, &source_object);
    let tags = tags(tree, kind, category, &source_object, complexity_score);

    NewPattern {
        pattern_type: pattern_type(kind).to_string(),
        category,
        name,
        description,
        source_object,
        source_file: source_file.to_string(),
        api_version,
        complexity_score,
        field_references,
        tags,
        structure: tree.clone(),
        fingerprint: fingerprint(tree),
    }
}

/// The fine-grained pattern type for a document kind
pub fn pattern_type(kind: DocKind) -> &'static str {
    match kind {
        DocKind::Flow => "flow_full",
        DocKind::ValidationRule => "validation_rule",
        DocKind::ObjectDef => "object_definition",
        DocKind::FieldDef => "field_definition",
        DocKind::Report => "report_definition",
        DocKind::Layout => "layout_definition",
        DocKind::LwcComponent => "lwc_component",
        DocKind::ApexClass => "apex_class",
    }
}

/// The display category for a document kind
pub fn category_for(kind: DocKind) -> Category {
    match kind {
        DocKind::Flow => Category::FlowLogic,
        DocKind::ValidationRule => Category::DataValidation,
        DocKind::ObjectDef | DocKind::FieldDef => Category::DataModel,
        DocKind::Report => Category::Reporting,
        DocKind::Layout => Category::PageLayout,
        DocKind::LwcComponent => Category::UiComponent,
        DocKind::ApexClass => Category::ApexLogic,
    }
}

/// Structural complexity: 1 baseline, +1 per decision branch, loop, fault
/// path, and subcomponent reference, capped at [`MAX_COMPLEXITY`]
///
/// Monotonically non-decreasing in each feature count.
pub fn complexity(tree: &MetaNode) -> u8 {
    let features = tree.count_kinds(|k| DECISION_KINDS.contains(&k))
        + tree.count_kinds(|k| LOOP_KINDS.contains(&k))
        + tree.count_kinds(|k| FAULT_KINDS.contains(&k))
        + tree.count_kinds(|k| SUBCOMPONENT_KINDS.contains(&k));

    (1 + features).min(MAX_COMPLEXITY as usize) as u8
}

/// Leaf tokens shaped like field references, sorted and deduplicated
pub fn field_references(tree: &MetaNode) -> Vec<String> {
    let mut fields = BTreeSet::new();

    tree.walk(&mut |node| {
        for value in node.attrs.values() {
            for m in CUSTOM_FIELD_RE.find_iter(value) {
                fields.insert(m.as_str().to_string());
            }
            for cap in DOTTED_FIELD_RE.captures_iter(value) {
                fields.insert(format!("{}.{}", &cap[1], &cap[2]));
            }
            for cap in GLOBAL_FIELD_RE.captures_iter(value) {
                fields.insert(cap[1].to_string());
            }
        }
    });

    fields.into_iter().collect()
}

/// Stable hash over the tree's type/attribute-key shape
///
/// Includes node kinds, attribute keys, and non-cosmetic attribute values;
/// children contribute in order. Cosmetic values (labels, display text,
/// element names, API versions) are excluded so harmless formatting
/// differences produce the same fingerprint.
pub fn fingerprint(tree: &MetaNode) -> String {
    let mut canonical = String::new();
    write_canonical(tree, &mut canonical);
    format!("{:016x}", fnv1a_hash(&canonical))
}

fn write_canonical(node: &MetaNode, out: &mut String) {
    out.push('(');
    out.push_str(&node.kind);
    for (key, value) in &node.attrs {
        out.push(';');
        out.push_str(key);
        if !COSMETIC_ATTRS.contains(&key.as_str()) {
            out.push('=');
            out.push_str(value);
        }
    }
    for child in &node.children {
        write_canonical(child, out);
    }
    out.push(')');
}

/// Derived human-readable pattern name
fn display_name(tree: &MetaNode, kind: DocKind) -> String {
    let label = tree
        .attr("label")
        .or_else(|| tree.attr("fullName"))
        .or_else(|| tree.attr("name"))
        .unwrap_or("Unnamed");

    match kind {
        DocKind::Flow => format!("Flow: {}", spaced(label)),
        DocKind::ValidationRule => format!("Validation: {}", spaced(label)),
        DocKind::ObjectDef => format!("Object: {}", tree.attr("objectName").unwrap_or(label)),
        DocKind::FieldDef => {
            let field = tree.attr("fieldName").unwrap_or(label);
            match tree.attr("object") {
                Some(object) if object != "Unknown" => format!("Field: {object}.{field}"),
                _ => format!("Field: {field}"),
            }
        }
        DocKind::Report => format!("Report: {}", spaced(label)),
        DocKind::Layout => format!(
            "Layout: {} - {}",
            tree.attr("object").unwrap_or("Unknown"),
            spaced(tree.attr("name").unwrap_or(label))
        ),
        DocKind::LwcComponent => {
            format!("LWC: {}", title_case(tree.attr("componentName").unwrap_or(label)))
        }
        DocKind::ApexClass => format!("Apex: {}", tree.attr("className").unwrap_or(label)),
    }
}

/// Derived description of what the document does structurally
fn describe(tree: &MetaNode, kind: DocKind, source_object: &str) -> String {
    let on_object = |parts: &mut Vec<String>| {
        if source_object != "Unknown" && !source_object.is_empty() {
            parts.push(format!("on {source_object}"));
        }
    };

    let mut parts: Vec<String> = Vec::new();
    match kind {
        DocKind::Flow => {
            let process = tree.attr("processType").unwrap_or("unknown");
            match tree.attr("triggerType") {
                Some(trigger) if !trigger.is_empty() => {
                    parts.push(format!("{trigger}-triggered {process} flow"))
                }
                _ => parts.push(format!("{process} flow")),
            }
            on_object(&mut parts);
            let mut counts: Vec<(String, usize)> = Vec::new();
            for child in &tree.children {
                if child.kind == "variable" {
                    continue;
                }
                match counts.iter_mut().find(|(k, _)| *k == child.kind) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((child.kind.clone(), 1)),
                }
            }
            if !counts.is_empty() {
                let summary: Vec<String> =
                    counts.iter().map(|(k, n)| format!("{n} {k}")).collect();
                parts.push(format!("with {}", summary.join(", ")));
            }
        }
        DocKind::ValidationRule => {
            let status = if tree.attr("active") == Some("true") { "Active" } else { "Inactive" };
            parts.push(format!("{status} validation rule"));
            on_object(&mut parts);
            let functions: Vec<&str> = tree
                .children
                .iter()
                .filter(|c| c.kind == "formula")
                .flat_map(|f| f.children.iter())
                .filter_map(|c| c.attr("name"))
                .take(5)
                .collect();
            if !functions.is_empty() {
                parts.push(format!("using {}", functions.join(", ")));
            }
        }
        DocKind::ObjectDef => {
            parts.push(format!(
                "Custom object definition for {}",
                tree.attr("objectName").unwrap_or("Unknown")
            ));
        }
        DocKind::FieldDef => {
            parts.push(format!("{} field", tree.attr("type").unwrap_or("Unknown")));
            on_object(&mut parts);
            if let Some(reference_to) = tree.attr("referenceTo") {
                parts.push(format!("(lookup to {reference_to})"));
            }
        }
        DocKind::Report => {
            parts.push(format!(
                "{} report on {}",
                tree.attr("format").unwrap_or("Tabular"),
                tree.attr("reportType").unwrap_or("Unknown")
            ));
            let columns = tree.count_kinds(|k| k == "column");
            parts.push(format!("with {columns} columns"));
            let groupings = tree.count_kinds(|k| k == "grouping");
            if groupings > 0 {
                parts.push(format!("{groupings} groupings"));
            }
        }
        DocKind::Layout => {
            let sections = tree.count_kinds(|k| k == "section");
            let fields = tree.count_kinds(|k| k == "item");
            parts.push(format!(
                "Page layout for {} with {sections} sections and {fields} fields",
                tree.attr("object").unwrap_or("Unknown")
            ));
        }
        DocKind::LwcComponent => {
            parts.push("Lightning Web Component".to_string());
            let mut features = Vec::new();
            let wires = tree.count_kinds(|k| k == "wireAdapter");
            if wires > 0 {
                features.push(format!("{wires} wire adapters"));
            }
            let apex = tree.count_kinds(|k| k == "apexCall");
            if apex > 0 {
                features.push(format!("{apex} Apex calls"));
            }
            let props = tree.count_kinds(|k| k == "apiProperty");
            if props > 0 {
                features.push(format!("{props} api properties"));
            }
            if !features.is_empty() {
                parts.push(format!("with {}", features.join(", ")));
            }
        }
        DocKind::ApexClass => {
            if tree.attr("isTest") == Some("true") {
                parts.push("Test class".to_string());
            } else if tree.attr("isBatch") == Some("true") {
                parts.push("Batch Apex class".to_string());
            } else if tree.attr("isSchedulable") == Some("true") {
                parts.push("Schedulable Apex class".to_string());
            } else if tree.attr("isRestResource") == Some("true") {
                parts.push("REST API resource class".to_string());
            } else if tree.attr("isTriggerHandler") == Some("true") {
                parts.push("Trigger handler class".to_string());
            } else {
                parts.push("Apex class".to_string());
            }
            let methods = tree.count_kinds(|k| k == "method");
            if methods > 0 {
                parts.push(format!("with {methods} methods"));
            }
            on_object(&mut parts);
        }
    }

    let mut text = parts.join(" ");
    text.push('.');
    text
}

/// Search tags: node-kind vocabulary plus coarse shape descriptors
fn tags(
    tree: &MetaNode,
    kind: DocKind,
    category: Category,
    source_object: &str,
    complexity_score: u8,
) -> Vec<String> {
    let mut tags = vec![pattern_type(kind).to_string(), category.slug()];

    if source_object != "Unknown" && !source_object.is_empty() {
        tags.push(source_object.to_lowercase());
    }
    if let Some(api_version) = tree.attr("apiVersion") {
        if !api_version.is_empty() {
            tags.push(format!("api-v{api_version}"));
        }
    }

    // Node-kind vocabulary from the structure itself
    let mut vocabulary = BTreeSet::new();
    for child in &tree.children {
        vocabulary.insert(child.kind.to_lowercase());
    }
    tags.extend(vocabulary);

    // Shape descriptors
    if tree.count_kinds(|k| LOOP_KINDS.contains(&k)) > 0 {
        tags.push("has-loop".to_string());
    }
    if tree.count_kinds(|k| FAULT_KINDS.contains(&k)) > 0 {
        tags.push("has-fault-path".to_string());
    }
    if complexity_score >= 4 {
        tags.push("complex".to_string());
    }
    if complexity_score <= 1 {
        tags.push("simple".to_string());
    }

    tags.dedup();
    tags
}

fn spaced(name: &str) -> String {
    name.replace('_', " ").trim().to_string()
}

/// Convert a camelCase component name to a readable title
fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            out.push(' ');
        }
        if i == 0 {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow_with(decisions: usize, loops: usize, faults: usize, subflows: usize) -> MetaNode {
        let mut root = MetaNode::new("flow");
        root.set_attr("label", "Test Flow");
        root.set_attr("processType", "AutoLaunchedFlow");
        root.set_attr("object", "Lead");
        for _ in 0..decisions {
            root.push_child(MetaNode::new("decision"));
        }
        for _ in 0..loops {
            root.push_child(MetaNode::new("loop"));
        }
        for _ in 0..faults {
            let mut update = MetaNode::new("recordUpdate");
            update.push_child(MetaNode::new("faultConnector"));
            root.push_child(update);
        }
        for _ in 0..subflows {
            root.push_child(MetaNode::new("subflow"));
        }
        root
    }

    #[test]
    fn test_complexity_baseline_and_cap() {
        assert_eq!(complexity(&flow_with(0, 0, 0, 0)), 1);
        assert_eq!(complexity(&flow_with(1, 0, 0, 0)), 2);
        assert_eq!(complexity(&flow_with(1, 1, 1, 1)), 5);
        // Three decisions and a fault path: exactly the cap
        assert_eq!(complexity(&flow_with(3, 0, 1, 0)), 5);
        // Far past the cap still clamps
        assert_eq!(complexity(&flow_with(10, 10, 10, 10)), 5);
    }

    #[test]
    fn test_complexity_monotonic() {
        let mut previous = 0;
        for decisions in 0..8 {
            let score = complexity(&flow_with(decisions, 0, 0, 0));
            assert!(score >= previous);
            assert!((1..=MAX_COMPLEXITY).contains(&score));
            previous = score;
        }
    }

    #[test]
    fn test_fingerprint_ignores_cosmetic_attrs() {
        let mut a = flow_with(2, 1, 0, 0);
        let mut b = flow_with(2, 1, 0, 0);
        a.set_attr("label", "Lead Router v1");
        b.set_attr("label", "Completely Different Label");
        a.set_attr("apiVersion", "60.0");
        b.set_attr("apiVersion", "62.0");
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_sees_structural_differences() {
        let a = flow_with(2, 1, 0, 0);
        let b = flow_with(2, 0, 1, 0);
        assert_ne!(fingerprint(&a), fingerprint(&b));

        let mut c = flow_with(2, 1, 0, 0);
        c.set_attr("processType", "Workflow");
        assert_ne!(fingerprint(&a), fingerprint(&c));
    }

    #[test]
    fn test_fingerprint_sees_attr_keys_even_when_cosmetic() {
        let bare = MetaNode::new("flow");
        let labeled = MetaNode::new("flow").with_attr("label", "x");
        assert_ne!(fingerprint(&bare), fingerprint(&labeled));
    }

    #[test]
    fn test_field_references() {
        let mut root = MetaNode::new("flow");
        let mut decision = MetaNode::new("decision");
        decision.set_attr("leftValueReference", "$Record.Tier__c");
        decision.set_attr("rightValue", "Account.AnnualRevenue");
        let mut update = MetaNode::new("recordUpdate");
        update.set_attr("field", "Status__c");
        root.push_child(decision);
        root.push_child(update);

        let refs = field_references(&root);
        assert!(refs.contains(&"Tier__c".to_string()));
        assert!(refs.contains(&"Status__c".to_string()));
        assert!(refs.contains(&"Account.AnnualRevenue".to_string()));
    }

    #[test]
    fn test_extract_pattern_scenario() {
        // Three decisions plus one fault-handling path caps the score
        let tree = flow_with(3, 0, 1, 0);
        let pattern = extract_pattern(&tree, DocKind::Flow, "Route_Leads.flow-meta.xml");
        assert_eq!(pattern.complexity_score, 5);
        assert_eq!(pattern.category, Category::FlowLogic);
        assert_eq!(pattern.pattern_type, "flow_full");
        assert_eq!(pattern.name, "Flow: Test Flow");
        assert_eq!(pattern.source_object, "Lead");
        assert!(pattern.tags.contains(&"has-fault-path".to_string()));
        assert!(pattern.tags.contains(&"complex".to_string()));
        assert!(pattern.description.contains("AutoLaunchedFlow"));
    }

    #[test]
    fn test_tags_shape_descriptors() {
        let tree = flow_with(0, 1, 0, 0);
        let pattern = extract_pattern(&tree, DocKind::Flow, "f.flow-meta.xml");
        assert!(pattern.tags.contains(&"has-loop".to_string()));
        assert!(!pattern.tags.contains(&"has-fault-path".to_string()));
        assert!(pattern.tags.contains(&"loop".to_string()));
        assert!(pattern.tags.contains(&"flow-logic".to_string()));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("leadCard"), "Lead Card");
        assert_eq!(title_case("x"), "X");
    }
}
