//! Parser for Flow metadata (`.flow-meta.xml`)
//!
//! Normalizes a flow into a single tree: the root carries the flow's
//! process/trigger configuration, children carry its elements (decisions,
//! loops, record operations, screens, ...) with their connectors, and
//! `variable` nodes capture the flow's input/output interface.

use std::path::Path;

use crate::error::Result;
use crate::schema::MetaNode;

use super::xml::{element_to_node, parse_xml, Element};
use super::parse_failure;

/// Flow element tags and the node kind each is normalized to
const ELEMENT_KINDS: &[(&str, &str)] = &[
    ("decisions", "decision"),
    ("recordLookups", "recordLookup"),
    ("recordUpdates", "recordUpdate"),
    ("recordCreates", "recordCreate"),
    ("recordDeletes", "recordDelete"),
    ("screens", "screen"),
    ("assignments", "assignment"),
    ("loops", "loop"),
    ("actionCalls", "actionCall"),
    ("subflows", "subflow"),
    ("formulas", "formula"),
    ("collectionProcessors", "collectionProcessor"),
];

/// Attributes that only describe canvas placement
const LAYOUT_ATTRS: &[&str] = &["locationX", "locationY"];

pub fn parse(path: &Path, content: &str) -> Result<MetaNode> {
    let root = parse_xml(path, content)?;
    if root.name != "Flow" {
        return Err(parse_failure(path, format!("expected Flow root, found {}", root.name)));
    }

    let stem = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim_end_matches(".flow-meta.xml"))
        .unwrap_or("unnamed");

    let mut node = MetaNode::new("flow");
    node.set_attr("label", root.text_or("label", stem));
    node.set_attr("processType", root.text_or("processType", "unknown"));
    node.set_attr("status", root.text_or("status", "unknown"));
    node.set_attr("triggerType", root.text_or("recordTriggerType", ""));
    node.set_attr("runInMode", root.text_or("runInMode", ""));
    node.set_attr("apiVersion", root.text_or("apiVersion", ""));
    node.set_attr("object", primary_object(&root));

    // Variable signatures (the flow's I/O interface)
    for var in root.all("variables") {
        let mut v = MetaNode::new("variable");
        v.set_attr("name", var.text_or("name", ""));
        v.set_attr("dataType", var.text_or("dataType", ""));
        v.set_attr("isInput", var.text_or("isInput", ""));
        v.set_attr("isOutput", var.text_or("isOutput", ""));
        v.set_attr("isCollection", var.text_or("isCollection", ""));
        v.set_attr("apexClass", var.text_or("apexClass", ""));
        node.push_child(v);
    }

    // Flow elements, in document order
    for child in &root.children {
        if let Some(kind) = element_kind(&child.name) {
            let mut element = element_to_node(child);
            element.kind = kind.to_string();
            for attr in LAYOUT_ATTRS {
                element.attrs.remove(*attr);
            }
            node.push_child(element);
        }
    }

    Ok(node)
}

fn element_kind(tag: &str) -> Option<&'static str> {
    ELEMENT_KINDS.iter().find(|(t, _)| *t == tag).map(|(_, k)| *k)
}

/// Detect the primary object a flow operates on
///
/// Record-triggered flows name it in the start element; otherwise the most
/// frequently referenced object among record operations wins.
fn primary_object(root: &Element) -> String {
    if let Some(start) = root.first("start") {
        if let Some(object) = start.text_of("object") {
            return object.to_string();
        }
    }

    let mut counts: Vec<(String, usize)> = Vec::new();
    for tag in ["recordLookups", "recordUpdates", "recordCreates", "recordDeletes"] {
        for element in root.all(tag) {
            if let Some(object) = element.text_of("object") {
                match counts.iter_mut().find(|(o, _)| o == object) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((object.to_string(), 1)),
                }
            }
        }
    }

    // Ties resolve to the first object seen, keeping output reproducible
    let mut best: Option<(&str, usize)> = None;
    for (object, n) in &counts {
        if best.is_none_or(|(_, best_n)| *n > best_n) {
            best = Some((object, *n));
        }
    }
    best.map(|(o, _)| o.to_string()).unwrap_or_else(|| "Unknown".to_string())
}
