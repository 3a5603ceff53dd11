//! Parsers for Custom Object and Custom Field metadata
//!
//! Objects and fields share a module because they ship together under
//! `objects/<Object>/` and both describe the data model.

use std::path::Path;

use crate::error::Result;
use crate::schema::MetaNode;

use super::xml::parse_xml;
use super::{object_from_path, parse_failure};

/// Parse a `.object-meta.xml` definition
pub fn parse_object(path: &Path, content: &str) -> Result<MetaNode> {
    let root = parse_xml(path, content)?;
    if root.name != "CustomObject" {
        return Err(parse_failure(
            path,
            format!("expected CustomObject root, found {}", root.name),
        ));
    }

    let object_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim_end_matches(".object-meta.xml"))
        .unwrap_or("Unknown")
        .to_string();

    let mut node = MetaNode::new("objectDefinition");
    node.set_attr("objectName", object_name.clone());
    node.set_attr("object", object_name);
    node.set_attr("sharingModel", root.text_or("sharingModel", ""));
    node.set_attr("deploymentStatus", root.text_or("deploymentStatus", ""));
    node.set_attr("enableActivities", root.text_or("enableActivities", ""));
    node.set_attr("enableHistory", root.text_or("enableHistory", ""));
    node.set_attr("enableReports", root.text_or("enableReports", ""));
    node.set_attr("enableSearch", root.text_or("enableSearch", ""));

    if let Some(name_field) = root.first("nameField") {
        node.set_attr("nameFieldType", name_field.text_or("type", ""));
    }

    // Non-default action overrides, as a sorted summary
    let mut overrides: Vec<(String, String)> = Vec::new();
    for ov in root.all("actionOverrides") {
        let action = ov.text_or("actionName", "");
        let ov_type = ov.text_or("type", "");
        if !action.is_empty() && ov_type != "Default" && !ov_type.is_empty() {
            overrides.push((action, ov_type));
        }
    }
    overrides.sort();
    overrides.dedup();
    for (action, ov_type) in overrides {
        let mut o = MetaNode::new("actionOverride");
        o.set_attr("action", action);
        o.set_attr("type", ov_type);
        node.push_child(o);
    }

    Ok(node)
}

/// Parse a `.field-meta.xml` definition
pub fn parse_field(path: &Path, content: &str) -> Result<MetaNode> {
    let root = parse_xml(path, content)?;
    if root.name != "CustomField" {
        return Err(parse_failure(
            path,
            format!("expected CustomField root, found {}", root.name),
        ));
    }

    let stem = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim_end_matches(".field-meta.xml"))
        .unwrap_or("Unknown");

    let mut node = MetaNode::new("fieldDefinition");
    node.set_attr("fieldName", root.text_or("fullName", stem));
    node.set_attr("object", object_from_path(path));
    node.set_attr("type", root.text_or("type", "Unknown"));
    node.set_attr("label", root.text_or("label", ""));
    node.set_attr("required", root.text_or("required", "false"));
    node.set_attr("unique", root.text_or("unique", "false"));
    node.set_attr("externalId", root.text_or("externalId", "false"));
    node.set_attr("length", root.text_or("length", ""));
    node.set_attr("precision", root.text_or("precision", ""));
    node.set_attr("scale", root.text_or("scale", ""));

    if root.text_of("defaultValue").is_some() {
        node.set_attr("hasDefaultValue", "true");
    }
    if root.text_of("formula").is_some() {
        node.set_attr("isFormula", "true");
        node.set_attr("formulaTreatBlanksAs", root.text_or("formulaTreatBlanksAs", ""));
    }
    if let Some(reference_to) = root.text_of("referenceTo") {
        node.set_attr("referenceTo", reference_to);
        node.set_attr("relationshipName", root.text_or("relationshipName", ""));
        node.set_attr("deleteConstraint", root.text_or("deleteConstraint", ""));
    }

    // Picklist shape only, never the specific values
    if let Some(value_set) = root.first("valueSet") {
        node.set_attr("hasPicklist", "true");
        node.set_attr("picklistRestricted", value_set.text_or("restricted", "false"));
    }

    Ok(node)
}
