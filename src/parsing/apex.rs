//! Parser for Apex classes (`.cls`)
//!
//! Structural scan only: method signatures, annotations, class hierarchy,
//! SOQL/DML shapes. Method bodies are proprietary business logic and are
//! never carried into the tree.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::schema::MetaNode;

use super::parse_failure;

static ANNOTATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@(\w+)(?:\([^)]*\))?").expect("annotation regex"));

static CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)(public|private|global)\s+(?:(?:virtual|abstract|with sharing|without sharing|inherited sharing)\s+)*class\s+\w+\s*(?:extends\s+(\w+))?\s*(?:implements\s+([\w\s,.<>]+?))?\s*\{",
    )
    .expect("class regex")
});

static METHOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(public|private|global|protected)\s+(?:static\s+)?(\w+(?:<[\w,\s.]+>)?)\s+(\w+)\s*\(([^)]*)\)",
    )
    .expect("method regex")
});

static SOQL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[\s*SELECT\s+.+?\s+FROM\s+(\w+)").expect("soql regex"));

const DML_OPERATIONS: &[&str] = &["insert", "update", "upsert", "delete", "undelete", "merge"];

pub fn parse(path: &Path, content: &str) -> Result<MetaNode> {
    if content.trim().is_empty() {
        return Err(parse_failure(path, "empty class file"));
    }

    let class_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unknown")
        .to_string();

    let lower = content.to_lowercase();
    let is_test = lower.contains("@istest") || lower.contains("testmethod");

    let mut node = MetaNode::new("apexClass");
    node.set_attr("className", class_name.clone());

    // Annotations, deduplicated in order of appearance
    let mut seen_annotations: Vec<String> = Vec::new();
    for cap in ANNOTATION_RE.captures_iter(content) {
        let name = cap[1].to_string();
        if !seen_annotations.contains(&name) {
            seen_annotations.push(name);
        }
    }
    let is_aura_enabled = seen_annotations.iter().any(|a| a == "AuraEnabled");
    let is_rest_resource = seen_annotations.iter().any(|a| a == "RestResource");
    for annotation in &seen_annotations {
        let mut a = MetaNode::new("annotation");
        a.set_attr("name", annotation.clone());
        node.push_child(a);
    }

    // Class declaration: access, superclass, interfaces
    let mut is_batch = false;
    let mut is_schedulable = false;
    if let Some(cap) = CLASS_RE.captures(content) {
        node.set_attr("accessModifier", &cap[1]);
        if let Some(extends) = cap.get(2) {
            node.set_attr("extends", extends.as_str());
        }
        if let Some(implements) = cap.get(3) {
            for interface in implements.as_str().split(',') {
                let interface = interface.trim();
                if interface.is_empty() {
                    continue;
                }
                if interface.contains("Database.Batchable") {
                    is_batch = true;
                }
                if interface.contains("Schedulable") {
                    is_schedulable = true;
                }
                let mut i = MetaNode::new("interface");
                i.set_attr("name", interface);
                node.push_child(i);
            }
        }
    } else {
        node.set_attr("accessModifier", "public");
    }

    // Method signatures (structural only, not the body)
    for cap in METHOD_RE.captures_iter(content) {
        let params = cap[4].split(',').filter(|p| !p.trim().is_empty()).count();
        let mut m = MetaNode::new("method");
        m.set_attr("access", &cap[1]);
        m.set_attr("returnType", &cap[2]);
        m.set_attr("name", &cap[3]);
        m.set_attr("paramCount", params.to_string());
        node.push_child(m);
    }

    // SOQL query shapes and referenced objects
    let mut objects: Vec<String> = Vec::new();
    for cap in SOQL_RE.captures_iter(content) {
        let object = cap[1].to_string();
        let mut s = MetaNode::new("soql");
        s.set_attr("object", object.clone());
        node.push_child(s);
        if !objects.contains(&object) {
            objects.push(object);
        }
    }

    // DML operations used anywhere in the class
    for op in DML_OPERATIONS {
        let op_re = Regex::new(&format!(r"(?i)\b{op}\s+\w+")).expect("dml regex");
        if op_re.is_match(content) {
            let mut d = MetaNode::new("dml");
            d.set_attr("operation", *op);
            node.push_child(d);
        }
    }

    node.set_attr("object", objects.first().cloned().unwrap_or_else(|| "Unknown".to_string()));
    set_flag(&mut node, "isTest", is_test);
    set_flag(&mut node, "isBatch", is_batch);
    set_flag(&mut node, "isSchedulable", is_schedulable);
    set_flag(&mut node, "isAuraEnabled", is_aura_enabled);
    set_flag(&mut node, "isRestResource", is_rest_resource);
    set_flag(
        &mut node,
        "isTriggerHandler",
        content.contains("TriggerHandler") || class_name.to_lowercase().contains("trigger"),
    );

    Ok(node)
}

fn set_flag(node: &mut MetaNode, key: &str, value: bool) {
    if value {
        node.set_attr(key, "true");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const CLASS: &str = r#"
@RestResource(urlMapping='/leads/*')
public with sharing class LeadRouterService implements Database.Batchable<SObject>, Schedulable {
    @AuraEnabled
    public static List<Lead> findUnrouted(Integer max) {
        List<Lead> leads = [SELECT Id, OwnerId FROM Lead WHERE IsConverted = false LIMIT :max];
        return leads;
    }

    private void assignOwners(List<Lead> leads, Id queueId) {
        for (Lead l : leads) { l.OwnerId = queueId; }
        update leads;
    }
}
"#;

    fn parse_class(content: &str) -> MetaNode {
        parse(&PathBuf::from("classes/LeadRouterService.cls"), content).unwrap()
    }

    #[test]
    fn test_class_shape() {
        let node = parse_class(CLASS);
        assert_eq!(node.kind, "apexClass");
        assert_eq!(node.attr("className"), Some("LeadRouterService"));
        assert_eq!(node.attr("accessModifier"), Some("public"));
        assert_eq!(node.attr("isBatch"), Some("true"));
        assert_eq!(node.attr("isSchedulable"), Some("true"));
        assert_eq!(node.attr("isAuraEnabled"), Some("true"));
        assert_eq!(node.attr("isRestResource"), Some("true"));
        assert_eq!(node.attr("object"), Some("Lead"));
    }

    #[test]
    fn test_methods_without_bodies() {
        let node = parse_class(CLASS);
        let methods: Vec<&MetaNode> = node.children.iter().filter(|c| c.kind == "method").collect();
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].attr("name"), Some("findUnrouted"));
        assert_eq!(methods[0].attr("paramCount"), Some("1"));
        assert_eq!(methods[1].attr("name"), Some("assignOwners"));
        assert_eq!(methods[1].attr("paramCount"), Some("2"));
        // Body text never lands in the tree
        let json = serde_json::to_string(&node).unwrap();
        assert!(!json.contains("queueId"));
    }

    #[test]
    fn test_soql_and_dml_shapes() {
        let node = parse_class(CLASS);
        assert_eq!(node.count_kinds(|k| k == "soql"), 1);
        let dml: Vec<&str> = node
            .children
            .iter()
            .filter(|c| c.kind == "dml")
            .filter_map(|c| c.attr("operation"))
            .collect();
        assert!(dml.contains(&"update"));
        assert!(!dml.contains(&"delete"));
    }

    #[test]
    fn test_empty_file_fails() {
        assert!(parse(&PathBuf::from("classes/Empty.cls"), "  \n").is_err());
    }
}
