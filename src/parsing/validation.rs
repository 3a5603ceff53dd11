//! Parser for Validation Rule metadata (`.validationRule-meta.xml`)
//!
//! The interesting content is the error-condition formula; it is analyzed
//! into structural facts (functions used, condition count, nesting depth)
//! rather than carried through verbatim alone.

use std::path::Path;

use crate::error::Result;
use crate::schema::MetaNode;

use super::xml::parse_xml;
use super::{object_from_path, parse_failure};

/// Formula functions recognized for structural tagging
const FORMULA_FUNCTIONS: &[&str] = &[
    "AND", "OR", "NOT", "IF", "CASE", "ISBLANK", "ISNULL", "ISPICKVAL", "ISCHANGED", "ISNEW",
    "PRIORVALUE", "TEXT", "VALUE", "LEN", "LEFT", "RIGHT", "MID", "CONTAINS", "BEGINS", "INCLUDES",
    "TODAY", "NOW", "DATEVALUE", "DATETIMEVALUE", "YEAR", "MONTH", "DAY", "REGEX", "SUBSTITUTE",
    "TRIM", "NULLVALUE", "BLANKVALUE", "HYPERLINK", "IMAGE",
];

pub fn parse(path: &Path, content: &str) -> Result<MetaNode> {
    let root = parse_xml(path, content)?;
    if root.name != "ValidationRule" {
        return Err(parse_failure(
            path,
            format!("expected ValidationRule root, found {}", root.name),
        ));
    }

    let stem = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim_end_matches(".validationRule-meta.xml"))
        .unwrap_or("unnamed");

    let formula = root.text_or("errorConditionFormula", "");

    let mut node = MetaNode::new("validationRule");
    node.set_attr("fullName", root.text_or("fullName", stem));
    node.set_attr("active", root.text_or("active", "false"));
    node.set_attr("object", object_from_path(path));
    node.set_attr("errorDisplayField", root.text_or("errorDisplayField", ""));
    node.set_attr("errorMessage", root.text_or("errorMessage", ""));

    node.push_child(analyze_formula(&formula));

    Ok(node)
}

/// Analyze a formula into a structural node
fn analyze_formula(formula: &str) -> MetaNode {
    let mut node = MetaNode::new("formula");
    node.set_attr("text", formula);

    if formula.is_empty() {
        node.set_attr("conditionCount", "0");
        node.set_attr("nestingDepth", "0");
        return node;
    }

    let upper = formula.to_uppercase();

    for func in FORMULA_FUNCTIONS {
        if upper.contains(&format!("{func}(")) {
            let mut f = MetaNode::new("function");
            f.set_attr("name", *func);
            node.push_child(f);
        }
    }

    // AND/OR branches, plus the implicit top-level condition
    let condition_count = upper.matches("AND(").count() + upper.matches("OR(").count() + 1;
    node.set_attr("conditionCount", condition_count.to_string());
    node.set_attr("nestingDepth", nesting_depth(formula).to_string());

    if formula.contains("$Permission") {
        node.set_attr("usesPermissions", "true");
    }
    if formula.contains("RecordType") {
        node.set_attr("usesRecordType", "true");
    }
    if formula.contains("$Profile") || formula.contains("$UserRole") {
        node.set_attr("usesProfile", "true");
    }

    node
}

fn nesting_depth(formula: &str) -> usize {
    let mut max_depth = 0usize;
    let mut depth = 0isize;
    for c in formula.chars() {
        match c {
            '(' => {
                depth += 1;
                max_depth = max_depth.max(depth as usize);
            }
            ')' => depth -= 1,
            _ => {}
        }
    }
    max_depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const RULE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ValidationRule xmlns="http://soap.sforce.com/2006/04/metadata">
    <fullName>Require_Close_Reason</fullName>
    <active>true</active>
    <errorConditionFormula>AND(ISPICKVAL(StageName, "Closed Lost"), ISBLANK(Close_Reason__c))</errorConditionFormula>
    <errorDisplayField>Close_Reason__c</errorDisplayField>
    <errorMessage>Enter a close reason before closing.</errorMessage>
</ValidationRule>"#;

    fn rule_path() -> PathBuf {
        PathBuf::from(
            "force-app/main/default/objects/Opportunity/validationRules/Require_Close_Reason.validationRule-meta.xml",
        )
    }

    #[test]
    fn test_rule_attrs_and_object_from_path() {
        let node = parse(&rule_path(), RULE).unwrap();
        assert_eq!(node.kind, "validationRule");
        assert_eq!(node.attr("fullName"), Some("Require_Close_Reason"));
        assert_eq!(node.attr("active"), Some("true"));
        assert_eq!(node.attr("object"), Some("Opportunity"));
    }

    #[test]
    fn test_formula_analysis() {
        let node = parse(&rule_path(), RULE).unwrap();
        let formula = node.children.iter().find(|c| c.kind == "formula").unwrap();
        // AND( + the implicit top-level condition
        assert_eq!(formula.attr("conditionCount"), Some("2"));
        assert_eq!(formula.attr("nestingDepth"), Some("2"));
        let functions: Vec<&str> = formula
            .children
            .iter()
            .filter_map(|c| c.attr("name"))
            .collect();
        assert!(functions.contains(&"AND"));
        assert!(functions.contains(&"ISPICKVAL"));
        assert!(functions.contains(&"ISBLANK"));
    }

    #[test]
    fn test_empty_formula() {
        let xml = "<ValidationRule><fullName>Stub</fullName></ValidationRule>";
        let node = parse(&rule_path(), xml).unwrap();
        let formula = node.children.iter().find(|c| c.kind == "formula").unwrap();
        assert_eq!(formula.attr("conditionCount"), Some("0"));
        assert!(formula.children.is_empty());
    }
}
