//! Parser for Lightning Web Component bundles
//!
//! The primary file is the component's JS module; the template (`.html`)
//! and the bundle descriptor (`.js-meta.xml`) are read from the same
//! directory when present. Extraction is a structural scan: wire adapters,
//! Apex imports, api properties, template control flow, child components.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::schema::MetaNode;

use super::parse_failure;

static API_PROP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@api\s+(\w+)").expect("api regex"));
static TRACK_PROP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@track\s+(\w+)").expect("track regex"));
static WIRE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@wire\((\w+)").expect("wire regex"));
static APEX_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"import\s+(\w+)\s+from\s+['"]@salesforce/apex/(\w+\.\w+)['"]"#)
        .expect("apex import regex")
});
static SCHEMA_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"import\s+\w+\s+from\s+['"]@salesforce/schema/(\w+(?:\.\w+)?)['"]"#)
        .expect("schema import regex")
});
static HANDLER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(handle\w+)\s*\(").expect("handler regex"));
static CHILD_COMPONENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(c-[\w-]+|lightning-[\w-]+)").expect("child component regex"));
static CONDITIONAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:if:true|if:false|lwc:if|lwc:elseif)=\{([^}]+)\}").expect("conditional regex")
});
static ITERATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"for:each=\{([^}]+)\}").expect("iteration regex"));
static META_API_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<apiVersion>([\d.]+)</apiVersion>").expect("apiVersion regex"));
static META_TARGET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<target>([\w:]+)</target>").expect("target regex"));
static META_OBJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<objects>\s*<object>(\w+)</object>").expect("object regex"));

const LIFECYCLE_HOOKS: &[&str] = &[
    "connectedCallback",
    "disconnectedCallback",
    "renderedCallback",
    "errorCallback",
];

pub fn parse(path: &Path, js_content: &str) -> Result<MetaNode> {
    if js_content.trim().is_empty() {
        return Err(parse_failure(path, "empty component module"));
    }

    let component_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();
    let bundle_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let html_content =
        std::fs::read_to_string(bundle_dir.join(format!("{component_name}.html"))).unwrap_or_default();
    let meta_content = std::fs::read_to_string(bundle_dir.join(format!("{component_name}.js-meta.xml")))
        .unwrap_or_default();

    let mut node = MetaNode::new("lwcComponent");
    node.set_attr("componentName", component_name);

    scan_js(&mut node, js_content);
    scan_template(&mut node, &html_content);
    scan_meta(&mut node, &meta_content);

    Ok(node)
}

fn scan_js(node: &mut MetaNode, content: &str) {
    for cap in API_PROP_RE.captures_iter(content) {
        push_named(node, "apiProperty", &cap[1]);
    }
    for cap in TRACK_PROP_RE.captures_iter(content) {
        push_named(node, "trackedProperty", &cap[1]);
    }
    for cap in WIRE_RE.captures_iter(content) {
        push_named(node, "wireAdapter", &cap[1]);
    }
    for cap in APEX_IMPORT_RE.captures_iter(content) {
        let mut call = MetaNode::new("apexCall");
        call.set_attr("localName", &cap[1]);
        call.set_attr("method", &cap[2]);
        node.push_child(call);
    }
    for cap in SCHEMA_IMPORT_RE.captures_iter(content) {
        push_named(node, "fieldImport", &cap[1]);
    }

    let mut seen_handlers: Vec<String> = Vec::new();
    for cap in HANDLER_RE.captures_iter(content) {
        let name = cap[1].to_string();
        if !seen_handlers.contains(&name) {
            push_named(node, "eventHandler", &name);
            seen_handlers.push(name);
        }
    }

    for hook in LIFECYCLE_HOOKS {
        if content.contains(hook) {
            push_named(node, "lifecycleHook", hook);
        }
    }

    if content.contains("NavigationMixin") {
        node.set_attr("usesNavigation", "true");
    }
    if content.contains("ShowToastEvent") {
        node.set_attr("usesToast", "true");
    }
}

fn scan_template(node: &mut MetaNode, content: &str) {
    if content.is_empty() {
        return;
    }

    let mut seen_children: Vec<String> = Vec::new();
    for cap in CHILD_COMPONENT_RE.captures_iter(content) {
        let tag = cap[1].to_string();
        if !seen_children.contains(&tag) {
            push_named(node, "childComponent", &tag);
            seen_children.push(tag);
        }
    }
    for cap in CONDITIONAL_RE.captures_iter(content) {
        let mut c = MetaNode::new("conditional");
        c.set_attr("expression", cap[1].trim());
        node.push_child(c);
    }
    for cap in ITERATION_RE.captures_iter(content) {
        let mut i = MetaNode::new("iteration");
        i.set_attr("expression", cap[1].trim());
        node.push_child(i);
    }
    if content.contains("<slot") {
        node.set_attr("hasSlots", "true");
    }
    if content.contains("lightning-input") || content.contains("lightning-combobox") {
        node.set_attr("hasForms", "true");
    }
}

fn scan_meta(node: &mut MetaNode, content: &str) {
    if content.is_empty() {
        return;
    }

    if let Some(cap) = META_API_VERSION_RE.captures(content) {
        node.set_attr("apiVersion", &cap[1]);
    }
    if content.contains("<isExposed>true</isExposed>") {
        node.set_attr("isExposed", "true");
    }
    for cap in META_TARGET_RE.captures_iter(content) {
        let target = cap[1].rsplit("__").next().unwrap_or(&cap[1]).to_string();
        push_named(node, "target", &target);
    }
    if let Some(cap) = META_OBJECT_RE.captures(content) {
        node.set_attr("object", &cap[1]);
    }
}

fn push_named(node: &mut MetaNode, kind: &str, name: &str) {
    let mut child = MetaNode::new(kind);
    child.set_attr("name", name);
    node.push_child(child);
}
