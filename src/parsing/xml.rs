//! XML lowering shared by the metadata parsers
//!
//! Salesforce metadata XML is element-heavy: no meaningful XML attributes,
//! one namespace, text only at the leaves. [`parse_xml`] reads a document
//! into a raw [`Element`] tree (namespace prefixes stripped, document order
//! preserved), and [`element_to_node`] lowers an element into a [`MetaNode`]
//! by turning single leaf children into attributes and everything else into
//! child nodes.

use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::Result;
use crate::schema::MetaNode;

use super::parse_failure;

/// A raw XML element: local name, trimmed text content, ordered children
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub name: String,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    /// Whether this element has no child elements
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// First child element with the given name
    pub fn first(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All child elements with the given name, in document order
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text content of the first child with the given name
    pub fn text_of(&self, name: &str) -> Option<&str> {
        self.first(name).map(|c| c.text.as_str()).filter(|t| !t.is_empty())
    }

    /// Text content of the first child with the given name, or a default
    pub fn text_or(&self, name: &str, default: &str) -> String {
        self.text_of(name).unwrap_or(default).to_string()
    }

    /// Whether the named child holds the literal text "true"
    pub fn bool_of(&self, name: &str) -> bool {
        self.text_of(name) == Some("true")
    }
}

/// Parse an XML document into its root element
///
/// Fails with `ParseFailure` on malformed XML, naming the file.
pub fn parse_xml(path: &Path, content: &str) -> Result<Element> {
    let mut reader = Reader::from_str(content);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                stack.push(Element {
                    name: local_name(start.name().as_ref()),
                    text: String::new(),
                    children: Vec::new(),
                });
            }
            Ok(Event::Empty(start)) => {
                let element = Element {
                    name: local_name(start.name().as_ref()),
                    text: String::new(),
                    children: Vec::new(),
                };
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Text(text)) => {
                if let Some(top) = stack.last_mut() {
                    let unescaped = text
                        .unescape()
                        .map_err(|e| parse_failure(path, e.to_string()))?;
                    top.text.push_str(unescaped.trim());
                }
            }
            Ok(Event::CData(cdata)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(String::from_utf8_lossy(&cdata).trim());
                }
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| parse_failure(path, "unbalanced closing tag"))?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(parse_failure(path, e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(parse_failure(path, "unclosed element at end of document"));
    }
    root.ok_or_else(|| parse_failure(path, "no root element"))
}

fn attach(stack: &mut Vec<Element>, root: &mut Option<Element>, element: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    }
}

/// Strip any namespace prefix from a qualified name
fn local_name(name: &[u8]) -> String {
    let name = String::from_utf8_lossy(name);
    match name.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => name.to_string(),
    }
}

/// Lower a raw element into a normalized node
///
/// A child that is a leaf and appears exactly once becomes an attribute;
/// repeated or nested children become child nodes. Leaf children that
/// repeat keep their text under a `value` attribute so nothing is lost.
pub fn element_to_node(element: &Element) -> MetaNode {
    let mut node = MetaNode::new(element.name.clone());

    for child in &element.children {
        let occurrences = element.children.iter().filter(|c| c.name == child.name).count();
        if child.is_leaf() && occurrences == 1 {
            node.set_attr(child.name.clone(), child.text.clone());
        } else if child.is_leaf() {
            let mut leaf = MetaNode::new(child.name.clone());
            leaf.set_attr("value", child.text.clone());
            node.push_child(leaf);
        } else {
            node.push_child(element_to_node(child));
        }
    }

    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(content: &str) -> Element {
        parse_xml(&PathBuf::from("test.xml"), content).unwrap()
    }

    #[test]
    fn test_parse_namespaced_document() {
        let root = parse(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <Flow xmlns="http://soap.sforce.com/2006/04/metadata">
                <apiVersion>62.0</apiVersion>
                <label>Route Leads</label>
            </Flow>"#,
        );
        assert_eq!(root.name, "Flow");
        assert_eq!(root.text_of("apiVersion"), Some("62.0"));
        assert_eq!(root.text_of("label"), Some("Route Leads"));
    }

    #[test]
    fn test_parse_malformed_fails_with_file() {
        let err = parse_xml(&PathBuf::from("bad.xml"), "<Flow><unclosed></Flow>").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bad.xml"), "{message}");
    }

    #[test]
    fn test_parse_no_root_fails() {
        assert!(parse_xml(&PathBuf::from("empty.xml"), "   ").is_err());
    }

    #[test]
    fn test_element_to_node_single_leaves_become_attrs() {
        let root = parse(
            "<decisions><name>Check_Tier</name><rules><conditions><operator>EqualTo</operator></conditions></rules></decisions>",
        );
        let node = element_to_node(&root);
        assert_eq!(node.attr("name"), Some("Check_Tier"));
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children[0].kind, "rules");
        assert_eq!(node.children[0].children[0].attr("operator"), Some("EqualTo"));
    }

    #[test]
    fn test_element_to_node_repeated_leaves_become_children() {
        let root = parse("<related><fields>Name</fields><fields>Status__c</fields></related>");
        let node = element_to_node(&root);
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[0].attr("value"), Some("Name"));
        assert_eq!(node.children[1].attr("value"), Some("Status__c"));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let content = "<Flow><a>1</a><b><c>2</c></b></Flow>";
        let first = element_to_node(&parse(content));
        let second = element_to_node(&parse(content));
        assert_eq!(first, second);
    }
}
