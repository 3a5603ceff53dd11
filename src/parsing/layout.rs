//! Parser for Page Layout metadata (`.layout-meta.xml`)

use std::path::Path;

use crate::error::Result;
use crate::schema::MetaNode;

use super::xml::parse_xml;
use super::parse_failure;

pub fn parse(path: &Path, content: &str) -> Result<MetaNode> {
    let root = parse_xml(path, content)?;
    if root.name != "Layout" {
        return Err(parse_failure(path, format!("expected Layout root, found {}", root.name)));
    }

    // Layout files are named "<Object>-<Layout Name>.layout-meta.xml"
    let stem = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim_end_matches(".layout-meta.xml"))
        .unwrap_or("unnamed");
    let (object, display_name) = match stem.split_once('-') {
        Some((object, name)) => (object.to_string(), name.to_string()),
        None => ("Unknown".to_string(), stem.to_string()),
    };

    let mut node = MetaNode::new("layout");
    node.set_attr("object", object);
    node.set_attr("name", display_name);

    for section in root.all("layoutSections") {
        let mut s = MetaNode::new("section");
        s.set_attr("label", section.text_or("label", ""));
        s.set_attr("style", section.text_or("style", ""));

        let columns: Vec<_> = section.all("layoutColumns").collect();
        s.set_attr("columnCount", columns.len().to_string());

        for column in columns {
            for item in column.all("layoutItems") {
                if let Some(field) = item.text_of("field") {
                    let mut i = MetaNode::new("item");
                    i.set_attr("field", field);
                    i.set_attr("behavior", item.text_or("behavior", ""));
                    s.push_child(i);
                }
            }
        }
        node.push_child(s);
    }

    for related in root.all("relatedLists") {
        let mut r = MetaNode::new("relatedList");
        r.set_attr("relatedList", related.text_or("relatedList", ""));
        for field in related.all("fields") {
            if !field.text.is_empty() {
                let mut f = MetaNode::new("field");
                f.set_attr("name", field.text.clone());
                r.push_child(f);
            }
        }
        node.push_child(r);
    }

    for action_list in root.all("quickActionList") {
        for item in action_list.all("quickActionListItems") {
            if let Some(name) = item.text_of("quickActionName") {
                let mut q = MetaNode::new("quickAction");
                q.set_attr("name", name);
                node.push_child(q);
            }
        }
    }

    Ok(node)
}
