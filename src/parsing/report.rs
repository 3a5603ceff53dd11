//! Parser for Report metadata (`.report-meta.xml`)

use std::path::Path;

use crate::error::Result;
use crate::schema::MetaNode;

use super::xml::parse_xml;
use super::parse_failure;

pub fn parse(path: &Path, content: &str) -> Result<MetaNode> {
    let root = parse_xml(path, content)?;
    if root.name != "Report" {
        return Err(parse_failure(path, format!("expected Report root, found {}", root.name)));
    }

    let stem = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim_end_matches(".report-meta.xml"))
        .unwrap_or("unnamed");

    let mut node = MetaNode::new("report");
    node.set_attr("name", root.text_or("name", stem));
    node.set_attr("reportType", root.text_or("reportType", "Unknown"));
    node.set_attr("format", root.text_or("format", "Tabular"));
    node.set_attr("apiVersion", root.text_or("apiVersion", ""));
    node.set_attr("object", root.text_or("reportType", "Unknown"));

    for column in root.all("columns") {
        if let Some(field) = column.text_of("field") {
            let mut c = MetaNode::new("column");
            c.set_attr("field", field);
            c.set_attr("aggregate", column.text_or("aggregateTypes", ""));
            node.push_child(c);
        }
    }

    for filter in root.all("filter") {
        for criteria in filter.all("criteriaItems") {
            let mut f = MetaNode::new("filter");
            f.set_attr("column", criteria.text_or("column", ""));
            f.set_attr("operator", criteria.text_or("operator", ""));
            f.set_attr("snapshot", criteria.text_or("snapshot", ""));
            node.push_child(f);
        }
        if let Some(boolean_filter) = filter.text_of("booleanFilter") {
            node.set_attr("booleanFilter", boolean_filter);
        }
    }

    for grouping in root.all("groupingsDown") {
        node.push_child(grouping_node(grouping, "down"));
    }
    for grouping in root.all("groupingsAcross") {
        node.push_child(grouping_node(grouping, "across"));
    }

    for formula in root.all("customDetailFormulas").chain(root.all("customSummaryFormulas")) {
        let mut f = MetaNode::new("customFormula");
        f.set_attr("label", formula.text_or("label", ""));
        f.set_attr("formulaType", formula.text_or("formulaType", ""));
        node.push_child(f);
    }

    if let Some(chart) = root.first("chart") {
        let mut c = MetaNode::new("chart");
        c.set_attr("chartType", chart.text_or("chartType", ""));
        c.set_attr("legendPosition", chart.text_or("legendPosition", ""));
        node.push_child(c);
    }

    Ok(node)
}

fn grouping_node(grouping: &super::xml::Element, direction: &str) -> MetaNode {
    let mut g = MetaNode::new("grouping");
    g.set_attr("field", grouping.text_or("field", ""));
    g.set_attr("dateGranularity", grouping.text_or("dateGranularity", ""));
    g.set_attr("sortOrder", grouping.text_or("sortOrder", ""));
    g.set_attr("direction", direction);
    g
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const REPORT: &str = r#"<Report>
        <name>Pipeline by Stage</name>
        <reportType>Opportunity</reportType>
        <format>Matrix</format>
        <columns><field>AMOUNT</field><aggregateTypes>Sum</aggregateTypes></columns>
        <columns><field>Account.Name</field></columns>
        <filter>
            <criteriaItems>
                <column>STAGE_NAME</column>
                <operator>notEqual</operator>
            </criteriaItems>
        </filter>
        <groupingsDown><field>STAGE_NAME</field><sortOrder>Asc</sortOrder></groupingsDown>
        <groupingsAcross><field>CLOSE_DATE</field><dateGranularity>Month</dateGranularity></groupingsAcross>
        <customSummaryFormulas><label>Win Rate</label><formulaType>Percent</formulaType></customSummaryFormulas>
        <chart><chartType>VerticalColumn</chartType></chart>
    </Report>"#;

    #[test]
    fn test_report_shape() {
        let node = parse(&PathBuf::from("reports/Pipeline.report-meta.xml"), REPORT).unwrap();
        assert_eq!(node.attr("format"), Some("Matrix"));
        assert_eq!(node.attr("object"), Some("Opportunity"));
        assert_eq!(node.count_kinds(|k| k == "column"), 2);
        assert_eq!(node.count_kinds(|k| k == "filter"), 1);
        assert_eq!(node.count_kinds(|k| k == "grouping"), 2);
        assert_eq!(node.count_kinds(|k| k == "customFormula"), 1);
        assert_eq!(node.count_kinds(|k| k == "chart"), 1);
        let across = node
            .children
            .iter()
            .find(|c| c.kind == "grouping" && c.attr("direction") == Some("across"))
            .unwrap();
        assert_eq!(across.attr("dateGranularity"), Some("Month"));
    }
}
