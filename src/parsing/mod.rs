//! Parser set for SFDX metadata documents
//!
//! One parser per document kind, each lowering raw document content into a
//! [`MetaNode`] tree. Kind detection is a pure lookup on the file path, and
//! dispatch is a match on [`DocKind`] rather than a trait hierarchy.
//!
//! Parsers are deterministic: identical input bytes always produce an
//! identical tree. A malformed document fails with
//! [`OrgMineError::ParseFailure`] naming the file and reason; callers treat
//! that as non-fatal to the ingestion batch.

pub mod apex;
pub mod flow;
pub mod layout;
pub mod lwc;
pub mod object;
pub mod report;
pub mod validation;
pub mod xml;

use std::path::Path;

use crate::error::{OrgMineError, Result};
use crate::schema::MetaNode;

/// The document kinds the parser set understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocKind {
    Flow,
    ValidationRule,
    ObjectDef,
    FieldDef,
    Report,
    Layout,
    LwcComponent,
    ApexClass,
}

impl DocKind {
    /// Short key used for metadata counts in ingest reports
    pub fn key(&self) -> &'static str {
        match self {
            DocKind::Flow => "flow",
            DocKind::ValidationRule => "validation",
            DocKind::ObjectDef => "object",
            DocKind::FieldDef => "field",
            DocKind::Report => "report",
            DocKind::Layout => "layout",
            DocKind::LwcComponent => "lwc",
            DocKind::ApexClass => "apex",
        }
    }
}

/// File-name suffixes for the XML metadata kinds
const XML_SUFFIXES: &[(&str, DocKind)] = &[
    (".flow-meta.xml", DocKind::Flow),
    (".validationRule-meta.xml", DocKind::ValidationRule),
    (".object-meta.xml", DocKind::ObjectDef),
    (".field-meta.xml", DocKind::FieldDef),
    (".report-meta.xml", DocKind::Report),
    (".layout-meta.xml", DocKind::Layout),
];

/// Determine what kind of metadata document a path points at
///
/// Returns `None` for files the parser set does not understand; those are
/// skipped during ingestion, not reported as errors.
pub fn classify_path(path: &Path) -> Option<DocKind> {
    let name = path.file_name()?.to_str()?;

    for (suffix, kind) in XML_SUFFIXES {
        if name.ends_with(suffix) {
            return Some(*kind);
        }
    }

    let has_part = |part: &str| path.iter().any(|p| p == part);

    // LWC: the main component JS file inside an lwc/ bundle directory,
    // named after its parent (helpers and __tests__ are skipped)
    if path.extension().is_some_and(|e| e == "js") && has_part("lwc") && !has_part("__tests__") {
        let stem = path.file_stem()?.to_str()?;
        let parent = path.parent()?.file_name()?.to_str()?;
        if stem == parent {
            return Some(DocKind::LwcComponent);
        }
    }

    // Apex classes
    if path.extension().is_some_and(|e| e == "cls") && has_part("classes") {
        return Some(DocKind::ApexClass);
    }

    None
}

/// Parse a document of a known kind into its normalized tree
///
/// `content` is the raw bytes of the primary file; the LWC parser also
/// reads sibling bundle files (template and meta XML) next to `path`.
pub fn parse_document(kind: DocKind, path: &Path, content: &str) -> Result<MetaNode> {
    match kind {
        DocKind::Flow => flow::parse(path, content),
        DocKind::ValidationRule => validation::parse(path, content),
        DocKind::ObjectDef => object::parse_object(path, content),
        DocKind::FieldDef => object::parse_field(path, content),
        DocKind::Report => report::parse(path, content),
        DocKind::Layout => layout::parse(path, content),
        DocKind::LwcComponent => lwc::parse(path, content),
        DocKind::ApexClass => apex::parse(path, content),
    }
}

/// Build a `ParseFailure` for a file with the given reason
pub(crate) fn parse_failure(path: &Path, reason: impl Into<String>) -> OrgMineError {
    OrgMineError::ParseFailure {
        file: path.display().to_string(),
        reason: reason.into(),
    }
}

/// Detect the owning object from a metadata path like
/// `objects/<Object>/validationRules/<Rule>.validationRule-meta.xml`
pub(crate) fn object_from_path(path: &Path) -> String {
    let parts: Vec<&str> = path.iter().filter_map(|p| p.to_str()).collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "objects" && i + 1 < parts.len() {
            return parts[i + 1].to_string();
        }
    }
    "Unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_classify_xml_suffixes() {
        let cases = [
            ("force-app/main/default/flows/Route_Leads.flow-meta.xml", DocKind::Flow),
            (
                "force-app/main/default/objects/Account/validationRules/Check.validationRule-meta.xml",
                DocKind::ValidationRule,
            ),
            ("objects/Invoice__c/Invoice__c.object-meta.xml", DocKind::ObjectDef),
            ("objects/Invoice__c/fields/Total__c.field-meta.xml", DocKind::FieldDef),
            ("reports/Pipeline.report-meta.xml", DocKind::Report),
            ("layouts/Account-Account Layout.layout-meta.xml", DocKind::Layout),
        ];
        for (path, expected) in cases {
            assert_eq!(classify_path(&PathBuf::from(path)), Some(expected), "{path}");
        }
    }

    #[test]
    fn test_classify_lwc_main_file_only() {
        assert_eq!(
            classify_path(&PathBuf::from("force-app/main/default/lwc/leadCard/leadCard.js")),
            Some(DocKind::LwcComponent)
        );
        // Helper files and tests are not component roots
        assert_eq!(
            classify_path(&PathBuf::from("force-app/main/default/lwc/leadCard/utils.js")),
            None
        );
        assert_eq!(
            classify_path(&PathBuf::from(
                "force-app/main/default/lwc/leadCard/__tests__/leadCard.test.js"
            )),
            None
        );
    }

    #[test]
    fn test_classify_apex_requires_classes_dir() {
        assert_eq!(
            classify_path(&PathBuf::from("force-app/main/default/classes/LeadRouter.cls")),
            Some(DocKind::ApexClass)
        );
        assert_eq!(classify_path(&PathBuf::from("scripts/LeadRouter.cls")), None);
    }

    #[test]
    fn test_classify_unknown_is_none() {
        assert_eq!(classify_path(&PathBuf::from("README.md")), None);
        assert_eq!(classify_path(&PathBuf::from("package.xml")), None);
    }

    #[test]
    fn test_object_from_path() {
        assert_eq!(
            object_from_path(&PathBuf::from(
                "force-app/main/default/objects/Account/fields/Tier__c.field-meta.xml"
            )),
            "Account"
        );
        assert_eq!(object_from_path(&PathBuf::from("flows/Route.flow-meta.xml")), "Unknown");
    }
}
