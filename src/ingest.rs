//! Project ingestion: scan, parse, anonymize, extract, store
//!
//! Walks an SFDX project export, lowers every recognized metadata document
//! into a normalized tree, anonymizes it, and upserts the extracted
//! pattern into the catalog. Parsing runs across a rayon worker pool; the
//! pipeline stages are pure. Anonymization and the store writes then run
//! in sorted file order, which keeps brand-alias numbering reproducible
//! across identical runs and gives the catalog a single writer.
//!
//! Per-file failures are collected into the report and never abort the
//! batch.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use crate::anonymize::Anonymizer;
use crate::catalog::DedupOutcome;
use crate::config::AppContext;
use crate::error::{OrgMineError, Result};
use crate::extract::extract_pattern;
use crate::parsing::{classify_path, parse_document, DocKind};
use crate::schema::MetaNode;

/// Result of ingesting one project directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Patterns inserted for the first time
    pub patterns_found: usize,
    /// Documents whose fingerprint already existed (use count bumped)
    pub duplicates: usize,
    /// Files seen per document kind
    pub metadata_counts: BTreeMap<String, usize>,
    /// Per-file failures; never fatal to the batch
    pub errors: Vec<IngestError>,
    /// Brand terms aliased during this run
    pub brand_terms_detected: usize,
}

/// One per-file ingestion failure
#[derive(Debug, Clone, Serialize)]
pub struct IngestError {
    pub file: String,
    pub reason: String,
}

/// A candidate project directory, for discovery listings
#[derive(Debug, Clone, Serialize)]
pub struct ProjectInfo {
    pub name: String,
    pub path: String,
    pub has_sfdx_config: bool,
    pub has_force_app: bool,
}

/// Ingest an SFDX project directory
///
/// `brand_terms` are caller-supplied organization terms to alias in
/// addition to the auto-detected ones.
pub fn ingest_project(ctx: &AppContext, path: &Path, brand_terms: &[String]) -> Result<IngestReport> {
    if !path.exists() {
        return Err(OrgMineError::PathNotFound {
            path: path.display().to_string(),
        });
    }
    if !path.is_dir() {
        return Err(OrgMineError::PathNotFound {
            path: format!("{} is not a directory", path.display()),
        });
    }

    let mut report = IngestReport::default();

    let Some(package_root) = find_package_root(path) else {
        report.errors.push(IngestError {
            file: path.display().to_string(),
            reason: "no force-app directory or sfdx-project.json package directory found"
                .to_string(),
        });
        return Ok(report);
    };

    // Discover metadata files; sorted order keeps alias numbering and
    // error ordering reproducible
    let mut files = discover_files(&package_root);
    files.sort_by(|a, b| a.0.cmp(&b.0));

    for (file, kind) in &files {
        *report.metadata_counts.entry(kind.key().to_string()).or_insert(0) += 1;
        tracing::debug!(file = %file.display(), kind = kind.key(), "discovered");
    }

    // Brand detection pre-scan over custom field names
    let field_names = collect_field_names(&files);
    let mut anonymizer = Anonymizer::with_terms(brand_terms);
    let seeded = anonymizer.seed_from_field_names(&field_names);
    if !seeded.is_empty() {
        tracing::info!(count = seeded.len(), "auto-detected brand terms to alias");
    }

    // Parse in parallel; the stage is pure, so worker order does not matter
    let parsed: Vec<std::result::Result<(PathBuf, DocKind, MetaNode), IngestError>> = files
        .par_iter()
        .map(|(file, kind)| {
            let content = std::fs::read_to_string(file).map_err(|e| IngestError {
                file: file.display().to_string(),
                reason: e.to_string(),
            })?;
            let tree = parse_document(*kind, file, &content).map_err(|e| IngestError {
                file: file.display().to_string(),
                reason: e.to_string(),
            })?;
            Ok((file.clone(), *kind, tree))
        })
        .collect();

    // Anonymize, extract, and upsert in deterministic order
    for item in parsed {
        let (file, kind, tree) = match item {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::warn!(file = %error.file, reason = %error.reason, "skipping file");
                report.errors.push(error);
                continue;
            }
        };

        let (anonymized, changes) = anonymizer.scrub_tree(&tree);
        tracing::debug!(file = %file.display(), changes = changes.len(), "anonymized");

        // Best-effort contract check; residue is logged, never blocking
        for finding in anonymizer.residue(&anonymized) {
            tracing::warn!(file = %file.display(), %finding, "anonymization residue");
        }

        let source_file = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let pattern = extract_pattern(&anonymized, kind, &source_file);

        match ctx.store.insert_or_increment(&pattern)? {
            DedupOutcome::Inserted { .. } => report.patterns_found += 1,
            DedupOutcome::Incremented { .. } => report.duplicates += 1,
        }
    }

    report.brand_terms_detected = anonymizer.alias_count();
    tracing::info!(
        new = report.patterns_found,
        duplicates = report.duplicates,
        errors = report.errors.len(),
        "ingest complete"
    );
    Ok(report)
}

/// Locate the metadata package root inside a project directory
///
/// Prefers a `force-app` child, then the directory itself if it is one,
/// then the first package directory named by `sfdx-project.json`.
pub fn find_package_root(project: &Path) -> Option<PathBuf> {
    let direct = project.join("force-app");
    if direct.is_dir() {
        return Some(direct);
    }
    if project.file_name().is_some_and(|n| n == "force-app") {
        return Some(project.to_path_buf());
    }

    let config_path = project.join("sfdx-project.json");
    if let Ok(raw) = std::fs::read_to_string(&config_path) {
        if let Ok(config) = serde_json::from_str::<serde_json::Value>(&raw) {
            for package in config
                .get("packageDirectories")
                .and_then(|d| d.as_array())
                .into_iter()
                .flatten()
            {
                if let Some(rel) = package.get("path").and_then(|p| p.as_str()) {
                    let candidate = project.join(rel);
                    if candidate.is_dir() {
                        return Some(candidate);
                    }
                }
            }
        }
    }
    None
}

/// Walk the package root and classify every parseable metadata file
fn discover_files(package_root: &Path) -> Vec<(PathBuf, DocKind)> {
    let mut files = Vec::new();
    for entry in ignore::WalkBuilder::new(package_root)
        .hidden(false)
        .build()
        .flatten()
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(kind) = classify_path(path) {
            files.push((path.to_path_buf(), kind));
        }
    }
    files
}

/// Custom field names (as `Object.Field`) from field file paths, for the
/// brand-detection pre-scan
fn collect_field_names(files: &[(PathBuf, DocKind)]) -> Vec<String> {
    let mut names = Vec::new();
    for (file, kind) in files {
        if *kind != DocKind::FieldDef {
            continue;
        }
        let Some(stem) = file
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.trim_end_matches(".field-meta.xml"))
        else {
            continue;
        };
        let object = crate::parsing::object_from_path(file);
        if object == "Unknown" {
            names.push(stem.to_string());
        } else {
            names.push(format!("{object}.{stem}"));
        }
    }
    names
}

/// List candidate SFDX projects directly under a base directory
pub fn list_projects(base: &Path) -> Vec<ProjectInfo> {
    let Ok(entries) = std::fs::read_dir(base) else {
        return Vec::new();
    };

    let mut projects: Vec<ProjectInfo> = entries
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let path = entry.path();
            let has_sfdx_config = path.join("sfdx-project.json").exists();
            let has_force_app = path.join("force-app").is_dir();
            if !has_sfdx_config && !has_force_app {
                return None;
            }
            Some(ProjectInfo {
                name: entry.file_name().to_string_lossy().to_string(),
                path: path.display().to_string(),
                has_sfdx_config,
                has_force_app,
            })
        })
        .collect();
    projects.sort_by(|a, b| a.name.cmp(&b.name));
    projects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use std::fs;

    const FLOW: &str = r#"<Flow xmlns="http://soap.sforce.com/2006/04/metadata">
        <apiVersion>62.0</apiVersion>
        <label>Route Leads</label>
        <processType>AutoLaunchedFlow</processType>
        <status>Active</status>
        <decisions><name>A</name></decisions>
        <decisions><name>B</name></decisions>
        <decisions><name>C</name></decisions>
        <recordUpdates>
            <name>Save</name>
            <object>Lead</object>
            <faultConnector><targetReference>LogError</targetReference></faultConnector>
        </recordUpdates>
    </Flow>"#;

    fn test_context() -> AppContext {
        AppContext::open_in_memory(AppConfig::from_env(Some(std::env::temp_dir()))).unwrap()
    }

    fn write_project(dir: &Path) {
        let flows = dir.join("force-app").join("main").join("default").join("flows");
        fs::create_dir_all(&flows).unwrap();
        fs::write(flows.join("Route_Leads.flow-meta.xml"), FLOW).unwrap();
        fs::write(flows.join("Route_Leads_Copy.flow-meta.xml"), FLOW).unwrap();
    }

    #[test]
    fn test_ingest_dedups_identical_documents() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path());
        let ctx = test_context();

        let report = ingest_project(&ctx, dir.path(), &[]).unwrap();
        assert_eq!(report.patterns_found, 1);
        assert_eq!(report.duplicates, 1);
        assert!(report.errors.is_empty());
        assert_eq!(report.metadata_counts.get("flow"), Some(&2));

        // Three decisions plus one fault path: capped score, use_count 2
        let page = ctx.store.query(&crate::catalog::PatternFilter::default()).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.patterns[0].complexity_score, 5);
        assert_eq!(page.patterns[0].use_count, 2);
    }

    #[test]
    fn test_reingest_increments_again() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path());
        let ctx = test_context();

        ingest_project(&ctx, dir.path(), &[]).unwrap();
        let second = ingest_project(&ctx, dir.path(), &[]).unwrap();
        assert_eq!(second.patterns_found, 0);
        assert_eq!(second.duplicates, 2);

        let page = ctx.store.query(&crate::catalog::PatternFilter::default()).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.patterns[0].use_count, 4);
    }

    #[test]
    fn test_malformed_file_collected_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path());
        let flows = dir.path().join("force-app/main/default/flows");
        fs::write(flows.join("Broken.flow-meta.xml"), "<Flow><unclosed>").unwrap();
        let ctx = test_context();

        let report = ingest_project(&ctx, dir.path(), &[]).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].file.contains("Broken.flow-meta.xml"));
        // The healthy files still landed
        assert_eq!(report.patterns_found, 1);
        assert_eq!(report.duplicates, 1);
    }

    #[test]
    fn test_missing_package_root_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context();
        let report = ingest_project(&ctx, dir.path(), &[]).unwrap();
        assert_eq!(report.patterns_found, 0);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let ctx = test_context();
        let missing = Path::new("/nonexistent/project");
        assert!(matches!(
            ingest_project(&ctx, missing, &[]),
            Err(OrgMineError::PathNotFound { .. })
        ));
    }

    #[test]
    fn test_package_root_via_sfdx_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src").join("main")).unwrap();
        fs::write(
            dir.path().join("sfdx-project.json"),
            r#"{"packageDirectories": [{"path": "src"}]}"#,
        )
        .unwrap();
        assert_eq!(find_package_root(dir.path()), Some(dir.path().join("src")));
    }

    #[test]
    fn test_list_projects() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("org-a").join("force-app")).unwrap();
        fs::create_dir_all(dir.path().join("not-a-project")).unwrap();
        fs::write(dir.path().join("org-a").join("sfdx-project.json"), "{}").unwrap();

        let projects = list_projects(dir.path());
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "org-a");
        assert!(projects[0].has_force_app);
        assert!(projects[0].has_sfdx_config);
    }
}
