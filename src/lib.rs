//! orgmine: anonymized structural pattern extraction for SFDX exports
//!
//! This library ingests the metadata documents of an SFDX project export,
//! lowers each one into a normalized tree, strips identifying information,
//! and stores the result as a deduplicated, searchable pattern. A
//! cost-bounded gateway answers natural-language queries over the catalog
//! by delegating to an external language model, with a 24-hour response
//! cache, a hard daily spending cap, and a guaranteed fallback to keyword
//! search.
//!
//! # Pipeline
//!
//! ```text
//! directory scan -> parse (per document kind) -> anonymize -> extract -> catalog upsert
//! ```
//!
//! # Example
//!
//! ```ignore
//! use orgmine::config::{AppConfig, AppContext};
//! use orgmine::ingest::ingest_project;
//! use std::path::Path;
//!
//! let ctx = AppContext::open(AppConfig::from_env(None))?;
//! let report = ingest_project(&ctx, Path::new("./my-sfdx-project"), &[])?;
//! println!("{} new patterns", report.patterns_found);
//! ```

pub mod anonymize;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod ingest;
pub mod parsing;
pub mod schema;

// Re-export commonly used types
pub use anonymize::Anonymizer;
pub use catalog::{CatalogStore, DedupOutcome, PatternFilter, PatternPage};
pub use config::{AppConfig, AppContext};
pub use error::{OrgMineError, Result};
pub use extract::extract_pattern;
pub use gateway::{semantic_search, SearchMethod, SearchOutcome};
pub use ingest::{ingest_project, IngestReport};
pub use parsing::{classify_path, parse_document, DocKind};
pub use schema::{Category, MetaNode, NewPattern, Pattern, PatternSummary};
