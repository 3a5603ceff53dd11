//! CLI argument definitions using clap with subcommand architecture

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Extracts anonymized structural patterns from SFDX project exports
#[derive(Parser, Debug)]
#[command(name = "orgmine")]
#[command(about = "Extract, anonymize, and search structural metadata patterns")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (applies to all commands)
    #[arg(short, long, default_value = "text", value_enum, global = true)]
    pub format: OutputFormat,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override the data directory holding the catalog database
    #[arg(long, global = true, env = "ORGMINE_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

/// Available subcommands for orgmine
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest an SFDX project directory into the pattern catalog
    #[command(visible_alias = "i")]
    Ingest(IngestArgs),

    /// List catalog patterns with filters and pagination
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Natural-language search over the catalog (falls back to keyword)
    #[command(visible_alias = "s")]
    Search(SearchArgs),

    /// Show a single pattern in full, including its structure
    Show(ShowArgs),

    /// Toggle the favorite flag on a pattern
    Favorite(FavoriteArgs),

    /// Aggregate catalog statistics
    Stats,

    /// Today's semantic-search spend against the daily cap
    Cost,

    /// List candidate SFDX projects under a directory
    Projects(ProjectsArgs),
}

/// Arguments for the ingest command
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Path to the SFDX project root (contains force-app or sfdx-project.json)
    #[arg(value_name = "DIR")]
    pub path: PathBuf,

    /// Additional organization terms to alias (can be repeated)
    #[arg(long = "brand-term", value_name = "TERM")]
    pub brand_terms: Vec<String>,
}

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by category (e.g. "Flow Logic", "Data Validation")
    #[arg(long)]
    pub category: Option<String>,

    /// Filter by pattern type (e.g. "flow_full", "validation_rule")
    #[arg(long = "type", value_name = "TYPE")]
    pub pattern_type: Option<String>,

    /// Filter by source object (e.g. "Lead")
    #[arg(long)]
    pub source_object: Option<String>,

    /// Minimum complexity score (1-5)
    #[arg(long, value_name = "N")]
    pub min_complexity: Option<u8>,

    /// Maximum complexity score (1-5)
    #[arg(long, value_name = "N")]
    pub max_complexity: Option<u8>,

    /// Only favorited patterns
    #[arg(long)]
    pub favorited: bool,

    /// Free-text query over names, descriptions, and tags
    #[arg(short, long)]
    pub query: Option<String>,

    /// Page number (1-based)
    #[arg(long, default_value = "1")]
    pub page: usize,

    /// Results per page
    #[arg(long, default_value = "50")]
    pub page_size: usize,
}

/// Arguments for the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Natural-language query
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Skip the external service and use keyword search directly
    #[arg(long)]
    pub keyword: bool,
}

/// Arguments for the show command
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Pattern id
    #[arg(value_name = "ID")]
    pub id: i64,
}

/// Arguments for the favorite command
#[derive(Args, Debug)]
pub struct FavoriteArgs {
    /// Pattern id
    #[arg(value_name = "ID")]
    pub id: i64,
}

/// Arguments for the projects command
#[derive(Args, Debug)]
pub struct ProjectsArgs {
    /// Directory to scan for SFDX projects
    #[arg(value_name = "DIR")]
    pub path: PathBuf,
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Machine-readable JSON
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_ingest() {
        let cli = Cli::try_parse_from([
            "orgmine",
            "ingest",
            "/tmp/project",
            "--brand-term",
            "AcmeCloud",
            "--brand-term",
            "WidgetCo",
        ])
        .unwrap();
        match cli.command {
            Commands::Ingest(args) => {
                assert_eq!(args.path, PathBuf::from("/tmp/project"));
                assert_eq!(args.brand_terms, vec!["AcmeCloud", "WidgetCo"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_list_filters() {
        let cli = Cli::try_parse_from([
            "orgmine",
            "list",
            "--category",
            "Flow Logic",
            "--min-complexity",
            "3",
            "--query",
            "approval",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::List(args) => {
                assert_eq!(args.category.as_deref(), Some("Flow Logic"));
                assert_eq!(args.min_complexity, Some(3));
                assert_eq!(args.query.as_deref(), Some("approval"));
                assert_eq!(args.page, 1);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_search_alias() {
        let cli = Cli::try_parse_from(["orgmine", "s", "approval flows", "--keyword"]).unwrap();
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.query, "approval flows");
                assert!(args.keyword);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
