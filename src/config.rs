//! Application configuration and the owned runtime context
//!
//! All state the pipeline and the search gateway need (storage handle,
//! spending cap, cache TTL, credentials) lives in an explicitly constructed
//! [`AppContext`] that callers pass into operations. There are no
//! process-wide singletons: opening the context is the load step, dropping
//! (or `close`) is the flush step.

use std::path::PathBuf;

use crate::catalog::CatalogStore;
use crate::error::Result;

/// Default hard cap on external query spend per calendar day, in USD
pub const DEFAULT_DAILY_COST_LIMIT: f64 = 1.00;

/// Default semantic-search cache validity window
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Default external query model
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";

/// Default timeout for the external call, in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Environment variable holding the external service credential
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Runtime configuration, resolved once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the catalog database
    pub data_dir: PathBuf,

    /// Hard daily spending cap for the semantic search gateway (USD)
    pub daily_cost_limit: f64,

    /// Semantic-search cache TTL in seconds
    pub cache_ttl_secs: u64,

    /// External query model identifier
    pub model: String,

    /// External call timeout in seconds
    pub request_timeout_secs: u64,

    /// External service credential; absence routes every semantic query
    /// to the keyword fallback
    pub api_key: Option<String>,
}

impl AppConfig {
    /// Resolve configuration from the environment, with an optional
    /// explicit data directory taking precedence
    pub fn from_env(data_dir: Option<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.unwrap_or_else(default_data_dir),
            daily_cost_limit: DEFAULT_DAILY_COST_LIMIT,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            api_key: std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()),
        }
    }

    /// Path to the catalog database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("orgmine.db")
    }
}

/// Get the base data directory (XDG-compliant)
pub fn default_data_dir() -> PathBuf {
    // Explicit override first
    if let Ok(dir) = std::env::var("ORGMINE_DATA_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }

    if let Some(data) = dirs::data_dir() {
        return data.join("orgmine");
    }

    // Last resort: temp directory
    std::env::temp_dir().join("orgmine")
}

/// Explicitly owned runtime context: configuration plus the open catalog
///
/// Constructed at startup and passed into every ingestion and search
/// operation.
pub struct AppContext {
    pub config: AppConfig,
    pub store: CatalogStore,
}

impl AppContext {
    /// Open the catalog under the configured data directory, creating the
    /// directory and schema on first use
    pub fn open(config: AppConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let store = CatalogStore::open(&config.db_path())?;
        Ok(Self { config, store })
    }

    /// Open with an in-memory catalog (tests and dry runs)
    pub fn open_in_memory(config: AppConfig) -> Result<Self> {
        let store = CatalogStore::open_in_memory()?;
        Ok(Self { config, store })
    }

    /// Flush and release the catalog; dropping the context does the same
    pub fn close(self) -> Result<()> {
        self.store.close()
    }
}
