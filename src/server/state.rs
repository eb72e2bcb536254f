//! Application State
//!
//! Shared state accessible by all proxy handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::path::PathBuf;

use crate::config::Config;
use crate::proxy::RuleTable;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// HTTP client for the upstream leg of proxied requests
    pub client: reqwest::Client,
    /// The static forwarding rule table
    pub rules: RuleTable,
    /// Directory the shell assets are served from
    pub assets_dir: PathBuf,
}

impl AppState {
    /// Create state from configuration, with the default planner rule table
    pub fn new(config: &Config) -> Self {
        Self::with_rules(
            RuleTable::planner_defaults(&config.backend.url),
            config.server.assets_dir.clone(),
        )
    }

    /// Create state with a custom rule table
    pub fn with_rules(rules: RuleTable, assets_dir: PathBuf) -> Self {
        Self {
            client: reqwest::Client::new(),
            rules,
            assets_dir,
        }
    }
}
