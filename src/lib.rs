//! # Planner Shell
//!
//! Development server for the planner front-end shell. Serves the built
//! shell application (a single-page app that embeds the planner in a
//! full-viewport iframe) and proxies a fixed set of path prefixes to the
//! planner backend, including websocket upgrades for its streaming
//! channels.
//!
//! ## Modules
//!
//! - [`proxy`]: Prefix rule table, HTTP forwarding, and websocket bridging
//! - [`server`]: Router assembly, static asset fallback, server lifecycle
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use planner_shell::config::Config;
//! use planner_shell::server::{serve, AppState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let state = AppState::new(&config);
//!     serve(state, &config.server).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod proxy;
pub mod server;

// Re-export top-level types for convenience
pub use config::{BackendConfig, Config, ConfigError, LoggingConfig, ServerConfig};

pub use proxy::{ProxyError, ProxyRule, Rewrite, RuleTable};

pub use server::{build_router, serve, AppState};
