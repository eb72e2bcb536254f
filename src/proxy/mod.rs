//! Dev Proxy Router
//!
//! Forwards a fixed set of path prefixes to the planner backend during
//! local development.
//!
//! ## Architecture
//!
//! - **Rules**: the static prefix table and path rewriting
//! - **Http**: plain request forwarding with streamed bodies
//! - **Ws**: websocket bridging for the upgrade-enabled prefixes
//!
//! The table is evaluated longest-prefix-first; `/streamlit` is stripped
//! before forwarding, every other prefix passes through unchanged. Paths
//! matching no rule never reach this module and are served by the static
//! asset pipeline instead.

mod error;
mod http;
mod rules;
mod ws;

pub use error::{ProxyError, ProxyResult};
pub use rules::{target_url, ProxyRule, Rewrite, RuleTable};

use axum::{
    extract::{Request, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::server::AppState;

/// Entry point for every proxied route.
///
/// Dispatches to the websocket bridge when the request carries an upgrade
/// and the matched rule permits one; everything else is forwarded as plain
/// HTTP. Upgrade requests on non-upgrade prefixes are forwarded without
/// the upgrade (the hop-by-hop filter drops the negotiation headers).
pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    upgrade: Option<WebSocketUpgrade>,
    req: Request,
) -> Response {
    let Some(rule) = state.rules.match_path(req.uri().path()) else {
        // Routes are mounted from the table, so this indicates a
        // mounting/table mismatch rather than a client error.
        tracing::warn!(path = %req.uri().path(), "Proxied route without a matching rule");
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(upgrade) = upgrade {
        if rule.supports_upgrade() {
            return match ws::bridge(upgrade, rule, req).await {
                Ok(response) => response,
                Err(e) => e.into_response(),
            };
        }
    }

    match http::forward(&state.client, rule, req).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}
