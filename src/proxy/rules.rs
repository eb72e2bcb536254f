//! Proxy Rule Table
//!
//! Static path-prefix rules mapping incoming request paths to the planner
//! backend. The table is fixed at startup and never mutated; matching is
//! longest-prefix-first, and exactly one rule (`/streamlit`) rewrites the
//! path before forwarding.

use axum::http::Uri;

/// Path rewrite applied before forwarding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rewrite {
    /// Forward the path unchanged
    None,
    /// Remove one leading occurrence of the rule's prefix
    StripPrefix,
}

/// A single prefix-to-backend forwarding rule
#[derive(Debug, Clone)]
pub struct ProxyRule {
    prefix: &'static str,
    target: String,
    rewrite: Rewrite,
    upgrade: bool,
}

impl ProxyRule {
    pub fn new(
        prefix: &'static str,
        target: impl Into<String>,
        rewrite: Rewrite,
        upgrade: bool,
    ) -> Self {
        Self {
            prefix,
            target: target.into(),
            rewrite,
            upgrade,
        }
    }

    /// Path prefix this rule matches
    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    /// Backend origin requests are forwarded to, e.g. `http://localhost:8501`
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether websocket upgrade requests are bridged for this prefix
    pub fn supports_upgrade(&self) -> bool {
        self.upgrade
    }

    fn matches(&self, path: &str) -> bool {
        path.starts_with(self.prefix)
    }

    /// Apply this rule's rewrite to a request path.
    ///
    /// `StripPrefix` removes exactly one leading occurrence of the prefix;
    /// a fully-stripped path is normalized to `/` so the backend always
    /// receives an absolute path. Applying the rewrite to a path that no
    /// longer carries the prefix is a no-op.
    pub fn rewrite_path(&self, path: &str) -> String {
        match self.rewrite {
            Rewrite::None => path.to_string(),
            Rewrite::StripPrefix => {
                let stripped = path.strip_prefix(self.prefix).unwrap_or(path);
                if stripped.is_empty() {
                    "/".to_string()
                } else {
                    stripped.to_string()
                }
            }
        }
    }
}

/// Ordered, immutable set of forwarding rules
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<ProxyRule>,
}

impl RuleTable {
    /// Build a table from a list of rules.
    ///
    /// Rules are ordered longest-prefix-first so that the longest
    /// applicable prefix always wins.
    pub fn new(mut rules: Vec<ProxyRule>) -> Self {
        rules.sort_by_key(|r| std::cmp::Reverse(r.prefix().len()));
        Self { rules }
    }

    /// The five prefixes the planner backend expects to receive.
    ///
    /// `/streamlit` carries the embedded app itself and is stripped before
    /// forwarding; `/_stcore` is its streaming channel; the remaining
    /// prefixes serve assets and custom components.
    pub fn planner_defaults(backend: &str) -> Self {
        Self::new(vec![
            ProxyRule::new("/streamlit", backend, Rewrite::StripPrefix, true),
            ProxyRule::new("/_stcore", backend, Rewrite::None, true),
            ProxyRule::new("/static", backend, Rewrite::None, false),
            ProxyRule::new("/vendor", backend, Rewrite::None, false),
            ProxyRule::new("/component", backend, Rewrite::None, false),
        ])
    }

    /// Find the rule for a request path, if any
    pub fn match_path(&self, path: &str) -> Option<&ProxyRule> {
        self.rules.iter().find(|r| r.matches(path))
    }

    /// All rules, longest prefix first
    pub fn rules(&self) -> &[ProxyRule] {
        &self.rules
    }
}

/// Build the full backend URL for a matched request, preserving the query
/// string and applying the rule's path rewrite.
pub fn target_url(rule: &ProxyRule, uri: &Uri) -> String {
    let path = rule.rewrite_path(uri.path());
    let mut url = format!("{}{}", rule.target().trim_end_matches('/'), path);
    if let Some(query) = uri.query() {
        url.push('?');
        url.push_str(query);
    }
    url
}
