use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::rate_limit::DEFAULT_WINDOW_MS;

// Route identifiers used by the handlers
pub const COMMENT_CREATE: &str = "comment:create";
pub const COMMENT_LIST: &str = "comment:list";
pub const THUMBNAIL_CREATE: &str = "thumbnail:create";

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read policy file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid policy file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("route {route}: {reason}")]
    Invalid { route: String, reason: &'static str },
}

// Limit, window and user-facing message for one route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePolicy {
    pub limit_per_window: u32,
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    pub rejection_message: String,
}

fn default_window_ms() -> u64 {
    DEFAULT_WINDOW_MS
}

impl RoutePolicy {
    pub fn new(limit_per_window: u32, window_ms: u64, rejection_message: &str) -> Self {
        Self {
            limit_per_window,
            window_ms,
            rejection_message: rejection_message.to_string(),
        }
    }

    fn validate(&self, route: &str) -> Result<(), PolicyError> {
        if self.limit_per_window == 0 {
            return Err(PolicyError::Invalid {
                route: route.to_string(),
                reason: "limit_per_window must be at least 1",
            });
        }
        if self.window_ms == 0 {
            return Err(PolicyError::Invalid {
                route: route.to_string(),
                reason: "window_ms must be at least 1",
            });
        }
        Ok(())
    }
}

/// Per-route rate limit policies. The governor itself knows nothing about routes.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    routes: HashMap<String, RoutePolicy>,
    fallback: RoutePolicy,
}

impl PolicyTable {
    pub fn get(&self, route_id: &str) -> &RoutePolicy {
        self.routes.get(route_id).unwrap_or(&self.fallback)
    }

    pub fn insert(&mut self, route_id: &str, policy: RoutePolicy) -> Result<(), PolicyError> {
        policy.validate(route_id)?;
        self.routes.insert(route_id.to_string(), policy);
        Ok(())
    }

    /// Built-in defaults with the routes from a JSON object merged on top.
    ///
    /// The file maps route ids to policies, e.g.
    /// `{ "comment:create": { "limit_per_window": 5, "rejection_message": "..." } }`.
    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, PolicyError> {
        let overrides: HashMap<String, RoutePolicy> = serde_json::from_str(raw)?;
        let mut table = Self::default();
        for (route, policy) in overrides {
            table.insert(&route, policy)?;
        }
        Ok(table)
    }

    pub fn routes(&self) -> impl Iterator<Item = (&str, &RoutePolicy)> {
        self.routes.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        let mut routes = HashMap::new();
        routes.insert(
            COMMENT_CREATE.to_string(),
            RoutePolicy::new(
                10,
                DEFAULT_WINDOW_MS,
                "You're commenting too quickly. Please wait a minute and try again.",
            ),
        );
        routes.insert(
            COMMENT_LIST.to_string(),
            RoutePolicy::new(60, DEFAULT_WINDOW_MS, "Too many requests. Please slow down."),
        );
        routes.insert(
            THUMBNAIL_CREATE.to_string(),
            RoutePolicy::new(
                20,
                DEFAULT_WINDOW_MS,
                "Too many thumbnails created. Please try again in a minute.",
            ),
        );
        Self {
            routes,
            fallback: RoutePolicy::new(
                60,
                DEFAULT_WINDOW_MS,
                "Too many requests. Please try again later.",
            ),
        }
    }
}
