//! Graph-wide behavior switches.

use std::env;

use serde::{Deserialize, Serialize};

/// Environment variable for [`GraphConfig::strict_port_resize`].
pub const STRICT_PORTS_ENV: &str = "WIREGRAPH_STRICT_PORTS";

/// Environment variable for [`GraphConfig::ancestry_check`].
pub const ANCESTRY_CHECK_ENV: &str = "WIREGRAPH_ANCESTRY_CHECK";

/// Environment variable for [`GraphConfig::max_port_count`].
pub const MAX_PORTS_ENV: &str = "WIREGRAPH_MAX_PORTS";

/// Default for [`GraphConfig::max_port_count`].
pub const DEFAULT_MAX_PORT_COUNT: usize = 4096;

/// Behavior switches for a [`crate::graph::Graph`].
///
/// Missing fields take their default when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Resizing a fixed port list is an error instead of a silent no-op.
    pub strict_port_resize: bool,
    /// `add_child` refuses a node that is an ancestor of the container.
    pub ancestry_check: bool,
    /// Largest port slot count accepted from persisted state.
    pub max_port_count: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            strict_port_resize: false,
            ancestry_check: true,
            max_port_count: DEFAULT_MAX_PORT_COUNT,
        }
    }
}

impl GraphConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Defaults overridden by `WIREGRAPH_STRICT_PORTS`,
    /// `WIREGRAPH_ANCESTRY_CHECK` and `WIREGRAPH_MAX_PORTS`. Unparseable
    /// values are ignored.
    pub fn from_env() -> Self {
        let mut config = GraphConfig::default();
        if let Some(value) = env_flag(STRICT_PORTS_ENV) {
            config.strict_port_resize = value;
        }
        if let Some(value) = env_flag(ANCESTRY_CHECK_ENV) {
            config.ancestry_check = value;
        }
        if let Some(value) = env::var(MAX_PORTS_ENV).ok().and_then(|raw| raw.trim().parse().ok()) {
            config.max_port_count = value;
        }
        config
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let raw = env::var(name).ok()?;
    parse_flag(&raw)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
