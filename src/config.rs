//! Client configuration.
//!
//! Endpoints are read from the environment with local defaults:
//!
//! - `LUDOMASTER_API_BASE` - REST base URL (default `http://localhost:3001/api`)
//! - `LUDOMASTER_WS_BASE` - socket base URL (default: the API base with its
//!   `http` prefix replaced by `ws`)

use std::env;
use std::time::Duration;

use crate::state::connection::ReconnectPolicy;

pub const DEFAULT_API_BASE: &str = "http://localhost:3001/api";

/// How long the scripted opponent "thinks" before moving.
pub const DEFAULT_OPPONENT_DELAY: Duration = Duration::from_millis(800);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: String,
    pub ws_base: String,
    pub reconnect: ReconnectPolicy,
    pub opponent_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

impl ClientConfig {
    /// Config for an API base, deriving the socket base from it.
    pub fn new(api_base: impl Into<String>) -> Self {
        let api_base = api_base.into();
        Self {
            ws_base: ws_base_for(&api_base),
            api_base,
            reconnect: ReconnectPolicy::default(),
            opponent_delay: DEFAULT_OPPONENT_DELAY,
        }
    }

    pub fn from_env() -> Self {
        let api_base = non_empty_var("LUDOMASTER_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let mut config = Self::new(api_base);
        if let Some(ws_base) = non_empty_var("LUDOMASTER_WS_BASE") {
            config.ws_base = ws_base;
        }
        config
    }

    #[must_use]
    pub fn with_ws_base(mut self, ws_base: impl Into<String>) -> Self {
        self.ws_base = ws_base.into();
        self
    }

    #[must_use]
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    #[must_use]
    pub fn with_opponent_delay(mut self, delay: Duration) -> Self {
        self.opponent_delay = delay;
        self
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `http://` → `ws://`, `https://` → `wss://`; anything else is kept.
pub fn ws_base_for(api_base: &str) -> String {
    match api_base.strip_prefix("http") {
        Some(rest) => format!("ws{}", rest),
        None => api_base.to_string(),
    }
}
