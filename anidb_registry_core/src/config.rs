//! Configuration tree for a registry session

use crate::protocol::ban::BanCooldowns;
use crate::protocol::rate_limit::RateLimitConfig;
use crate::protocol::{DEFAULT_PORT, DEFAULT_SERVER};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Everything needed to talk to the registry, except the session key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub bans: BanCooldowns,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Local UDP port; 0 picks an ephemeral one
    pub local_port: u16,
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER.to_string(),
            port: DEFAULT_PORT,
            local_port: 0,
            request_timeout_ms: 30_000,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.server.host, "api.anidb.net");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.rate_limit.short_spacing_ms, 2500);
        assert_eq!(config.bans.command_cooldown_secs, 5400);
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: RegistryConfig =
            serde_json::from_str(r#"{"server": {"port": 9001}, "bans": {"document_cooldown_secs": 60}}"#)
                .unwrap();
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.host, "api.anidb.net");
        assert_eq!(config.bans.document_cooldown_secs, 60);
        assert_eq!(config.bans.command_cooldown_secs, 5400);
        assert_eq!(config.rate_limit, RateLimitConfig::default());
    }
}
