use anidb_registry_core::RegistryConfig;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::PathBuf;

/// Environment prefix for configuration overrides
pub const ENV_PREFIX: &str = "ANIDB_REGISTRY_";

/// Environment variable holding the session key; never read as configuration
pub const SESSION_ENV: &str = "ANIDB_REGISTRY_SESSION";

/// Configuration manager that handles XDG-compliant paths and layered configuration
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a ConfigManager with a specific path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    fn default_config_path() -> PathBuf {
        #[cfg(not(target_os = "windows"))]
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg_config).join("anidb-registry/config.toml");
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("anidb-registry")
            .join("config.toml")
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    ///
    /// CLI flags are applied on top by the caller.
    pub fn load(&self) -> Result<RegistryConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(RegistryConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__").ignore(&["session"]));

        figment.extract().with_context(|| {
            format!(
                "Failed to load configuration from {}",
                self.config_path.display()
            )
        })
    }

    /// The merged configuration rendered as TOML
    pub fn show(&self) -> Result<String> {
        let config = self.load()?;
        toml::to_string_pretty(&config).context("Failed to render configuration")
    }
}

/// Server settings given on the command line
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ServerOverrides {
    /// Registry host
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Registry UDP port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Reply timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,
}

impl ServerOverrides {
    pub fn apply(&self, config: &mut RegistryConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.server.request_timeout_ms = timeout_ms;
        }
    }
}
