use lyra_core::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RootError, RootResult};

/// HTTP server settings and the public URLs the gateway is given.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Public base URL of the shop, used to build `vads_url_return`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Browser return endpoint (GET and POST).
    #[serde(default = "default_return_path")]
    pub return_path: String,

    /// Server-to-server notification endpoint.
    #[serde(default = "default_notify_path")]
    pub notify_path: String,

    #[serde(default = "default_checkout_path")]
    pub checkout_path: String,

    /// Where the browser lands after a return, whatever the outcome.
    #[serde(default = "default_status_path")]
    pub status_path: String,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_return_path() -> String {
    "/payment/lyra/return".to_string()
}

fn default_notify_path() -> String {
    "/payment/lyra/ipn".to_string()
}

fn default_checkout_path() -> String {
    "/payment/lyra/checkout".to_string()
}

fn default_status_path() -> String {
    "/payment/status".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            base_url: default_base_url(),
            return_path: default_return_path(),
            notify_path: default_notify_path(),
            checkout_path: default_checkout_path(),
            status_path: default_status_path(),
        }
    }
}

impl ServerConfig {
    /// Absolute return URL handed to the gateway.
    pub fn return_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.return_path)
    }

    /// Absolute IPN URL to copy into the gateway back office.
    pub fn notify_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.notify_path)
    }
}

/// Transaction store backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local, lost on restart.
    #[default]
    Memory,
    Sqlite { path: PathBuf },
}

/// Top-level configuration for the lyra binary.
///
/// Loaded from a TOML file (typically `~/.lyra/config.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RootConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Gateway provider settings and credentials.
    #[serde(default)]
    pub gateway: ProviderConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// Returns `$HOME/<suffix>` if HOME is available, otherwise `./<suffix>`.
fn dirs_or_default(suffix: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(suffix))
        .unwrap_or_else(|_| PathBuf::from(suffix))
}

impl RootConfig {
    /// Load configuration from a TOML file. If the file does not exist,
    /// returns a default configuration.
    pub fn load(path: &Path) -> RootResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(RootError::Io)?;
        let config: RootConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> RootResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RootError::Config(format!("TOML serialize error: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(RootError::Io)?;
        }
        std::fs::write(path, contents).map_err(RootError::Io)?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> RootResult<()> {
        for (name, path) in [
            ("return_path", &self.server.return_path),
            ("notify_path", &self.server.notify_path),
            ("checkout_path", &self.server.checkout_path),
            ("status_path", &self.server.status_path),
        ] {
            if !path.starts_with('/') {
                return Err(RootError::Config(format!(
                    "server.{name} must start with '/', got '{path}'"
                )));
            }
        }
        if self.server.return_path == self.server.notify_path {
            return Err(RootError::Config(
                "server.return_path and server.notify_path must differ".into(),
            ));
        }
        if !self.server.base_url.starts_with("http://") && !self.server.base_url.starts_with("https://")
        {
            return Err(RootError::Config(format!(
                "server.base_url must be an http(s) URL, got '{}'",
                self.server.base_url
            )));
        }
        if let StoreConfig::Sqlite { path } = &self.store {
            if path.as_os_str().is_empty() {
                return Err(RootError::Config("store.path must not be empty".into()));
            }
        }
        self.gateway.validate()?;
        Ok(())
    }

    /// Return the path to the default config file location.
    pub fn default_config_path() -> PathBuf {
        dirs_or_default(".lyra/config.toml")
    }

    /// Default SQLite database location.
    pub fn default_database_path() -> PathBuf {
        dirs_or_default(".lyra/transactions.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyra_core::{Mode, SignAlgorithm};
    use rust_decimal::Decimal;

    #[test]
    fn test_default_config() {
        let config = RootConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.return_path, "/payment/lyra/return");
        assert_eq!(config.server.notify_path, "/payment/lyra/ipn");
        assert_eq!(config.server.status_path, "/payment/status");
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(config.gateway.mode, Mode::Test);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_urls() {
        let server = ServerConfig {
            base_url: "https://shop.example/".into(),
            ..Default::default()
        };
        assert_eq!(server.return_url(), "https://shop.example/payment/lyra/return");
        assert_eq!(server.notify_url(), "https://shop.example/payment/lyra/ipn");
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[server]
port = 8080
base_url = "https://shop.example"

[gateway]
mode = "production"
site_id = "12345678"
sign_algorithm = "SHA-1"
threeds_min_amount = "50.00"
allowed_currencies = ["PEN", "USD"]

[gateway.credentials.production]
legacy_key = "prod-key"
rest_password = "prodpassword_abc"

[gateway.installments]
count = 3
period = 30

[store]
backend = "sqlite"
path = "/tmp/lyra-test.db"
"#;
        let config: RootConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.gateway.mode, Mode::Production);
        assert_eq!(config.gateway.sign_algorithm, SignAlgorithm::Sha1);
        assert_eq!(config.gateway.threeds_min_amount, Some(Decimal::new(5000, 2)));
        assert_eq!(config.gateway.credentials().legacy_key.expose(), "prod-key");
        assert_eq!(config.gateway.installments.as_ref().unwrap().count, 3);
        assert_eq!(
            config.store,
            StoreConfig::Sqlite {
                path: PathBuf::from("/tmp/lyra-test.db")
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validate_paths() {
        let mut config = RootConfig::default();
        config.server.notify_path = "payment/ipn".into();
        assert!(config.validate().is_err());

        let mut config = RootConfig::default();
        config.server.notify_path = config.server.return_path.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_base_url() {
        let mut config = RootConfig::default();
        config.server.base_url = "shop.example".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_delegates_to_gateway() {
        let mut config = RootConfig::default();
        config.gateway.site_id = "not-a-number".into();
        assert!(matches!(config.validate(), Err(RootError::Core(_))));
    }

    #[test]
    fn test_config_load_nonexistent_returns_default() {
        let path = PathBuf::from("/tmp/nonexistent-lyra-config-test.toml");
        let config = RootConfig::load(&path).unwrap();
        assert_eq!(config, RootConfig::default());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = std::env::temp_dir().join(format!("lyra-config-test-{}", std::process::id()));
        let path = dir.join("config.toml");

        let mut config = RootConfig::default();
        config.server.port = 9090;
        config.gateway.site_id = "12345678".into();
        config.gateway.credentials.test.legacy_key = "test-key".into();
        config.store = StoreConfig::Sqlite {
            path: dir.join("tx.db"),
        };
        config.save(&path).unwrap();

        let loaded = RootConfig::load(&path).unwrap();
        assert_eq!(loaded.server.port, 9090);
        assert_eq!(loaded.gateway.site_id, "12345678");
        assert_eq!(loaded.gateway.credentials.test.legacy_key.expose(), "test-key");
        assert_eq!(loaded.store, config.store);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_default_config_path() {
        let path = RootConfig::default_config_path();
        assert!(path.to_str().unwrap().contains(".lyra/config.toml"));
    }
}
