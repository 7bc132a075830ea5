//! Configuration management
//!
//! Configuration is layered with figment: built-in defaults, then an optional
//! TOML file, then `FORMRELAY_`-prefixed environment variables
//! (`FORMRELAY_HTTP__PORT=8080`).

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default configuration file name, resolved against the working directory.
pub const CONFIG_FILE_NAME: &str = "formrelay.toml";

/// Largest payload a single UDP datagram can carry over IPv4.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub relay: RelayConfig,
    pub store: StoreConfig,
}

/// HTTP front configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Directory pages and static files are resolved against
    pub static_dir: PathBuf,
    /// Page served for `/`
    pub index_page: String,
    /// Page served for `/message`
    pub message_page: String,
    /// Page served with 404
    pub error_page: String,
}

/// Datagram relay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// Largest datagram the store writer accepts, in bytes
    pub buffer_size: usize,
}

/// JSON store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: PathBuf::from("public"),
            index_page: "index.html".to_string(),
            message_page: "message.html".to_string(),
            error_page: "error.html".to_string(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            buffer_size: 1024,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("storage/data.json"),
        }
    }
}

impl Config {
    /// Load configuration from `formrelay.toml` and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if loading, parsing or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// A missing file is not an error; defaults and the environment still
    /// apply.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let config_file = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FORMRELAY_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.relay.buffer_size == 0 || self.relay.buffer_size > MAX_DATAGRAM_SIZE {
            return Err(Error::Config(format!(
                "relay.buffer_size must be between 1 and {} (got {})",
                MAX_DATAGRAM_SIZE, self.relay.buffer_size
            )));
        }

        self.http_addr()?;
        self.relay_addr()?;
        Ok(())
    }

    /// Socket address the HTTP front listens on
    pub fn http_addr(&self) -> Result<SocketAddr> {
        socket_addr(&self.http.host, self.http.port)
    }

    /// Socket address the store writer receives datagrams on
    pub fn relay_addr(&self) -> Result<SocketAddr> {
        socket_addr(&self.relay.host, self.relay.port)
    }
}

fn socket_addr(host: &str, port: u16) -> Result<SocketAddr> {
    host.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, port))
        .map_err(|e| Error::InvalidAddress(format!("{}: {}", host, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.http_addr().unwrap(), "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.relay_addr().unwrap(), "127.0.0.1:5000".parse().unwrap());
        assert_eq!(config.relay.buffer_size, 1024);
        assert_eq!(config.store.path, PathBuf::from("storage/data.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_buffer_size() {
        let mut config = Config::default();
        config.relay.buffer_size = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.relay.buffer_size = MAX_DATAGRAM_SIZE + 1;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.relay.buffer_size = MAX_DATAGRAM_SIZE;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_host() {
        let mut config = Config::default();
        config.http.host = "not-an-ip".to_string();
        assert!(matches!(config.validate(), Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn test_load_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE_NAME,
                r#"
                [http]
                port = 8080
                static_dir = "site"

                [store]
                path = "data/forms.json"
                "#,
            )?;
            jail.set_env("FORMRELAY_RELAY__BUFFER_SIZE", "4096");

            let config = Config::load().expect("config loads");
            assert_eq!(config.http.port, 8080);
            assert_eq!(config.http.host, "0.0.0.0");
            assert_eq!(config.http.static_dir, PathBuf::from("site"));
            assert_eq!(config.relay.buffer_size, 4096);
            assert_eq!(config.relay.port, 5000);
            assert_eq!(config.store.path, PathBuf::from("data/forms.json"));
            Ok(())
        });
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let config = Config::load_from(Some(Path::new("absent.toml"))).expect("config loads");
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        Jail::expect_with(|jail| {
            jail.set_env("FORMRELAY_RELAY__BUFFER_SIZE", "0");
            assert!(Config::load().is_err());
            Ok(())
        });
    }
}
