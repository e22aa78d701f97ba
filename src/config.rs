//! Server configuration
//!
//! Layered with figment: built-in defaults, an optional TOML file, then
//! `CAMPAIGND_*` environment variables. CLI flags are applied on top by the
//! binary.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Environment variable prefix (e.g. `CAMPAIGND_BIND_ADDR`)
pub const ENV_PREFIX: &str = "CAMPAIGND_";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// SQLite file path; `None` means in-memory
    pub db_path: Option<String>,
    pub max_connections: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            db_path: None,
            max_connections: 10,
        }
    }
}

impl Config {
    /// Build the figment used by [`Config::load`]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load configuration from defaults, an optional TOML file and the environment
    pub fn load(file: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(file).extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.db_path.is_none());
        assert_eq!(config.max_connections, 10);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "campaignd.toml",
                r#"
                bind_addr = "0.0.0.0:9000"
                db_path = "campaign.db"
                "#,
            )?;

            let config = Config::load(Some(Path::new("campaignd.toml")))?;
            assert_eq!(config.bind_addr.port(), 9000);
            assert_eq!(config.db_path.as_deref(), Some("campaign.db"));
            assert_eq!(config.max_connections, 10);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("campaignd.toml", "max_connections = 4")?;
            jail.set_env("CAMPAIGND_MAX_CONNECTIONS", "2");

            let config = Config::load(Some(Path::new("campaignd.toml")))?;
            assert_eq!(config.max_connections, 2);
            Ok(())
        });
    }
}
