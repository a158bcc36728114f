use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ArtQueryError;
use crate::state::DEFAULT_LIMIT;

pub static CONFIG: OnceCell<Config> = OnceCell::new();

const ENV_PREFIX: &str = "ARTQUERY_";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoggingConfig {
    pub artquery: String,
}

impl LoggingConfig {
    const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    const ARTQUERY_LEVEL: &str = "info";

    fn default() -> Self {
        LoggingConfig {
            artquery: Self::ARTQUERY_LEVEL.to_string(),
        }
    }

    /// Log specification for flexi_logger: our crate at the configured level,
    /// everything else at warn.
    pub fn log_spec(&self) -> String {
        format!("warn, artquery={}", self.artquery)
    }

    fn ensure_valid(&mut self) {
        let str_original = self.artquery.clone();
        self.artquery = self.artquery.trim().to_ascii_lowercase();
        if !Self::LOG_LEVELS.contains(&self.artquery.as_str()) {
            eprintln!(
                "Config error: artquery log level of '{}' is invalid - using default of '{}'",
                str_original,
                Self::ARTQUERY_LEVEL
            );
            self.artquery = Self::ARTQUERY_LEVEL.to_owned();
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// JSON file with the arts to serve. Empty serves an empty catalog.
    pub catalog: String,
}

impl ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            catalog: String::new(),
        }
    }

    pub fn catalog_path(&self) -> Option<PathBuf> {
        if self.catalog.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(self.catalog.trim()))
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestMethod {
    Get,
    Post,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub search_path: String,
    pub method: RequestMethod,
}

impl ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: "http://127.0.0.1:8080/".to_string(),
            search_path: "/api/v1/arts".to_string(),
            method: RequestMethod::Post,
        }
    }

    pub fn base_url(&self) -> Result<Url, ArtQueryError> {
        Url::parse(&self.base_url).map_err(|e| {
            ArtQueryError::ConfigError(format!("Invalid base_url '{}': {}", self.base_url, e))
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QueryConfig {
    pub page_limit: i64,
}

impl QueryConfig {
    fn default() -> Self {
        QueryConfig {
            page_limit: DEFAULT_LIMIT,
        }
    }

    fn ensure_valid(&mut self) {
        if self.page_limit < 1 {
            eprintln!(
                "Config error: page_limit of '{}' is invalid - using default of '{}'",
                self.page_limit, DEFAULT_LIMIT
            );
            self.page_limit = DEFAULT_LIMIT;
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub query: QueryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
            client: ClientConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

impl Config {
    pub fn config_path(project_dirs: &ProjectDirs) -> PathBuf {
        project_dirs.data_local_dir().join("config.toml")
    }

    /// Loads the configuration from a TOML file located in the app's data directory.
    /// Writes the default config to disk if no file exists.
    pub fn load_config(project_dirs: &ProjectDirs) -> Self {
        let config_path = Self::config_path(project_dirs);

        if !config_path.exists() {
            Self::write_default(&config_path);
        }

        Self::load_from(&config_path)
    }

    /// Defaults, merged with the TOML file (if it exists), merged with
    /// `ARTQUERY_` environment variables (`ARTQUERY_SERVER__PORT=9000`).
    /// If extraction fails, defaults are used.
    pub fn load_from(config_path: &Path) -> Self {
        let default_config = Config::default();

        let figment = Figment::from(Serialized::defaults(default_config.clone()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config = figment.extract().unwrap_or_else(|err| {
            eprintln!(
                "Could not load config file {}: {}. Using default configuration.",
                config_path.display(),
                err
            );
            default_config
        });

        config.ensure_valid();

        config
    }

    /// Stores the process configuration. Later calls keep the first value.
    pub fn init(config: Config) -> &'static Config {
        CONFIG.get_or_init(|| config)
    }

    pub fn get() -> Config {
        CONFIG.get().cloned().unwrap_or_default()
    }

    fn write_default(config_path: &Path) {
        if let Some(parent) = config_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!(
                    "Failed to create configuration directory {}: {}",
                    parent.display(),
                    e
                );
            }
        }
        match toml::to_string_pretty(&Config::default()) {
            Ok(toml_string) => {
                if let Err(e) = fs::write(config_path, toml_string) {
                    eprintln!(
                        "Failed to write default config to {}: {}",
                        config_path.display(),
                        e
                    );
                }
            }
            Err(_) => eprintln!("Failed to serialize default config."),
        }
    }

    fn ensure_valid(&mut self) {
        self.logging.ensure_valid();
        self.query.ensure_valid();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|jail| {
            let config = Config::load_from(&jail.directory().join("absent.toml"));
            assert_eq!(config.logging.artquery, "info");
            assert_eq!(config.server.port, 8080);
            assert_eq!(config.client.method, RequestMethod::Post);
            assert_eq!(config.query.page_limit, 20);
            assert_eq!(config.server.catalog_path(), None);
            Ok(())
        });
    }

    #[test]
    fn test_file_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [server]
                port = 9000
                catalog = "arts.json"

                [client]
                method = "get"
                "#,
            )?;
            jail.set_env("ARTQUERY_SERVER__PORT", "9100");
            jail.set_env("ARTQUERY_QUERY__PAGE_LIMIT", "50");

            let config = Config::load_from(&jail.directory().join("config.toml"));
            assert_eq!(config.server.port, 9100);
            assert_eq!(config.server.host, "127.0.0.1");
            assert_eq!(config.server.catalog_path(), Some(PathBuf::from("arts.json")));
            assert_eq!(config.client.method, RequestMethod::Get);
            assert_eq!(config.query.page_limit, 50);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values_are_normalized() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [logging]
                artquery = " DEBUG "

                [query]
                page_limit = 0
                "#,
            )?;

            let config = Config::load_from(&jail.directory().join("config.toml"));
            assert_eq!(config.logging.artquery, "debug");
            assert_eq!(config.logging.log_spec(), "warn, artquery=debug");
            assert_eq!(config.query.page_limit, 20);
            Ok(())
        });
    }

    #[test]
    fn test_bad_log_level_falls_back() {
        Jail::expect_with(|jail| {
            jail.set_env("ARTQUERY_LOGGING__ARTQUERY", "loud");
            let config = Config::load_from(&jail.directory().join("config.toml"));
            assert_eq!(config.logging.artquery, "info");
            Ok(())
        });
    }

    #[test]
    fn test_write_default_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::write_default(&path);
        assert!(path.exists());

        let text = fs::read_to_string(&path).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.client.search_path, "/api/v1/arts");
    }

    #[test]
    fn test_invalid_base_url() {
        let client = ClientConfig {
            base_url: "not a url".into(),
            ..ClientConfig::default()
        };
        assert!(matches!(client.base_url(), Err(ArtQueryError::ConfigError(_))));
    }
}
