use postbox_engine::Collections;
use serde::Deserialize;
use std::fmt::{self, Display};
use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::{error, fs, io};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub collections: Collections,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let config_str = fs::read_to_string(path)?;
        Config::from_toml(&config_str)
    }

    pub fn from_toml(config_str: &str) -> Result<Config, ConfigError> {
        Ok(toml::from_str(config_str)?)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    pub ip: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn get_socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        let ip: IpAddr = self.ip.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    Memory {
        /// JSON object mapping collection names to arrays of documents.
        corpus: Option<PathBuf>,
        #[serde(default = "sampling_default")]
        sampling: bool,
    },
    Firestore {
        json_key_path: PathBuf,
    },
}

fn sampling_default() -> bool {
    true
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Toml(toml::de::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "could not read config: {}", e),
            ConfigError::Toml(e) => write!(f, "invalid config: {}", e),
        }
    }
}

impl error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Toml(e) => Some(e),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Toml(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_memory_config_with_defaults() {
        let config = Config::from_toml(
            r#"
            [server]
            ip = "127.0.0.1"
            port = 7071

            [storage]
            backend = "memory"
            corpus = "corpus.json"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.server.get_socket_addr().unwrap(),
            "127.0.0.1:7071".parse().unwrap()
        );
        assert_eq!(
            config.storage,
            StorageConfig::Memory {
                corpus: Some(PathBuf::from("corpus.json")),
                sampling: true,
            }
        );
        assert_eq!(config.collections, Collections::default());
    }

    #[test]
    fn parses_firestore_config_and_collection_overrides() {
        let config = Config::from_toml(
            r#"
            [server]
            ip = "::1"
            port = 8080

            [storage]
            backend = "firestore"
            json_key_path = "secrets/key.json"

            [collections]
            good = "positive"
            "#,
        )
        .unwrap();

        assert!(config.server.get_socket_addr().unwrap().is_ipv6());
        assert_eq!(
            config.storage,
            StorageConfig::Firestore {
                json_key_path: PathBuf::from("secrets/key.json"),
            }
        );
        assert_eq!(config.collections.good, "positive");
        assert_eq!(config.collections.bad, "emotion_bad");
    }

    #[test]
    fn rejects_unknown_backend_and_bad_ip() {
        assert!(Config::from_toml(
            "[server]\nip = \"0.0.0.0\"\nport = 1\n[storage]\nbackend = \"mongo\"\n"
        )
        .is_err());

        let server = ServerConfig {
            ip: "localhost".to_owned(),
            port: 80,
        };
        assert!(server.get_socket_addr().is_err());
    }
}
