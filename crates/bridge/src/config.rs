//! Configuration resolution: defaults, then a YAML file, then environment.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

/// Config file read when no path is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

pub const HOST_VAR: &str = "OLLAMA_HOST";
pub const PORT_VAR: &str = "OLLAMA_PORT";
pub const MODEL_VAR: &str = "OLLAMA_MODEL";
pub const MAX_TOKENS_VAR: &str = "OLLAMA_MAX_TOKENS";

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 11434;
const DEFAULT_MODEL: &str = "llama3";
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// The effective configuration, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Bare hostname, or a full URL when it contains `://`.
    pub host: String,
    /// Only used when `host` is a bare hostname.
    pub port: u16,
    /// Model identifier passed to the backend.
    pub model: String,
    /// Generation length hint sent with every request.
    pub max_tokens: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Fields as they appear in the config file. Absent keys stay `None`.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    model: Option<String>,
    max_tokens: Option<u32>,
}

impl FileConfig {
    /// Read the file if it exists. A missing file yields `None`.
    fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(None);
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        Self::parse(&content)
            .map(Some)
            .map_err(|message| ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            })
    }

    fn parse(yaml: &str) -> Result<Self, String> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str::<Option<Self>>(yaml)
            .map(Option::unwrap_or_default)
            .map_err(|e| e.to_string())
    }
}

impl Config {
    /// Resolve configuration from `path` and the process environment.
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::resolve_with(path, |key| std::env::var(key).ok())
    }

    /// Resolve configuration using `env` to look up overrides.
    ///
    /// Precedence per field, lowest first: built-in defaults, file values,
    /// environment values. A missing file is not an error; an unreadable or
    /// malformed one is.
    pub fn resolve_with<F>(path: impl AsRef<Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(file) = FileConfig::load(path.as_ref())? {
            config.apply_file(file);
        }
        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(host) = file.host {
            self.host = host;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(model) = file.model {
            self.model = model;
        }
        if let Some(max_tokens) = file.max_tokens {
            self.max_tokens = max_tokens;
        }
    }

    fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|v| !v.is_empty());

        if let Some(host) = lookup(HOST_VAR) {
            self.host = host;
        }
        if let Some(raw) = lookup(PORT_VAR) {
            match raw.parse::<u16>() {
                Ok(port) if port > 0 => self.port = port,
                _ => warn!(var = PORT_VAR, value = %raw, "ignoring invalid port override"),
            }
        }
        if let Some(model) = lookup(MODEL_VAR) {
            self.model = model;
        }
        if let Some(raw) = lookup(MAX_TOKENS_VAR) {
            match raw.parse::<u32>() {
                Ok(max_tokens) if max_tokens > 0 => self.max_tokens = max_tokens,
                _ => warn!(
                    var = MAX_TOKENS_VAR,
                    value = %raw,
                    "ignoring invalid max_tokens override"
                ),
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be between 1 and 65535".into()));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be positive".into()));
        }
        Ok(())
    }

    /// The backend base address.
    ///
    /// A host containing a scheme is used verbatim; otherwise the address is
    /// `http://<host>:<port>`.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let raw = if self.host.contains("://") {
            self.host.clone()
        } else {
            format!("http://{}:{}", self.host, self.port)
        };

        Url::parse(&raw).map_err(|e| ConfigError::InvalidAddress {
            address: raw,
            message: e.to_string(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid backend address '{address}': {message}")]
    InvalidAddress { address: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 11434);
        assert_eq!(config.model, "llama3");
        assert_eq!(config.max_tokens, 1024);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::resolve_with(dir.path().join("absent.yaml"), no_env).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let file = write_config(
            "host: customhost\nport: 1234\nmodel: custommodel\nmax_tokens: 2048\n",
        );
        let config = Config::resolve_with(file.path(), no_env).unwrap();
        assert_eq!(config.host, "customhost");
        assert_eq!(config.port, 1234);
        assert_eq!(config.model, "custommodel");
        assert_eq!(config.max_tokens, 2048);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = write_config("model: mistral\nunknown_key: ignored\n");
        let config = Config::resolve_with(file.path(), no_env).unwrap();
        assert_eq!(config.model, "mistral");
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 11434);
        assert_eq!(config.max_tokens, 1024);
    }

    #[test]
    fn empty_file_is_not_an_error() {
        let file = write_config("");
        let config = Config::resolve_with(file.path(), no_env).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn env_overrides_file() {
        let file = write_config("host: filehost\nport: 1234\nmodel: filemodel\nmax_tokens: 2048\n");
        let env = env_of(&[
            (HOST_VAR, "envhost"),
            (PORT_VAR, "9999"),
            (MODEL_VAR, "envmodel"),
            (MAX_TOKENS_VAR, "4096"),
        ]);
        let config = Config::resolve_with(file.path(), env).unwrap();
        assert_eq!(config.host, "envhost");
        assert_eq!(config.port, 9999);
        assert_eq!(config.model, "envmodel");
        assert_eq!(config.max_tokens, 4096);
    }

    #[test]
    fn unset_env_does_not_erase_file_values() {
        let file = write_config("host: filehost\nmax_tokens: 2048\n");
        let env = env_of(&[(MODEL_VAR, "envmodel"), (HOST_VAR, "")]);
        let config = Config::resolve_with(file.path(), env).unwrap();
        assert_eq!(config.host, "filehost");
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.model, "envmodel");
    }

    #[test]
    fn unparsable_numeric_env_keeps_prior_value() {
        let file = write_config("port: 1234\nmax_tokens: 2048\n");
        let env = env_of(&[(PORT_VAR, "not-a-port"), (MAX_TOKENS_VAR, "lots")]);
        let config = Config::resolve_with(file.path(), env).unwrap();
        assert_eq!(config.port, 1234);
        assert_eq!(config.max_tokens, 2048);
    }

    #[test]
    fn out_of_range_numeric_env_keeps_prior_value() {
        let env = env_of(&[(PORT_VAR, "70000"), (MAX_TOKENS_VAR, "0")]);
        let dir = tempfile::tempdir().unwrap();
        let config = Config::resolve_with(dir.path().join("absent.yaml"), env).unwrap();
        assert_eq!(config.port, 11434);
        assert_eq!(config.max_tokens, 1024);
    }

    #[test]
    fn malformed_file_is_fatal() {
        let file = write_config("host: [unclosed\n");
        let err = Config::resolve_with(file.path(), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn wrongly_typed_field_is_fatal() {
        let file = write_config("port: eleven\n");
        let err = Config::resolve_with(file.path(), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn unreadable_path_is_fatal() {
        // A directory exists but cannot be read as a file.
        let dir = tempfile::tempdir().unwrap();
        let err = Config::resolve_with(dir.path(), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn zero_max_tokens_in_file_is_invalid() {
        let file = write_config("max_tokens: 0\n");
        let err = Config::resolve_with(file.path(), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn base_url_composes_bare_host() {
        let config = Config::default();
        assert_eq!(config.base_url().unwrap().as_str(), "http://localhost:11434/");
    }

    #[test]
    fn base_url_uses_full_url_verbatim() {
        let config = Config {
            host: "https://ollama.internal:8443".to_string(),
            port: 1,
            ..Config::default()
        };
        assert_eq!(
            config.base_url().unwrap().as_str(),
            "https://ollama.internal:8443/"
        );
    }

    #[test]
    fn base_url_rejects_garbage() {
        let config = Config {
            host: "http://".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.base_url(),
            Err(ConfigError::InvalidAddress { .. })
        ));
    }
}
