#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for provmirror
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (`/etc/provmirror/config.toml` or `--config`)
//! - Environment variables
//! - CLI flags (applied by the server binary)

use provmirror_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio::fs;

/// Default system-wide config file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/provmirror/config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    /// Access token for the source-control API, only ever read from the environment
    #[serde(skip)]
    pub github_token: Option<String>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Base URL mirrored files are served under; asset paths are appended verbatim
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

/// Cache backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    File,
}

impl FromStr for CacheBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            _ => Err(ConfigError::InvalidValue {
                field: "cache_backend".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Local storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_cache_backend")]
    pub cache_backend: CacheBackend,
}

/// Upstream endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_registry_url")]
    pub registry_url: String,
    /// Namespace answered by proxying the upstream registry
    #[serde(default = "default_passthrough_namespace")]
    pub passthrough_namespace: String,
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,
    /// Prefix joining a provider type to its source repository name
    #[serde(default = "default_provider_repo_prefix")]
    pub provider_repo_prefix: String,
    #[serde(default = "default_release_page_size")]
    pub release_page_size: u32,
    #[serde(default = "default_release_max_pages")]
    pub release_max_pages: u32,
}

/// Cache lifetimes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_versions_ttl")]
    pub versions_ttl: u64, // seconds
    #[serde(default = "default_releases_ttl")]
    pub releases_ttl: u64, // seconds
    #[serde(default = "default_download_ttl")]
    pub download_ttl: u64, // seconds
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64, // seconds
}

// Default implementations

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            public_url: default_public_url(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            cache_dir: None,
            cache_backend: default_cache_backend(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            registry_url: default_registry_url(),
            passthrough_namespace: default_passthrough_namespace(),
            github_api_url: default_github_api_url(),
            provider_repo_prefix: default_provider_repo_prefix(),
            release_page_size: default_release_page_size(),
            release_max_pages: default_release_max_pages(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            versions_ttl: default_versions_ttl(),
            releases_ttl: default_releases_ttl(),
            download_ttl: default_download_ttl(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            retries: default_retries(),
            retry_delay: default_retry_delay(),
        }
    }
}

// Default value functions for serde
fn default_listen() -> String {
    "0.0.0.0:8181".to_string()
}

fn default_public_url() -> String {
    "http://localhost:8181/storage".to_string()
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("/opt/terraform-provider-proxy")
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::File
}

fn default_registry_url() -> String {
    "https://registry.terraform.io".to_string()
}

fn default_passthrough_namespace() -> String {
    "hashicorp".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_provider_repo_prefix() -> String {
    "terraform-provider-".to_string()
}

fn default_release_page_size() -> u32 {
    100
}

fn default_release_max_pages() -> u32 {
    10
}

fn default_versions_ttl() -> u64 {
    60 * 60 // 1 hour
}

fn default_releases_ttl() -> u64 {
    60 * 60 // 1 hour
}

fn default_download_ttl() -> u64 {
    30 * 24 * 60 * 60 // 30 days
}

fn default_timeout() -> u64 {
    300 // 5 minutes
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    0
}

fn default_retry_delay() -> u64 {
    1 // 1 second
}

impl CacheConfig {
    #[must_use]
    pub fn versions_ttl(&self) -> Duration {
        Duration::from_secs(self.versions_ttl)
    }

    #[must_use]
    pub fn releases_ttl(&self) -> Duration {
        Duration::from_secs(self.releases_ttl)
    }

    #[must_use]
    pub fn download_ttl(&self) -> Duration {
        Duration::from_secs(self.download_ttl)
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Path::new(DEFAULT_CONFIG_PATH);

        if config_path.exists() {
            Self::load_from_file(config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Ok(listen) = std::env::var("PROVMIRROR_LISTEN") {
            self.server.listen = listen;
        }

        if let Ok(url) = std::env::var("PROVMIRROR_PUBLIC_URL") {
            self.server.public_url = url;
        }

        if let Ok(dir) = std::env::var("PROVMIRROR_STORAGE_DIR") {
            self.storage.root = PathBuf::from(dir);
        }

        if let Ok(backend) = std::env::var("PROVMIRROR_CACHE_BACKEND") {
            self.storage.cache_backend = backend.parse().map_err(|_| ConfigError::InvalidValue {
                field: "PROVMIRROR_CACHE_BACKEND".to_string(),
                value: backend,
            })?;
        }

        if let Ok(url) = std::env::var("PROVMIRROR_REGISTRY_URL") {
            self.upstream.registry_url = url;
        }

        if let Ok(namespace) = std::env::var("PROVMIRROR_PASSTHROUGH_NAMESPACE") {
            self.upstream.passthrough_namespace = namespace;
        }

        if let Ok(timeout) = std::env::var("PROVMIRROR_TIMEOUT") {
            self.network.timeout = timeout.parse().map_err(|_| ConfigError::InvalidValue {
                field: "PROVMIRROR_TIMEOUT".to_string(),
                value: timeout,
            })?;
        }

        // GITHUB_TOKEN; an empty value means anonymous access
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            self.github_token = Some(token).filter(|t| !t.is_empty());
        }

        Ok(())
    }

    /// Check values that serde cannot reject on its own
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.server.listen.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.listen".to_string(),
                value: String::new(),
            }
            .into());
        }
        if self.upstream.passthrough_namespace.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "upstream.passthrough_namespace".to_string(),
                value: String::new(),
            }
            .into());
        }
        if !(1..=100).contains(&self.upstream.release_page_size) {
            return Err(ConfigError::InvalidValue {
                field: "upstream.release_page_size".to_string(),
                value: self.upstream.release_page_size.to_string(),
            }
            .into());
        }
        for (field, url) in [
            ("server.public_url", &self.server.public_url),
            ("upstream.registry_url", &self.upstream.registry_url),
            ("upstream.github_api_url", &self.upstream.github_api_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: url.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Get the durable cache directory (with default)
    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        self.storage
            .cache_dir
            .clone()
            .unwrap_or_else(|| self.storage.root.join(".cache"))
    }

    /// Whether requests for `namespace` are proxied to the upstream registry
    #[must_use]
    pub fn is_passthrough(&self, namespace: &str) -> bool {
        namespace == self.upstream.passthrough_namespace
    }
}
