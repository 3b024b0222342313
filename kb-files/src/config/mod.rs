//! Configuration management for kb-files
//!
//! Configuration is loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `KB_FILES_` prefix, `__` for nesting)
//! 2. `./config.toml` (development)
//! 3. `~/.config/kb-files/{service_name}/config.toml` (user config, XDG)
//! 4. `/etc/kb-files/{service_name}/config.toml` (system config)
//! 5. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8080"
//!
//! [storage]
//! data_dir = "/var/lib/kb-files"
//! max_upload_bytes = 52428800
//! pending_max_age_secs = 3600
//! sweep_interval_secs = 300
//!
//! [database]
//! url = "sqlite:///var/lib/kb-files/metadata.db"
//! max_connections = 8
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use kb_files::config::KbFilesConfig;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = KbFilesConfig::load_for_service("kb-files")?;
//! let limit = config.storage.max_upload_bytes;
//! # Ok(())
//! # }
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::module::DEFAULT_MAX_UPLOAD_BYTES;
use crate::storage::layout::DEFAULT_DATA_DIR;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "KB_FILES_";

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address the server binds to
    pub bind: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 3000)),
        }
    }
}

/// Blob storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Root of the date-partitioned blob tree
    pub data_dir: PathBuf,

    /// Request body limit for uploads
    pub max_upload_bytes: usize,

    /// Age after which a pending upload is considered abandoned
    ///
    /// Keep this well above the time an upload takes to write. A sweep that
    /// catches an upload still in flight fails that upload.
    pub pending_max_age_secs: u64,

    /// How often abandoned uploads are swept, `0` disables the sweep
    pub sweep_interval_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            pending_max_age_secs: 3600,
            sweep_interval_secs: 300,
        }
    }
}

impl StorageSettings {
    /// Pending age threshold as a [`Duration`]
    #[must_use]
    pub const fn pending_max_age(&self) -> Duration {
        Duration::from_secs(self.pending_max_age_secs)
    }

    /// Sweep period, or `None` when sweeping is disabled
    #[must_use]
    pub const fn sweep_interval(&self) -> Option<Duration> {
        if self.sweep_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.sweep_interval_secs))
        }
    }
}

/// Metadata database settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// `SQLite` connection URL
    pub url: String,

    /// Pool size
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://data/kb-files.db".to_string(),
            max_connections: 8,
        }
    }
}

/// Complete kb-files configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KbFilesConfig {
    /// HTTP listener
    #[serde(default)]
    pub server: ServerSettings,

    /// Blob storage
    #[serde(default)]
    pub storage: StorageSettings,

    /// Metadata database
    #[serde(default)]
    pub database: DatabaseSettings,
}

impl KbFilesConfig {
    /// Load configuration for a specific service
    ///
    /// Missing files are skipped; a file that exists but fails to parse is
    /// an error.
    pub fn load_for_service(service_name: &str) -> anyhow::Result<Self> {
        let mut figment = Self::defaults()?;

        let system_config = PathBuf::from("/etc/kb-files")
            .join(service_name)
            .join("config.toml");
        if system_config.exists() {
            figment = figment.merge(Toml::file(&system_config));
        }

        let user_config = Self::recommended_path(service_name);
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }

        let local_config = PathBuf::from("./config.toml");
        if local_config.exists() {
            figment = figment.merge(Toml::file(&local_config));
        }

        let config = figment.merge(Self::env()).extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Defaults fill anything the file leaves out and environment variables
    /// still take precedence.
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config = Self::defaults()?
            .merge(Toml::file(path.as_ref()))
            .merge(Self::env())
            .extract()?;

        Ok(config)
    }

    /// Get the recommended XDG config path for a service
    ///
    /// # Example
    ///
    /// ```rust
    /// use kb_files::config::KbFilesConfig;
    ///
    /// let path = KbFilesConfig::recommended_path("kb-files");
    /// // Returns: ~/.config/kb-files/kb-files/config.toml
    /// ```
    #[must_use]
    pub fn recommended_path(service_name: &str) -> PathBuf {
        dirs::config_dir().map_or_else(
            || PathBuf::from("./config.toml"),
            |config_dir| {
                config_dir
                    .join("kb-files")
                    .join(service_name)
                    .join("config.toml")
            },
        )
    }

    fn defaults() -> anyhow::Result<Figment> {
        Ok(Figment::new().merge(Toml::string(&toml::to_string(&Self::default())?)))
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).split("__").lowercase(true)
    }
}
