//! File and environment configuration for quantrackd.

use quantrack_core::certificate::DEFAULT_VERIFICATION_BASE;
use quantrack_core::StorageConfig;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub certificates: CertificateConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageSettings::default(),
            certificates: CertificateConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,

    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8092)),
            enable_cors: true,
        }
    }
}

/// Storage backend as written in configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageSettings {
    Memory,

    Postgres {
        url: String,

        #[serde(default = "default_pool_size")]
        max_connections: u32,
    },
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings::Memory
    }
}

impl StorageSettings {
    pub fn to_core(&self) -> StorageConfig {
        match self {
            Self::Memory => StorageConfig::Memory,
            Self::Postgres {
                url,
                max_connections,
            } => StorageConfig::postgres(url.clone(), *max_connections),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateConfig {
    /// Public base URL certificates link back to (`{base}/verify/{code}`).
    #[serde(default = "default_verification_base")]
    pub verification_base: String,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            verification_base: default_verification_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_pool_size() -> u32 {
    10
}

fn default_verification_base() -> String {
    DEFAULT_VERIFICATION_BASE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServiceConfig {
    /// Layer defaults, an optional file and `QUANTRACK__*` environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&ServiceConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("QUANTRACK")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
