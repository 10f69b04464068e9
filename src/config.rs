//! Application Configuration
//!
//! This module provides configuration management for the application,
//! supporting YAML configuration files with sensible defaults. Quota
//! options are validated eagerly: a missing record type or size path is a
//! startup failure, never a per-request one.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default ceiling on a member's accounted bytes: 15 GiB
pub const DEFAULT_MAX_STORAGE: u64 = 1024 * 1024 * 1024 * 15;

/// Store backend types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StoreBackend {
    SQLite,
    Mock,
}

impl Default for StoreBackend {
    fn default() -> Self {
        StoreBackend::SQLite
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::SQLite),
            "mock" => Ok(StoreBackend::Mock),
            _ => Err(format!("Unknown store backend: {}", s)),
        }
    }
}

/// Accounting strategy for member storage totals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AccountingStrategy {
    /// Recompute the total from the record store on every read
    Derived,
    /// Keep a running counter on the member profile
    Counter,
}

impl Default for AccountingStrategy {
    fn default() -> Self {
        AccountingStrategy::Derived
    }
}

impl std::str::FromStr for AccountingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "derived" => Ok(AccountingStrategy::Derived),
            "counter" => Ok(AccountingStrategy::Counter),
            _ => Err(format!("Unknown accounting strategy: {}", s)),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Quota enforcement configuration
    pub quota: QuotaConfig,
    /// Store configuration
    pub store: StoreConfig,
    /// Counter reconciliation worker configuration
    pub reconcile: ReconcileConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Number of worker threads
    pub workers: usize,
}

/// Quota enforcement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Record type to enforce on (e.g. "file", "s3File"); required
    pub record_type: String,
    /// Dotted path to the byte size inside record metadata; required
    pub size_path: String,
    /// Maximum accounted bytes per member
    pub max_member_storage: u64,
    /// Admit records of the target type that carry no size yet (remote
    /// uploads receive their size in a later update)
    pub tolerate_missing_size_on_create: bool,
    /// How member totals are computed
    pub strategy: AccountingStrategy,
}

/// Store backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend type
    pub backend: StoreBackend,
    /// Database file path
    pub db_path: String,
}

/// Counter reconciliation worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Enable the reconciliation worker (only meaningful with the counter
    /// strategy)
    pub enabled: bool,
    /// Reconciliation interval in seconds
    pub interval: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Path to the log4rs configuration file
    pub config_file: String,
}

impl AppConfig {
    /// Load configuration from file, use defaults if not found.
    /// Invalid quota options fail the load.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = "config.yaml";
        let config = if Path::new(config_path).exists() {
            let content = fs::read_to_string(config_path)?;
            let config: AppConfig = serde_yaml::from_str(&content)?;
            info!("Loaded configuration from {}", config_path);
            config
        } else {
            warn!("Config file not found, using defaults");
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the quota options that must be present at startup.
    pub fn validate(&self) -> Result<(), String> {
        if self.quota.record_type.is_empty() {
            return Err("missing quota option: record_type".to_string());
        }
        if self.quota.size_path.is_empty() {
            return Err("missing quota option: size_path".to_string());
        }
        if self.quota.max_member_storage == 0 {
            return Err("quota option max_member_storage must be positive".to_string());
        }
        Ok(())
    }

    /// Create default configuration
    pub fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 9720,
                workers: 4,
            },
            quota: QuotaConfig {
                record_type: "file".to_string(),
                size_path: "file.size".to_string(),
                max_member_storage: DEFAULT_MAX_STORAGE,
                tolerate_missing_size_on_create: true,
                strategy: AccountingStrategy::Derived,
            },
            store: StoreConfig {
                backend: StoreBackend::SQLite,
                db_path: "./data/quota.sqlite".to_string(),
            },
            reconcile: ReconcileConfig {
                enabled: true,
                interval: 300, // 5 minutes
            },
            logging: LoggingConfig {
                config_file: "server_log.yaml".to_string(),
            },
        }
    }
}
