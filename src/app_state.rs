//! Application State Management
//!
//! This module provides the application state that contains all services
//! and their dependencies, following the dependency injection pattern.

use std::sync::Arc;

use log::info;

use crate::accountant::{CounterAccountant, DerivedAccountant, StorageAccountant};
use crate::config::{AccountingStrategy, AppConfig, StoreBackend};
use crate::gate::QuotaGate;
use crate::hooks::HookRegistry;
use crate::store::mock_store::{MockProfileStore, MockRecordStore};
use crate::store::sqlite_store::{SqliteProfileStore, SqliteRecordStore};
use crate::store::{ProfileStore, RecordStore};

/// Application state containing all services and their dependencies
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<dyn RecordStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub accountant: Arc<dyn StorageAccountant>,
    pub hooks: Arc<HookRegistry>,
    pub gate: Arc<QuotaGate>,
    pub config: AppConfig,
}

impl AppState {
    /// Create a new application state with services configured from YAML config
    pub fn new() -> Self {
        let config = AppConfig::load().expect("Failed to load configuration");
        Self::from_config(config)
    }

    /// Create application state from configuration
    pub fn from_config(config: AppConfig) -> Self {
        info!("Initializing application state with configuration");

        let (records, profiles): (Arc<dyn RecordStore>, Arc<dyn ProfileStore>) =
            match config.store.backend {
                StoreBackend::SQLite => {
                    info!(
                        "Using SQLite store backend with db_path: {}",
                        config.store.db_path
                    );
                    let records = SqliteRecordStore::open(&config.store.db_path)
                        .expect("Failed to open record store");
                    let profiles = SqliteProfileStore::open(&config.store.db_path)
                        .expect("Failed to open profile store");
                    (Arc::new(records), Arc::new(profiles))
                }
                StoreBackend::Mock => {
                    info!("Using mock store backend");
                    (
                        Arc::new(MockRecordStore::new()),
                        Arc::new(MockProfileStore::new()),
                    )
                }
            };

        let accountant: Arc<dyn StorageAccountant> = match config.quota.strategy {
            AccountingStrategy::Derived => {
                info!("Using derived-sum accounting");
                Arc::new(DerivedAccountant::new(
                    Arc::clone(&records),
                    config.quota.record_type.clone(),
                    config.quota.size_path.clone(),
                ))
            }
            AccountingStrategy::Counter => {
                info!("Using counter accounting with reconciliation");
                Arc::new(CounterAccountant::new(Arc::clone(&profiles)))
            }
        };

        let hooks = Arc::new(HookRegistry::new());
        let gate = Arc::new(QuotaGate::new(&config.quota, Arc::clone(&accountant)));
        QuotaGate::register(&gate, &hooks);

        info!("Application state initialized successfully");
        Self {
            records,
            profiles,
            accountant,
            hooks,
            gate,
            config,
        }
    }

    /// Create application state for testing with mock backends
    pub fn new_for_testing(config: AppConfig) -> Self {
        let records: Arc<dyn RecordStore> = Arc::new(MockRecordStore::new());
        let profiles: Arc<dyn ProfileStore> = Arc::new(MockProfileStore::new());

        let accountant: Arc<dyn StorageAccountant> = match config.quota.strategy {
            AccountingStrategy::Derived => Arc::new(DerivedAccountant::new(
                Arc::clone(&records),
                config.quota.record_type.clone(),
                config.quota.size_path.clone(),
            )),
            AccountingStrategy::Counter => Arc::new(CounterAccountant::new(Arc::clone(&profiles))),
        };

        let hooks = Arc::new(HookRegistry::new());
        let gate = Arc::new(QuotaGate::new(&config.quota, Arc::clone(&accountant)));
        QuotaGate::register(&gate, &hooks);

        Self {
            records,
            profiles,
            accountant,
            hooks,
            gate,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_for_testing_uses_mock_backends() {
        let mut config = AppConfig::default();
        config.store.backend = StoreBackend::Mock;

        let state = AppState::new_for_testing(config);
        assert_eq!(state.accountant.get_user_storage("nobody").unwrap(), 0);
    }

    #[test]
    fn test_counter_strategy_reads_profile_totals() {
        let mut config = AppConfig::default();
        config.store.backend = StoreBackend::Mock;
        config.quota.strategy = AccountingStrategy::Counter;

        let state = AppState::new_for_testing(config);
        state.profiles.set_storage_total("alice", 123).unwrap();
        assert_eq!(state.accountant.get_user_storage("alice").unwrap(), 123);
    }
}
