//! Configuration for dualstore
//!
//! Centralized configuration with sensible defaults. Table names, the entity
//! type and timeouts are passed in explicitly at construction.

use std::time::Duration;

use crate::error::{Error, Result};

/// Main configuration for a dual-store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Entity Configuration
    // -------------------------------------------------------------------------
    /// Entity type name, used in primary keys and routing index names
    pub entity_type: String,

    /// Application version stamped into every primary and shadow row
    pub app_version: String,

    // -------------------------------------------------------------------------
    // Table Configuration
    // -------------------------------------------------------------------------
    /// Primary store table holding the full entity rows
    pub primary_table: String,

    /// Shadow table streamed into the search store
    pub shadow_table: String,

    // -------------------------------------------------------------------------
    // Request Configuration
    // -------------------------------------------------------------------------
    /// Default bound on every store call (milliseconds)
    pub store_timeout_ms: u64,

    /// Page size used when a list request does not give one
    pub default_list_limit: usize,

    /// Upper bound on a list request's page size
    pub max_list_limit: usize,

    // -------------------------------------------------------------------------
    // Journal Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the journal of a file backend
    pub journal_sync: JournalSyncStrategy,
}

/// Journal sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalSyncStrategy {
    /// fsync after every batch (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced batches (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            entity_type: "project".to_string(),
            app_version: crate::VERSION.to_string(),
            primary_table: "projects".to_string(),
            shadow_table: "projects-search".to_string(),
            store_timeout_ms: 5000,
            default_list_limit: 50,
            max_list_limit: 1000,
            journal_sync: JournalSyncStrategy::EveryNEntries { count: 100 },
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Default store call bound as a Duration
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Check the configuration for values the adapters cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.entity_type.is_empty() || self.entity_type.contains('#') {
            return Err(Error::validation(format!(
                "entity type {:?} must be non-empty and must not contain '#'",
                self.entity_type
            )));
        }
        if self.primary_table.is_empty() || self.shadow_table.is_empty() {
            return Err(Error::validation("table names must not be empty"));
        }
        if self.primary_table == self.shadow_table {
            return Err(Error::validation(format!(
                "primary and shadow tables must differ (both are {:?})",
                self.primary_table
            )));
        }
        if self.store_timeout_ms == 0 {
            return Err(Error::validation("store timeout must be greater than zero"));
        }
        if self.default_list_limit == 0 || self.default_list_limit > self.max_list_limit {
            return Err(Error::validation(format!(
                "default list limit {} must be within 1..={}",
                self.default_list_limit, self.max_list_limit
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the entity type name
    pub fn entity_type(mut self, name: impl Into<String>) -> Self {
        self.config.entity_type = name.into();
        self
    }

    /// Set the application version stamped into rows
    pub fn app_version(mut self, version: impl Into<String>) -> Self {
        self.config.app_version = version.into();
        self
    }

    /// Set the primary table name
    pub fn primary_table(mut self, table: impl Into<String>) -> Self {
        self.config.primary_table = table.into();
        self
    }

    /// Set the shadow (search stream) table name
    pub fn shadow_table(mut self, table: impl Into<String>) -> Self {
        self.config.shadow_table = table.into();
        self
    }

    /// Set the default store call timeout (in milliseconds)
    pub fn store_timeout_ms(mut self, ms: u64) -> Self {
        self.config.store_timeout_ms = ms;
        self
    }

    /// Set the default list page size
    pub fn default_list_limit(mut self, limit: usize) -> Self {
        self.config.default_list_limit = limit;
        self
    }

    /// Set the maximum list page size
    pub fn max_list_limit(mut self, limit: usize) -> Self {
        self.config.max_list_limit = limit;
        self
    }

    /// Set the journal sync strategy
    pub fn journal_sync(mut self, strategy: JournalSyncStrategy) -> Self {
        self.config.journal_sync = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
