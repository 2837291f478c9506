//! In-process backend for tests and demos.
//!
//! [`MemoryDriver`] opens a fresh [`MemoryStore`]: a set of named tables of
//! JSON rows. It supports ordered, idempotent migrations recorded in a
//! ledger table, and can be told to fail its handshake or release to
//! exercise failure paths.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Value, json};

use crate::driver::{Driver, DriverError, MigrationReport};

/// Table recording applied migrations. Survives [`Driver::empty`].
pub const MIGRATION_LEDGER: &str = "_migrations";

type MigrationFn = Arc<dyn Fn(&MemoryStore) -> Result<(), String> + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// MemoryStore
// ─────────────────────────────────────────────────────────────────────────────

/// Named tables of JSON rows, in creation order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<IndexMap<String, Vec<Value>>>,
    released: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `table` if it does not exist.
    pub fn create_table(&self, table: &str) {
        self.tables.write().entry(table.to_owned()).or_default();
    }

    /// Appends `row` to `table`, creating the table if needed.
    pub fn insert(&self, table: &str, row: Value) {
        self.tables
            .write()
            .entry(table.to_owned())
            .or_default()
            .push(row);
    }

    /// Rows of `table`, empty if the table does not exist.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.read().get(table).cloned().unwrap_or_default()
    }

    /// Names of every table, including the migration ledger.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    /// Returns `true` if every table except the migration ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables
            .read()
            .iter()
            .filter(|(name, _)| name.as_str() != MIGRATION_LEDGER)
            .all(|(_, rows)| rows.is_empty())
    }

    /// Returns `true` once the driver has released this store.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Names of the migrations applied to this store, in order.
    #[must_use]
    pub fn applied_migrations(&self) -> Vec<String> {
        self.rows(MIGRATION_LEDGER)
            .iter()
            .filter_map(|row| row.get("name").and_then(Value::as_str).map(str::to_owned))
            .collect()
    }

    fn truncate_data(&self) {
        for (name, rows) in self.tables.write().iter_mut() {
            if name != MIGRATION_LEDGER {
                rows.clear();
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MemoryDriver
// ─────────────────────────────────────────────────────────────────────────────

/// Driver producing [`MemoryStore`] handles.
#[derive(Clone, Default)]
pub struct MemoryDriver {
    host: String,
    migrations: Vec<(String, MigrationFn)>,
    unreachable: bool,
    failing_release: bool,
}

impl fmt::Debug for MemoryDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDriver")
            .field("host", &self.host)
            .field(
                "migrations",
                &self.migrations.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .field("unreachable", &self.unreachable)
            .field("failing_release", &self.failing_release)
            .finish()
    }
}

impl MemoryDriver {
    /// Creates a driver reporting `host`.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Appends a named migration. Migrations run in the order they are added.
    #[must_use]
    pub fn with_migration<F>(mut self, name: impl Into<String>, migration: F) -> Self
    where
        F: Fn(&MemoryStore) -> Result<(), String> + Send + Sync + 'static,
    {
        self.migrations.push((name.into(), Arc::new(migration)));
        self
    }

    /// Makes every handshake fail with [`DriverError::Unreachable`].
    #[must_use]
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Makes every release fail with [`DriverError::Release`].
    #[must_use]
    pub fn failing_release(mut self) -> Self {
        self.failing_release = true;
        self
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    type Handle = MemoryStore;

    fn host(&self) -> Result<String, DriverError> {
        Ok(self.host.clone())
    }

    async fn open(&self) -> Result<MemoryStore, DriverError> {
        if self.unreachable {
            return Err(DriverError::Unreachable {
                host: self.host.clone(),
                reason: "connection refused".to_owned(),
            });
        }
        let store = MemoryStore::new();
        store.create_table(MIGRATION_LEDGER);
        Ok(store)
    }

    async fn close(&self, handle: &MemoryStore) -> Result<(), DriverError> {
        if self.failing_release {
            return Err(DriverError::Release(format!(
                "{} refused to release",
                self.host
            )));
        }
        handle.released.store(true, Ordering::Release);
        Ok(())
    }

    fn supports_migration(&self) -> bool {
        !self.migrations.is_empty()
    }

    async fn migrate(&self, handle: &MemoryStore) -> Result<MigrationReport, DriverError> {
        let already = handle.applied_migrations();
        let mut report = MigrationReport::default();

        for (name, migration) in &self.migrations {
            if already.contains(name) {
                continue;
            }
            migration(handle).map_err(|reason| DriverError::Migration {
                step: name.clone(),
                reason,
            })?;
            handle.insert(MIGRATION_LEDGER, json!({ "name": name }));
            tracing::debug!(host = %self.host, step = %name, "migration step applied");
            report.applied.push(name.clone());
        }

        Ok(report)
    }

    async fn empty(&self, handle: &MemoryStore) -> Result<(), DriverError> {
        handle.truncate_data();
        Ok(())
    }
}
