//! Example inventory service built with Keel.
//!
//! Stock lives in an in-memory catalog resource; a second in-memory resource
//! stands in for a session cache. Every operation reports an [`Outcome`], so
//! a failure deep in the resource layer reaches the caller with its full
//! cause chain.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  App                                                 │
//! │                                                      │
//! │  ┌───────────┐   ┌─────────────────┐   ┌──────────┐  │
//! │  │ Inventory │──▶│ ResourceManager │──▶│ catalog  │  │
//! │  └───────────┘   └────────┬────────┘   └──────────┘  │
//! │                           │            ┌──────────┐  │
//! │                           └───────────▶│ sessions │  │
//! │                                        └──────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use keel_core::AppConfig;
use keel_outcome::{ErrorKind, Failure, Outcome};
use keel_resource::memory::{MemoryDriver, MemoryStore};
use keel_resource::{
    AuditLogger, Hooks, ManagerOutcome, ResourceKey, ResourceManager, ResourceName,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Catalog of stocked items.
pub const CATALOG: ResourceKey<MemoryDriver> = ResourceKey::new(ResourceName::Memory);

/// Session cache.
pub const SESSIONS: ResourceKey<MemoryDriver> = ResourceKey::new(ResourceName::Redis);

const ITEMS_TABLE: &str = "items";

/// A stocked item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stock keeping unit.
    pub sku: String,
    /// Units on hand.
    pub quantity: u32,
}

/// Failures of inventory operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryErrorKind {
    /// The catalog is not reachable.
    Unavailable,
    /// The item is malformed.
    Invalid,
    /// An item with the same SKU exists.
    Duplicate,
}

impl ErrorKind for InventoryErrorKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Unavailable => "InventoryUnavailableError",
            Self::Invalid => "InventoryInvalidError",
            Self::Duplicate => "InventoryDuplicateError",
        }
    }
}

/// Builds the manager for the inventory service.
///
/// Calls are audited on the `keel::audit` target, except handle lookups.
pub fn build_manager(config: &AppConfig) -> ManagerOutcome<ResourceManager> {
    let hooks = Arc::new(Hooks::new());
    if let Err(error) = AuditLogger::new().skipping(["get_handle"]).register(&hooks) {
        tracing::warn!(%error, "audit logger not installed");
    }

    ResourceManager::builder(config.resources.clone())
        .hooks(hooks)
        .register(CATALOG, |_| {
            Ok(MemoryDriver::new("memory://catalog").with_migration(
                "create_items",
                |store: &MemoryStore| {
                    store.create_table(ITEMS_TABLE);
                    Ok(())
                },
            ))
        })
        .register(SESSIONS, |_| Ok(MemoryDriver::new("memory://sessions")))
        .build()
}

/// Inventory operations over a started manager.
#[derive(Debug, Clone, Copy)]
pub struct Inventory<'a> {
    manager: &'a ResourceManager,
}

impl<'a> Inventory<'a> {
    /// Wraps `manager`.
    #[must_use]
    pub fn new(manager: &'a ResourceManager) -> Self {
        Self { manager }
    }

    /// Adds a new item to the catalog.
    pub fn add(&self, item: Item) -> Outcome<Item, InventoryErrorKind> {
        if item.sku.trim().is_empty() {
            return Failure::build("item rejected", InventoryErrorKind::Invalid)
                .details(json!({ "reason": "empty sku" }))
                .into_outcome();
        }

        let catalog = match self.manager.get_handle(CATALOG).into_result() {
            Ok(catalog) => catalog,
            Err(failure) => {
                return Failure::build("catalog unavailable", InventoryErrorKind::Unavailable)
                    .cause(failure)
                    .into_outcome();
            }
        };

        if catalog
            .rows(ITEMS_TABLE)
            .iter()
            .any(|row| row["sku"] == item.sku.as_str())
        {
            return Failure::build("item already stocked", InventoryErrorKind::Duplicate)
                .details(json!({ "sku": item.sku }))
                .into_outcome();
        }

        catalog.insert(ITEMS_TABLE, json!(item));
        Outcome::success("item added", item)
    }

    /// Every item in the catalog, in insertion order.
    pub fn items(&self) -> Outcome<Vec<Item>, InventoryErrorKind> {
        match self.manager.get_handle(CATALOG).into_result() {
            Ok(catalog) => {
                let items = catalog
                    .rows(ITEMS_TABLE)
                    .into_iter()
                    .filter_map(|row| serde_json::from_value(row).ok())
                    .collect();
                Outcome::success("items listed", items)
            }
            Err(failure) => Failure::build("catalog unavailable", InventoryErrorKind::Unavailable)
                .cause(failure)
                .into_outcome(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use keel_resource::ResourceSettings;

    fn config() -> AppConfig {
        AppConfig::new("inventory").with_resources(
            ResourceSettings::new()
                .with_release_grace(Duration::from_millis(20))
                .with_release_poll(Duration::from_millis(5)),
        )
    }

    fn item(sku: &str, quantity: u32) -> Item {
        Item {
            sku: sku.to_owned(),
            quantity,
        }
    }

    #[tokio::test]
    async fn add_and_list_items() {
        let manager = build_manager(&config()).into_result().expect("manager builds");
        assert!(manager.connect_all().await.is_success());
        assert!(manager.migrate_all().await.is_success());

        let inventory = Inventory::new(&manager);
        assert!(inventory.add(item("A-1", 3)).is_success());
        assert!(inventory.add(item("B-2", 0)).is_success());

        let listed = inventory.items().into_result().expect("items listed");
        assert_eq!(listed, [item("A-1", 3), item("B-2", 0)]);
    }

    #[tokio::test]
    async fn duplicate_and_invalid_items_are_rejected() {
        let manager = build_manager(&config()).into_result().expect("manager builds");
        assert!(manager.connect_all().await.is_success());

        let inventory = Inventory::new(&manager);
        assert!(inventory.add(item("A-1", 3)).is_success());
        assert_eq!(
            inventory.add(item("A-1", 9)).kind(),
            Some(InventoryErrorKind::Duplicate)
        );
        assert_eq!(
            inventory.add(item(" ", 1)).kind(),
            Some(InventoryErrorKind::Invalid)
        );
    }

    #[test]
    fn disconnected_catalog_is_unavailable() {
        let manager = build_manager(&config()).into_result().expect("manager builds");

        let outcome = Inventory::new(&manager).add(item("A-1", 3));
        assert_eq!(
            outcome.cause_kind_chain(),
            ["InventoryUnavailableError", "NotConnectedError"]
        );
    }
}
