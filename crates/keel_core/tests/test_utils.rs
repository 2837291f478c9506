//! Shared fixtures for `keel_core` integration tests.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared fixtures, not every item is used by every test binary"
)]

use core::time::Duration;

use keel_core::{App, AppConfig};
use keel_outcome::Stage;
use keel_resource::memory::{MemoryDriver, MemoryStore};
use keel_resource::{ResourceKey, ResourceManager, ResourceName, ResourceSettings};

pub const PRIMARY: ResourceKey<MemoryDriver> = ResourceKey::new(ResourceName::Memory);
pub const CACHE: ResourceKey<MemoryDriver> = ResourceKey::new(ResourceName::Redis);

/// Configuration with a short release grace so disconnects never stall.
pub fn config(name: &str, stage: Stage) -> AppConfig {
    AppConfig::new(name).with_stage(stage).with_resources(
        ResourceSettings::new()
            .with_release_grace(Duration::from_millis(20))
            .with_release_poll(Duration::from_millis(5)),
    )
}

/// Primary store with two schema migrations.
pub fn primary_driver() -> MemoryDriver {
    MemoryDriver::new("memory://primary")
        .with_migration("create_orders", |store: &MemoryStore| {
            store.create_table("orders");
            Ok(())
        })
        .with_migration("create_customers", |store: &MemoryStore| {
            store.create_table("customers");
            Ok(())
        })
}

/// Builds an app over `primary` and `cache`.
pub fn app(config: AppConfig, primary: MemoryDriver, cache: MemoryDriver) -> App {
    let manager = ResourceManager::builder(config.resources.clone())
        .register(PRIMARY, move |_| Ok(primary))
        .register(CACHE, move |_| Ok(cache))
        .build()
        .into_result()
        .expect("manager builds");
    App::new(config, manager)
}

/// Builds a healthy app in the development stage.
pub fn healthy_app() -> App {
    app(
        config("orders", Stage::Development),
        primary_driver(),
        MemoryDriver::new("memory://cache"),
    )
}
