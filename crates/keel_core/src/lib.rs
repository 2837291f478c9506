//! Configuration, tracing setup and application lifecycle for Keel.
//!
//! # Core Concepts
//!
//! - [`AppConfig`] - Environment-driven application configuration
//! - [`TracingSetup`] - Global `tracing` subscriber installation
//! - [`App`] - Start, close and reload a set of resources
//! - [`HealthReport`] - Connection snapshot for health checks
//!
//! # Example
//!
//! ```
//! use keel_core::{App, AppConfig};
//! use keel_resource::{ResourceKey, ResourceManager, ResourceName};
//! use keel_resource::memory::MemoryDriver;
//!
//! const CACHE: ResourceKey<MemoryDriver> = ResourceKey::new(ResourceName::Memory);
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let config = AppConfig::new("inventory");
//! let manager = ResourceManager::builder(config.resources.clone())
//!     .register(CACHE, |_| Ok(MemoryDriver::new("memory://cache")))
//!     .build()
//!     .into_result()
//!     .unwrap();
//!
//! let app = App::new(config, manager);
//! assert!(app.start().await.is_success());
//! assert!(app.health().resources[&ResourceName::Memory]);
//! assert!(app.close().await.is_success());
//! # });
//! ```

/// Application lifecycle.
pub mod app;

/// Application configuration.
pub mod config;

/// Tracing subscriber setup.
pub mod tracing_setup;

pub use app::{App, AppErrorKind, AppOutcome, HealthReport};
pub use config::{AppConfig, ConfigError, ConfigErrorKind};
pub use tracing_setup::{ParseTracingFormatError, TracingConfig, TracingFormat, TracingSetup};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::app::{App, AppErrorKind, HealthReport};
    pub use crate::config::AppConfig;
    pub use crate::tracing_setup::{TracingFormat, TracingSetup};
}
