//! Resource lifecycle management for Keel.
//!
//! `keel_resource` wraps external dependencies (databases, caches) in a small
//! connect/disconnect state machine and coordinates a named set of them as
//! one unit. Every operation returns a [`keel_outcome::Outcome`].
//!
//! # Core Concepts
//!
//! - [`Driver`] - Backend-specific open/close/migrate/empty hooks
//! - [`Resource`] - State machine around one driver
//! - [`ResourceManager`] - Aggregate lifecycle with per-resource isolation
//! - [`ResourceKey`] - Typed key for handle lookup
//! - [`Hooks`] - Call observers for audit logging
//! - [`poll_until`] - Bounded polling with constant backoff
//!
//! # Architecture
//!
//! - **Outcome** (`keel_outcome`): result model used by every operation
//! - **Resource** (this crate): lifecycle and orchestration
//! - **Core** (`keel_core`): configuration, tracing setup, application lifecycle

/// Backend driver interface.
pub mod driver;

/// Error kinds for resources and the manager.
pub mod error;

/// Call instrumentation.
pub mod hooks;

/// Aggregate lifecycle of a resource set.
pub mod manager;

/// In-process backend.
pub mod memory;

/// Resource names and typed keys.
pub mod name;

/// Per-resource state machine.
pub mod resource;

/// Resource settings.
pub mod settings;

/// Bounded polling timer.
pub mod timer;

pub use driver::{Driver, DriverError, MigrationReport};
pub use error::{ManagerErrorKind, Operation, ResourceErrorKind};
pub use hooks::{AuditLogger, CallEvent, CallPhase, Component, HookRegistrationError, Hooks};
pub use manager::{ManagerOutcome, ResourceManager, ResourceManagerBuilder};
pub use name::{ResourceKey, ResourceName};
pub use resource::{ManagedResource, Resource, ResourceOutcome};
pub use settings::ResourceSettings;
pub use timer::{PollStatus, TimerErrorKind, poll_until, wait_until};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::driver::{Driver, DriverError, MigrationReport};
    pub use crate::error::{ManagerErrorKind, ResourceErrorKind};
    pub use crate::hooks::{AuditLogger, Hooks};
    pub use crate::manager::ResourceManager;
    pub use crate::name::{ResourceKey, ResourceName};
    pub use crate::resource::Resource;
    pub use crate::settings::ResourceSettings;
}
