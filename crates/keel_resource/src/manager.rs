//! Coordinated lifecycle of a named set of resources.
//!
//! The [`ResourceManager`] applies one lifecycle step to every registered
//! resource, in registration order, and merges the per-resource outcomes into
//! a single aggregate outcome.
//!
//! # Aggregation
//!
//! Every aggregate operation visits every resource, even after a failure, so
//! the caller sees the full failure surface at once. Each per-resource call
//! runs inside a failure boundary:
//!
//! - a returned failure becomes a `<Operation>LocalError` citing it,
//! - a panic becomes a `<Operation>GlobalError` citing the panic payload.
//!
//! If any resource failed, the aggregate failure's primary cause is the first
//! per-resource failure and the others are sibling causes, so
//! [`cause_kind_chain`](keel_outcome::Outcome::cause_kind_chain) lists every
//! one of them. Resources are processed sequentially, never concurrently.
//!
//! # Example
//!
//! ```
//! use keel_resource::memory::MemoryDriver;
//! use keel_resource::{ResourceKey, ResourceManager, ResourceName, ResourceSettings};
//!
//! const CACHE: ResourceKey<MemoryDriver> = ResourceKey::new(ResourceName::Memory);
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let manager = ResourceManager::builder(ResourceSettings::default())
//!     .register(CACHE, |_| Ok(MemoryDriver::new("memory.local")))
//!     .build()
//!     .into_result()
//!     .expect("factories succeed");
//!
//! assert!(manager.get_handle(CACHE).is_failure());
//! assert!(manager.connect_all().await.is_success());
//! assert!(manager.get_handle(CACHE).is_success());
//! # });
//! ```

use core::fmt;
use core::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use indexmap::IndexMap;
use keel_outcome::{Cause, Failure, Outcome};
use serde_json::json;

use crate::driver::{Driver, DriverError, MigrationReport};
use crate::error::{ManagerErrorKind, Operation, ResourceErrorKind};
use crate::hooks::{CallEvent, Component, Hooks};
use crate::name::{ResourceKey, ResourceName};
use crate::resource::{ManagedResource, Resource, ResourceOutcome};
use crate::settings::ResourceSettings;

/// Outcome of a manager operation.
pub type ManagerOutcome<T> = Outcome<T, ManagerErrorKind>;

type Factory = Box<
    dyn FnOnce(&ResourceSettings, Arc<Hooks>) -> Result<Box<dyn ManagedResource>, DriverError>
        + Send,
>;

// ─────────────────────────────────────────────────────────────────────────────
// ResourceManagerBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder returned by [`ResourceManager::builder`].
#[must_use]
pub struct ResourceManagerBuilder {
    settings: ResourceSettings,
    hooks: Arc<Hooks>,
    factories: Vec<(ResourceName, Factory)>,
}

impl fmt::Debug for ResourceManagerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManagerBuilder")
            .field("settings", &self.settings)
            .field(
                "factories",
                &self.factories.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl ResourceManagerBuilder {
    /// Uses `hooks` for the manager and every resource it builds.
    pub fn hooks(mut self, hooks: Arc<Hooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Registers a resource under `key`, built by `factory` at
    /// [`build`](Self::build) time.
    pub fn register<D, F>(mut self, key: ResourceKey<D>, factory: F) -> Self
    where
        D: Driver,
        F: FnOnce(&ResourceSettings) -> Result<D, DriverError> + Send + 'static,
    {
        let name = key.name();
        let factory: Factory = Box::new(
            move |settings: &ResourceSettings,
                  hooks: Arc<Hooks>|
                  -> Result<Box<dyn ManagedResource>, DriverError> {
                let driver = factory(settings)?;
                Ok(Box::new(Resource::new(name, driver, settings.clone(), hooks)))
            },
        );
        self.factories.push((name, factory));
        self
    }

    /// Runs every factory and builds the manager.
    ///
    /// All factories are attempted. The build fails with
    /// `ManagerInitializationError` if any factory fails or panics, or if a
    /// name was registered twice.
    pub fn build(self) -> ManagerOutcome<ResourceManager> {
        let mut resources: IndexMap<ResourceName, Box<dyn ManagedResource>> = IndexMap::new();
        let mut failures = Vec::new();

        for (name, factory) in self.factories {
            if resources.contains_key(&name) {
                failures.push((
                    name,
                    item_failure(
                        ManagerErrorKind::Local(Operation::Initialize),
                        name,
                        None,
                    ),
                ));
                continue;
            }

            let hooks = Arc::clone(&self.hooks);
            let settings = &self.settings;
            match catch_unwind(AssertUnwindSafe(|| factory(settings, hooks))) {
                Ok(Ok(resource)) => {
                    resources.insert(name, resource);
                }
                Ok(Err(error)) => failures.push((
                    name,
                    item_failure(
                        ManagerErrorKind::Local(Operation::Initialize),
                        name,
                        Some(Cause::error(error)),
                    ),
                )),
                Err(payload) => failures.push((
                    name,
                    item_failure(
                        ManagerErrorKind::Global(Operation::Initialize),
                        name,
                        Some(Cause::panic(payload)),
                    ),
                )),
            }
        }

        if !failures.is_empty() {
            return aggregate_failure(Operation::Initialize, failures).into_outcome();
        }

        tracing::debug!(resources = resources.len(), "resource manager built");
        Outcome::success(
            "resource manager built",
            ResourceManager {
                settings: self.settings,
                hooks: self.hooks,
                resources,
                connected: AtomicBool::new(false),
                aggregate: tokio::sync::Mutex::new(()),
            },
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ResourceManager
// ─────────────────────────────────────────────────────────────────────────────

/// Owns a named set of resources and drives them as one unit.
///
/// Resources live exactly as long as the manager. Aggregate operations are
/// serialized: a second `connect_all` waits for the first to finish.
pub struct ResourceManager {
    settings: ResourceSettings,
    hooks: Arc<Hooks>,
    resources: IndexMap<ResourceName, Box<dyn ManagedResource>>,
    connected: AtomicBool,
    aggregate: tokio::sync::Mutex<()>,
}

impl fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("resources", &self.status())
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl ResourceManager {
    /// Starts building a manager with `settings`.
    pub fn builder(settings: ResourceSettings) -> ResourceManagerBuilder {
        ResourceManagerBuilder {
            settings,
            hooks: Arc::new(Hooks::new()),
            factories: Vec::new(),
        }
    }

    /// Settings shared by every resource.
    #[must_use]
    pub fn settings(&self) -> &ResourceSettings {
        &self.settings
    }

    /// The hooks registry notified by the manager and its resources.
    #[must_use]
    pub fn hooks(&self) -> &Arc<Hooks> {
        &self.hooks
    }

    /// Registered names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<ResourceName> {
        self.resources.keys().copied().collect()
    }

    /// `true` only after a fully successful [`connect_all`](Self::connect_all)
    /// not yet followed by [`disconnect_all`](Self::disconnect_all).
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Type-erased access to one resource.
    #[must_use]
    pub fn resource(&self, name: ResourceName) -> Option<&dyn ManagedResource> {
        self.resources.get(&name).map(|resource| &**resource)
    }

    /// Typed access to the resource registered under `key`.
    #[must_use]
    pub fn typed_resource<D: Driver>(&self, key: ResourceKey<D>) -> Option<&Resource<D>> {
        self.resources
            .get(&key.name())
            .and_then(|resource| resource.as_any().downcast_ref::<Resource<D>>())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Aggregate operations
    // ─────────────────────────────────────────────────────────────────────

    /// Connects every resource.
    ///
    /// The manager is marked connected only if every resource connected.
    pub async fn connect_all(&self) -> ManagerOutcome<()> {
        self.started("connect_all");
        let _aggregate = self.aggregate.lock().await;

        let mut failures = Vec::new();
        for (name, resource) in &self.resources {
            let result = isolate(Operation::Connect, *name, resource.connect()).await;
            if let Err(failure) = result.and_then(|outcome| localize(Operation::Connect, *name, outcome)) {
                failures.push((*name, failure));
            }
        }

        let outcome = aggregate(Operation::Connect, failures, "resources connected", ());
        if outcome.is_success() {
            self.connected.store(true, Ordering::Release);
        }
        self.completed("connect_all", outcome)
    }

    /// Disconnects every resource.
    ///
    /// The manager stops being connected as soon as the call starts.
    pub async fn disconnect_all(&self) -> ManagerOutcome<()> {
        self.started("disconnect_all");
        let _aggregate = self.aggregate.lock().await;
        self.connected.store(false, Ordering::Release);

        let mut failures = Vec::new();
        for (name, resource) in &self.resources {
            let result = isolate(Operation::Disconnect, *name, resource.disconnect()).await;
            if let Err(failure) =
                result.and_then(|outcome| localize(Operation::Disconnect, *name, outcome))
            {
                failures.push((*name, failure));
            }
        }

        let outcome = aggregate(Operation::Disconnect, failures, "resources disconnected", ());
        self.completed("disconnect_all", outcome)
    }

    /// Migrates every resource that supports migrations.
    ///
    /// Resources without migrations count as successes and are absent from
    /// the returned reports.
    pub async fn migrate_all(&self) -> ManagerOutcome<IndexMap<ResourceName, MigrationReport>> {
        self.started("migrate_all");
        let _aggregate = self.aggregate.lock().await;

        let mut reports = IndexMap::new();
        let mut failures = Vec::new();
        for (name, resource) in &self.resources {
            let result = isolate(Operation::Migrate, *name, resource.migrate())
                .await
                .and_then(|outcome| match outcome {
                    Some(outcome) => localize(Operation::Migrate, *name, outcome).map(Some),
                    None => Ok(None),
                });
            match result {
                Ok(Some(report)) => {
                    reports.insert(*name, report);
                }
                Ok(None) => tracing::debug!(resource = %name, "no migrations, skipping"),
                Err(failure) => failures.push((*name, failure)),
            }
        }

        let outcome = aggregate(Operation::Migrate, failures, "resources migrated", reports);
        self.completed("migrate_all", outcome)
    }

    /// Removes all data from every resource. Not for production use.
    pub async fn clear_all(&self) -> ManagerOutcome<()> {
        self.started("clear_all");
        let _aggregate = self.aggregate.lock().await;

        let mut failures = Vec::new();
        for (name, resource) in &self.resources {
            let result = isolate(Operation::Clear, *name, resource.clear()).await;
            if let Err(failure) = result.and_then(|outcome| localize(Operation::Clear, *name, outcome)) {
                failures.push((*name, failure));
            }
        }

        let outcome = aggregate(Operation::Clear, failures, "resources emptied", ());
        self.completed("clear_all", outcome)
    }

    /// Configured host of every resource, in registration order.
    pub fn host_names(&self) -> ManagerOutcome<Vec<String>> {
        self.started("host_names");

        let mut hosts = Vec::with_capacity(self.resources.len());
        let mut failures = Vec::new();
        for (name, resource) in &self.resources {
            match catch_unwind(AssertUnwindSafe(|| resource.host())) {
                Ok(Ok(host)) => hosts.push(host),
                Ok(Err(error)) => failures.push((
                    *name,
                    item_failure(
                        ManagerErrorKind::Local(Operation::HostNames),
                        *name,
                        Some(Cause::error(error)),
                    ),
                )),
                Err(payload) => failures.push((
                    *name,
                    item_failure(
                        ManagerErrorKind::Global(Operation::HostNames),
                        *name,
                        Some(Cause::panic(payload)),
                    ),
                )),
            }
        }

        let outcome = aggregate(Operation::HostNames, failures, "resource hosts listed", hosts);
        self.completed("host_names", outcome)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    /// Shared handle of the resource registered under `key`.
    ///
    /// Fails with `NotConnectedError` unless the manager is connected and the
    /// resource itself is connected, and with `UnregisteredError` if `key` was
    /// not registered on this manager with the same driver type.
    pub fn get_handle<D: Driver>(&self, key: ResourceKey<D>) -> ResourceOutcome<Arc<D::Handle>> {
        self.started("get_handle");
        let name = key.name();

        let outcome = if !self.is_connected() {
            Failure::build("resource manager not connected", ResourceErrorKind::NotConnected)
                .details(json!({ "name": name }))
                .into_outcome()
        } else {
            match self.typed_resource(key) {
                Some(resource) => resource.get_handle(),
                None => Failure::build("resource not registered", ResourceErrorKind::Unregistered)
                    .details(json!({ "name": name, "driver": core::any::type_name::<D>() }))
                    .into_outcome(),
            }
        };
        self.completed("get_handle", outcome)
    }

    /// Current connection state of every resource, in registration order.
    #[must_use]
    pub fn connection_status(&self) -> IndexMap<ResourceName, bool> {
        self.started("connection_status");
        self.status()
    }

    fn status(&self) -> IndexMap<ResourceName, bool> {
        self.resources
            .iter()
            .map(|(name, resource)| (*name, resource.is_connected()))
            .collect()
    }

    fn started(&self, method: &'static str) {
        self.hooks
            .notify(&CallEvent::started(Component::Manager, method));
    }

    fn completed<T, K: keel_outcome::ErrorKind>(
        &self,
        method: &'static str,
        outcome: Outcome<T, K>,
    ) -> Outcome<T, K> {
        self.hooks
            .notify(&CallEvent::completed(Component::Manager, method, &outcome));
        outcome
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Failure boundary
// ─────────────────────────────────────────────────────────────────────────────

/// Awaits `future`, turning a panic into a `<Operation>GlobalError`.
async fn isolate<F: Future>(
    operation: Operation,
    name: ResourceName,
    future: F,
) -> Result<F::Output, Failure<ManagerErrorKind>> {
    AssertUnwindSafe(future).catch_unwind().await.map_err(|payload| {
        tracing::error!(resource = %name, %operation, "resource panicked");
        item_failure(
            ManagerErrorKind::Global(operation),
            name,
            Some(Cause::panic(payload)),
        )
    })
}

/// Turns a failed resource outcome into a `<Operation>LocalError`.
#[track_caller]
fn localize<T>(
    operation: Operation,
    name: ResourceName,
    outcome: ResourceOutcome<T>,
) -> Result<T, Failure<ManagerErrorKind>> {
    match outcome.into_result() {
        Ok(data) => Ok(data),
        Err(failure) => Err(item_failure(
            ManagerErrorKind::Local(operation),
            name,
            Some(Cause::from(failure)),
        )),
    }
}

#[track_caller]
fn item_failure(
    kind: ManagerErrorKind,
    name: ResourceName,
    cause: Option<Cause>,
) -> Failure<ManagerErrorKind> {
    let message = match kind {
        ManagerErrorKind::Global(operation) => format!("{operation} panicked for {name}"),
        ManagerErrorKind::Local(Operation::Initialize) if cause.is_none() => {
            format!("{name} registered twice")
        }
        ManagerErrorKind::Local(operation) => format!("{operation} failed for {name}"),
        _ => format!("{name} failed"),
    };
    Failure::build(message, kind)
        .details(json!({ "name": name }))
        .causes(cause)
        .finish()
}

#[track_caller]
fn aggregate_failure(
    operation: Operation,
    failures: Vec<(ResourceName, Failure<ManagerErrorKind>)>,
) -> Failure<ManagerErrorKind> {
    let failed: Vec<_> = failures.iter().map(|(name, _)| *name).collect();
    let message = match operation {
        Operation::Initialize => "resource manager initialization failed",
        Operation::Connect => "resource connection failed",
        Operation::Disconnect => "resource disconnection failed",
        Operation::Migrate => "resource migration failed",
        Operation::Clear => "resource emptying failed",
        Operation::HostNames => "resource host listing failed",
    };
    Failure::build(message, ManagerErrorKind::aggregate(operation))
        .details(json!({ "failed": failed }))
        .causes(failures.into_iter().map(|(_, failure)| Cause::from(failure)))
        .finish()
}

#[track_caller]
fn aggregate<T>(
    operation: Operation,
    failures: Vec<(ResourceName, Failure<ManagerErrorKind>)>,
    message: &'static str,
    data: T,
) -> ManagerOutcome<T> {
    if failures.is_empty() {
        Outcome::success(message, data)
    } else {
        aggregate_failure(operation, failures).into_outcome()
    }
}
