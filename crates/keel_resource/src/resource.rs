//! The per-resource lifecycle state machine.
//!
//! A [`Resource`] starts `Disconnected`. `connect` moves it to `Connected`,
//! `disconnect` moves it back; `get_handle`, `migrate` and `clear` require it
//! to be connected. Transitions are serialized on an async mutex so exactly
//! one lifecycle operation runs at a time, while status reads stay
//! synchronous.

use core::any::Any;
use core::convert::Infallible;
use core::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use keel_outcome::{Cause, Failure, Outcome};
use parking_lot::RwLock;
use serde_json::json;

use crate::driver::{Driver, DriverError, MigrationReport};
use crate::error::ResourceErrorKind;
use crate::hooks::{CallEvent, Component, Hooks};
use crate::name::ResourceName;
use crate::settings::ResourceSettings;
use crate::timer::{PollStatus, poll_until};

/// Outcome of a resource operation.
pub type ResourceOutcome<T> = Outcome<T, ResourceErrorKind>;

enum State<H> {
    Disconnected,
    Connected(Arc<H>),
}

// ─────────────────────────────────────────────────────────────────────────────
// Resource
// ─────────────────────────────────────────────────────────────────────────────

/// One external dependency wrapped in a connect/disconnect state machine.
///
/// The handle is owned by the resource while connected. Callers receive
/// shared `Arc` clones from [`get_handle`](Self::get_handle) and must never
/// release the backend themselves.
pub struct Resource<D: Driver> {
    name: ResourceName,
    driver: D,
    settings: ResourceSettings,
    hooks: Arc<Hooks>,
    state: RwLock<State<D::Handle>>,
    transition: tokio::sync::Mutex<()>,
}

impl<D: Driver> fmt::Debug for Resource<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("connected", &self.is_connected())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<D: Driver> Resource<D> {
    /// Wraps `driver` in a disconnected resource.
    #[must_use]
    pub fn new(name: ResourceName, driver: D, settings: ResourceSettings, hooks: Arc<Hooks>) -> Self {
        Self {
            name,
            driver,
            settings,
            hooks,
            state: RwLock::new(State::Disconnected),
            transition: tokio::sync::Mutex::new(()),
        }
    }

    /// The resource name.
    #[must_use]
    pub fn name(&self) -> ResourceName {
        self.name
    }

    /// The wrapped driver.
    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The settings this resource was built with.
    #[must_use]
    pub fn settings(&self) -> &ResourceSettings {
        &self.settings
    }

    /// Returns `true` while a handle is held.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(*self.state.read(), State::Connected(_))
    }

    /// Opens the backend and stores its handle.
    ///
    /// Either the resource ends up connected, or it stays disconnected and
    /// no handle is kept.
    pub async fn connect(&self) -> ResourceOutcome<()> {
        self.started("connect");
        let _transition = self.transition.lock().await;

        if self.is_connected() {
            return self.completed(
                "connect",
                self.failure("resource already connected", ResourceErrorKind::AlreadyConnected),
            );
        }

        tracing::debug!(resource = %self.name, "connecting");
        let outcome = match self.driver.open().await {
            Ok(handle) => {
                *self.state.write() = State::Connected(Arc::new(handle));
                Outcome::success("resource connected", ())
            }
            Err(error) => self.driver_failure(
                "resource connection failed",
                ResourceErrorKind::Connection,
                error,
            ),
        };
        self.completed("connect", outcome)
    }

    /// Releases the handle and returns to `Disconnected`.
    ///
    /// Waits up to `release_grace` for outstanding handle clones to be
    /// dropped, then releases the backend through the driver whether or not
    /// borrowers remain. The state is always `Disconnected` afterwards, even
    /// when release fails.
    pub async fn disconnect(&self) -> ResourceOutcome<()> {
        self.started("disconnect");
        let _transition = self.transition.lock().await;

        let previous = core::mem::replace(&mut *self.state.write(), State::Disconnected);
        let State::Connected(handle) = previous else {
            return self.completed("disconnect", self.not_connected());
        };

        tracing::debug!(resource = %self.name, "disconnecting");
        let drained = poll_until(self.settings.release_poll, self.settings.release_grace, || {
            let sole_owner = Arc::strong_count(&handle) == 1;
            async move { Ok::<_, Infallible>(sole_owner) }
        })
        .await;

        let borrowers = Arc::strong_count(&handle) - 1;
        if borrowers > 0 {
            tracing::warn!(
                resource = %self.name,
                borrowers,
                attempts = drained.attempts(),
                "releasing handle that is still borrowed"
            );
        }

        let outcome = match self.driver.close(&handle).await {
            Ok(()) => Outcome::success("resource disconnected", ()),
            Err(error) => Failure::build(
                "resource disconnection failed",
                ResourceErrorKind::Disconnection,
            )
            .details(json!({
                "name": self.name,
                "host": self.driver.host().ok(),
                "borrowers": borrowers,
            }))
            .cause(Cause::error(error))
            .into_outcome(),
        };
        drop(handle);
        self.completed("disconnect", outcome)
    }

    /// Returns a shared reference to the connected handle.
    pub fn get_handle(&self) -> ResourceOutcome<Arc<D::Handle>> {
        self.started("get_handle");
        let handle = match &*self.state.read() {
            State::Connected(handle) => Some(Arc::clone(handle)),
            State::Disconnected => None,
        };
        let outcome = match handle {
            Some(handle) => Outcome::success("resource handle fetched", handle),
            None => self.not_connected(),
        };
        self.completed("get_handle", outcome)
    }

    /// Applies pending schema migrations.
    pub async fn migrate(&self) -> ResourceOutcome<MigrationReport> {
        self.started("migrate");
        let _transition = self.transition.lock().await;

        let Some(handle) = self.current_handle() else {
            return self.completed("migrate", self.not_connected());
        };

        let outcome = match self.driver.migrate(&handle).await {
            Ok(report) => {
                tracing::debug!(resource = %self.name, applied = ?report.applied, "migrated");
                Outcome::success("resource migrated", report)
            }
            Err(error) => {
                let step = match &error {
                    DriverError::Migration { step, .. } => Some(step.clone()),
                    _ => None,
                };
                tracing::error!(resource = %self.name, step = ?step, %error, "migration failed");
                Failure::build("resource migration failed", ResourceErrorKind::Migration)
                    .details(json!({ "name": self.name, "step": step }))
                    .cause(Cause::error(error))
                    .into_outcome()
            }
        };
        self.completed("migrate", outcome)
    }

    /// Removes all data from the backend.
    ///
    /// Refused with `EmptyingDisallowedError` unless the settings allow it,
    /// before the connection state is even looked at.
    pub async fn clear(&self) -> ResourceOutcome<()> {
        self.started("clear");
        if !self.settings.emptying_allowed {
            return self.completed(
                "clear",
                self.failure(
                    "resource emptying disallowed",
                    ResourceErrorKind::EmptyingDisallowed,
                ),
            );
        }

        let _transition = self.transition.lock().await;
        let Some(handle) = self.current_handle() else {
            return self.completed("clear", self.not_connected());
        };

        let outcome = match self.driver.empty(&handle).await {
            Ok(()) => Outcome::success("resource emptied", ()),
            Err(error) => {
                self.driver_failure("resource emptying failed", ResourceErrorKind::Emptying, error)
            }
        };
        self.completed("clear", outcome)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────

    fn current_handle(&self) -> Option<Arc<D::Handle>> {
        match &*self.state.read() {
            State::Connected(handle) => Some(Arc::clone(handle)),
            State::Disconnected => None,
        }
    }

    fn started(&self, method: &'static str) {
        self.hooks
            .notify(&CallEvent::started(Component::Resource(self.name), method));
    }

    fn completed<T>(&self, method: &'static str, outcome: ResourceOutcome<T>) -> ResourceOutcome<T> {
        self.hooks.notify(&CallEvent::completed(
            Component::Resource(self.name),
            method,
            &outcome,
        ));
        outcome
    }

    #[track_caller]
    fn failure<T>(&self, message: &'static str, kind: ResourceErrorKind) -> ResourceOutcome<T> {
        Failure::build(message, kind)
            .details(json!({ "name": self.name }))
            .into_outcome()
    }

    #[track_caller]
    fn not_connected<T>(&self) -> ResourceOutcome<T> {
        self.failure("resource not connected", ResourceErrorKind::NotConnected)
    }

    #[track_caller]
    fn driver_failure<T>(
        &self,
        message: &'static str,
        kind: ResourceErrorKind,
        error: DriverError,
    ) -> ResourceOutcome<T> {
        let host = self.driver.host().ok();
        Failure::build(message, kind)
            .details(json!({ "name": self.name, "host": host }))
            .cause(Cause::error(error))
            .into_outcome()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ManagedResource
// ─────────────────────────────────────────────────────────────────────────────

/// Object-safe view of a [`Resource`] of any driver, used by the manager.
#[async_trait]
pub trait ManagedResource: Send + Sync + 'static {
    /// The resource name.
    fn name(&self) -> ResourceName;

    /// Returns `true` while a handle is held.
    fn is_connected(&self) -> bool;

    /// Configured host of the backend.
    ///
    /// # Errors
    ///
    /// Propagates the driver's host accessor error.
    fn host(&self) -> Result<String, DriverError>;

    /// See [`Resource::connect`].
    async fn connect(&self) -> ResourceOutcome<()>;

    /// See [`Resource::disconnect`].
    async fn disconnect(&self) -> ResourceOutcome<()>;

    /// See [`Resource::migrate`]. Returns `None` for backends without
    /// migrations.
    async fn migrate(&self) -> Option<ResourceOutcome<MigrationReport>>;

    /// See [`Resource::clear`].
    async fn clear(&self) -> ResourceOutcome<()>;

    /// Upcast for typed handle lookup.
    fn as_any(&self) -> &dyn Any;
}

#[async_trait]
impl<D: Driver> ManagedResource for Resource<D> {
    fn name(&self) -> ResourceName {
        self.name
    }

    fn is_connected(&self) -> bool {
        Resource::is_connected(self)
    }

    fn host(&self) -> Result<String, DriverError> {
        self.driver.host()
    }

    async fn connect(&self) -> ResourceOutcome<()> {
        Resource::connect(self).await
    }

    async fn disconnect(&self) -> ResourceOutcome<()> {
        Resource::disconnect(self).await
    }

    async fn migrate(&self) -> Option<ResourceOutcome<MigrationReport>> {
        if !self.driver.supports_migration() {
            return None;
        }
        Some(Resource::migrate(self).await)
    }

    async fn clear(&self) -> ResourceOutcome<()> {
        Resource::clear(self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
