//! Call instrumentation for resources and the resource manager.
//!
//! Every public lifecycle operation of [`Resource`](crate::Resource) and
//! [`ResourceManager`](crate::ResourceManager) notifies a shared [`Hooks`]
//! registry twice: once when the call starts and once with the outcome it
//! returns. Observers are pure side-observation. They cannot change the
//! returned outcome, and a panicking observer is logged and skipped.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use keel_resource::hooks::{CallEvent, Hooks};
//!
//! let hooks = Hooks::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&seen);
//! hooks
//!     .register_observer("counter", move |_: &CallEvent| {
//!         counter.fetch_add(1, Ordering::Relaxed);
//!     })
//!     .expect("first registration");
//!
//! assert!(hooks.register_observer("counter", |_: &CallEvent| {}).is_err());
//! ```

use core::fmt;
use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};

use keel_outcome::{ErrorKind, Outcome};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::name::ResourceName;

/// Target of audit log events.
pub const AUDIT_TARGET: &str = "keel::audit";

// ─────────────────────────────────────────────────────────────────────────────
// CallEvent
// ─────────────────────────────────────────────────────────────────────────────

/// Component whose method was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// The resource manager.
    Manager,
    /// A single resource.
    Resource(ResourceName),
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manager => f.write_str("manager"),
            Self::Resource(name) => write!(f, "resource:{name}"),
        }
    }
}

/// Point in the call an event describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallPhase {
    /// The call is about to run.
    Started,
    /// The call returned an outcome.
    Completed {
        /// Whether the outcome succeeded.
        succeeded: bool,
        /// Outcome name (`Succeed` or the error kind name).
        name: &'static str,
        /// Outcome message.
        message: String,
        /// Outcome id.
        id: Uuid,
    },
}

/// One observed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEvent {
    /// Component whose method was called.
    pub component: Component,
    /// Method name.
    pub method: &'static str,
    /// Start or completion.
    pub phase: CallPhase,
}

impl CallEvent {
    /// Event emitted before a call runs.
    #[must_use]
    pub fn started(component: Component, method: &'static str) -> Self {
        Self {
            component,
            method,
            phase: CallPhase::Started,
        }
    }

    /// Event emitted after a call returned `outcome`.
    #[must_use]
    pub fn completed<T, K: ErrorKind>(
        component: Component,
        method: &'static str,
        outcome: &Outcome<T, K>,
    ) -> Self {
        Self {
            component,
            method,
            phase: CallPhase::Completed {
                succeeded: outcome.is_success(),
                name: outcome.name(),
                message: outcome.message().to_owned(),
                id: outcome.id(),
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Hooks
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during observer registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookRegistrationError {
    /// An observer with this name is already registered.
    #[error("observer '{0}' already registered")]
    DuplicateName(String),
}

type Observer = Box<dyn Fn(&CallEvent) + Send + Sync>;

struct ObserverEntry {
    name: String,
    observer: Observer,
}

/// Registry of call observers.
///
/// Registration takes a write lock; notification takes a read lock, so
/// concurrent calls notify in parallel.
#[derive(Default)]
pub struct Hooks {
    observers: RwLock<Vec<ObserverEntry>>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let observers = self.observers.read();
        f.debug_struct("Hooks")
            .field(
                "observers",
                &observers.iter().map(|entry| &entry.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Hooks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named observer.
    ///
    /// # Errors
    ///
    /// Returns [`HookRegistrationError::DuplicateName`] if an observer with
    /// the same name is already registered.
    pub fn register_observer<F>(
        &self,
        name: impl Into<String>,
        observer: F,
    ) -> Result<&Self, HookRegistrationError>
    where
        F: Fn(&CallEvent) + Send + Sync + 'static,
    {
        let name = name.into();
        let mut observers = self.observers.write();

        if observers.iter().any(|entry| entry.name == name) {
            return Err(HookRegistrationError::DuplicateName(name));
        }

        observers.push(ObserverEntry {
            name,
            observer: Box::new(observer),
        });
        Ok(self)
    }

    /// Invokes every observer, in registration order.
    pub fn notify(&self, event: &CallEvent) {
        let observers = self.observers.read();
        for entry in observers.iter() {
            let result = catch_unwind(AssertUnwindSafe(|| (entry.observer)(event)));
            if result.is_err() {
                tracing::error!(
                    observer = %entry.name,
                    component = %event.component,
                    method = event.method,
                    "call observer panicked"
                );
            }
        }
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Checks if an observer with the given name is registered.
    #[must_use]
    pub fn contains_observer(&self, name: &str) -> bool {
        self.observers.read().iter().any(|entry| entry.name == name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AuditLogger
// ─────────────────────────────────────────────────────────────────────────────

/// Observer that writes every call to the [`AUDIT_TARGET`] log target.
#[derive(Debug, Clone, Default)]
pub struct AuditLogger {
    skipped: HashSet<&'static str>,
}

impl AuditLogger {
    /// Name under which [`register`](Self::register) installs the logger.
    pub const NAME: &'static str = "audit";

    /// Creates a logger that records every method.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppresses the given methods (e.g. frequently polled status calls).
    #[must_use]
    pub fn skipping(mut self, methods: impl IntoIterator<Item = &'static str>) -> Self {
        self.skipped.extend(methods);
        self
    }

    /// Logs `event` unless its method is skipped.
    pub fn observe(&self, event: &CallEvent) {
        if self.skipped.contains(event.method) {
            return;
        }

        match &event.phase {
            CallPhase::Started => tracing::info!(
                target: AUDIT_TARGET,
                component = %event.component,
                method = event.method,
                "call started"
            ),
            CallPhase::Completed {
                succeeded: true,
                name,
                message,
                id,
            } => tracing::info!(
                target: AUDIT_TARGET,
                component = %event.component,
                method = event.method,
                outcome = name,
                %id,
                "call completed: {message}"
            ),
            CallPhase::Completed {
                succeeded: false,
                name,
                message,
                id,
            } => tracing::warn!(
                target: AUDIT_TARGET,
                component = %event.component,
                method = event.method,
                outcome = name,
                %id,
                "call failed: {message}"
            ),
        }
    }

    /// Registers this logger on `hooks` under [`AuditLogger::NAME`].
    ///
    /// # Errors
    ///
    /// Returns [`HookRegistrationError::DuplicateName`] if an audit logger is
    /// already registered.
    pub fn register(self, hooks: &Hooks) -> Result<(), HookRegistrationError> {
        hooks.register_observer(Self::NAME, move |event| self.observe(event))?;
        Ok(())
    }
}
