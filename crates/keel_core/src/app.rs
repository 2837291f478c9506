//! Application lifecycle.
//!
//! [`App`] pairs an [`AppConfig`] with a built [`ResourceManager`] and drives
//! it through start, close and reload. Each lifecycle call runs under its own
//! execution id unless the caller already set one, so every outcome produced
//! along the way can be correlated in the logs.

use core::future::Future;

use indexmap::IndexMap;
use keel_outcome::{
    ErrorKind, ErrorReport, ExecutionContext, Failure, FatalError, Outcome, Stage,
};
use keel_resource::{ResourceManager, ResourceName};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::AppConfig;

/// Outcome of an application lifecycle call.
pub type AppOutcome<T> = Outcome<T, AppErrorKind>;

/// Failures of the application lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppErrorKind {
    /// Connecting or migrating resources failed.
    Starting,
    /// Disconnecting resources failed.
    Closing,
    /// Closing or restarting during a reload failed.
    Reloading,
}

impl ErrorKind for AppErrorKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Starting => "AppStartingError",
            Self::Closing => "AppClosingError",
            Self::Reloading => "AppReloadingError",
        }
    }
}

/// Snapshot served by health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Application name.
    pub name: String,
    /// Deployment stage.
    pub stage: Stage,
    /// Whether the last `start` connected every resource.
    pub connected: bool,
    /// Connection state per resource, in registration order.
    pub resources: IndexMap<ResourceName, bool>,
}

/// A configured application and its resources.
#[derive(Debug)]
pub struct App {
    config: RwLock<AppConfig>,
    manager: ResourceManager,
}

impl App {
    /// Creates an application. Nothing is connected until [`start`](Self::start).
    #[must_use]
    pub fn new(config: AppConfig, manager: ResourceManager) -> Self {
        if config.resources != *manager.settings() {
            warn!(
                app = %config.name,
                "resource settings differ from the ones the manager was built with"
            );
        }
        Self {
            config: RwLock::new(config),
            manager,
        }
    }

    /// A copy of the current configuration.
    #[must_use]
    pub fn config(&self) -> AppConfig {
        self.config.read().clone()
    }

    /// The underlying resource manager.
    #[must_use]
    pub fn manager(&self) -> &ResourceManager {
        &self.manager
    }

    /// Connects every resource, then applies pending migrations.
    pub async fn start(&self) -> AppOutcome<()> {
        correlated(self.starting()).await
    }

    /// Disconnects every resource.
    pub async fn close(&self) -> AppOutcome<()> {
        correlated(self.closing()).await
    }

    /// Closes, swaps in `config`, then starts again.
    ///
    /// A failed close leaves the previous configuration in place and skips
    /// the restart.
    pub async fn reload(&self, config: AppConfig) -> AppOutcome<()> {
        correlated(async move {
            if let Outcome::Failure(failure) = self.closing().await {
                return reloading_failure("app reload failed while closing", failure, &config);
            }

            if config.resources != *self.manager.settings() {
                warn!(
                    app = %config.name,
                    "resource settings only apply to managers built after the reload"
                );
            }
            *self.config.write() = config.clone();

            match self.starting().await {
                Outcome::Success(_) => Outcome::success("app reloaded", ()),
                Outcome::Failure(failure) => {
                    reloading_failure("app reload failed while starting", failure, &config)
                }
            }
        })
        .await
    }

    /// Starts the application, turning a failure into a [`FatalError`].
    ///
    /// Meant for the top of `main`, where the only sensible reaction to a
    /// failed start is to exit.
    pub async fn start_or_abort(&self) -> Result<(), FatalError> {
        self.start().await.or_fatal()
    }

    /// Current health of the application.
    #[must_use]
    pub fn health(&self) -> HealthReport {
        let config = self.config.read();
        HealthReport {
            name: config.name.clone(),
            stage: config.stage,
            connected: self.manager.is_connected(),
            resources: self.manager.connection_status(),
        }
    }

    /// Client-facing report of `failure`, tiered by the configured stage.
    #[must_use]
    pub fn disclose<K: ErrorKind>(&self, failure: &Failure<K>) -> ErrorReport {
        failure.report(self.config.read().stage)
    }

    async fn starting(&self) -> AppOutcome<()> {
        let name = self.config.read().name.clone();
        info!(app = %name, resources = self.manager.names().len(), "starting");

        if let Outcome::Failure(failure) = self.manager.connect_all().await {
            return Failure::build("app start failed", AppErrorKind::Starting)
                .details(json!({ "app": name, "step": "connect" }))
                .cause(failure)
                .into_outcome();
        }

        match self.manager.migrate_all().await {
            Outcome::Success(success) => {
                for (resource, report) in success.data() {
                    debug!(%resource, applied = ?report.applied, "migrations applied");
                }
            }
            Outcome::Failure(failure) => {
                return Failure::build("app start failed", AppErrorKind::Starting)
                    .details(json!({ "app": name, "step": "migrate" }))
                    .cause(failure)
                    .into_outcome();
            }
        }

        Outcome::success("app started", ())
    }

    async fn closing(&self) -> AppOutcome<()> {
        let name = self.config.read().name.clone();
        info!(app = %name, "closing");

        match self.manager.disconnect_all().await {
            Outcome::Success(_) => Outcome::success("app closed", ()),
            Outcome::Failure(failure) => {
                Failure::build("app close failed", AppErrorKind::Closing)
                    .details(json!({ "app": name }))
                    .cause(failure)
                    .into_outcome()
            }
        }
    }
}

fn reloading_failure(
    message: &'static str,
    failure: Failure<AppErrorKind>,
    config: &AppConfig,
) -> AppOutcome<()> {
    Failure::build(message, AppErrorKind::Reloading)
        .details(json!({ "app": config.name, "stage": config.stage }))
        .cause(failure)
        .into_outcome()
}

async fn correlated<F: Future>(future: F) -> F::Output {
    match ExecutionContext::current() {
        Some(_) => future.await,
        None => ExecutionContext::scope(ExecutionContext::generate(), future).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_have_stable_names() {
        assert_eq!(AppErrorKind::Starting.name(), "AppStartingError");
        assert_eq!(AppErrorKind::Closing.name(), "AppClosingError");
        assert_eq!(AppErrorKind::Reloading.name(), "AppReloadingError");
    }

    #[tokio::test]
    async fn correlated_keeps_an_existing_execution_id() {
        let id = ExecutionContext::scope("outer", correlated(async {
            ExecutionContext::current()
        }))
        .await;
        assert_eq!(id.as_deref(), Some("outer"));
    }

    #[tokio::test]
    async fn correlated_opens_a_scope_when_none_exists() {
        let id = correlated(async { ExecutionContext::current() }).await;
        assert!(id.is_some());
    }
}
