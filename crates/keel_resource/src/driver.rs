//! Backend driver interface.
//!
//! A [`Driver`] knows how to open, release, migrate and empty one kind of
//! backend. It holds only immutable connection parameters; the state machine
//! around it lives in [`Resource`](crate::Resource).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors reported by driver hooks.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The backend could not be reached.
    #[error("{host} is unreachable: {reason}")]
    Unreachable {
        /// Host the driver tried to reach.
        host: String,
        /// Transport-level reason.
        reason: String,
    },

    /// The backend was reached but the handshake failed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Releasing the handle failed.
    #[error("release failed: {0}")]
    Release(String),

    /// A query against the backend failed.
    #[error("query failed: {0}")]
    Query(String),

    /// A migration step failed.
    #[error("migration step `{step}` failed: {reason}")]
    Migration {
        /// Name of the failing step.
        step: String,
        /// Why it failed.
        reason: String,
    },

    /// Any other driver failure.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Steps applied by a successful migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Names of the steps applied in this run, in order.
    pub applied: Vec<String>,
}

/// Lifecycle hooks for one backend type.
///
/// Implementations must be cheap to share: the resource calls the hooks
/// through `&self` and never clones the driver.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// Backend-specific connected object (pool, client, store).
    type Handle: Send + Sync + 'static;

    /// Configured host, for allow-lists and diagnostics.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured host cannot be rendered.
    fn host(&self) -> Result<String, DriverError>;

    /// Performs the handshake and returns the connected handle.
    async fn open(&self) -> Result<Self::Handle, DriverError>;

    /// Releases a handle previously returned by [`open`](Self::open).
    ///
    /// Called once per connection, possibly while callers still hold clones
    /// of the handle. The handle must be treated as closed afterwards.
    async fn close(&self, handle: &Self::Handle) -> Result<(), DriverError>;

    /// Whether this backend has schema migrations.
    fn supports_migration(&self) -> bool {
        false
    }

    /// Applies pending migrations.
    async fn migrate(&self, _handle: &Self::Handle) -> Result<MigrationReport, DriverError> {
        Ok(MigrationReport::default())
    }

    /// Removes all data from the backend.
    async fn empty(&self, handle: &Self::Handle) -> Result<(), DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_error_names_step() {
        let error = DriverError::Migration {
            step: "0002_users".to_owned(),
            reason: "duplicate column".to_owned(),
        };
        assert_eq!(
            error.to_string(),
            "migration step `0002_users` failed: duplicate column"
        );
    }
}
