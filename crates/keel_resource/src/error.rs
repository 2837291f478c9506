//! Error kinds reported by resources and the resource manager.

use core::fmt;

use keel_outcome::ErrorKind;

/// Failures of a single resource's lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceErrorKind {
    /// `connect` called while connected.
    AlreadyConnected,
    /// Operation requires a connected resource.
    NotConnected,
    /// The handshake failed.
    Connection,
    /// Releasing the handle failed.
    Disconnection,
    /// A migration step failed.
    Migration,
    /// `clear` is disabled by configuration.
    EmptyingDisallowed,
    /// Removing data failed.
    Emptying,
    /// The requested resource is not registered.
    Unregistered,
}

impl ErrorKind for ResourceErrorKind {
    fn name(&self) -> &'static str {
        match self {
            Self::AlreadyConnected => "AlreadyConnectedError",
            Self::NotConnected => "NotConnectedError",
            Self::Connection => "ConnectionError",
            Self::Disconnection => "DisconnectionError",
            Self::Migration => "MigrationError",
            Self::EmptyingDisallowed => "EmptyingDisallowedError",
            Self::Emptying => "EmptyingError",
            Self::Unregistered => "UnregisteredError",
        }
    }
}

/// Aggregate operations of the resource manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Building the manager.
    Initialize,
    /// `connect_all`.
    Connect,
    /// `disconnect_all`.
    Disconnect,
    /// `migrate_all`.
    Migrate,
    /// `clear_all`.
    Clear,
    /// `host_names`.
    HostNames,
}

impl Operation {
    /// Method name of the operation on a single resource.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Migrate => "migrate",
            Self::Clear => "clear",
            Self::HostNames => "host",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures of the resource manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerErrorKind {
    /// Building the manager failed.
    Initialization,
    /// `connect_all` failed for at least one resource.
    Connection,
    /// `disconnect_all` failed for at least one resource.
    Disconnection,
    /// `migrate_all` failed for at least one resource.
    Migration,
    /// `clear_all` failed for at least one resource.
    Emptying,
    /// `host_names` failed for at least one resource.
    HostNames,
    /// A resource reported a failure during an aggregate operation.
    Local(Operation),
    /// A resource panicked during an aggregate operation.
    Global(Operation),
}

impl ManagerErrorKind {
    /// The aggregate kind reported by `operation`.
    #[must_use]
    pub const fn aggregate(operation: Operation) -> Self {
        match operation {
            Operation::Initialize => Self::Initialization,
            Operation::Connect => Self::Connection,
            Operation::Disconnect => Self::Disconnection,
            Operation::Migrate => Self::Migration,
            Operation::Clear => Self::Emptying,
            Operation::HostNames => Self::HostNames,
        }
    }
}

impl ErrorKind for ManagerErrorKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Initialization => "ManagerInitializationError",
            Self::Connection => "ManagerConnectionError",
            Self::Disconnection => "ManagerDisconnectionError",
            Self::Migration => "ManagerMigrationError",
            Self::Emptying => "ManagerEmptyingError",
            Self::HostNames => "ManagerHostNamesError",
            Self::Local(operation) => match operation {
                Operation::Initialize => "InitializeLocalError",
                Operation::Connect => "ConnectLocalError",
                Operation::Disconnect => "DisconnectLocalError",
                Operation::Migrate => "MigrateLocalError",
                Operation::Clear => "ClearLocalError",
                Operation::HostNames => "HostNamesLocalError",
            },
            Self::Global(operation) => match operation {
                Operation::Initialize => "InitializeGlobalError",
                Operation::Connect => "ConnectGlobalError",
                Operation::Disconnect => "DisconnectGlobalError",
                Operation::Migrate => "MigrateGlobalError",
                Operation::Clear => "ClearGlobalError",
                Operation::HostNames => "HostNamesGlobalError",
            },
        }
    }
}
