//! Resource names and typed resource keys.

use core::fmt;
use core::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::driver::Driver;

/// Closed set of backends a [`ResourceManager`](crate::ResourceManager) can
/// coordinate. One tag per backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceName {
    /// PostgreSQL.
    Postgres,
    /// MySQL.
    Mysql,
    /// MongoDB.
    Mongo,
    /// Redis.
    Redis,
    /// DynamoDB.
    Dynamo,
    /// The in-process [`MemoryDriver`](crate::memory::MemoryDriver).
    Memory,
}

impl ResourceName {
    /// Every resource name, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Postgres,
        Self::Mysql,
        Self::Mongo,
        Self::Redis,
        Self::Dynamo,
        Self::Memory,
    ];

    /// Lowercase identifier of the backend.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::Mongo => "mongo",
            Self::Redis => "redis",
            Self::Dynamo => "dynamo",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource name paired with the driver type registered under it.
///
/// Keys are declared once as constants and used both to register a resource
/// and to fetch its handle, so the handle type is known at compile time.
///
/// # Example
///
/// ```
/// use keel_resource::memory::MemoryDriver;
/// use keel_resource::{ResourceKey, ResourceName};
///
/// const CACHE: ResourceKey<MemoryDriver> = ResourceKey::new(ResourceName::Memory);
///
/// assert_eq!(CACHE.name(), ResourceName::Memory);
/// ```
pub struct ResourceKey<D: Driver> {
    name: ResourceName,
    driver: PhantomData<fn() -> D>,
}

impl<D: Driver> ResourceKey<D> {
    /// Creates a key for `name`.
    #[must_use]
    pub const fn new(name: ResourceName) -> Self {
        Self {
            name,
            driver: PhantomData,
        }
    }

    /// The resource name.
    #[must_use]
    pub const fn name(&self) -> ResourceName {
        self.name
    }
}

impl<D: Driver> Clone for ResourceKey<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: Driver> Copy for ResourceKey<D> {}

impl<D: Driver> fmt::Debug for ResourceKey<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceKey")
            .field("name", &self.name)
            .field("driver", &core::any::type_name::<D>())
            .finish()
    }
}
