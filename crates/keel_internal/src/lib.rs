//! # Keel Internal Library
//!
//! Re-exports the core Keel crates for convenience.

/// Layer 1: Structured outcomes and cause chains.
pub use keel_outcome;

/// Layer 2: Resource lifecycle and orchestration.
pub use keel_resource;

/// Layer 3: Configuration, tracing setup and application lifecycle.
pub use keel_core;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use keel_core::prelude::*;
    pub use keel_outcome::prelude::*;
    pub use keel_resource::prelude::*;
}
