//! A service skeleton built around structured outcomes and a coordinated
//! resource lifecycle.
//!

pub use keel_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use keel_internal::prelude::*;
}
