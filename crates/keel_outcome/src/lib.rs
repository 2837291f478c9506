//! Structured outcomes for every fallible operation in Keel.
//!
//! `keel_outcome` provides the result model the rest of the workspace is
//! built on. Every operation returns an [`Outcome`], which is either a
//! [`Success`] carrying typed data or a [`Failure`] carrying an [`ErrorKind`]
//! and an optional chain of [`Cause`]s.
//!
//! # Core Concepts
//!
//! - [`Outcome`] - Sum type of [`Success`] and [`Failure`]
//! - [`ErrorKind`] - Per-operation classification of failures
//! - [`Cause`] - Shared reference to whatever produced a failure
//! - [`NormalizedOutcome`] - Serialization-safe materialization of an outcome
//! - [`ErrorReport`] - Stage-tiered client view of a failure
//! - [`FatalError`] - Value propagated through `Err` at fatal boundaries
//! - [`ExecutionContext`] - Ambient per-request correlation id
//!
//! # Example
//!
//! ```
//! use keel_outcome::{Cause, ErrorKind, Failure, Outcome};
//!
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! enum FetchError {
//!     Read,
//! }
//!
//! impl ErrorKind for FetchError {
//!     fn name(&self) -> &'static str {
//!         "FetchReadError"
//!     }
//! }
//!
//! fn fetch(path: &str) -> Outcome<String, FetchError> {
//!     match std::fs::read_to_string(path) {
//!         Ok(contents) => Outcome::success("fetch finished", contents),
//!         Err(error) => Failure::build("fetch read failed", FetchError::Read)
//!             .details(serde_json::json!({ "path": path }))
//!             .cause(Cause::error(error))
//!             .into_outcome(),
//!     }
//! }
//!
//! let outcome = fetch("/definitely/not/here");
//! assert_eq!(outcome.cause_kind_chain(), ["FetchReadError", "Error"]);
//! ```
//!
//! # Observability
//!
//! Constructing an outcome emits exactly one `tracing` event under the
//! [`OUTCOME_TARGET`] target. Panics raised by subscribers are swallowed.

/// Causes cited by failures.
pub mod cause;

/// Ambient execution context.
pub mod context;

/// Stage-tiered error disclosure.
pub mod disclosure;

mod emit;

/// Fatal boundary error value.
pub mod fatal;

/// Error kind trait and well-known names.
pub mod kind;

/// Serialization-safe outcome view.
pub mod normalize;

/// The outcome type.
pub mod outcome;

/// Outcome identity and provenance.
pub mod record;

pub use cause::{Cause, ErrorCause, FailureView};
pub use context::ExecutionContext;
pub use disclosure::{Disclosure, ErrorReport, ParseStageError, ReportList, Stage};
pub use emit::OUTCOME_TARGET;
pub use fatal::FatalError;
pub use kind::{ErrorKind, MISSING_ERROR_KIND, SUCCEED_NAME};
pub use normalize::{NormalizedCause, NormalizedOutcome};
pub use outcome::{ChainLink, Failure, FailureBuilder, Outcome, Success};
pub use record::Record;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::cause::Cause;
    pub use crate::context::ExecutionContext;
    pub use crate::disclosure::{ErrorReport, Stage};
    pub use crate::fatal::FatalError;
    pub use crate::kind::ErrorKind;
    pub use crate::normalize::NormalizedOutcome;
    pub use crate::outcome::{Failure, Outcome, Success};
}
