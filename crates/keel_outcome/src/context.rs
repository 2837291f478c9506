//! Ambient execution context picked up by outcomes at construction time.
//!
//! A request handler (or any other unit of work) wraps its future in
//! [`ExecutionContext::scope`]. Every [`Outcome`](crate::Outcome) constructed
//! inside that future records the scope's id, which lets logs and error
//! reports be correlated per request without threading the id through every
//! call.
//!
//! # Example
//!
//! ```
//! use keel_outcome::{ExecutionContext, Outcome, ErrorKind};
//! # #[derive(Debug, Clone, Copy, PartialEq)]
//! # struct Never;
//! # impl ErrorKind for Never { fn name(&self) -> &'static str { "NeverError" } }
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let outcome = ExecutionContext::scope("req-42", async {
//!     Outcome::<u32, Never>::success("request handled", 7)
//! })
//! .await;
//!
//! assert_eq!(outcome.execution_id(), Some("req-42"));
//! # });
//! ```

use core::future::Future;
use uuid::Uuid;

tokio::task_local! {
    static EXECUTION_ID: String;
}

/// Accessor for the task-local execution id.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionContext;

impl ExecutionContext {
    /// Runs `future` with `id` as the ambient execution id.
    pub async fn scope<F>(id: impl Into<String>, future: F) -> F::Output
    where
        F: Future,
    {
        EXECUTION_ID.scope(id.into(), future).await
    }

    /// Runs the synchronous closure `f` with `id` as the ambient execution id.
    pub fn sync_scope<R>(id: impl Into<String>, f: impl FnOnce() -> R) -> R {
        EXECUTION_ID.sync_scope(id.into(), f)
    }

    /// Returns the ambient execution id, or `None` outside of any scope.
    #[must_use]
    pub fn current() -> Option<String> {
        EXECUTION_ID.try_with(Clone::clone).ok()
    }

    /// Generates a fresh execution id.
    #[must_use]
    pub fn generate() -> String {
        Uuid::new_v4().to_string()
    }
}
