//! Metadata shared by every outcome, successful or not.

use std::borrow::Cow;
use std::panic::Location;

use uuid::Uuid;

use crate::context::ExecutionContext;

/// Identity and provenance captured when an outcome is constructed.
///
/// A `Record` is immutable: it is created once by the outcome constructors
/// and only ever read afterwards.
#[derive(Debug, Clone)]
pub struct Record {
    id: Uuid,
    message: Cow<'static, str>,
    origin: &'static Location<'static>,
    execution_id: Option<String>,
}

impl Record {
    /// Captures a new record for the caller's location.
    #[track_caller]
    pub(crate) fn capture(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
            origin: Location::caller(),
            execution_id: ExecutionContext::current(),
        }
    }

    /// Unique id of the outcome.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Source location that constructed the outcome.
    #[must_use]
    pub fn origin(&self) -> &'static Location<'static> {
        self.origin
    }

    /// Execution id that was ambient at construction, if any.
    #[must_use]
    pub fn execution_id(&self) -> Option<&str> {
        self.execution_id.as_deref()
    }
}
