//! Causes cited by failed outcomes.
//!
//! A [`Cause`] is a shared, read-only reference to whatever produced a
//! failure: another failed outcome, a native Rust error, a caught panic, or
//! an arbitrary serializable value. Cloning a cause never copies the thing it
//! points at, so the same error may be cited by several outcomes.

use core::any::Any;
use core::fmt;
use std::error::Error;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::kind::{ErrorKind, MISSING_ERROR_KIND, short_type_name};
use crate::normalize::to_json_or_placeholder;
use crate::outcome::Failure;
use crate::record::Record;

// ─────────────────────────────────────────────────────────────────────────────
// FailureView
// ─────────────────────────────────────────────────────────────────────────────

mod sealed {
    pub trait Sealed {}
}

impl<K: ErrorKind> sealed::Sealed for Failure<K> {}

/// Type-erased, read-only view of a [`Failure`].
///
/// Failures of any [`ErrorKind`] can be cited as causes of failures of any
/// other kind. This trait is what the citing outcome sees. It is sealed:
/// only [`Failure`] implements it.
pub trait FailureView: fmt::Debug + Send + Sync + sealed::Sealed {
    /// Identity and provenance of the failure.
    fn record(&self) -> &Record;

    /// Name of the failure's kind.
    fn name(&self) -> &'static str;

    /// Failure-side context data.
    fn details(&self) -> &Value;

    /// Direct causes, primary first.
    fn causes(&self) -> &[Cause];

    /// Every ancestor cause, flattened nearest first.
    fn ancestors(&self) -> &[Cause];

    /// Kind names of this failure followed by every ancestor.
    fn cause_kind_chain(&self) -> Vec<String> {
        core::iter::once(self.name().to_owned())
            .chain(self.ancestors().iter().map(|cause| cause.name().to_owned()))
            .collect()
    }
}

impl<K: ErrorKind> FailureView for Failure<K> {
    fn record(&self) -> &Record {
        Failure::record(self)
    }

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn details(&self) -> &Value {
        Failure::details(self)
    }

    fn causes(&self) -> &[Cause] {
        Failure::causes(self)
    }

    fn ancestors(&self) -> &[Cause] {
        Failure::ancestors(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ErrorCause
// ─────────────────────────────────────────────────────────────────────────────

/// A native Rust error cited as a cause.
#[derive(Clone)]
pub struct ErrorCause {
    type_name: &'static str,
    error: Arc<dyn Error + Send + Sync>,
}

impl ErrorCause {
    /// Short type name of the error (e.g. `Error` for `std::io::Error`).
    #[must_use]
    pub fn name(&self) -> &'static str {
        short_type_name(self.type_name)
    }

    /// Fully qualified type name of the error.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The underlying error.
    #[must_use]
    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.error
    }

    /// Renders the error's `source()` chain, one cause per line.
    ///
    /// Returns `None` when the error has no source.
    #[must_use]
    pub fn render_sources(&self) -> Option<String> {
        let mut lines = Vec::new();
        let mut current = self.error.source();
        while let Some(source) = current {
            lines.push(format!("caused by: {source}"));
            current = source.source();
        }
        (!lines.is_empty()).then(|| lines.join("\n"))
    }
}

impl fmt::Debug for ErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorCause")
            .field("type_name", &self.type_name)
            .field("error", &self.error.to_string())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cause
// ─────────────────────────────────────────────────────────────────────────────

/// Whatever produced a failed outcome.
#[derive(Clone)]
pub enum Cause {
    /// Another failed outcome.
    Outcome(Arc<dyn FailureView>),
    /// A native Rust error.
    Error(ErrorCause),
    /// A panic caught at an isolation boundary, with its rendered payload.
    Panic(Arc<str>),
    /// An arbitrary value treated as an opaque cause.
    Value(Arc<Value>),
}

impl Cause {
    /// Cites a native error.
    pub fn error<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::Error(ErrorCause {
            type_name: core::any::type_name::<E>(),
            error: Arc::new(error),
        })
    }

    /// Cites a caught panic payload.
    ///
    /// String payloads (the common case for `panic!`) are kept verbatim;
    /// anything else is recorded as an opaque panic.
    #[must_use]
    pub fn panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_owned()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "panic with a non-string payload".to_owned()
        };
        Self::Panic(message.into())
    }

    /// Cites an arbitrary value.
    ///
    /// Values that cannot be represented as JSON are replaced by a string
    /// placeholder naming their type.
    pub fn value<V: Serialize>(value: &V) -> Self {
        Self::Value(Arc::new(to_json_or_placeholder(value)))
    }

    /// Kind name of this cause, as it appears in cause kind chains.
    ///
    /// Opaque values report their `name` field when they are objects that
    /// carry one, and [`MISSING_ERROR_KIND`] otherwise.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Outcome(view) => view.name(),
            Self::Error(error) => error.name(),
            Self::Panic(_) => "Panic",
            Self::Value(value) => value
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(MISSING_ERROR_KIND),
        }
    }

    /// Human-readable message of this cause.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Outcome(view) => view.record().message().to_owned(),
            Self::Error(error) => error.error().to_string(),
            Self::Panic(message) => message.to_string(),
            Self::Value(value) => value.to_string(),
        }
    }

    /// Returns the cited failure, if this cause is one.
    #[must_use]
    pub fn as_failure(&self) -> Option<&dyn FailureView> {
        match self {
            Self::Outcome(view) => Some(view.as_ref()),
            _ => None,
        }
    }

    /// Ancestors reachable through this cause, excluding the cause itself.
    pub(crate) fn ancestors(&self) -> &[Cause] {
        match self {
            Self::Outcome(view) => view.ancestors(),
            _ => &[],
        }
    }
}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Outcome(view) => f
                .debug_tuple("Outcome")
                .field(&view.name())
                .field(&view.record().id())
                .finish(),
            Self::Error(error) => f.debug_tuple("Error").field(error).finish(),
            Self::Panic(message) => f.debug_tuple("Panic").field(message).finish(),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

impl<K: ErrorKind> From<Failure<K>> for Cause {
    fn from(failure: Failure<K>) -> Self {
        Self::Outcome(Arc::new(failure))
    }
}

impl From<Arc<dyn FailureView>> for Cause {
    fn from(view: Arc<dyn FailureView>) -> Self {
        Self::Outcome(view)
    }
}
