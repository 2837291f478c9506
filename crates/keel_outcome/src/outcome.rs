//! The [`Outcome`] sum type and its two halves, [`Success`] and [`Failure`].

use std::borrow::Cow;
use std::panic::Location;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::cause::Cause;
use crate::disclosure::{ErrorReport, Stage};
use crate::emit;
use crate::fatal::FatalError;
use crate::kind::{ErrorKind, SUCCEED_NAME};
use crate::normalize::{self, NormalizedOutcome, to_json_or_placeholder};
use crate::record::Record;

// ─────────────────────────────────────────────────────────────────────────────
// Outcome
// ─────────────────────────────────────────────────────────────────────────────

/// Result of an operation: either a [`Success`] carrying data, or a
/// [`Failure`] carrying a classification and an optional cause chain.
///
/// Constructing an outcome always emits one `tracing` event (info on success,
/// warn on failure) under the `keel::outcome` target.
///
/// Callers must branch before reading the payload. Data only exists on the
/// success side and the error kind only on the failure side:
///
/// ```compile_fail
/// use keel_outcome::{Outcome, ErrorKind};
/// # #[derive(Debug, Clone, Copy, PartialEq)]
/// # struct Never;
/// # impl ErrorKind for Never { fn name(&self) -> &'static str { "NeverError" } }
///
/// let outcome = Outcome::<u32, Never>::success("value computed", 3);
/// let value = outcome.data; // no such field: match first
/// ```
///
/// # Example
///
/// ```
/// use keel_outcome::{ErrorKind, Failure, Outcome};
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum ParseError {
///     Empty,
/// }
///
/// impl ErrorKind for ParseError {
///     fn name(&self) -> &'static str {
///         "ParseEmptyError"
///     }
/// }
///
/// fn parse(input: &str) -> Outcome<usize, ParseError> {
///     if input.is_empty() {
///         return Outcome::failure("parse input empty", ParseError::Empty);
///     }
///     Outcome::success("parse finished", input.len())
/// }
///
/// match parse("") {
///     Outcome::Success(success) => unreachable!("{}", success.data()),
///     Outcome::Failure(failure) => assert_eq!(failure.kind(), ParseError::Empty),
/// }
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub enum Outcome<T, K: ErrorKind> {
    /// The operation succeeded.
    Success(Success<T>),
    /// The operation failed.
    Failure(Failure<K>),
}

impl<T, K: ErrorKind> Outcome<T, K> {
    /// Constructs a successful outcome.
    #[track_caller]
    pub fn success(message: impl Into<Cow<'static, str>>, data: T) -> Self {
        let success = Success {
            record: Record::capture(message),
            data,
        };
        emit::success(&success.record, core::any::type_name::<T>());
        Self::Success(success)
    }

    /// Constructs a failed outcome without details or causes.
    ///
    /// Use [`Failure::build`] to attach either.
    #[track_caller]
    pub fn failure(message: impl Into<Cow<'static, str>>, kind: K) -> Self {
        Failure::build(message, kind).into_outcome()
    }

    /// Returns `true` if the operation succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns `true` if the operation failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Returns the success half, if any.
    #[must_use]
    pub fn success_ref(&self) -> Option<&Success<T>> {
        match self {
            Self::Success(success) => Some(success),
            Self::Failure(_) => None,
        }
    }

    /// Returns the failure half, if any.
    #[must_use]
    pub fn failure_ref(&self) -> Option<&Failure<K>> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }

    /// Returns the error kind on failure, `None` on success.
    #[must_use]
    pub fn kind(&self) -> Option<K> {
        self.failure_ref().map(Failure::kind)
    }

    /// Identity and provenance of this outcome.
    #[must_use]
    pub fn record(&self) -> &Record {
        match self {
            Self::Success(success) => &success.record,
            Self::Failure(failure) => &failure.record,
        }
    }

    /// Unique id of this outcome.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.record().id()
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        self.record().message()
    }

    /// `Succeed` on success, the kind's name on failure.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Success(_) => SUCCEED_NAME,
            Self::Failure(failure) => failure.kind.name(),
        }
    }

    /// Source location that constructed this outcome.
    #[must_use]
    pub fn origin(&self) -> &'static Location<'static> {
        self.record().origin()
    }

    /// Execution id that was ambient at construction, if any.
    #[must_use]
    pub fn execution_id(&self) -> Option<&str> {
        self.record().execution_id()
    }

    /// This outcome followed by every ancestor cause, nearest first.
    #[must_use]
    pub fn cause_chain(&self) -> Vec<ChainLink<'_>> {
        match self {
            Self::Success(success) => vec![ChainLink::Current {
                name: SUCCEED_NAME,
                record: &success.record,
            }],
            Self::Failure(failure) => failure.cause_chain(),
        }
    }

    /// Kind names of every entry in [`cause_chain`](Self::cause_chain).
    #[must_use]
    pub fn cause_kind_chain(&self) -> Vec<String> {
        match self {
            Self::Success(_) => vec![SUCCEED_NAME.to_owned()],
            Self::Failure(failure) => failure.cause_kind_chain(),
        }
    }

    /// Converts into a standard `Result`.
    ///
    /// # Errors
    ///
    /// Returns the [`Failure`] half when the operation failed.
    pub fn into_result(self) -> Result<T, Failure<K>> {
        match self {
            Self::Success(success) => Ok(success.data),
            Self::Failure(failure) => Err(failure),
        }
    }

    /// Transforms the success data, keeping the original record.
    ///
    /// No new observability event is emitted: the transformed outcome is the
    /// same outcome seen through a different data type.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U, K> {
        match self {
            Self::Success(Success { record, data }) => Outcome::Success(Success {
                record,
                data: f(data),
            }),
            Self::Failure(failure) => Outcome::Failure(failure),
        }
    }

    /// Unwraps the data at a fatal boundary.
    ///
    /// Use only where a failure must stop the program (e.g. startup).
    ///
    /// # Errors
    ///
    /// Returns the failure converted by [`Failure::into_fatal`].
    pub fn or_fatal(self) -> Result<T, FatalError> {
        self.into_result().map_err(Failure::into_fatal)
    }
}

impl<T: Serialize, K: ErrorKind> Outcome<T, K> {
    /// Materializes this outcome into a serialization-safe structure.
    #[must_use]
    pub fn normalize(&self) -> NormalizedOutcome {
        match self {
            Self::Success(success) => normalize::success(&success.record, &success.data),
            Self::Failure(failure) => failure.normalize(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Success
// ─────────────────────────────────────────────────────────────────────────────

/// The success half of an [`Outcome`].
#[derive(Debug, Clone)]
pub struct Success<T> {
    record: Record,
    data: T,
}

impl<T> Success<T> {
    /// The produced data.
    #[must_use]
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Consumes the success and returns its data.
    #[must_use]
    pub fn into_data(self) -> T {
        self.data
    }

    /// Identity and provenance of this outcome.
    #[must_use]
    pub fn record(&self) -> &Record {
        &self.record
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Failure
// ─────────────────────────────────────────────────────────────────────────────

/// The failure half of an [`Outcome`].
///
/// A failure may cite any number of causes. The first is the primary cause;
/// later ones are siblings (e.g. the other resources that failed during the
/// same aggregate operation). The flattened ancestor list is computed once
/// at construction.
#[derive(Debug, Clone)]
pub struct Failure<K: ErrorKind> {
    record: Record,
    kind: K,
    details: Value,
    causes: Vec<Cause>,
    ancestors: Vec<Cause>,
}

impl<K: ErrorKind> Failure<K> {
    /// Starts building a failure.
    ///
    /// The origin location is captured here, at the caller.
    #[track_caller]
    pub fn build(message: impl Into<Cow<'static, str>>, kind: K) -> FailureBuilder<K> {
        FailureBuilder {
            record: Record::capture(message),
            kind,
            details: Value::Object(serde_json::Map::new()),
            causes: Vec::new(),
        }
    }

    /// Error classification.
    #[must_use]
    pub fn kind(&self) -> K {
        self.kind
    }

    /// Identity and provenance of this outcome.
    #[must_use]
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        self.record.message()
    }

    /// Failure-side context data (an empty object when none was attached).
    #[must_use]
    pub fn details(&self) -> &Value {
        &self.details
    }

    /// Primary cause, or `None` if this failure is the root cause.
    #[must_use]
    pub fn cause(&self) -> Option<&Cause> {
        self.causes.first()
    }

    /// All direct causes, primary first.
    #[must_use]
    pub fn causes(&self) -> &[Cause] {
        &self.causes
    }

    /// Every ancestor cause, flattened nearest first.
    #[must_use]
    pub fn ancestors(&self) -> &[Cause] {
        &self.ancestors
    }

    /// This failure followed by every ancestor cause, nearest first.
    #[must_use]
    pub fn cause_chain(&self) -> Vec<ChainLink<'_>> {
        core::iter::once(ChainLink::Current {
            name: self.kind.name(),
            record: &self.record,
        })
        .chain(self.ancestors.iter().map(ChainLink::Cause))
        .collect()
    }

    /// Kind names of every entry in [`cause_chain`](Self::cause_chain).
    #[must_use]
    pub fn cause_kind_chain(&self) -> Vec<String> {
        self.cause_chain()
            .iter()
            .map(|link| link.name().to_owned())
            .collect()
    }

    /// Materializes this failure into a serialization-safe structure.
    #[must_use]
    pub fn normalize(&self) -> NormalizedOutcome {
        normalize::failure(self)
    }

    /// Builds the client-facing error report for `stage`.
    #[must_use]
    pub fn report(&self, stage: Stage) -> ErrorReport {
        self.normalize().disclose(stage)
    }

    /// Converts into a value suitable for interrupting control flow.
    #[must_use]
    pub fn into_fatal(self) -> FatalError {
        FatalError::from_normalized(self.normalize())
    }

    /// Wraps this failure in an [`Outcome`] of any success type.
    pub fn into_outcome<T>(self) -> Outcome<T, K> {
        Outcome::Failure(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FailureBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder returned by [`Failure::build`].
///
/// The failure is emitted once, when [`finish`](Self::finish) (or
/// [`into_outcome`](Self::into_outcome)) is called.
#[must_use = "a failure is only constructed and emitted by `finish` or `into_outcome`"]
#[derive(Debug)]
pub struct FailureBuilder<K: ErrorKind> {
    record: Record,
    kind: K,
    details: Value,
    causes: Vec<Cause>,
}

impl<K: ErrorKind> FailureBuilder<K> {
    /// Attaches failure-side context data.
    pub fn details<V: Serialize>(mut self, details: V) -> Self {
        self.details = to_json_or_placeholder(&details);
        self
    }

    /// Cites a cause. The first cited cause is the primary one.
    pub fn cause(mut self, cause: impl Into<Cause>) -> Self {
        self.causes.push(cause.into());
        self
    }

    /// Cites every cause in `causes`, in order.
    pub fn causes(mut self, causes: impl IntoIterator<Item = Cause>) -> Self {
        self.causes.extend(causes);
        self
    }

    /// Finishes construction, flattening the cause chain and emitting the
    /// observability event.
    pub fn finish(self) -> Failure<K> {
        let mut ancestors = Vec::new();
        for cause in &self.causes {
            ancestors.push(cause.clone());
            ancestors.extend(cause.ancestors().iter().cloned());
        }

        let failure = Failure {
            record: self.record,
            kind: self.kind,
            details: self.details,
            causes: self.causes,
            ancestors,
        };
        emit::failure(&failure);
        failure
    }

    /// Finishes construction and wraps the failure in an [`Outcome`].
    pub fn into_outcome<T>(self) -> Outcome<T, K> {
        Outcome::Failure(self.finish())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ChainLink
// ─────────────────────────────────────────────────────────────────────────────

/// One entry of a flattened cause chain.
#[derive(Debug, Clone, Copy)]
pub enum ChainLink<'a> {
    /// The outcome the chain was requested from (always index 0).
    Current {
        /// Kind name, or `Succeed`.
        name: &'static str,
        /// Identity and provenance.
        record: &'a Record,
    },
    /// An ancestor cause.
    Cause(&'a Cause),
}

impl ChainLink<'_> {
    /// Kind name of this entry.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Current { name, .. } => name,
            Self::Cause(cause) => cause.name(),
        }
    }

    /// Message of this entry.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Current { record, .. } => record.message().to_owned(),
            Self::Cause(cause) => cause.message(),
        }
    }
}
