//! The value raised at fatal boundaries.

use uuid::Uuid;

use crate::normalize::{NormalizedCause, NormalizedOutcome};

/// A failure converted for propagation through `Err` at a boundary that must
/// stop the program, such as `main` or application startup.
///
/// Ordinary error signaling stays in [`Outcome`](crate::Outcome) values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{name}: {message} -> [{}]", .kinds.join(", "))]
pub struct FatalError {
    /// Kind name of the failure.
    pub name: String,
    /// Failure message.
    pub message: String,
    /// Id of the failed outcome.
    pub id: Uuid,
    /// Construction site of the failed outcome.
    pub origin: Option<String>,
    /// Kind chain of the failure, nearest first.
    pub kinds: Vec<String>,
    /// Normalized cause chain.
    pub chain: Vec<NormalizedCause>,
}

impl FatalError {
    /// Builds a fatal error from a normalized failure.
    #[must_use]
    pub fn from_normalized(normalized: NormalizedOutcome) -> Self {
        Self {
            name: normalized.name,
            message: normalized.message,
            id: normalized.id,
            origin: normalized.origin,
            kinds: normalized.cause_kind_chain,
            chain: normalized.cause_chain,
        }
    }
}
