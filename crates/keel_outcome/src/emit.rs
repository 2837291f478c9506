//! Observability emission performed once per constructed outcome.

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::kind::{ErrorKind, SUCCEED_NAME};
use crate::outcome::Failure;
use crate::record::Record;

/// Target of every outcome event.
pub const OUTCOME_TARGET: &str = "keel::outcome";

/// Runs an emission, swallowing any panic raised by the subscriber.
///
/// Constructing an outcome must never crash the caller.
fn observe(emission: impl FnOnce()) {
    let _ = catch_unwind(AssertUnwindSafe(emission));
}

pub(crate) fn success(record: &Record, data_type: &'static str) {
    observe(|| {
        tracing::info!(
            target: OUTCOME_TARGET,
            id = %record.id(),
            name = SUCCEED_NAME,
            origin = %record.origin(),
            execution_id = record.execution_id(),
            data_type,
            "Result> {}: {}",
            SUCCEED_NAME,
            record.message(),
        );
    });
}

pub(crate) fn failure<K: ErrorKind>(failure: &Failure<K>) {
    observe(|| {
        let record = failure.record();
        let mut kinds = failure.cause_kind_chain();
        kinds.reverse();
        tracing::warn!(
            target: OUTCOME_TARGET,
            id = %record.id(),
            name = failure.kind().name(),
            origin = %record.origin(),
            execution_id = record.execution_id(),
            kinds = %kinds.join(", "),
            "Error#{}> {} -> [{}]",
            failure.kind().name(),
            record.message(),
            kinds.join(", "),
        );
    });
}
