//! Integration tests for outcome construction, cause chains, normalization
//! and disclosure.


use keel_outcome::{
    Cause, ChainLink, ExecutionContext, Failure, NormalizedCause, NormalizedOutcome,
    OUTCOME_TARGET, Outcome, ReportList, SUCCEED_NAME, Stage,
};
use serde_json::json;
use test_utils::{PanickingLayer, RequestError, SocketClosed, StoreError, capture};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::Registry;

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTRUCTION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn success_has_no_kind_and_single_chain_entry() {
    let outcome = Outcome::<u32, StoreError>::success("store read finished", 12);

    assert!(outcome.is_success());
    assert_eq!(outcome.kind(), None);
    assert_eq!(outcome.name(), SUCCEED_NAME);
    assert_eq!(outcome.message(), "store read finished");
    assert_eq!(outcome.cause_kind_chain(), [SUCCEED_NAME]);
    assert!(matches!(outcome.cause_chain()[0], ChainLink::Current { .. }));
    assert_eq!(outcome.into_result().ok(), Some(12));
}

#[test]
fn failure_without_cause_is_its_own_root() {
    let outcome = Outcome::<u32, StoreError>::failure("store write failed", StoreError::Write);

    let failure = outcome.failure_ref().expect("failure");
    assert_eq!(failure.kind(), StoreError::Write);
    assert!(failure.cause().is_none());
    assert_eq!(failure.details(), &json!({}));
    assert_eq!(outcome.cause_kind_chain(), ["StoreWriteError"]);
}

#[test]
fn origin_points_at_the_constructing_call() {
    let outcome = Outcome::<(), StoreError>::failure("store locked", StoreError::Locked);
    let line = line!() - 1;

    assert!(outcome.origin().file().ends_with("tests/outcome.rs"));
    assert_eq!(outcome.origin().line(), line);
}

#[test]
fn ids_are_unique_per_instance() {
    let first = Outcome::<(), StoreError>::success("store read finished", ());
    let second = Outcome::<(), StoreError>::success("store read finished", ());
    assert_ne!(first.id(), second.id());
}

#[test]
fn map_keeps_record() {
    let outcome = Outcome::<u32, StoreError>::success("store read finished", 2);
    let id = outcome.id();

    let (mapped, events) = capture(|| outcome.map(|value| value * 10));

    assert_eq!(mapped.id(), id);
    assert_eq!(mapped.into_result().ok(), Some(20));
    assert!(events.events_for(OUTCOME_TARGET).is_empty());
}

#[tokio::test]
async fn execution_id_is_picked_up_from_scope() {
    let outcome = ExecutionContext::scope("req-7", async {
        Outcome::<(), StoreError>::failure("store read failed", StoreError::Read)
    })
    .await;

    assert_eq!(outcome.execution_id(), Some("req-7"));
    assert_eq!(outcome.normalize().execution_id.as_deref(), Some("req-7"));
}

// ═══════════════════════════════════════════════════════════════════════════════
// EMISSION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn success_emits_one_info_event() {
    let (_, events) = capture(|| Outcome::<u8, StoreError>::success("store read finished", 1));

    let emitted = events.events_for(OUTCOME_TARGET);
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].level, Level::INFO);
    assert_eq!(emitted[0].field("name"), Some(SUCCEED_NAME));
    assert!(emitted[0].message.contains("store read finished"));
}

#[test]
fn failure_emits_one_warn_event_with_root_first_kinds() {
    let (_, events) = capture(|| {
        let read = Failure::build("store read failed", StoreError::Read).finish();
        Failure::build("request failed", RequestError::Handler)
            .cause(read)
            .into_outcome::<()>()
    });

    let emitted = events.events_for(OUTCOME_TARGET);
    assert_eq!(emitted.len(), 2);
    assert!(emitted.iter().all(|event| event.level == Level::WARN));
    assert_eq!(
        emitted[1].field("kinds"),
        Some("StoreReadError, RequestHandlerError")
    );
}

#[test]
fn panicking_subscriber_does_not_break_construction() {
    let subscriber = Registry::default().with(PanickingLayer);
    let outcome = tracing::subscriber::with_default(subscriber, || {
        Outcome::<u8, StoreError>::failure("store write failed", StoreError::Write)
    });

    assert_eq!(outcome.kind(), Some(StoreError::Write));
}

// ═══════════════════════════════════════════════════════════════════════════════
// CAUSE CHAINS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn nested_outcomes_flatten_nearest_first() {
    let root = Failure::build("socket read failed", StoreError::Read)
        .cause(Cause::error(SocketClosed))
        .finish();
    let middle = Failure::build("store locked", StoreError::Locked)
        .cause(root)
        .finish();
    let top = Failure::build("request failed", RequestError::Handler)
        .cause(middle)
        .into_outcome::<()>();

    assert_eq!(
        top.cause_kind_chain(),
        [
            "RequestHandlerError",
            "StoreLockedError",
            "StoreReadError",
            "SocketClosed"
        ]
    );
    let messages: Vec<_> = top.cause_chain().iter().map(ChainLink::message).collect();
    assert_eq!(messages[3], "socket closed");
}

#[test]
fn sibling_causes_flatten_pre_order() {
    let first = Failure::build("store read failed", StoreError::Read)
        .cause(Cause::error(SocketClosed))
        .finish();
    let second = Failure::build("store write failed", StoreError::Write).finish();

    let aggregate = Failure::build("request failed", RequestError::Handler)
        .cause(first)
        .cause(second)
        .finish();

    assert_eq!(
        aggregate.cause_kind_chain(),
        [
            "RequestHandlerError",
            "StoreReadError",
            "SocketClosed",
            "StoreWriteError"
        ]
    );
    assert_eq!(aggregate.cause().map(Cause::name), Some("StoreReadError"));
}

#[test]
fn shared_cause_is_not_copied() {
    let cause: Cause = Failure::build("store read failed", StoreError::Read)
        .finish()
        .into();

    let a = Failure::build("request failed", RequestError::Handler)
        .cause(cause.clone())
        .finish();
    let b = Failure::build("request failed", RequestError::Handler)
        .cause(cause.clone())
        .finish();

    let id = |failure: &Failure<RequestError>| {
        failure
            .cause()
            .and_then(Cause::as_failure)
            .map(|view| view.record().id())
    };
    assert_eq!(id(&a), id(&b));
}

#[test]
fn opaque_value_without_name_reports_missing_kind() {
    let failure = Failure::build("request failed", RequestError::Handler)
        .cause(Cause::value(&json!({ "code": 7 })))
        .finish();

    assert_eq!(
        failure.cause_kind_chain(),
        ["RequestHandlerError", "MISSING_ERROR_KIND"]
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// NORMALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn normalized_success_omits_error_kind() {
    let outcome = Outcome::<_, StoreError>::success("store read finished", json!({ "rows": 3 }));
    let normalized = outcome.normalize();
    let encoded = serde_json::to_value(&normalized).expect("serializes");

    assert!(normalized.succeeded);
    assert!(encoded.get("error_kind").is_none());
    assert_eq!(encoded["data"], json!({ "rows": 3 }));
    assert_eq!(normalized.cause_kind_chain, [SUCCEED_NAME]);
}

#[test]
fn normalized_failure_round_trips_through_json() {
    let root = Failure::build("store read failed", StoreError::Read).finish();
    let outcome = Failure::build("request failed", RequestError::Handler)
        .details(json!({ "route": "/users" }))
        .cause(root)
        .into_outcome::<u8>();

    let normalized = outcome.normalize();
    let encoded = serde_json::to_string(&normalized).expect("serializes");
    let decoded: NormalizedOutcome = serde_json::from_str(&encoded).expect("deserializes");

    assert_eq!(decoded, normalized);
    assert!(!decoded.succeeded);
    assert_eq!(decoded.error_kind.as_deref(), Some("RequestHandlerError"));
    assert_eq!(decoded.message, "request failed");
    assert_eq!(
        decoded.cause_kind_chain,
        ["RequestHandlerError", "StoreReadError"]
    );
}

#[test]
fn nested_cause_is_normalized_one_level_deep() {
    let root = Failure::build("socket read failed", StoreError::Read)
        .cause(Cause::error(SocketClosed))
        .finish();
    let middle = Failure::build("store locked", StoreError::Locked)
        .cause(root)
        .finish();
    let top = Failure::build("request failed", RequestError::Handler)
        .cause(middle)
        .finish();

    let normalized = top.normalize();
    let Some(NormalizedCause::Outcome(cause)) = normalized.cause.as_deref() else {
        panic!("expected outcome cause");
    };
    assert_eq!(cause.name, "StoreLockedError");
    assert!(cause.cause.is_none());
    assert!(cause.cause_chain.is_empty());
    assert_eq!(
        cause.cause_kind_chain,
        ["StoreLockedError", "StoreReadError", "SocketClosed"]
    );
    assert_eq!(normalized.cause_chain.len(), 4);
}

#[test]
fn native_error_cause_has_error_shape() {
    let failure = Failure::build("store read failed", StoreError::Read)
        .cause(Cause::error(SocketClosed))
        .finish();

    let normalized = failure.normalize();
    assert!(matches!(
        &normalized.cause_chain[1],
        NormalizedCause::Error { name, message, source: None }
            if name == "SocketClosed" && message == "socket closed"
    ));
}

#[test]
fn secrets_are_redacted_from_details_and_values() {
    let failure = Failure::build("store write failed", StoreError::Write)
        .details(json!({ "user": "app", "password": "x" }))
        .cause(Cause::value(&json!({ "name": "Auth", "token": 123 })))
        .finish();

    let normalized = failure.normalize();
    assert_eq!(normalized.data["password"], "_SECURE_<string>password_");
    assert_eq!(normalized.data["user"], "app");
    assert!(matches!(
        &normalized.cause_chain[1],
        NormalizedCause::Opaque { value } if value["token"] == "_SECURE_<number>token_"
    ));
    assert_eq!(failure.details()["password"], "x");
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISCLOSURE AND FATAL BOUNDARY
// ═══════════════════════════════════════════════════════════════════════════════

fn layered_failure() -> Failure<RequestError> {
    let root = Failure::build("store read failed", StoreError::Read).finish();
    Failure::build("request failed", RequestError::Handler)
        .cause(root)
        .finish()
}

#[test]
fn production_report_is_minimal() {
    let report = layered_failure().report(Stage::Production);

    assert_eq!(report.name, "RequestHandlerError");
    assert_eq!(report.message, "request failed");
    assert!(report.list.is_none());
    assert_eq!(
        serde_json::to_value(&report).expect("serializes"),
        json!({ "name": "RequestHandlerError", "message": "request failed" })
    );
}

#[test]
fn staging_report_lists_kinds() {
    let report = layered_failure().report(Stage::Staging);

    assert_eq!(
        report.list,
        Some(ReportList::Kinds(vec![
            "RequestHandlerError".to_owned(),
            "StoreReadError".to_owned()
        ]))
    );
}

#[test]
fn development_report_lists_full_chain() {
    let report = layered_failure().report(Stage::Development);

    let Some(ReportList::Causes(causes)) = report.list else {
        panic!("expected full chain");
    };
    assert_eq!(causes.len(), 2);
    assert_eq!(causes[1].name(), "StoreReadError");
}

#[test]
fn fatal_error_renders_kind_chain() {
    let fatal = layered_failure().into_fatal();

    assert_eq!(
        fatal.to_string(),
        "RequestHandlerError: request failed -> [RequestHandlerError, StoreReadError]"
    );
    assert_eq!(fatal.chain.len(), 2);
}

#[test]
fn or_fatal_passes_success_through() {
    let outcome = Outcome::<u8, StoreError>::success("store read finished", 4);
    assert_eq!(outcome.or_fatal().ok(), Some(4));

    let outcome = Outcome::<u8, StoreError>::failure("store read failed", StoreError::Read);
    let fatal = outcome.or_fatal().expect_err("failure");
    assert_eq!(fatal.kinds, ["StoreReadError"]);
}
