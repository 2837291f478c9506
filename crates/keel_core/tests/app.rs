//! Integration tests for the application lifecycle.

mod test_utils;

use keel_core::AppErrorKind;
use keel_outcome::Stage;
use keel_outcome::disclosure::ReportList;
use keel_resource::ResourceName;
use keel_resource::memory::MemoryDriver;
use test_utils::{CACHE, PRIMARY, app, config, healthy_app, primary_driver};

// ═══════════════════════════════════════════════════════════════════════════
// start
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn start_connects_and_migrates() {
    let app = healthy_app();

    let outcome = app.start().await;
    assert!(outcome.is_success());
    assert_eq!(outcome.message(), "app started");

    let store = app
        .manager()
        .get_handle(PRIMARY)
        .into_result()
        .expect("primary is connected");
    assert_eq!(
        store.applied_migrations(),
        ["create_orders", "create_customers"]
    );
}

#[tokio::test]
async fn start_outcomes_share_an_execution_id() {
    let app = healthy_app();

    let outcome = app.start().await;
    assert!(outcome.execution_id().is_some());
}

#[tokio::test]
async fn unreachable_resource_fails_start() {
    let app = app(
        config("orders", Stage::Development),
        primary_driver(),
        MemoryDriver::new("memory://cache").unreachable(),
    );

    let outcome = app.start().await;
    let failure = outcome.failure_ref().expect("start must fail");
    assert_eq!(failure.kind(), AppErrorKind::Starting);
    assert_eq!(failure.details()["step"], "connect");
    assert_eq!(
        &outcome.cause_kind_chain()[..4],
        [
            "AppStartingError",
            "ManagerConnectionError",
            "ConnectLocalError",
            "ConnectionError",
        ]
    );

    let health = app.health();
    assert!(!health.connected);
    assert!(health.resources[&ResourceName::Memory]);
    assert!(!health.resources[&ResourceName::Redis]);
}

#[tokio::test]
async fn failing_migration_fails_start() {
    let primary = primary_driver()
        .with_migration("broken", |_| Err("syntax error near TABLE".to_owned()));
    let app = app(
        config("orders", Stage::Development),
        primary,
        MemoryDriver::new("memory://cache"),
    );

    let outcome = app.start().await;
    let failure = outcome.failure_ref().expect("start must fail");
    assert_eq!(failure.details()["step"], "migrate");
    assert_eq!(
        &outcome.cause_kind_chain()[..3],
        [
            "AppStartingError",
            "ManagerMigrationError",
            "MigrateLocalError",
        ]
    );
}

#[tokio::test]
async fn start_or_abort_returns_a_fatal_error() {
    let app = app(
        config("orders", Stage::Production),
        MemoryDriver::new("memory://primary").unreachable(),
        MemoryDriver::new("memory://cache"),
    );

    let fatal = app.start_or_abort().await.expect_err("start must fail");
    assert_eq!(fatal.name, "AppStartingError");
    assert_eq!(fatal.kinds[0], "AppStartingError");
    assert!(fatal.to_string().starts_with("AppStartingError: app start failed"));
}

#[tokio::test]
async fn start_or_abort_passes_on_success() {
    let app = healthy_app();
    assert!(app.start_or_abort().await.is_ok());
}

// ═══════════════════════════════════════════════════════════════════════════
// close
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn close_disconnects_everything() {
    let app = healthy_app();
    assert!(app.start().await.is_success());

    let outcome = app.close().await;
    assert!(outcome.is_success());

    let health = app.health();
    assert!(!health.connected);
    assert!(health.resources.values().all(|connected| !connected));
}

#[tokio::test]
async fn close_before_start_fails() {
    let app = healthy_app();

    let outcome = app.close().await;
    assert_eq!(outcome.kind(), Some(AppErrorKind::Closing));
    assert_eq!(
        &outcome.cause_kind_chain()[..4],
        [
            "AppClosingError",
            "ManagerDisconnectionError",
            "DisconnectLocalError",
            "NotConnectedError",
        ]
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// reload
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn reload_swaps_config_and_restarts() {
    let app = healthy_app();
    assert!(app.start().await.is_success());

    let outcome = app.reload(config("orders-v2", Stage::Staging)).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.message(), "app reloaded");

    let health = app.health();
    assert_eq!(health.name, "orders-v2");
    assert_eq!(health.stage, Stage::Staging);
    assert!(health.connected);
    assert!(app.manager().get_handle(CACHE).is_success());
}

#[tokio::test]
async fn failed_close_keeps_previous_config() {
    let app = app(
        config("orders", Stage::Development),
        primary_driver(),
        MemoryDriver::new("memory://cache").failing_release(),
    );
    assert!(app.start().await.is_success());

    let outcome = app.reload(config("orders-v2", Stage::Staging)).await;
    assert_eq!(outcome.kind(), Some(AppErrorKind::Reloading));
    assert_eq!(outcome.message(), "app reload failed while closing");
    assert_eq!(
        &outcome.cause_kind_chain()[..3],
        [
            "AppReloadingError",
            "AppClosingError",
            "ManagerDisconnectionError",
        ]
    );
    assert_eq!(app.config().name, "orders");
}

// ═══════════════════════════════════════════════════════════════════════════
// health and disclosure
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn health_report_serializes_in_registration_order() {
    let app = healthy_app();
    assert!(app.start().await.is_success());

    let json = serde_json::to_value(app.health()).expect("health serializes");
    assert_eq!(
        json,
        serde_json::json!({
            "name": "orders",
            "stage": "development",
            "connected": true,
            "resources": { "memory": true, "redis": true },
        })
    );
}

#[tokio::test]
async fn disclosure_follows_configured_stage() {
    let production = app(
        config("orders", Stage::Production),
        MemoryDriver::new("memory://primary").unreachable(),
        MemoryDriver::new("memory://cache"),
    );
    let staging = app(
        config("orders", Stage::Staging),
        MemoryDriver::new("memory://primary").unreachable(),
        MemoryDriver::new("memory://cache"),
    );

    let outcome = production.start().await;
    let failure = outcome.failure_ref().expect("start must fail");
    let report = production.disclose(failure);
    assert_eq!(report.name, "AppStartingError");
    assert_eq!(report.list, None);

    let outcome = staging.start().await;
    let failure = outcome.failure_ref().expect("start must fail");
    match staging.disclose(failure).list {
        Some(ReportList::Kinds(kinds)) => assert_eq!(kinds[1], "ManagerConnectionError"),
        other => panic!("expected a kind list, got {other:?}"),
    }
}
