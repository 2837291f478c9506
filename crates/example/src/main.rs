//! Example inventory service CLI.
//!
//! Loads configuration from the environment (and `.env`), starts the
//! resources, stocks the SKUs given on the command line and logs the result.
//!
//! # Usage
//!
//! ```bash
//! KEEL_APP_NAME=inventory inventory <sku>...
//! ```
//!
//! # Example
//!
//! ```bash
//! KEEL_APP_NAME=inventory KEEL_LOG_FORMAT=compact inventory A-1 B-2 A-1
//! ```

use example::{Inventory, Item, build_manager};
use keel_core::{App, AppConfig};
use keel_outcome::{FatalError, Outcome};

#[tokio::main]
async fn main() -> Result<(), FatalError> {
    let config = AppConfig::from_env().or_fatal()?;
    config.tracing().init();

    let manager = build_manager(&config).or_fatal()?;
    let app = App::new(config, manager);
    app.start_or_abort().await?;

    let inventory = Inventory::new(app.manager());
    for sku in std::env::args().skip(1) {
        match inventory.add(Item { sku, quantity: 1 }) {
            Outcome::Success(added) => {
                tracing::info!(sku = %added.data().sku, "stocked");
            }
            Outcome::Failure(failure) => {
                let report = app.disclose(&failure);
                tracing::warn!(
                    report = %serde_json::to_string(&report).unwrap_or_default(),
                    "could not stock item"
                );
            }
        }
    }

    if let Outcome::Success(items) = inventory.items() {
        tracing::info!(count = items.data().len(), "catalog listed");
    }

    let health = app.health();
    tracing::info!(
        app = %health.name,
        stage = %health.stage,
        resources = ?health.resources,
        "health"
    );

    app.close().await.or_fatal()
}
