//! Tenant Ledger - gateway binary
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌───────────┐    ┌────────────┐
//! │  Config  │───▶│ Postgres │───▶│  Service  │───▶│  Gateway   │
//! │  (YAML)  │    │(migrate) │    │(transfers)│    │(axum + JWT)│
//! └──────────┘    └──────────┘    └───────────┘    └────────────┘
//! ```
//!
//! Usage: `tenant_ledger [--env dev] [--port 8080]`

use std::sync::Arc;

use anyhow::Context;
use tenant_ledger::config::AppConfig;
use tenant_ledger::db::Database;
use tenant_ledger::gateway::{self, state::AppState};
use tenant_ledger::ledger::PgLedgerStore;
use tenant_ledger::logging::init_logging;
use tenant_ledger::permission::PgPermissionGate;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut app_config = AppConfig::load(&env)?;
    let _log_guard = init_logging(&app_config);

    tracing::info!("Starting Tenant Ledger in {} mode", env);

    if let Some(port) = get_port_override() {
        app_config.gateway.port = port;
    }

    let db = Database::connect(&app_config.database)
        .await
        .context("Failed to connect to PostgreSQL")?;

    if app_config.database.run_migrations {
        db.migrate().await.context("Failed to apply migrations")?;
    }

    let store = PgLedgerStore::new(db.pool().clone());
    let gate = Arc::new(PgPermissionGate::new(db.pool().clone()));
    let state = AppState::new(store, gate, &app_config.gateway.jwt_secret)
        .with_internal_errors(app_config.gateway.expose_internal_errors);

    gateway::run_server(&app_config.gateway, Arc::new(state)).await
}
