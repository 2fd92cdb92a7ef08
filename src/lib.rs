//! Tenant Ledger - Multi-tenant Balance Ledger
//!
//! Typed transfers between company ledgers, user accounts and external
//! parties, with permission checks, strict currency rules and an approval
//! hold for companies that review incoming funds.
//!
//! # Modules
//!
//! - [`core_types`] - Id aliases (UserId, CompanyId, AccountId)
//! - [`error`] - `LedgerError` and its API codes
//! - [`ledger`] - Balance primitives, validators, store ports (PostgreSQL + memory)
//! - [`permission`] - Capability bitmask and permission gates
//! - [`transfer`] - Rule table, dispatcher, coordinator, approval, service
//! - [`gateway`] - axum HTTP layer (JWT auth, OpenAPI)
//! - [`config`] / [`logging`] / [`db`] - Ambient stack

// Core types - must be first!
pub mod core_types;

pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod permission;
pub mod transfer;

// Convenient re-exports at crate root
pub use core_types::{AccountId, CompanyId, UserId};
pub use error::{LedgerError, Missing};
pub use ledger::{
    Account, Company, CurrencyCode, LedgerStore, LedgerTx, MemoryLedgerStore, PgLedgerStore,
};
pub use permission::{Capability, CapabilitySet, PermissionGate, StaticPermissionGate};
pub use transfer::{
    Initiator, Scope, Transfer, TransferId, TransferOutcome, TransferQuery, TransferRequest,
    TransferService, TransferStatus, TransferType,
};
