//! Transfer Engine
//!
//! Moves value between company ledgers, user accounts and external parties.
//!
//! # Flow
//!
//! ```text
//! request → classify (rule table) → permission gate → scopes / identity / tenancy
//!         → begin → lock ledgers (canonical order) → currency → amount
//!         → debit sender → credit receiver (unless held) → insert record → commit
//! ```
//!
//! A transfer into a company with `auto_approve_incoming = false` is held as
//! `pending`: the sender is debited, the receiver is credited only when the
//! transfer is approved. Rejection refunds the sender.
//!
//! # Invariants
//!
//! 1. Balances never go negative (compare-and-apply debits)
//! 2. Internal transfers conserve the sum of balances
//! 3. A failed transfer leaves no ledger change and no record
//! 4. Only `pending` transfers change status, exactly once

pub mod approval;
pub mod coordinator;
pub mod dispatcher;
pub mod rules;
pub mod service;
pub mod state;
pub mod types;

#[cfg(test)]
mod integration_tests;

pub use approval::Decision;
pub use rules::{RULES, Tenancy, TransferRule, rule_for};
pub use service::TransferService;
pub use state::TransferStatus;
pub use types::{
    Initiator, Scope, Transfer, TransferId, TransferOutcome, TransferQuery, TransferRequest,
    TransferType,
};
