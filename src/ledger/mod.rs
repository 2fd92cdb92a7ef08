//! Balance-bearing ledgers
//!
//! Companies and per-(user, company) accounts, the primitives that move their
//! balances, and the storage port behind them.

pub mod balance;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;
pub mod validation;

pub use balance::{
    add_account_balance, add_company_balance, deduct_account_balance, deduct_company_balance,
};
pub use memory::{MemoryLedgerStore, MemoryLedgerTx};
pub use models::{Account, Company, DebitOutcome, LedgerKey, LedgerSnapshot};
pub use postgres::{PgLedgerStore, PgLedgerTx};
pub use store::{LedgerStore, LedgerTx, Resolution};
pub use validation::{
    AMOUNT_SCALE, CurrencyCode, MAX_AMOUNT, credited_balance, currencies_match, ensure_positive,
    validate_amount,
};
