//! Storage port for ledgers and transfer records
//!
//! `LedgerStore` hands out short-lived `LedgerTx` units. Every mutation made
//! through a `LedgerTx` becomes visible atomically on `commit` and vanishes on
//! `rollback` (or when the tx is dropped uncommitted).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::models::{Account, Company, DebitOutcome, LedgerKey, LedgerSnapshot};
use crate::core_types::{CompanyId, UserId};
use crate::error::LedgerError;
use crate::transfer::{Transfer, TransferId, TransferQuery, TransferStatus};

/// Terminal decision written onto a pending transfer
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub status: TransferStatus,
    pub processed_by: UserId,
    pub processed_at: DateTime<Utc>,
    pub receiver_final_balance: Option<Decimal>,
}

#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    type Tx: LedgerTx;

    /// Open a new transactional unit of work
    async fn begin(&self) -> Result<Self::Tx, LedgerError>;

    async fn get_company(&self, id: CompanyId) -> Result<Option<Company>, LedgerError>;

    async fn get_account(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<Option<Account>, LedgerError>;

    async fn get_transfer(&self, id: &TransferId) -> Result<Option<Transfer>, LedgerError>;

    /// Lookup by client idempotency key within the sending company
    async fn find_transfer_by_cid(
        &self,
        company_id: CompanyId,
        cid: &str,
    ) -> Result<Option<Transfer>, LedgerError>;

    /// Transfers sent from or received into `company_id`, newest first
    async fn list_transfers(
        &self,
        company_id: CompanyId,
        query: &TransferQuery,
    ) -> Result<Vec<Transfer>, LedgerError>;

    async fn health_check(&self) -> Result<(), LedgerError>;
}

#[async_trait]
pub trait LedgerTx: Send {
    /// Lock one ledger row for the rest of the transaction.
    ///
    /// Callers holding several ledgers must lock them in `LedgerKey` order.
    async fn lock_ledger(&mut self, key: LedgerKey) -> Result<Option<LedgerSnapshot>, LedgerError>;

    /// Add `amount`; returns the new balance or `None` if the row is missing
    async fn credit(&mut self, key: LedgerKey, amount: Decimal)
    -> Result<Option<Decimal>, LedgerError>;

    /// Subtract `amount` only if the balance covers it
    async fn debit(&mut self, key: LedgerKey, amount: Decimal) -> Result<DebitOutcome, LedgerError>;

    /// Create the (user, company) account with zero balance if absent.
    ///
    /// Returns `None` when the company does not exist.
    async fn open_account(
        &mut self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<Option<Account>, LedgerError>;

    async fn insert_transfer(&mut self, transfer: &Transfer) -> Result<(), LedgerError>;

    /// Load a transfer and lock it against concurrent resolution
    async fn lock_transfer(&mut self, id: &TransferId) -> Result<Option<Transfer>, LedgerError>;

    /// Move a `pending` transfer to its terminal state.
    ///
    /// Returns false if the transfer was no longer pending.
    async fn resolve_transfer(
        &mut self,
        id: &TransferId,
        resolution: &Resolution,
    ) -> Result<bool, LedgerError>;

    async fn commit(self) -> Result<(), LedgerError>;

    async fn rollback(self) -> Result<(), LedgerError>;
}
