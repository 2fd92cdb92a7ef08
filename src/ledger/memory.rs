//! In-memory ledger store
//!
//! Backs the test suites and local experiments. A transaction takes the single
//! state lock, mutates a working copy and writes it back on commit, so
//! isolation is serializable and rollback is free.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::models::{Account, Company, DebitOutcome, LedgerKey, LedgerSnapshot};
use super::store::{LedgerStore, LedgerTx, Resolution};
use super::validation::{CurrencyCode, credited_balance};
use crate::core_types::{AccountId, CompanyId, UserId};
use crate::error::{LedgerError, Missing};
use crate::transfer::{Transfer, TransferId, TransferQuery, TransferStatus};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    companies: BTreeMap<CompanyId, Company>,
    accounts: BTreeMap<(CompanyId, UserId), Account>,
    transfers: Vec<Transfer>,
    next_account_id: AccountId,
}

impl MemoryState {
    fn snapshot(&self, key: LedgerKey) -> Option<LedgerSnapshot> {
        match key {
            LedgerKey::Company(id) => self.companies.get(&id).map(|c| LedgerSnapshot {
                key,
                currency: c.currency.clone(),
                balance: c.balance,
                auto_approve_incoming: c.auto_approve_incoming,
            }),
            LedgerKey::Account {
                company_id,
                user_id,
            } => {
                let account = self.accounts.get(&(company_id, user_id))?;
                let company = self.companies.get(&company_id)?;
                Some(LedgerSnapshot {
                    key,
                    currency: account.currency.clone(),
                    balance: account.balance,
                    auto_approve_incoming: company.auto_approve_incoming,
                })
            }
        }
    }

    fn balance_mut(&mut self, key: LedgerKey) -> Option<&mut Decimal> {
        match key {
            LedgerKey::Company(id) => self.companies.get_mut(&id).map(|c| &mut c.balance),
            LedgerKey::Account {
                company_id,
                user_id,
            } => self
                .accounts
                .get_mut(&(company_id, user_id))
                .map(|a| &mut a.balance),
        }
    }

    fn open_account(
        &mut self,
        user_id: UserId,
        company_id: CompanyId,
        currency: Option<CurrencyCode>,
        balance: Decimal,
    ) -> Option<Account> {
        let company = self.companies.get(&company_id)?;
        if let Some(existing) = self.accounts.get(&(company_id, user_id)) {
            return Some(existing.clone());
        }
        let currency = currency.unwrap_or_else(|| company.currency.clone());
        self.next_account_id += 1;
        let account = Account {
            id: self.next_account_id,
            user_id,
            company_id,
            currency,
            balance,
            created_at: Utc::now(),
        };
        self.accounts.insert((company_id, user_id), account.clone());
        Some(account)
    }
}

/// Shared handle; clones see the same state
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a company
    pub async fn insert_company(&self, company: Company) {
        self.state.lock().await.companies.insert(company.id, company);
    }

    /// Seed an account in the company's currency
    pub async fn insert_account(
        &self,
        user_id: UserId,
        company_id: CompanyId,
        balance: Decimal,
    ) -> Result<Account, LedgerError> {
        self.state
            .lock()
            .await
            .open_account(user_id, company_id, None, balance)
            .ok_or(LedgerError::NotFound(Missing::Company(company_id)))
    }

    /// Seed an account whose currency differs from its company's
    pub async fn insert_account_with_currency(
        &self,
        user_id: UserId,
        company_id: CompanyId,
        currency: CurrencyCode,
        balance: Decimal,
    ) -> Result<Account, LedgerError> {
        self.state
            .lock()
            .await
            .open_account(user_id, company_id, Some(currency), balance)
            .ok_or(LedgerError::NotFound(Missing::Company(company_id)))
    }

    /// Sum of every internal balance
    pub async fn total_balance(&self) -> Decimal {
        let state = self.state.lock().await;
        let companies: Decimal = state.companies.values().map(|c| c.balance).sum();
        let accounts: Decimal = state.accounts.values().map(|a| a.balance).sum();
        companies + accounts
    }

    pub async fn transfer_count(&self) -> usize {
        self.state.lock().await.transfers.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Tx = MemoryLedgerTx;

    async fn begin(&self) -> Result<Self::Tx, LedgerError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryLedgerTx { guard, working })
    }

    async fn get_company(&self, id: CompanyId) -> Result<Option<Company>, LedgerError> {
        Ok(self.state.lock().await.companies.get(&id).cloned())
    }

    async fn get_account(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<Option<Account>, LedgerError> {
        Ok(self
            .state
            .lock()
            .await
            .accounts
            .get(&(company_id, user_id))
            .cloned())
    }

    async fn get_transfer(&self, id: &TransferId) -> Result<Option<Transfer>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state.transfers.iter().find(|t| &t.id == id).cloned())
    }

    async fn find_transfer_by_cid(
        &self,
        company_id: CompanyId,
        cid: &str,
    ) -> Result<Option<Transfer>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .transfers
            .iter()
            .find(|t| t.company_id == company_id && t.cid.as_deref() == Some(cid))
            .cloned())
    }

    async fn list_transfers(
        &self,
        company_id: CompanyId,
        query: &TransferQuery,
    ) -> Result<Vec<Transfer>, LedgerError> {
        let status = query.status_filter()?;
        let state = self.state.lock().await;
        let mut out: Vec<Transfer> = state
            .transfers
            .iter()
            .filter(|t| t.involves_company(company_id) && query.matches(t, status))
            .cloned()
            .collect();
        out.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        out.truncate(query.effective_limit() as usize);
        Ok(out)
    }

    async fn health_check(&self) -> Result<(), LedgerError> {
        Ok(())
    }
}

/// Unit of work over a private copy of the state
pub struct MemoryLedgerTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn lock_ledger(&mut self, key: LedgerKey) -> Result<Option<LedgerSnapshot>, LedgerError> {
        Ok(self.working.snapshot(key))
    }

    async fn credit(
        &mut self,
        key: LedgerKey,
        amount: Decimal,
    ) -> Result<Option<Decimal>, LedgerError> {
        let Some(balance) = self.working.balance_mut(key) else {
            return Ok(None);
        };
        *balance = credited_balance(*balance, amount)?;
        Ok(Some(*balance))
    }

    async fn debit(&mut self, key: LedgerKey, amount: Decimal) -> Result<DebitOutcome, LedgerError> {
        let Some(balance) = self.working.balance_mut(key) else {
            return Ok(DebitOutcome::Missing);
        };
        if *balance < amount {
            return Ok(DebitOutcome::Insufficient(*balance));
        }
        *balance -= amount;
        Ok(DebitOutcome::Applied(*balance))
    }

    async fn open_account(
        &mut self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<Option<Account>, LedgerError> {
        Ok(self
            .working
            .open_account(user_id, company_id, None, Decimal::ZERO))
    }

    async fn insert_transfer(&mut self, transfer: &Transfer) -> Result<(), LedgerError> {
        if let Some(cid) = transfer.cid.as_deref() {
            let taken = self
                .working
                .transfers
                .iter()
                .any(|t| t.company_id == transfer.company_id && t.cid.as_deref() == Some(cid));
            if taken {
                return Err(LedgerError::StorageFailure(format!(
                    "duplicate cid '{}' for company {}",
                    cid, transfer.company_id
                )));
            }
        }
        self.working.transfers.push(transfer.clone());
        Ok(())
    }

    async fn lock_transfer(&mut self, id: &TransferId) -> Result<Option<Transfer>, LedgerError> {
        Ok(self.working.transfers.iter().find(|t| &t.id == id).cloned())
    }

    async fn resolve_transfer(
        &mut self,
        id: &TransferId,
        resolution: &Resolution,
    ) -> Result<bool, LedgerError> {
        let Some(transfer) = self.working.transfers.iter_mut().find(|t| &t.id == id) else {
            return Ok(false);
        };
        if transfer.status != TransferStatus::Pending {
            return Ok(false);
        }
        transfer.status = resolution.status;
        transfer.processed_by = Some(resolution.processed_by);
        transfer.processed_at = Some(resolution.processed_at);
        transfer.receiver_final_balance = resolution.receiver_final_balance;
        Ok(true)
    }

    async fn commit(mut self) -> Result<(), LedgerError> {
        *self.guard = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        Ok(())
    }
}
