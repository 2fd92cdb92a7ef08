//! Data models for balance-bearing ledgers

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::validation::CurrencyCode;
use crate::core_types::{AccountId, CompanyId, UserId};

/// Company treasury ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub currency: CurrencyCode,
    pub balance: Decimal,
    pub owner_id: UserId,
    /// When false, incoming transfers are held as `pending` until approved
    pub auto_approve_incoming: bool,
    pub created_at: DateTime<Utc>,
}

impl Company {
    /// New company with zero balance, auto-approving incoming transfers
    pub fn new(id: CompanyId, name: &str, currency: CurrencyCode, owner_id: UserId) -> Self {
        Self {
            id,
            name: name.to_string(),
            currency,
            balance: Decimal::ZERO,
            owner_id,
            auto_approve_incoming: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = balance;
        self
    }

    pub fn holding_incoming(mut self) -> Self {
        self.auto_approve_incoming = false;
        self
    }
}

/// A user's sub-ledger within one company
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub company_id: CompanyId,
    pub currency: CurrencyCode,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Identifies one balance-bearing row.
///
/// The derived ordering is the canonical lock order: every transaction that
/// touches two ledgers locks the smaller key first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LedgerKey {
    Company(CompanyId),
    Account {
        company_id: CompanyId,
        user_id: UserId,
    },
}

impl LedgerKey {
    pub fn account(user_id: UserId, company_id: CompanyId) -> Self {
        LedgerKey::Account {
            company_id,
            user_id,
        }
    }

    /// Company the ledger belongs to
    pub fn company_id(&self) -> CompanyId {
        match self {
            LedgerKey::Company(id) => *id,
            LedgerKey::Account { company_id, .. } => *company_id,
        }
    }
}

impl std::fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerKey::Company(id) => write!(f, "company:{}", id),
            LedgerKey::Account {
                company_id,
                user_id,
            } => write!(f, "account:{}/{}", company_id, user_id),
        }
    }
}

/// Locked view of a ledger row: what the dispatcher needs to validate a movement
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSnapshot {
    pub key: LedgerKey,
    pub currency: CurrencyCode,
    pub balance: Decimal,
    /// Policy of the company owning this ledger
    pub auto_approve_incoming: bool,
}

/// Outcome of a compare-and-apply debit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    /// Debit applied; carries the new balance
    Applied(Decimal),
    /// Balance below the requested amount; nothing changed
    Insufficient(Decimal),
    /// Target row does not exist
    Missing,
}
