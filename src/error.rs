//! Ledger Error Types
//!
//! One taxonomy shared by the balance primitives, the dispatcher and the
//! approval state machine. Every variant carries a human-readable message,
//! a stable machine code and a suggested HTTP status.

use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::core_types::{CompanyId, UserId};
use crate::ledger::LedgerKey;

/// Ledger entity that could not be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    Company(CompanyId),
    Account { user_id: UserId, company_id: CompanyId },
    Transfer(String),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Company(id) => write!(f, "company {}", id),
            Missing::Account {
                user_id,
                company_id,
            } => write!(f, "account of user {} in company {}", user_id, company_id),
            Missing::Transfer(id) => write!(f, "transfer {}", id),
        }
    }
}

impl From<LedgerKey> for Missing {
    fn from(key: LedgerKey) -> Self {
        match key {
            LedgerKey::Company(id) => Missing::Company(id),
            LedgerKey::Account {
                company_id,
                user_id,
            } => Missing::Account {
                user_id,
                company_id,
            },
        }
    }
}

/// Ledger error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    // === Validation Errors ===
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid currency code: '{0}' (expected ISO-4217, e.g. EUR)")]
    InvalidCurrency(String),

    #[error("Unknown transfer type: '{0}'")]
    InvalidTransferType(String),

    #[error("Currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: String, found: String },

    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Scopes {from_scope} -> {to_scope} do not match transfer type {transfer_type}")]
    InvalidScopesForType {
        transfer_type: String,
        from_scope: String,
        to_scope: String,
    },

    #[error("Missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error("Sender and receiver must differ: {0}")]
    SameEntityNotAllowed(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    // === Authorization Errors ===
    #[error("Insufficient permissions: requires {0}")]
    InsufficientPermissions(String),

    // === State Errors ===
    #[error("Not found: {0}")]
    NotFound(Missing),

    #[error("Transfer {transfer_id} already processed (status: {status})")]
    AlreadyProcessed { transfer_id: String, status: String },

    // === System Errors ===
    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl LedgerError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount(_) => "INVALID_AMOUNT",
            LedgerError::InvalidCurrency(_) => "INVALID_CURRENCY",
            LedgerError::InvalidTransferType(_) => "INVALID_TRANSFER_TYPE",
            LedgerError::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            LedgerError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            LedgerError::InvalidScopesForType { .. } => "INVALID_SCOPES_FOR_TYPE",
            LedgerError::MissingRequiredField(_) => "MISSING_REQUIRED_FIELD",
            LedgerError::SameEntityNotAllowed(_) => "SAME_ENTITY_NOT_ALLOWED",
            LedgerError::InvalidQuery(_) => "INVALID_QUERY",
            LedgerError::InsufficientPermissions(_) => "INSUFFICIENT_PERMISSIONS",
            LedgerError::NotFound(_) => "NOT_FOUND",
            LedgerError::AlreadyProcessed { .. } => "ALREADY_PROCESSED",
            LedgerError::StorageFailure(_) => "STORAGE_FAILURE",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            LedgerError::InvalidAmount(_)
            | LedgerError::InvalidCurrency(_)
            | LedgerError::InvalidTransferType(_)
            | LedgerError::CurrencyMismatch { .. }
            | LedgerError::InsufficientBalance { .. }
            | LedgerError::InvalidScopesForType { .. }
            | LedgerError::MissingRequiredField(_)
            | LedgerError::SameEntityNotAllowed(_)
            | LedgerError::InvalidQuery(_)
            | LedgerError::AlreadyProcessed { .. } => 400,
            LedgerError::InsufficientPermissions(_) => 403,
            LedgerError::NotFound(_) => 404,
            LedgerError::StorageFailure(_) => 500,
        }
    }

    /// True for failures caused by the request rather than the system
    pub fn is_client_error(&self) -> bool {
        self.http_status() < 500
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::StorageFailure(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for LedgerError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        LedgerError::StorageFailure(e.to_string())
    }
}
