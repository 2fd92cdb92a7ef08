//! Transfer Core Types
//!
//! Scopes, the eleven transfer types, the persisted record and the request
//! shape accepted from the HTTP layer.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use utoipa::{IntoParams, ToSchema};

use super::state::TransferStatus;
use crate::core_types::{CompanyId, UserId};
use crate::error::LedgerError;
use crate::ledger::{CurrencyCode, LedgerKey};

/// Transfer ID - ULID-based unique identifier
///
/// Sortable by creation time, no coordination needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransferId(ulid::Ulid);

impl TransferId {
    /// Generate a new unique TransferId
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransferId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

impl Serialize for TransferId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

/// Which kind of party sits at one end of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    User,
    Company,
    External,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::Company => "company",
            Scope::External => "external",
        }
    }

    /// Internal scopes own a ledger row; external parties do not
    #[inline]
    pub fn is_internal(&self) -> bool {
        !matches!(self, Scope::External)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Scope::User),
            "company" => Ok(Scope::Company),
            "external" => Ok(Scope::External),
            _ => Err(format!("Invalid scope: {}", s)),
        }
    }
}

/// The eleven typed transfer variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferType {
    CompanyToUserSame,
    CompanyToUserOther,
    CompanyToCompanyOther,
    UserToUserSame,
    UserToUserOther,
    UserToCompanySame,
    UserToCompanyOther,
    UserToExternal,
    CompanyToExternal,
    ExternalToUser,
    ExternalToCompany,
}

impl TransferType {
    pub const ALL: [TransferType; 11] = [
        TransferType::CompanyToUserSame,
        TransferType::CompanyToUserOther,
        TransferType::CompanyToCompanyOther,
        TransferType::UserToUserSame,
        TransferType::UserToUserOther,
        TransferType::UserToCompanySame,
        TransferType::UserToCompanyOther,
        TransferType::UserToExternal,
        TransferType::CompanyToExternal,
        TransferType::ExternalToUser,
        TransferType::ExternalToCompany,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferType::CompanyToUserSame => "company_to_user_same",
            TransferType::CompanyToUserOther => "company_to_user_other",
            TransferType::CompanyToCompanyOther => "company_to_company_other",
            TransferType::UserToUserSame => "user_to_user_same",
            TransferType::UserToUserOther => "user_to_user_other",
            TransferType::UserToCompanySame => "user_to_company_same",
            TransferType::UserToCompanyOther => "user_to_company_other",
            TransferType::UserToExternal => "user_to_external",
            TransferType::CompanyToExternal => "company_to_external",
            TransferType::ExternalToUser => "external_to_user",
            TransferType::ExternalToCompany => "external_to_company",
        }
    }
}

impl fmt::Display for TransferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransferType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransferType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| LedgerError::InvalidTransferType(s.to_string()))
    }
}

/// Transfer record stored in PostgreSQL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transfer {
    pub id: TransferId,
    /// Client idempotency key, unique per sending company
    pub cid: Option<String>,
    /// Sending user; `None` when the company itself (or an external party) sends
    pub user_id: Option<UserId>,
    /// Company the transfer was initiated in
    pub company_id: CompanyId,
    pub to_user_id: Option<UserId>,
    pub to_user_company_id: Option<CompanyId>,
    pub from_scope: Scope,
    pub to_scope: Scope,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub transfer_type: TransferType,
    pub status: TransferStatus,
    pub from_external_name: Option<String>,
    pub to_external_name: Option<String>,
    pub description: Option<String>,
    /// Sender balance right after the debit (`None` for external senders)
    pub sender_final_balance: Option<Decimal>,
    /// Receiver balance right after the credit (`None` while pending or external)
    pub receiver_final_balance: Option<Decimal>,
    pub initiated_by: UserId,
    pub processed_by: Option<UserId>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Attachment references (opaque to the ledger)
    pub files: Vec<String>,
}

impl Transfer {
    /// Ledger debited at creation, if any
    pub fn sender_ledger(&self) -> Option<LedgerKey> {
        match self.from_scope {
            Scope::Company => Some(LedgerKey::Company(self.company_id)),
            Scope::User => self
                .user_id
                .map(|user_id| LedgerKey::account(user_id, self.company_id)),
            Scope::External => None,
        }
    }

    /// Ledger credited on completion, if any
    pub fn receiver_ledger(&self) -> Option<LedgerKey> {
        let company_id = self.to_user_company_id?;
        match self.to_scope {
            Scope::Company => Some(LedgerKey::Company(company_id)),
            Scope::User => self
                .to_user_id
                .map(|user_id| LedgerKey::account(user_id, company_id)),
            Scope::External => None,
        }
    }

    /// Companies that may see this transfer in their history
    pub fn involves_company(&self, company_id: CompanyId) -> bool {
        self.company_id == company_id || self.to_user_company_id == Some(company_id)
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transfer[{}] {} {} {} status={}",
            self.id, self.transfer_type, self.amount, self.currency, self.status
        )
    }
}

/// Who is asking: the verified caller acting within one company
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Initiator {
    pub user_id: UserId,
    pub company_id: CompanyId,
}

impl Initiator {
    pub fn new(user_id: UserId, company_id: CompanyId) -> Self {
        Self {
            user_id,
            company_id,
        }
    }
}

/// Transfer payload as received from the HTTP layer
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TransferRequest {
    #[schema(example = "company_to_user_same")]
    pub transfer_type: Option<String>,
    #[schema(example = "EUR")]
    pub currency: Option<String>,
    /// Amount as string (to avoid float precision issues)
    #[serde(default)]
    #[schema(example = "200.00")]
    pub amount: String,
    pub description: Option<String>,
    pub to_user_id: Option<UserId>,
    pub to_user_company_id: Option<CompanyId>,
    pub to_external_name: Option<String>,
    pub from_external_name: Option<String>,
    /// Optional declared scopes; when present they must match the type
    pub from_scope: Option<String>,
    pub to_scope: Option<String>,
    /// Optional client idempotency key
    pub cid: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

impl TransferRequest {
    /// Minimal request: type, currency and amount
    pub fn new(transfer_type: TransferType, currency: &str, amount: &str) -> Self {
        Self {
            transfer_type: Some(transfer_type.as_str().to_string()),
            currency: Some(currency.to_string()),
            amount: amount.to_string(),
            ..Default::default()
        }
    }

    pub fn to_user(mut self, user_id: UserId, company_id: CompanyId) -> Self {
        self.to_user_id = Some(user_id);
        self.to_user_company_id = Some(company_id);
        self
    }

    pub fn to_company(mut self, company_id: CompanyId) -> Self {
        self.to_user_company_id = Some(company_id);
        self
    }

    pub fn to_external(mut self, name: &str) -> Self {
        self.to_external_name = Some(name.to_string());
        self
    }

    pub fn from_external(mut self, name: &str) -> Self {
        self.from_external_name = Some(name.to_string());
        self
    }

    pub fn with_scopes(mut self, from: Scope, to: Scope) -> Self {
        self.from_scope = Some(from.as_str().to_string());
        self.to_scope = Some(to.as_str().to_string());
        self
    }

    pub fn with_cid(mut self, cid: &str) -> Self {
        self.cid = Some(cid.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// Result of a successful create
#[derive(Debug, Clone, Serialize)]
pub struct TransferOutcome {
    pub success: bool,
    pub transfer_id: TransferId,
    pub status: TransferStatus,
    pub message: String,
}

/// History query for one company
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransferQuery {
    pub status: Option<String>,
    #[serde(default = "TransferQuery::default_limit")]
    pub limit: u32,
    /// Only transfers created strictly before this instant
    pub before: Option<DateTime<Utc>>,
}

impl TransferQuery {
    pub const MAX_LIMIT: u32 = 200;

    fn default_limit() -> u32 {
        50
    }

    /// Limit clamped to 1..=MAX_LIMIT
    pub fn effective_limit(&self) -> u32 {
        self.limit.clamp(1, Self::MAX_LIMIT)
    }

    /// Parsed status filter; unknown values are a client error
    pub fn status_filter(&self) -> Result<Option<TransferStatus>, LedgerError> {
        match self.status.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => TransferStatus::from_db(s)
                .map(Some)
                .ok_or_else(|| LedgerError::InvalidQuery(format!("unknown status '{}'", s))),
        }
    }

    /// Applies status and cursor filters to one record
    pub fn matches(&self, transfer: &Transfer, status: Option<TransferStatus>) -> bool {
        status.is_none_or(|s| transfer.status == s)
            && self.before.is_none_or(|before| transfer.created_at < before)
    }
}

impl Default for TransferQuery {
    fn default() -> Self {
        Self {
            status: None,
            limit: Self::default_limit(),
            before: None,
        }
    }
}
