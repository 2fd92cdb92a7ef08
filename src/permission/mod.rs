//! Permission Gate
//!
//! Per-company capability grants stored as a bitmask, with a super-admin
//! override that satisfies every check.

pub mod postgres;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::core_types::{CompanyId, UserId};
use crate::error::LedgerError;

pub use postgres::PgPermissionGate;

/// A single grantable capability. The discriminant is its bit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Capability {
    TransferCompanyToSameCompanyUser = 0,
    TransferCompanyToOtherCompanyUser = 1,
    TransferCompanyToOtherCompany = 2,
    TransferUserToSameCompanyUser = 3,
    TransferUserToOtherCompanyUser = 4,
    TransferUserToOwnCompany = 5,
    TransferUserToOtherCompany = 6,
    TransferUserToExternal = 7,
    TransferCompanyToExternal = 8,
    ReceiveExternalToUser = 9,
    ReceiveExternalToCompany = 10,
    ApproveIncomingTransfers = 11,
    ViewCompanyTransfers = 12,
}

impl Capability {
    pub const ALL: [Capability; 13] = [
        Capability::TransferCompanyToSameCompanyUser,
        Capability::TransferCompanyToOtherCompanyUser,
        Capability::TransferCompanyToOtherCompany,
        Capability::TransferUserToSameCompanyUser,
        Capability::TransferUserToOtherCompanyUser,
        Capability::TransferUserToOwnCompany,
        Capability::TransferUserToOtherCompany,
        Capability::TransferUserToExternal,
        Capability::TransferCompanyToExternal,
        Capability::ReceiveExternalToUser,
        Capability::ReceiveExternalToCompany,
        Capability::ApproveIncomingTransfers,
        Capability::ViewCompanyTransfers,
    ];

    #[inline]
    pub fn bit(self) -> u64 {
        1u64 << (self as u8)
    }

    /// Grant name as stored by administrators
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::TransferCompanyToSameCompanyUser => {
                "can_transfer_company_to_same_company_user"
            }
            Capability::TransferCompanyToOtherCompanyUser => {
                "can_transfer_company_to_other_company_user"
            }
            Capability::TransferCompanyToOtherCompany => "can_transfer_company_to_other_company",
            Capability::TransferUserToSameCompanyUser => "can_transfer_user_to_same_company_user",
            Capability::TransferUserToOtherCompanyUser => {
                "can_transfer_user_to_other_company_user"
            }
            Capability::TransferUserToOwnCompany => "can_transfer_user_to_own_company",
            Capability::TransferUserToOtherCompany => "can_transfer_user_to_other_company",
            Capability::TransferUserToExternal => "can_transfer_user_to_external",
            Capability::TransferCompanyToExternal => "can_transfer_company_to_external",
            Capability::ReceiveExternalToUser => "can_receive_external_to_user",
            Capability::ReceiveExternalToCompany => "can_receive_external_to_company",
            Capability::ApproveIncomingTransfers => "can_approve_incoming_transfers",
            Capability::ViewCompanyTransfers => "can_view_company_transfers",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Unknown capability: {}", s))
    }
}

// ============================================================================
// CapabilitySet
// ============================================================================

/// Bitmask of granted capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet(u64);

impl CapabilitySet {
    /// Reserved bit; never stored in `company_permissions`
    const SUPER_ADMIN: u64 = 1 << 63;
    const KNOWN: u64 = (1u64 << Capability::ALL.len()) - 1;

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn super_admin() -> Self {
        Self(Self::SUPER_ADMIN)
    }

    /// From a stored bitmask; unknown bits are dropped
    pub fn from_bits(bits: i64) -> Self {
        Self(bits as u64 & Self::KNOWN)
    }

    /// Stored form (excludes the super-admin bit)
    pub fn bits(&self) -> i64 {
        (self.0 & Self::KNOWN) as i64
    }

    pub fn of(capabilities: &[Capability]) -> Self {
        capabilities
            .iter()
            .fold(Self::empty(), |set, c| set.with(*c))
    }

    pub fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    pub fn with_super_admin(self) -> Self {
        Self(self.0 | Self::SUPER_ADMIN)
    }

    pub fn is_super_admin(&self) -> bool {
        self.0 & Self::SUPER_ADMIN != 0
    }

    /// Exact grant check, no override
    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// At least one of `required` (super-admin always passes)
    pub fn satisfies_any(&self, required: &[Capability]) -> bool {
        self.is_super_admin() || required.iter().any(|c| self.contains(*c))
    }

    /// Every one of `required` (super-admin always passes)
    pub fn satisfies_all(&self, required: &[Capability]) -> bool {
        self.is_super_admin() || required.iter().all(|c| self.contains(*c))
    }
}

fn describe(required: &[Capability]) -> String {
    required
        .iter()
        .map(Capability::as_str)
        .collect::<Vec<_>>()
        .join(" or ")
}

// ============================================================================
// Gate
// ============================================================================

/// Resolves what a user may do inside one company
#[async_trait]
pub trait PermissionGate: Send + Sync + 'static {
    async fn capabilities(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<CapabilitySet, LedgerError>;

    async fn has_any_role(
        &self,
        user_id: UserId,
        company_id: CompanyId,
        required: &[Capability],
    ) -> Result<bool, LedgerError> {
        Ok(self
            .capabilities(user_id, company_id)
            .await?
            .satisfies_any(required))
    }

    async fn has_all_roles(
        &self,
        user_id: UserId,
        company_id: CompanyId,
        required: &[Capability],
    ) -> Result<bool, LedgerError> {
        Ok(self
            .capabilities(user_id, company_id)
            .await?
            .satisfies_all(required))
    }

    /// `InsufficientPermissions` unless at least one of `required` is held
    async fn require_any(
        &self,
        user_id: UserId,
        company_id: CompanyId,
        required: &[Capability],
    ) -> Result<(), LedgerError> {
        if self.has_any_role(user_id, company_id, required).await? {
            Ok(())
        } else {
            Err(LedgerError::InsufficientPermissions(describe(required)))
        }
    }
}

/// Fixed grants held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticPermissionGate {
    grants: HashMap<(UserId, CompanyId), CapabilitySet>,
    super_admins: HashSet<UserId>,
}

impl StaticPermissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add capabilities to what `user_id` already holds in `company_id`
    pub fn grant(
        mut self,
        user_id: UserId,
        company_id: CompanyId,
        capabilities: &[Capability],
    ) -> Self {
        let entry = self.grants.entry((user_id, company_id)).or_default();
        *entry = capabilities.iter().fold(*entry, |set, c| set.with(*c));
        self
    }

    pub fn grant_super_admin(mut self, user_id: UserId) -> Self {
        self.super_admins.insert(user_id);
        self
    }
}

#[async_trait]
impl PermissionGate for StaticPermissionGate {
    async fn capabilities(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<CapabilitySet, LedgerError> {
        let set = self
            .grants
            .get(&(user_id, company_id))
            .copied()
            .unwrap_or_default();
        if self.super_admins.contains(&user_id) {
            Ok(set.with_super_admin())
        } else {
            Ok(set)
        }
    }
}
