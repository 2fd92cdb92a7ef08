//! Transfer rule table
//!
//! One row per transfer type. The dispatcher never branches on the type
//! itself; everything it needs to know comes from the row.

use super::types::{Scope, TransferType};
use crate::permission::Capability;

/// How the receiver's company relates to the caller's company
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tenancy {
    /// Receiver lives in the caller's company
    Same,
    /// Receiver lives in a different company
    Other,
    /// Receiver is outside the system
    Unbounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRule {
    pub transfer_type: TransferType,
    pub from: Scope,
    pub to: Scope,
    pub tenancy: Tenancy,
    pub permission: Capability,
}

pub const RULES: [TransferRule; 11] = [
    TransferRule {
        transfer_type: TransferType::CompanyToUserSame,
        from: Scope::Company,
        to: Scope::User,
        tenancy: Tenancy::Same,
        permission: Capability::TransferCompanyToSameCompanyUser,
    },
    TransferRule {
        transfer_type: TransferType::CompanyToUserOther,
        from: Scope::Company,
        to: Scope::User,
        tenancy: Tenancy::Other,
        permission: Capability::TransferCompanyToOtherCompanyUser,
    },
    TransferRule {
        transfer_type: TransferType::CompanyToCompanyOther,
        from: Scope::Company,
        to: Scope::Company,
        tenancy: Tenancy::Other,
        permission: Capability::TransferCompanyToOtherCompany,
    },
    TransferRule {
        transfer_type: TransferType::UserToUserSame,
        from: Scope::User,
        to: Scope::User,
        tenancy: Tenancy::Same,
        permission: Capability::TransferUserToSameCompanyUser,
    },
    TransferRule {
        transfer_type: TransferType::UserToUserOther,
        from: Scope::User,
        to: Scope::User,
        tenancy: Tenancy::Other,
        permission: Capability::TransferUserToOtherCompanyUser,
    },
    TransferRule {
        transfer_type: TransferType::UserToCompanySame,
        from: Scope::User,
        to: Scope::Company,
        tenancy: Tenancy::Same,
        permission: Capability::TransferUserToOwnCompany,
    },
    TransferRule {
        transfer_type: TransferType::UserToCompanyOther,
        from: Scope::User,
        to: Scope::Company,
        tenancy: Tenancy::Other,
        permission: Capability::TransferUserToOtherCompany,
    },
    TransferRule {
        transfer_type: TransferType::UserToExternal,
        from: Scope::User,
        to: Scope::External,
        tenancy: Tenancy::Unbounded,
        permission: Capability::TransferUserToExternal,
    },
    TransferRule {
        transfer_type: TransferType::CompanyToExternal,
        from: Scope::Company,
        to: Scope::External,
        tenancy: Tenancy::Unbounded,
        permission: Capability::TransferCompanyToExternal,
    },
    TransferRule {
        transfer_type: TransferType::ExternalToUser,
        from: Scope::External,
        to: Scope::User,
        tenancy: Tenancy::Same,
        permission: Capability::ReceiveExternalToUser,
    },
    TransferRule {
        transfer_type: TransferType::ExternalToCompany,
        from: Scope::External,
        to: Scope::Company,
        tenancy: Tenancy::Same,
        permission: Capability::ReceiveExternalToCompany,
    },
];

/// The row for `transfer_type`. Rows are laid out in declaration order.
pub fn rule_for(transfer_type: TransferType) -> &'static TransferRule {
    &RULES[transfer_type as usize]
}
