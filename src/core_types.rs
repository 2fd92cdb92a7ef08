//! Core types used throughout the ledger
//!
//! Identifiers are plain integers as stored in PostgreSQL (`BIGINT`).

/// User ID - globally unique, issued by the identity collaborator.
pub type UserId = i64;

/// Company (tenant) ID.
///
/// Every balance-bearing row belongs to exactly one company.
pub type CompanyId = i64;

/// Account ID - primary key of a user's sub-ledger within a company.
pub type AccountId = i64;
