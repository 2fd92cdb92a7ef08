//! Approval State Machine
//!
//! Moves a held transfer from `pending` to `completed` (receiver credited) or
//! `reject` (sender refunded). Both paths run in one transaction and finish
//! with a compare-and-apply on `status = 'pending'`.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use super::coordinator;
use super::state::TransferStatus;
use super::types::{Scope, Transfer, TransferId};
use crate::core_types::UserId;
use crate::error::{LedgerError, Missing};
use crate::ledger::balance::credit_ledger;
use crate::ledger::{LedgerKey, LedgerStore, LedgerTx, Resolution, currencies_match};
use crate::permission::{Capability, PermissionGate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    fn target(self) -> TransferStatus {
        match self {
            Decision::Approve => TransferStatus::Completed,
            Decision::Reject => TransferStatus::Rejected,
        }
    }
}

/// Approve or reject a pending transfer on behalf of `approver`
pub async fn decide<S, G>(
    store: &S,
    gate: &G,
    transfer_id: &TransferId,
    approver: UserId,
    decision: Decision,
) -> Result<Transfer, LedgerError>
where
    S: LedgerStore,
    G: PermissionGate + ?Sized,
{
    let mut tx = store.begin().await?;
    let result = apply(&mut tx, gate, transfer_id, approver, decision).await;
    let transfer = coordinator::settle(tx, result).await?;

    info!(
        transfer_id = %transfer.id,
        company_id = transfer.company_id,
        amount = %transfer.amount,
        status = %transfer.status,
        approver,
        "Pending transfer resolved"
    );
    Ok(transfer)
}

/// The receiving user, an approver of the receiving company, or a super-admin
async fn authorize<G>(gate: &G, transfer: &Transfer, approver: UserId) -> Result<(), LedgerError>
where
    G: PermissionGate + ?Sized,
{
    if transfer.to_scope == Scope::User && transfer.to_user_id == Some(approver) {
        return Ok(());
    }
    let receiving_company = transfer.to_user_company_id.unwrap_or(transfer.company_id);
    gate.require_any(
        approver,
        receiving_company,
        &[Capability::ApproveIncomingTransfers],
    )
    .await
}

async fn apply<T, G>(
    tx: &mut T,
    gate: &G,
    transfer_id: &TransferId,
    approver: UserId,
    decision: Decision,
) -> Result<Transfer, LedgerError>
where
    T: LedgerTx,
    G: PermissionGate + ?Sized,
{
    let mut transfer = tx
        .lock_transfer(transfer_id)
        .await?
        .ok_or_else(|| LedgerError::NotFound(Missing::Transfer(transfer_id.to_string())))?;

    if transfer.status != TransferStatus::Pending {
        return Err(already_processed(&transfer));
    }
    authorize(gate, &transfer, approver).await?;

    // approve credits the receiver, reject refunds the sender
    let ledger = match decision {
        Decision::Approve => transfer.receiver_ledger(),
        Decision::Reject => transfer.sender_ledger(),
    };
    let credited = match ledger {
        Some(key) => Some(credit_checked(tx, &transfer, key).await?),
        None => None,
    };

    let resolution = Resolution {
        status: decision.target(),
        processed_by: approver,
        processed_at: Utc::now(),
        receiver_final_balance: match decision {
            Decision::Approve => credited,
            Decision::Reject => None,
        },
    };
    if !tx.resolve_transfer(transfer_id, &resolution).await? {
        return Err(already_processed(&transfer));
    }

    transfer.status = resolution.status;
    transfer.processed_by = Some(resolution.processed_by);
    transfer.processed_at = Some(resolution.processed_at);
    transfer.receiver_final_balance = resolution.receiver_final_balance;
    Ok(transfer)
}

/// Lock, re-check currency, credit
async fn credit_checked<T: LedgerTx>(
    tx: &mut T,
    transfer: &Transfer,
    key: LedgerKey,
) -> Result<Decimal, LedgerError> {
    let snapshot = tx
        .lock_ledger(key)
        .await?
        .ok_or(LedgerError::NotFound(Missing::from(key)))?;
    currencies_match(&transfer.currency, [&snapshot.currency])?;
    credit_ledger(tx, key, transfer.amount).await
}

fn already_processed(transfer: &Transfer) -> LedgerError {
    LedgerError::AlreadyProcessed {
        transfer_id: transfer.id.to_string(),
        status: transfer.status.to_string(),
    }
}
