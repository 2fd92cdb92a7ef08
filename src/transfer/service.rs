//! Transfer Service
//!
//! Facade over the dispatcher, the approval state machine and the read
//! paths. Handlers hold one of these behind an `Arc`.

use std::sync::Arc;

use tracing::debug;

use super::approval::{self, Decision};
use super::dispatcher;
use super::state::TransferStatus;
use super::types::{Initiator, Transfer, TransferId, TransferOutcome, TransferQuery, TransferRequest};
use crate::core_types::{CompanyId, UserId};
use crate::error::{LedgerError, Missing};
use crate::ledger::{Account, Company, LedgerStore, LedgerTx};
use crate::permission::{Capability, PermissionGate};

pub struct TransferService<S, G: ?Sized> {
    store: Arc<S>,
    gate: Arc<G>,
}

impl<S, G: ?Sized> Clone for TransferService<S, G> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gate: self.gate.clone(),
        }
    }
}

impl<S, G> TransferService<S, G>
where
    S: LedgerStore,
    G: PermissionGate + ?Sized,
{
    pub fn new(store: Arc<S>, gate: Arc<G>) -> Self {
        Self { store, gate }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Classify, authorize, validate and apply one transfer
    pub async fn create_transfer(
        &self,
        initiator: Initiator,
        request: TransferRequest,
    ) -> Result<TransferOutcome, LedgerError> {
        let transfer =
            dispatcher::dispatch(self.store.as_ref(), self.gate.as_ref(), initiator, &request)
                .await?;

        let message = match transfer.status {
            TransferStatus::Pending => "Transfer pending approval by the receiving company",
            TransferStatus::Completed => "Transfer completed",
            TransferStatus::Rejected => "Transfer rejected",
        };
        Ok(TransferOutcome {
            success: true,
            transfer_id: transfer.id,
            status: transfer.status,
            message: message.to_string(),
        })
    }

    /// Parties to the transfer, or viewers of either company involved
    pub async fn get_transfer(
        &self,
        caller: UserId,
        transfer_id: &TransferId,
    ) -> Result<Transfer, LedgerError> {
        let transfer = self
            .store
            .get_transfer(transfer_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(Missing::Transfer(transfer_id.to_string())))?;

        let is_party = transfer.initiated_by == caller
            || transfer.user_id == Some(caller)
            || transfer.to_user_id == Some(caller);
        if is_party {
            return Ok(transfer);
        }

        let mut companies = vec![transfer.company_id];
        companies.extend(transfer.to_user_company_id);
        companies.dedup();
        for company_id in companies {
            if self
                .gate
                .has_any_role(caller, company_id, &[Capability::ViewCompanyTransfers])
                .await?
            {
                return Ok(transfer);
            }
        }

        debug!(transfer_id = %transfer_id, caller, "Transfer hidden from caller");
        Err(LedgerError::InsufficientPermissions(
            Capability::ViewCompanyTransfers.to_string(),
        ))
    }

    /// Company history, newest first
    pub async fn list_transfers(
        &self,
        caller: UserId,
        company_id: CompanyId,
        query: &TransferQuery,
    ) -> Result<Vec<Transfer>, LedgerError> {
        self.gate
            .require_any(caller, company_id, &[Capability::ViewCompanyTransfers])
            .await?;
        self.store.list_transfers(company_id, query).await
    }

    pub async fn approve_transfer(
        &self,
        approver: UserId,
        transfer_id: &TransferId,
    ) -> Result<Transfer, LedgerError> {
        approval::decide(
            self.store.as_ref(),
            self.gate.as_ref(),
            transfer_id,
            approver,
            Decision::Approve,
        )
        .await
    }

    pub async fn reject_transfer(
        &self,
        approver: UserId,
        transfer_id: &TransferId,
    ) -> Result<Transfer, LedgerError> {
        approval::decide(
            self.store.as_ref(),
            self.gate.as_ref(),
            transfer_id,
            approver,
            Decision::Reject,
        )
        .await
    }

    pub async fn get_company(&self, company_id: CompanyId) -> Result<Company, LedgerError> {
        self.store
            .get_company(company_id)
            .await?
            .ok_or(LedgerError::NotFound(Missing::Company(company_id)))
    }

    pub async fn get_account(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<Account, LedgerError> {
        self.store
            .get_account(user_id, company_id)
            .await?
            .ok_or(LedgerError::NotFound(Missing::Account {
                user_id,
                company_id,
            }))
    }

    /// Idempotent; the account takes the company's currency
    pub async fn open_account(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<Account, LedgerError> {
        let mut tx = self.store.begin().await?;
        let result = tx
            .open_account(user_id, company_id)
            .await
            .and_then(|account| account.ok_or(LedgerError::NotFound(Missing::Company(company_id))));
        super::coordinator::settle(tx, result).await
    }

    pub async fn health_check(&self) -> Result<(), LedgerError> {
        self.store.health_check().await
    }
}
