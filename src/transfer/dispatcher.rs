//! Transfer Type Dispatcher
//!
//! One parameterized handler for all eleven transfer types. The rule row
//! decides scopes, tenancy and the permission to check; the handler never
//! matches on the type itself.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, info};

use super::coordinator;
use super::rules::{Tenancy, TransferRule, rule_for};
use super::state::TransferStatus;
use super::types::{Initiator, Scope, Transfer, TransferId, TransferRequest, TransferType};
use crate::core_types::{CompanyId, UserId};
use crate::error::{LedgerError, Missing};
use crate::ledger::balance::{credit_ledger, debit_ledger};
use crate::ledger::{
    CurrencyCode, LedgerKey, LedgerSnapshot, LedgerStore, LedgerTx, currencies_match,
    validate_amount,
};
use crate::permission::PermissionGate;

/// Who sends and who receives, resolved against the caller's company
#[derive(Debug, Clone, PartialEq)]
pub struct Parties {
    pub sender: Option<LedgerKey>,
    pub receiver: Option<LedgerKey>,
    /// Sending user (user-scoped senders only)
    pub user_id: Option<UserId>,
    pub to_user_id: Option<UserId>,
    /// Receiving company (internal receivers only)
    pub to_user_company_id: Option<CompanyId>,
    pub from_external_name: Option<String>,
    pub to_external_name: Option<String>,
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, LedgerError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(LedgerError::MissingRequiredField(field))
}

/// Steps 1-2: required fields and rule lookup
pub fn classify(request: &TransferRequest) -> Result<&'static TransferRule, LedgerError> {
    let raw_type = required(&request.transfer_type, "transfer_type")?;
    required(&request.currency, "currency")?;
    let transfer_type: TransferType = raw_type.parse()?;
    Ok(rule_for(transfer_type))
}

/// Declared scopes, when supplied, must equal the rule's scopes
pub fn check_declared_scopes(
    rule: &TransferRule,
    request: &TransferRequest,
) -> Result<(), LedgerError> {
    let mismatch = |from: &str, to: &str| LedgerError::InvalidScopesForType {
        transfer_type: rule.transfer_type.to_string(),
        from_scope: from.to_string(),
        to_scope: to.to_string(),
    };

    let from = request.from_scope.as_deref();
    let to = request.to_scope.as_deref();
    let from_ok = from.is_none_or(|s| s.parse::<Scope>() == Ok(rule.from));
    let to_ok = to.is_none_or(|s| s.parse::<Scope>() == Ok(rule.to));
    if from_ok && to_ok {
        Ok(())
    } else {
        Err(mismatch(
            from.unwrap_or(rule.from.as_str()),
            to.unwrap_or(rule.to.as_str()),
        ))
    }
}

/// Steps 3-4: identity fields, then tenancy
pub fn resolve_parties(
    rule: &TransferRule,
    initiator: Initiator,
    request: &TransferRequest,
) -> Result<Parties, LedgerError> {
    // identity
    let from_external_name = match rule.from {
        Scope::External => Some(required(&request.from_external_name, "from_external_name")?),
        _ => None,
    };
    let to_external_name = match rule.to {
        Scope::External => Some(required(&request.to_external_name, "to_external_name")?),
        _ => None,
    };
    let to_user_id = match rule.to {
        Scope::User => Some(
            request
                .to_user_id
                .ok_or(LedgerError::MissingRequiredField("to_user_id"))?,
        ),
        _ => None,
    };
    if rule.tenancy == Tenancy::Other && request.to_user_company_id.is_none() {
        return Err(LedgerError::MissingRequiredField("to_user_company_id"));
    }

    // tenancy
    let home = initiator.company_id;
    let receiving_company = match rule.tenancy {
        Tenancy::Same => match request.to_user_company_id {
            Some(other) if other != home => {
                return Err(LedgerError::InvalidScopesForType {
                    transfer_type: rule.transfer_type.to_string(),
                    from_scope: rule.from.to_string(),
                    to_scope: format!("{} in company {}", rule.to, other),
                });
            }
            _ => Some(home),
        },
        Tenancy::Other => match request.to_user_company_id {
            Some(other) if other == home => {
                return Err(LedgerError::SameEntityNotAllowed(format!(
                    "{} requires a company other than {}",
                    rule.transfer_type, home
                )));
            }
            other => other,
        },
        Tenancy::Unbounded => None,
    };

    let sender = match rule.from {
        Scope::Company => Some(LedgerKey::Company(home)),
        Scope::User => Some(LedgerKey::account(initiator.user_id, home)),
        Scope::External => None,
    };
    let receiver = match (rule.to, receiving_company) {
        (Scope::Company, Some(company_id)) => Some(LedgerKey::Company(company_id)),
        (Scope::User, Some(company_id)) => {
            to_user_id.map(|user_id| LedgerKey::account(user_id, company_id))
        }
        _ => None,
    };

    if sender.is_some() && sender == receiver {
        return Err(LedgerError::SameEntityNotAllowed(
            "cannot transfer to the sending ledger".into(),
        ));
    }

    Ok(Parties {
        sender,
        receiver,
        user_id: (rule.from == Scope::User).then_some(initiator.user_id),
        to_user_id,
        to_user_company_id: receiving_company,
        from_external_name: from_external_name.map(str::to_string),
        to_external_name: to_external_name.map(str::to_string),
    })
}

/// Full create flow: checks, idempotency lookup, then the atomic unit
pub async fn dispatch<S, G>(
    store: &S,
    gate: &G,
    initiator: Initiator,
    request: &TransferRequest,
) -> Result<Transfer, LedgerError>
where
    S: LedgerStore,
    G: PermissionGate + ?Sized,
{
    let rule = classify(request)?;
    gate.require_any(initiator.user_id, initiator.company_id, &[rule.permission])
        .await?;
    check_declared_scopes(rule, request)?;
    let parties = resolve_parties(rule, initiator, request)?;
    let currency = CurrencyCode::parse(required(&request.currency, "currency")?)?;

    if let Some(cid) = request.cid.as_deref().filter(|c| !c.is_empty()) {
        if let Some(existing) = store.find_transfer_by_cid(initiator.company_id, cid).await? {
            if existing.initiated_by != initiator.user_id {
                return Err(LedgerError::InvalidQuery(format!(
                    "cid '{}' is already used by another initiator",
                    cid
                )));
            }
            info!(
                transfer_id = %existing.id,
                company_id = initiator.company_id,
                cid = %cid,
                "Transfer with cid already exists - returning existing record"
            );
            return Ok(existing);
        }
    }

    let mut tx = store.begin().await?;
    let result = execute(&mut tx, rule, initiator, request, &parties, &currency).await;
    let transfer = coordinator::settle(tx, result).await?;

    info!(
        transfer_id = %transfer.id,
        company_id = transfer.company_id,
        transfer_type = %transfer.transfer_type,
        amount = %transfer.amount,
        status = %transfer.status,
        "Transfer created"
    );
    Ok(transfer)
}

/// Step 5, inside the caller's transaction
async fn execute<T: LedgerTx>(
    tx: &mut T,
    rule: &TransferRule,
    initiator: Initiator,
    request: &TransferRequest,
    parties: &Parties,
    currency: &CurrencyCode,
) -> Result<Transfer, LedgerError> {
    let snapshots = lock_in_order(tx, [parties.sender, parties.receiver]).await?;
    currencies_match(currency, snapshots.values().map(|s| &s.currency))?;

    let amount = validate_amount(&request.amount)?;

    let sender_final_balance = match parties.sender {
        Some(key) => Some(debit_ledger(tx, key, amount).await?),
        None => None,
    };

    let held = parties
        .receiver
        .and_then(|key| snapshots.get(&key))
        .is_some_and(|snap| !snap.auto_approve_incoming);

    let receiver_final_balance = match parties.receiver {
        Some(key) if !held => Some(credit_ledger(tx, key, amount).await?),
        _ => None,
    };

    let status = if held {
        TransferStatus::Pending
    } else {
        TransferStatus::Completed
    };
    let now = Utc::now();

    let transfer = Transfer {
        id: TransferId::new(),
        cid: request.cid.clone().filter(|c| !c.is_empty()),
        user_id: parties.user_id,
        company_id: initiator.company_id,
        to_user_id: parties.to_user_id,
        to_user_company_id: parties.to_user_company_id,
        from_scope: rule.from,
        to_scope: rule.to,
        amount,
        currency: currency.clone(),
        transfer_type: rule.transfer_type,
        status,
        from_external_name: parties.from_external_name.clone(),
        to_external_name: parties.to_external_name.clone(),
        description: request.description.clone(),
        sender_final_balance,
        receiver_final_balance,
        initiated_by: initiator.user_id,
        processed_by: (!held).then_some(initiator.user_id),
        processed_at: (!held).then_some(now),
        created_at: now,
        files: request.files.clone(),
    };
    tx.insert_transfer(&transfer).await?;

    debug!(transfer_id = %transfer.id, held, "Transfer record inserted");
    Ok(transfer)
}

/// Lock each present ledger once, smallest key first
async fn lock_in_order<T: LedgerTx>(
    tx: &mut T,
    keys: [Option<LedgerKey>; 2],
) -> Result<BTreeMap<LedgerKey, LedgerSnapshot>, LedgerError> {
    let mut ordered: Vec<LedgerKey> = keys.into_iter().flatten().collect();
    ordered.sort();
    ordered.dedup();

    let mut snapshots = BTreeMap::new();
    for key in ordered {
        let snap = tx
            .lock_ledger(key)
            .await?
            .ok_or(LedgerError::NotFound(Missing::from(key)))?;
        snapshots.insert(key, snap);
    }
    Ok(snapshots)
}
