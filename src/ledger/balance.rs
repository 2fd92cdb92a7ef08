//! Balance primitives
//!
//! The only code paths that change a balance. Each runs inside the caller's
//! transaction; none commits.

use rust_decimal::Decimal;
use tracing::debug;

use super::models::{DebitOutcome, LedgerKey};
use super::store::LedgerTx;
use super::validation::ensure_positive;
use crate::core_types::{CompanyId, UserId};
use crate::error::{LedgerError, Missing};

fn missing(key: LedgerKey) -> LedgerError {
    LedgerError::NotFound(Missing::from(key))
}

/// Credit any ledger; returns the balance after the credit
pub async fn credit_ledger<T>(
    tx: &mut T,
    key: LedgerKey,
    amount: Decimal,
) -> Result<Decimal, LedgerError>
where
    T: LedgerTx + ?Sized,
{
    ensure_positive(amount)?;
    let balance = tx.credit(key, amount).await?.ok_or_else(|| missing(key))?;
    debug!(ledger = %key, %amount, %balance, "credited");
    Ok(balance)
}

/// Debit any ledger if the balance covers `amount`; returns the balance after the debit
pub async fn debit_ledger<T>(
    tx: &mut T,
    key: LedgerKey,
    amount: Decimal,
) -> Result<Decimal, LedgerError>
where
    T: LedgerTx + ?Sized,
{
    ensure_positive(amount)?;
    match tx.debit(key, amount).await? {
        DebitOutcome::Applied(balance) => {
            debug!(ledger = %key, %amount, %balance, "debited");
            Ok(balance)
        }
        DebitOutcome::Insufficient(available) => Err(LedgerError::InsufficientBalance {
            available,
            requested: amount,
        }),
        DebitOutcome::Missing => Err(missing(key)),
    }
}

pub async fn add_company_balance<T>(
    tx: &mut T,
    company_id: CompanyId,
    amount: Decimal,
) -> Result<Decimal, LedgerError>
where
    T: LedgerTx + ?Sized,
{
    credit_ledger(tx, LedgerKey::Company(company_id), amount).await
}

pub async fn deduct_company_balance<T>(
    tx: &mut T,
    company_id: CompanyId,
    amount: Decimal,
) -> Result<Decimal, LedgerError>
where
    T: LedgerTx + ?Sized,
{
    debit_ledger(tx, LedgerKey::Company(company_id), amount).await
}

pub async fn add_account_balance<T>(
    tx: &mut T,
    user_id: UserId,
    company_id: CompanyId,
    amount: Decimal,
) -> Result<Decimal, LedgerError>
where
    T: LedgerTx + ?Sized,
{
    credit_ledger(tx, LedgerKey::account(user_id, company_id), amount).await
}

pub async fn deduct_account_balance<T>(
    tx: &mut T,
    user_id: UserId,
    company_id: CompanyId,
    amount: Decimal,
) -> Result<Decimal, LedgerError>
where
    T: LedgerTx + ?Sized,
{
    debit_ledger(tx, LedgerKey::account(user_id, company_id), amount).await
}
