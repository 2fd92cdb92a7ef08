//! Transaction Coordinator
//!
//! Every multi-step ledger mutation runs as begin → work → commit. On any
//! error the transaction is rolled back explicitly before the error
//! propagates, so a failed transfer leaves no trace.

use tracing::{error, warn};

use crate::error::LedgerError;
use crate::ledger::LedgerTx;

/// Finish a unit of work started with `LedgerStore::begin`.
///
/// - `Ok`: commit. A commit failure means the outcome is unknown; callers
///   re-query by id before retrying.
/// - `Err`: roll back, then return the original error. A failed rollback is
///   logged, never surfaced in place of the original error.
pub async fn settle<T, R>(tx: T, result: Result<R, LedgerError>) -> Result<R, LedgerError>
where
    T: LedgerTx,
{
    match result {
        Ok(value) => match tx.commit().await {
            Ok(()) => Ok(value),
            Err(e) => {
                error!(error = %e, "Commit failed - transfer outcome unknown");
                Err(LedgerError::StorageFailure(format!(
                    "commit failed, outcome unknown: {}",
                    e
                )))
            }
        },
        Err(cause) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(
                    error = %rollback_err,
                    cause = %cause,
                    "Rollback failed after aborted operation"
                );
            }
            Err(cause)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::core_types::{CompanyId, UserId};
    use crate::ledger::{
        Account, DebitOutcome, LedgerKey, LedgerSnapshot, MemoryLedgerStore, Resolution,
    };
    use crate::ledger::{Company, CurrencyCode, LedgerStore};
    use crate::transfer::{Transfer, TransferId};

    /// Tx whose commit / rollback can be told to fail
    #[derive(Default)]
    struct ScriptedTx {
        commits: Arc<AtomicUsize>,
        rollbacks: Arc<AtomicUsize>,
        fail_commit: bool,
        fail_rollback: bool,
    }

    #[async_trait]
    impl LedgerTx for ScriptedTx {
        async fn lock_ledger(
            &mut self,
            _key: LedgerKey,
        ) -> Result<Option<LedgerSnapshot>, LedgerError> {
            Ok(None)
        }
        async fn credit(
            &mut self,
            _key: LedgerKey,
            _amount: Decimal,
        ) -> Result<Option<Decimal>, LedgerError> {
            Ok(None)
        }
        async fn debit(
            &mut self,
            _key: LedgerKey,
            _amount: Decimal,
        ) -> Result<DebitOutcome, LedgerError> {
            Ok(DebitOutcome::Missing)
        }
        async fn open_account(
            &mut self,
            _user_id: UserId,
            _company_id: CompanyId,
        ) -> Result<Option<Account>, LedgerError> {
            Ok(None)
        }
        async fn insert_transfer(&mut self, _transfer: &Transfer) -> Result<(), LedgerError> {
            Ok(())
        }
        async fn lock_transfer(
            &mut self,
            _id: &TransferId,
        ) -> Result<Option<Transfer>, LedgerError> {
            Ok(None)
        }
        async fn resolve_transfer(
            &mut self,
            _id: &TransferId,
            _resolution: &Resolution,
        ) -> Result<bool, LedgerError> {
            Ok(false)
        }
        async fn commit(self) -> Result<(), LedgerError> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            if self.fail_commit {
                Err(LedgerError::StorageFailure("connection reset".into()))
            } else {
                Ok(())
            }
        }
        async fn rollback(self) -> Result<(), LedgerError> {
            self.rollbacks.fetch_add(1, Ordering::SeqCst);
            if self.fail_rollback {
                Err(LedgerError::StorageFailure("connection reset".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_ok_commits() {
        let tx = ScriptedTx::default();
        let commits = tx.commits.clone();
        let rollbacks = tx.rollbacks.clone();

        assert_eq!(settle(tx, Ok(7)).await.unwrap(), 7);
        assert_eq!(commits.load(Ordering::SeqCst), 1);
        assert_eq!(rollbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_err_rolls_back_and_keeps_cause() {
        let tx = ScriptedTx {
            fail_rollback: true,
            ..Default::default()
        };
        let commits = tx.commits.clone();
        let rollbacks = tx.rollbacks.clone();

        let cause = LedgerError::MissingRequiredField("currency");
        let err = settle::<_, ()>(tx, Err(cause.clone())).await.unwrap_err();
        assert_eq!(err, cause);
        assert_eq!(commits.load(Ordering::SeqCst), 0);
        assert_eq!(rollbacks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_commit_failure_is_outcome_unknown() {
        let tx = ScriptedTx {
            fail_commit: true,
            ..Default::default()
        };
        let err = settle(tx, Ok(())).await.unwrap_err();
        match err {
            LedgerError::StorageFailure(msg) => assert!(msg.contains("outcome unknown")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rollback_restores_memory_store() {
        let store = MemoryLedgerStore::new();
        let eur = CurrencyCode::parse("EUR").unwrap();
        store
            .insert_company(Company::new(1, "Acme", eur, 10).with_balance(Decimal::from(100)))
            .await;

        let mut tx = store.begin().await.unwrap();
        tx.credit(LedgerKey::Company(1), Decimal::from(50))
            .await
            .unwrap();
        let result: Result<(), _> = Err(LedgerError::InvalidAmount("late failure".into()));
        assert!(settle(tx, result).await.is_err());

        assert_eq!(store.total_balance().await, Decimal::from(100));
    }
}
