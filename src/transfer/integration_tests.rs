//! Integration Tests for the Transfer Engine
//!
//! Full create / approve / reject flows against the in-memory store, so no
//! live database is needed.

use std::str::FromStr;
use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;

use super::*;
use crate::core_types::{CompanyId, UserId};
use crate::error::{LedgerError, Missing};
use crate::ledger::{Company, CurrencyCode, LedgerStore, MemoryLedgerStore};
use crate::permission::{Capability, StaticPermissionGate};

const ACME: CompanyId = 10;
const BETA: CompanyId = 20;
const GAMMA: CompanyId = 30; // USD
const HOLDCO: CompanyId = 40; // holds incoming transfers

const ADMIN: UserId = 1; // every capability in ACME
const ALICE: UserId = 2; // ACME account, 50 EUR
const BOB: UserId = 3; // ACME account, empty
const CAROL: UserId = 4; // BETA account
const DAVE: UserId = 5; // HOLDCO account
const HOLD_APPROVER: UserId = 6;
const MALLORY: UserId = 7; // ACME account, no grants
const ROOT: UserId = 99;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn currency(code: &str) -> CurrencyCode {
    CurrencyCode::parse(code).unwrap()
}

struct TestHarness {
    service: TransferService<MemoryLedgerStore, StaticPermissionGate>,
    store: Arc<MemoryLedgerStore>,
}

impl TestHarness {
    async fn new() -> Self {
        let store = Arc::new(MemoryLedgerStore::new());
        store
            .insert_company(Company::new(ACME, "Acme", currency("EUR"), ADMIN).with_balance(dec("1000")))
            .await;
        store
            .insert_company(Company::new(BETA, "Beta", currency("EUR"), 50).with_balance(dec("500")))
            .await;
        store
            .insert_company(Company::new(GAMMA, "Gamma", currency("USD"), 60).with_balance(dec("300")))
            .await;
        store
            .insert_company(Company::new(HOLDCO, "Holdco", currency("EUR"), 70).holding_incoming())
            .await;

        store.insert_account(ALICE, ACME, dec("50")).await.unwrap();
        store.insert_account(BOB, ACME, Decimal::ZERO).await.unwrap();
        store.insert_account(MALLORY, ACME, dec("10")).await.unwrap();
        store.insert_account(CAROL, BETA, Decimal::ZERO).await.unwrap();
        store.insert_account(DAVE, HOLDCO, Decimal::ZERO).await.unwrap();

        let gate = StaticPermissionGate::new()
            .grant(ADMIN, ACME, &Capability::ALL)
            .grant(
                ALICE,
                ACME,
                &[
                    Capability::TransferUserToSameCompanyUser,
                    Capability::TransferUserToOtherCompanyUser,
                    Capability::TransferUserToOwnCompany,
                    Capability::TransferUserToOtherCompany,
                    Capability::TransferUserToExternal,
                ],
            )
            .grant(
                HOLD_APPROVER,
                HOLDCO,
                &[
                    Capability::ApproveIncomingTransfers,
                    Capability::ViewCompanyTransfers,
                ],
            )
            .grant_super_admin(ROOT);

        Self {
            service: TransferService::new(store.clone(), Arc::new(gate)),
            store,
        }
    }

    async fn company_balance(&self, id: CompanyId) -> Decimal {
        self.service.get_company(id).await.unwrap().balance
    }

    async fn account_balance(&self, user: UserId, company: CompanyId) -> Decimal {
        self.service.get_account(user, company).await.unwrap().balance
    }

    async fn create(
        &self,
        user: UserId,
        request: TransferRequest,
    ) -> Result<TransferOutcome, LedgerError> {
        self.service
            .create_transfer(Initiator::new(user, ACME), request)
            .await
    }

    async fn transfer(&self, id: &TransferId) -> Transfer {
        self.store.get_transfer(id).await.unwrap().unwrap()
    }

    /// Assert a failed call changed nothing
    async fn assert_untouched(&self, total_before: Decimal) {
        assert_eq!(self.store.total_balance().await, total_before);
        assert_eq!(self.store.transfer_count().await, 0);
    }
}

// ========================================================================
// Named Scenarios
// ========================================================================

/// Company pays a same-company user 200 EUR
#[tokio::test]
async fn test_company_to_user_same_happy_path() {
    let h = TestHarness::new().await;

    let req = TransferRequest::new(TransferType::CompanyToUserSame, "EUR", "200")
        .to_user(ALICE, ACME)
        .with_description("bonus");
    let outcome = h.create(ADMIN, req).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.status, TransferStatus::Completed);
    assert_eq!(h.company_balance(ACME).await, dec("800"));
    assert_eq!(h.account_balance(ALICE, ACME).await, dec("250"));

    let t = h.transfer(&outcome.transfer_id).await;
    assert_eq!(t.sender_final_balance, Some(dec("800")));
    assert_eq!(t.receiver_final_balance, Some(dec("250")));
    assert_eq!(t.from_scope, Scope::Company);
    assert_eq!(t.to_scope, Scope::User);
    assert_eq!(t.user_id, None);
    assert_eq!(t.company_id, ACME);
    assert_eq!(t.to_user_id, Some(ALICE));
    assert_eq!(t.to_user_company_id, Some(ACME));
    assert_eq!(t.initiated_by, ADMIN);
    assert_eq!(t.description.as_deref(), Some("bonus"));
}

#[tokio::test]
async fn test_insufficient_balance_changes_nothing() {
    let h = TestHarness::new().await;
    let total = h.store.total_balance().await;

    let req = TransferRequest::new(TransferType::CompanyToUserSame, "EUR", "2000").to_user(ALICE, ACME);
    let err = h.create(ADMIN, req).await.unwrap_err();

    assert_eq!(
        err,
        LedgerError::InsufficientBalance {
            available: dec("1000"),
            requested: dec("2000"),
        }
    );
    assert_eq!(h.company_balance(ACME).await, dec("1000"));
    assert_eq!(h.account_balance(ALICE, ACME).await, dec("50"));
    h.assert_untouched(total).await;
}

#[tokio::test]
async fn test_currency_mismatch_with_request() {
    let h = TestHarness::new().await;
    let total = h.store.total_balance().await;

    let req = TransferRequest::new(TransferType::CompanyToUserSame, "USD", "10").to_user(ALICE, ACME);
    let err = h.create(ADMIN, req).await.unwrap_err();

    assert!(matches!(err, LedgerError::CurrencyMismatch { .. }));
    h.assert_untouched(total).await;
}

#[tokio::test]
async fn test_currency_mismatch_between_ledgers() {
    let h = TestHarness::new().await;
    h.store
        .insert_account_with_currency(BOB, GAMMA, currency("USD"), Decimal::ZERO)
        .await
        .unwrap();
    let total = h.store.total_balance().await;

    // EUR company paying into a USD company's user
    let req = TransferRequest::new(TransferType::CompanyToUserOther, "EUR", "10").to_user(BOB, GAMMA);
    let err = h.create(ADMIN, req).await.unwrap_err();

    assert_eq!(
        err,
        LedgerError::CurrencyMismatch {
            expected: "EUR".into(),
            found: "USD".into(),
        }
    );
    h.assert_untouched(total).await;
}

#[tokio::test]
async fn test_user_to_user_other_same_company_rejected() {
    let h = TestHarness::new().await;
    let total = h.store.total_balance().await;

    let req = TransferRequest::new(TransferType::UserToUserOther, "EUR", "5").to_user(BOB, ACME);
    let err = h.create(ALICE, req).await.unwrap_err();

    assert!(matches!(err, LedgerError::SameEntityNotAllowed(_)));
    h.assert_untouched(total).await;
}

// ========================================================================
// Balance Properties
// ========================================================================

#[tokio::test]
async fn test_internal_transfers_conserve_total() {
    let h = TestHarness::new().await;
    let total = h.store.total_balance().await;

    let requests = [
        (
            ADMIN,
            TransferRequest::new(TransferType::CompanyToUserSame, "EUR", "100").to_user(BOB, ACME),
        ),
        (
            ADMIN,
            TransferRequest::new(TransferType::CompanyToCompanyOther, "EUR", "150.25").to_company(BETA),
        ),
        (
            ADMIN,
            TransferRequest::new(TransferType::CompanyToUserOther, "EUR", "0.75").to_user(CAROL, BETA),
        ),
        (
            ALICE,
            TransferRequest::new(TransferType::UserToUserSame, "EUR", "20").to_user(BOB, ACME),
        ),
        (
            ALICE,
            TransferRequest::new(TransferType::UserToUserOther, "EUR", "10").to_user(CAROL, BETA),
        ),
        (
            ALICE,
            TransferRequest::new(TransferType::UserToCompanySame, "EUR", "5"),
        ),
        (
            ALICE,
            TransferRequest::new(TransferType::UserToCompanyOther, "EUR", "5").to_company(BETA),
        ),
    ];
    for (user, req) in requests {
        let outcome = h.create(user, req).await.unwrap();
        assert_eq!(outcome.status, TransferStatus::Completed);
    }

    assert_eq!(h.store.total_balance().await, total);
    assert_eq!(h.account_balance(ALICE, ACME).await, dec("10"));
    assert_eq!(h.account_balance(BOB, ACME).await, dec("120"));
    assert_eq!(h.account_balance(CAROL, BETA).await, dec("10.75"));
    assert_eq!(h.company_balance(BETA).await, dec("655.25"));
    assert_eq!(h.company_balance(ACME).await, dec("754"));
}

#[tokio::test]
async fn test_external_transfers_move_total_by_amount() {
    let h = TestHarness::new().await;
    let total = h.store.total_balance().await;

    let out = TransferRequest::new(TransferType::CompanyToExternal, "EUR", "100")
        .to_external("Office Supplies Ltd");
    let outcome = h.create(ADMIN, out).await.unwrap();
    assert_eq!(h.store.total_balance().await, total - dec("100"));
    let t = h.transfer(&outcome.transfer_id).await;
    assert_eq!(t.sender_final_balance, Some(dec("900")));
    assert_eq!(t.receiver_final_balance, None);
    assert_eq!(t.to_user_company_id, None);

    let incoming = TransferRequest::new(TransferType::ExternalToUser, "EUR", "25")
        .from_external("Customer Refund")
        .to_user(BOB, ACME);
    let outcome = h.create(ADMIN, incoming).await.unwrap();
    assert_eq!(h.store.total_balance().await, total - dec("75"));
    let t = h.transfer(&outcome.transfer_id).await;
    assert_eq!(t.sender_final_balance, None);
    assert_eq!(t.receiver_final_balance, Some(dec("25")));
    assert_eq!(t.from_external_name.as_deref(), Some("Customer Refund"));

    let out = TransferRequest::new(TransferType::UserToExternal, "EUR", "50").to_external("Landlord");
    h.create(ALICE, out).await.unwrap();
    assert_eq!(h.account_balance(ALICE, ACME).await, Decimal::ZERO);

    let incoming =
        TransferRequest::new(TransferType::ExternalToCompany, "EUR", "0.01").from_external("Bank");
    h.create(ADMIN, incoming).await.unwrap();
    assert_eq!(h.company_balance(ACME).await, dec("900.01"));
}

#[tokio::test]
async fn test_concurrent_debits_never_overdraw() {
    let h = TestHarness::new().await;

    let attempts = (0..25).map(|_| {
        let req = TransferRequest::new(TransferType::CompanyToUserSame, "EUR", "100").to_user(BOB, ACME);
        h.create(ADMIN, req)
    });
    let results = join_all(attempts).await;

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let short = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::InsufficientBalance { .. })))
        .count();
    assert_eq!(ok, 10);
    assert_eq!(short, 15);
    assert_eq!(h.company_balance(ACME).await, Decimal::ZERO);
    assert_eq!(h.account_balance(BOB, ACME).await, dec("1000"));
    assert_eq!(h.store.transfer_count().await, 10);
}

#[tokio::test]
async fn test_concurrent_service_clones_share_state() {
    let h = TestHarness::new().await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = h.service.clone();
            tokio::spawn(async move {
                let req = TransferRequest::new(TransferType::UserToUserSame, "EUR", "10")
                    .to_user(BOB, ACME);
                service.create_transfer(Initiator::new(ALICE, ACME), req).await
            })
        })
        .collect();
    let results = join_all(handles).await;

    let ok = results
        .into_iter()
        .map(|joined| joined.unwrap())
        .filter(|r| r.is_ok())
        .count();
    assert_eq!(ok, 5);
    assert_eq!(h.account_balance(ALICE, ACME).await, Decimal::ZERO);
    assert_eq!(h.account_balance(BOB, ACME).await, dec("50"));
}

// ========================================================================
// Validation Failures (no mutation)
// ========================================================================

#[tokio::test]
async fn test_missing_permission_changes_nothing() {
    let h = TestHarness::new().await;
    let total = h.store.total_balance().await;

    let req = TransferRequest::new(TransferType::CompanyToUserSame, "EUR", "5").to_user(MALLORY, ACME);
    let err = h.create(MALLORY, req).await.unwrap_err();

    assert_eq!(
        err,
        LedgerError::InsufficientPermissions("can_transfer_company_to_same_company_user".into())
    );
    h.assert_untouched(total).await;
}

#[tokio::test]
async fn test_permission_is_per_company() {
    let h = TestHarness::new().await;
    let req = TransferRequest::new(TransferType::CompanyToUserSame, "EUR", "5").to_user(CAROL, BETA);
    let err = h
        .service
        .create_transfer(Initiator::new(ADMIN, BETA), req)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientPermissions(_)));
}

#[tokio::test]
async fn test_amount_above_column_limit_rejected() {
    let h = TestHarness::new().await;
    let total = h.store.total_balance().await;

    let req = TransferRequest::new(TransferType::ExternalToCompany, "EUR", "1000000000000000000")
        .from_external("Client");
    let err = h.create(ADMIN, req).await.unwrap_err();

    assert!(matches!(err, LedgerError::InvalidAmount(_)));
    h.assert_untouched(total).await;
}

#[tokio::test]
async fn test_credit_past_balance_limit_rolls_back() {
    let h = TestHarness::new().await;

    // 1000 + this lands exactly on the limit
    let fill = TransferRequest::new(TransferType::ExternalToCompany, "EUR", "999999999999998999.99")
        .from_external("Client");
    h.create(ADMIN, fill).await.unwrap();
    assert_eq!(h.company_balance(ACME).await, crate::ledger::MAX_AMOUNT);
    let total = h.store.total_balance().await;

    let req = TransferRequest::new(TransferType::ExternalToCompany, "EUR", "0.01")
        .from_external("Client");
    let err = h.create(ADMIN, req).await.unwrap_err();

    assert!(matches!(err, LedgerError::InvalidAmount(_)));
    assert_eq!(h.company_balance(ACME).await, crate::ledger::MAX_AMOUNT);
    assert_eq!(h.store.total_balance().await, total);
    assert_eq!(h.store.transfer_count().await, 1);
}

#[tokio::test]
async fn test_super_admin_passes_every_gate() {
    let h = TestHarness::new().await;
    let req = TransferRequest::new(TransferType::CompanyToUserSame, "EUR", "5").to_user(CAROL, BETA);
    let outcome = h
        .service
        .create_transfer(Initiator::new(ROOT, BETA), req)
        .await
        .unwrap();
    assert_eq!(outcome.status, TransferStatus::Completed);
    assert_eq!(h.company_balance(BETA).await, dec("495"));
}

#[tokio::test]
async fn test_declared_scope_mismatch_changes_nothing() {
    let h = TestHarness::new().await;
    let total = h.store.total_balance().await;

    let req = TransferRequest::new(TransferType::CompanyToUserSame, "EUR", "5")
        .to_user(ALICE, ACME)
        .with_scopes(Scope::User, Scope::User);
    let err = h.create(ADMIN, req).await.unwrap_err();

    assert!(matches!(err, LedgerError::InvalidScopesForType { .. }));
    h.assert_untouched(total).await;
}

#[tokio::test]
async fn test_bad_amounts_change_nothing() {
    let h = TestHarness::new().await;
    let total = h.store.total_balance().await;

    for amount in ["10.505", "0", "-3", "abc", "", "1e2"] {
        let req = TransferRequest::new(TransferType::CompanyToUserSame, "EUR", amount).to_user(ALICE, ACME);
        let err = h.create(ADMIN, req).await.unwrap_err();
        assert!(
            matches!(err, LedgerError::InvalidAmount(_)),
            "{amount:?} gave {err:?}"
        );
    }
    h.assert_untouched(total).await;
}

#[tokio::test]
async fn test_bad_currency_and_type() {
    let h = TestHarness::new().await;

    let req = TransferRequest::new(TransferType::CompanyToUserSame, "eur", "5").to_user(ALICE, ACME);
    assert!(matches!(
        h.create(ADMIN, req).await,
        Err(LedgerError::InvalidCurrency(_))
    ));

    let mut req = TransferRequest::new(TransferType::CompanyToUserSame, "EUR", "5").to_user(ALICE, ACME);
    req.transfer_type = Some("company_to_user".into());
    assert!(matches!(
        h.create(ADMIN, req).await,
        Err(LedgerError::InvalidTransferType(_))
    ));
}

#[tokio::test]
async fn test_unknown_receiver_is_not_found() {
    let h = TestHarness::new().await;
    let total = h.store.total_balance().await;

    let req = TransferRequest::new(TransferType::UserToUserSame, "EUR", "5").to_user(1234, ACME);
    let err = h.create(ALICE, req).await.unwrap_err();

    assert_eq!(
        err,
        LedgerError::NotFound(Missing::Account {
            user_id: 1234,
            company_id: ACME
        })
    );
    h.assert_untouched(total).await;
}

#[tokio::test]
async fn test_sender_without_account_is_not_found() {
    let h = TestHarness::new().await;
    // ADMIN holds the capability but has no ACME account
    let req = TransferRequest::new(TransferType::UserToExternal, "EUR", "5").to_external("Shop");
    let err = h.create(ADMIN, req).await.unwrap_err();
    assert_eq!(
        err,
        LedgerError::NotFound(Missing::Account {
            user_id: ADMIN,
            company_id: ACME
        })
    );
}

// ========================================================================
// Held Transfers (Approval State Machine)
// ========================================================================

async fn hold_into_holdco(h: &TestHarness, amount: &str) -> TransferId {
    let req = TransferRequest::new(TransferType::CompanyToCompanyOther, "EUR", amount).to_company(HOLDCO);
    let outcome = h.create(ADMIN, req).await.unwrap();
    assert_eq!(outcome.status, TransferStatus::Pending);
    outcome.transfer_id
}

#[tokio::test]
async fn test_held_transfer_debits_sender_only() {
    let h = TestHarness::new().await;
    let id = hold_into_holdco(&h, "100").await;

    assert_eq!(h.company_balance(ACME).await, dec("900"));
    assert_eq!(h.company_balance(HOLDCO).await, Decimal::ZERO);

    let t = h.transfer(&id).await;
    assert_eq!(t.status, TransferStatus::Pending);
    assert_eq!(t.sender_final_balance, Some(dec("900")));
    assert_eq!(t.receiver_final_balance, None);
    assert_eq!(t.processed_by, None);
}

#[tokio::test]
async fn test_approve_credits_receiver() {
    let h = TestHarness::new().await;
    let id = hold_into_holdco(&h, "100").await;

    let t = h.service.approve_transfer(HOLD_APPROVER, &id).await.unwrap();
    assert_eq!(t.status, TransferStatus::Completed);
    assert_eq!(t.receiver_final_balance, Some(dec("100")));
    assert_eq!(t.processed_by, Some(HOLD_APPROVER));
    assert!(t.processed_at.is_some());

    assert_eq!(h.company_balance(HOLDCO).await, dec("100"));
    assert_eq!(h.transfer(&id).await, t);
}

#[tokio::test]
async fn test_reject_refunds_sender() {
    let h = TestHarness::new().await;
    let total = h.store.total_balance().await;
    let id = hold_into_holdco(&h, "100").await;

    let t = h.service.reject_transfer(HOLD_APPROVER, &id).await.unwrap();
    assert_eq!(t.status, TransferStatus::Rejected);
    assert_eq!(t.status.as_str(), "reject");
    assert_eq!(t.sender_final_balance, Some(dec("900")));
    assert_eq!(t.receiver_final_balance, None);

    assert_eq!(h.company_balance(ACME).await, dec("1000"));
    assert_eq!(h.company_balance(HOLDCO).await, Decimal::ZERO);
    assert_eq!(h.store.total_balance().await, total);
}

#[tokio::test]
async fn test_resolved_transfer_is_already_processed() {
    let h = TestHarness::new().await;
    let id = hold_into_holdco(&h, "100").await;
    h.service.approve_transfer(HOLD_APPROVER, &id).await.unwrap();
    let total = h.store.total_balance().await;

    for result in [
        h.service.approve_transfer(HOLD_APPROVER, &id).await,
        h.service.reject_transfer(HOLD_APPROVER, &id).await,
    ] {
        assert!(matches!(
            result,
            Err(LedgerError::AlreadyProcessed { ref status, .. }) if status == "completed"
        ));
    }
    assert_eq!(h.store.total_balance().await, total);
    assert_eq!(h.transfer(&id).await.status, TransferStatus::Completed);
}

#[tokio::test]
async fn test_completed_on_creation_cannot_be_approved() {
    let h = TestHarness::new().await;
    let req = TransferRequest::new(TransferType::CompanyToUserSame, "EUR", "1").to_user(ALICE, ACME);
    let outcome = h.create(ADMIN, req).await.unwrap();

    let err = h
        .service
        .reject_transfer(ROOT, &outcome.transfer_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyProcessed { .. }));
    assert_eq!(h.account_balance(ALICE, ACME).await, dec("51"));
}

#[tokio::test]
async fn test_unauthorized_approver_leaves_pending() {
    let h = TestHarness::new().await;
    let id = hold_into_holdco(&h, "100").await;

    let err = h.service.approve_transfer(ALICE, &id).await.unwrap_err();
    assert_eq!(
        err,
        LedgerError::InsufficientPermissions("can_approve_incoming_transfers".into())
    );
    // the sender cannot approve its own outgoing transfer either
    assert!(h.service.approve_transfer(ADMIN, &id).await.is_err());

    assert_eq!(h.transfer(&id).await.status, TransferStatus::Pending);
    assert_eq!(h.company_balance(HOLDCO).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_receiving_user_may_approve() {
    let h = TestHarness::new().await;
    let req = TransferRequest::new(TransferType::CompanyToUserOther, "EUR", "40").to_user(DAVE, HOLDCO);
    let outcome = h.create(ADMIN, req).await.unwrap();
    assert_eq!(outcome.status, TransferStatus::Pending);

    let t = h
        .service
        .approve_transfer(DAVE, &outcome.transfer_id)
        .await
        .unwrap();
    assert_eq!(t.receiver_final_balance, Some(dec("40")));
    assert_eq!(h.account_balance(DAVE, HOLDCO).await, dec("40"));
}

#[tokio::test]
async fn test_super_admin_may_reject() {
    let h = TestHarness::new().await;
    let id = hold_into_holdco(&h, "1").await;
    let t = h.service.reject_transfer(ROOT, &id).await.unwrap();
    assert_eq!(t.processed_by, Some(ROOT));
}

#[tokio::test]
async fn test_approve_unknown_transfer() {
    let h = TestHarness::new().await;
    let id = TransferId::new();
    let err = h.service.approve_transfer(ROOT, &id).await.unwrap_err();
    assert_eq!(err, LedgerError::NotFound(Missing::Transfer(id.to_string())));
}

// ========================================================================
// Idempotency & Reads
// ========================================================================

#[tokio::test]
async fn test_duplicate_cid_returns_original() {
    let h = TestHarness::new().await;
    let req = TransferRequest::new(TransferType::CompanyToUserSame, "EUR", "30")
        .to_user(ALICE, ACME)
        .with_cid("payroll-2026-10-alice");

    let first = h.create(ADMIN, req.clone()).await.unwrap();
    let second = h.create(ADMIN, req).await.unwrap();

    assert_eq!(first.transfer_id, second.transfer_id);
    assert_eq!(h.company_balance(ACME).await, dec("970"));
    assert_eq!(h.store.transfer_count().await, 1);
}

#[tokio::test]
async fn test_cid_of_another_initiator_rejected() {
    let h = TestHarness::new().await;
    let cid = "rent-2026-10";
    let admin_req = TransferRequest::new(TransferType::CompanyToUserSame, "EUR", "30")
        .to_user(BOB, ACME)
        .with_cid(cid);
    h.create(ADMIN, admin_req).await.unwrap();

    let alice_req = TransferRequest::new(TransferType::UserToUserSame, "EUR", "5")
        .to_user(BOB, ACME)
        .with_cid(cid);
    let err = h.create(ALICE, alice_req).await.unwrap_err();

    assert!(matches!(err, LedgerError::InvalidQuery(_)));
    assert_eq!(h.account_balance(ALICE, ACME).await, dec("50"));
    assert_eq!(h.store.transfer_count().await, 1);
}

#[tokio::test]
async fn test_get_transfer_is_idempotent() {
    let h = TestHarness::new().await;
    let req = TransferRequest::new(TransferType::UserToUserSame, "EUR", "12.34").to_user(BOB, ACME);
    let outcome = h.create(ALICE, req).await.unwrap();

    let a = h.service.get_transfer(ALICE, &outcome.transfer_id).await.unwrap();
    let b = h.service.get_transfer(ALICE, &outcome.transfer_id).await.unwrap();
    assert_eq!(a, b);
    // the receiving user is a party too
    assert_eq!(
        h.service.get_transfer(BOB, &outcome.transfer_id).await.unwrap(),
        a
    );
}

#[tokio::test]
async fn test_get_transfer_hidden_from_outsiders() {
    let h = TestHarness::new().await;
    let req = TransferRequest::new(TransferType::UserToUserSame, "EUR", "1").to_user(BOB, ACME);
    let outcome = h.create(ALICE, req).await.unwrap();

    let err = h
        .service
        .get_transfer(MALLORY, &outcome.transfer_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientPermissions(_)));
    // company viewers see it
    assert!(h.service.get_transfer(ADMIN, &outcome.transfer_id).await.is_ok());
}

#[tokio::test]
async fn test_list_transfers() {
    let h = TestHarness::new().await;
    for amount in ["1", "2", "3"] {
        let req = TransferRequest::new(TransferType::CompanyToUserSame, "EUR", amount).to_user(BOB, ACME);
        h.create(ADMIN, req).await.unwrap();
    }
    hold_into_holdco(&h, "4").await;

    let all = h
        .service
        .list_transfers(ADMIN, ACME, &TransferQuery::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let pending = TransferQuery {
        status: Some("pending".into()),
        ..Default::default()
    };
    let held = h.service.list_transfers(ADMIN, ACME, &pending).await.unwrap();
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].amount, dec("4"));

    // the receiving company sees the held transfer in its own history
    let incoming = h
        .service
        .list_transfers(HOLD_APPROVER, HOLDCO, &TransferQuery::default())
        .await
        .unwrap();
    assert_eq!(incoming.len(), 1);

    let limited = TransferQuery {
        limit: 2,
        ..Default::default()
    };
    assert_eq!(
        h.service.list_transfers(ADMIN, ACME, &limited).await.unwrap().len(),
        2
    );

    assert!(matches!(
        h.service
            .list_transfers(MALLORY, ACME, &TransferQuery::default())
            .await,
        Err(LedgerError::InsufficientPermissions(_))
    ));
}

#[tokio::test]
async fn test_open_account_then_receive() {
    let h = TestHarness::new().await;
    const ERIN: UserId = 8;

    let account = h.service.open_account(ERIN, ACME).await.unwrap();
    assert_eq!(account.balance, Decimal::ZERO);
    assert_eq!(account.currency, currency("EUR"));
    let again = h.service.open_account(ERIN, ACME).await.unwrap();
    assert_eq!(account.id, again.id);

    let req = TransferRequest::new(TransferType::CompanyToUserSame, "EUR", "7").to_user(ERIN, ACME);
    h.create(ADMIN, req).await.unwrap();
    assert_eq!(h.account_balance(ERIN, ACME).await, dec("7"));

    assert_eq!(
        h.service.open_account(ERIN, 404).await.unwrap_err(),
        LedgerError::NotFound(Missing::Company(404))
    );
}
