//! Bulk mark-paid and bulk reversal against `MemoryStore`.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use kredo_core::ledger::audit::AuditAction;
use kredo_core::ledger::error::LedgerError;
use kredo_core::ledger::events::NoopSink;
use kredo_core::ledger::store::{LedgerCommit, LedgerStore, StoreError};
use kredo_core::ledger::types::{Loan, LoanStatus, Payment, ReversalReason, User};
use kredo_core::payment::BulkCoordinator;
use kredo_shared::{LoanId, PaymentId, UserId};
use kredo_store::MemoryStore;

fn seed_loan(store: &MemoryStore, amount: Decimal) -> Loan {
    let user_id = UserId::new();
    let mut loan = Loan::new(LoanId::new(), user_id, amount);
    loan.status = LoanStatus::Active;
    store.insert_user(User::new(user_id, amount));
    store.insert_loan(loan.clone());
    loan
}

#[test]
fn bulk_mark_paid_settles_every_loan() {
    let store = MemoryStore::new();
    let loans = [
        seed_loan(&store, dec!(100)),
        seed_loan(&store, dec!(200)),
        seed_loan(&store, dec!(300)),
    ];
    let ids: BTreeSet<LoanId> = loans.iter().map(|loan| loan.id).collect();

    let result = BulkCoordinator::mark_paid(&store, &NoopSink, &ids, UserId::new());

    assert!(result.is_complete());
    assert_eq!(result.succeeded.len(), 3);
    for loan in &loans {
        let stored = store.loan(loan.id).unwrap();
        assert_eq!(stored.status, LoanStatus::Completed);
        assert_eq!(stored.outstanding_amount, dec!(0));
        assert_eq!(store.user(loan.user_id).unwrap().outstanding_balance, dec!(0));
    }

    let audit = store.audit_entries();
    assert_eq!(audit.len(), 3);
    assert!(
        audit
            .iter()
            .all(|entry| entry.action_type == AuditAction::BulkPaymentsMarkedPaid)
    );
    assert!(
        store
            .payments()
            .iter()
            .all(|payment| payment.transaction_id.starts_with("BULK-"))
    );
}

/// Fails every commit touching one specific loan.
struct FailingStore {
    inner: MemoryStore,
    poisoned: LoanId,
}

impl LedgerStore for FailingStore {
    fn load_user(&self, id: UserId) -> Result<User, StoreError> {
        self.inner.load_user(id)
    }

    fn load_loan(&self, id: LoanId) -> Result<Loan, StoreError> {
        self.inner.load_loan(id)
    }

    fn load_payment(&self, id: PaymentId) -> Result<Payment, StoreError> {
        self.inner.load_payment(id)
    }

    fn load_loan_payments(&self, loan_id: LoanId) -> Result<Vec<Payment>, StoreError> {
        self.inner.load_loan_payments(loan_id)
    }

    fn commit(&self, commit: LedgerCommit) -> Result<(), StoreError> {
        if commit.loan.record.id == self.poisoned {
            return Err(StoreError::Unavailable("write failed".to_string()));
        }
        self.inner.commit(commit)
    }
}

#[test]
fn bulk_mark_paid_continues_past_failures() {
    let inner = MemoryStore::new();
    let good_a = seed_loan(&inner, dec!(100));
    let bad = seed_loan(&inner, dec!(200));
    let good_b = seed_loan(&inner, dec!(300));
    let store = FailingStore {
        inner,
        poisoned: bad.id,
    };
    let ids: BTreeSet<LoanId> = [good_a.id, bad.id, good_b.id].into_iter().collect();

    let result = BulkCoordinator::mark_paid(&store, &NoopSink, &ids, UserId::new());

    assert_eq!(result.succeeded.len(), 2);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].loan_id, bad.id);
    assert!(matches!(
        result.failed[0].error,
        LedgerError::StoreUnavailable(_)
    ));

    // The failed loan is untouched; the others settled.
    assert_eq!(store.inner.loan(bad.id).unwrap().outstanding_amount, dec!(200));
    assert_eq!(store.inner.loan(good_a.id).unwrap().outstanding_amount, dec!(0));
    assert_eq!(store.inner.loan(good_b.id).unwrap().outstanding_amount, dec!(0));
    assert_eq!(store.inner.audit_entries().len(), 2);
}

#[test]
fn bulk_mark_paid_skips_settled_loans() {
    let store = MemoryStore::new();
    let open = seed_loan(&store, dec!(100));
    let mut settled = Loan::new(LoanId::new(), UserId::new(), dec!(500));
    settled.outstanding_amount = dec!(0);
    settled.status = LoanStatus::Completed;
    store.insert_user(User::new(settled.user_id, dec!(0)));
    store.insert_loan(settled.clone());
    let ids: BTreeSet<LoanId> = [open.id, settled.id].into_iter().collect();

    let result = BulkCoordinator::mark_paid(&store, &NoopSink, &ids, UserId::new());

    assert_eq!(result.succeeded.len(), 1);
    assert_eq!(result.succeeded[0].loan_id, open.id);
    assert_eq!(result.failed.len(), 1);
    assert!(matches!(
        result.failed[0].error,
        LedgerError::LoanNotPayable { .. }
    ));
}

#[test]
fn bulk_reversal_undoes_latest_payment_per_loan() {
    let store = MemoryStore::new();
    let loan_a = seed_loan(&store, dec!(100));
    let loan_b = seed_loan(&store, dec!(200));
    let ids: BTreeSet<LoanId> = [loan_a.id, loan_b.id].into_iter().collect();

    let paid = BulkCoordinator::mark_paid(&store, &NoopSink, &ids, UserId::new());
    assert!(paid.is_complete());

    let result = BulkCoordinator::reverse_latest(
        &store,
        &NoopSink,
        &ids,
        &ReversalReason::IncorrectAmount,
        UserId::new(),
    );

    assert!(result.is_complete());
    assert_eq!(result.succeeded.len(), 2);
    for loan in [&loan_a, &loan_b] {
        let stored = store.loan(loan.id).unwrap();
        assert_eq!(stored.status, LoanStatus::Active);
        assert_eq!(stored.outstanding_amount, loan.outstanding_amount);
    }

    let audit = store.audit_entries();
    assert_eq!(audit.len(), 4);
    assert_eq!(
        audit
            .iter()
            .filter(|entry| entry.action_type == AuditAction::BulkPaymentsReversed)
            .count(),
        2
    );
}

#[test]
fn bulk_reversal_fails_loans_with_no_completed_payment() {
    let store = MemoryStore::new();
    let unpaid = seed_loan(&store, dec!(100));
    let ids: BTreeSet<LoanId> = [unpaid.id].into_iter().collect();

    let result = BulkCoordinator::reverse_latest(
        &store,
        &NoopSink,
        &ids,
        &ReversalReason::Other("entered against wrong account".to_string()),
        UserId::new(),
    );

    assert!(result.succeeded.is_empty());
    assert_eq!(result.failed.len(), 1);
    assert!(matches!(
        result.failed[0].error,
        LedgerError::NoReversiblePayment(_)
    ));
}
