//! In-memory ledger store.
//!
//! All tables live behind a single mutex, so a commit is trivially
//! atomic: version checks and writes happen under one lock acquisition.
//! Reads return cloned snapshots.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::trace;

use kredo_core::ledger::audit::AuditLog;
use kredo_core::ledger::store::{
    LedgerCommit, LedgerStore, PaymentWrite, RecordKind, StoreError,
};
use kredo_core::ledger::types::{Loan, Payment, User};
use kredo_shared::{LoanId, PaymentId, UserId};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    loans: HashMap<LoanId, Loan>,
    payments: HashMap<PaymentId, Payment>,
    /// Payment IDs in insertion order, for per-loan history queries.
    payment_order: Vec<PaymentId>,
    audit: Vec<AuditLog>,
}

/// An in-process, thread-safe ledger store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user record, replacing any existing record with the same ID.
    pub fn insert_user(&self, user: User) {
        self.inner.lock().users.insert(user.id, user);
    }

    /// Seeds a loan record, replacing any existing record with the same ID.
    pub fn insert_loan(&self, loan: Loan) {
        self.inner.lock().loans.insert(loan.id, loan);
    }

    /// Seeds a payment record, replacing any existing record with the
    /// same ID.
    pub fn insert_payment(&self, payment: Payment) {
        let mut tables = self.inner.lock();
        if !tables.payments.contains_key(&payment.id) {
            tables.payment_order.push(payment.id);
        }
        tables.payments.insert(payment.id, payment);
    }

    /// Returns a snapshot of a user record, if present.
    #[must_use]
    pub fn user(&self, id: UserId) -> Option<User> {
        self.inner.lock().users.get(&id).cloned()
    }

    /// Returns a snapshot of a loan record, if present.
    #[must_use]
    pub fn loan(&self, id: LoanId) -> Option<Loan> {
        self.inner.lock().loans.get(&id).cloned()
    }

    /// Returns a snapshot of a payment record, if present.
    #[must_use]
    pub fn payment(&self, id: PaymentId) -> Option<Payment> {
        self.inner.lock().payments.get(&id).cloned()
    }

    /// Returns all payments in insertion order.
    #[must_use]
    pub fn payments(&self) -> Vec<Payment> {
        let tables = self.inner.lock();
        tables
            .payment_order
            .iter()
            .filter_map(|id| tables.payments.get(id))
            .cloned()
            .collect()
    }

    /// Returns the audit trail in write order.
    #[must_use]
    pub fn audit_entries(&self) -> Vec<AuditLog> {
        self.inner.lock().audit.clone()
    }
}

impl LedgerStore for MemoryStore {
    fn load_user(&self, id: UserId) -> Result<User, StoreError> {
        self.inner
            .lock()
            .users
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                kind: RecordKind::User,
                id: id.into_inner(),
            })
    }

    fn load_loan(&self, id: LoanId) -> Result<Loan, StoreError> {
        self.inner
            .lock()
            .loans
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                kind: RecordKind::Loan,
                id: id.into_inner(),
            })
    }

    fn load_payment(&self, id: PaymentId) -> Result<Payment, StoreError> {
        self.inner
            .lock()
            .payments
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                kind: RecordKind::Payment,
                id: id.into_inner(),
            })
    }

    fn load_loan_payments(&self, loan_id: LoanId) -> Result<Vec<Payment>, StoreError> {
        let tables = self.inner.lock();
        Ok(tables
            .payment_order
            .iter()
            .filter_map(|id| tables.payments.get(id))
            .filter(|payment| payment.loan_id == loan_id)
            .cloned()
            .collect())
    }

    fn commit(&self, commit: LedgerCommit) -> Result<(), StoreError> {
        let mut tables = self.inner.lock();

        // Every version check runs before any write, so a failed commit
        // leaves the tables untouched.
        let stored_loan =
            tables
                .loans
                .get(&commit.loan.record.id)
                .ok_or(StoreError::NotFound {
                    kind: RecordKind::Loan,
                    id: commit.loan.record.id.into_inner(),
                })?;
        if stored_loan.version != commit.loan.expected_version {
            return Err(StoreError::VersionConflict {
                kind: RecordKind::Loan,
                id: commit.loan.record.id.into_inner(),
            });
        }

        let stored_user =
            tables
                .users
                .get(&commit.user.record.id)
                .ok_or(StoreError::NotFound {
                    kind: RecordKind::User,
                    id: commit.user.record.id.into_inner(),
                })?;
        if stored_user.version != commit.user.expected_version {
            return Err(StoreError::VersionConflict {
                kind: RecordKind::User,
                id: commit.user.record.id.into_inner(),
            });
        }

        match &commit.payment {
            PaymentWrite::Insert(payment) => {
                if tables.payments.contains_key(&payment.id) {
                    return Err(StoreError::VersionConflict {
                        kind: RecordKind::Payment,
                        id: payment.id.into_inner(),
                    });
                }
            }
            PaymentWrite::Update(write) => {
                let stored =
                    tables
                        .payments
                        .get(&write.record.id)
                        .ok_or(StoreError::NotFound {
                            kind: RecordKind::Payment,
                            id: write.record.id.into_inner(),
                        })?;
                if stored.version != write.expected_version {
                    return Err(StoreError::VersionConflict {
                        kind: RecordKind::Payment,
                        id: write.record.id.into_inner(),
                    });
                }
            }
        }

        trace!(
            loan_id = %commit.loan.record.id,
            user_id = %commit.user.record.id,
            action = %commit.audit.action_type,
            "applying commit"
        );

        tables
            .loans
            .insert(commit.loan.record.id, commit.loan.record);
        tables
            .users
            .insert(commit.user.record.id, commit.user.record);
        match commit.payment {
            PaymentWrite::Insert(payment) => {
                tables.payment_order.push(payment.id);
                tables.payments.insert(payment.id, payment);
            }
            PaymentWrite::Update(write) => {
                tables.payments.insert(write.record.id, write.record);
            }
        }
        tables.audit.push(commit.audit);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_load_missing_records() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.load_user(UserId::new()),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.load_loan(LoanId::new()),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.load_payment(PaymentId::new()),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_seed_and_load_round_trip() {
        let store = MemoryStore::new();
        let user = User::new(UserId::new(), dec!(500));
        let loan = Loan::new(LoanId::new(), user.id, dec!(500));
        store.insert_user(user.clone());
        store.insert_loan(loan.clone());

        assert_eq!(store.load_user(user.id).unwrap(), user);
        assert_eq!(store.load_loan(loan.id).unwrap(), loan);
        assert!(store.load_loan_payments(loan.id).unwrap().is_empty());
    }
}
