//! The ledger store boundary.
//!
//! The store is the only shared mutable resource in the engine. A
//! `{Loan, User, Payment}` mutation group plus its audit entry travels
//! as a single `LedgerCommit` that the store must apply atomically:
//! either every write lands or none does. Optimistic versioning detects
//! conflicting concurrent updates; a version mismatch fails the whole
//! commit and the protocols retry with fresh reads.
//!
//! Implementations must bound every call. A store that cannot answer in
//! time fails with `StoreError::Unavailable` rather than hanging.

use kredo_shared::{LoanId, PaymentId, UserId};
use thiserror::Error;
use uuid::Uuid;

use super::audit::AuditLog;
use super::error::LedgerError;
use super::types::{Loan, Payment, User};

/// The kind of record involved in a store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A user record.
    User,
    /// A loan record.
    Loan,
    /// A payment record.
    Payment,
}

impl RecordKind {
    /// Lowercase name for error messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Loan => "loan",
            Self::Payment => "payment",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by a ledger store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored record's version did not match the expected version.
    #[error("Version conflict on {kind} {id}")]
    VersionConflict {
        /// The record kind.
        kind: RecordKind,
        /// The record ID.
        id: Uuid,
    },

    /// The requested record does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// The record kind.
        kind: RecordKind,
        /// The record ID.
        id: Uuid,
    },

    /// The store is unreachable or the call timed out.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict { .. } => Self::ConcurrentModification,
            StoreError::NotFound { kind, id } => match kind {
                RecordKind::User => Self::UserNotFound(UserId::from_uuid(id)),
                RecordKind::Loan => Self::LoanNotFound(LoanId::from_uuid(id)),
                RecordKind::Payment => Self::PaymentNotFound(PaymentId::from_uuid(id)),
            },
            StoreError::Unavailable(message) => Self::StoreUnavailable(message),
        }
    }
}

/// A record write guarded by an optimistic version check.
///
/// `record` carries the already-incremented version; the store must
/// verify that the currently stored version equals `expected_version`
/// before accepting the write.
#[derive(Debug, Clone)]
pub struct VersionedWrite<T> {
    /// The version the stored record must currently have.
    pub expected_version: i64,
    /// The full record to write, with `version = expected_version + 1`.
    pub record: T,
}

/// The payment portion of a commit.
#[derive(Debug, Clone)]
pub enum PaymentWrite {
    /// Insert a newly created payment (payment application).
    Insert(Payment),
    /// Update an existing payment under a version check (reversal).
    Update(VersionedWrite<Payment>),
}

/// An atomic multi-record commit.
///
/// One loan update, one user update, one payment insert-or-update, and
/// exactly one audit entry, applied together or not at all.
#[derive(Debug, Clone)]
pub struct LedgerCommit {
    /// The loan update.
    pub loan: VersionedWrite<Loan>,
    /// The owning user's aggregate balance update.
    pub user: VersionedWrite<User>,
    /// The payment insert or status update.
    pub payment: PaymentWrite,
    /// The audit entry recording the mutation.
    pub audit: AuditLog,
}

/// Durable, transactional storage for ledger records.
///
/// Point reads return snapshots; `commit` is the only write path.
pub trait LedgerStore {
    /// Loads a user by ID.
    fn load_user(&self, id: UserId) -> Result<User, StoreError>;

    /// Loads a loan by ID.
    fn load_loan(&self, id: LoanId) -> Result<Loan, StoreError>;

    /// Loads a payment by ID.
    fn load_payment(&self, id: PaymentId) -> Result<Payment, StoreError>;

    /// Loads all payments recorded against a loan, in creation order.
    fn load_loan_payments(&self, loan_id: LoanId) -> Result<Vec<Payment>, StoreError>;

    /// Applies a commit atomically.
    ///
    /// All version checks are evaluated before any write; a single
    /// mismatch fails the entire commit with `VersionConflict`.
    fn commit(&self, commit: LedgerCommit) -> Result<(), StoreError>;
}
