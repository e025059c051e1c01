//! Audit log records emitted by ledger-mutating operations.
//!
//! Every successful commit carries exactly one `AuditLog` entry, written
//! in the same atomic unit as the record mutations. Entries are
//! append-only: never mutated, never deleted.

use chrono::{DateTime, Utc};
use kredo_shared::{AuditLogId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

/// The action that produced an audit entry.
///
/// Bulk actions are distinct from their single-item counterparts so that
/// audit history can distinguish bulk from manual operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A single payment was applied.
    PaymentMarkedPaid,
    /// A single payment was reversed.
    PaymentReversed,
    /// A loan request was created.
    LoanCreated,
    /// A loan request was approved.
    LoanApproved,
    /// A loan request was rejected.
    LoanRejected,
    /// A payment was applied as part of a bulk operation.
    BulkPaymentsMarkedPaid,
    /// A payment was reversed as part of a bulk operation.
    BulkPaymentsReversed,
    /// A user record was created.
    UserCreated,
    /// A user record was updated.
    UserUpdated,
}

impl AuditAction {
    /// Stable string form matching the stored `action_type` column.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PaymentMarkedPaid => "payment_marked_paid",
            Self::PaymentReversed => "payment_reversed",
            Self::LoanCreated => "loan_created",
            Self::LoanApproved => "loan_approved",
            Self::LoanRejected => "loan_rejected",
            Self::BulkPaymentsMarkedPaid => "bulk_payments_marked_paid",
            Self::BulkPaymentsReversed => "bulk_payments_reversed",
            Self::UserCreated => "user_created",
            Self::UserUpdated => "user_updated",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of record an audit entry targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditTarget {
    /// A loan record.
    Loan,
    /// A payment record.
    Payment,
    /// A user record.
    User,
    /// A bulk operation as a whole.
    Bulk,
}

impl AuditTarget {
    /// Stable string form matching the stored `target_type` column.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loan => "loan",
            Self::Payment => "payment",
            Self::User => "user",
            Self::Bulk => "bulk",
        }
    }
}

/// An immutable audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    /// The entry ID.
    pub id: AuditLogId,
    /// Who performed the action. The engine records the identity it is
    /// given; it does not authenticate.
    pub actor_id: UserId,
    /// What was done.
    pub action_type: AuditAction,
    /// The kind of record targeted.
    pub target_type: AuditTarget,
    /// The targeted record's ID.
    pub target_id: Uuid,
    /// Snapshot of relevant fields before the mutation.
    pub old_value: Option<Value>,
    /// Snapshot of relevant fields after the mutation.
    pub new_value: Option<Value>,
    /// Operator-supplied reason, where the action requires one.
    pub reason: Option<String>,
    /// Structured context (bulk/reconciliation markers, loan linkage).
    pub metadata: Value,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    /// Creates an entry with empty snapshots and metadata.
    #[must_use]
    pub fn new(
        actor_id: UserId,
        action_type: AuditAction,
        target_type: AuditTarget,
        target_id: Uuid,
    ) -> Self {
        Self {
            id: AuditLogId::new(),
            actor_id,
            action_type,
            target_type,
            target_id,
            old_value: None,
            new_value: None,
            reason: None,
            metadata: json!({}),
            created_at: Utc::now(),
        }
    }

    /// Attaches the before-mutation snapshot.
    #[must_use]
    pub fn with_old_value(mut self, value: Value) -> Self {
        self.old_value = Some(value);
        self
    }

    /// Attaches the after-mutation snapshot.
    #[must_use]
    pub fn with_new_value(mut self, value: Value) -> Self {
        self.new_value = Some(value);
        self
    }

    /// Attaches the operator-supplied reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Replaces the metadata object.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}
