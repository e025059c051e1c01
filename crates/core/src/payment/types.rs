//! Input and output types for the payment protocols.

use kredo_shared::{LoanId, PaymentId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::audit::AuditAction;
use crate::ledger::types::{Loan, Payment, ReversalReason, User};

/// How a payment entered the system.
///
/// The origin selects the audit action and metadata so bulk and
/// reconciled payments stay distinguishable in audit history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOrigin {
    /// A single operator-entered payment.
    Manual,
    /// One item of a bulk mark-paid operation.
    Bulk,
    /// A payment applied by matching a bank statement line.
    Reconciliation {
        /// The external bank transaction ID being matched.
        bank_transaction_id: String,
    },
}

impl PaymentOrigin {
    /// The audit action recorded for a payment from this origin.
    #[must_use]
    pub fn applied_action(&self) -> AuditAction {
        match self {
            Self::Manual | Self::Reconciliation { .. } => AuditAction::PaymentMarkedPaid,
            Self::Bulk => AuditAction::BulkPaymentsMarkedPaid,
        }
    }
}

/// Where a reversal was initiated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReversalOrigin {
    /// A single operator-initiated reversal.
    Manual,
    /// One item of a bulk reversal operation.
    Bulk,
}

impl ReversalOrigin {
    /// The audit action recorded for a reversal from this origin.
    #[must_use]
    pub fn reversed_action(self) -> AuditAction {
        match self {
            Self::Manual => AuditAction::PaymentReversed,
            Self::Bulk => AuditAction::BulkPaymentsReversed,
        }
    }
}

/// Input for applying a single payment.
#[derive(Debug, Clone)]
pub struct ApplyPaymentInput {
    /// The loan to pay against.
    pub loan_id: LoanId,
    /// The payment amount; must be positive and at most the loan's
    /// outstanding amount.
    pub amount: Decimal,
    /// External transaction reference (free text, required).
    pub transaction_ref: String,
    /// The operator recording the payment.
    pub actor: UserId,
    /// Optional uploaded receipt reference.
    pub receipt_url: Option<String>,
    /// How the payment entered the system.
    pub origin: PaymentOrigin,
}

/// Result of a successful payment application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedPayment {
    /// The created payment row.
    pub payment: Payment,
    /// The loan after the update.
    pub loan: Loan,
    /// The user after the update.
    pub user: User,
    /// True if the user aggregate was clamped at zero. Indicates the
    /// aggregate had already drifted below the sum of loan balances.
    pub user_clamped: bool,
}

/// Input for reversing a previously applied payment.
#[derive(Debug, Clone)]
pub struct ReversePaymentInput {
    /// The payment to reverse.
    pub payment_id: PaymentId,
    /// Why the payment is being reversed (required).
    pub reason: ReversalReason,
    /// The operator performing the reversal.
    pub actor: UserId,
    /// Where the reversal was initiated from.
    pub origin: ReversalOrigin,
}

/// Result of a successful reversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversedPayment {
    /// The payment after the status transition.
    pub payment: Payment,
    /// The loan after the update (always reopened to active).
    pub loan: Loan,
    /// The user after the update.
    pub user: User,
}
