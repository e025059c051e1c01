//! Ledger domain records and the loan status state machine.
//!
//! The three mutable records tracked by the engine (`User`, `Loan`,
//! `Payment`) each carry a `version` counter used for optimistic
//! concurrency control at the store boundary.

use chrono::{DateTime, NaiveDate, Utc};
use kredo_shared::{LoanId, PaymentId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// A borrower with a denormalized aggregate balance.
///
/// Identity fields live in the auth subsystem; the engine owns and
/// mutates only `outstanding_balance`, which must equal the sum of the
/// user's loan outstanding amounts at all times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user ID.
    pub id: UserId,
    /// Sum of outstanding amounts over this user's loans (non-negative).
    pub outstanding_balance: Decimal,
    /// Optimistic concurrency version.
    pub version: i64,
}

impl User {
    /// Creates a user record with the given aggregate balance.
    #[must_use]
    pub fn new(id: UserId, outstanding_balance: Decimal) -> Self {
        Self {
            id,
            outstanding_balance,
            version: 0,
        }
    }
}

/// Loan lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// Requested but not yet approved.
    Pending,
    /// Approved and carrying an outstanding balance.
    Active,
    /// Fully repaid (outstanding amount is zero).
    Completed,
    /// Request was rejected; no balance is ever owed.
    Rejected,
}

/// Events that drive the loan status state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanEvent {
    /// An approval flow accepted the loan request.
    Approved,
    /// An approval flow declined the loan request.
    Rejected,
    /// A payment reduced the outstanding amount to zero.
    PaidInFull,
    /// A reversal reintroduced outstanding balance.
    PaymentReversed,
}

impl LoanStatus {
    /// Returns true if payments may be applied in this status.
    ///
    /// The source system listed both active and pending loans as payable;
    /// completed and rejected loans are not.
    #[must_use]
    pub fn is_payable(self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }

    /// Applies a lifecycle event, returning the new status.
    ///
    /// Valid transitions:
    /// - Pending → Active (approved)
    /// - Pending → Rejected (rejected)
    /// - Pending | Active → Completed (paid in full)
    /// - Pending | Active | Completed → Active (payment reversed)
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidTransition` for any other pair.
    pub fn transition(self, event: LoanEvent) -> Result<Self, LedgerError> {
        match (self, event) {
            (Self::Pending, LoanEvent::Approved) => Ok(Self::Active),
            (Self::Pending, LoanEvent::Rejected) => Ok(Self::Rejected),
            (Self::Pending | Self::Active, LoanEvent::PaidInFull) => Ok(Self::Completed),
            (Self::Pending | Self::Active | Self::Completed, LoanEvent::PaymentReversed) => {
                Ok(Self::Active)
            }
            (from, event) => Err(LedgerError::InvalidTransition { from, event }),
        }
    }

    /// Stable string form used in audit snapshots.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for LoanEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::PaidInFull => "paid_in_full",
            Self::PaymentReversed => "payment_reversed",
        };
        f.write_str(s)
    }
}

/// A loan issued to a single borrower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    /// The loan ID.
    pub id: LoanId,
    /// The borrower who owns this loan.
    pub user_id: UserId,
    /// Original loan amount; immutable after creation.
    pub principal_amount: Decimal,
    /// Unpaid remainder, `0 ..= principal_amount`.
    pub outstanding_amount: Decimal,
    /// Lifecycle status.
    pub status: LoanStatus,
    /// Optional repayment due date.
    pub due_date: Option<NaiveDate>,
    /// Optimistic concurrency version.
    pub version: i64,
}

impl Loan {
    /// Creates a pending loan with the full principal outstanding.
    #[must_use]
    pub fn new(id: LoanId, user_id: UserId, principal_amount: Decimal) -> Self {
        Self {
            id,
            user_id,
            principal_amount,
            outstanding_amount: principal_amount,
            status: LoanStatus::Pending,
            due_date: None,
            version: 0,
        }
    }

    /// Returns true if nothing remains outstanding.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.outstanding_amount.is_zero()
    }
}

/// Payment settlement status.
///
/// The only permitted transition is `Completed → Reversed`, exactly
/// once. A payment is never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Applied against the loan.
    Completed,
    /// Financial effect undone; the record is preserved for audit.
    Reversed,
}

impl PaymentStatus {
    /// Stable string form used in audit snapshots.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Reversed => "reversed",
        }
    }
}

/// Why a payment was reversed.
///
/// Fixed vocabulary from the operator UI, with `Other` carrying free
/// text that must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReversalReason {
    /// The underlying bank payment failed.
    PaymentFailed,
    /// The payment was recorded twice.
    DuplicatePayment,
    /// The recorded amount was wrong.
    IncorrectAmount,
    /// The customer asked for the payment to be undone.
    CustomerRequest,
    /// Any other reason, described in free text.
    Other(String),
}

impl ReversalReason {
    /// Validates that the reason carries the required detail.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::MissingReversalReason` when `Other` has
    /// empty or whitespace-only text.
    pub fn validate(&self) -> Result<(), LedgerError> {
        match self {
            Self::Other(text) if text.trim().is_empty() => {
                Err(LedgerError::MissingReversalReason)
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for ReversalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PaymentFailed => f.write_str("Payment failed"),
            Self::DuplicatePayment => f.write_str("Duplicate payment"),
            Self::IncorrectAmount => f.write_str("Incorrect amount"),
            Self::CustomerRequest => f.write_str("Customer request"),
            Self::Other(text) => f.write_str(text),
        }
    }
}

/// A payment applied against a loan.
///
/// Denormalizes `user_id` from the owning loan. `amount` is fixed at
/// creation; reversal is a status transition, never a deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// The payment ID.
    pub id: PaymentId,
    /// The loan this payment settles.
    pub loan_id: LoanId,
    /// The borrower owning the loan (denormalized).
    pub user_id: UserId,
    /// Positive payment amount, immutable.
    pub amount: Decimal,
    /// Free-text external reference; not guaranteed globally unique.
    pub transaction_id: String,
    /// Settlement status.
    pub status: PaymentStatus,
    /// The operator who recorded the payment.
    pub processed_by: UserId,
    /// Set only when the payment is reversed.
    pub reversal_reason: Option<ReversalReason>,
    /// Set only when the payment is reversed.
    pub reversed_at: Option<DateTime<Utc>>,
    /// Optional uploaded receipt reference.
    pub receipt_url: Option<String>,
    /// When the payment was recorded.
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency version.
    pub version: i64,
}
