//! Ledger error types for validation, state, integrity, and store errors.
//!
//! The taxonomy follows the recovery contract: validation and not-found
//! errors are rejected before any store write, `ConcurrentModification`
//! is retryable, and store errors are fatal to the call with no partial
//! commit left behind.

use kredo_shared::{LoanId, PaymentId, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::{LoanEvent, LoanStatus};

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Payment amount must be positive.
    #[error("Payment amount must be positive")]
    InvalidAmount,

    /// Payment amount exceeds the loan's outstanding amount.
    #[error("Payment amount {amount} exceeds outstanding amount {outstanding}")]
    ExceedsOutstanding {
        /// The requested payment amount.
        amount: Decimal,
        /// The loan's current outstanding amount.
        outstanding: Decimal,
    },

    /// A transaction reference is required.
    #[error("A transaction reference is required")]
    MissingTransactionRef,

    /// A loan term must cover at least one month.
    #[error("Loan term must be at least one month")]
    InvalidTerm,

    /// A reversal reason is required.
    #[error("A reversal reason is required")]
    MissingReversalReason,

    /// The loan is not in a status that accepts payments.
    #[error("Loan {loan_id} is {status} and cannot accept payments")]
    LoanNotPayable {
        /// The loan ID.
        loan_id: LoanId,
        /// The loan's current status.
        status: LoanStatus,
    },

    // ========== State Machine Errors ==========
    /// Invalid loan status transition.
    #[error("Invalid loan transition from {from} on {event}")]
    InvalidTransition {
        /// The current status.
        from: LoanStatus,
        /// The event that was applied.
        event: LoanEvent,
    },

    /// A reversed payment cannot be reversed again.
    #[error("Payment {0} has already been reversed")]
    AlreadyReversed(PaymentId),

    /// The loan has no completed payment left to reverse.
    #[error("Loan {0} has no completed payment to reverse")]
    NoReversiblePayment(LoanId),

    // ========== Not Found Errors ==========
    /// Loan not found.
    #[error("Loan not found: {0}")]
    LoanNotFound(LoanId),

    /// Payment not found.
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// User not found.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    // ========== Integrity Errors ==========
    /// A mutation would leave a loan with negative outstanding amount.
    #[error("Mutation would leave loan {loan_id} with negative outstanding amount")]
    NegativeOutstanding {
        /// The loan ID.
        loan_id: LoanId,
    },

    /// A mutation would push the outstanding amount above the principal.
    #[error(
        "Mutation would leave loan {loan_id} with outstanding {outstanding} above principal {principal}"
    )]
    OutstandingExceedsPrincipal {
        /// The loan ID.
        loan_id: LoanId,
        /// The outstanding amount after the mutation.
        outstanding: Decimal,
        /// The immutable principal amount.
        principal: Decimal,
    },

    /// A mutation would leave a user with a negative aggregate balance.
    #[error("Mutation would leave user {user_id} with a negative balance")]
    NegativeUserBalance {
        /// The user ID.
        user_id: UserId,
    },

    /// Loan and user balance deltas disagree.
    #[error("Unbalanced mutation: loan delta {loan_delta}, user delta {user_delta}")]
    UnbalancedMutation {
        /// Change to the loan's outstanding amount.
        loan_delta: Decimal,
        /// Change to the user's aggregate balance.
        user_delta: Decimal,
    },

    /// Loan status disagrees with its outstanding amount.
    #[error("Loan {loan_id} status {status} disagrees with outstanding amount {outstanding}")]
    StatusOutstandingMismatch {
        /// The loan ID.
        loan_id: LoanId,
        /// The loan status after the mutation.
        status: LoanStatus,
        /// The outstanding amount after the mutation.
        outstanding: Decimal,
    },

    /// A mutation attempted to change the immutable principal amount.
    #[error("Principal amount of loan {loan_id} is immutable")]
    PrincipalChanged {
        /// The loan ID.
        loan_id: LoanId,
    },

    // ========== Reconciliation Errors ==========
    /// The bank transaction was already matched in this session.
    #[error("Bank transaction {transaction_id} is already matched in this session")]
    TransactionAlreadyMatched {
        /// The external bank transaction ID.
        transaction_id: String,
    },

    /// The statement line index does not exist in this session.
    #[error("No statement line at index {index}")]
    UnknownStatementLine {
        /// The requested line index.
        index: usize,
    },

    /// The loan is not in the session's candidate list.
    #[error("Loan {0} is not a reconciliation candidate")]
    LoanNotCandidate(LoanId),

    /// A required statement column is missing.
    #[error("Statement is missing required column: {column}")]
    MissingColumn {
        /// The canonical column name.
        column: &'static str,
    },

    /// A statement line could not be parsed.
    #[error("Malformed statement line {line}: {message}")]
    MalformedStatementLine {
        /// 1-based line number within the statement.
        line: usize,
        /// What went wrong.
        message: String,
    },

    // ========== Concurrency Errors ==========
    /// Concurrent modification detected.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    // ========== Store Errors ==========
    /// The ledger store is unreachable or timed out.
    #[error("Ledger store unavailable: {0}")]
    StoreUnavailable(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::ExceedsOutstanding { .. } => "EXCEEDS_OUTSTANDING",
            Self::MissingTransactionRef => "MISSING_TRANSACTION_REF",
            Self::InvalidTerm => "INVALID_TERM",
            Self::MissingReversalReason => "MISSING_REVERSAL_REASON",
            Self::LoanNotPayable { .. } => "LOAN_NOT_PAYABLE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::NoReversiblePayment(_) => "NO_REVERSIBLE_PAYMENT",
            Self::LoanNotFound(_) => "LOAN_NOT_FOUND",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::NegativeOutstanding { .. } => "NEGATIVE_OUTSTANDING",
            Self::OutstandingExceedsPrincipal { .. } => "OUTSTANDING_EXCEEDS_PRINCIPAL",
            Self::NegativeUserBalance { .. } => "NEGATIVE_USER_BALANCE",
            Self::UnbalancedMutation { .. } => "UNBALANCED_MUTATION",
            Self::StatusOutstandingMismatch { .. } => "STATUS_OUTSTANDING_MISMATCH",
            Self::PrincipalChanged { .. } => "PRINCIPAL_CHANGED",
            Self::TransactionAlreadyMatched { .. } => "TRANSACTION_ALREADY_MATCHED",
            Self::UnknownStatementLine { .. } => "UNKNOWN_STATEMENT_LINE",
            Self::LoanNotCandidate(_) => "LOAN_NOT_CANDIDATE",
            Self::MissingColumn { .. } => "MISSING_COLUMN",
            Self::MalformedStatementLine { .. } => "MALFORMED_STATEMENT_LINE",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount
            | Self::ExceedsOutstanding { .. }
            | Self::MissingTransactionRef
            | Self::InvalidTerm
            | Self::MissingReversalReason
            | Self::LoanNotPayable { .. }
            | Self::InvalidTransition { .. }
            | Self::NoReversiblePayment(_)
            | Self::TransactionAlreadyMatched { .. }
            | Self::UnknownStatementLine { .. }
            | Self::LoanNotCandidate(_)
            | Self::MissingColumn { .. }
            | Self::MalformedStatementLine { .. } => 400,

            // 404 Not Found
            Self::LoanNotFound(_) | Self::PaymentNotFound(_) | Self::UserNotFound(_) => 404,

            // 409 Conflict - concurrency and single-use violations
            Self::AlreadyReversed(_) | Self::ConcurrentModification => 409,

            // 422 Unprocessable - integrity violations detected pre-commit
            Self::NegativeOutstanding { .. }
            | Self::OutstandingExceedsPrincipal { .. }
            | Self::NegativeUserBalance { .. }
            | Self::UnbalancedMutation { .. }
            | Self::StatusOutstandingMismatch { .. }
            | Self::PrincipalChanged { .. } => 422,

            // 500 Internal Server Error
            Self::StoreUnavailable(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error is retryable by the caller.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }
}
