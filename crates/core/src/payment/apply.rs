//! Payment application protocol.
//!
//! Applies a single payment as one atomic state transition across the
//! payment row, the loan, the user aggregate, and the audit trail.
//! Conflicting concurrent updates are detected by the store's version
//! checks; the protocol retries a bounded number of times with fresh
//! reads before surfacing `ConcurrentModification`.

use chrono::Utc;
use kredo_shared::PaymentId;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::ledger::audit::{AuditLog, AuditTarget};
use crate::ledger::error::LedgerError;
use crate::ledger::events::{EventSink, LedgerEvent};
use crate::ledger::invariant::InvariantChecker;
use crate::ledger::store::{LedgerCommit, LedgerStore, PaymentWrite, StoreError, VersionedWrite};
use crate::ledger::types::{Loan, LoanEvent, Payment, PaymentStatus, User};

use super::types::{AppliedPayment, ApplyPaymentInput, PaymentOrigin};

/// How many times a protocol retries after a version conflict before
/// surfacing `ConcurrentModification` to the caller.
pub const MAX_CONFLICT_RETRIES: u32 = 3;

/// Stateless service implementing the payment application protocol.
pub struct PaymentService;

impl PaymentService {
    /// Applies a payment against a loan.
    ///
    /// Preconditions: positive amount, non-empty transaction reference,
    /// payable loan status, and `amount <= outstanding_amount`. An
    /// overpayment is a caller error and is rejected, never clamped.
    ///
    /// On success exactly one payment row, one loan update, one user
    /// update, and one audit entry are committed together, and a
    /// `PaymentApplied` event is published fire-and-forget.
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `MissingTransactionRef`, `LoanNotFound`,
    /// `LoanNotPayable`, `ExceedsOutstanding`, `ConcurrentModification`
    /// (after exhausting retries), or `StoreUnavailable`.
    pub fn apply<S: LedgerStore>(
        store: &S,
        events: &dyn EventSink,
        input: &ApplyPaymentInput,
    ) -> Result<AppliedPayment, LedgerError> {
        Self::validate(input)?;

        let mut attempts = 0;
        loop {
            attempts += 1;

            let loan = store.load_loan(input.loan_id)?;
            let user = store.load_user(loan.user_id)?;
            let (commit, applied) = Self::plan(&loan, &user, input)?;

            if applied.user_clamped {
                warn!(
                    user_id = %user.id,
                    loan_id = %loan.id,
                    amount = %input.amount,
                    balance = %user.outstanding_balance,
                    "user aggregate clamped at zero; balance has drifted from loan sum"
                );
            }

            match store.commit(commit) {
                Ok(()) => {
                    info!(
                        payment_id = %applied.payment.id,
                        loan_id = %applied.loan.id,
                        amount = %input.amount,
                        outstanding = %applied.loan.outstanding_amount,
                        "payment applied"
                    );
                    events.publish(&LedgerEvent::PaymentApplied {
                        payment_id: applied.payment.id,
                        loan_id: applied.loan.id,
                        user_id: applied.user.id,
                        amount: applied.payment.amount,
                        outstanding_after: applied.loan.outstanding_amount,
                    });
                    return Ok(applied);
                }
                Err(StoreError::VersionConflict { .. }) if attempts < MAX_CONFLICT_RETRIES => {
                    debug!(loan_id = %input.loan_id, attempts, "version conflict, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Validates input fields that need no store access.
    fn validate(input: &ApplyPaymentInput) -> Result<(), LedgerError> {
        if input.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        if input.transaction_ref.trim().is_empty() {
            return Err(LedgerError::MissingTransactionRef);
        }
        Ok(())
    }

    /// Builds the atomic commit for one payment application.
    ///
    /// Pure: reads nothing, writes nothing. The invariant checker gates
    /// the proposed mutation before it becomes a commit.
    pub(crate) fn plan(
        loan: &Loan,
        user: &User,
        input: &ApplyPaymentInput,
    ) -> Result<(LedgerCommit, AppliedPayment), LedgerError> {
        if !loan.status.is_payable() {
            return Err(LedgerError::LoanNotPayable {
                loan_id: loan.id,
                status: loan.status,
            });
        }
        if input.amount > loan.outstanding_amount {
            return Err(LedgerError::ExceedsOutstanding {
                amount: input.amount,
                outstanding: loan.outstanding_amount,
            });
        }

        let new_outstanding = loan.outstanding_amount - input.amount;
        let mut loan_after = loan.clone();
        loan_after.outstanding_amount = new_outstanding;
        if new_outstanding.is_zero() {
            loan_after.status = loan.status.transition(LoanEvent::PaidInFull)?;
        }
        loan_after.version = loan.version + 1;

        let mut user_after = user.clone();
        user_after.outstanding_balance =
            (user.outstanding_balance - input.amount).max(Decimal::ZERO);
        user_after.version = user.version + 1;

        let report = InvariantChecker::check(loan, &loan_after, user, &user_after)?;

        let payment = Payment {
            id: PaymentId::new(),
            loan_id: loan.id,
            user_id: loan.user_id,
            amount: input.amount,
            transaction_id: input.transaction_ref.clone(),
            status: PaymentStatus::Completed,
            processed_by: input.actor,
            reversal_reason: None,
            reversed_at: None,
            receipt_url: input.receipt_url.clone(),
            created_at: Utc::now(),
            version: 0,
        };

        let mut metadata = match &input.origin {
            PaymentOrigin::Manual => json!({ "loan_id": loan.id }),
            PaymentOrigin::Bulk => json!({ "bulk": true, "loan_id": loan.id }),
            PaymentOrigin::Reconciliation {
                bank_transaction_id,
            } => json!({
                "reconciliation": true,
                "bank_transaction_id": bank_transaction_id,
                "loan_id": loan.id,
            }),
        };
        if report.user_clamped {
            if let Value::Object(map) = &mut metadata {
                map.insert("integrity_clamp".to_string(), Value::Bool(true));
            }
        }

        let audit = AuditLog::new(
            input.actor,
            input.origin.applied_action(),
            AuditTarget::Payment,
            payment.id.into_inner(),
        )
        .with_old_value(json!({ "outstanding_amount": loan.outstanding_amount }))
        .with_new_value(json!({
            "outstanding_amount": new_outstanding,
            "payment_amount": input.amount,
        }))
        .with_metadata(metadata);

        let commit = LedgerCommit {
            loan: VersionedWrite {
                expected_version: loan.version,
                record: loan_after.clone(),
            },
            user: VersionedWrite {
                expected_version: user.version,
                record: user_after.clone(),
            },
            payment: PaymentWrite::Insert(payment.clone()),
            audit,
        };

        Ok((
            commit,
            AppliedPayment {
                payment,
                loan: loan_after,
                user: user_after,
                user_clamped: report.user_clamped,
            },
        ))
    }
}
