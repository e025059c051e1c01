//! Payment reversal protocol.
//!
//! Undoes the financial effect of a previously applied payment without
//! deleting the record. The payment flips to reversed, the amount is
//! restored to the loan and the user aggregate, and the loan reopens to
//! active regardless of its current status.

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};

use crate::ledger::audit::{AuditLog, AuditTarget};
use crate::ledger::error::LedgerError;
use crate::ledger::events::{EventSink, LedgerEvent};
use crate::ledger::invariant::InvariantChecker;
use crate::ledger::store::{LedgerCommit, LedgerStore, PaymentWrite, StoreError, VersionedWrite};
use crate::ledger::types::{Loan, LoanEvent, Payment, PaymentStatus, User};

use super::apply::MAX_CONFLICT_RETRIES;
use super::types::{ReversePaymentInput, ReversedPayment};

/// Stateless service implementing the payment reversal protocol.
pub struct ReversalService;

impl ReversalService {
    /// Reverses a completed payment.
    ///
    /// Idempotency guard: a payment can be reversed at most once; a
    /// second attempt fails with `AlreadyReversed` and writes nothing.
    /// A reason is always required.
    ///
    /// The reversal may push the loan's outstanding amount back above
    /// zero, so the loan always reopens to active, even from completed.
    ///
    /// # Errors
    ///
    /// `MissingReversalReason`, `PaymentNotFound`, `AlreadyReversed`,
    /// `LoanNotFound`, `UserNotFound`, `OutstandingExceedsPrincipal`
    /// (reversing would restore more than the principal),
    /// `ConcurrentModification` (after exhausting retries), or
    /// `StoreUnavailable`.
    pub fn reverse<S: LedgerStore>(
        store: &S,
        events: &dyn EventSink,
        input: &ReversePaymentInput,
    ) -> Result<ReversedPayment, LedgerError> {
        input.reason.validate()?;

        let mut attempts = 0;
        loop {
            attempts += 1;

            let payment = store.load_payment(input.payment_id)?;
            let loan = store.load_loan(payment.loan_id)?;
            let user = store.load_user(loan.user_id)?;
            let (commit, reversed) = Self::plan(&payment, &loan, &user, input)?;

            match store.commit(commit) {
                Ok(()) => {
                    info!(
                        payment_id = %reversed.payment.id,
                        loan_id = %reversed.loan.id,
                        amount = %reversed.payment.amount,
                        reason = %input.reason,
                        "payment reversed"
                    );
                    events.publish(&LedgerEvent::PaymentReversed {
                        payment_id: reversed.payment.id,
                        loan_id: reversed.loan.id,
                        user_id: reversed.user.id,
                        amount: reversed.payment.amount,
                        outstanding_after: reversed.loan.outstanding_amount,
                    });
                    return Ok(reversed);
                }
                Err(StoreError::VersionConflict { .. }) if attempts < MAX_CONFLICT_RETRIES => {
                    debug!(payment_id = %input.payment_id, attempts, "version conflict, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Builds the atomic commit for one reversal. Pure.
    pub(crate) fn plan(
        payment: &Payment,
        loan: &Loan,
        user: &User,
        input: &ReversePaymentInput,
    ) -> Result<(LedgerCommit, ReversedPayment), LedgerError> {
        if payment.status == PaymentStatus::Reversed {
            return Err(LedgerError::AlreadyReversed(payment.id));
        }

        let mut payment_after = payment.clone();
        payment_after.status = PaymentStatus::Reversed;
        payment_after.reversal_reason = Some(input.reason.clone());
        payment_after.reversed_at = Some(Utc::now());
        payment_after.version = payment.version + 1;

        let mut loan_after = loan.clone();
        loan_after.outstanding_amount = loan.outstanding_amount + payment.amount;
        loan_after.status = loan.status.transition(LoanEvent::PaymentReversed)?;
        loan_after.version = loan.version + 1;

        let mut user_after = user.clone();
        user_after.outstanding_balance = user.outstanding_balance + payment.amount;
        user_after.version = user.version + 1;

        InvariantChecker::check(loan, &loan_after, user, &user_after)?;

        let audit = AuditLog::new(
            input.actor,
            input.origin.reversed_action(),
            AuditTarget::Payment,
            payment.id.into_inner(),
        )
        .with_old_value(json!({
            "status": payment.status.as_str(),
            "outstanding_amount": loan.outstanding_amount,
        }))
        .with_new_value(json!({
            "status": payment_after.status.as_str(),
            "outstanding_amount": loan_after.outstanding_amount,
        }))
        .with_reason(input.reason.to_string())
        .with_metadata(json!({ "loan_id": loan.id }));

        let commit = LedgerCommit {
            loan: VersionedWrite {
                expected_version: loan.version,
                record: loan_after.clone(),
            },
            user: VersionedWrite {
                expected_version: user.version,
                record: user_after.clone(),
            },
            payment: PaymentWrite::Update(VersionedWrite {
                expected_version: payment.version,
                record: payment_after.clone(),
            }),
            audit,
        };

        Ok((
            commit,
            ReversedPayment {
                payment: payment_after,
                loan: loan_after,
                user: user_after,
            },
        ))
    }
}
