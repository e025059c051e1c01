//! Bulk payment operations.
//!
//! Bulk operations are per-item atomic, not all-or-nothing: each loan
//! is processed as an independent transaction, failures are collected,
//! and processing continues with the remaining loans. Loans are taken
//! in ID order so a given input set always processes deterministically.

use std::collections::BTreeSet;

use chrono::Utc;
use kredo_shared::{LoanId, PaymentId, UserId};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::ledger::error::LedgerError;
use crate::ledger::events::EventSink;
use crate::ledger::store::LedgerStore;
use crate::ledger::types::{PaymentStatus, ReversalReason};

use super::apply::PaymentService;
use super::reverse::ReversalService;
use super::types::{
    ApplyPaymentInput, PaymentOrigin, ReversalOrigin, ReversePaymentInput,
};

/// One successfully processed loan in a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItem {
    /// The loan that was processed.
    pub loan_id: LoanId,
    /// The payment created (mark-paid) or reversed (bulk reversal).
    pub payment_id: PaymentId,
}

/// One loan that could not be processed.
#[derive(Debug)]
pub struct BulkFailure {
    /// The loan that failed.
    pub loan_id: LoanId,
    /// Why it failed.
    pub error: LedgerError,
}

/// Outcome of a bulk operation over a set of loans.
///
/// `succeeded` and `failed` partition the input set; every requested
/// loan appears in exactly one of them.
#[derive(Debug, Default)]
pub struct BulkResult {
    /// Loans processed successfully, in processing order.
    pub succeeded: Vec<BulkItem>,
    /// Loans that failed, with the per-loan error.
    pub failed: Vec<BulkFailure>,
}

impl BulkResult {
    /// Returns true if every requested loan was processed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Stateless coordinator for bulk mark-paid and bulk reversal.
pub struct BulkCoordinator;

impl BulkCoordinator {
    /// Marks every loan in the set as fully paid.
    ///
    /// For each loan a payment for the entire outstanding amount is
    /// applied with a generated `BULK-` transaction reference. A loan
    /// that is not payable, already settled, or conflicted fails
    /// individually without affecting the rest of the set.
    pub fn mark_paid<S: LedgerStore>(
        store: &S,
        events: &dyn EventSink,
        loan_ids: &BTreeSet<LoanId>,
        actor: UserId,
    ) -> BulkResult {
        let mut result = BulkResult::default();

        for &loan_id in loan_ids {
            match Self::mark_one_paid(store, events, loan_id, actor) {
                Ok(payment_id) => result.succeeded.push(BulkItem {
                    loan_id,
                    payment_id,
                }),
                Err(error) => {
                    warn!(%loan_id, %error, "bulk mark-paid item failed");
                    result.failed.push(BulkFailure { loan_id, error });
                }
            }
        }

        info!(
            requested = loan_ids.len(),
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "bulk mark-paid finished"
        );
        result
    }

    fn mark_one_paid<S: LedgerStore>(
        store: &S,
        events: &dyn EventSink,
        loan_id: LoanId,
        actor: UserId,
    ) -> Result<PaymentId, LedgerError> {
        let loan = store.load_loan(loan_id)?;
        if loan.outstanding_amount <= Decimal::ZERO {
            return Err(LedgerError::LoanNotPayable {
                loan_id,
                status: loan.status,
            });
        }

        let input = ApplyPaymentInput {
            loan_id,
            amount: loan.outstanding_amount,
            transaction_ref: bulk_reference(loan_id),
            actor,
            receipt_url: None,
            origin: PaymentOrigin::Bulk,
        };
        let applied = PaymentService::apply(store, events, &input)?;
        Ok(applied.payment.id)
    }

    /// Reverses the most recent completed payment on every loan in the
    /// set, all with the same reason.
    ///
    /// A loan with no completed payment fails individually with
    /// `NoReversiblePayment`.
    pub fn reverse_latest<S: LedgerStore>(
        store: &S,
        events: &dyn EventSink,
        loan_ids: &BTreeSet<LoanId>,
        reason: &ReversalReason,
        actor: UserId,
    ) -> BulkResult {
        let mut result = BulkResult::default();

        for &loan_id in loan_ids {
            match Self::reverse_one(store, events, loan_id, reason, actor) {
                Ok(payment_id) => result.succeeded.push(BulkItem {
                    loan_id,
                    payment_id,
                }),
                Err(error) => {
                    warn!(%loan_id, %error, "bulk reversal item failed");
                    result.failed.push(BulkFailure { loan_id, error });
                }
            }
        }

        info!(
            requested = loan_ids.len(),
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "bulk reversal finished"
        );
        result
    }

    fn reverse_one<S: LedgerStore>(
        store: &S,
        events: &dyn EventSink,
        loan_id: LoanId,
        reason: &ReversalReason,
        actor: UserId,
    ) -> Result<PaymentId, LedgerError> {
        let payments = store.load_loan_payments(loan_id)?;
        let latest = payments
            .iter()
            .rev()
            .find(|p| p.status == PaymentStatus::Completed)
            .ok_or(LedgerError::NoReversiblePayment(loan_id))?;

        let input = ReversePaymentInput {
            payment_id: latest.id,
            reason: reason.clone(),
            actor,
            origin: ReversalOrigin::Bulk,
        };
        let reversed = ReversalService::reverse(store, events, &input)?;
        Ok(reversed.payment.id)
    }
}

/// Generates the transaction reference for a bulk payment.
///
/// Format: `BULK-<unix-millis>-<first 8 chars of the loan ID>`.
fn bulk_reference(loan_id: LoanId) -> String {
    let id = loan_id.to_string();
    let prefix = &id[..8];
    format!("BULK-{}-{prefix}", Utc::now().timestamp_millis())
}
