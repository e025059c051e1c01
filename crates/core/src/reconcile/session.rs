//! Reconciliation session state and matching.
//!
//! A session holds one parsed bank statement plus a snapshot of loans
//! eligible for matching. Matching a statement line to a loan applies a
//! payment through the regular payment protocol, so every match gets
//! the same validation, atomicity, and audit treatment as a manual
//! payment.
//!
//! Duplicate protection is scoped to the session: a transaction ID that
//! was already matched here is rejected, but nothing stops a second
//! session from matching the same bank transaction again. Cross-session
//! protection would need a persistent match registry in the store.

use std::collections::HashSet;

use kredo_shared::{LoanId, PaymentId, UserId};
use rust_decimal::Decimal;
use tracing::info;

use crate::ledger::error::LedgerError;
use crate::ledger::events::EventSink;
use crate::ledger::store::LedgerStore;
use crate::ledger::types::{Loan, LoanStatus};
use crate::payment::apply::PaymentService;
use crate::payment::types::{ApplyPaymentInput, PaymentOrigin};

use super::statement::BankTransaction;

/// A loan eligible for reconciliation matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanCandidate {
    /// The loan ID.
    pub loan_id: LoanId,
    /// The borrower.
    pub user_id: UserId,
    /// Outstanding amount at session snapshot or after the last match.
    pub outstanding_amount: Decimal,
    /// Loan status at session snapshot.
    pub status: LoanStatus,
}

impl LoanCandidate {
    /// Builds a candidate from a loan record.
    #[must_use]
    pub fn from_loan(loan: &Loan) -> Self {
        Self {
            loan_id: loan.id,
            user_id: loan.user_id,
            outstanding_amount: loan.outstanding_amount,
            status: loan.status,
        }
    }
}

/// One statement line plus its match state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementLine {
    /// The normalized bank transaction.
    pub transaction: BankTransaction,
    /// The loan this line was matched to, if any.
    pub matched_loan: Option<LoanId>,
    /// The payment created by the match, if any.
    pub payment_id: Option<PaymentId>,
}

impl StatementLine {
    /// Returns true if this line has been matched to a loan.
    #[must_use]
    pub fn is_matched(&self) -> bool {
        self.matched_loan.is_some()
    }
}

/// The outcome of matching one statement line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    /// The payment created for the match.
    pub payment_id: PaymentId,
    /// The matched loan.
    pub loan_id: LoanId,
    /// The loan's outstanding amount after the payment.
    pub outstanding_after: Decimal,
}

/// An in-progress reconciliation of one bank statement.
pub struct ReconciliationSession {
    lines: Vec<StatementLine>,
    candidates: Vec<LoanCandidate>,
    matched_transaction_ids: HashSet<String>,
}

impl ReconciliationSession {
    /// Opens a session over a parsed statement and a loan snapshot.
    ///
    /// Only payable loans with a positive outstanding amount become
    /// candidates; the rest of the snapshot is dropped.
    #[must_use]
    pub fn new(transactions: Vec<BankTransaction>, loans: &[Loan]) -> Self {
        let candidates = loans
            .iter()
            .filter(|loan| loan.status.is_payable() && loan.outstanding_amount > Decimal::ZERO)
            .map(LoanCandidate::from_loan)
            .collect();
        let lines = transactions
            .into_iter()
            .map(|transaction| StatementLine {
                transaction,
                matched_loan: None,
                payment_id: None,
            })
            .collect();

        Self {
            lines,
            candidates,
            matched_transaction_ids: HashSet::new(),
        }
    }

    /// The statement lines in statement order.
    #[must_use]
    pub fn lines(&self) -> &[StatementLine] {
        &self.lines
    }

    /// The remaining match candidates.
    #[must_use]
    pub fn candidates(&self) -> &[LoanCandidate] {
        &self.candidates
    }

    /// How many lines have been matched so far.
    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.matched_transaction_ids.len()
    }

    /// Returns true if every statement line has been matched.
    #[must_use]
    pub fn is_fully_matched(&self) -> bool {
        self.lines.iter().all(StatementLine::is_matched)
    }

    /// Matches the statement line at `index` against a candidate loan.
    ///
    /// The line's amount is applied as a payment with the bank
    /// transaction ID recorded in the audit metadata. On success the
    /// line is marked matched; a candidate whose outstanding amount
    /// reaches zero leaves the candidate list.
    ///
    /// # Errors
    ///
    /// `UnknownStatementLine`, `TransactionAlreadyMatched`,
    /// `LoanNotCandidate`, or any payment application error. A failed
    /// match leaves the session unchanged.
    pub fn match_transaction<S: LedgerStore>(
        &mut self,
        store: &S,
        events: &dyn EventSink,
        index: usize,
        loan_id: LoanId,
        actor: UserId,
    ) -> Result<MatchOutcome, LedgerError> {
        let line = self
            .lines
            .get(index)
            .ok_or(LedgerError::UnknownStatementLine { index })?;
        let transaction_id = line.transaction.transaction_id.clone();
        if self.matched_transaction_ids.contains(&transaction_id) {
            return Err(LedgerError::TransactionAlreadyMatched { transaction_id });
        }

        let candidate_index = self
            .candidates
            .iter()
            .position(|candidate| candidate.loan_id == loan_id)
            .ok_or(LedgerError::LoanNotCandidate(loan_id))?;

        let input = ApplyPaymentInput {
            loan_id,
            amount: line.transaction.amount,
            transaction_ref: transaction_id.clone(),
            actor,
            receipt_url: None,
            origin: PaymentOrigin::Reconciliation {
                bank_transaction_id: transaction_id.clone(),
            },
        };
        let applied = PaymentService::apply(store, events, &input)?;

        self.matched_transaction_ids.insert(transaction_id.clone());
        let line = &mut self.lines[index];
        line.matched_loan = Some(loan_id);
        line.payment_id = Some(applied.payment.id);

        if applied.loan.outstanding_amount.is_zero() {
            self.candidates.remove(candidate_index);
        } else {
            self.candidates[candidate_index].outstanding_amount = applied.loan.outstanding_amount;
            self.candidates[candidate_index].status = applied.loan.status;
        }

        info!(
            transaction_id = %transaction_id,
            %loan_id,
            amount = %applied.payment.amount,
            outstanding = %applied.loan.outstanding_amount,
            "statement line matched"
        );

        Ok(MatchOutcome {
            payment_id: applied.payment.id,
            loan_id,
            outstanding_after: applied.loan.outstanding_amount,
        })
    }
}
