//! Balance invariant checker.
//!
//! A pure gate that every protocol runs over its proposed mutation
//! before handing a commit to the store. It validates the system
//! invariants on the (before, after) record pairs:
//!
//! - The loan delta and the user-aggregate delta agree. The single
//!   tolerated exception is a clamp at the user level (the aggregate
//!   would have gone negative and was floored at zero); the clamp is
//!   reported, not silently accepted.
//! - `0 <= outstanding_amount <= principal_amount`, and the principal
//!   never changes.
//! - Status coherence: a loan is `Completed` exactly when nothing
//!   remains outstanding.

use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{Loan, LoanStatus, User};

/// What the checker observed about an accepted mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvariantReport {
    /// True if the user aggregate was clamped at zero. This only fires
    /// when the aggregate had already drifted from the loan sum; callers
    /// treat it as a data-integrity warning, not silent success.
    pub user_clamped: bool,
}

/// Stateless validator for proposed ledger mutations.
pub struct InvariantChecker;

impl InvariantChecker {
    /// Validates a proposed `{Loan, User}` mutation pair.
    ///
    /// # Errors
    ///
    /// Returns an integrity error if the mutation would unbalance the
    /// ledger, push a balance out of range, or leave the loan status
    /// inconsistent with its outstanding amount.
    pub fn check(
        loan_before: &Loan,
        loan_after: &Loan,
        user_before: &User,
        user_after: &User,
    ) -> Result<InvariantReport, LedgerError> {
        if loan_after.principal_amount != loan_before.principal_amount {
            return Err(LedgerError::PrincipalChanged {
                loan_id: loan_after.id,
            });
        }

        if loan_after.outstanding_amount < Decimal::ZERO {
            return Err(LedgerError::NegativeOutstanding {
                loan_id: loan_after.id,
            });
        }

        if loan_after.outstanding_amount > loan_after.principal_amount {
            return Err(LedgerError::OutstandingExceedsPrincipal {
                loan_id: loan_after.id,
                outstanding: loan_after.outstanding_amount,
                principal: loan_after.principal_amount,
            });
        }

        if user_after.outstanding_balance < Decimal::ZERO {
            return Err(LedgerError::NegativeUserBalance {
                user_id: user_after.id,
            });
        }

        Self::check_status(loan_after)?;

        let loan_delta = loan_after.outstanding_amount - loan_before.outstanding_amount;
        let user_delta = user_after.outstanding_balance - user_before.outstanding_balance;

        if loan_delta == user_delta {
            return Ok(InvariantReport {
                user_clamped: false,
            });
        }

        // The only legal disagreement: a payment drained the aggregate
        // past zero and the update floored it. Anything else is drift.
        let clamped = loan_delta < Decimal::ZERO
            && user_delta > loan_delta
            && user_after.outstanding_balance.is_zero();
        if clamped {
            return Ok(InvariantReport { user_clamped: true });
        }

        Err(LedgerError::UnbalancedMutation {
            loan_delta,
            user_delta,
        })
    }

    fn check_status(loan_after: &Loan) -> Result<(), LedgerError> {
        let settled = loan_after.outstanding_amount.is_zero();
        let completed = loan_after.status == LoanStatus::Completed;
        if settled == completed {
            Ok(())
        } else {
            Err(LedgerError::StatusOutstandingMismatch {
                loan_id: loan_after.id,
                status: loan_after.status,
                outstanding: loan_after.outstanding_amount,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use kredo_shared::{LoanId, UserId};
    use rust_decimal_macros::dec;

    use super::*;

    fn loan(outstanding: Decimal, status: LoanStatus) -> Loan {
        Loan {
            id: LoanId::new(),
            user_id: UserId::new(),
            principal_amount: dec!(1000),
            outstanding_amount: outstanding,
            status,
            due_date: None,
            version: 0,
        }
    }

    fn user(balance: Decimal) -> User {
        User::new(UserId::new(), balance)
    }

    #[test]
    fn test_matching_deltas_pass() {
        let before = loan(dec!(1000), LoanStatus::Active);
        let mut after = before.clone();
        after.outstanding_amount = dec!(600);
        let u_before = user(dec!(1000));
        let u_after = user(dec!(600));

        let report = InvariantChecker::check(&before, &after, &u_before, &u_after).unwrap();
        assert!(!report.user_clamped);
    }

    #[test]
    fn test_clamp_at_zero_is_reported_not_rejected() {
        let before = loan(dec!(500), LoanStatus::Active);
        let mut after = before.clone();
        after.outstanding_amount = dec!(0);
        after.status = LoanStatus::Completed;
        // Aggregate had drifted low; the update floors it at zero.
        let u_before = user(dec!(300));
        let u_after = user(dec!(0));

        let report = InvariantChecker::check(&before, &after, &u_before, &u_after).unwrap();
        assert!(report.user_clamped);
    }

    #[test]
    fn test_unbalanced_mutation_rejected() {
        let before = loan(dec!(1000), LoanStatus::Active);
        let mut after = before.clone();
        after.outstanding_amount = dec!(600);
        let u_before = user(dec!(1000));
        let u_after = user(dec!(700));

        let result = InvariantChecker::check(&before, &after, &u_before, &u_after);
        assert!(matches!(
            result,
            Err(LedgerError::UnbalancedMutation { .. })
        ));
    }

    #[test]
    fn test_negative_outstanding_rejected() {
        let before = loan(dec!(100), LoanStatus::Active);
        let mut after = before.clone();
        after.outstanding_amount = dec!(-50);
        let u_before = user(dec!(100));
        let u_after = user(dec!(0));

        let result = InvariantChecker::check(&before, &after, &u_before, &u_after);
        assert!(matches!(result, Err(LedgerError::NegativeOutstanding { .. })));
    }

    #[test]
    fn test_outstanding_above_principal_rejected() {
        let before = loan(dec!(1000), LoanStatus::Active);
        let mut after = before.clone();
        after.outstanding_amount = dec!(1200);
        let u_before = user(dec!(1000));
        let u_after = user(dec!(1200));

        let result = InvariantChecker::check(&before, &after, &u_before, &u_after);
        assert!(matches!(
            result,
            Err(LedgerError::OutstandingExceedsPrincipal { .. })
        ));
    }

    #[test]
    fn test_negative_user_balance_rejected() {
        let before = loan(dec!(1000), LoanStatus::Active);
        let mut after = before.clone();
        after.outstanding_amount = dec!(900);
        let u_before = user(dec!(50));
        let u_after = user(dec!(-50));

        let result = InvariantChecker::check(&before, &after, &u_before, &u_after);
        assert!(matches!(
            result,
            Err(LedgerError::NegativeUserBalance { .. })
        ));
    }

    #[test]
    fn test_settled_loan_must_be_completed() {
        let before = loan(dec!(100), LoanStatus::Active);
        let mut after = before.clone();
        after.outstanding_amount = dec!(0);
        // Status left Active: incoherent.
        let u_before = user(dec!(100));
        let u_after = user(dec!(0));

        let result = InvariantChecker::check(&before, &after, &u_before, &u_after);
        assert!(matches!(
            result,
            Err(LedgerError::StatusOutstandingMismatch { .. })
        ));
    }

    #[test]
    fn test_completed_loan_must_be_settled() {
        let before = loan(dec!(0), LoanStatus::Completed);
        let mut after = before.clone();
        after.outstanding_amount = dec!(250);
        // Reversal forgot to reopen the loan.
        let u_before = user(dec!(0));
        let u_after = user(dec!(250));

        let result = InvariantChecker::check(&before, &after, &u_before, &u_after);
        assert!(matches!(
            result,
            Err(LedgerError::StatusOutstandingMismatch { .. })
        ));
    }

    #[test]
    fn test_principal_is_immutable() {
        let before = loan(dec!(1000), LoanStatus::Active);
        let mut after = before.clone();
        after.principal_amount = dec!(2000);
        after.outstanding_amount = dec!(1000);
        let u_before = user(dec!(1000));
        let u_after = user(dec!(1000));

        let result = InvariantChecker::check(&before, &after, &u_before, &u_after);
        assert!(matches!(result, Err(LedgerError::PrincipalChanged { .. })));
    }
}
