//! Property-based tests for the payment planning logic.

use kredo_shared::{LoanId, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::ledger::types::{Loan, LoanStatus, ReversalReason, User};

use super::apply::PaymentService;
use super::reverse::ReversalService;
use super::types::{ApplyPaymentInput, PaymentOrigin, ReversalOrigin, ReversePaymentInput};

/// Two-decimal money amount in cents.
fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn loan_with(outstanding: Decimal) -> Loan {
    Loan {
        id: LoanId::new(),
        user_id: UserId::new(),
        principal_amount: outstanding,
        outstanding_amount: outstanding,
        status: LoanStatus::Active,
        due_date: None,
        version: 0,
    }
}

fn apply_input(loan: &Loan, amount: Decimal) -> ApplyPaymentInput {
    ApplyPaymentInput {
        loan_id: loan.id,
        amount,
        transaction_ref: "PROP-TXN".to_string(),
        actor: UserId::new(),
        receipt_url: None,
        origin: PaymentOrigin::Manual,
    }
}

proptest! {
    /// Any valid payment moves the loan and the user aggregate by the
    /// same amount, keeps both in range, and never clamps.
    #[test]
    fn prop_valid_payment_keeps_deltas_in_lockstep(
        outstanding_cents in 1i64..=10_000_000,
        fraction in 1u32..=100,
    ) {
        let outstanding = money(outstanding_cents);
        let amount = (outstanding * Decimal::from(fraction) / Decimal::from(100u32))
            .round_dp(2)
            .max(money(1));
        let loan = loan_with(outstanding);
        let user = User::new(loan.user_id, outstanding);

        let (_, applied) =
            PaymentService::plan(&loan, &user, &apply_input(&loan, amount)).unwrap();

        prop_assert!(!applied.user_clamped);
        prop_assert_eq!(applied.loan.outstanding_amount, outstanding - amount);
        prop_assert_eq!(applied.user.outstanding_balance, outstanding - amount);
        prop_assert!(applied.loan.outstanding_amount >= Decimal::ZERO);
        prop_assert_eq!(
            applied.loan.status == LoanStatus::Completed,
            applied.loan.outstanding_amount.is_zero()
        );
    }

    /// Paying more than the outstanding amount always fails, for any
    /// positive excess.
    #[test]
    fn prop_overpayment_always_rejected(
        outstanding_cents in 1i64..=10_000_000,
        excess_cents in 1i64..=10_000_000,
    ) {
        let outstanding = money(outstanding_cents);
        let loan = loan_with(outstanding);
        let user = User::new(loan.user_id, outstanding);
        let amount = outstanding + money(excess_cents);

        let result = PaymentService::plan(&loan, &user, &apply_input(&loan, amount));
        prop_assert!(result.is_err());
    }

    /// When the user aggregate has drifted below the payment amount the
    /// plan floors it at zero and reports the clamp.
    #[test]
    fn prop_drifted_aggregate_clamps_to_zero(
        outstanding_cents in 2i64..=10_000_000,
        drift_cents in 1i64..=1_000_000,
    ) {
        let outstanding = money(outstanding_cents);
        let loan = loan_with(outstanding);
        // Aggregate short of the full outstanding amount.
        let shortfall = money(drift_cents).min(outstanding - money(1));
        let user = User::new(loan.user_id, outstanding - shortfall);

        let (_, applied) =
            PaymentService::plan(&loan, &user, &apply_input(&loan, outstanding)).unwrap();

        prop_assert!(applied.user_clamped);
        prop_assert_eq!(applied.user.outstanding_balance, Decimal::ZERO);
    }

    /// Reversing an applied payment restores the loan and the aggregate
    /// to their pre-payment values.
    #[test]
    fn prop_reversal_is_inverse_of_application(
        outstanding_cents in 1i64..=10_000_000,
        fraction in 1u32..=100,
    ) {
        let outstanding = money(outstanding_cents);
        let amount = (outstanding * Decimal::from(fraction) / Decimal::from(100u32))
            .round_dp(2)
            .max(money(1));
        let loan = loan_with(outstanding);
        let user = User::new(loan.user_id, outstanding);

        let (_, applied) =
            PaymentService::plan(&loan, &user, &apply_input(&loan, amount)).unwrap();

        let reverse_input = ReversePaymentInput {
            payment_id: applied.payment.id,
            reason: ReversalReason::IncorrectAmount,
            actor: UserId::new(),
            origin: ReversalOrigin::Manual,
        };
        let (_, reversed) =
            ReversalService::plan(&applied.payment, &applied.loan, &applied.user, &reverse_input)
                .unwrap();

        prop_assert_eq!(reversed.loan.outstanding_amount, outstanding);
        prop_assert_eq!(reversed.user.outstanding_balance, outstanding);
        prop_assert_eq!(reversed.loan.status, LoanStatus::Active);
    }
}
