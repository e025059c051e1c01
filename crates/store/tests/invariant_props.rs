//! Property tests: random operation sequences preserve the ledger
//! invariants end to end.

use proptest::prelude::*;
use rust_decimal::Decimal;

use kredo_core::ledger::events::NoopSink;
use kredo_core::ledger::store::LedgerStore;
use kredo_core::ledger::types::{Loan, LoanStatus, PaymentStatus, ReversalReason, User};
use kredo_core::payment::{
    ApplyPaymentInput, PaymentOrigin, PaymentService, ReversalOrigin, ReversalService,
    ReversePaymentInput,
};
use kredo_shared::{LoanId, UserId};
use kredo_store::MemoryStore;

fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[derive(Debug, Clone)]
enum Op {
    /// Pay a percentage of the loan's current outstanding amount.
    Pay { loan: usize, percent: u32 },
    /// Reverse the loan's most recent completed payment.
    Reverse { loan: usize },
}

fn op_strategy(loan_count: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..loan_count, 1u32..=100).prop_map(|(loan, percent)| Op::Pay { loan, percent }),
        (0..loan_count).prop_map(|loan| Op::Reverse { loan }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After any sequence of payments and reversals the user aggregate
    /// equals the sum of loan outstanding amounts, and every loan stays
    /// within `0 ..= principal` with a coherent status.
    #[test]
    fn prop_random_operations_preserve_ledger_invariants(
        principals in prop::collection::vec(1_000i64..=10_000_000, 2..=4),
        ops in prop::collection::vec(op_strategy(4), 1..40),
    ) {
        let store = MemoryStore::new();
        let user_id = UserId::new();
        let total: Decimal = principals.iter().map(|&cents| money(cents)).sum();
        store.insert_user(User::new(user_id, total));

        let mut loan_ids = Vec::new();
        for &cents in &principals {
            let mut loan = Loan::new(LoanId::new(), user_id, money(cents));
            loan.status = LoanStatus::Active;
            loan_ids.push(loan.id);
            store.insert_loan(loan);
        }

        let actor = UserId::new();
        for op in ops {
            match op {
                Op::Pay { loan, percent } => {
                    let loan_id = loan_ids[loan % loan_ids.len()];
                    let outstanding = store.loan(loan_id).unwrap().outstanding_amount;
                    if outstanding.is_zero() {
                        continue;
                    }
                    let amount = (outstanding * Decimal::from(percent)
                        / Decimal::from(100u32))
                        .round_dp(2)
                        .max(money(1))
                        .min(outstanding);
                    let input = ApplyPaymentInput {
                        loan_id,
                        amount,
                        transaction_ref: "PROP-TXN".to_string(),
                        actor,
                        receipt_url: None,
                        origin: PaymentOrigin::Manual,
                    };
                    PaymentService::apply(&store, &NoopSink, &input).unwrap();
                }
                Op::Reverse { loan } => {
                    let loan_id = loan_ids[loan % loan_ids.len()];
                    let payments = store.load_loan_payments(loan_id).unwrap();
                    let Some(latest) = payments
                        .iter()
                        .rev()
                        .find(|p| p.status == PaymentStatus::Completed)
                    else {
                        continue;
                    };
                    let input = ReversePaymentInput {
                        payment_id: latest.id,
                        reason: ReversalReason::IncorrectAmount,
                        actor,
                        origin: ReversalOrigin::Manual,
                    };
                    ReversalService::reverse(&store, &NoopSink, &input).unwrap();
                }
            }
        }

        let mut loan_sum = Decimal::ZERO;
        for (&loan_id, &cents) in loan_ids.iter().zip(&principals) {
            let loan = store.loan(loan_id).unwrap();
            prop_assert!(loan.outstanding_amount >= Decimal::ZERO);
            prop_assert!(loan.outstanding_amount <= money(cents));
            prop_assert_eq!(
                loan.status == LoanStatus::Completed,
                loan.outstanding_amount.is_zero()
            );
            loan_sum += loan.outstanding_amount;
        }

        let user = store.user(user_id).unwrap();
        prop_assert_eq!(user.outstanding_balance, loan_sum);
        prop_assert!(user.outstanding_balance >= Decimal::ZERO);

        // One audit entry per successful mutation.
        prop_assert_eq!(
            store.audit_entries().len(),
            store
                .payments()
                .iter()
                .map(|p| if p.status == PaymentStatus::Reversed { 2 } else { 1 })
                .sum::<usize>()
        );
    }
}
