//! Domain events published after successful ledger commits.
//!
//! Events exist for external consumers (notifiers, projections). They
//! are fire-and-forget: publishing happens after the commit succeeds
//! and can neither block nor fail the ledger transaction.

use kredo_shared::{LoanId, PaymentId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A ledger mutation that external consumers may react to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A payment was applied against a loan.
    PaymentApplied {
        /// The created payment.
        payment_id: PaymentId,
        /// The loan the payment settles.
        loan_id: LoanId,
        /// The borrower.
        user_id: UserId,
        /// The payment amount.
        amount: Decimal,
        /// The loan's outstanding amount after the payment.
        outstanding_after: Decimal,
    },
    /// A payment's financial effect was undone.
    PaymentReversed {
        /// The reversed payment.
        payment_id: PaymentId,
        /// The loan the payment had settled.
        loan_id: LoanId,
        /// The borrower.
        user_id: UserId,
        /// The original payment amount.
        amount: Decimal,
        /// The loan's outstanding amount after the reversal.
        outstanding_after: Decimal,
    },
}

/// Receives domain events after successful commits.
///
/// Implementations must not block; failures are the sink's problem and
/// are invisible to the ledger transaction.
pub trait EventSink {
    /// Publishes one event.
    fn publish(&self, event: &LedgerEvent);
}

/// A sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn publish(&self, _event: &LedgerEvent) {}
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = LedgerEvent::PaymentApplied {
            payment_id: PaymentId::new(),
            loan_id: LoanId::new(),
            user_id: UserId::new(),
            amount: dec!(100),
            outstanding_after: dec!(900),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "payment_applied");
        assert_eq!(value["amount"], "100");
    }

    #[test]
    fn test_noop_sink_accepts_events() {
        let sink = NoopSink;
        sink.publish(&LedgerEvent::PaymentReversed {
            payment_id: PaymentId::new(),
            loan_id: LoanId::new(),
            user_id: UserId::new(),
            amount: dec!(50),
            outstanding_after: dec!(50),
        });
    }
}
