//! Payment protocols: apply, reverse, and bulk coordination.

pub mod apply;
pub mod bulk;
pub mod reverse;
pub mod types;

#[cfg(test)]
mod apply_props;

pub use apply::{MAX_CONFLICT_RETRIES, PaymentService};
pub use bulk::{BulkCoordinator, BulkFailure, BulkItem, BulkResult};
pub use reverse::ReversalService;
pub use types::{
    AppliedPayment, ApplyPaymentInput, PaymentOrigin, ReversalOrigin, ReversePaymentInput,
    ReversedPayment,
};
