//! Shared primitive types.

mod id;


pub use id::{AuditLogId, LoanId, PaymentId, UserId};
