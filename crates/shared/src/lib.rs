//! Shared types for Kredo.
//!
//! This crate holds the cross-crate primitives used by both the ledger
//! engine and its store implementations. It carries no business logic.

pub mod types;

pub use types::{AuditLogId, LoanId, PaymentId, UserId};
