//! Ledger records, invariants, and the store boundary.
//!
//! This module implements everything the protocols share:
//! - Domain records and the loan status state machine
//! - The balance invariant checker run before every commit
//! - Audit log emission
//! - The transactional store trait and commit types
//! - Domain events for external consumers
//! - Error types for ledger operations

pub mod audit;
pub mod error;
pub mod events;
pub mod invariant;
pub mod store;
pub mod types;

pub use audit::{AuditAction, AuditLog, AuditTarget};
pub use error::LedgerError;
pub use events::{EventSink, LedgerEvent, NoopSink};
pub use invariant::{InvariantChecker, InvariantReport};
pub use store::{LedgerCommit, LedgerStore, PaymentWrite, RecordKind, StoreError, VersionedWrite};
pub use types::{Loan, LoanEvent, LoanStatus, Payment, PaymentStatus, ReversalReason, User};
