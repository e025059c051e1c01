//! Bank statement reconciliation.

pub mod session;
pub mod statement;

pub use session::{LoanCandidate, MatchOutcome, ReconciliationSession, StatementLine};
pub use statement::{BankTransaction, parse_statement};
