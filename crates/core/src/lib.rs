//! Core ledger engine for Kredo.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. The store boundary is a trait; everything above it is
//! deterministic and unit-testable.
//!
//! # Modules
//!
//! - `ledger` - Records, balance invariants, audit emission, store boundary
//! - `payment` - Payment application, reversal, and bulk coordination
//! - `reconcile` - Bank statement normalization and matching sessions
//! - `schedule` - Repayment schedule and penalty calculations

pub mod ledger;
pub mod payment;
pub mod reconcile;
pub mod schedule;
