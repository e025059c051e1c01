//! Ledger store implementations for Kredo.
//!
//! Currently provides `MemoryStore`, an in-process store with the full
//! atomicity and optimistic-versioning semantics of the store trait.
//! It backs the engine's integration tests and is suitable for demos
//! and single-process deployments.

pub mod memory;

pub use memory::MemoryStore;
