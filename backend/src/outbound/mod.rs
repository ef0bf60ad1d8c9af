//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **row_store**: in-memory row store, the outbox mirror and the change
//!   feed that keeps the library in step with the store.
//! - **credentials**: in-memory credential store behind sign-in.
//! - **seed**: demo accounts and books for a fresh store.
//!
//! Adapters are thin translators between domain types and their external
//! representation. They contain no business rules.

pub mod credentials;
pub mod row_store;
pub mod seed;
