//! Request middleware.
//!
//! Purpose: request lifecycle concerns; currently the per-request trace
//! identifier.

pub mod trace;

pub use trace::Trace;
