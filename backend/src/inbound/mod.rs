//! Inbound adapters translating console requests into domain service calls
//! while keeping framework details at the edge.
//!
//! REST handlers live under [`http`]; the live change stream under [`ws`].

pub mod http;
pub mod ws;
