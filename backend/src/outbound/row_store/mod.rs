//! Row-store adapters.
//!
//! - [`InMemoryRowStore`]: in-process implementation of the
//!   [`RowStore`](crate::domain::ports::RowStore) port.
//! - [`RowStoreMirror`]: drains the library outbox into a row store.
//! - [`RowFeed`] and [`hydrate`]: load rows at startup and feed later
//!   changes to the library's apply loop.
//!
//! Row structs and their conversions live in [`codec`] and never reach the
//! domain.

pub mod codec;
mod feed;
mod memory;
mod mirror;

pub use feed::{HydrateError, RowFeed, hydrate};
pub use memory::{InMemoryRowStore, ROW_FEED_CAPACITY};
pub use mirror::{MirrorError, RowStoreMirror};
