//! Driving port for catalogue use-cases.
//!
//! Inbound adapters call this port with the signed-in [`Actor`]; role checks
//! happen behind it, so handlers stay free of authorisation rules.

use async_trait::async_trait;

use crate::domain::{Actor, Book, BookDraft, BookId, BookPatch, Error};

/// Domain use-case port for browsing and editing the catalogue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Books matching `term`, ordered by title.
    async fn list_books(&self, actor: &Actor, term: &str) -> Result<Vec<Book>, Error>;

    /// One book.
    async fn get_book(&self, actor: &Actor, id: &BookId) -> Result<Book, Error>;

    /// Add a title.
    async fn add_book(&self, actor: &Actor, draft: BookDraft) -> Result<Book, Error>;

    /// Edit a title.
    async fn update_book(&self, actor: &Actor, id: &BookId, patch: BookPatch)
    -> Result<Book, Error>;

    /// Remove a title without open loans.
    async fn remove_book(&self, actor: &Actor, id: &BookId) -> Result<Book, Error>;
}
