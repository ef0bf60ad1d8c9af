//! Catalogue store: the set of books and their copy counts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::book::{optional_text, required_text};
use super::{Book, BookDraft, BookId, BookPatch, Copies, EntityKind, LibraryError, Ledger};

/// In-memory catalogue.
///
/// Every mutation goes through [`Copies`], so `available <= total` holds for
/// every stored book.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    books: BTreeMap<BookId, Book>,
}

impl Catalog {
    /// Look up a book.
    #[must_use]
    pub fn get(&self, id: &BookId) -> Option<&Book> {
        self.books.get(id)
    }

    /// Number of titles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.books.len()
    }

    /// Whether the catalogue holds no titles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Validate and insert a new title.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use library_backend::domain::{BookCategory, BookDraft, Catalog};
    ///
    /// let mut catalog = Catalog::default();
    /// let book = catalog
    ///     .add_book(
    ///         BookDraft {
    ///             title: "Advanced Calculus".into(),
    ///             author: "John Doe".into(),
    ///             category: BookCategory::Maths,
    ///             total_copies: 8,
    ///             available_copies: Some(12),
    ///             isbn: None,
    ///             published_year: Some(2018),
    ///             publisher: None,
    ///         },
    ///         Utc::now(),
    ///     )
    ///     .expect("valid draft");
    /// assert_eq!(book.copies.available(), 8);
    /// ```
    pub fn add_book(&mut self, draft: BookDraft, now: DateTime<Utc>) -> Result<Book, LibraryError> {
        let title = required_text(&draft.title)
            .ok_or_else(|| LibraryError::validation("title", "must not be empty"))?;
        let author = required_text(&draft.author)
            .ok_or_else(|| LibraryError::validation("author", "must not be empty"))?;
        if draft.total_copies == 0 {
            return Err(LibraryError::validation("totalCopies", "must be at least 1"));
        }

        let book = Book {
            id: BookId::random(),
            title,
            author,
            category: draft.category,
            copies: Copies::new(draft.total_copies, draft.available_copies),
            isbn: optional_text(draft.isbn.as_deref()),
            published_year: draft.published_year,
            publisher: optional_text(draft.publisher.as_deref()),
            created_at: now,
            updated_at: now,
            revision: 1,
        };
        self.books.insert(book.id, book.clone());
        Ok(book)
    }

    /// Merge `patch` into an existing title.
    ///
    /// Lowering `total_copies` clamps availability down; zero retires the
    /// title while keeping it for loan history.
    pub fn update_book(
        &mut self,
        id: &BookId,
        patch: BookPatch,
        now: DateTime<Utc>,
    ) -> Result<Book, LibraryError> {
        let current = self
            .books
            .get(id)
            .ok_or_else(|| LibraryError::not_found(EntityKind::Book, id))?;

        let mut next = current.clone();
        if let Some(title) = patch.title.as_deref() {
            next.title = required_text(title)
                .ok_or_else(|| LibraryError::validation("title", "must not be empty"))?;
        }
        if let Some(author) = patch.author.as_deref() {
            next.author = required_text(author)
                .ok_or_else(|| LibraryError::validation("author", "must not be empty"))?;
        }
        if let Some(category) = patch.category {
            next.category = category;
        }
        if let Some(total) = patch.total_copies {
            next.copies = next.copies.with_total(total);
        }
        if let Some(available) = patch.available_copies {
            next.copies = next.copies.with_available(available);
        }
        if let Some(isbn) = patch.isbn.as_deref() {
            next.isbn = optional_text(Some(isbn));
        }
        if let Some(year) = patch.published_year {
            next.published_year = Some(year);
        }
        if let Some(publisher) = patch.publisher.as_deref() {
            next.publisher = optional_text(Some(publisher));
        }
        next.updated_at = now;
        next.revision = current.revision.saturating_add(1);

        self.books.insert(next.id, next.clone());
        Ok(next)
    }

    /// Remove a title that has no open loans.
    pub fn remove_book(&mut self, id: &BookId, ledger: &Ledger) -> Result<Book, LibraryError> {
        if !self.books.contains_key(id) {
            return Err(LibraryError::not_found(EntityKind::Book, id));
        }
        let open = ledger.open_loans_for_book(id);
        if open > 0 {
            return Err(LibraryError::conflict(format!(
                "book {id} has {open} open loan(s) and cannot be removed"
            )));
        }
        self.books
            .remove(id)
            .ok_or_else(|| LibraryError::not_found(EntityKind::Book, id))
    }

    /// Lazily yield the books matching `predicate`.
    pub fn find_books<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a Book> + 'a
    where
        P: Fn(&Book) -> bool + 'a,
    {
        self.books.values().filter(move |book| predicate(book))
    }

    /// Take one copy off the shelf.
    pub(crate) fn checkout(&mut self, id: &BookId, now: DateTime<Utc>) -> Result<&Book, LibraryError> {
        let book = self
            .books
            .get_mut(id)
            .ok_or_else(|| LibraryError::not_found(EntityKind::Book, id))?;
        book.copies = book
            .copies
            .checkout()
            .ok_or(LibraryError::Unavailable { book_id: *id })?;
        book.updated_at = now;
        book.revision = book.revision.saturating_add(1);
        Ok(book)
    }

    /// Put one copy back; `None` when the title has gone.
    pub(crate) fn checkin(&mut self, id: &BookId, now: DateTime<Utc>) -> Option<&Book> {
        let book = self.books.get_mut(id)?;
        book.copies = book.copies.checkin();
        book.updated_at = now;
        book.revision = book.revision.saturating_add(1);
        Some(book)
    }

    /// Store a row received from outside, keeping the newest revision.
    ///
    /// Returns whether the row was applied.
    pub(crate) fn merge(&mut self, book: Book) -> bool {
        match self.books.get(&book.id) {
            Some(existing) if existing.revision >= book.revision => false,
            _ => {
                self.books.insert(book.id, book);
                true
            }
        }
    }

    /// Drop a row deleted outside; returns whether it was present.
    pub(crate) fn forget(&mut self, id: &BookId) -> bool {
        self.books.remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BookCategory;
    use rstest::{fixture, rstest};

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn draft(total: u32, available: Option<u32>) -> BookDraft {
        BookDraft {
            title: "Quantum Physics Explained".to_owned(),
            author: "Maria Garcia".to_owned(),
            category: BookCategory::Physics,
            total_copies: total,
            available_copies: available,
            isbn: Some("978-3-642-11934-7".to_owned()),
            published_year: Some(2021),
            publisher: Some("  ".to_owned()),
        }
    }

    #[rstest]
    #[case(4, None, 4)]
    #[case(4, Some(2), 2)]
    #[case(4, Some(40), 4)]
    fn add_book_clamps_availability(
        now: DateTime<Utc>,
        #[case] total: u32,
        #[case] available: Option<u32>,
        #[case] expected: u32,
    ) {
        let mut catalog = Catalog::default();
        let book = catalog.add_book(draft(total, available), now).expect("valid");
        assert_eq!(book.copies.available(), expected);
        assert_eq!(book.publisher, None);
        assert_eq!(catalog.get(&book.id), Some(&book));
    }

    #[rstest]
    #[case("", "Maria Garcia", 1, "title")]
    #[case("Quantum", "  ", 1, "author")]
    #[case("Quantum", "Maria Garcia", 0, "totalCopies")]
    fn add_book_validates(
        now: DateTime<Utc>,
        #[case] title: &str,
        #[case] author: &str,
        #[case] total: u32,
        #[case] field: &str,
    ) {
        let mut catalog = Catalog::default();
        let mut bad = draft(total, None);
        bad.title = title.to_owned();
        bad.author = author.to_owned();
        let err = catalog.add_book(bad, now).expect_err("invalid draft");
        assert!(matches!(err, LibraryError::Validation { field: f, .. } if f == field));
        assert!(catalog.is_empty());
    }

    #[rstest]
    fn lowering_total_to_zero_clamps_available(now: DateTime<Utc>) {
        let mut catalog = Catalog::default();
        let book = catalog.add_book(draft(1, Some(1)), now).expect("valid");
        let patch = BookPatch {
            total_copies: Some(0),
            ..BookPatch::default()
        };
        let updated = catalog.update_book(&book.id, patch, now).expect("update");
        assert_eq!((updated.copies.total(), updated.copies.available()), (0, 0));
        assert_eq!(updated.revision, book.revision + 1);
    }

    #[rstest]
    fn update_rejects_blank_title_without_changes(now: DateTime<Utc>) {
        let mut catalog = Catalog::default();
        let book = catalog.add_book(draft(3, None), now).expect("valid");
        let patch = BookPatch {
            title: Some(" ".to_owned()),
            total_copies: Some(1),
            ..BookPatch::default()
        };
        assert!(catalog.update_book(&book.id, patch, now).is_err());
        assert_eq!(catalog.get(&book.id), Some(&book));
    }

    #[rstest]
    fn update_missing_book_is_not_found(now: DateTime<Utc>) {
        let mut catalog = Catalog::default();
        let err = catalog
            .update_book(&BookId::random(), BookPatch::default(), now)
            .expect_err("missing");
        assert!(matches!(err, LibraryError::NotFound { entity: EntityKind::Book, .. }));
    }

    #[rstest]
    fn checkout_and_checkin_respect_bounds(now: DateTime<Utc>) {
        let mut catalog = Catalog::default();
        let book = catalog.add_book(draft(1, None), now).expect("valid");
        catalog.checkout(&book.id, now).expect("one copy");
        assert!(matches!(
            catalog.checkout(&book.id, now),
            Err(LibraryError::Unavailable { .. })
        ));
        catalog.checkin(&book.id, now);
        catalog.checkin(&book.id, now);
        let stored = catalog.get(&book.id).expect("stored");
        assert_eq!(stored.copies.available(), 1);
    }

    #[rstest]
    fn merge_ignores_stale_rows(now: DateTime<Utc>) {
        let mut catalog = Catalog::default();
        let book = catalog.add_book(draft(2, None), now).expect("valid");
        let mut stale = book.clone();
        stale.title = "Stale".to_owned();
        assert!(!catalog.merge(stale));

        let mut fresh = book.clone();
        fresh.title = "Fresh".to_owned();
        fresh.revision += 1;
        assert!(catalog.merge(fresh));
        assert_eq!(catalog.get(&book.id).map(|b| b.title.as_str()), Some("Fresh"));
    }

    #[rstest]
    fn find_books_is_lazy_and_filtered(now: DateTime<Utc>) {
        let mut catalog = Catalog::default();
        catalog.add_book(draft(2, None), now).expect("valid");
        let mut other = draft(1, None);
        other.category = BookCategory::Novels;
        catalog.add_book(other, now).expect("valid");

        let novels: Vec<_> = catalog
            .find_books(|book| book.category == BookCategory::Novels)
            .collect();
        assert_eq!(novels.len(), 1);
    }
}
