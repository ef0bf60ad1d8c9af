//! Catalogue records and their copy-count invariant.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BookId;

/// Fixed set of shelving categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BookCategory {
    /// Biology, medicine and related sciences.
    #[serde(rename = "Human Science")]
    HumanScience,
    /// Mathematics.
    Maths,
    /// Chemistry.
    Chemistry,
    /// Physics.
    Physics,
    /// Fiction.
    Novels,
    /// Anything else.
    Other,
}

impl BookCategory {
    /// Every category in display order.
    pub const ALL: [Self; 6] = [
        Self::HumanScience,
        Self::Maths,
        Self::Chemistry,
        Self::Physics,
        Self::Novels,
        Self::Other,
    ];

    /// Human readable label, identical to the wire name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::HumanScience => "Human Science",
            Self::Maths => "Maths",
            Self::Chemistry => "Chemistry",
            Self::Physics => "Physics",
            Self::Novels => "Novels",
            Self::Other => "Other",
        }
    }

    /// Colour used to badge the category in listings.
    #[must_use]
    pub const fn color(self) -> CategoryColor {
        match self {
            Self::HumanScience => CategoryColor::Green,
            Self::Maths => CategoryColor::Blue,
            Self::Chemistry => CategoryColor::Purple,
            Self::Physics => CategoryColor::Yellow,
            Self::Novels => CategoryColor::Pink,
            Self::Other => CategoryColor::Gray,
        }
    }
}

impl fmt::Display for BookCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raised when a category label is not one of [`BookCategory::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown book category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for BookCategory {
    type Err = UnknownCategory;

    /// Case-insensitive match on the label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownCategory(needle.to_owned()))
    }
}

/// Badge colour for a [`BookCategory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryColor {
    /// Human Science.
    Green,
    /// Maths.
    Blue,
    /// Chemistry.
    Purple,
    /// Physics.
    Yellow,
    /// Novels.
    Pink,
    /// Other.
    Gray,
}

/// Copy counts of a title.
///
/// ## Invariants
/// - `available <= total` after every constructor and transition.
///
/// # Examples
/// ```
/// use library_backend::domain::Copies;
///
/// let copies = Copies::new(3, Some(10));
/// assert_eq!(copies.available(), 3);
/// assert_eq!(copies.with_total(0).available(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Copies {
    total: u32,
    available: u32,
}

impl Copies {
    /// Build counts, clamping the requested availability to `total`.
    ///
    /// An absent request means every copy is on the shelf.
    #[must_use]
    pub fn new(total: u32, requested_available: Option<u32>) -> Self {
        let available = requested_available.map_or(total, |requested| requested.min(total));
        Self { total, available }
    }

    /// Number of copies owned.
    #[must_use]
    pub const fn total(self) -> u32 {
        self.total
    }

    /// Number of copies on the shelf.
    #[must_use]
    pub const fn available(self) -> u32 {
        self.available
    }

    /// Copies currently lent out.
    #[must_use]
    pub const fn on_loan(self) -> u32 {
        self.total.saturating_sub(self.available)
    }

    /// Change the total, clamping availability down when necessary.
    #[must_use]
    pub fn with_total(self, total: u32) -> Self {
        Self::new(total, Some(self.available))
    }

    /// Set availability explicitly, clamped to the total.
    #[must_use]
    pub fn with_available(self, available: u32) -> Self {
        Self::new(self.total, Some(available))
    }

    /// Take one copy off the shelf, or `None` when none is left.
    #[must_use]
    pub fn checkout(self) -> Option<Self> {
        let available = self.available.checked_sub(1)?;
        Some(Self { available, ..self })
    }

    /// Put one copy back, never exceeding the total.
    #[must_use]
    pub fn checkin(self) -> Self {
        self.with_available(self.available.saturating_add(1))
    }
}

/// Catalogue entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    /// Stable identifier.
    pub id: BookId,
    /// Title, non-empty once trimmed.
    pub title: String,
    /// Author, non-empty once trimmed.
    pub author: String,
    /// Shelving category.
    pub category: BookCategory,
    /// Copy counts.
    pub copies: Copies,
    /// Optional ISBN as entered.
    pub isbn: Option<String>,
    /// Optional year of publication.
    pub published_year: Option<i32>,
    /// Optional publisher.
    pub publisher: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
    /// Monotonic mutation counter used to discard stale change events.
    pub revision: u64,
}

/// Fields accepted when adding a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDraft {
    /// Title.
    pub title: String,
    /// Author.
    pub author: String,
    /// Category.
    pub category: BookCategory,
    /// Copies owned; must be at least one.
    pub total_copies: u32,
    /// Copies on the shelf; defaults to `total_copies`.
    pub available_copies: Option<u32>,
    /// ISBN.
    pub isbn: Option<String>,
    /// Year of publication.
    pub published_year: Option<i32>,
    /// Publisher.
    pub publisher: Option<String>,
}

/// Partial update of a book. `None` keeps the current value; a blank string
/// clears an optional text field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    /// New title.
    pub title: Option<String>,
    /// New author.
    pub author: Option<String>,
    /// New category.
    pub category: Option<BookCategory>,
    /// New total; may be zero to retire a title.
    pub total_copies: Option<u32>,
    /// New availability, clamped to the total.
    pub available_copies: Option<u32>,
    /// New ISBN.
    pub isbn: Option<String>,
    /// New year of publication.
    pub published_year: Option<i32>,
    /// New publisher.
    pub publisher: Option<String>,
}

/// Trim a required text field, rejecting blank input.
pub(crate) fn required_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Trim an optional text field, mapping blank input to `None`.
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value.and_then(required_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(5, None, 5)]
    #[case(5, Some(3), 3)]
    #[case(5, Some(9), 5)]
    #[case(0, Some(1), 0)]
    fn new_clamps_availability(
        #[case] total: u32,
        #[case] requested: Option<u32>,
        #[case] expected: u32,
    ) {
        let copies = Copies::new(total, requested);
        assert_eq!(copies.available(), expected);
        assert!(copies.available() <= copies.total());
    }

    #[rstest]
    fn checkout_stops_at_zero() {
        let copies = Copies::new(1, None);
        let taken = copies.checkout().expect("one copy left");
        assert_eq!(taken.available(), 0);
        assert!(taken.checkout().is_none());
    }

    #[rstest]
    fn checkin_is_capped_at_total() {
        let copies = Copies::new(2, None);
        assert_eq!(copies.checkin().available(), 2);
    }

    #[rstest]
    fn lowering_total_clamps_available() {
        let copies = Copies::new(10, Some(7)).with_total(4);
        assert_eq!((copies.total(), copies.available(), copies.on_loan()), (4, 4, 0));
    }

    #[rstest]
    #[case("physics", BookCategory::Physics)]
    #[case(" Human Science ", BookCategory::HumanScience)]
    #[case("NOVELS", BookCategory::Novels)]
    fn parses_labels_case_insensitively(#[case] raw: &str, #[case] expected: BookCategory) {
        assert_eq!(raw.parse::<BookCategory>(), Ok(expected));
    }

    #[rstest]
    fn rejects_unknown_category() {
        assert!("Poetry".parse::<BookCategory>().is_err());
    }

    #[rstest]
    #[case(BookCategory::HumanScience, CategoryColor::Green)]
    #[case(BookCategory::Maths, CategoryColor::Blue)]
    #[case(BookCategory::Chemistry, CategoryColor::Purple)]
    #[case(BookCategory::Physics, CategoryColor::Yellow)]
    #[case(BookCategory::Novels, CategoryColor::Pink)]
    #[case(BookCategory::Other, CategoryColor::Gray)]
    fn colour_codes_categories(#[case] category: BookCategory, #[case] expected: CategoryColor) {
        assert_eq!(category.color(), expected);
    }

    #[rstest]
    fn serde_uses_labels() {
        let value = serde_json::to_value(BookCategory::HumanScience).expect("serialises");
        assert_eq!(value, serde_json::json!("Human Science"));
    }

    #[rstest]
    #[case(Some("  "), None)]
    #[case(Some(" Science Press "), Some("Science Press"))]
    #[case(None, None)]
    fn optional_text_drops_blank(#[case] raw: Option<&str>, #[case] expected: Option<&str>) {
        assert_eq!(optional_text(raw).as_deref(), expected);
    }
}
