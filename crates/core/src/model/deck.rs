use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::DeckId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeckError {
    #[error("deck name cannot be empty")]
    EmptyName,
}

/// A named collection of flashcards, optionally tagged with a category.
///
/// Sessions receive a deck's identity and card list from the hosting shell;
/// deck management itself happens elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    id: DeckId,
    name: String,
    category: Option<String>,
    created_at: DateTime<Utc>,
}

impl Deck {
    /// Creates a new Deck.
    ///
    /// # Errors
    ///
    /// Returns `DeckError::EmptyName` if name is empty or whitespace-only.
    pub fn new(
        id: DeckId,
        name: impl Into<String>,
        category: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DeckError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DeckError::EmptyName);
        }

        let category = category
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());

        Ok(Self {
            id,
            name: name.trim().to_owned(),
            category,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> DeckId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn deck_new_rejects_empty_name() {
        let err = Deck::new(DeckId::new(1), "   ", None, fixed_now()).unwrap_err();
        assert_eq!(err, DeckError::EmptyName);
    }

    #[test]
    fn deck_trims_name_and_category() {
        let deck = Deck::new(
            DeckId::new(1),
            "  Biology 101  ",
            Some("  Science  ".into()),
            fixed_now(),
        )
        .unwrap();

        assert_eq!(deck.name(), "Biology 101");
        assert_eq!(deck.category(), Some("Science"));
    }

    #[test]
    fn deck_filters_blank_category() {
        let deck = Deck::new(DeckId::new(1), "History", Some("   ".into()), fixed_now()).unwrap();
        assert_eq!(deck.category(), None);
    }
}
