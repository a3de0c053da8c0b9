use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use study_core::model::{Card, CardError, CardId, Deck, DeckId, SessionSummary, UserId};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── CARD RECORD ───────────────────────────────────────────────────────────────
//

/// Persisted shape for a card.
///
/// `options` is `Some` for multiple-choice cards and `None` for free recall,
/// so repositories can round-trip the card kind without leaking storage
/// concerns into the domain layer.
#[derive(Debug, Clone)]
pub struct CardRecord {
    pub id: CardId,
    pub deck_id: DeckId,
    pub question: String,
    pub answer: String,
    pub options: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl CardRecord {
    #[must_use]
    pub fn from_card(card: &Card) -> Self {
        let options = if card.is_multiple_choice() {
            Some(card.options().to_vec())
        } else {
            None
        };
        Self {
            id: card.id(),
            deck_id: card.deck_id(),
            question: card.question().to_owned(),
            answer: card.answer().to_owned(),
            options,
            created_at: card.created_at(),
        }
    }

    /// Convert the record back into a domain `Card`.
    ///
    /// # Errors
    ///
    /// Returns `CardError` if the persisted faces or options fail validation.
    pub fn into_card(self) -> Result<Card, CardError> {
        match self.options {
            Some(options) => Card::multiple_choice(
                self.id,
                self.deck_id,
                self.question,
                self.answer,
                options,
                self.created_at,
            ),
            None => Card::free_recall(
                self.id,
                self.deck_id,
                self.question,
                self.answer,
                self.created_at,
            ),
        }
    }
}

//
// ─── SESSION RECORDS ───────────────────────────────────────────────────────────
//

/// Insert shape for a completed study pass, exactly the submission contract:
/// deck identity, user identity, review time, counts, and the score.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSessionRecord {
    pub deck_id: DeckId,
    pub deck_name: String,
    pub user_id: UserId,
    pub reviewed_at: DateTime<Utc>,
    pub correct: u32,
    pub incorrect: u32,
    pub score_percentage: f64,
}

impl NewSessionRecord {
    #[must_use]
    pub fn from_summary(summary: &SessionSummary, user_id: UserId) -> Self {
        Self {
            deck_id: summary.deck_id(),
            deck_name: summary.deck_name().to_owned(),
            user_id,
            reviewed_at: summary.reviewed_at(),
            correct: summary.correct(),
            incorrect: summary.incorrect(),
            score_percentage: summary.score_percentage(),
        }
    }
}

/// Persisted session record with its storage identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecordRow {
    pub id: i64,
    pub user_id: UserId,
    pub summary: SessionSummary,
}

impl SessionRecordRow {
    #[must_use]
    pub fn new(id: i64, user_id: UserId, summary: SessionSummary) -> Self {
        Self {
            id,
            user_id,
            summary,
        }
    }
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Repository contract for decks.
#[async_trait]
pub trait DeckRepository: Send + Sync {
    /// Persist or update a deck.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deck cannot be stored.
    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError>;

    /// Fetch a deck by ID; `None` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError>;

    /// List all decks ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_decks(&self) -> Result<Vec<Deck>, StorageError>;
}

#[async_trait]
pub trait CardRepository: Send + Sync {
    /// Persist or update a card.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the card cannot be stored.
    async fn upsert_card(&self, card: &Card) -> Result<(), StorageError>;

    /// List a deck's cards in stable order (by ID).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_cards(&self, deck_id: DeckId) -> Result<Vec<Card>, StorageError>;
}

/// Append-only history of completed study passes.
#[async_trait]
pub trait SessionRecordRepository: Send + Sync {
    /// Append one completed-pass record and return its storage ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn append_record(&self, record: &NewSessionRecord) -> Result<i64, StorageError>;

    /// Fetch a record by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_record(&self, id: i64) -> Result<SessionRecordRow, StorageError>;

    /// List a deck's records, newest first, within an optional review-time range.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_records(
        &self,
        deck_id: DeckId,
        reviewed_from: Option<DateTime<Utc>>,
        reviewed_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<SessionRecordRow>, StorageError>;

    /// List a user's records across decks, newest first, within an optional range.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_records_for_user(
        &self,
        user_id: UserId,
        reviewed_from: Option<DateTime<Utc>>,
        reviewed_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<SessionRecordRow>, StorageError>;

    /// Latest record per deck, for decks that have any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_latest_records(
        &self,
        deck_ids: &[DeckId],
    ) -> Result<Vec<SessionRecordRow>, StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    decks: Arc<Mutex<HashMap<DeckId, Deck>>>,
    cards: Arc<Mutex<HashMap<(DeckId, CardId), Card>>>,
    records: Arc<Mutex<Vec<SessionRecordRow>>>,
    next_record_id: Arc<Mutex<i64>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock<'a, T>(
        mutex: &'a Mutex<T>,
    ) -> Result<std::sync::MutexGuard<'a, T>, StorageError> {
        mutex
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl DeckRepository for InMemoryRepository {
    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.decks)?;
        guard.insert(deck.id(), deck.clone());
        Ok(())
    }

    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError> {
        let guard = Self::lock(&self.decks)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_decks(&self) -> Result<Vec<Deck>, StorageError> {
        let guard = Self::lock(&self.decks)?;
        let mut decks: Vec<Deck> = guard.values().cloned().collect();
        decks.sort_by_key(Deck::id);
        Ok(decks)
    }
}

#[async_trait]
impl CardRepository for InMemoryRepository {
    async fn upsert_card(&self, card: &Card) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.cards)?;
        guard.insert((card.deck_id(), card.id()), card.clone());
        Ok(())
    }

    async fn list_cards(&self, deck_id: DeckId) -> Result<Vec<Card>, StorageError> {
        let guard = Self::lock(&self.cards)?;
        let mut cards: Vec<Card> = guard
            .iter()
            .filter(|((deck, _), _)| *deck == deck_id)
            .map(|(_, card)| card.clone())
            .collect();
        cards.sort_by_key(Card::id);
        Ok(cards)
    }
}

fn in_range(
    at: DateTime<Utc>,
    from: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> bool {
    if let Some(from) = from {
        if at < from {
            return false;
        }
    }
    if let Some(until) = until {
        if at > until {
            return false;
        }
    }
    true
}

fn newest_first(rows: &mut [SessionRecordRow]) {
    rows.sort_by(|a, b| {
        b.summary
            .reviewed_at()
            .cmp(&a.summary.reviewed_at())
            .then(b.id.cmp(&a.id))
    });
}

#[async_trait]
impl SessionRecordRepository for InMemoryRepository {
    async fn append_record(&self, record: &NewSessionRecord) -> Result<i64, StorageError> {
        let mut next_id = Self::lock(&self.next_record_id)?;
        *next_id += 1;
        let id = *next_id;

        let summary = SessionSummary::from_persisted(
            record.deck_id,
            record.deck_name.clone(),
            record.reviewed_at,
            record.correct,
            record.incorrect,
        );
        let mut guard = Self::lock(&self.records)?;
        guard.push(SessionRecordRow::new(id, record.user_id, summary));
        Ok(id)
    }

    async fn get_record(&self, id: i64) -> Result<SessionRecordRow, StorageError> {
        let guard = Self::lock(&self.records)?;
        guard
            .iter()
            .find(|row| row.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_records(
        &self,
        deck_id: DeckId,
        reviewed_from: Option<DateTime<Utc>>,
        reviewed_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<SessionRecordRow>, StorageError> {
        let guard = Self::lock(&self.records)?;
        let mut rows: Vec<SessionRecordRow> = guard
            .iter()
            .filter(|row| row.summary.deck_id() == deck_id)
            .filter(|row| in_range(row.summary.reviewed_at(), reviewed_from, reviewed_until))
            .cloned()
            .collect();
        newest_first(&mut rows);
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn list_records_for_user(
        &self,
        user_id: UserId,
        reviewed_from: Option<DateTime<Utc>>,
        reviewed_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<SessionRecordRow>, StorageError> {
        let guard = Self::lock(&self.records)?;
        let mut rows: Vec<SessionRecordRow> = guard
            .iter()
            .filter(|row| row.user_id == user_id)
            .filter(|row| in_range(row.summary.reviewed_at(), reviewed_from, reviewed_until))
            .cloned()
            .collect();
        newest_first(&mut rows);
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn list_latest_records(
        &self,
        deck_ids: &[DeckId],
    ) -> Result<Vec<SessionRecordRow>, StorageError> {
        let wanted: HashSet<DeckId> = deck_ids.iter().copied().collect();
        let guard = Self::lock(&self.records)?;
        let mut rows: Vec<SessionRecordRow> = guard
            .iter()
            .filter(|row| wanted.contains(&row.summary.deck_id()))
            .cloned()
            .collect();
        newest_first(&mut rows);

        let mut seen = HashSet::new();
        rows.retain(|row| seen.insert(row.summary.deck_id()));
        Ok(rows)
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub decks: Arc<dyn DeckRepository>,
    pub cards: Arc<dyn CardRepository>,
    pub records: Arc<dyn SessionRecordRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let decks: Arc<dyn DeckRepository> = Arc::new(repo.clone());
        let cards: Arc<dyn CardRepository> = Arc::new(repo.clone());
        let records: Arc<dyn SessionRecordRepository> = Arc::new(repo);
        Self {
            decks,
            cards,
            records,
        }
    }
}
