use chrono::{DateTime, Utc};

use study_core::model::{Deck, DeckId, UserId};
use storage::repository::{
    CardRepository, DeckRepository, SessionRecordRepository, SessionRecordRow,
};

use super::controller::StudySession;
use crate::error::SessionError;

/// Storage-backed session builders and record lookups.
pub(crate) struct SessionQueries;

impl SessionQueries {
    /// Create a session from a deck's full card list.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the deck has no cards, or
    /// `SessionError::Storage` on repository failures (including a missing
    /// deck).
    pub async fn start_from_storage(
        deck_id: DeckId,
        decks: &dyn DeckRepository,
        cards: &dyn CardRepository,
        now: DateTime<Utc>,
        shuffle: bool,
    ) -> Result<(Deck, StudySession), SessionError> {
        let deck = decks
            .get_deck(deck_id)
            .await?
            .ok_or(storage::repository::StorageError::NotFound)?;
        let cards = cards.list_cards(deck_id).await?;

        let mut session = StudySession::new(deck.id(), deck.name(), cards, now)?;
        if shuffle {
            session.shuffle();
        }
        Ok((deck, session))
    }

    /// Fetch a persisted session record by ID.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the record is missing or storage
    /// fails.
    pub async fn get_record(
        id: i64,
        records: &dyn SessionRecordRepository,
    ) -> Result<SessionRecordRow, SessionError> {
        let row = records.get_record(id).await?;
        Ok(row)
    }

    /// List a deck's records within an optional review-time range.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_records(
        deck_id: DeckId,
        records: &dyn SessionRecordRepository,
        reviewed_from: Option<DateTime<Utc>>,
        reviewed_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<SessionRecordRow>, SessionError> {
        let rows = records
            .list_records(deck_id, reviewed_from, reviewed_until, limit)
            .await?;
        Ok(rows)
    }

    /// List recent records for a deck with a default time window.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_recent_records(
        deck_id: DeckId,
        records: &dyn SessionRecordRepository,
        now: DateTime<Utc>,
        days: i64,
        limit: u32,
    ) -> Result<Vec<SessionRecordRow>, SessionError> {
        let from = now - chrono::Duration::days(days);
        Self::list_records(deck_id, records, Some(from), Some(now), limit).await
    }

    /// List a user's records across decks within an optional range.
    ///
    /// The host computes day-streaks from this history; the engine only
    /// serves the rows.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_user_records(
        user_id: UserId,
        records: &dyn SessionRecordRepository,
        reviewed_from: Option<DateTime<Utc>>,
        reviewed_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<SessionRecordRow>, SessionError> {
        let rows = records
            .list_records_for_user(user_id, reviewed_from, reviewed_until, limit)
            .await?;
        Ok(rows)
    }

    /// List the latest record for each deck.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_latest_records(
        deck_ids: &[DeckId],
        records: &dyn SessionRecordRepository,
    ) -> Result<Vec<SessionRecordRow>, SessionError> {
        let rows = records.list_latest_records(deck_ids).await?;
        Ok(rows)
    }
}
