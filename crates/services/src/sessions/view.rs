use chrono::{DateTime, Utc};
use std::sync::Arc;

use study_core::Clock;
use study_core::model::{DeckId, UserId};
use storage::repository::{SessionRecordRepository, SessionRecordRow};

use super::queries::SessionQueries;
use crate::error::SessionError;

/// Storage identifier for a persisted session record.
///
/// NOTE: This is currently `i64` to match `SQLite` row IDs.
pub type SessionRecordId = i64;

/// Presentation-agnostic list item for a session record.
///
/// This is intentionally **not** a UI view-model:
/// - no pre-formatted strings
/// - no localization assumptions
///
/// The UI may format timestamps and percentages as needed.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecordListItem {
    pub id: SessionRecordId,
    pub reviewed_at: DateTime<Utc>,

    pub total: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub score_percentage: f64,
}

impl SessionRecordListItem {
    #[must_use]
    pub fn from_row(row: &SessionRecordRow) -> Self {
        let summary = &row.summary;
        Self {
            id: row.id,
            reviewed_at: summary.reviewed_at(),
            total: summary.total(),
            correct: summary.correct(),
            incorrect: summary.incorrect(),
            score_percentage: summary.score_percentage(),
        }
    }
}

/// Latest record per deck, preserving deck identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecordDeckItem {
    pub deck_id: DeckId,
    pub id: SessionRecordId,
    pub reviewed_at: DateTime<Utc>,

    pub total: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub score_percentage: f64,
}

impl SessionRecordDeckItem {
    #[must_use]
    pub fn from_row(row: &SessionRecordRow) -> Self {
        let summary = &row.summary;
        Self {
            deck_id: summary.deck_id(),
            id: row.id,
            reviewed_at: summary.reviewed_at(),
            total: summary.total(),
            correct: summary.correct(),
            incorrect: summary.incorrect(),
            score_percentage: summary.score_percentage(),
        }
    }
}

/// Presentation-facing record history facade that hides repositories and time
/// from the UI.
///
/// This service owns:
/// - the time source (`Clock`)
/// - repository access
///
/// It does **not** own UI formatting, and it does not compute streaks; the
/// host derives those from `list_user_history`.
#[derive(Clone)]
pub struct SessionRecordService {
    clock: Clock,
    records: Arc<dyn SessionRecordRepository>,
}

impl SessionRecordService {
    #[must_use]
    pub fn new(clock: Clock, records: Arc<dyn SessionRecordRepository>) -> Self {
        Self { clock, records }
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::new(
            clock,
            Arc::new(storage::repository::InMemoryRepository::new()),
        )
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Load recent records for a deck.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_recent_records(
        &self,
        deck_id: DeckId,
        days: i64,
        limit: u32,
    ) -> Result<Vec<SessionRecordListItem>, SessionError> {
        let now = self.clock.now();
        let rows =
            SessionQueries::list_recent_records(deck_id, self.records.as_ref(), now, days, limit)
                .await?;

        Ok(rows.iter().map(SessionRecordListItem::from_row).collect())
    }

    /// Load the latest record per deck.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_latest_by_deck(
        &self,
        deck_ids: &[DeckId],
    ) -> Result<Vec<SessionRecordDeckItem>, SessionError> {
        let rows = SessionQueries::list_latest_records(deck_ids, self.records.as_ref()).await?;
        Ok(rows.iter().map(SessionRecordDeckItem::from_row).collect())
    }

    /// Load a user's completed-pass history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_user_history(
        &self,
        user_id: UserId,
        days: i64,
        limit: u32,
    ) -> Result<Vec<SessionRecordDeckItem>, SessionError> {
        let now = self.clock.now();
        let from = now - chrono::Duration::days(days);
        let rows = SessionQueries::list_user_records(
            user_id,
            self.records.as_ref(),
            Some(from),
            Some(now),
            limit,
        )
        .await?;
        Ok(rows.iter().map(SessionRecordDeckItem::from_row).collect())
    }

    /// Fetch a session record by ID.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when the record is missing or storage
    /// fails.
    pub async fn get_record(
        &self,
        id: SessionRecordId,
    ) -> Result<SessionRecordListItem, SessionError> {
        let row = SessionQueries::get_record(id, self.records.as_ref()).await?;
        Ok(SessionRecordListItem::from_row(&row))
    }
}
