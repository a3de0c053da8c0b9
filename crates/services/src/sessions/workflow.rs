use std::sync::Arc;

use study_core::Clock;
use study_core::model::{DeckId, SessionSummary, UserId};
use storage::repository::{CardRepository, DeckRepository, SessionRecordRepository};

use super::controller::{AnswerOutcome, StudySession};
use super::queries::SessionQueries;
use super::reporter::SummaryReporter;
use crate::error::SessionError;

/// Result of a grading operation routed through the loop service.
///
/// `summary` is present once the pass is complete; `record_id` stays `None`
/// when the best-effort submission failed.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAnswerResult {
    pub outcome: AnswerOutcome,
    pub is_complete: bool,
    pub record_id: Option<i64>,
    pub summary: Option<SessionSummary>,
}

/// Orchestrates session start, grading, and summary submission.
///
/// User identity and every collaborator arrive through the constructor; the
/// engine holds no ambient auth or data state.
#[derive(Clone)]
pub struct StudyLoopService {
    clock: Clock,
    decks: Arc<dyn DeckRepository>,
    cards: Arc<dyn CardRepository>,
    reporter: SummaryReporter,
    shuffle_on_start: bool,
}

impl StudyLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        decks: Arc<dyn DeckRepository>,
        cards: Arc<dyn CardRepository>,
        records: Arc<dyn SessionRecordRepository>,
        user_id: UserId,
    ) -> Self {
        Self {
            clock,
            decks,
            cards,
            reporter: SummaryReporter::new(clock, user_id, records),
            shuffle_on_start: false,
        }
    }

    /// Shuffle the card order when a session starts.
    #[must_use]
    pub fn with_shuffle_on_start(mut self, shuffle: bool) -> Self {
        self.shuffle_on_start = shuffle;
        self
    }

    /// Start a new pass over the deck's cards.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for storage or session start failures.
    pub async fn start_session(&self, deck_id: DeckId) -> Result<StudySession, SessionError> {
        let now = self.clock.now();
        let (_deck, session) = SessionQueries::start_from_storage(
            deck_id,
            self.decks.as_ref(),
            self.cards.as_ref(),
            now,
            self.shuffle_on_start,
        )
        .await?;
        Ok(session)
    }

    /// Answer the current multiple-choice card and submit on completion.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for invalid operations; submission failures are
    /// best-effort and never propagate.
    pub async fn answer_choice(
        &self,
        session: &mut StudySession,
        selected: usize,
    ) -> Result<SessionAnswerResult, SessionError> {
        let outcome = session.answer_choice(selected, self.clock.now())?;
        self.finish_turn(session, outcome).await
    }

    /// Flip the current free-recall card (grading it on the first flip) and
    /// submit on completion.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for invalid operations.
    pub async fn reveal(
        &self,
        session: &mut StudySession,
    ) -> Result<SessionAnswerResult, SessionError> {
        let outcome = session.reveal(self.clock.now())?;
        self.finish_turn(session, outcome).await
    }

    /// Self-report the current card as known and submit on completion.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for invalid operations.
    pub async fn mark_known(
        &self,
        session: &mut StudySession,
    ) -> Result<SessionAnswerResult, SessionError> {
        let outcome = session.mark_known(self.clock.now())?;
        self.finish_turn(session, outcome).await
    }

    /// Self-report the current card as not known and submit on completion.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for invalid operations.
    pub async fn mark_unknown(
        &self,
        session: &mut StudySession,
    ) -> Result<SessionAnswerResult, SessionError> {
        let outcome = session.mark_unknown(self.clock.now())?;
        self.finish_turn(session, outcome).await
    }

    /// Retry record persistence after a completed session.
    ///
    /// This is useful when the best-effort submission failed (e.g. transient
    /// storage error) and the user asked to try again.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotComplete` if the session is unfinished and
    /// `SessionError::Storage` if persistence fails.
    pub async fn finalize_record(
        &self,
        session: &mut StudySession,
    ) -> Result<i64, SessionError> {
        self.reporter.finalize_record(session).await
    }

    async fn finish_turn(
        &self,
        session: &mut StudySession,
        outcome: AnswerOutcome,
    ) -> Result<SessionAnswerResult, SessionError> {
        let summary = if session.is_complete() {
            Some(self.reporter.report(session).await?)
        } else {
            None
        };

        Ok(SessionAnswerResult {
            outcome,
            is_complete: session.is_complete(),
            record_id: session.record_id(),
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use study_core::model::{Card, CardId, Deck};
    use study_core::time::{fixed_clock, fixed_now};
    use storage::repository::{InMemoryRepository, SessionRecordRepository};

    async fn seeded_repo() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        let deck = Deck::new(DeckId::new(1), "Mixed", None, fixed_now()).unwrap();
        repo.upsert_deck(&deck).await.unwrap();

        let choice = Card::multiple_choice(
            CardId::new(1),
            deck.id(),
            "2 + 2 = ?",
            "4",
            vec!["3".into(), "4".into()],
            fixed_now(),
        )
        .unwrap();
        let recall =
            Card::free_recall(CardId::new(2), deck.id(), "Q2", "A2", fixed_now()).unwrap();
        repo.upsert_card(&choice).await.unwrap();
        repo.upsert_card(&recall).await.unwrap();
        repo
    }

    fn loop_service(repo: &InMemoryRepository, user_id: UserId) -> StudyLoopService {
        StudyLoopService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            user_id,
        )
    }

    #[tokio::test]
    async fn full_pass_submits_one_record() {
        let repo = seeded_repo().await;
        let user_id = UserId::random();
        let svc = loop_service(&repo, user_id);

        let mut session = svc.start_session(DeckId::new(1)).await.unwrap();

        let first = svc.answer_choice(&mut session, 1).await.unwrap();
        assert!(!first.is_complete);
        assert!(first.summary.is_none());

        session.go_to_next();
        let second = svc.mark_unknown(&mut session).await.unwrap();
        assert!(second.is_complete);
        let summary = second.summary.expect("summary on completion");
        assert_eq!(summary.correct(), 1);
        assert_eq!(summary.incorrect(), 1);

        let record_id = second.record_id.expect("record persisted");
        let row = repo.get_record(record_id).await.unwrap();
        assert_eq!(row.user_id, user_id);
        assert!((row.summary.score_percentage() - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn repeated_grading_does_not_resubmit() {
        let repo = seeded_repo().await;
        let svc = loop_service(&repo, UserId::random());

        let mut session = svc.start_session(DeckId::new(1)).await.unwrap();
        svc.answer_choice(&mut session, 0).await.unwrap();
        session.go_to_next();
        let done = svc.mark_known(&mut session).await.unwrap();
        let record_id = done.record_id.unwrap();

        // Grading the already-graded card again is a no-op all the way down.
        let again = svc.mark_known(&mut session).await.unwrap();
        assert_eq!(again.outcome, AnswerOutcome::AlreadyGraded);
        assert_eq!(again.record_id, Some(record_id));

        let rows = repo
            .list_records(DeckId::new(1), None, None, 10)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn restart_then_complete_submits_a_fresh_record() {
        let repo = seeded_repo().await;
        let svc = loop_service(&repo, UserId::random());

        let mut session = svc.start_session(DeckId::new(1)).await.unwrap();
        svc.answer_choice(&mut session, 0).await.unwrap();
        session.go_to_next();
        svc.mark_unknown(&mut session).await.unwrap();
        let first_id = session.record_id().unwrap();

        session.restart();
        svc.answer_choice(&mut session, 1).await.unwrap();
        session.go_to_next();
        let done = svc.mark_known(&mut session).await.unwrap();
        let second_id = done.record_id.unwrap();
        assert_ne!(first_id, second_id);

        let summary = done.summary.unwrap();
        assert_eq!(summary.correct(), 2);
        assert!((summary.score_percentage() - 100.0).abs() < 1e-9);
    }
}
