use chrono::{DateTime, Duration, Utc};
use rand::rng;
use rand::seq::SliceRandom;
use std::fmt;

use study_core::model::{
    Card, CardGrade, CardId, DeckId, GradeSource, Outcome, SessionSummary,
};

use super::progress::SessionProgress;
use crate::error::SessionError;

/// Delay between grading a card and automatically advancing to the next one,
/// long enough for the user to see the feedback before the view moves on.
pub const DEFAULT_ADVANCE_DELAY: Duration = Duration::milliseconds(1_000);

//
// ─── STUDY CARD ────────────────────────────────────────────────────────────────
//

/// One card within a pass plus its grading state.
///
/// The grade is unset until the card is answered, then fixed for the rest of
/// the pass; `restart` clears it.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyCard {
    card: Card,
    grade: Option<CardGrade>,
}

impl StudyCard {
    fn new(card: Card) -> Self {
        Self { card, grade: None }
    }

    #[must_use]
    pub fn card(&self) -> &Card {
        &self.card
    }

    #[must_use]
    pub fn grade(&self) -> Option<&CardGrade> {
        self.grade.as_ref()
    }

    #[must_use]
    pub fn is_graded(&self) -> bool {
        self.grade.is_some()
    }
}

//
// ─── PENDING ADVANCE ───────────────────────────────────────────────────────────
//

/// Armed one-shot auto-advance. It may only move the cursor if the graded
/// card is still the current one when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAdvance {
    pub card_id: CardId,
    pub fire_at: DateTime<Utc>,
}

/// Result of a grading operation.
///
/// `AlreadyGraded` is the idempotent no-op path for repeated input on a card
/// that was graded earlier in the pass; it is not an error and never
/// double-counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Graded(CardGrade),
    AlreadyGraded,
}

//
// ─── STUDY SESSION ─────────────────────────────────────────────────────────────
//

/// Single source of truth for one study pass over a deck's cards.
///
/// All transitions are synchronous; the only asynchronous collaborator is the
/// auto-advance task in [`super::advance`], which calls back into
/// [`StudySession::fire_auto_advance`].
pub struct StudySession {
    deck_id: DeckId,
    deck_name: String,
    cards: Vec<StudyCard>,
    current: usize,
    revealed: bool,
    started_at: DateTime<Utc>,
    advance_delay: Duration,
    pending_advance: Option<PendingAdvance>,
    record_id: Option<i64>,
}

impl StudySession {
    /// Create a new pass over the given cards.
    ///
    /// `started_at` should come from the services layer clock to keep time
    /// deterministic.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no cards are provided.
    pub fn new(
        deck_id: DeckId,
        deck_name: impl Into<String>,
        cards: Vec<Card>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if cards.is_empty() {
            return Err(SessionError::Empty);
        }

        Ok(Self {
            deck_id,
            deck_name: deck_name.into(),
            cards: cards.into_iter().map(StudyCard::new).collect(),
            current: 0,
            revealed: false,
            started_at,
            advance_delay: DEFAULT_ADVANCE_DELAY,
            pending_advance: None,
            record_id: None,
        })
    }

    /// Override the auto-advance delay (tests, accessibility settings).
    #[must_use]
    pub fn with_advance_delay(mut self, delay: Duration) -> Self {
        self.advance_delay = delay;
        self
    }

    // Accessors
    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn deck_name(&self) -> &str {
        &self.deck_name
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn advance_delay(&self) -> Duration {
        self.advance_delay
    }

    #[must_use]
    pub fn cards(&self) -> &[StudyCard] {
        &self.cards
    }

    #[must_use]
    pub fn total_cards(&self) -> usize {
        self.cards.len()
    }

    /// `current` is always a valid index; a pass has at least one card and
    /// every cursor move clamps.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_card(&self) -> &StudyCard {
        &self.cards[self.current]
    }

    /// Whether the current card's answer face is showing.
    #[must_use]
    pub fn revealed(&self) -> bool {
        self.revealed
    }

    #[must_use]
    pub fn pending_advance(&self) -> Option<PendingAdvance> {
        self.pending_advance
    }

    #[must_use]
    pub fn record_id(&self) -> Option<i64> {
        self.record_id
    }

    pub(crate) fn set_record_id(&mut self, id: i64) {
        self.record_id = Some(id);
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.cards.iter().filter(|card| card.is_graded()).count()
    }

    /// True iff every card's grade is set.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.cards.iter().all(StudyCard::is_graded)
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let mut correct = 0;
        let mut incorrect = 0;
        for card in &self.cards {
            match card.grade() {
                Some(grade) if grade.outcome.is_correct() => correct += 1,
                Some(_) => incorrect += 1,
                None => {}
            }
        }
        SessionProgress {
            total: self.total_cards(),
            answered: correct + incorrect,
            remaining: self.total_cards() - correct - incorrect,
            correct,
            incorrect,
            is_complete: self.is_complete(),
        }
    }

    //
    // ─── GRADING ───────────────────────────────────────────────────────────────
    //

    /// Answer the current multiple-choice card with the option at `selected`.
    ///
    /// The grade is `Correct` iff the selected option equals the stored
    /// answer. Arms the auto-advance on success.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongCardKind` for free-recall cards and
    /// `SessionError::InvalidOption` when `selected` is out of range.
    pub fn answer_choice(
        &mut self,
        selected: usize,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, SessionError> {
        let card = self.current_card().card();
        if !card.is_multiple_choice() {
            return Err(SessionError::WrongCardKind);
        }
        if self.current_card().is_graded() {
            return Ok(AnswerOutcome::AlreadyGraded);
        }
        let options = card.options();
        if selected >= options.len() {
            return Err(SessionError::InvalidOption {
                selected,
                available: options.len(),
            });
        }

        let outcome = if options[selected] == card.answer() {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        };
        Ok(AnswerOutcome::Graded(self.grade_current(
            outcome,
            GradeSource::Choice { selected },
            now,
        )))
    }

    /// Flip the current free-recall card.
    ///
    /// The first flip of a never-graded card grades it `Incorrect` with
    /// `GradeSource::Revealed` and arms the auto-advance: needing to see the
    /// answer means it was not known. Later flips only toggle the face.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongCardKind` for multiple-choice cards.
    pub fn reveal(&mut self, now: DateTime<Utc>) -> Result<AnswerOutcome, SessionError> {
        if self.current_card().card().is_multiple_choice() {
            return Err(SessionError::WrongCardKind);
        }

        let flipping_open = !self.revealed;
        self.revealed = !self.revealed;

        if flipping_open && !self.current_card().is_graded() {
            return Ok(AnswerOutcome::Graded(self.grade_current(
                Outcome::Incorrect,
                GradeSource::Revealed,
                now,
            )));
        }
        Ok(AnswerOutcome::AlreadyGraded)
    }

    /// Self-report the current free-recall card as known.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongCardKind` for multiple-choice cards.
    pub fn mark_known(&mut self, now: DateTime<Utc>) -> Result<AnswerOutcome, SessionError> {
        self.self_report(Outcome::Correct, now)
    }

    /// Self-report the current free-recall card as not known.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongCardKind` for multiple-choice cards.
    pub fn mark_unknown(&mut self, now: DateTime<Utc>) -> Result<AnswerOutcome, SessionError> {
        self.self_report(Outcome::Incorrect, now)
    }

    fn self_report(
        &mut self,
        outcome: Outcome,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, SessionError> {
        if self.current_card().card().is_multiple_choice() {
            return Err(SessionError::WrongCardKind);
        }
        if self.current_card().is_graded() {
            return Ok(AnswerOutcome::AlreadyGraded);
        }
        Ok(AnswerOutcome::Graded(self.grade_current(
            outcome,
            GradeSource::SelfReport,
            now,
        )))
    }

    fn grade_current(
        &mut self,
        outcome: Outcome,
        source: GradeSource,
        now: DateTime<Utc>,
    ) -> CardGrade {
        let grade = CardGrade::new(outcome, source, now);
        let card_id = self.current_card().card().id();
        self.cards[self.current].grade = Some(grade);
        self.pending_advance = Some(PendingAdvance {
            card_id,
            fire_at: now + self.advance_delay,
        });
        grade
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    /// Move to the next card; no-op at the last card.
    pub fn go_to_next(&mut self) {
        self.go_to(self.current.saturating_add(1));
    }

    /// Move to the previous card; no-op at the first card.
    pub fn go_to_previous(&mut self) {
        self.go_to(self.current.saturating_sub(1));
    }

    /// Jump to card `index`, clamped to the valid range.
    ///
    /// Manual navigation always cancels a pending auto-advance, and the
    /// answer face resets whenever the cursor actually moves.
    pub fn go_to(&mut self, index: usize) {
        self.pending_advance = None;
        let clamped = index.min(self.cards.len() - 1);
        if clamped != self.current {
            self.current = clamped;
            self.revealed = false;
        }
    }

    /// Uniformly permute the card order; grades travel with their cards.
    ///
    /// The cursor keeps its numeric position, so the card now at that index
    /// becomes current. The answer face resets and any pending advance is
    /// cancelled since the current card's identity changed.
    pub fn shuffle(&mut self) {
        let mut rng = rng();
        self.cards.as_mut_slice().shuffle(&mut rng);
        self.pending_advance = None;
        self.revealed = false;
    }

    /// Clear every grade and start the pass over.
    pub fn restart(&mut self) {
        for card in &mut self.cards {
            card.grade = None;
        }
        self.current = 0;
        self.revealed = false;
        self.pending_advance = None;
        self.record_id = None;
    }

    /// Apply a due auto-advance.
    ///
    /// Moves the cursor (clamped) only when the armed card is still current;
    /// a stale arm is dropped without moving, which guards against a firing
    /// that races a manual navigation. Returns whether the cursor moved.
    pub fn fire_auto_advance(&mut self, now: DateTime<Utc>) -> bool {
        let Some(pending) = self.pending_advance else {
            return false;
        };
        if now < pending.fire_at {
            return false;
        }
        self.pending_advance = None;
        if self.current_card().card().id() != pending.card_id {
            return false;
        }

        let next = (self.current + 1).min(self.cards.len() - 1);
        if next == self.current {
            return false;
        }
        self.current = next;
        self.revealed = false;
        true
    }

    //
    // ─── SUMMARY ───────────────────────────────────────────────────────────────
    //

    /// Build the aggregate summary for a completed pass.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotComplete` while any card is ungraded.
    pub fn build_summary(
        &self,
        reviewed_at: DateTime<Utc>,
    ) -> Result<SessionSummary, SessionError> {
        let mut grades = Vec::with_capacity(self.cards.len());
        for card in &self.cards {
            match card.grade() {
                Some(grade) => grades.push(*grade),
                None => return Err(SessionError::NotComplete),
            }
        }
        Ok(SessionSummary::from_grades(
            self.deck_id,
            self.deck_name.clone(),
            reviewed_at,
            &grades,
        )?)
    }
}

impl fmt::Debug for StudySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudySession")
            .field("deck_id", &self.deck_id)
            .field("cards_len", &self.cards.len())
            .field("current", &self.current)
            .field("revealed", &self.revealed)
            .field("answered", &self.answered_count())
            .field("started_at", &self.started_at)
            .field("record_id", &self.record_id)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use study_core::model::CardId;
    use study_core::time::fixed_now;

    fn choice_card(id: u64, options: &[&str], answer: &str) -> Card {
        Card::multiple_choice(
            CardId::new(id),
            DeckId::new(1),
            format!("Q{id}"),
            answer,
            options.iter().map(|s| (*s).to_owned()).collect(),
            fixed_now(),
        )
        .unwrap()
    }

    fn recall_card(id: u64) -> Card {
        Card::free_recall(
            CardId::new(id),
            DeckId::new(1),
            format!("Q{id}"),
            format!("A{id}"),
            fixed_now(),
        )
        .unwrap()
    }

    fn mixed_session() -> StudySession {
        StudySession::new(
            DeckId::new(1),
            "Test",
            vec![choice_card(1, &["3", "4"], "4"), recall_card(2)],
            fixed_now(),
        )
        .unwrap()
    }

    fn after_delay(session: &StudySession) -> DateTime<Utc> {
        fixed_now() + session.advance_delay() + Duration::milliseconds(1)
    }

    #[test]
    fn empty_session_returns_error() {
        let err =
            StudySession::new(DeckId::new(1), "Test", Vec::new(), fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::Empty));
    }

    #[test]
    fn mixed_pass_produces_expected_summary() {
        let mut session = mixed_session();

        let outcome = session.answer_choice(1, fixed_now()).unwrap();
        let AnswerOutcome::Graded(grade) = outcome else {
            panic!("expected a fresh grade");
        };
        assert_eq!(grade.outcome, Outcome::Correct);
        assert!(!session.is_complete());

        assert!(session.fire_auto_advance(after_delay(&session)));
        assert_eq!(session.current_index(), 1);

        let outcome = session.mark_unknown(fixed_now()).unwrap();
        let AnswerOutcome::Graded(grade) = outcome else {
            panic!("expected a fresh grade");
        };
        assert_eq!(grade.outcome, Outcome::Incorrect);
        assert_eq!(grade.source, GradeSource::SelfReport);
        assert!(session.is_complete());

        let summary = session.build_summary(fixed_now()).unwrap();
        assert_eq!(summary.correct(), 1);
        assert_eq!(summary.incorrect(), 1);
        assert!((summary.score_percentage() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn wrong_option_grades_incorrect() {
        let mut session = mixed_session();
        let AnswerOutcome::Graded(grade) = session.answer_choice(0, fixed_now()).unwrap()
        else {
            panic!("expected a fresh grade");
        };
        assert_eq!(grade.outcome, Outcome::Incorrect);
        assert_eq!(grade.source, GradeSource::Choice { selected: 0 });
    }

    #[test]
    fn grading_is_idempotent() {
        let mut session = mixed_session();
        session.answer_choice(0, fixed_now()).unwrap();
        let first = *session.current_card().grade().unwrap();

        let outcome = session.answer_choice(1, fixed_now()).unwrap();
        assert_eq!(outcome, AnswerOutcome::AlreadyGraded);
        assert_eq!(session.current_card().grade(), Some(&first));
        assert_eq!(session.progress().answered, 1);
    }

    #[test]
    fn grading_checks_card_kind() {
        let mut session = mixed_session();
        assert!(matches!(
            session.reveal(fixed_now()),
            Err(SessionError::WrongCardKind)
        ));
        assert!(matches!(
            session.mark_known(fixed_now()),
            Err(SessionError::WrongCardKind)
        ));

        session.go_to(1);
        assert!(matches!(
            session.answer_choice(0, fixed_now()),
            Err(SessionError::WrongCardKind)
        ));
    }

    #[test]
    fn out_of_range_option_is_rejected() {
        let mut session = mixed_session();
        let err = session.answer_choice(5, fixed_now()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidOption {
                selected: 5,
                available: 2
            }
        ));
        assert!(!session.current_card().is_graded());
    }

    #[test]
    fn reveal_grades_incorrect_and_keeps_grade_on_later_marks() {
        let mut session = mixed_session();
        session.go_to(1);

        let AnswerOutcome::Graded(grade) = session.reveal(fixed_now()).unwrap() else {
            panic!("first reveal should grade");
        };
        assert!(session.revealed());
        assert_eq!(grade.outcome, Outcome::Incorrect);
        assert_eq!(grade.source, GradeSource::Revealed);

        // Reveal and the self-report buttons are alternatives: once the card
        // was flipped, know / don't-know hit the already-graded guard.
        assert_eq!(
            session.mark_known(fixed_now()).unwrap(),
            AnswerOutcome::AlreadyGraded
        );
        assert_eq!(
            session.current_card().grade().unwrap().source,
            GradeSource::Revealed
        );

        // Later flips only toggle the face.
        assert_eq!(
            session.reveal(fixed_now()).unwrap(),
            AnswerOutcome::AlreadyGraded
        );
        assert!(!session.revealed());
    }

    #[test]
    fn navigation_clamps_at_both_ends() {
        let mut session = mixed_session();
        session.go_to_previous();
        assert_eq!(session.current_index(), 0);

        session.go_to(99);
        assert_eq!(session.current_index(), 1);

        session.go_to_next();
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn index_change_resets_revealed() {
        let mut session = mixed_session();
        session.go_to(1);
        session.reveal(fixed_now()).unwrap();
        assert!(session.revealed());

        session.go_to_previous();
        assert!(!session.revealed());
    }

    #[test]
    fn manual_navigation_cancels_pending_advance() {
        let mut session = mixed_session();
        session.answer_choice(1, fixed_now()).unwrap();
        assert!(session.pending_advance().is_some());

        session.go_to_next();
        assert!(session.pending_advance().is_none());
        assert_eq!(session.current_index(), 1);

        // A late firing after the user already moved must not advance again.
        assert!(!session.fire_auto_advance(after_delay(&session)));
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn auto_advance_waits_for_its_delay() {
        let mut session = mixed_session();
        session.answer_choice(1, fixed_now()).unwrap();

        assert!(!session.fire_auto_advance(fixed_now()));
        assert!(session.pending_advance().is_some());
        assert_eq!(session.current_index(), 0);

        assert!(session.fire_auto_advance(after_delay(&session)));
        assert_eq!(session.current_index(), 1);
        assert!(session.pending_advance().is_none());
    }

    #[test]
    fn auto_advance_on_last_card_stays_put() {
        let mut session = mixed_session();
        session.go_to(1);
        session.mark_known(fixed_now()).unwrap();

        assert!(!session.fire_auto_advance(after_delay(&session)));
        assert_eq!(session.current_index(), 1);
        assert!(session.pending_advance().is_none());
    }

    #[test]
    fn restart_clears_grades_and_supports_a_fresh_pass() {
        let mut session = mixed_session();
        session.answer_choice(0, fixed_now()).unwrap();
        session.go_to(1);
        session.mark_unknown(fixed_now()).unwrap();
        assert!(session.is_complete());
        session.set_record_id(7);

        session.restart();
        assert_eq!(session.current_index(), 0);
        assert!(!session.is_complete());
        assert_eq!(session.answered_count(), 0);
        assert_eq!(session.record_id(), None);

        // The new pass's summary reflects only the new answers.
        session.answer_choice(1, fixed_now()).unwrap();
        session.go_to(1);
        session.mark_known(fixed_now()).unwrap();
        let summary = session.build_summary(fixed_now()).unwrap();
        assert_eq!(summary.correct(), 2);
        assert_eq!(summary.incorrect(), 0);
    }

    #[test]
    fn summary_requires_completion() {
        let session = mixed_session();
        let err = session.build_summary(fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::NotComplete));
    }

    #[test]
    fn completeness_is_derived_after_every_operation() {
        let mut session = mixed_session();
        assert!(!session.is_complete());

        session.answer_choice(1, fixed_now()).unwrap();
        assert!(!session.is_complete());

        session.go_to(1);
        session.mark_known(fixed_now()).unwrap();
        assert!(session.is_complete());

        session.shuffle();
        assert!(session.is_complete());

        session.restart();
        assert!(!session.is_complete());
    }

    #[test]
    fn shuffle_preserves_cards_and_grades() {
        let cards: Vec<Card> = (1..=5).map(recall_card).collect();
        let mut session =
            StudySession::new(DeckId::new(1), "Test", cards, fixed_now()).unwrap();
        session.mark_known(fixed_now()).unwrap();

        let ids_before: HashSet<CardId> =
            session.cards().iter().map(|c| c.card().id()).collect();

        session.shuffle();

        let ids_after: HashSet<CardId> =
            session.cards().iter().map(|c| c.card().id()).collect();
        assert_eq!(ids_before, ids_after);
        assert_eq!(session.cards().len(), 5);
        assert_eq!(session.answered_count(), 1);

        // The graded card kept its grade wherever it landed.
        let graded: Vec<&StudyCard> = session
            .cards()
            .iter()
            .filter(|c| c.is_graded())
            .collect();
        assert_eq!(graded.len(), 1);
        assert_eq!(graded[0].card().id(), CardId::new(1));
    }

    #[test]
    fn shuffle_changes_order_eventually() {
        let cards: Vec<Card> = (1..=5).map(recall_card).collect();
        let mut session =
            StudySession::new(DeckId::new(1), "Test", cards, fixed_now()).unwrap();
        let original: Vec<CardId> =
            session.cards().iter().map(|c| c.card().id()).collect();

        let mut changed = false;
        for _ in 0..20 {
            session.shuffle();
            let order: Vec<CardId> =
                session.cards().iter().map(|c| c.card().id()).collect();
            if order != original {
                changed = true;
                break;
            }
        }
        assert!(changed, "twenty shuffles of five cards never changed order");
    }
}
