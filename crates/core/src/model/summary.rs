use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::DeckId;
use crate::model::grade::CardGrade;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("too many graded cards for a single session: {len}")]
    TooManyCards { len: usize },
}

/// Aggregate result of one completed study pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    deck_id: DeckId,
    deck_name: String,
    reviewed_at: DateTime<Utc>,
    correct: u32,
    incorrect: u32,
}

impl SessionSummary {
    /// Rehydrate a summary from persisted storage.
    #[must_use]
    pub fn from_persisted(
        deck_id: DeckId,
        deck_name: impl Into<String>,
        reviewed_at: DateTime<Utc>,
        correct: u32,
        incorrect: u32,
    ) -> Self {
        Self {
            deck_id,
            deck_name: deck_name.into(),
            reviewed_at,
            correct,
            incorrect,
        }
    }

    /// Build a summary by counting the grades of a completed pass.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::TooManyCards` if the grade count cannot
    /// fit in `u32`.
    pub fn from_grades(
        deck_id: DeckId,
        deck_name: impl Into<String>,
        reviewed_at: DateTime<Utc>,
        grades: &[CardGrade],
    ) -> Result<Self, SessionSummaryError> {
        u32::try_from(grades.len())
            .map_err(|_| SessionSummaryError::TooManyCards { len: grades.len() })?;

        let mut correct = 0_u32;
        let mut incorrect = 0_u32;
        for grade in grades {
            if grade.outcome.is_correct() {
                correct = correct.saturating_add(1);
            } else {
                incorrect = incorrect.saturating_add(1);
            }
        }

        Ok(Self {
            deck_id,
            deck_name: deck_name.into(),
            reviewed_at,
            correct,
            incorrect,
        })
    }

    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn deck_name(&self) -> &str {
        &self.deck_name
    }

    #[must_use]
    pub fn reviewed_at(&self) -> DateTime<Utc> {
        self.reviewed_at
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.correct.saturating_add(self.incorrect)
    }

    /// Percentage of correct cards, `0.0` for an empty pass.
    #[must_use]
    pub fn score_percentage(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        f64::from(self.correct) / f64::from(total) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::grade::{GradeSource, Outcome};
    use crate::time::fixed_now;

    fn grade(outcome: Outcome) -> CardGrade {
        CardGrade::new(outcome, GradeSource::SelfReport, fixed_now())
    }

    #[test]
    fn summary_counts_outcomes() {
        let now = fixed_now();
        let grades = vec![
            grade(Outcome::Correct),
            grade(Outcome::Incorrect),
            grade(Outcome::Correct),
            grade(Outcome::Correct),
        ];

        let summary =
            SessionSummary::from_grades(DeckId::new(7), "Chemistry", now, &grades).unwrap();

        assert_eq!(summary.correct(), 3);
        assert_eq!(summary.incorrect(), 1);
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.deck_name(), "Chemistry");
        assert_eq!(summary.reviewed_at(), now);
    }

    #[test]
    fn score_percentage_is_correct_over_total() {
        let grades = vec![grade(Outcome::Correct), grade(Outcome::Incorrect)];
        let summary =
            SessionSummary::from_grades(DeckId::new(1), "Mixed", fixed_now(), &grades).unwrap();
        assert!((summary.score_percentage() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_summary_scores_zero() {
        let summary = SessionSummary::from_grades(DeckId::new(1), "Empty", fixed_now(), &[])
            .unwrap();
        assert_eq!(summary.total(), 0);
        assert!((summary.score_percentage() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn persisted_roundtrip_preserves_counts() {
        let summary =
            SessionSummary::from_persisted(DeckId::new(3), "Algebra", fixed_now(), 9, 1);
        assert_eq!(summary.correct(), 9);
        assert_eq!(summary.incorrect(), 1);
        assert!((summary.score_percentage() - 90.0).abs() < 1e-9);
    }
}
