use chrono::{DateTime, Utc};

//
// ─── OUTCOME ──────────────────────────────────────────────────────────────────
//

/// Result of studying one card within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
}

impl Outcome {
    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, Outcome::Correct)
    }
}

//
// ─── GRADE SOURCE ─────────────────────────────────────────────────────────────
//

/// How a card came to be graded.
///
/// - `Choice`: the user picked an option on a multiple-choice card.
/// - `Revealed`: the user flipped a free-recall card to see the answer;
///   the card is auto-graded incorrect because flipping means the answer
///   was not known.
/// - `SelfReport`: the user pressed know / don't-know on a free-recall card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeSource {
    Choice { selected: usize },
    Revealed,
    SelfReport,
}

//
// ─── CARD GRADE ───────────────────────────────────────────────────────────────
//

/// A recorded grading event for one card in one study pass.
///
/// Set at most once per pass; an explicit restart clears all grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardGrade {
    pub outcome: Outcome,
    pub source: GradeSource,
    pub graded_at: DateTime<Utc>,
}

impl CardGrade {
    #[must_use]
    pub fn new(outcome: Outcome, source: GradeSource, graded_at: DateTime<Utc>) -> Self {
        Self {
            outcome,
            source,
            graded_at,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn outcome_reports_correctness() {
        assert!(Outcome::Correct.is_correct());
        assert!(!Outcome::Incorrect.is_correct());
    }

    #[test]
    fn grade_creation_works() {
        let grade = CardGrade::new(
            Outcome::Correct,
            GradeSource::Choice { selected: 2 },
            fixed_now(),
        );
        assert_eq!(grade.outcome, Outcome::Correct);
        assert_eq!(grade.source, GradeSource::Choice { selected: 2 });
        assert_eq!(grade.graded_at, fixed_now());
    }
}
