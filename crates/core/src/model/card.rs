use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{CardId, DeckId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CardError {
    #[error("card question cannot be empty")]
    EmptyQuestion,

    #[error("card answer cannot be empty")]
    EmptyAnswer,

    #[error("multiple-choice card needs a non-empty option list")]
    NoOptions,

    #[error("option at index {0} is empty")]
    EmptyOption(usize),

    #[error("answer does not appear among the options")]
    AnswerNotInOptions,
}

//
// ─── CARD KIND ─────────────────────────────────────────────────────────────────
//

/// The two answering pathways a card can take.
///
/// Multiple-choice cards carry a fixed option list and grade by comparing the
/// selected option against the stored answer. Free-recall cards have no
/// options; correctness is self-reported by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardKind {
    MultipleChoice { options: Vec<String> },
    FreeRecall,
}

//
// ─── CARD ──────────────────────────────────────────────────────────────────────
//

/// One flashcard. Question, answer, and option list are immutable for the
/// lifetime of the card; per-pass grading state lives in the session, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    id: CardId,
    deck_id: DeckId,
    question: String,
    answer: String,
    kind: CardKind,
    created_at: DateTime<Utc>,
}

impl Card {
    /// Creates a multiple-choice card.
    ///
    /// # Errors
    ///
    /// Returns `CardError` when question/answer are blank, the option list is
    /// empty or contains a blank entry, or the answer is missing from the
    /// options (a correct index must always exist).
    pub fn multiple_choice(
        id: CardId,
        deck_id: DeckId,
        question: impl Into<String>,
        answer: impl Into<String>,
        options: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CardError> {
        let (question, answer) = validate_faces(question.into(), answer.into())?;

        if options.is_empty() {
            return Err(CardError::NoOptions);
        }
        let mut trimmed = Vec::with_capacity(options.len());
        for (index, option) in options.into_iter().enumerate() {
            let option = option.trim().to_owned();
            if option.is_empty() {
                return Err(CardError::EmptyOption(index));
            }
            trimmed.push(option);
        }
        if !trimmed.iter().any(|option| *option == answer) {
            return Err(CardError::AnswerNotInOptions);
        }

        Ok(Self {
            id,
            deck_id,
            question,
            answer,
            kind: CardKind::MultipleChoice { options: trimmed },
            created_at,
        })
    }

    /// Creates a free-recall card.
    ///
    /// # Errors
    ///
    /// Returns `CardError` when question or answer are blank.
    pub fn free_recall(
        id: CardId,
        deck_id: DeckId,
        question: impl Into<String>,
        answer: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CardError> {
        let (question, answer) = validate_faces(question.into(), answer.into())?;
        Ok(Self {
            id,
            deck_id,
            question,
            answer,
            kind: CardKind::FreeRecall,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> CardId {
        self.id
    }

    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    #[must_use]
    pub fn kind(&self) -> &CardKind {
        &self.kind
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn is_multiple_choice(&self) -> bool {
        matches!(self.kind, CardKind::MultipleChoice { .. })
    }

    /// Option list; empty for free-recall cards.
    #[must_use]
    pub fn options(&self) -> &[String] {
        match &self.kind {
            CardKind::MultipleChoice { options } => options,
            CardKind::FreeRecall => &[],
        }
    }

    /// Index of the first option equal to the answer, `None` for free recall.
    #[must_use]
    pub fn correct_option_index(&self) -> Option<usize> {
        match &self.kind {
            CardKind::MultipleChoice { options } => {
                options.iter().position(|option| *option == self.answer)
            }
            CardKind::FreeRecall => None,
        }
    }
}

fn validate_faces(question: String, answer: String) -> Result<(String, String), CardError> {
    let question = question.trim().to_owned();
    if question.is_empty() {
        return Err(CardError::EmptyQuestion);
    }
    let answer = answer.trim().to_owned();
    if answer.is_empty() {
        return Err(CardError::EmptyAnswer);
    }
    Ok((question, answer))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
