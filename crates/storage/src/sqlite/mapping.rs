use sqlx::Row;
use study_core::model::{Card, CardId, DeckId, SessionSummary, UserId};

use crate::repository::{SessionRecordRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn deck_id_from_i64(v: i64) -> Result<DeckId, StorageError> {
    Ok(DeckId::new(i64_to_u64("deck_id", v)?))
}

pub(crate) fn card_id_from_i64(v: i64) -> Result<CardId, StorageError> {
    Ok(CardId::new(i64_to_u64("card_id", v)?))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

/// Option lists persist as a JSON array column; `NULL` marks free recall.
pub(crate) fn options_to_json(options: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

pub(crate) fn options_from_json(raw: Option<String>) -> Result<Option<Vec<String>>, StorageError> {
    raw.map(|json| serde_json::from_str::<Vec<String>>(&json).map_err(ser))
        .transpose()
}

pub(crate) fn map_card_row(row: &sqlx::sqlite::SqliteRow) -> Result<Card, StorageError> {
    let id = card_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let deck_id = deck_id_from_i64(row.try_get::<i64, _>("deck_id").map_err(ser)?)?;
    let question: String = row.try_get("question").map_err(ser)?;
    let answer: String = row.try_get("answer").map_err(ser)?;
    let options = options_from_json(row.try_get::<Option<String>, _>("options").map_err(ser)?)?;
    let created_at = row.try_get("created_at").map_err(ser)?;

    match options {
        Some(options) => {
            Card::multiple_choice(id, deck_id, question, answer, options, created_at).map_err(ser)
        }
        None => Card::free_recall(id, deck_id, question, answer, created_at).map_err(ser),
    }
}

pub(crate) fn map_record_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<SessionRecordRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let deck_id = deck_id_from_i64(row.try_get::<i64, _>("deck_id").map_err(ser)?)?;
    let deck_name: String = row.try_get("deck_name").map_err(ser)?;
    let user_id = row
        .try_get::<String, _>("user_id")
        .map_err(ser)?
        .parse::<UserId>()
        .map_err(ser)?;
    let reviewed_at = row.try_get("reviewed_at").map_err(ser)?;
    let correct = u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?;
    let incorrect = u32_from_i64(
        "incorrect",
        row.try_get::<i64, _>("incorrect").map_err(ser)?,
    )?;

    let summary =
        SessionSummary::from_persisted(deck_id, deck_name, reviewed_at, correct, incorrect);

    // The stored score column must agree with the counts it was derived from.
    let stored_score: f64 = row.try_get("score_percentage").map_err(ser)?;
    if (stored_score - summary.score_percentage()).abs() > 1e-6 {
        return Err(StorageError::Serialization(format!(
            "score mismatch for record {id}: stored {stored_score}, derived {}",
            summary.score_percentage()
        )));
    }

    Ok(SessionRecordRow::new(id, user_id, summary))
}
