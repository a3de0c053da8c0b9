use study_core::model::{Card, DeckId};

use super::SqliteRepository;
use super::mapping::{id_i64, map_card_row, options_to_json};
use crate::repository::{CardRepository, StorageError};

#[async_trait::async_trait]
impl CardRepository for SqliteRepository {
    async fn upsert_card(&self, card: &Card) -> Result<(), StorageError> {
        let options = if card.is_multiple_choice() {
            Some(options_to_json(card.options())?)
        } else {
            None
        };

        sqlx::query(
            r"
            INSERT INTO cards (id, deck_id, question, answer, options, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id, deck_id) DO UPDATE SET
                question = excluded.question,
                answer = excluded.answer,
                options = excluded.options
            ",
        )
        .bind(id_i64("card_id", card.id().value())?)
        .bind(id_i64("deck_id", card.deck_id().value())?)
        .bind(card.question())
        .bind(card.answer())
        .bind(options)
        .bind(card.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn list_cards(&self, deck_id: DeckId) -> Result<Vec<Card>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, deck_id, question, answer, options, created_at
            FROM cards
            WHERE deck_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("deck_id", deck_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut cards = Vec::with_capacity(rows.len());
        for row in rows {
            cards.push(map_card_row(&row)?);
        }
        Ok(cards)
    }
}
