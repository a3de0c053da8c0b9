use study_core::model::{Deck, DeckId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{deck_id_from_i64, id_i64, ser};
use crate::repository::{DeckRepository, StorageError};

fn deck_from_row(row: &SqliteRow) -> Result<Deck, StorageError> {
    let id = deck_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let name: String = row.try_get("name").map_err(ser)?;
    let category: Option<String> = row.try_get("category").map_err(ser)?;
    let created_at = row.try_get("created_at").map_err(ser)?;

    Deck::new(id, name, category, created_at).map_err(ser)
}

#[async_trait::async_trait]
impl DeckRepository for SqliteRepository {
    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO decks (id, name, category, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category
            ",
        )
        .bind(id_i64("deck_id", deck.id().value())?)
        .bind(deck.name())
        .bind(deck.category())
        .bind(deck.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, category, created_at
            FROM decks WHERE id = ?1
            ",
        )
        .bind(id_i64("deck_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => deck_from_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_decks(&self) -> Result<Vec<Deck>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, category, created_at
            FROM decks ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut decks = Vec::with_capacity(rows.len());
        for row in rows {
            decks.push(deck_from_row(&row)?);
        }
        Ok(decks)
    }
}
