use chrono::{DateTime, Utc};
use std::collections::HashSet;
use study_core::model::{DeckId, UserId};

use super::SqliteRepository;
use super::mapping::{deck_id_from_i64, id_i64, map_record_row, ser};
use crate::repository::{NewSessionRecord, SessionRecordRepository, SessionRecordRow, StorageError};
use sqlx::Row;

const RECORD_COLUMNS: &str =
    "id, deck_id, deck_name, user_id, reviewed_at, correct, incorrect, score_percentage";

#[async_trait::async_trait]
impl SessionRecordRepository for SqliteRepository {
    async fn append_record(&self, record: &NewSessionRecord) -> Result<i64, StorageError> {
        let deck_id = id_i64("deck_id", record.deck_id.value())?;

        let res = sqlx::query(
            r"
                INSERT INTO session_records (
                    deck_id, deck_name, user_id, reviewed_at,
                    correct, incorrect, score_percentage
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(deck_id)
        .bind(&record.deck_name)
        .bind(record.user_id.to_string())
        .bind(record.reviewed_at)
        .bind(i64::from(record.correct))
        .bind(i64::from(record.incorrect))
        .bind(record.score_percentage)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn get_record(&self, id: i64) -> Result<SessionRecordRow, StorageError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM session_records WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        map_record_row(&row)
    }

    async fn list_records(
        &self,
        deck_id: DeckId,
        reviewed_from: Option<DateTime<Utc>>,
        reviewed_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<SessionRecordRow>, StorageError> {
        let mut sql = format!("SELECT {RECORD_COLUMNS} FROM session_records WHERE deck_id = ?1");

        let mut bind_index = 2;
        if reviewed_from.is_some() {
            sql.push_str(" AND reviewed_at >= ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        if reviewed_until.is_some() {
            sql.push_str(" AND reviewed_at <= ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        sql.push_str(" ORDER BY reviewed_at DESC, id DESC");
        sql.push_str(" LIMIT ?");
        sql.push_str(&bind_index.to_string());

        let mut query = sqlx::query(&sql).bind(id_i64("deck_id", deck_id.value())?);
        if let Some(from) = reviewed_from {
            query = query.bind(from);
        }
        if let Some(until) = reviewed_until {
            query = query.bind(until);
        }
        query = query.bind(i64::from(limit));

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_record_row(&row)?);
        }

        Ok(out)
    }

    async fn list_records_for_user(
        &self,
        user_id: UserId,
        reviewed_from: Option<DateTime<Utc>>,
        reviewed_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<SessionRecordRow>, StorageError> {
        let mut sql = format!("SELECT {RECORD_COLUMNS} FROM session_records WHERE user_id = ?1");

        let mut bind_index = 2;
        if reviewed_from.is_some() {
            sql.push_str(" AND reviewed_at >= ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        if reviewed_until.is_some() {
            sql.push_str(" AND reviewed_at <= ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        sql.push_str(" ORDER BY reviewed_at DESC, id DESC");
        sql.push_str(" LIMIT ?");
        sql.push_str(&bind_index.to_string());

        let mut query = sqlx::query(&sql).bind(user_id.to_string());
        if let Some(from) = reviewed_from {
            query = query.bind(from);
        }
        if let Some(until) = reviewed_until {
            query = query.bind(until);
        }
        query = query.bind(i64::from(limit));

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_record_row(&row)?);
        }

        Ok(out)
    }

    async fn list_latest_records(
        &self,
        deck_ids: &[DeckId],
    ) -> Result<Vec<SessionRecordRow>, StorageError> {
        if deck_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql =
            format!("SELECT {RECORD_COLUMNS} FROM session_records WHERE deck_id IN (");
        for i in 0..deck_ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push_str(")\n ORDER BY deck_id ASC, reviewed_at DESC, id DESC");

        let mut query = sqlx::query(&sql);
        for deck_id in deck_ids {
            query = query.bind(id_i64("deck_id", deck_id.value())?);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for row in rows {
            let deck_id = deck_id_from_i64(row.try_get::<i64, _>("deck_id").map_err(ser)?)?;
            if !seen.insert(deck_id) {
                continue;
            }
            out.push(map_record_row(&row)?);
        }

        Ok(out)
    }
}
