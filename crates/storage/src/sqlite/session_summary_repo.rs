use chrono::{DateTime, Utc};
use quiz_core::model::{SessionSummary, TopicId};

use super::SqliteRepository;
use super::mapping::{conn, encode_details, map_summary_row, map_summary_row_with_id};
use crate::repository::{SessionSummaryRepository, SessionSummaryRow, StorageError};

#[async_trait::async_trait]
impl SessionSummaryRepository for SqliteRepository {
    async fn append_summary(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        let time_spent = i64::try_from(summary.time_spent_secs())
            .map_err(|_| StorageError::Serialization("time_spent_secs overflow".into()))?;

        let res = sqlx::query(
            r"
                INSERT INTO session_summaries (
                    topic, started_at, completed_at, correct, incorrect,
                    time_spent_secs, question_count, details
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(summary.topic().as_str())
        .bind(summary.started_at())
        .bind(summary.completed_at())
        .bind(i64::from(summary.correct()))
        .bind(i64::from(summary.incorrect()))
        .bind(time_spent)
        .bind(i64::from(summary.question_count()))
        .bind(encode_details(summary.records())?)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn get_summary(&self, id: i64) -> Result<SessionSummary, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    topic, started_at, completed_at, correct, incorrect,
                    time_spent_secs, question_count, details
                FROM session_summaries
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_summary_row(&row)
    }

    async fn list_summary_rows(
        &self,
        topic: &TopicId,
        completed_from: Option<DateTime<Utc>>,
        completed_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<SessionSummaryRow>, StorageError> {
        let mut sql = String::from(
            r"
                SELECT
                    id, topic, started_at, completed_at, correct, incorrect,
                    time_spent_secs, question_count, details
                FROM session_summaries
                WHERE topic = ?1
            ",
        );

        let mut bind_index = 2;
        if completed_from.is_some() {
            sql.push_str(" AND completed_at >= ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        if completed_until.is_some() {
            sql.push_str(" AND completed_at <= ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        sql.push_str(" ORDER BY completed_at DESC, id DESC");
        sql.push_str(" LIMIT ?");
        sql.push_str(&bind_index.to_string());

        let mut query = sqlx::query(&sql).bind(topic.as_str());
        if let Some(from) = completed_from {
            query = query.bind(from);
        }
        if let Some(until) = completed_until {
            query = query.bind(until);
        }
        query = query.bind(i64::from(limit));

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_summary_row_with_id(&row)?);
        }

        Ok(out)
    }
}
