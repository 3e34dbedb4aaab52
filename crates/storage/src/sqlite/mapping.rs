use quiz_core::model::{AnswerRecord, SessionSummary, TopicId, User, UserId};
use sqlx::Row;

use crate::repository::{SessionSummaryRow, StorageError, UserRecord};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn i64_from_u64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(u64_from_i64("user_id", v)?))
}

pub(crate) fn encode_details(records: &[AnswerRecord]) -> Result<String, StorageError> {
    serde_json::to_string(records).map_err(ser)
}

fn decode_details(raw: &str) -> Result<Vec<AnswerRecord>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_summary_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionSummary, StorageError> {
    let topic = TopicId::new(row.try_get::<String, _>("topic").map_err(ser)?).map_err(ser)?;
    let started_at = row.try_get("started_at").map_err(ser)?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;
    let correct = u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?;
    let incorrect = u32_from_i64("incorrect", row.try_get::<i64, _>("incorrect").map_err(ser)?)?;
    let time_spent_secs = u64_from_i64(
        "time_spent_secs",
        row.try_get::<i64, _>("time_spent_secs").map_err(ser)?,
    )?;
    let question_count = u32_from_i64(
        "question_count",
        row.try_get::<i64, _>("question_count").map_err(ser)?,
    )?;
    let records = decode_details(&row.try_get::<String, _>("details").map_err(ser)?)?;

    SessionSummary::from_persisted(
        topic,
        started_at,
        completed_at,
        correct,
        incorrect,
        time_spent_secs,
        question_count,
        records,
    )
    .map_err(ser)
}

pub(crate) fn map_summary_row_with_id(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<SessionSummaryRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let summary = map_summary_row(row)?;
    Ok(SessionSummaryRow::new(id, summary))
}

pub(crate) fn map_user_row(row: &sqlx::sqlite::SqliteRow) -> Result<User, StorageError> {
    Ok(User {
        id: user_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        name: row.try_get("name").map_err(ser)?,
        email: row.try_get("email").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_user_record(row: &sqlx::sqlite::SqliteRow) -> Result<UserRecord, StorageError> {
    Ok(UserRecord {
        user: map_user_row(row)?,
        password_digest: row.try_get("password_digest").map_err(ser)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionId;

    #[test]
    fn details_round_trip_through_json() {
        let records = vec![AnswerRecord::new(QuestionId::new(3), 2, true, 9)];
        let raw = encode_details(&records).unwrap();
        assert_eq!(decode_details(&raw).unwrap(), records);
    }

    #[test]
    fn corrupt_details_surface_as_serialization_error() {
        let err = decode_details("not json").unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert!(u32_from_i64("correct", -1).is_err());
        assert!(user_id_from_i64(-5).is_err());
    }
}
