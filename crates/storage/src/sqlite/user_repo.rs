use async_trait::async_trait;
use quiz_core::model::{User, UserId};

use super::SqliteRepository;
use super::mapping::{conn, i64_from_u64, map_user_record, map_user_row, user_id_from_i64};
use crate::repository::{NewUserRecord, StorageError, UserRecord, UserRepository};

#[async_trait]
impl UserRepository for SqliteRepository {
    async fn insert_user(&self, record: NewUserRecord) -> Result<User, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO users (name, email, password_digest, created_at)
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.password_digest)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
            _ => conn(e),
        })?;

        Ok(User {
            id: user_id_from_i64(res.last_insert_rowid())?,
            name: record.name,
            email: record.email,
            created_at: record.created_at,
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, name, email, password_digest, created_at
                FROM users
                WHERE email = ?1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_user_record).transpose()
    }

    async fn set_current_user(&self, id: Option<UserId>) -> Result<(), StorageError> {
        let user_id = id.map(|id| i64_from_u64("user_id", id.value())).transpose()?;

        if let Some(user_id) = user_id {
            let exists = sqlx::query("SELECT 1 FROM users WHERE id = ?1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(conn)?;
            if exists.is_none() {
                return Err(StorageError::NotFound);
            }
        }

        sqlx::query(
            r"
                INSERT INTO signed_in_user (id, user_id)
                VALUES (1, ?1)
                ON CONFLICT(id) DO UPDATE SET user_id = excluded.user_id
            ",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT u.id, u.name, u.email, u.created_at
                FROM signed_in_user s
                JOIN users u ON u.id = s.user_id
                WHERE s.id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_user_row).transpose()
    }
}
