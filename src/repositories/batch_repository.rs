use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::batch::{Batch, BatchStatistics, NewBatch};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BatchRepository: Send + Sync {
    async fn create(&self, batch: NewBatch) -> Result<Batch>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Batch>>;
    async fn list(&self, offset: i64, limit: i64) -> Result<(Vec<Batch>, i64)>;
    async fn add_user(&self, batch_id: Uuid, user_id: Uuid) -> Result<()>;
    async fn remove_user(&self, batch_id: Uuid, user_id: Uuid) -> Result<bool>;
    async fn add_question(&self, batch_id: Uuid, question_id: Uuid) -> Result<()>;
    async fn remove_question(&self, batch_id: Uuid, question_id: Uuid) -> Result<bool>;
    async fn link_quiz(&self, batch_id: Uuid, quiz_id: Uuid) -> Result<()>;
    async fn statistics(&self, batch_id: Uuid) -> Result<BatchStatistics>;
}

#[derive(Debug, sqlx::FromRow)]
struct BatchRecord {
    id: Uuid,
    name: String,
    description: Option<String>,
    subject: String,
    domain: String,
    is_active: bool,
    quiz_criteria: Option<JsonValue>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BatchRecord> for Batch {
    type Error = crate::error::Error;

    fn try_from(r: BatchRecord) -> Result<Self> {
        Ok(Batch {
            id: r.id,
            name: r.name,
            description: r.description,
            subject: r.subject,
            domain: r.domain,
            is_active: r.is_active,
            quiz_criteria: r.quiz_criteria.map(serde_json::from_value).transpose()?,
            created_by: r.created_by,
            created_at: Some(r.created_at),
            updated_at: Some(r.updated_at),
        })
    }
}

const BATCH_COLUMNS: &str = r#"
    id, name, description, subject, domain, is_active, quiz_criteria,
    created_by, created_at, updated_at
"#;

#[derive(Clone)]
pub struct PgBatchRepository {
    pool: PgPool,
}

impl PgBatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchRepository for PgBatchRepository {
    async fn create(&self, batch: NewBatch) -> Result<Batch> {
        let sql = format!(
            r#"
            INSERT INTO batches (name, description, subject, domain, quiz_criteria, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            BATCH_COLUMNS
        );
        let record = sqlx::query_as::<_, BatchRecord>(&sql)
            .bind(&batch.name)
            .bind(&batch.description)
            .bind(&batch.subject)
            .bind(&batch.domain)
            .bind(batch.quiz_criteria.as_ref().map(|c| json!(c)))
            .bind(batch.created_by)
            .fetch_one(&self.pool)
            .await?;
        record.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Batch>> {
        let sql = format!("SELECT {} FROM batches WHERE id = $1", BATCH_COLUMNS);
        let record = sqlx::query_as::<_, BatchRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        record.map(Batch::try_from).transpose()
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<(Vec<Batch>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM batches")
            .fetch_one(&self.pool)
            .await?;
        let sql = format!(
            "SELECT {} FROM batches ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            BATCH_COLUMNS
        );
        let records = sqlx::query_as::<_, BatchRecord>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        let batches = records
            .into_iter()
            .map(Batch::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok((batches, total))
    }

    async fn add_user(&self, batch_id: Uuid, user_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_batches (batch_id, user_id) VALUES ($1, $2)
            ON CONFLICT (batch_id, user_id) DO UPDATE SET is_active = TRUE
            "#,
        )
        .bind(batch_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_user(&self, batch_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE user_batches SET is_active = FALSE WHERE batch_id = $1 AND user_id = $2 AND is_active",
        )
        .bind(batch_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_question(&self, batch_id: Uuid, question_id: Uuid) -> Result<()> {
        sqlx::query("INSERT INTO question_batches (batch_id, question_id) VALUES ($1, $2)")
            .bind(batch_id)
            .bind(question_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_question(&self, batch_id: Uuid, question_id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM question_batches WHERE batch_id = $1 AND question_id = $2")
                .bind(batch_id)
                .bind(question_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn link_quiz(&self, batch_id: Uuid, quiz_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO quiz_batches (batch_id, quiz_id) VALUES ($1, $2)
            ON CONFLICT (batch_id, quiz_id) DO NOTHING
            "#,
        )
        .bind(batch_id)
        .bind(quiz_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn statistics(&self, batch_id: Uuid) -> Result<BatchStatistics> {
        let (active_users, questions, quizzes): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM user_batches WHERE batch_id = $1 AND is_active),
                (SELECT COUNT(*) FROM question_batches WHERE batch_id = $1),
                (SELECT COUNT(*) FROM quiz_batches WHERE batch_id = $1)
            "#,
        )
        .bind(batch_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(BatchStatistics {
            active_users,
            questions,
            quizzes,
        })
    }
}
