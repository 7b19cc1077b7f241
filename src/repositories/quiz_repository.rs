use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::quiz::{NewQuiz, Quiz, QuizSource, SelectionCriteria};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn create(&self, quiz: NewQuiz) -> Result<Quiz>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Quiz>>;
    async fn list(&self, active_only: bool, offset: i64, limit: i64) -> Result<(Vec<Quiz>, i64)>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[derive(Debug, sqlx::FromRow)]
struct QuizRecord {
    id: Uuid,
    title: String,
    description: Option<String>,
    difficulty: String,
    time_limit_minutes: i32,
    game_format: String,
    game_options: Option<JsonValue>,
    is_active: bool,
    is_criteria_based: bool,
    quiz_criteria: Option<JsonValue>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl QuizRecord {
    /// `question_ids` are the fixed links in position order; ignored for criteria quizzes.
    fn into_quiz(self, question_ids: Vec<Uuid>) -> Result<Quiz> {
        let source = match (self.is_criteria_based, self.quiz_criteria) {
            (true, Some(value)) => {
                let criteria: SelectionCriteria = serde_json::from_value(value).map_err(|e| {
                    Error::Internal(format!("quiz {} has malformed criteria: {}", self.id, e))
                })?;
                QuizSource::Criteria { criteria }
            }
            (true, None) => {
                return Err(Error::Internal(format!(
                    "quiz {} is criteria based but has no criteria",
                    self.id
                )))
            }
            (false, _) => QuizSource::Fixed { question_ids },
        };

        Ok(Quiz {
            id: self.id,
            title: self.title,
            description: self.description,
            difficulty: self.difficulty.parse().map_err(Error::Internal)?,
            time_limit_minutes: self.time_limit_minutes,
            source,
            game_format: self.game_format.parse().map_err(Error::Internal)?,
            game_options: self.game_options,
            is_active: self.is_active,
            created_by: self.created_by,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        })
    }
}

const QUIZ_COLUMNS: &str = r#"
    id, title, description, difficulty, time_limit_minutes, game_format, game_options,
    is_active, is_criteria_based, quiz_criteria, created_by, created_at, updated_at
"#;

#[derive(Clone)]
pub struct PgQuizRepository {
    pool: PgPool,
}

impl PgQuizRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn linked_questions(&self, quiz_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Uuid>>> {
        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            SELECT quiz_id, question_id FROM quiz_questions
            WHERE quiz_id = ANY($1)
            ORDER BY quiz_id, position
            "#,
        )
        .bind(quiz_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut links: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (quiz_id, question_id) in rows {
            links.entry(quiz_id).or_default().push(question_id);
        }
        Ok(links)
    }
}

#[async_trait]
impl QuizRepository for PgQuizRepository {
    async fn create(&self, quiz: NewQuiz) -> Result<Quiz> {
        let (criteria, question_ids) = match &quiz.source {
            QuizSource::Criteria { criteria } => (Some(json!(criteria)), Vec::new()),
            QuizSource::Fixed { question_ids } => (None, question_ids.clone()),
        };

        let mut tx = self.pool.begin().await?;
        let sql = format!(
            r#"
            INSERT INTO quizzes (
                title, description, difficulty, time_limit_minutes, game_format, game_options,
                is_criteria_based, quiz_criteria, created_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            QUIZ_COLUMNS
        );
        let record = sqlx::query_as::<_, QuizRecord>(&sql)
            .bind(&quiz.title)
            .bind(&quiz.description)
            .bind(quiz.difficulty.as_str())
            .bind(quiz.time_limit_minutes)
            .bind(quiz.game_format.as_str())
            .bind(&quiz.game_options)
            .bind(criteria.is_some())
            .bind(&criteria)
            .bind(quiz.created_by)
            .fetch_one(&mut *tx)
            .await?;

        if !question_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO quiz_questions (quiz_id, question_id, position)
                SELECT $1, t.question_id, (t.ord - 1)::int
                FROM UNNEST($2::uuid[]) WITH ORDINALITY AS t(question_id, ord)
                "#,
            )
            .bind(record.id)
            .bind(&question_ids)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        record.into_quiz(question_ids)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Quiz>> {
        let sql = format!("SELECT {} FROM quizzes WHERE id = $1", QUIZ_COLUMNS);
        let Some(record) = sqlx::query_as::<_, QuizRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut links = self.linked_questions(&[id]).await?;
        let question_ids = links.remove(&id).unwrap_or_default();
        record.into_quiz(question_ids).map(Some)
    }

    async fn list(&self, active_only: bool, offset: i64, limit: i64) -> Result<(Vec<Quiz>, i64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM quizzes WHERE (NOT $1 OR is_active)")
                .bind(active_only)
                .fetch_one(&self.pool)
                .await?;

        let sql = format!(
            r#"
            SELECT {} FROM quizzes
            WHERE (NOT $1 OR is_active)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            QUIZ_COLUMNS
        );
        let records = sqlx::query_as::<_, QuizRecord>(&sql)
            .bind(active_only)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let mut links = self.linked_questions(&ids).await?;
        let quizzes = records
            .into_iter()
            .map(|r| {
                let question_ids = links.remove(&r.id).unwrap_or_default();
                r.into_quiz(question_ids)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((quizzes, total))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
