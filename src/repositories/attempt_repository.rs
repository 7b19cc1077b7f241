use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::{Answer, GradedAnswer};
use crate::models::attempt::{
    Attempt, AttemptFilter, AttemptSummary, NewAttempt, ScoredAttempt,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn create(&self, attempt: NewAttempt) -> Result<Attempt>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Attempt>>;
    /// Inserts or replaces the single answer for (attempt, question).
    /// `None` when the attempt is no longer in progress.
    async fn upsert_answer(&self, answer: GradedAnswer) -> Result<Option<Answer>>;
    async fn answers_for(&self, attempt_id: Uuid) -> Result<Vec<Answer>>;
    async fn count_answers(&self, attempt_id: Uuid) -> Result<i64>;
    /// Stores game results on an in-progress attempt. Returns false if the attempt is closed.
    async fn store_game_results(&self, attempt_id: Uuid, results: JsonValue) -> Result<bool>;
    /// Marks an in-progress attempt completed. `None` when it was no longer in progress.
    async fn complete(&self, attempt_id: Uuid, summary: AttemptSummary) -> Result<Option<Attempt>>;
    /// Marks an in-progress attempt abandoned. `None` when it was no longer in progress.
    async fn abandon(&self, attempt_id: Uuid) -> Result<Option<Attempt>>;
    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: AttemptFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Attempt>, i64)>;
    async fn completed_for_user(&self, user_id: Uuid) -> Result<Vec<ScoredAttempt>>;
}

#[derive(Debug, sqlx::FromRow)]
struct AttemptRecord {
    id: Uuid,
    user_id: Uuid,
    quiz_id: Uuid,
    status: String,
    selected_questions: JsonValue,
    criteria_snapshot: Option<JsonValue>,
    requested_questions: i32,
    game_results: Option<JsonValue>,
    total_questions: i32,
    questions_answered: i32,
    correct_answers: i32,
    score_percentage: i32,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<AttemptRecord> for Attempt {
    type Error = Error;

    fn try_from(r: AttemptRecord) -> Result<Self> {
        let criteria_snapshot = r
            .criteria_snapshot
            .map(serde_json::from_value)
            .transpose()?;
        Ok(Attempt {
            id: r.id,
            user_id: r.user_id,
            quiz_id: r.quiz_id,
            status: r.status.parse().map_err(Error::Internal)?,
            selected_questions: serde_json::from_value(r.selected_questions)?,
            criteria_snapshot,
            requested_questions: r.requested_questions,
            game_results: r.game_results,
            summary: AttemptSummary {
                total_questions: r.total_questions,
                questions_answered: r.questions_answered,
                correct_answers: r.correct_answers,
                score_percentage: r.score_percentage,
            },
            started_at: r.started_at,
            completed_at: r.completed_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AnswerRecord {
    id: Uuid,
    attempt_id: Uuid,
    question_id: Uuid,
    user_answer: JsonValue,
    canonical_answer: Option<JsonValue>,
    is_correct: bool,
    points_earned: i32,
    answered_at: DateTime<Utc>,
}

impl From<AnswerRecord> for Answer {
    fn from(r: AnswerRecord) -> Self {
        Answer {
            id: r.id,
            attempt_id: r.attempt_id,
            question_id: r.question_id,
            user_answer: r.user_answer,
            canonical_answer: r.canonical_answer,
            is_correct: r.is_correct,
            points_earned: r.points_earned,
            answered_at: r.answered_at,
        }
    }
}

const ATTEMPT_COLUMNS: &str = r#"
    id, user_id, quiz_id, status, selected_questions, criteria_snapshot, requested_questions,
    game_results, total_questions, questions_answered, correct_answers, score_percentage,
    started_at, completed_at
"#;

const ANSWER_COLUMNS: &str = r#"
    id, attempt_id, question_id, user_answer, canonical_answer, is_correct, points_earned, answered_at
"#;

#[derive(Clone)]
pub struct PgAttemptRepository {
    pool: PgPool,
}

impl PgAttemptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptRepository for PgAttemptRepository {
    async fn create(&self, attempt: NewAttempt) -> Result<Attempt> {
        let sql = format!(
            r#"
            INSERT INTO quiz_attempts (
                user_id, quiz_id, status, selected_questions, criteria_snapshot,
                requested_questions, total_questions
            ) VALUES ($1, $2, 'in_progress', $3, $4, $5, $6)
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        );
        let record = sqlx::query_as::<_, AttemptRecord>(&sql)
            .bind(attempt.user_id)
            .bind(attempt.quiz_id)
            .bind(json!(attempt.selected_questions))
            .bind(attempt.criteria_snapshot.as_ref().map(|c| json!(c)))
            .bind(attempt.requested_questions)
            .bind(attempt.selected_questions.len() as i32)
            .fetch_one(&self.pool)
            .await?;
        record.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Attempt>> {
        let sql = format!("SELECT {} FROM quiz_attempts WHERE id = $1", ATTEMPT_COLUMNS);
        let record = sqlx::query_as::<_, AttemptRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        record.map(Attempt::try_from).transpose()
    }

    async fn upsert_answer(&self, answer: GradedAnswer) -> Result<Option<Answer>> {
        // The share lock holds off a concurrent complete/abandon until this write commits.
        let sql = format!(
            r#"
            INSERT INTO question_answers (
                attempt_id, question_id, user_answer, canonical_answer, is_correct, points_earned
            )
            SELECT $1, $2, $3, $4, $5, $6
            WHERE EXISTS (
                SELECT 1 FROM quiz_attempts
                WHERE id = $1 AND status = 'in_progress'
                FOR SHARE
            )
            ON CONFLICT (attempt_id, question_id) DO UPDATE SET
                user_answer = EXCLUDED.user_answer,
                canonical_answer = EXCLUDED.canonical_answer,
                is_correct = EXCLUDED.is_correct,
                points_earned = EXCLUDED.points_earned,
                answered_at = NOW()
            RETURNING {}
            "#,
            ANSWER_COLUMNS
        );
        let record = sqlx::query_as::<_, AnswerRecord>(&sql)
            .bind(answer.attempt_id)
            .bind(answer.question_id)
            .bind(&answer.user_answer)
            .bind(&answer.canonical_answer)
            .bind(answer.is_correct)
            .bind(answer.points_earned)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record.map(Answer::from))
    }

    async fn answers_for(&self, attempt_id: Uuid) -> Result<Vec<Answer>> {
        let sql = format!(
            "SELECT {} FROM question_answers WHERE attempt_id = $1 ORDER BY answered_at",
            ANSWER_COLUMNS
        );
        let records = sqlx::query_as::<_, AnswerRecord>(&sql)
            .bind(attempt_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(records.into_iter().map(Answer::from).collect())
    }

    async fn count_answers(&self, attempt_id: Uuid) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM question_answers WHERE attempt_id = $1")
                .bind(attempt_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn store_game_results(&self, attempt_id: Uuid, results: JsonValue) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE quiz_attempts SET game_results = $2
            WHERE id = $1 AND status = 'in_progress'
            "#,
        )
        .bind(attempt_id)
        .bind(results)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn complete(&self, attempt_id: Uuid, summary: AttemptSummary) -> Result<Option<Attempt>> {
        let sql = format!(
            r#"
            UPDATE quiz_attempts SET
                status = 'completed',
                total_questions = $2,
                questions_answered = $3,
                correct_answers = $4,
                score_percentage = $5,
                completed_at = NOW()
            WHERE id = $1 AND status = 'in_progress'
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        );
        let record = sqlx::query_as::<_, AttemptRecord>(&sql)
            .bind(attempt_id)
            .bind(summary.total_questions)
            .bind(summary.questions_answered)
            .bind(summary.correct_answers)
            .bind(summary.score_percentage)
            .fetch_optional(&self.pool)
            .await?;
        record.map(Attempt::try_from).transpose()
    }

    async fn abandon(&self, attempt_id: Uuid) -> Result<Option<Attempt>> {
        let sql = format!(
            r#"
            UPDATE quiz_attempts SET status = 'abandoned', completed_at = NOW()
            WHERE id = $1 AND status = 'in_progress'
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        );
        let record = sqlx::query_as::<_, AttemptRecord>(&sql)
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await?;
        record.map(Attempt::try_from).transpose()
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: AttemptFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Attempt>, i64)> {
        let status_param = filter.status.map(|s| s.as_str());
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM quiz_attempts
            WHERE user_id = $1
              AND ($2::uuid IS NULL OR quiz_id = $2)
              AND ($3::text IS NULL OR status = $3)
            "#,
        )
        .bind(user_id)
        .bind(filter.quiz_id)
        .bind(status_param)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            r#"
            SELECT {} FROM quiz_attempts
            WHERE user_id = $1
              AND ($2::uuid IS NULL OR quiz_id = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY started_at DESC
            LIMIT $4 OFFSET $5
            "#,
            ATTEMPT_COLUMNS
        );
        let records = sqlx::query_as::<_, AttemptRecord>(&sql)
            .bind(user_id)
            .bind(filter.quiz_id)
            .bind(status_param)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let attempts = records
            .into_iter()
            .map(Attempt::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok((attempts, total))
    }

    async fn completed_for_user(&self, user_id: Uuid) -> Result<Vec<ScoredAttempt>> {
        let rows: Vec<(Uuid, Uuid, String, i32, Option<DateTime<Utc>>)> = sqlx::query_as(
            r#"
            SELECT a.id, a.quiz_id, q.difficulty, a.score_percentage, a.completed_at
            FROM quiz_attempts a
            JOIN quizzes q ON q.id = a.quiz_id
            WHERE a.user_id = $1 AND a.status = 'completed'
            ORDER BY a.completed_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(attempt_id, quiz_id, difficulty, score_percentage, completed_at)| {
                Ok(ScoredAttempt {
                    attempt_id,
                    quiz_id,
                    difficulty: difficulty.parse().map_err(Error::Internal)?,
                    score_percentage,
                    completed_at,
                })
            })
            .collect()
    }
}
