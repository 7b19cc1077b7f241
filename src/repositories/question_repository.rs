use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::question::{
    CriteriaStat, Difficulty, NewQuestion, Question, QuestionDetails, QuestionFilter,
    QuestionType,
};
use crate::models::quiz::SelectionCriteria;

/// Selectable bank entry: identifier plus sampling weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct Candidate {
    pub id: Uuid,
    #[sqlx(rename = "weightage")]
    pub weight: i32,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    async fn create(&self, question: NewQuestion) -> Result<Question>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Question>>;
    /// Loads every existing question among `ids`, in no particular order.
    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Question>>;
    async fn update(&self, question: Question) -> Result<Question>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn list(
        &self,
        filter: QuestionFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Question>, i64)>;
    /// Rows matching `criteria` with a positive weight.
    async fn candidates(&self, criteria: &SelectionCriteria) -> Result<Vec<Candidate>>;
    async fn criteria_stats(&self) -> Result<Vec<CriteriaStat>>;
    /// Whether any recorded answer references the question.
    async fn has_answers(&self, id: Uuid) -> Result<bool>;
}

#[derive(Debug, sqlx::FromRow)]
struct QuestionRecord {
    id: Uuid,
    #[sqlx(rename = "type")]
    question_type: String,
    question_text: String,
    code_snippet: Option<String>,
    explanation: Option<String>,
    hint: Option<String>,
    options: Option<JsonValue>,
    correct_answer: Option<String>,
    correct_answers_data: Option<JsonValue>,
    pairs: Option<JsonValue>,
    items: Option<JsonValue>,
    correct_order: Option<JsonValue>,
    word_data: Option<JsonValue>,
    level_number: Option<i32>,
    pattern_data: Option<JsonValue>,
    ladder_steps: Option<JsonValue>,
    max_attempts: Option<i32>,
    difficulty: String,
    concepts: JsonValue,
    domain: String,
    subject: String,
    source: String,
    weightage: i32,
    quiz_id: Option<Uuid>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn column<T: DeserializeOwned>(id: Uuid, name: &str, value: Option<JsonValue>) -> Result<T> {
    let value = value
        .ok_or_else(|| Error::Internal(format!("question {} is missing column {}", id, name)))?;
    serde_json::from_value(value)
        .map_err(|e| Error::Internal(format!("question {} has malformed {}: {}", id, name, e)))
}

fn required<T>(id: Uuid, name: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| Error::Internal(format!("question {} is missing column {}", id, name)))
}

impl TryFrom<QuestionRecord> for Question {
    type Error = Error;

    fn try_from(r: QuestionRecord) -> Result<Self> {
        let id = r.id;
        let question_type: QuestionType = r.question_type.parse().map_err(Error::Internal)?;
        let details = match question_type {
            QuestionType::MultipleChoice => QuestionDetails::MultipleChoice {
                options: column(id, "options", r.options)?,
                correct_answer: required(id, "correct_answer", r.correct_answer)?,
            },
            QuestionType::FillBlank => QuestionDetails::FillBlank {
                correct_answers: column(id, "correct_answers_data", r.correct_answers_data)?,
            },
            QuestionType::TrueFalse => {
                let raw = required(id, "correct_answer", r.correct_answer)?;
                QuestionDetails::TrueFalse {
                    correct_answer: raw.trim().eq_ignore_ascii_case("true"),
                }
            }
            QuestionType::Matching => QuestionDetails::Matching {
                pairs: column(id, "pairs", r.pairs)?,
            },
            QuestionType::DragDropOrder => QuestionDetails::DragDropOrder {
                items: column(id, "items", r.items)?,
                correct_order: column(id, "correct_order", r.correct_order)?,
            },
            QuestionType::Hangman => QuestionDetails::Hangman {
                word_data: column(id, "word_data", r.word_data)?,
                max_attempts: r.max_attempts.unwrap_or(6),
            },
            QuestionType::KnowledgeTower => QuestionDetails::KnowledgeTower {
                level_number: r.level_number.unwrap_or(1),
                options: column(id, "options", r.options)?,
                correct_answer: required(id, "correct_answer", r.correct_answer)?,
            },
            QuestionType::WordLadder => QuestionDetails::WordLadder {
                word_data: column(id, "word_data", r.word_data)?,
                ladder_steps: column(id, "ladder_steps", r.ladder_steps)?,
            },
            QuestionType::MemoryGrid => QuestionDetails::MemoryGrid {
                pattern_data: required(id, "pattern_data", r.pattern_data)?,
            },
        };

        Ok(Question {
            id,
            question_text: r.question_text,
            code_snippet: r.code_snippet,
            explanation: r.explanation,
            hint: r.hint,
            details,
            difficulty: r.difficulty.parse::<Difficulty>().map_err(Error::Internal)?,
            concepts: serde_json::from_value(r.concepts).unwrap_or_default(),
            domain: r.domain,
            subject: r.subject,
            source: r.source,
            weightage: r.weightage,
            quiz_id: r.quiz_id,
            created_by: r.created_by,
            created_at: Some(r.created_at),
            updated_at: Some(r.updated_at),
        })
    }
}

/// Payload columns for one question; unused columns stay NULL.
#[derive(Debug, Default)]
struct PayloadColumns {
    options: Option<JsonValue>,
    correct_answer: Option<String>,
    correct_answers_data: Option<JsonValue>,
    pairs: Option<JsonValue>,
    items: Option<JsonValue>,
    correct_order: Option<JsonValue>,
    word_data: Option<JsonValue>,
    level_number: Option<i32>,
    pattern_data: Option<JsonValue>,
    ladder_steps: Option<JsonValue>,
    max_attempts: Option<i32>,
}

impl From<&QuestionDetails> for PayloadColumns {
    fn from(details: &QuestionDetails) -> Self {
        let mut c = PayloadColumns::default();
        match details {
            QuestionDetails::MultipleChoice {
                options,
                correct_answer,
            } => {
                c.options = Some(json!(options));
                c.correct_answer = Some(correct_answer.clone());
            }
            QuestionDetails::FillBlank { correct_answers } => {
                c.correct_answers_data = Some(json!(correct_answers));
            }
            QuestionDetails::TrueFalse { correct_answer } => {
                c.correct_answer = Some(correct_answer.to_string());
            }
            QuestionDetails::Matching { pairs } => c.pairs = Some(json!(pairs)),
            QuestionDetails::DragDropOrder {
                items,
                correct_order,
            } => {
                c.items = Some(json!(items));
                c.correct_order = Some(json!(correct_order));
            }
            QuestionDetails::Hangman {
                word_data,
                max_attempts,
            } => {
                c.word_data = Some(json!(word_data));
                c.max_attempts = Some(*max_attempts);
            }
            QuestionDetails::KnowledgeTower {
                level_number,
                options,
                correct_answer,
            } => {
                c.level_number = Some(*level_number);
                c.options = Some(json!(options));
                c.correct_answer = Some(correct_answer.clone());
            }
            QuestionDetails::WordLadder {
                word_data,
                ladder_steps,
            } => {
                c.word_data = Some(json!(word_data));
                c.ladder_steps = Some(json!(ladder_steps));
            }
            QuestionDetails::MemoryGrid { pattern_data } => {
                c.pattern_data = Some(pattern_data.clone());
            }
        }
        c
    }
}

const QUESTION_COLUMNS: &str = r#"
    id, type, question_text, code_snippet, explanation, hint,
    options, correct_answer, correct_answers_data, pairs, items, correct_order,
    word_data, level_number, pattern_data, ladder_steps, max_attempts,
    difficulty, concepts, domain, subject, source, weightage,
    quiz_id, created_by, created_at, updated_at
"#;

const CRITERIA_CLAUSE: &str = r#"
    ($1::text IS NULL OR domain = $1)
    AND ($2::text IS NULL OR subject = $2)
    AND ($3::text IS NULL OR source = $3)
    AND ($4::text IS NULL OR difficulty = $4)
    AND (cardinality($5::text[]) = 0 OR concepts ?| $5::text[])
    AND ($6::uuid IS NULL OR EXISTS (
        SELECT 1 FROM question_batches qb
        WHERE qb.question_id = questions.id AND qb.batch_id = $6
    ))
"#;

#[derive(Clone)]
pub struct PgQuestionRepository {
    pool: PgPool,
}

impl PgQuestionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionRepository for PgQuestionRepository {
    async fn create(&self, q: NewQuestion) -> Result<Question> {
        let c = PayloadColumns::from(&q.details);
        let sql = format!(
            r#"
            INSERT INTO questions (
                type, question_text, code_snippet, explanation, hint,
                options, correct_answer, correct_answers_data, pairs, items, correct_order,
                word_data, level_number, pattern_data, ladder_steps, max_attempts,
                difficulty, concepts, domain, subject, source, weightage, quiz_id, created_by
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24
            )
            RETURNING {}
            "#,
            QUESTION_COLUMNS
        );
        let record = sqlx::query_as::<_, QuestionRecord>(&sql)
            .bind(q.details.question_type().as_str())
            .bind(&q.question_text)
            .bind(&q.code_snippet)
            .bind(&q.explanation)
            .bind(&q.hint)
            .bind(c.options)
            .bind(c.correct_answer)
            .bind(c.correct_answers_data)
            .bind(c.pairs)
            .bind(c.items)
            .bind(c.correct_order)
            .bind(c.word_data)
            .bind(c.level_number)
            .bind(c.pattern_data)
            .bind(c.ladder_steps)
            .bind(c.max_attempts)
            .bind(q.difficulty.as_str())
            .bind(json!(q.concepts))
            .bind(&q.domain)
            .bind(&q.subject)
            .bind(&q.source)
            .bind(q.weightage)
            .bind(q.quiz_id)
            .bind(q.created_by)
            .fetch_one(&self.pool)
            .await?;
        record.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Question>> {
        let sql = format!("SELECT {} FROM questions WHERE id = $1", QUESTION_COLUMNS);
        let record = sqlx::query_as::<_, QuestionRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        record.map(Question::try_from).transpose()
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Question>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {} FROM questions WHERE id = ANY($1)", QUESTION_COLUMNS);
        let records = sqlx::query_as::<_, QuestionRecord>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        records.into_iter().map(Question::try_from).collect()
    }

    async fn update(&self, q: Question) -> Result<Question> {
        let c = PayloadColumns::from(&q.details);
        let sql = format!(
            r#"
            UPDATE questions SET
                type = $2, question_text = $3, code_snippet = $4, explanation = $5, hint = $6,
                options = $7, correct_answer = $8, correct_answers_data = $9, pairs = $10,
                items = $11, correct_order = $12, word_data = $13, level_number = $14,
                pattern_data = $15, ladder_steps = $16, max_attempts = $17,
                difficulty = $18, concepts = $19, domain = $20, subject = $21, source = $22,
                weightage = $23, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            QUESTION_COLUMNS
        );
        let record = sqlx::query_as::<_, QuestionRecord>(&sql)
            .bind(q.id)
            .bind(q.details.question_type().as_str())
            .bind(&q.question_text)
            .bind(&q.code_snippet)
            .bind(&q.explanation)
            .bind(&q.hint)
            .bind(c.options)
            .bind(c.correct_answer)
            .bind(c.correct_answers_data)
            .bind(c.pairs)
            .bind(c.items)
            .bind(c.correct_order)
            .bind(c.word_data)
            .bind(c.level_number)
            .bind(c.pattern_data)
            .bind(c.ladder_steps)
            .bind(c.max_attempts)
            .bind(q.difficulty.as_str())
            .bind(json!(q.concepts))
            .bind(&q.domain)
            .bind(&q.subject)
            .bind(&q.source)
            .bind(q.weightage)
            .fetch_one(&self.pool)
            .await?;
        record.try_into()
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        filter: QuestionFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Question>, i64)> {
        let where_clause = r#"
            WHERE ($1::text IS NULL OR type = $1)
              AND ($2::text IS NULL OR domain = $2)
              AND ($3::text IS NULL OR subject = $3)
              AND ($4::text IS NULL OR source = $4)
              AND ($5::text IS NULL OR difficulty = $5)
              AND ($6::text IS NULL OR question_text ILIKE $6)
              AND ($7::uuid IS NULL OR created_by = $7)
        "#;
        let type_param = filter.question_type.map(|t| t.as_str());
        let difficulty_param = filter.difficulty.map(|d| d.as_str());
        let search_param = filter.search.map(|s| format!("%{}%", s));

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM questions {}",
            where_clause
        ))
        .bind(type_param)
        .bind(&filter.domain)
        .bind(&filter.subject)
        .bind(&filter.source)
        .bind(difficulty_param)
        .bind(&search_param)
        .bind(filter.created_by)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "SELECT {} FROM questions {} ORDER BY created_at DESC LIMIT $8 OFFSET $9",
            QUESTION_COLUMNS, where_clause
        );
        let records = sqlx::query_as::<_, QuestionRecord>(&sql)
            .bind(type_param)
            .bind(&filter.domain)
            .bind(&filter.subject)
            .bind(&filter.source)
            .bind(difficulty_param)
            .bind(&search_param)
            .bind(filter.created_by)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let questions = records
            .into_iter()
            .map(Question::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok((questions, total))
    }

    async fn candidates(&self, criteria: &SelectionCriteria) -> Result<Vec<Candidate>> {
        let sql = format!(
            "SELECT id, weightage FROM questions WHERE weightage > 0 AND {}",
            CRITERIA_CLAUSE
        );
        let rows = sqlx::query_as::<_, Candidate>(&sql)
            .bind(&criteria.domain)
            .bind(&criteria.subject)
            .bind(&criteria.source)
            .bind(criteria.difficulty.map(|d| d.as_str()))
            .bind(&criteria.concepts)
            .bind(criteria.batch_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn criteria_stats(&self) -> Result<Vec<CriteriaStat>> {
        let rows: Vec<(String, String, String, String, i64)> = sqlx::query_as(
            r#"
            SELECT domain, subject, source, difficulty, COUNT(*)
            FROM questions
            WHERE weightage > 0
            GROUP BY domain, subject, source, difficulty
            ORDER BY domain, subject, source, difficulty
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(domain, subject, source, difficulty, count)| {
                Ok(CriteriaStat {
                    domain,
                    subject,
                    source,
                    difficulty: difficulty.parse().map_err(Error::Internal)?,
                    question_count: count,
                })
            })
            .collect()
    }

    async fn has_answers(&self, id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM question_answers WHERE question_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
