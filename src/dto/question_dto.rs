use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::question::{
    Difficulty, NewQuestion, QuestionChanges, QuestionDetails, QuestionFilter, QuestionType,
};
use crate::models::quiz::SelectionCriteria;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, message = "Question text cannot be empty"))]
    pub question_text: String,
    pub code_snippet: Option<String>,
    pub explanation: Option<String>,
    pub hint: Option<String>,
    #[serde(flatten)]
    pub details: QuestionDetails,
    #[serde(default, alias = "difficulty_level")]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub concepts: Vec<String>,
    pub domain: Option<String>,
    pub subject: Option<String>,
    pub source: Option<String>,
    #[validate(range(min = 0, message = "Weightage must not be negative"))]
    pub weightage: Option<i32>,
    pub quiz_id: Option<Uuid>,
}

impl CreateQuestionRequest {
    pub fn into_new_question(self, created_by: Option<Uuid>) -> NewQuestion {
        NewQuestion {
            question_text: self.question_text,
            code_snippet: self.code_snippet,
            explanation: self.explanation,
            hint: self.hint,
            details: self.details,
            difficulty: self.difficulty.unwrap_or_default(),
            concepts: self.concepts,
            domain: self.domain.unwrap_or_else(|| "General".to_string()),
            subject: self.subject.unwrap_or_else(|| "General".to_string()),
            source: self.source.unwrap_or_else(|| "Custom".to_string()),
            weightage: self.weightage.unwrap_or(1),
            quiz_id: self.quiz_id,
            created_by,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, message = "Question text cannot be empty"))]
    pub question_text: Option<String>,
    pub code_snippet: Option<String>,
    pub explanation: Option<String>,
    pub hint: Option<String>,
    /// Replacement payload, tagged with its `type`.
    pub details: Option<QuestionDetails>,
    pub difficulty: Option<Difficulty>,
    pub concepts: Option<Vec<String>>,
    pub domain: Option<String>,
    pub subject: Option<String>,
    pub source: Option<String>,
    #[validate(range(min = 0, message = "Weightage must not be negative"))]
    pub weightage: Option<i32>,
}

impl From<UpdateQuestionRequest> for QuestionChanges {
    fn from(r: UpdateQuestionRequest) -> Self {
        QuestionChanges {
            question_text: r.question_text,
            code_snippet: r.code_snippet,
            explanation: r.explanation,
            hint: r.hint,
            details: r.details,
            difficulty: r.difficulty,
            concepts: r.concepts,
            domain: r.domain,
            subject: r.subject,
            source: r.source,
            weightage: r.weightage,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    #[serde(rename = "type")]
    pub question_type: Option<String>,
    pub domain: Option<String>,
    pub subject: Option<String>,
    pub source: Option<String>,
    pub difficulty: Option<String>,
    pub search: Option<String>,
    pub created_by: Option<Uuid>,
}

impl QuestionListQuery {
    pub fn filter(&self) -> Result<QuestionFilter> {
        let question_type = self
            .question_type
            .as_deref()
            .map(str::parse::<QuestionType>)
            .transpose()
            .map_err(Error::BadRequest)?;
        let difficulty = self
            .difficulty
            .as_deref()
            .map(str::parse::<Difficulty>)
            .transpose()
            .map_err(Error::BadRequest)?;
        Ok(QuestionFilter {
            question_type,
            domain: self.domain.clone(),
            subject: self.subject.clone(),
            source: self.source.clone(),
            difficulty,
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
            created_by: self.created_by,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PreviewRequest {
    #[serde(flatten)]
    pub criteria: SelectionCriteria,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}
