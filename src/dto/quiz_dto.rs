use serde::Deserialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::question::Difficulty;
use crate::models::quiz::{GameFormat, NewQuiz, QuizSource, SelectionCriteria};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Option<Difficulty>,
    #[validate(range(min = 1, max = 600, message = "Time limit must be between 1 and 600 minutes"))]
    pub time_limit_minutes: Option<i32>,
    /// Fixed quiz: ordered question ids.
    pub question_ids: Option<Vec<Uuid>>,
    /// Dynamic quiz: selection criteria resolved per attempt.
    #[serde(alias = "quiz_criteria")]
    pub criteria: Option<SelectionCriteria>,
    #[serde(default)]
    pub game_format: GameFormat,
    pub game_options: Option<JsonValue>,
}

impl CreateQuizRequest {
    pub fn into_new_quiz(self, created_by: Option<Uuid>) -> Result<NewQuiz> {
        let source = match (self.question_ids, self.criteria) {
            (Some(question_ids), None) => QuizSource::Fixed { question_ids },
            (None, Some(criteria)) => QuizSource::Criteria { criteria },
            _ => {
                return Err(Error::BadRequest(
                    "Provide either question_ids or criteria, not both".to_string(),
                ))
            }
        };
        Ok(NewQuiz {
            title: self.title,
            description: self.description,
            difficulty: self.difficulty.unwrap_or_default(),
            time_limit_minutes: self.time_limit_minutes.unwrap_or(30),
            source,
            game_format: self.game_format,
            game_options: self.game_options,
            created_by,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuizListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub include_inactive: Option<bool>,
}
