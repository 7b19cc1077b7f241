use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::batch::NewBatch;
use crate::models::question::Difficulty;
use crate::models::quiz::{GameFormat, SelectionCriteria};
use crate::services::batch_service::BatchQuizOptions;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBatchRequest {
    #[validate(length(min = 1, max = 255, message = "Batch name must be 1-255 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub domain: Option<String>,
    pub quiz_criteria: Option<SelectionCriteria>,
}

impl CreateBatchRequest {
    pub fn into_new_batch(self, created_by: Option<Uuid>) -> NewBatch {
        NewBatch {
            name: self.name,
            description: self.description,
            subject: self.subject.unwrap_or_else(|| "General".to_string()),
            domain: self.domain.unwrap_or_else(|| "General".to_string()),
            quiz_criteria: self.quiz_criteria,
            created_by,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBatchQuizRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Option<Difficulty>,
    #[validate(range(min = 1, max = 600))]
    pub time_limit_minutes: Option<i32>,
    #[serde(default)]
    pub game_format: GameFormat,
    #[validate(range(min = 1))]
    pub question_count: Option<usize>,
}

impl CreateBatchQuizRequest {
    pub fn into_options(self, created_by: Option<Uuid>) -> BatchQuizOptions {
        BatchQuizOptions {
            title: self.title,
            description: self.description,
            difficulty: self.difficulty,
            time_limit_minutes: self.time_limit_minutes.unwrap_or(30),
            game_format: self.game_format,
            question_count: self.question_count,
            created_by,
        }
    }
}
