use serde::Deserialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::attempt::{AttemptFilter, AttemptStatus};

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnswerRequest {
    pub answer: JsonValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameResultsRequest {
    pub results: JsonValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttemptListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub quiz_id: Option<Uuid>,
    pub status: Option<AttemptStatus>,
}

impl AttemptListQuery {
    pub fn filter(&self) -> AttemptFilter {
        AttemptFilter {
            quiz_id: self.quiz_id,
            status: self.status,
        }
    }
}
