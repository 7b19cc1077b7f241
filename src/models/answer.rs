use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub user_answer: JsonValue,
    /// `None` when the raw answer could not be interpreted for its type.
    pub canonical_answer: Option<JsonValue>,
    pub is_correct: bool,
    pub points_earned: i32,
    pub answered_at: DateTime<Utc>,
}

/// One graded answer ready to be upserted for (attempt, question).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedAnswer {
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub user_answer: JsonValue,
    pub canonical_answer: Option<JsonValue>,
    pub is_correct: bool,
    pub points_earned: i32,
}
