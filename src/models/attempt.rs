use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::quiz::SelectionCriteria;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    #[default]
    InProgress,
    Completed,
    Abandoned,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttemptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(AttemptStatus::InProgress),
            "completed" => Ok(AttemptStatus::Completed),
            "abandoned" => Ok(AttemptStatus::Abandoned),
            other => Err(format!("unknown attempt status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub total_questions: i32,
    pub questions_answered: i32,
    pub correct_answers: i32,
    pub score_percentage: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quiz_id: Uuid,
    pub status: AttemptStatus,
    /// Question ids resolved at start, in presentation order.
    pub selected_questions: Vec<Uuid>,
    pub criteria_snapshot: Option<SelectionCriteria>,
    pub requested_questions: i32,
    pub game_results: Option<JsonValue>,
    pub summary: AttemptSummary,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Attempt {
    pub fn is_open(&self) -> bool {
        self.status == AttemptStatus::InProgress
    }

    pub fn contains_question(&self, question_id: Uuid) -> bool {
        self.selected_questions.contains(&question_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAttempt {
    pub user_id: Uuid,
    pub quiz_id: Uuid,
    pub selected_questions: Vec<Uuid>,
    pub criteria_snapshot: Option<SelectionCriteria>,
    pub requested_questions: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttemptFilter {
    pub quiz_id: Option<Uuid>,
    pub status: Option<AttemptStatus>,
}

/// Completed-attempt row joined with its quiz difficulty, used for statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredAttempt {
    pub attempt_id: Uuid,
    pub quiz_id: Uuid,
    pub difficulty: crate::models::question::Difficulty,
    pub score_percentage: i32,
    pub completed_at: Option<DateTime<Utc>>,
}
