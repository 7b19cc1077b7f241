use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::quiz::SelectionCriteria;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub subject: String,
    pub domain: String,
    pub is_active: bool,
    /// Default criteria for quizzes assigned to this batch.
    pub quiz_criteria: Option<SelectionCriteria>,
    pub created_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBatch {
    pub name: String,
    pub description: Option<String>,
    pub subject: String,
    pub domain: String,
    pub quiz_criteria: Option<SelectionCriteria>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub active_users: i64,
    pub questions: i64,
    pub quizzes: i64,
}
