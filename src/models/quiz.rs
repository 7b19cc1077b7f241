use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::question::{Difficulty, Question, QuestionType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameFormat {
    #[default]
    Traditional,
    Hangman,
    KnowledgeTower,
    WordLadder,
    MemoryGrid,
}

impl GameFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameFormat::Traditional => "traditional",
            GameFormat::Hangman => "hangman",
            GameFormat::KnowledgeTower => "knowledge_tower",
            GameFormat::WordLadder => "word_ladder",
            GameFormat::MemoryGrid => "memory_grid",
        }
    }

    pub fn is_game(&self) -> bool {
        !matches!(self, GameFormat::Traditional)
    }

    /// Question types this format knows how to present.
    pub fn accepts(&self, question_type: QuestionType) -> bool {
        use QuestionType::*;
        match self {
            GameFormat::Traditional => matches!(
                question_type,
                MultipleChoice | FillBlank | TrueFalse | Matching | DragDropOrder
            ),
            GameFormat::Hangman => matches!(question_type, Hangman | WordLadder),
            GameFormat::KnowledgeTower => {
                matches!(question_type, KnowledgeTower | MultipleChoice | TrueFalse)
            }
            GameFormat::WordLadder => question_type == WordLadder,
            GameFormat::MemoryGrid => question_type == MemoryGrid,
        }
    }
}

impl fmt::Display for GameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "traditional" => Ok(GameFormat::Traditional),
            "hangman" => Ok(GameFormat::Hangman),
            "knowledge_tower" => Ok(GameFormat::KnowledgeTower),
            "word_ladder" => Ok(GameFormat::WordLadder),
            "memory_grid" => Ok(GameFormat::MemoryGrid),
            other => Err(format!("unknown game format '{}'", other)),
        }
    }
}

/// Filter describing a dynamic quiz. Unset fields do not constrain selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(
        default,
        alias = "difficulty_level",
        skip_serializing_if = "Option::is_none"
    )]
    pub difficulty: Option<Difficulty>,
    /// Matches questions tagged with any of these concepts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concepts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<Uuid>,
    pub count: usize,
}

impl fmt::Display for SelectionCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(d) = &self.domain {
            parts.push(format!("domain={}", d));
        }
        if let Some(s) = &self.subject {
            parts.push(format!("subject={}", s));
        }
        if let Some(s) = &self.source {
            parts.push(format!("source={}", s));
        }
        if let Some(d) = &self.difficulty {
            parts.push(format!("difficulty={}", d));
        }
        if !self.concepts.is_empty() {
            parts.push(format!("concepts={}", self.concepts.join("|")));
        }
        if let Some(b) = &self.batch_id {
            parts.push(format!("batch={}", b));
        }
        parts.push(format!("count={}", self.count));
        f.write_str(&parts.join(", "))
    }
}

/// A quiz is either a fixed ordered list or a criteria descriptor, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuizSource {
    Fixed { question_ids: Vec<Uuid> },
    Criteria { criteria: SelectionCriteria },
}

impl QuizSource {
    pub fn is_criteria_based(&self) -> bool {
        matches!(self, QuizSource::Criteria { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub time_limit_minutes: i32,
    pub source: QuizSource,
    pub game_format: GameFormat,
    pub game_options: Option<JsonValue>,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuiz {
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub time_limit_minutes: i32,
    pub source: QuizSource,
    pub game_format: GameFormat,
    pub game_options: Option<JsonValue>,
    pub created_by: Option<Uuid>,
}

/// Reported when a dynamic quiz matched fewer questions than it asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnderfillWarning {
    pub requested: usize,
    pub delivered: usize,
}

/// Concrete question sequence for one attempt.
#[derive(Debug, Clone)]
pub struct ResolvedQuiz {
    pub quiz_id: Uuid,
    pub game_format: GameFormat,
    pub questions: Vec<Question>,
    pub requested: usize,
    pub underfill: Option<UnderfillWarning>,
    pub criteria_snapshot: Option<SelectionCriteria>,
}

impl ResolvedQuiz {
    pub fn question_ids(&self) -> Vec<Uuid> {
        self.questions.iter().map(|q| q.id).collect()
    }
}
