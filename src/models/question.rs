use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    #[serde(alias = "fill_in_the_blank")]
    FillBlank,
    TrueFalse,
    Matching,
    #[serde(alias = "ordering")]
    DragDropOrder,
    Hangman,
    KnowledgeTower,
    WordLadder,
    MemoryGrid,
}

impl QuestionType {
    pub const ALL: [QuestionType; 9] = [
        QuestionType::MultipleChoice,
        QuestionType::FillBlank,
        QuestionType::TrueFalse,
        QuestionType::Matching,
        QuestionType::DragDropOrder,
        QuestionType::Hangman,
        QuestionType::KnowledgeTower,
        QuestionType::WordLadder,
        QuestionType::MemoryGrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::FillBlank => "fill_blank",
            QuestionType::TrueFalse => "true_false",
            QuestionType::Matching => "matching",
            QuestionType::DragDropOrder => "drag_drop_order",
            QuestionType::Hangman => "hangman",
            QuestionType::KnowledgeTower => "knowledge_tower",
            QuestionType::WordLadder => "word_ladder",
            QuestionType::MemoryGrid => "memory_grid",
        }
    }

    pub fn is_game(&self) -> bool {
        matches!(
            self,
            QuestionType::Hangman
                | QuestionType::KnowledgeTower
                | QuestionType::WordLadder
                | QuestionType::MemoryGrid
        )
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "fill_in_the_blank" => return Ok(QuestionType::FillBlank),
            "ordering" => return Ok(QuestionType::DragDropOrder),
            _ => {}
        }
        QuestionType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown question type '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[serde(alias = "Easy")]
    Easy,
    #[default]
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "Hard")]
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordData {
    pub word: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

fn default_max_attempts() -> i32 {
    6
}

fn default_level_number() -> i32 {
    1
}

/// Type-specific payload. The variant is the question type, so a payload
/// field can only exist on the types that use it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionDetails {
    MultipleChoice {
        options: Vec<ChoiceOption>,
        correct_answer: String,
    },
    /// One list of acceptable answers per blank.
    #[serde(alias = "fill_in_the_blank")]
    FillBlank { correct_answers: Vec<Vec<String>> },
    TrueFalse { correct_answer: bool },
    Matching { pairs: Vec<MatchPair> },
    #[serde(alias = "ordering")]
    DragDropOrder {
        items: Vec<OrderItem>,
        correct_order: Vec<String>,
    },
    Hangman {
        word_data: WordData,
        #[serde(default = "default_max_attempts")]
        max_attempts: i32,
    },
    KnowledgeTower {
        #[serde(default = "default_level_number")]
        level_number: i32,
        options: Vec<ChoiceOption>,
        correct_answer: String,
    },
    WordLadder {
        word_data: WordData,
        ladder_steps: Vec<String>,
    },
    MemoryGrid { pattern_data: JsonValue },
}

impl QuestionDetails {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionDetails::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionDetails::FillBlank { .. } => QuestionType::FillBlank,
            QuestionDetails::TrueFalse { .. } => QuestionType::TrueFalse,
            QuestionDetails::Matching { .. } => QuestionType::Matching,
            QuestionDetails::DragDropOrder { .. } => QuestionType::DragDropOrder,
            QuestionDetails::Hangman { .. } => QuestionType::Hangman,
            QuestionDetails::KnowledgeTower { .. } => QuestionType::KnowledgeTower,
            QuestionDetails::WordLadder { .. } => QuestionType::WordLadder,
            QuestionDetails::MemoryGrid { .. } => QuestionType::MemoryGrid,
        }
    }

    /// Structural checks the type system cannot express.
    pub fn check(&self) -> Result<(), String> {
        match self {
            QuestionDetails::MultipleChoice {
                options,
                correct_answer,
            }
            | QuestionDetails::KnowledgeTower {
                options,
                correct_answer,
                ..
            } => {
                if options.len() < 2 {
                    return Err("at least two options are required".into());
                }
                let mut keys = HashSet::new();
                for option in options {
                    if option.key.trim().is_empty() {
                        return Err("option keys must not be empty".into());
                    }
                    if !keys.insert(option.key.trim().to_ascii_uppercase()) {
                        return Err(format!("duplicate option key '{}'", option.key));
                    }
                }
                if !keys.contains(&correct_answer.trim().to_ascii_uppercase()) {
                    return Err(format!(
                        "correct answer '{}' is not one of the option keys",
                        correct_answer
                    ));
                }
                Ok(())
            }
            QuestionDetails::FillBlank { correct_answers } => {
                if correct_answers.is_empty() {
                    return Err("at least one blank is required".into());
                }
                if correct_answers
                    .iter()
                    .any(|blank| blank.iter().all(|a| a.trim().is_empty()))
                {
                    return Err("every blank needs an acceptable answer".into());
                }
                Ok(())
            }
            QuestionDetails::TrueFalse { .. } => Ok(()),
            QuestionDetails::Matching { pairs } => {
                if pairs.is_empty() {
                    return Err("at least one pair is required".into());
                }
                let mut lefts = HashSet::new();
                for pair in pairs {
                    if !lefts.insert(pair.left.as_str()) {
                        return Err(format!("duplicate left item '{}'", pair.left));
                    }
                }
                Ok(())
            }
            QuestionDetails::DragDropOrder {
                items,
                correct_order,
            } => {
                let ids: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
                if ids.len() != items.len() {
                    return Err("item ids must be unique".into());
                }
                let ordered: HashSet<&str> = correct_order.iter().map(String::as_str).collect();
                if items.len() < 2 || ordered != ids || correct_order.len() != items.len() {
                    return Err("correct order must be a permutation of the item ids".into());
                }
                Ok(())
            }
            QuestionDetails::Hangman {
                word_data,
                max_attempts,
            } => {
                if word_data.word.trim().is_empty() {
                    return Err("hangman word must not be empty".into());
                }
                if *max_attempts < 1 {
                    return Err("max attempts must be positive".into());
                }
                Ok(())
            }
            QuestionDetails::WordLadder {
                word_data,
                ladder_steps,
            } => {
                if word_data.word.trim().is_empty() {
                    return Err("ladder word must not be empty".into());
                }
                if ladder_steps.len() < 2 {
                    return Err("a word ladder needs at least two steps".into());
                }
                Ok(())
            }
            QuestionDetails::MemoryGrid { pattern_data } => {
                if !pattern_data.is_object() {
                    return Err("pattern data must be an object".into());
                }
                Ok(())
            }
        }
    }

    /// What a player may see: everything except the answer key.
    pub fn presentation(&self) -> JsonValue {
        match self {
            QuestionDetails::MultipleChoice { options, .. } => json!({ "options": options }),
            QuestionDetails::FillBlank { correct_answers } => {
                json!({ "blank_count": correct_answers.len() })
            }
            QuestionDetails::TrueFalse { .. } => json!({}),
            QuestionDetails::Matching { pairs } => {
                let lefts: Vec<&str> = pairs.iter().map(|p| p.left.as_str()).collect();
                let mut rights: Vec<&str> = pairs.iter().map(|p| p.right.as_str()).collect();
                rights.sort_unstable();
                json!({ "left_items": lefts, "right_items": rights })
            }
            QuestionDetails::DragDropOrder { items, .. } => {
                let mut shown = items.clone();
                shown.sort_by(|a, b| a.id.cmp(&b.id));
                json!({ "items": shown })
            }
            QuestionDetails::Hangman {
                word_data,
                max_attempts,
            } => json!({
                "word_length": word_data.word.chars().count(),
                "hint": word_data.hint,
                "category": word_data.category,
                "max_attempts": max_attempts,
            }),
            QuestionDetails::KnowledgeTower {
                level_number,
                options,
                ..
            } => json!({ "level_number": level_number, "options": options }),
            QuestionDetails::WordLadder {
                word_data,
                ladder_steps,
            } => json!({
                "start_word": ladder_steps.first(),
                "target_word": ladder_steps.last(),
                "step_count": ladder_steps.len(),
                "hint": word_data.hint,
            }),
            QuestionDetails::MemoryGrid { pattern_data } => {
                json!({ "pattern_data": pattern_data })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub question_text: String,
    pub code_snippet: Option<String>,
    pub explanation: Option<String>,
    pub hint: Option<String>,
    #[serde(flatten)]
    pub details: QuestionDetails,
    pub difficulty: Difficulty,
    pub concepts: Vec<String>,
    pub domain: String,
    pub subject: String,
    pub source: String,
    pub weightage: i32,
    pub quiz_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        self.details.question_type()
    }

    pub fn to_public(&self) -> PublicQuestion {
        PublicQuestion {
            id: self.id,
            question_type: self.question_type(),
            question_text: self.question_text.clone(),
            code_snippet: self.code_snippet.clone(),
            hint: self.hint.clone(),
            difficulty: self.difficulty,
            concepts: self.concepts.clone(),
            content: self.details.presentation(),
        }
    }
}

/// Question as shown to a player taking a quiz (answer key removed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question_text: String,
    pub code_snippet: Option<String>,
    pub hint: Option<String>,
    pub difficulty: Difficulty,
    pub concepts: Vec<String>,
    pub content: JsonValue,
}

/// Everything needed to add a question to the bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub question_text: String,
    pub code_snippet: Option<String>,
    pub explanation: Option<String>,
    pub hint: Option<String>,
    #[serde(flatten)]
    pub details: QuestionDetails,
    pub difficulty: Difficulty,
    pub concepts: Vec<String>,
    pub domain: String,
    pub subject: String,
    pub source: String,
    pub weightage: i32,
    pub quiz_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionChanges {
    pub question_text: Option<String>,
    pub code_snippet: Option<String>,
    pub explanation: Option<String>,
    pub hint: Option<String>,
    pub details: Option<QuestionDetails>,
    pub difficulty: Option<Difficulty>,
    pub concepts: Option<Vec<String>>,
    pub domain: Option<String>,
    pub subject: Option<String>,
    pub source: Option<String>,
    pub weightage: Option<i32>,
}

impl QuestionChanges {
    pub fn apply(self, question: &mut Question) {
        if let Some(v) = self.question_text {
            question.question_text = v;
        }
        if let Some(v) = self.code_snippet {
            question.code_snippet = Some(v);
        }
        if let Some(v) = self.explanation {
            question.explanation = Some(v);
        }
        if let Some(v) = self.hint {
            question.hint = Some(v);
        }
        if let Some(v) = self.details {
            question.details = v;
        }
        if let Some(v) = self.difficulty {
            question.difficulty = v;
        }
        if let Some(v) = self.concepts {
            question.concepts = v;
        }
        if let Some(v) = self.domain {
            question.domain = v;
        }
        if let Some(v) = self.subject {
            question.subject = v;
        }
        if let Some(v) = self.source {
            question.source = v;
        }
        if let Some(v) = self.weightage {
            question.weightage = v;
        }
    }
}

/// Filters for browsing the bank.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionFilter {
    pub question_type: Option<QuestionType>,
    pub domain: Option<String>,
    pub subject: Option<String>,
    pub source: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub search: Option<String>,
    pub created_by: Option<Uuid>,
}

/// Number of bank questions available for one metadata combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaStat {
    pub domain: String,
    pub subject: String,
    pub source: String,
    pub difficulty: Difficulty,
    pub question_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq() -> QuestionDetails {
        QuestionDetails::MultipleChoice {
            options: vec![
                ChoiceOption { key: "A".into(), value: "map".into() },
                ChoiceOption { key: "B".into(), value: "filter".into() },
            ],
            correct_answer: "B".into(),
        }
    }

    #[test]
    fn type_aliases_parse() {
        assert_eq!("fill_in_the_blank".parse::<QuestionType>().unwrap(), QuestionType::FillBlank);
        assert_eq!("ordering".parse::<QuestionType>().unwrap(), QuestionType::DragDropOrder);
        assert_eq!("true-false".parse::<QuestionType>().unwrap(), QuestionType::TrueFalse);
        assert!("essay".parse::<QuestionType>().is_err());
    }

    #[test]
    fn details_deserialize_from_tagged_json() {
        let details: QuestionDetails = serde_json::from_value(json!({
            "type": "fill_in_the_blank",
            "correct_answers": [["filter", "Filter"]]
        }))
        .unwrap();
        assert_eq!(details.question_type(), QuestionType::FillBlank);

        let hangman: QuestionDetails = serde_json::from_value(json!({
            "type": "hangman",
            "word_data": { "word": "closure" }
        }))
        .unwrap();
        assert_eq!(
            hangman,
            QuestionDetails::Hangman {
                word_data: WordData { word: "closure".into(), hint: None, category: None },
                max_attempts: 6,
            }
        );
    }

    #[test]
    fn check_rejects_unknown_correct_key() {
        let details = QuestionDetails::MultipleChoice {
            options: vec![
                ChoiceOption { key: "A".into(), value: "x".into() },
                ChoiceOption { key: "B".into(), value: "y".into() },
            ],
            correct_answer: "E".into(),
        };
        assert!(details.check().is_err());
        assert!(mcq().check().is_ok());
    }

    #[test]
    fn check_requires_order_permutation() {
        let details = QuestionDetails::DragDropOrder {
            items: vec![
                OrderItem { id: "a".into(), text: "parse".into() },
                OrderItem { id: "b".into(), text: "check".into() },
            ],
            correct_order: vec!["a".into(), "a".into()],
        };
        assert!(details.check().is_err());
    }

    #[test]
    fn presentation_hides_answer_key() {
        let shown = mcq().presentation();
        assert!(shown.get("correct_answer").is_none());
        assert_eq!(shown["options"].as_array().map(Vec::len), Some(2));

        let hangman = QuestionDetails::Hangman {
            word_data: WordData {
                word: "borrow".into(),
                hint: Some("ownership".into()),
                category: None,
            },
            max_attempts: 6,
        };
        let shown = hangman.presentation();
        assert_eq!(shown["word_length"], 6);
        assert!(!shown.to_string().contains("borrow"));
    }
}
