//! Ingests question sets produced by an external content generator.
//!
//! Generators are loose about shapes: options arrive as `"A) text"` lines,
//! pairs as `"left|right"`, concepts as comma-separated strings. Everything is
//! coerced into [`NewQuestion`] and then goes through the normal bank checks.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::question::{
    ChoiceOption, Difficulty, MatchPair, NewQuestion, OrderItem, QuestionDetails, QuestionType,
    WordData,
};
use crate::services::question_bank_service::QuestionBankService;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationMetadata {
    pub domain: Option<String>,
    pub subject: Option<String>,
    pub source: Option<String>,
    pub difficulty: Option<String>,
    pub concepts: Option<JsonValue>,
    pub quiz_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedContent {
    pub questions: Vec<JsonValue>,
    #[serde(default)]
    pub metadata: GenerationMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedQuestion {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub imported: Vec<Uuid>,
    pub skipped: Vec<SkippedQuestion>,
}

#[derive(Clone)]
pub struct ImportService {
    bank: QuestionBankService,
}

impl ImportService {
    pub fn new(bank: QuestionBankService) -> Self {
        Self { bank }
    }

    pub async fn import(
        &self,
        content: GeneratedContent,
        created_by: Option<Uuid>,
    ) -> Result<ImportReport> {
        let mut report = ImportReport::default();

        for (index, raw) in content.questions.iter().enumerate() {
            let parsed = parse_generated(raw, &content.metadata).map(|mut q| {
                q.created_by = created_by;
                q
            });
            let outcome = match parsed {
                Ok(question) => self.bank.create(question).await.map_err(|e| match e {
                    Error::BadRequest(reason) => Ok(reason),
                    other => Err(other),
                }),
                Err(reason) => Err(Ok(reason)),
            };
            match outcome {
                Ok(created) => report.imported.push(created.id),
                Err(Ok(reason)) => {
                    warn!("Skipping generated question {}: {}", index, reason);
                    report.skipped.push(SkippedQuestion { index, reason });
                }
                Err(Err(e)) => return Err(e),
            }
        }

        info!(
            "Imported {} generated questions ({} skipped)",
            report.imported.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}

/// Coerces one generated question into a bank question.
pub fn parse_generated(
    raw: &JsonValue,
    metadata: &GenerationMetadata,
) -> std::result::Result<NewQuestion, String> {
    let obj = raw
        .as_object()
        .ok_or_else(|| "question is not an object".to_string())?;

    let question_type: QuestionType = text(obj, &["type", "question_type"])
        .ok_or_else(|| "missing question type".to_string())?
        .parse()?;
    let question_text = text(obj, &["question_text", "question"])
        .ok_or_else(|| "missing question text".to_string())?;

    let details = match question_type {
        QuestionType::MultipleChoice => QuestionDetails::MultipleChoice {
            options: options(obj)?,
            correct_answer: choice_key(obj)?,
        },
        QuestionType::KnowledgeTower => QuestionDetails::KnowledgeTower {
            level_number: int(obj, "level_number").unwrap_or(1),
            options: options(obj)?,
            correct_answer: choice_key(obj)?,
        },
        QuestionType::FillBlank => QuestionDetails::FillBlank {
            correct_answers: blanks(obj)?,
        },
        QuestionType::TrueFalse => QuestionDetails::TrueFalse {
            correct_answer: match obj.get("correct_answer") {
                Some(JsonValue::Bool(b)) => *b,
                Some(JsonValue::String(s)) if s.trim().eq_ignore_ascii_case("true") => true,
                Some(JsonValue::String(s)) if s.trim().eq_ignore_ascii_case("false") => false,
                _ => return Err("true/false answer must be true or false".into()),
            },
        },
        QuestionType::Matching => QuestionDetails::Matching {
            pairs: pairs(obj)?,
        },
        QuestionType::DragDropOrder => {
            let items = order_items(obj)?;
            let correct_order = match obj.get("correct_order") {
                Some(value) => strings(value).ok_or("correct order must list item ids")?,
                None => items.iter().map(|i| i.id.clone()).collect(),
            };
            QuestionDetails::DragDropOrder {
                items,
                correct_order,
            }
        }
        QuestionType::Hangman => QuestionDetails::Hangman {
            word_data: word_data(obj)?,
            max_attempts: int(obj, "max_attempts").unwrap_or(6),
        },
        QuestionType::WordLadder => QuestionDetails::WordLadder {
            word_data: word_data(obj)?,
            ladder_steps: obj
                .get("ladder_steps")
                .and_then(strings)
                .ok_or("word ladder needs ladder_steps")?,
        },
        QuestionType::MemoryGrid => QuestionDetails::MemoryGrid {
            pattern_data: obj
                .get("pattern_data")
                .filter(|v| v.is_object())
                .cloned()
                .ok_or("memory grid needs a pattern_data object")?,
        },
    };

    let difficulty = text(obj, &["difficulty", "difficulty_level"])
        .or_else(|| metadata.difficulty.clone())
        .map(|d| d.parse::<Difficulty>())
        .transpose()?
        .unwrap_or_default();

    let concepts = obj
        .get("concepts")
        .or(metadata.concepts.as_ref())
        .map(concept_list)
        .unwrap_or_default();

    Ok(NewQuestion {
        question_text,
        code_snippet: text(obj, &["code_snippet"]),
        explanation: text(obj, &["explanation"]),
        hint: text(obj, &["hint"]),
        details,
        difficulty,
        concepts,
        domain: text(obj, &["domain"])
            .or_else(|| metadata.domain.clone())
            .unwrap_or_else(|| "General".to_string()),
        subject: text(obj, &["subject"])
            .or_else(|| metadata.subject.clone())
            .unwrap_or_else(|| "General".to_string()),
        source: text(obj, &["source"])
            .or_else(|| metadata.source.clone())
            .unwrap_or_else(|| "Custom".to_string()),
        weightage: int(obj, "weightage").unwrap_or(1),
        quiz_id: metadata.quiz_id,
        created_by: None,
    })
}

fn text(obj: &Map<String, JsonValue>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(JsonValue::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_owned)
}

fn int(obj: &Map<String, JsonValue>, key: &str) -> Option<i32> {
    match obj.get(key)? {
        JsonValue::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn strings(value: &JsonValue) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| match v {
            JsonValue::String(s) => Some(s.trim().to_owned()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

/// Lines of text, or the elements of an array of strings.
fn lines(value: &JsonValue) -> Option<Vec<String>> {
    match value {
        JsonValue::String(s) => Some(
            s.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_owned)
                .collect(),
        ),
        JsonValue::Array(_) => strings(value),
        _ => None,
    }
}

fn options(obj: &Map<String, JsonValue>) -> std::result::Result<Vec<ChoiceOption>, String> {
    let value = obj.get("options").ok_or("missing options")?;
    if let Ok(parsed) = serde_json::from_value::<Vec<ChoiceOption>>(value.clone()) {
        return Ok(parsed);
    }
    let lines = lines(value).ok_or("options must be a list")?;
    Ok(lines
        .iter()
        .enumerate()
        .map(|(i, line)| split_option(line, i))
        .collect())
}

/// `"B) text"` becomes key B; anything else is keyed by its position.
fn split_option(line: &str, index: usize) -> ChoiceOption {
    let mut chars = line.chars();
    if let (Some(key), Some(')')) = (chars.next(), chars.next()) {
        if key.is_ascii_uppercase() {
            return ChoiceOption {
                key: key.to_string(),
                value: chars.as_str().trim().to_owned(),
            };
        }
    }
    ChoiceOption {
        key: position_key(index),
        value: line.to_owned(),
    }
}

fn position_key(index: usize) -> String {
    char::from_u32('A' as u32 + index as u32)
        .map(String::from)
        .unwrap_or_else(|| index.to_string())
}

fn choice_key(obj: &Map<String, JsonValue>) -> std::result::Result<String, String> {
    match obj.get("correct_answer") {
        Some(JsonValue::String(s)) => {
            let s = s.trim();
            let key = s.split(')').next().unwrap_or(s).trim();
            if key.is_empty() {
                Err("empty correct answer".into())
            } else {
                Ok(key.to_ascii_uppercase())
            }
        }
        Some(JsonValue::Number(n)) => n
            .as_u64()
            .map(|i| position_key(i as usize))
            .ok_or_else(|| "correct answer index must be non-negative".into()),
        _ => Err("missing correct answer".into()),
    }
}

fn blanks(obj: &Map<String, JsonValue>) -> std::result::Result<Vec<Vec<String>>, String> {
    let value = obj
        .get("correct_answers_data")
        .or_else(|| obj.get("correct_answers"))
        .or_else(|| obj.get("correct_answer"))
        .ok_or("missing blank answers")?;
    match value {
        JsonValue::String(s) => Ok(vec![vec![s.trim().to_owned()]]),
        JsonValue::Array(entries) => entries
            .iter()
            .map(|entry| match entry {
                JsonValue::String(s) => Ok(vec![s.trim().to_owned()]),
                JsonValue::Array(_) => strings(entry).ok_or_else(|| "blank answers must be strings".to_string()),
                _ => Err("blank answers must be strings".to_string()),
            })
            .collect(),
        _ => Err("blank answers must be a list".into()),
    }
}

fn pairs(obj: &Map<String, JsonValue>) -> std::result::Result<Vec<MatchPair>, String> {
    let value = obj.get("pairs").ok_or("missing pairs")?;
    if let Ok(parsed) = serde_json::from_value::<Vec<MatchPair>>(value.clone()) {
        return Ok(parsed);
    }
    if let Some(entries) = value.as_array() {
        let keyed: Option<Vec<MatchPair>> = entries
            .iter()
            .map(|e| {
                Some(MatchPair {
                    left: e.get("key")?.as_str()?.trim().to_owned(),
                    right: e.get("value")?.as_str()?.trim().to_owned(),
                })
            })
            .collect();
        if let Some(keyed) = keyed {
            return Ok(keyed);
        }
    }
    lines(value)
        .ok_or("pairs must be a list")?
        .iter()
        .map(|line| match line.split_once('|') {
            Some((left, right)) if !right.contains('|') => Ok(MatchPair {
                left: left.trim().to_owned(),
                right: right.trim().to_owned(),
            }),
            _ => Err(format!("pair '{}' is not in left|right form", line)),
        })
        .collect()
}

fn order_items(obj: &Map<String, JsonValue>) -> std::result::Result<Vec<OrderItem>, String> {
    let value = obj.get("items").ok_or("missing items")?;
    if let Ok(parsed) = serde_json::from_value::<Vec<OrderItem>>(value.clone()) {
        return Ok(parsed);
    }
    let texts = strings(value).ok_or("items must be a list")?;
    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| OrderItem {
            id: (i + 1).to_string(),
            text,
        })
        .collect())
}

fn word_data(obj: &Map<String, JsonValue>) -> std::result::Result<WordData, String> {
    match obj.get("word_data") {
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| e.to_string()),
        None => Ok(WordData {
            word: text(obj, &["word", "correct_answer"]).ok_or("missing word")?,
            hint: text(obj, &["word_hint"]),
            category: text(obj, &["category"]),
        }),
    }
}

fn concept_list(value: &JsonValue) -> Vec<String> {
    match value {
        JsonValue::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned)
            .collect(),
        JsonValue::Array(_) => strings(value).unwrap_or_default(),
        _ => Vec::new(),
    }
}
