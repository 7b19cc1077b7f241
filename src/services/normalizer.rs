//! Maps raw answer submissions onto a canonical, comparable form per question type.
//!
//! Normalization is pure and idempotent: feeding `to_raw()` of a canonical
//! answer back through [`normalize`] yields the same canonical answer.

use std::collections::BTreeMap;

use serde_json::{json, Value as JsonValue};

use crate::models::question::{ChoiceOption, Question, QuestionDetails, QuestionType};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidAnswerError {
    #[error("expected {expected} for a {question_type} question")]
    Shape {
        question_type: QuestionType,
        expected: &'static str,
    },
    #[error("'{0}' is not one of the option labels")]
    UnknownOption(String),
    #[error("expected {expected} blanks, got {actual}")]
    BlankCount { expected: usize, actual: usize },
    #[error("unknown item '{0}'")]
    UnknownItem(String),
    #[error("item '{0}' is answered more than once")]
    DuplicateItem(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalAnswer {
    /// Upper-cased option label.
    Choice(String),
    /// One normalized string per blank.
    Blanks(Vec<String>),
    Boolean(bool),
    /// Left id to right id, ordered by left id.
    Pairs(BTreeMap<String, String>),
    Sequence(Vec<String>),
    /// Game result object, passed through untouched.
    Game(JsonValue),
}

impl CanonicalAnswer {
    pub fn to_raw(&self) -> JsonValue {
        match self {
            CanonicalAnswer::Choice(label) => json!(label),
            CanonicalAnswer::Blanks(blanks) => json!(blanks),
            CanonicalAnswer::Boolean(b) => json!(b),
            CanonicalAnswer::Pairs(pairs) => json!(pairs),
            CanonicalAnswer::Sequence(ids) => json!(ids),
            CanonicalAnswer::Game(value) => value.clone(),
        }
    }
}

pub fn normalize(question: &Question, raw: &JsonValue) -> Result<CanonicalAnswer, InvalidAnswerError> {
    let question_type = question.question_type();
    let shape = |expected| InvalidAnswerError::Shape {
        question_type,
        expected,
    };

    match &question.details {
        QuestionDetails::MultipleChoice { options, .. } => {
            choice(options, raw).map(CanonicalAnswer::Choice)
        }
        QuestionDetails::KnowledgeTower { options, .. } => match raw {
            JsonValue::Object(_) => Ok(CanonicalAnswer::Game(raw.clone())),
            _ => choice(options, raw).map(CanonicalAnswer::Choice),
        },
        QuestionDetails::FillBlank { correct_answers } => {
            let expected = correct_answers.len();
            let blanks: Vec<String> = match raw {
                JsonValue::String(s) => vec![s.clone()],
                JsonValue::Array(values) => values
                    .iter()
                    .map(|v| v.as_str().map(str::to_owned))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| shape("an array of strings"))?,
                JsonValue::Object(map) => {
                    let mut by_index = BTreeMap::new();
                    for (key, value) in map {
                        let index: usize = key
                            .trim()
                            .parse()
                            .map_err(|_| InvalidAnswerError::UnknownItem(key.clone()))?;
                        let text = value.as_str().ok_or_else(|| shape("string blank values"))?;
                        by_index.insert(index, text.to_owned());
                    }
                    if by_index.keys().copied().ne(0..by_index.len()) {
                        return Err(shape("blank indexes numbered from 0"));
                    }
                    by_index.into_values().collect()
                }
                _ => return Err(shape("a string, array or object of blanks")),
            };
            if blanks.len() != expected {
                return Err(InvalidAnswerError::BlankCount {
                    expected,
                    actual: blanks.len(),
                });
            }
            Ok(CanonicalAnswer::Blanks(
                blanks.iter().map(|b| normalize_text(b)).collect(),
            ))
        }
        QuestionDetails::TrueFalse { .. } => match raw {
            JsonValue::Bool(b) => Ok(CanonicalAnswer::Boolean(*b)),
            JsonValue::String(s) if s.trim().eq_ignore_ascii_case("true") => {
                Ok(CanonicalAnswer::Boolean(true))
            }
            JsonValue::String(s) if s.trim().eq_ignore_ascii_case("false") => {
                Ok(CanonicalAnswer::Boolean(false))
            }
            _ => Err(shape("true or false")),
        },
        QuestionDetails::Matching { pairs } => {
            let mut answered = BTreeMap::new();
            let mut insert = |left: &str, right: &JsonValue| -> Result<(), InvalidAnswerError> {
                let right = right.as_str().ok_or_else(|| shape("string match targets"))?;
                if !pairs.iter().any(|p| p.left == left) {
                    return Err(InvalidAnswerError::UnknownItem(left.to_owned()));
                }
                if answered.insert(left.to_owned(), right.to_owned()).is_some() {
                    return Err(InvalidAnswerError::DuplicateItem(left.to_owned()));
                }
                Ok(())
            };
            match raw {
                JsonValue::Object(map) => {
                    for (left, right) in map {
                        insert(left, right)?;
                    }
                }
                JsonValue::Array(entries) => {
                    for entry in entries {
                        let left = entry
                            .get("left")
                            .and_then(JsonValue::as_str)
                            .ok_or_else(|| shape("{left, right} entries"))?;
                        let right = entry.get("right").unwrap_or(&JsonValue::Null);
                        insert(left, right)?;
                    }
                }
                _ => return Err(shape("an object of left to right items")),
            }
            Ok(CanonicalAnswer::Pairs(answered))
        }
        QuestionDetails::DragDropOrder { .. } => raw
            .as_array()
            .and_then(|values| {
                values
                    .iter()
                    .map(|v| v.as_str().map(str::to_owned))
                    .collect::<Option<Vec<_>>>()
            })
            .map(CanonicalAnswer::Sequence)
            .ok_or_else(|| shape("an array of item ids")),
        QuestionDetails::Hangman { .. }
        | QuestionDetails::WordLadder { .. }
        | QuestionDetails::MemoryGrid { .. } => match raw {
            JsonValue::Object(_) => Ok(CanonicalAnswer::Game(raw.clone())),
            _ => Err(shape("a game result object")),
        },
    }
}

/// Resolves an option label (`"b"`, `" B "`, `"B) text"`) or zero-based index.
fn choice(options: &[ChoiceOption], raw: &JsonValue) -> Result<String, InvalidAnswerError> {
    let label = match raw {
        JsonValue::String(s) => extract_label(s),
        JsonValue::Number(n) => {
            let index = n
                .as_u64()
                .ok_or_else(|| InvalidAnswerError::UnknownOption(n.to_string()))?;
            let option = options
                .get(index as usize)
                .ok_or_else(|| InvalidAnswerError::UnknownOption(n.to_string()))?;
            option.key.trim().to_ascii_uppercase()
        }
        _ => {
            return Err(InvalidAnswerError::UnknownOption(raw.to_string()));
        }
    };

    if options
        .iter()
        .any(|o| o.key.trim().eq_ignore_ascii_case(&label))
    {
        Ok(label)
    } else {
        Err(InvalidAnswerError::UnknownOption(label))
    }
}

fn extract_label(raw: &str) -> String {
    let trimmed = raw.trim();
    let label = match trimmed.split_once(')') {
        Some((head, _)) if !head.trim().is_empty() && !head.contains(char::is_whitespace) => {
            head.trim()
        }
        _ => trimmed,
    };
    label.to_ascii_uppercase()
}

/// Lower-cased, trimmed, internal whitespace collapsed.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Difficulty, MatchPair, OrderItem, WordData};
    use tokio_test::{assert_err, assert_ok};
    use uuid::Uuid;

    fn question(details: QuestionDetails) -> Question {
        Question {
            id: Uuid::new_v4(),
            question_text: "q".into(),
            code_snippet: None,
            explanation: None,
            hint: None,
            details,
            difficulty: Difficulty::Medium,
            concepts: vec![],
            domain: "General".into(),
            subject: "General".into(),
            source: "Custom".into(),
            weightage: 1,
            quiz_id: None,
            created_by: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn mcq() -> Question {
        question(QuestionDetails::MultipleChoice {
            options: ["A", "B", "C", "D"]
                .iter()
                .map(|k| ChoiceOption {
                    key: k.to_string(),
                    value: format!("option {}", k),
                })
                .collect(),
            correct_answer: "B".into(),
        })
    }

    #[test]
    fn choice_labels_normalize_to_the_same_key() {
        let q = mcq();
        for raw in [json!("b"), json!(" B "), json!("B) option B"), json!(1)] {
            assert_eq!(
                normalize(&q, &raw).unwrap(),
                CanonicalAnswer::Choice("B".into()),
                "raw {}",
                raw
            );
        }
    }

    #[test]
    fn unknown_choice_label_is_rejected() {
        let q = mcq();
        assert_eq!(
            normalize(&q, &json!("E")),
            Err(InvalidAnswerError::UnknownOption("E".into()))
        );
        assert_err!(normalize(&q, &json!(7)));
        assert_err!(normalize(&q, &json!(null)));
    }

    #[test]
    fn fill_blank_accepts_string_array_and_object() {
        let q = question(QuestionDetails::FillBlank {
            correct_answers: vec![vec!["filter".into()], vec!["map".into()]],
        });
        let expected = CanonicalAnswer::Blanks(vec!["filter".into(), "map".into()]);
        assert_eq!(normalize(&q, &json!([" Filter ", "MAP"])).unwrap(), expected);
        assert_eq!(
            normalize(&q, &json!({"1": "map", "0": "filter"})).unwrap(),
            expected
        );
        assert_eq!(
            normalize(&q, &json!("filter")),
            Err(InvalidAnswerError::BlankCount {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn blank_text_collapses_whitespace() {
        assert_eq!(normalize_text("  Hello   World \n"), "hello world");
    }

    #[test]
    fn true_false_rejects_other_strings() {
        let q = question(QuestionDetails::TrueFalse {
            correct_answer: true,
        });
        assert_eq!(
            normalize(&q, &json!("TRUE")).unwrap(),
            CanonicalAnswer::Boolean(true)
        );
        assert_err!(normalize(&q, &json!("yes")));
        assert!(normalize(&q, &json!(1)).is_err());
    }

    #[test]
    fn matching_rejects_unknown_left_ids() {
        let q = question(QuestionDetails::Matching {
            pairs: vec![
                MatchPair { left: "1".into(), right: "a".into() },
                MatchPair { left: "2".into(), right: "b".into() },
            ],
        });
        assert_ok!(normalize(&q, &json!({"1": "a", "2": "b"})));
        assert_eq!(
            normalize(&q, &json!({"9": "a"})),
            Err(InvalidAnswerError::UnknownItem("9".into()))
        );
        assert!(normalize(&q, &json!({"1": 4})).is_err());
    }

    #[test]
    fn normalization_is_idempotent() {
        let order = question(QuestionDetails::DragDropOrder {
            items: vec![
                OrderItem { id: "a".into(), text: "lex".into() },
                OrderItem { id: "b".into(), text: "parse".into() },
            ],
            correct_order: vec!["a".into(), "b".into()],
        });
        let hangman = question(QuestionDetails::Hangman {
            word_data: WordData { word: "trait".into(), hint: None, category: None },
            max_attempts: 6,
        });
        let matching = question(QuestionDetails::Matching {
            pairs: vec![MatchPair { left: "x".into(), right: "y".into() }],
        });
        let blanks = question(QuestionDetails::FillBlank {
            correct_answers: vec![vec!["filter".into()], vec!["map".into()]],
        });
        let single_blank = question(QuestionDetails::FillBlank {
            correct_answers: vec![vec!["borrow".into()]],
        });
        let true_false = question(QuestionDetails::TrueFalse { correct_answer: false });
        let tower = question(QuestionDetails::KnowledgeTower {
            level_number: 2,
            options: vec![
                ChoiceOption { key: "A".into(), value: "Box".into() },
                ChoiceOption { key: "B".into(), value: "Rc".into() },
            ],
            correct_answer: "B".into(),
        });
        let ladder = question(QuestionDetails::WordLadder {
            word_data: WordData { word: "cold".into(), hint: None, category: None },
            ladder_steps: vec!["cord".into(), "card".into(), "ward".into(), "warm".into()],
        });
        let grid = question(QuestionDetails::MemoryGrid {
            pattern_data: json!({"pattern": [[1, 0], [0, 1]], "size": 2}),
        });
        let cases = [
            (mcq(), json!("c) option C")),
            (order, json!(["b", "a"])),
            (hangman, json!({"word": "TRAIT", "guesses": 4})),
            (matching, json!([{"left": "x", "right": "y"}])),
            (blanks.clone(), json!({"1": "  MAP ", "0": "Filter"})),
            (single_blank, json!("  Borrow   Checker ")),
            (true_false, json!(" FALSE ")),
            (tower.clone(), json!("b) Rc")),
            (tower, json!({"answer": "B", "level": 2})),
            (ladder, json!({"word": "warm", "steps": 4})),
            (grid, json!({"pattern": [[1, 0], [0, 1]]})),
        ];
        for (q, raw) in cases {
            let once = normalize(&q, &raw).unwrap();
            let twice = normalize(&q, &once.to_raw()).unwrap();
            assert_eq!(once, twice);
        }
    }
}
