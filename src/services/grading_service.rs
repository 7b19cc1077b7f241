use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::question::{Question, QuestionDetails};
use crate::models::quiz::GameFormat;
use crate::services::normalizer::{normalize_text, CanonicalAnswer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionScore {
    pub is_correct: bool,
    pub points_earned: i32,
}

impl QuestionScore {
    fn from_correct(is_correct: bool) -> Self {
        Self {
            is_correct,
            points_earned: if is_correct { 1 } else { 0 },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameScore {
    pub correct_answers: i32,
    pub total_answered: i32,
    pub score_percentage: i32,
    pub total_questions: i32,
}

pub struct GradingService;

impl GradingService {
    /// Compares a normalized answer with the question's answer key.
    pub fn score(question: &Question, answer: &CanonicalAnswer) -> QuestionScore {
        let is_correct = match (&question.details, answer) {
            (QuestionDetails::MultipleChoice { correct_answer, .. }, CanonicalAnswer::Choice(label))
            | (QuestionDetails::KnowledgeTower { correct_answer, .. }, CanonicalAnswer::Choice(label)) => {
                correct_answer.trim().eq_ignore_ascii_case(label)
            }
            (QuestionDetails::TrueFalse { correct_answer }, CanonicalAnswer::Boolean(b)) => {
                correct_answer == b
            }
            (QuestionDetails::FillBlank { correct_answers }, CanonicalAnswer::Blanks(blanks)) => {
                blanks.len() == correct_answers.len()
                    && blanks.iter().zip(correct_answers).all(|(given, accepted)| {
                        accepted.iter().any(|a| normalize_text(a) == *given)
                    })
            }
            (QuestionDetails::Matching { pairs }, CanonicalAnswer::Pairs(given)) => {
                given.len() == pairs.len()
                    && pairs
                        .iter()
                        .all(|p| given.get(&p.left).map(String::as_str) == Some(p.right.as_str()))
            }
            (QuestionDetails::DragDropOrder { correct_order, .. }, CanonicalAnswer::Sequence(given)) => {
                given == correct_order
            }
            (QuestionDetails::Hangman { word_data, .. }, CanonicalAnswer::Game(result))
            | (QuestionDetails::WordLadder { word_data, .. }, CanonicalAnswer::Game(result)) => {
                reported_text(result, &["word", "answer"])
                    .map(|w| w.trim().eq_ignore_ascii_case(word_data.word.trim()))
                    .unwrap_or(false)
            }
            (QuestionDetails::KnowledgeTower { correct_answer, .. }, CanonicalAnswer::Game(result)) => {
                reported_text(result, &["answer"])
                    .map(|a| {
                        let label = a.trim().split(')').next().unwrap_or_default().trim();
                        label.eq_ignore_ascii_case(correct_answer.trim())
                    })
                    .unwrap_or(false)
            }
            (QuestionDetails::MemoryGrid { pattern_data }, CanonicalAnswer::Game(result)) => {
                match (pattern_data.get("pattern"), result.get("pattern")) {
                    (Some(expected), Some(given)) => expected == given,
                    _ => false,
                }
            }
            _ => false,
        };
        QuestionScore::from_correct(is_correct)
    }

    /// Derives an attempt summary from client-reported game results.
    ///
    /// Never fails: missing, negative or non-numeric fields fall back to
    /// the quiz's own question count.
    pub fn score_game(format: GameFormat, results: &JsonValue, total_questions: i32) -> GameScore {
        let total_questions = total_questions.max(0);
        let (correct, answered) = match format {
            GameFormat::Hangman => (
                reported_count(results, "correctWords").unwrap_or(0),
                first_positive(results, &["totalWordsCompleted", "totalWords"])
                    .unwrap_or(total_questions),
            ),
            GameFormat::KnowledgeTower => (
                reported_count(results, "correctAnswers").unwrap_or(0),
                first_positive(results, &["totalQuestions", "totalLevels"])
                    .unwrap_or(total_questions),
            ),
            GameFormat::Traditional | GameFormat::WordLadder | GameFormat::MemoryGrid => {
                let correct = match reported_number(results, "score") {
                    Some(score) => round_half_up(score / 100.0 * f64::from(total_questions)),
                    None => total_questions,
                };
                (correct, total_questions)
            }
        };

        let correct = correct.clamp(0, answered.max(0));
        GameScore {
            correct_answers: correct,
            total_answered: answered,
            score_percentage: percentage(correct, answered),
            total_questions,
        }
    }
}

/// round(100 × correct / answered), halves rounded up; 0 when nothing was answered.
pub fn percentage(correct: i32, answered: i32) -> i32 {
    if answered <= 0 {
        return 0;
    }
    let (c, a) = (i64::from(correct), i64::from(answered));
    ((200 * c + a) / (2 * a)) as i32
}

fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

fn reported_number(results: &JsonValue, key: &str) -> Option<f64> {
    let value = results.get(key)?;
    let number = match value {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (number.is_finite() && number >= 0.0).then_some(number)
}

fn reported_count(results: &JsonValue, key: &str) -> Option<i32> {
    reported_number(results, key).map(|n| n.min(f64::from(i32::MAX)).round() as i32)
}

fn first_positive(results: &JsonValue, keys: &[&str]) -> Option<i32> {
    keys.iter()
        .filter_map(|k| reported_count(results, k))
        .find(|n| *n > 0)
}

fn reported_text<'a>(results: &'a JsonValue, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| results.get(*k).and_then(JsonValue::as_str))
}
