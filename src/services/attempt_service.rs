use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::{Answer, GradedAnswer};
use crate::models::attempt::{Attempt, AttemptFilter, AttemptStatus, AttemptSummary, NewAttempt};
use crate::models::question::{Difficulty, PublicQuestion};
use crate::models::quiz::{GameFormat, UnderfillWarning};
use crate::repositories::{AttemptRepository, QuizRepository};
use crate::services::assembler_service::AssemblerService;
use crate::services::grading_service::{percentage, GradingService};
use crate::services::normalizer::normalize;
use crate::services::question_bank_service::QuestionBankService;
use crate::services::{PageWindow, Paginated};

#[derive(Debug, Clone, Serialize)]
pub struct StartedAttempt {
    pub attempt_id: Uuid,
    pub quiz_id: Uuid,
    pub status: AttemptStatus,
    pub game_format: GameFormat,
    pub time_limit_minutes: i32,
    pub started_at: DateTime<Utc>,
    pub requested: usize,
    pub delivered: usize,
    pub underfill: Option<UnderfillWarning>,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordedAnswer {
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    /// False when the submission could not be interpreted; it is stored as incorrect.
    pub valid: bool,
    pub is_correct: bool,
    pub points_earned: i32,
    pub questions_answered: i64,
    pub total_questions: usize,
    pub all_answered: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnsweredQuestion {
    pub question: PublicQuestion,
    pub answer: Option<Answer>,
    /// Revealed once the attempt is closed.
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptDetails {
    pub attempt: Attempt,
    pub questions: Vec<AnsweredQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifficultyStatistics {
    pub difficulty: Difficulty,
    pub attempts: usize,
    pub average_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStatistics {
    pub completed_attempts: usize,
    pub average_score: f64,
    pub highest_score: i32,
    pub lowest_score: i32,
    pub by_difficulty: Vec<DifficultyStatistics>,
}

/// Records attempts and their answers, and computes summaries from stored data only.
#[derive(Clone)]
pub struct AttemptService {
    attempts: Arc<dyn AttemptRepository>,
    quizzes: Arc<dyn QuizRepository>,
    bank: QuestionBankService,
    assembler: AssemblerService,
}

impl AttemptService {
    pub fn new(
        attempts: Arc<dyn AttemptRepository>,
        quizzes: Arc<dyn QuizRepository>,
        bank: QuestionBankService,
        assembler: AssemblerService,
    ) -> Self {
        Self {
            attempts,
            quizzes,
            bank,
            assembler,
        }
    }

    pub async fn start_attempt(&self, user_id: Uuid, quiz_id: Uuid) -> Result<StartedAttempt> {
        let quiz = self
            .quizzes
            .find_by_id(quiz_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Quiz {} not found", quiz_id)))?;
        if !quiz.is_active {
            return Err(Error::Conflict(format!("Quiz {} is not active", quiz_id)));
        }

        let resolved = self.assembler.resolve(&quiz).await?;
        let attempt = self
            .attempts
            .create(NewAttempt {
                user_id,
                quiz_id,
                selected_questions: resolved.question_ids(),
                criteria_snapshot: resolved.criteria_snapshot.clone(),
                requested_questions: resolved.requested as i32,
            })
            .await?;

        info!(
            "User {} started attempt {} on quiz {} with {} questions",
            user_id,
            attempt.id,
            quiz_id,
            resolved.questions.len()
        );

        Ok(StartedAttempt {
            attempt_id: attempt.id,
            quiz_id,
            status: attempt.status,
            game_format: quiz.game_format,
            time_limit_minutes: quiz.time_limit_minutes,
            started_at: attempt.started_at,
            requested: resolved.requested,
            delivered: resolved.questions.len(),
            underfill: resolved.underfill,
            questions: resolved.questions.iter().map(|q| q.to_public()).collect(),
        })
    }

    /// Grades and stores one answer, replacing any earlier answer to the same question.
    pub async fn record_answer(
        &self,
        user_id: Uuid,
        attempt_id: Uuid,
        question_id: Uuid,
        raw: JsonValue,
    ) -> Result<RecordedAnswer> {
        let attempt = self.get_attempt(user_id, attempt_id).await?;
        if !attempt.is_open() {
            return Err(Error::Conflict(format!(
                "Attempt {} is {} and accepts no more answers",
                attempt_id, attempt.status
            )));
        }
        if !attempt.contains_question(question_id) {
            return Err(Error::BadRequest(format!(
                "Question {} is not part of attempt {}",
                question_id, attempt_id
            )));
        }

        let question = self.bank.get(question_id).await?;
        let graded = match normalize(&question, &raw) {
            Ok(canonical) => {
                let score = GradingService::score(&question, &canonical);
                GradedAnswer {
                    attempt_id,
                    question_id,
                    user_answer: raw,
                    canonical_answer: Some(canonical.to_raw()),
                    is_correct: score.is_correct,
                    points_earned: score.points_earned,
                }
            }
            Err(e) => {
                warn!(
                    "Invalid answer for question {} in attempt {}: {}",
                    question_id, attempt_id, e
                );
                GradedAnswer {
                    attempt_id,
                    question_id,
                    user_answer: raw,
                    canonical_answer: None,
                    is_correct: false,
                    points_earned: 0,
                }
            }
        };

        let valid = graded.canonical_answer.is_some();
        let stored = self.attempts.upsert_answer(graded).await?.ok_or_else(|| {
            Error::Conflict(format!(
                "Attempt {} was closed before the answer was stored",
                attempt_id
            ))
        })?;
        let questions_answered = self.attempts.count_answers(attempt_id).await?;
        let total_questions = attempt.selected_questions.len();

        Ok(RecordedAnswer {
            attempt_id,
            question_id,
            valid,
            is_correct: stored.is_correct,
            points_earned: stored.points_earned,
            questions_answered,
            total_questions,
            all_answered: questions_answered as usize >= total_questions,
        })
    }

    pub async fn submit_game_results(
        &self,
        user_id: Uuid,
        attempt_id: Uuid,
        results: JsonValue,
    ) -> Result<Attempt> {
        if !results.is_object() {
            return Err(Error::BadRequest(
                "Game results must be a JSON object".to_string(),
            ));
        }
        let attempt = self.get_attempt(user_id, attempt_id).await?;
        if !self.attempts.store_game_results(attempt.id, results).await? {
            return Err(Error::Conflict(format!(
                "Attempt {} is {} and accepts no more results",
                attempt_id, attempt.status
            )));
        }
        self.get_attempt(user_id, attempt_id).await
    }

    /// Closes the attempt. Calling it again returns the stored summary unchanged.
    pub async fn complete_attempt(&self, user_id: Uuid, attempt_id: Uuid) -> Result<AttemptSummary> {
        let attempt = self.get_attempt(user_id, attempt_id).await?;
        match attempt.status {
            AttemptStatus::Completed => return Ok(attempt.summary),
            AttemptStatus::Abandoned => {
                return Err(Error::Conflict(format!(
                    "Attempt {} was abandoned",
                    attempt_id
                )))
            }
            AttemptStatus::InProgress => {}
        }

        let summary = self.summarize(&attempt).await?;
        match self.attempts.complete(attempt_id, summary).await? {
            Some(completed) => {
                info!(
                    "Attempt {} completed: {}/{} correct ({}%)",
                    attempt_id,
                    completed.summary.correct_answers,
                    completed.summary.questions_answered,
                    completed.summary.score_percentage
                );
                Ok(completed.summary)
            }
            // Lost a race with another completion or an abandon.
            None => {
                let current = self.get_attempt(user_id, attempt_id).await?;
                match current.status {
                    AttemptStatus::Completed => Ok(current.summary),
                    _ => Err(Error::Conflict(format!(
                        "Attempt {} is {}",
                        attempt_id, current.status
                    ))),
                }
            }
        }
    }

    pub async fn abandon_attempt(&self, user_id: Uuid, attempt_id: Uuid) -> Result<Attempt> {
        let attempt = self.get_attempt(user_id, attempt_id).await?;
        match self.attempts.abandon(attempt.id).await? {
            Some(abandoned) => {
                info!("Attempt {} abandoned", attempt_id);
                Ok(abandoned)
            }
            None => Err(Error::Conflict(format!(
                "Attempt {} is already {}",
                attempt_id, attempt.status
            ))),
        }
    }

    pub async fn get_attempt(&self, user_id: Uuid, attempt_id: Uuid) -> Result<Attempt> {
        let attempt = self
            .attempts
            .find_by_id(attempt_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Attempt {} not found", attempt_id)))?;
        if attempt.user_id != user_id {
            return Err(Error::Forbidden(
                "Attempt belongs to another user".to_string(),
            ));
        }
        Ok(attempt)
    }

    pub async fn attempt_details(&self, user_id: Uuid, attempt_id: Uuid) -> Result<AttemptDetails> {
        let attempt = self.get_attempt(user_id, attempt_id).await?;
        let (questions, _) = self.bank.load_ordered(&attempt.selected_questions).await?;
        let mut answers: HashMap<Uuid, Answer> = self
            .attempts
            .answers_for(attempt_id)
            .await?
            .into_iter()
            .map(|a| (a.question_id, a))
            .collect();

        let reveal = !attempt.is_open();
        let questions = questions
            .into_iter()
            .map(|q| AnsweredQuestion {
                answer: answers.remove(&q.id),
                explanation: if reveal { q.explanation.clone() } else { None },
                question: q.to_public(),
            })
            .collect();

        Ok(AttemptDetails { attempt, questions })
    }

    pub async fn list_user_attempts(
        &self,
        user_id: Uuid,
        filter: AttemptFilter,
        window: PageWindow,
    ) -> Result<Paginated<Attempt>> {
        let (items, total) = self
            .attempts
            .list_for_user(user_id, filter, window.offset, window.per_page)
            .await?;
        Ok(Paginated::new(items, total, window.page, window.per_page))
    }

    pub async fn user_statistics(&self, user_id: Uuid) -> Result<UserStatistics> {
        let scored = self.attempts.completed_for_user(user_id).await?;
        let scores: Vec<i32> = scored.iter().map(|a| a.score_percentage).collect();

        let mut by_difficulty: BTreeMap<&'static str, (Difficulty, Vec<i32>)> = BTreeMap::new();
        for a in &scored {
            by_difficulty
                .entry(a.difficulty.as_str())
                .or_insert_with(|| (a.difficulty, Vec::new()))
                .1
                .push(a.score_percentage);
        }

        Ok(UserStatistics {
            completed_attempts: scored.len(),
            average_score: average(&scores),
            highest_score: scores.iter().copied().max().unwrap_or(0),
            lowest_score: scores.iter().copied().min().unwrap_or(0),
            by_difficulty: by_difficulty
                .into_values()
                .map(|(difficulty, scores)| DifficultyStatistics {
                    difficulty,
                    attempts: scores.len(),
                    average_score: average(&scores),
                })
                .collect(),
        })
    }

    /// Summary from stored data: game results for game formats, recorded answers otherwise.
    async fn summarize(&self, attempt: &Attempt) -> Result<AttemptSummary> {
        let total = attempt.selected_questions.len() as i32;
        let format = self
            .quizzes
            .find_by_id(attempt.quiz_id)
            .await?
            .map(|q| q.game_format)
            .unwrap_or_default();

        if let (true, Some(results)) = (format.is_game(), &attempt.game_results) {
            let game = GradingService::score_game(format, results, total);
            return Ok(AttemptSummary {
                total_questions: total,
                questions_answered: game.total_answered,
                correct_answers: game.correct_answers,
                score_percentage: game.score_percentage,
            });
        }

        let snapshot: HashSet<Uuid> = attempt.selected_questions.iter().copied().collect();
        let answers = self.attempts.answers_for(attempt.id).await?;
        let counted: Vec<&Answer> = answers
            .iter()
            .filter(|a| snapshot.contains(&a.question_id))
            .collect();
        let answered = counted.len() as i32;
        let correct = counted.iter().filter(|a| a.is_correct).count() as i32;

        Ok(AttemptSummary {
            total_questions: total,
            questions_answered: answered,
            correct_answers: correct,
            score_percentage: percentage(correct, answered),
        })
    }
}

/// Mean rounded to two decimals; 0 for no scores.
fn average(scores: &[i32]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let sum: i64 = scores.iter().map(|s| i64::from(*s)).sum();
    let mean = sum as f64 / scores.len() as f64;
    (mean * 100.0).round() / 100.0
}
