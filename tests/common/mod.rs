#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use quiz_backend::error::Result;
use quiz_backend::models::answer::{Answer, GradedAnswer};
use quiz_backend::models::attempt::{
    Attempt, AttemptFilter, AttemptStatus, AttemptSummary, NewAttempt, ScoredAttempt,
};
use quiz_backend::models::batch::{Batch, BatchStatistics, NewBatch};
use quiz_backend::models::question::{
    ChoiceOption, CriteriaStat, Difficulty, NewQuestion, Question, QuestionDetails, QuestionFilter,
    WordData,
};
use quiz_backend::models::quiz::{NewQuiz, Quiz, SelectionCriteria};
use quiz_backend::repositories::{
    AttemptRepository, BatchRepository, Candidate, QuestionRepository, QuizRepository,
    Repositories,
};
use quiz_backend::AppState;

pub const JWT_SECRET: &str = "test_secret_key";
pub const MAX_QUIZ_QUESTIONS: usize = 50;

#[derive(Default)]
struct Tables {
    questions: Vec<Question>,
    quizzes: Vec<Quiz>,
    attempts: Vec<Attempt>,
    answers: Vec<Answer>,
    batches: Vec<Batch>,
    batch_users: HashMap<(Uuid, Uuid), bool>,
    batch_questions: HashSet<(Uuid, Uuid)>,
    batch_quizzes: HashSet<(Uuid, Uuid)>,
}

/// In-process stand-in for PostgreSQL implementing every repository trait.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            questions: Arc::new(self.clone()),
            quizzes: Arc::new(self.clone()),
            attempts: Arc::new(self.clone()),
            batches: Arc::new(self.clone()),
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState::from_repositories(self.repositories(), MAX_QUIZ_QUESTIONS, JWT_SECRET)
    }

    pub fn attempt(&self, attempt_id: Uuid) -> Attempt {
        let tables = self.tables.lock().unwrap();
        tables
            .attempts
            .iter()
            .find(|a| a.id == attempt_id)
            .cloned()
            .expect("attempt exists")
    }

    pub fn answer_count(&self, attempt_id: Uuid) -> usize {
        let tables = self.tables.lock().unwrap();
        tables
            .answers
            .iter()
            .filter(|a| a.attempt_id == attempt_id)
            .count()
    }
}

fn page<T: Clone>(rows: Vec<T>, offset: i64, limit: i64) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    let items = rows
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect();
    (items, total)
}

fn matches_criteria(tables: &Tables, q: &Question, criteria: &SelectionCriteria) -> bool {
    q.weightage > 0
        && criteria.domain.as_ref().map_or(true, |d| &q.domain == d)
        && criteria.subject.as_ref().map_or(true, |s| &q.subject == s)
        && criteria.source.as_ref().map_or(true, |s| &q.source == s)
        && criteria.difficulty.map_or(true, |d| q.difficulty == d)
        && (criteria.concepts.is_empty()
            || criteria.concepts.iter().any(|c| q.concepts.contains(c)))
        && criteria
            .batch_id
            .map_or(true, |b| tables.batch_questions.contains(&(b, q.id)))
}

#[async_trait]
impl QuestionRepository for MemoryStore {
    async fn create(&self, question: NewQuestion) -> Result<Question> {
        let now = Utc::now();
        let created = Question {
            id: Uuid::new_v4(),
            question_text: question.question_text,
            code_snippet: question.code_snippet,
            explanation: question.explanation,
            hint: question.hint,
            details: question.details,
            difficulty: question.difficulty,
            concepts: question.concepts,
            domain: question.domain,
            subject: question.subject,
            source: question.source,
            weightage: question.weightage,
            quiz_id: question.quiz_id,
            created_by: question.created_by,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.tables.lock().unwrap().questions.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Question>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Question>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .questions
            .iter()
            .filter(|q| ids.contains(&q.id))
            .cloned()
            .collect())
    }

    async fn update(&self, question: Question) -> Result<Question> {
        let mut tables = self.tables.lock().unwrap();
        let slot = tables
            .questions
            .iter_mut()
            .find(|q| q.id == question.id)
            .ok_or_else(|| quiz_backend::error::Error::NotFound("question".into()))?;
        *slot = Question {
            updated_at: Some(Utc::now()),
            ..question
        };
        Ok(slot.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.questions.len();
        tables.questions.retain(|q| q.id != id);
        Ok(tables.questions.len() != before)
    }

    async fn list(
        &self,
        filter: QuestionFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Question>, i64)> {
        let tables = self.tables.lock().unwrap();
        let search = filter.search.as_ref().map(|s| s.to_lowercase());
        let rows: Vec<Question> = tables
            .questions
            .iter()
            .filter(|q| filter.question_type.map_or(true, |t| q.question_type() == t))
            .filter(|q| filter.domain.as_ref().map_or(true, |d| &q.domain == d))
            .filter(|q| filter.subject.as_ref().map_or(true, |s| &q.subject == s))
            .filter(|q| filter.source.as_ref().map_or(true, |s| &q.source == s))
            .filter(|q| filter.difficulty.map_or(true, |d| q.difficulty == d))
            .filter(|q| filter.created_by.map_or(true, |c| q.created_by == Some(c)))
            .filter(|q| {
                search
                    .as_ref()
                    .map_or(true, |s| q.question_text.to_lowercase().contains(s))
            })
            .cloned()
            .collect();
        Ok(page(rows, offset, limit))
    }

    async fn candidates(&self, criteria: &SelectionCriteria) -> Result<Vec<Candidate>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .questions
            .iter()
            .filter(|q| matches_criteria(&tables, q, criteria))
            .map(|q| Candidate {
                id: q.id,
                weight: q.weightage,
            })
            .collect())
    }

    async fn criteria_stats(&self) -> Result<Vec<CriteriaStat>> {
        let tables = self.tables.lock().unwrap();
        let mut counts: HashMap<(String, String, String, Difficulty), i64> = HashMap::new();
        for q in tables.questions.iter().filter(|q| q.weightage > 0) {
            *counts
                .entry((q.domain.clone(), q.subject.clone(), q.source.clone(), q.difficulty))
                .or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|((domain, subject, source, difficulty), question_count)| CriteriaStat {
                domain,
                subject,
                source,
                difficulty,
                question_count,
            })
            .collect())
    }

    async fn has_answers(&self, id: Uuid) -> Result<bool> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.answers.iter().any(|a| a.question_id == id))
    }
}

#[async_trait]
impl QuizRepository for MemoryStore {
    async fn create(&self, quiz: NewQuiz) -> Result<Quiz> {
        let now = Utc::now();
        let created = Quiz {
            id: Uuid::new_v4(),
            title: quiz.title,
            description: quiz.description,
            difficulty: quiz.difficulty,
            time_limit_minutes: quiz.time_limit_minutes,
            source: quiz.source,
            game_format: quiz.game_format,
            game_options: quiz.game_options,
            is_active: true,
            created_by: quiz.created_by,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.tables.lock().unwrap().quizzes.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Quiz>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.quizzes.iter().find(|q| q.id == id).cloned())
    }

    async fn list(&self, active_only: bool, offset: i64, limit: i64) -> Result<(Vec<Quiz>, i64)> {
        let tables = self.tables.lock().unwrap();
        let rows: Vec<Quiz> = tables
            .quizzes
            .iter()
            .filter(|q| !active_only || q.is_active)
            .cloned()
            .collect();
        Ok(page(rows, offset, limit))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.quizzes.len();
        tables.quizzes.retain(|q| q.id != id);
        Ok(tables.quizzes.len() != before)
    }
}

#[async_trait]
impl AttemptRepository for MemoryStore {
    async fn create(&self, attempt: NewAttempt) -> Result<Attempt> {
        let created = Attempt {
            id: Uuid::new_v4(),
            user_id: attempt.user_id,
            quiz_id: attempt.quiz_id,
            status: AttemptStatus::InProgress,
            summary: AttemptSummary {
                total_questions: attempt.selected_questions.len() as i32,
                ..Default::default()
            },
            selected_questions: attempt.selected_questions,
            criteria_snapshot: attempt.criteria_snapshot,
            requested_questions: attempt.requested_questions,
            game_results: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        self.tables.lock().unwrap().attempts.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Attempt>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.attempts.iter().find(|a| a.id == id).cloned())
    }

    async fn upsert_answer(&self, answer: GradedAnswer) -> Result<Option<Answer>> {
        let mut tables = self.tables.lock().unwrap();
        let open = tables
            .attempts
            .iter()
            .any(|a| a.id == answer.attempt_id && a.status == AttemptStatus::InProgress);
        if !open {
            return Ok(None);
        }
        let existing = tables
            .answers
            .iter_mut()
            .find(|a| a.attempt_id == answer.attempt_id && a.question_id == answer.question_id);
        let stored = match existing {
            Some(slot) => {
                slot.user_answer = answer.user_answer;
                slot.canonical_answer = answer.canonical_answer;
                slot.is_correct = answer.is_correct;
                slot.points_earned = answer.points_earned;
                slot.answered_at = Utc::now();
                slot.clone()
            }
            None => {
                let created = Answer {
                    id: Uuid::new_v4(),
                    attempt_id: answer.attempt_id,
                    question_id: answer.question_id,
                    user_answer: answer.user_answer,
                    canonical_answer: answer.canonical_answer,
                    is_correct: answer.is_correct,
                    points_earned: answer.points_earned,
                    answered_at: Utc::now(),
                };
                tables.answers.push(created.clone());
                created
            }
        };
        Ok(Some(stored))
    }

    async fn answers_for(&self, attempt_id: Uuid) -> Result<Vec<Answer>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .answers
            .iter()
            .filter(|a| a.attempt_id == attempt_id)
            .cloned()
            .collect())
    }

    async fn count_answers(&self, attempt_id: Uuid) -> Result<i64> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .answers
            .iter()
            .filter(|a| a.attempt_id == attempt_id)
            .count() as i64)
    }

    async fn store_game_results(&self, attempt_id: Uuid, results: JsonValue) -> Result<bool> {
        let mut tables = self.tables.lock().unwrap();
        match tables
            .attempts
            .iter_mut()
            .find(|a| a.id == attempt_id && a.status == AttemptStatus::InProgress)
        {
            Some(attempt) => {
                attempt.game_results = Some(results);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn complete(&self, attempt_id: Uuid, summary: AttemptSummary) -> Result<Option<Attempt>> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables
            .attempts
            .iter_mut()
            .find(|a| a.id == attempt_id && a.status == AttemptStatus::InProgress)
            .map(|attempt| {
                attempt.status = AttemptStatus::Completed;
                attempt.summary = summary;
                attempt.completed_at = Some(Utc::now());
                attempt.clone()
            }))
    }

    async fn abandon(&self, attempt_id: Uuid) -> Result<Option<Attempt>> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables
            .attempts
            .iter_mut()
            .find(|a| a.id == attempt_id && a.status == AttemptStatus::InProgress)
            .map(|attempt| {
                attempt.status = AttemptStatus::Abandoned;
                attempt.completed_at = Some(Utc::now());
                attempt.clone()
            }))
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: AttemptFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Attempt>, i64)> {
        let tables = self.tables.lock().unwrap();
        let rows: Vec<Attempt> = tables
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id)
            .filter(|a| filter.quiz_id.map_or(true, |q| a.quiz_id == q))
            .filter(|a| filter.status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        Ok(page(rows, offset, limit))
    }

    async fn completed_for_user(&self, user_id: Uuid) -> Result<Vec<ScoredAttempt>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id && a.status == AttemptStatus::Completed)
            .filter_map(|a| {
                let quiz = tables.quizzes.iter().find(|q| q.id == a.quiz_id)?;
                Some(ScoredAttempt {
                    attempt_id: a.id,
                    quiz_id: a.quiz_id,
                    difficulty: quiz.difficulty,
                    score_percentage: a.summary.score_percentage,
                    completed_at: a.completed_at,
                })
            })
            .collect())
    }
}

#[async_trait]
impl BatchRepository for MemoryStore {
    async fn create(&self, batch: NewBatch) -> Result<Batch> {
        let now = Utc::now();
        let created = Batch {
            id: Uuid::new_v4(),
            name: batch.name,
            description: batch.description,
            subject: batch.subject,
            domain: batch.domain,
            is_active: true,
            quiz_criteria: batch.quiz_criteria,
            created_by: batch.created_by,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.tables.lock().unwrap().batches.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Batch>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.batches.iter().find(|b| b.id == id).cloned())
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<(Vec<Batch>, i64)> {
        let tables = self.tables.lock().unwrap();
        Ok(page(tables.batches.clone(), offset, limit))
    }

    async fn add_user(&self, batch_id: Uuid, user_id: Uuid) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        tables.batch_users.insert((batch_id, user_id), true);
        Ok(())
    }

    async fn remove_user(&self, batch_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock().unwrap();
        match tables.batch_users.get_mut(&(batch_id, user_id)) {
            Some(active) if *active => {
                *active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn add_question(&self, batch_id: Uuid, question_id: Uuid) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        tables.batch_questions.insert((batch_id, question_id));
        Ok(())
    }

    async fn remove_question(&self, batch_id: Uuid, question_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables.batch_questions.remove(&(batch_id, question_id)))
    }

    async fn link_quiz(&self, batch_id: Uuid, quiz_id: Uuid) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        tables.batch_quizzes.insert((batch_id, quiz_id));
        Ok(())
    }

    async fn statistics(&self, batch_id: Uuid) -> Result<BatchStatistics> {
        let tables = self.tables.lock().unwrap();
        Ok(BatchStatistics {
            active_users: tables
                .batch_users
                .iter()
                .filter(|((b, _), active)| *b == batch_id && **active)
                .count() as i64,
            questions: tables
                .batch_questions
                .iter()
                .filter(|(b, _)| *b == batch_id)
                .count() as i64,
            quizzes: tables
                .batch_quizzes
                .iter()
                .filter(|(b, _)| *b == batch_id)
                .count() as i64,
        })
    }
}

pub fn new_question(text: &str, details: QuestionDetails) -> NewQuestion {
    NewQuestion {
        question_text: text.to_string(),
        code_snippet: None,
        explanation: Some(format!("Explanation for {}", text)),
        hint: None,
        details,
        difficulty: Difficulty::Medium,
        concepts: vec!["iterators".to_string()],
        domain: "Programming".to_string(),
        subject: "Rust".to_string(),
        source: "Custom".to_string(),
        weightage: 1,
        quiz_id: None,
        created_by: None,
    }
}

pub fn multiple_choice(correct: &str) -> QuestionDetails {
    QuestionDetails::MultipleChoice {
        options: ["A", "B", "C", "D"]
            .iter()
            .map(|k| ChoiceOption {
                key: k.to_string(),
                value: format!("option {}", k),
            })
            .collect(),
        correct_answer: correct.to_string(),
    }
}

pub fn hangman(word: &str) -> QuestionDetails {
    QuestionDetails::Hangman {
        word_data: WordData {
            word: word.to_string(),
            hint: Some("keyword".to_string()),
            category: None,
        },
        max_attempts: 6,
    }
}

pub fn fill_blank(answers: &[&[&str]]) -> QuestionDetails {
    QuestionDetails::FillBlank {
        correct_answers: answers
            .iter()
            .map(|blank| blank.iter().map(|a| a.to_string()).collect())
            .collect(),
    }
}

pub async fn seed(store: &MemoryStore, question: NewQuestion) -> Question {
    QuestionRepository::create(store, question)
        .await
        .expect("seed question")
}

pub fn game_results(correct_words: i64, total_words: i64) -> JsonValue {
    json!({ "correctWords": correct_words, "totalWords": total_words })
}
