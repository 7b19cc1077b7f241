use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::quiz::{NewQuiz, Quiz, QuizSource};
use crate::repositories::QuizRepository;
use crate::services::question_bank_service::QuestionBankService;
use crate::services::selector_service::SelectorService;
use crate::services::{PageWindow, Paginated};

#[derive(Clone)]
pub struct QuizService {
    quizzes: Arc<dyn QuizRepository>,
    bank: QuestionBankService,
    selector: SelectorService,
}

impl QuizService {
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        bank: QuestionBankService,
        selector: SelectorService,
    ) -> Self {
        Self {
            quizzes,
            bank,
            selector,
        }
    }

    pub async fn create(&self, quiz: NewQuiz) -> Result<Quiz> {
        if quiz.title.trim().is_empty() {
            return Err(Error::BadRequest("Quiz title must not be empty".to_string()));
        }
        if quiz.time_limit_minutes < 1 {
            return Err(Error::BadRequest(
                "Time limit must be at least 1 minute".to_string(),
            ));
        }

        match &quiz.source {
            QuizSource::Fixed { question_ids } => {
                self.check_fixed(question_ids, &quiz).await?;
            }
            QuizSource::Criteria { criteria } => {
                self.selector.check_count(criteria.count)?;
            }
        }

        let created = self.quizzes.create(quiz).await?;
        info!(
            "Created {} quiz {} '{}' ({})",
            if created.source.is_criteria_based() {
                "criteria based"
            } else {
                "fixed"
            },
            created.id,
            created.title,
            created.game_format
        );
        Ok(created)
    }

    async fn check_fixed(&self, question_ids: &[Uuid], quiz: &NewQuiz) -> Result<()> {
        if question_ids.is_empty() {
            return Err(Error::BadRequest(
                "A fixed quiz needs at least one question".to_string(),
            ));
        }
        if question_ids.len() > self.selector.max_questions() {
            return Err(Error::BadRequest(format!(
                "A quiz may hold at most {} questions",
                self.selector.max_questions()
            )));
        }
        let unique: HashSet<&Uuid> = question_ids.iter().collect();
        if unique.len() != question_ids.len() {
            return Err(Error::BadRequest(
                "A question may appear only once in a quiz".to_string(),
            ));
        }

        let (questions, missing) = self.bank.load_ordered(question_ids).await?;
        if !missing.is_empty() {
            return Err(Error::BadRequest(format!(
                "Unknown questions: {:?}",
                missing
            )));
        }
        if let Some(q) = questions
            .iter()
            .find(|q| !quiz.game_format.accepts(q.question_type()))
        {
            return Err(Error::FormatMismatch {
                question_id: q.id,
                question_type: q.question_type(),
                game_format: quiz.game_format,
            });
        }
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Quiz> {
        self.quizzes
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Quiz {} not found", id)))
    }

    pub async fn list(&self, active_only: bool, window: PageWindow) -> Result<Paginated<Quiz>> {
        let (items, total) = self
            .quizzes
            .list(active_only, window.offset, window.per_page)
            .await?;
        Ok(Paginated::new(items, total, window.page, window.per_page))
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.quizzes.delete(id).await? {
            return Err(Error::NotFound(format!("Quiz {} not found", id)));
        }
        info!("Deleted quiz {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Difficulty;
    use crate::models::quiz::{GameFormat, SelectionCriteria};
    use crate::repositories::question_repository::MockQuestionRepository;
    use crate::repositories::quiz_repository::MockQuizRepository;

    fn service(quizzes: MockQuizRepository, questions: MockQuestionRepository) -> QuizService {
        let questions = Arc::new(questions);
        QuizService::new(
            Arc::new(quizzes),
            QuestionBankService::new(questions.clone()),
            SelectorService::new(questions, 20),
        )
    }

    fn new_quiz(source: QuizSource) -> NewQuiz {
        NewQuiz {
            title: "Traits".into(),
            description: None,
            difficulty: Difficulty::Hard,
            time_limit_minutes: 15,
            source,
            game_format: GameFormat::Traditional,
            game_options: None,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn duplicate_fixed_questions_are_rejected() {
        let mut quizzes = MockQuizRepository::new();
        quizzes.expect_create().never();
        let id = Uuid::new_v4();
        let quiz = new_quiz(QuizSource::Fixed {
            question_ids: vec![id, id],
        });
        let err = service(quizzes, MockQuestionRepository::new())
            .create(quiz)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn criteria_count_is_capped() {
        let mut quizzes = MockQuizRepository::new();
        quizzes.expect_create().never();
        let quiz = new_quiz(QuizSource::Criteria {
            criteria: SelectionCriteria {
                count: 21,
                ..Default::default()
            },
        });
        let err = service(quizzes, MockQuestionRepository::new())
            .create(quiz)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn deleting_unknown_quiz_is_not_found() {
        let mut quizzes = MockQuizRepository::new();
        quizzes.expect_delete().returning(|_| Ok(false));
        let err = service(quizzes, MockQuestionRepository::new())
            .delete(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
