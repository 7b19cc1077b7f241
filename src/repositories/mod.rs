pub mod attempt_repository;
pub mod batch_repository;
pub mod question_repository;
pub mod quiz_repository;

use std::sync::Arc;

use sqlx::PgPool;

pub use attempt_repository::{AttemptRepository, PgAttemptRepository};
pub use batch_repository::{BatchRepository, PgBatchRepository};
pub use question_repository::{Candidate, PgQuestionRepository, QuestionRepository};
pub use quiz_repository::{PgQuizRepository, QuizRepository};

/// Storage handles shared by the services.
#[derive(Clone)]
pub struct Repositories {
    pub questions: Arc<dyn QuestionRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub batches: Arc<dyn BatchRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            questions: Arc::new(PgQuestionRepository::new(pool.clone())),
            quizzes: Arc::new(PgQuizRepository::new(pool.clone())),
            attempts: Arc::new(PgAttemptRepository::new(pool.clone())),
            batches: Arc::new(PgBatchRepository::new(pool)),
        }
    }
}
