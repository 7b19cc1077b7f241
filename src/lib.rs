pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::repositories::Repositories;
use crate::services::{
    assembler_service::AssemblerService, attempt_service::AttemptService,
    batch_service::BatchService, import_service::ImportService,
    question_bank_service::QuestionBankService, quiz_service::QuizService,
    selector_service::SelectorService,
};

#[derive(Clone)]
pub struct AppState {
    pub question_bank: QuestionBankService,
    pub selector: SelectorService,
    pub quiz_service: QuizService,
    pub attempt_service: AttemptService,
    pub batch_service: BatchService,
    pub import_service: ImportService,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Self {
        Self::from_repositories(
            Repositories::postgres(pool),
            config.max_quiz_questions,
            &config.jwt_secret,
        )
    }

    /// Wires the services over any storage backend.
    pub fn from_repositories(
        repos: Repositories,
        max_quiz_questions: usize,
        jwt_secret: &str,
    ) -> Self {
        let question_bank = QuestionBankService::new(repos.questions.clone());
        let selector = SelectorService::new(repos.questions.clone(), max_quiz_questions);
        let assembler = AssemblerService::new(question_bank.clone(), selector.clone());
        let quiz_service =
            QuizService::new(repos.quizzes.clone(), question_bank.clone(), selector.clone());
        let attempt_service = AttemptService::new(
            repos.attempts.clone(),
            repos.quizzes.clone(),
            question_bank.clone(),
            assembler,
        );
        let batch_service = BatchService::new(repos.batches.clone(), quiz_service.clone());
        let import_service = ImportService::new(question_bank.clone());

        Self {
            question_bank,
            selector,
            quiz_service,
            attempt_service,
            batch_service,
            import_service,
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}
