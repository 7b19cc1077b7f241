use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::batch::{Batch, BatchStatistics, NewBatch};
use crate::models::question::Difficulty;
use crate::models::quiz::{GameFormat, NewQuiz, Quiz, QuizSource, SelectionCriteria};
use crate::repositories::BatchRepository;
use crate::services::quiz_service::QuizService;
use crate::services::{PageWindow, Paginated};

const DEFAULT_BATCH_QUIZ_SIZE: usize = 10;

/// Settings for a dynamic quiz drawn from a batch's question pool.
#[derive(Debug, Clone)]
pub struct BatchQuizOptions {
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub time_limit_minutes: i32,
    pub game_format: GameFormat,
    /// Overrides the count from the batch's default criteria.
    pub question_count: Option<usize>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOverview {
    #[serde(flatten)]
    pub batch: Batch,
    pub statistics: BatchStatistics,
}

#[derive(Clone)]
pub struct BatchService {
    batches: Arc<dyn BatchRepository>,
    quizzes: QuizService,
}

impl BatchService {
    pub fn new(batches: Arc<dyn BatchRepository>, quizzes: QuizService) -> Self {
        Self { batches, quizzes }
    }

    pub async fn create(&self, batch: NewBatch) -> Result<Batch> {
        if batch.name.trim().is_empty() {
            return Err(Error::BadRequest("Batch name must not be empty".to_string()));
        }
        if matches!(&batch.quiz_criteria, Some(c) if c.count == 0) {
            return Err(Error::BadRequest(
                "Default quiz criteria need a positive question count".to_string(),
            ));
        }
        let created = self.batches.create(batch).await?;
        info!("Created batch {} '{}'", created.id, created.name);
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<Batch> {
        self.batches
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Batch {} not found", id)))
    }

    pub async fn overview(&self, id: Uuid) -> Result<BatchOverview> {
        let batch = self.get(id).await?;
        let statistics = self.batches.statistics(id).await?;
        Ok(BatchOverview { batch, statistics })
    }

    pub async fn list(&self, window: PageWindow) -> Result<Paginated<Batch>> {
        let (items, total) = self.batches.list(window.offset, window.per_page).await?;
        Ok(Paginated::new(items, total, window.page, window.per_page))
    }

    pub async fn add_user(&self, batch_id: Uuid, user_id: Uuid) -> Result<()> {
        self.get(batch_id).await?;
        self.batches.add_user(batch_id, user_id).await?;
        info!("User {} joined batch {}", user_id, batch_id);
        Ok(())
    }

    pub async fn remove_user(&self, batch_id: Uuid, user_id: Uuid) -> Result<()> {
        if !self.batches.remove_user(batch_id, user_id).await? {
            return Err(Error::NotFound(format!(
                "User {} is not an active member of batch {}",
                user_id, batch_id
            )));
        }
        Ok(())
    }

    pub async fn add_question(&self, batch_id: Uuid, question_id: Uuid) -> Result<()> {
        self.get(batch_id).await?;
        self.batches.add_question(batch_id, question_id).await
    }

    pub async fn remove_question(&self, batch_id: Uuid, question_id: Uuid) -> Result<()> {
        if !self.batches.remove_question(batch_id, question_id).await? {
            return Err(Error::NotFound(format!(
                "Question {} is not in batch {}",
                question_id, batch_id
            )));
        }
        Ok(())
    }

    /// Creates a dynamic quiz scoped to the batch's question pool and assigns it to the batch.
    pub async fn create_batch_quiz(&self, batch_id: Uuid, options: BatchQuizOptions) -> Result<Quiz> {
        let batch = self.get(batch_id).await?;
        let mut criteria = batch.quiz_criteria.clone().unwrap_or_else(|| SelectionCriteria {
            count: DEFAULT_BATCH_QUIZ_SIZE,
            ..Default::default()
        });
        criteria.batch_id = Some(batch_id);
        if let Some(count) = options.question_count {
            criteria.count = count;
        }

        let quiz = self
            .quizzes
            .create(NewQuiz {
                title: options.title,
                description: options.description,
                difficulty: options
                    .difficulty
                    .or(criteria.difficulty)
                    .unwrap_or_default(),
                time_limit_minutes: options.time_limit_minutes,
                source: QuizSource::Criteria { criteria },
                game_format: options.game_format,
                game_options: None,
                created_by: options.created_by,
            })
            .await?;
        self.batches.link_quiz(batch_id, quiz.id).await?;
        info!("Assigned quiz {} to batch {}", quiz.id, batch.id);
        Ok(quiz)
    }
}
