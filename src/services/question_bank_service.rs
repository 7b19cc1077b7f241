use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::question::{NewQuestion, Question, QuestionChanges, QuestionFilter};
use crate::repositories::QuestionRepository;
use crate::services::{PageWindow, Paginated};

#[derive(Clone)]
pub struct QuestionBankService {
    questions: Arc<dyn QuestionRepository>,
}

impl QuestionBankService {
    pub fn new(questions: Arc<dyn QuestionRepository>) -> Self {
        Self { questions }
    }

    pub async fn create(&self, question: NewQuestion) -> Result<Question> {
        check_content(&question.question_text, question.weightage)?;
        question.details.check().map_err(Error::BadRequest)?;

        let created = self.questions.create(question).await?;
        info!(
            "Added {} question {} to the bank ({}/{})",
            created.question_type(),
            created.id,
            created.domain,
            created.subject
        );
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<Question> {
        self.questions
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Question {} not found", id)))
    }

    pub async fn list(
        &self,
        filter: QuestionFilter,
        window: PageWindow,
    ) -> Result<Paginated<Question>> {
        let (items, total) = self
            .questions
            .list(filter, window.offset, window.per_page)
            .await?;
        Ok(Paginated::new(items, total, window.page, window.per_page))
    }

    /// Applies `changes` unless an attempt has already answered the question.
    pub async fn update(&self, id: Uuid, changes: QuestionChanges) -> Result<Question> {
        let mut question = self.get(id).await?;
        self.ensure_unanswered(id).await?;

        changes.apply(&mut question);
        check_content(&question.question_text, question.weightage)?;
        question.details.check().map_err(Error::BadRequest)?;

        let updated = self.questions.update(question).await?;
        info!("Updated question {}", id);
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.ensure_unanswered(id).await?;
        if !self.questions.delete(id).await? {
            return Err(Error::NotFound(format!("Question {} not found", id)));
        }
        info!("Deleted question {}", id);
        Ok(())
    }

    /// Loads `ids` in the given order. Ids with no stored question are returned separately.
    pub async fn load_ordered(&self, ids: &[Uuid]) -> Result<(Vec<Question>, Vec<Uuid>)> {
        let found = self.questions.find_many(ids).await?;
        Ok(arrange(ids, found))
    }

    async fn ensure_unanswered(&self, id: Uuid) -> Result<()> {
        if self.questions.has_answers(id).await? {
            warn!("Refusing to modify answered question {}", id);
            return Err(Error::Conflict(format!(
                "Question {} has recorded answers and can no longer be changed",
                id
            )));
        }
        Ok(())
    }
}

fn check_content(text: &str, weightage: i32) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::BadRequest("Question text must not be empty".to_string()));
    }
    if weightage < 0 {
        return Err(Error::BadRequest("Weightage must not be negative".to_string()));
    }
    Ok(())
}

/// Orders `questions` by `ids`, reporting ids that had no match.
pub fn arrange(ids: &[Uuid], questions: Vec<Question>) -> (Vec<Question>, Vec<Uuid>) {
    let mut by_id: HashMap<Uuid, Question> = questions.into_iter().map(|q| (q.id, q)).collect();
    let mut ordered = Vec::with_capacity(ids.len());
    let mut missing = Vec::new();
    for id in ids {
        match by_id.remove(id) {
            Some(q) => ordered.push(q),
            None => missing.push(*id),
        }
    }
    (ordered, missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Difficulty, QuestionDetails};
    use crate::repositories::question_repository::MockQuestionRepository;
    use mockall::predicate::eq;

    fn stored(id: Uuid) -> Question {
        Question {
            id,
            question_text: "Which keyword declares an immutable binding?".into(),
            code_snippet: None,
            explanation: None,
            hint: None,
            details: QuestionDetails::TrueFalse {
                correct_answer: true,
            },
            difficulty: Difficulty::Easy,
            concepts: vec!["bindings".into()],
            domain: "Programming".into(),
            subject: "Rust".into(),
            source: "Custom".into(),
            weightage: 1,
            quiz_id: None,
            created_by: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn answered_question_cannot_be_edited() {
        let id = Uuid::new_v4();
        let mut repo = MockQuestionRepository::new();
        repo.expect_find_by_id()
            .with(eq(id))
            .returning(move |id| Ok(Some(stored(id))));
        repo.expect_has_answers().with(eq(id)).returning(|_| Ok(true));
        repo.expect_update().never();

        let service = QuestionBankService::new(Arc::new(repo));
        let changes = QuestionChanges {
            question_text: Some("Edited".into()),
            ..Default::default()
        };
        let err = service.update(id, changes).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn answered_question_cannot_be_deleted() {
        let mut repo = MockQuestionRepository::new();
        repo.expect_has_answers().returning(|_| Ok(true));
        repo.expect_delete().never();

        let service = QuestionBankService::new(Arc::new(repo));
        let err = service.delete(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn negative_weight_is_rejected() {
        let mut repo = MockQuestionRepository::new();
        repo.expect_create().never();
        let service = QuestionBankService::new(Arc::new(repo));

        let q = stored(Uuid::new_v4());
        let new = NewQuestion {
            question_text: q.question_text,
            code_snippet: None,
            explanation: None,
            hint: None,
            details: q.details,
            difficulty: q.difficulty,
            concepts: q.concepts,
            domain: q.domain,
            subject: q.subject,
            source: q.source,
            weightage: -1,
            quiz_id: None,
            created_by: None,
        };
        assert!(matches!(
            service.create(new).await.unwrap_err(),
            Error::BadRequest(_)
        ));
    }

    #[test]
    fn arrange_keeps_requested_order_and_reports_missing() {
        let (a, b, gone) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let (ordered, missing) = arrange(&[b, gone, a], vec![stored(a), stored(b)]);
        let ids: Vec<Uuid> = ordered.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![b, a]);
        assert_eq!(missing, vec![gone]);
    }
}
