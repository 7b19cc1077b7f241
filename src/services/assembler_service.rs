use tracing::{error, info};

use crate::error::{Error, Result};
use crate::models::quiz::{Quiz, QuizSource, ResolvedQuiz, UnderfillWarning};
use crate::services::question_bank_service::QuestionBankService;
use crate::services::selector_service::SelectorService;

/// Turns a stored quiz into the concrete question sequence for one attempt.
#[derive(Clone)]
pub struct AssemblerService {
    bank: QuestionBankService,
    selector: SelectorService,
}

impl AssemblerService {
    pub fn new(bank: QuestionBankService, selector: SelectorService) -> Self {
        Self { bank, selector }
    }

    pub async fn resolve(&self, quiz: &Quiz) -> Result<ResolvedQuiz> {
        let resolved = match &quiz.source {
            QuizSource::Fixed { question_ids } => {
                let (questions, missing) = self.bank.load_ordered(question_ids).await?;
                if !missing.is_empty() {
                    error!(
                        "Quiz {} links {} questions that no longer exist",
                        quiz.id,
                        missing.len()
                    );
                    return Err(Error::BrokenReference {
                        quiz_id: quiz.id,
                        missing,
                    });
                }
                ResolvedQuiz {
                    quiz_id: quiz.id,
                    game_format: quiz.game_format,
                    requested: questions.len(),
                    questions,
                    underfill: None,
                    criteria_snapshot: None,
                }
            }
            QuizSource::Criteria { criteria } => {
                let selection = self.selector.select(criteria).await?;
                // Questions deleted between selection and load are dropped rather than fatal.
                let (questions, missing) = self.bank.load_ordered(&selection.question_ids).await?;
                if questions.is_empty() {
                    error!(
                        "Quiz {}: all {} selected questions vanished before load",
                        quiz.id,
                        missing.len()
                    );
                    return Err(Error::EmptyPool(criteria.to_string()));
                }
                let underfill = selection.underfill.or_else(|| {
                    (questions.len() < selection.requested).then(|| UnderfillWarning {
                        requested: selection.requested,
                        delivered: questions.len(),
                    })
                });
                ResolvedQuiz {
                    quiz_id: quiz.id,
                    game_format: quiz.game_format,
                    requested: selection.requested,
                    questions,
                    underfill,
                    criteria_snapshot: Some(criteria.clone()),
                }
            }
        };

        if let Some(question) = resolved
            .questions
            .iter()
            .find(|q| !quiz.game_format.accepts(q.question_type()))
        {
            return Err(Error::FormatMismatch {
                question_id: question.id,
                question_type: question.question_type(),
                game_format: quiz.game_format,
            });
        }

        info!(
            "Resolved quiz {} ({}) to {} questions",
            quiz.id,
            quiz.game_format,
            resolved.questions.len()
        );
        Ok(resolved)
    }
}
