use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::question::{CriteriaStat, PublicQuestion};
use crate::models::quiz::{SelectionCriteria, UnderfillWarning};
use crate::repositories::{Candidate, QuestionRepository};
use crate::services::question_bank_service::arrange;

/// Outcome of one draw from the bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// Presentation order.
    pub question_ids: Vec<Uuid>,
    pub requested: usize,
    pub underfill: Option<UnderfillWarning>,
}

impl Selection {
    pub fn delivered(&self) -> usize {
        self.question_ids.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionPreview {
    pub total_matching: usize,
    pub requested: usize,
    pub sample: Vec<PublicQuestion>,
}

#[derive(Clone)]
pub struct SelectorService {
    questions: Arc<dyn QuestionRepository>,
    max_questions: usize,
}

impl SelectorService {
    pub fn new(questions: Arc<dyn QuestionRepository>, max_questions: usize) -> Self {
        Self {
            questions,
            max_questions,
        }
    }

    pub fn max_questions(&self) -> usize {
        self.max_questions
    }

    /// Rejects counts that can never produce a quiz.
    pub fn check_count(&self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(Error::BadRequest(
                "Question count must be at least 1".to_string(),
            ));
        }
        if count > self.max_questions {
            return Err(Error::BadRequest(format!(
                "Question count {} exceeds the maximum of {}",
                count, self.max_questions
            )));
        }
        Ok(())
    }

    pub async fn select(&self, criteria: &SelectionCriteria) -> Result<Selection> {
        self.check_count(criteria.count)?;

        let candidates = self.questions.candidates(criteria).await?;
        if candidates.is_empty() {
            return Err(Error::EmptyPool(criteria.to_string()));
        }

        let question_ids = draw(&candidates, criteria.count)?;
        let underfill = (question_ids.len() < criteria.count).then(|| UnderfillWarning {
            requested: criteria.count,
            delivered: question_ids.len(),
        });
        if let Some(u) = &underfill {
            warn!(
                "Criteria [{}] matched {} questions, fewer than the {} requested",
                criteria, u.delivered, u.requested
            );
        } else {
            debug!("Selected {} questions for [{}]", question_ids.len(), criteria);
        }

        Ok(Selection {
            question_ids,
            requested: criteria.count,
            underfill,
        })
    }

    pub async fn criteria_stats(&self) -> Result<Vec<CriteriaStat>> {
        self.questions.criteria_stats().await
    }

    /// How many questions match, plus a small sample with answer keys removed.
    pub async fn preview(
        &self,
        criteria: &SelectionCriteria,
        limit: usize,
    ) -> Result<SelectionPreview> {
        let candidates = self.questions.candidates(criteria).await?;
        let ids = draw(&candidates, limit.min(criteria.count.max(1)))?;
        let (questions, _) = arrange(&ids, self.questions.find_many(&ids).await?);

        Ok(SelectionPreview {
            total_matching: candidates.len(),
            requested: criteria.count,
            sample: questions.iter().map(|q| q.to_public()).collect(),
        })
    }
}

/// Samples with the thread-local RNG. Kept synchronous so the RNG never lives across an await.
fn draw(candidates: &[Candidate], count: usize) -> Result<Vec<Uuid>> {
    let mut rng = rand::thread_rng();
    weighted_sample(candidates, count, &mut rng)
}

/// Draws up to `count` distinct candidates, each with probability proportional
/// to its weight, and returns them in shuffled order. Zero-weight candidates are
/// never drawn. When fewer than `count` candidates are eligible, all of them are returned.
pub fn weighted_sample<R: Rng + ?Sized>(
    candidates: &[Candidate],
    count: usize,
    rng: &mut R,
) -> Result<Vec<Uuid>> {
    let eligible: Vec<Candidate> = candidates.iter().copied().filter(|c| c.weight > 0).collect();

    let mut picked: Vec<Uuid> = if eligible.len() <= count {
        eligible.iter().map(|c| c.id).collect()
    } else {
        eligible
            .choose_multiple_weighted(&mut *rng, count, |c| f64::from(c.weight))
            .map_err(|e| Error::Internal(format!("Weighted sampling failed: {}", e)))?
            .map(|c| c.id)
            .collect()
    };
    picked.shuffle(rng);
    Ok(picked)
}
