pub mod attempt_dto;
pub mod batch_dto;
pub mod question_dto;
pub mod quiz_dto;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
