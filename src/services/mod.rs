pub mod assembler_service;
pub mod attempt_service;
pub mod batch_service;
pub mod grading_service;
pub mod import_service;
pub mod normalizer;
pub mod question_bank_service;
pub mod quiz_service;
pub mod selector_service;

use serde::Serialize;

pub const DEFAULT_PER_PAGE: i64 = 20;
const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if per_page > 0 {
            ((total as f64) / (per_page as f64)).ceil() as i64
        } else {
            1
        };
        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub per_page: i64,
    pub offset: i64,
}

/// Clamps user-supplied paging to sane bounds. The offset saturates instead of overflowing.
pub fn page_bounds(page: Option<i64>, per_page: Option<i64>) -> PageWindow {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    PageWindow {
        page,
        per_page,
        offset: (page - 1).saturating_mul(per_page),
    }
}
