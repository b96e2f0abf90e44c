use serde::Serialize;

use adaudit_store::AuditState;
use adaudit_utils::error::AuditError;
use adaudit_utils::logging::log_query;

use crate::filter::ResultFilter;
use crate::row::{ResultItem, result_rows};

/// A validated 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

impl PageRequest {
    /// `page_size` above `max_page_size` is clamped to it.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `page` or `page_size` is zero.
    pub fn new(page: usize, page_size: usize, max_page_size: usize) -> Result<Self, AuditError> {
        if page == 0 {
            return Err(AuditError::invalid_argument("page must be at least 1"));
        }
        if page_size == 0 {
            return Err(AuditError::invalid_argument("pageSize must be at least 1"));
        }
        Ok(Self {
            page,
            page_size: page_size.min(max_page_size.max(1)),
        })
    }

    #[must_use]
    pub fn page(&self) -> usize {
        self.page
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Index of the first row on this page.
    #[must_use]
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// One page of results. `total` counts every row that matched the filter,
/// not just the rows on this page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPage {
    pub items: Vec<ResultItem>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Filter the result rows and slice out one page.
///
/// A page past the end is empty but still reports the full `total`.
#[must_use]
pub fn query_results(state: &AuditState, filter: &ResultFilter, page: PageRequest) -> ResultPage {
    let matching: Vec<ResultItem> = result_rows(state)
        .into_iter()
        .filter(|item| filter.matches(item))
        .collect();
    let total = matching.len();
    let start = page.offset().min(total);
    let end = start.saturating_add(page.page_size).min(total);
    let items: Vec<ResultItem> = matching.into_iter().skip(start).take(end - start).collect();

    log_query(filter.account_id.as_deref(), page.page, page.page_size, total);
    ResultPage {
        items,
        total,
        page: page.page,
        page_size: page.page_size,
    }
}
