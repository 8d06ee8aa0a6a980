use serde::{Deserialize, Deserializer, Serialize};

/// Pagination metadata included in list responses.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 100)]
    pub per_page: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 1)]
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        Self {
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page.max(1)),
        }
    }
}

/// Highest page number a listing accepts.
pub const MAX_PAGE: u64 = 1_000_000;

/// Resolve optional paging parameters: page is clamped to `1..=MAX_PAGE`,
/// page size to `1..=max`.
pub fn page_params(page: Option<u64>, per_page: Option<u64>, default: u64, max: u64) -> (u64, u64) {
    (
        page.unwrap_or(1).clamp(1, MAX_PAGE),
        per_page.unwrap_or(default).clamp(1, max),
    )
}

/// Row offset of a 1-based page. Saturates instead of overflowing and never
/// exceeds what a SQL `OFFSET` accepts.
pub fn page_offset(page: u64, per_page: u64) -> u64 {
    let offset = page.saturating_sub(1).saturating_mul(per_page);
    std::cmp::min(offset, i64::MAX as u64)
}

/// Serde helper for PATCH semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}
