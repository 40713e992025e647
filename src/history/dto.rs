use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::products::dto::ProductSummary;

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub product: ProductSummary,
    #[serde(with = "time::serde::rfc3339")]
    pub viewed_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub history: Vec<HistoryEntry>,
    pub total_results: i64,
    pub total_pages: i64,
    pub current_page: i64,
}
