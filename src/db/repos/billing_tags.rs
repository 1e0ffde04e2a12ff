use async_trait::async_trait;

use super::DateRange;
use crate::{
    db::error::DbResult,
    models::{BillingTagStatistic, ModelUsageByBillingTag},
};

/// Read-only aggregation over the usage log, grouped by resolved billing tag.
#[async_trait]
pub trait BillingTagRepo: Send + Sync {
    /// Per-tag totals for completion events in `range`, highest quota first.
    async fn get_statistics(&self, range: DateRange) -> DbResult<Vec<BillingTagStatistic>>;

    /// Per-(tag, model) request counts for completion events in `range`,
    /// ordered by tag, then by request count descending.
    async fn get_model_usage(&self, range: DateRange) -> DbResult<Vec<ModelUsageByBillingTag>>;
}
