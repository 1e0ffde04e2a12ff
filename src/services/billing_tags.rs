use std::sync::Arc;

use crate::{
    db::{DateRange, DbPool, DbResult},
    models::{BillingTagStatistic, ModelUsageByBillingTag},
};

/// Both billing tag aggregations over one date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingTagReport {
    pub statistics: Vec<BillingTagStatistic>,
    pub model_usage: Vec<ModelUsageByBillingTag>,
}

/// Service layer for billing tag reporting
#[derive(Clone)]
pub struct BillingTagService {
    db: Arc<DbPool>,
}

impl BillingTagService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Per-tag totals, highest quota first
    pub async fn get_statistics(&self, range: DateRange) -> DbResult<Vec<BillingTagStatistic>> {
        self.db.billing_tags().get_statistics(range).await
    }

    /// Request counts per (tag, model)
    pub async fn get_model_usage(
        &self,
        range: DateRange,
    ) -> DbResult<Vec<ModelUsageByBillingTag>> {
        self.db.billing_tags().get_model_usage(range).await
    }

    /// Run both aggregations, statistics first.
    ///
    /// The queries are independent reads with no shared snapshot. The first
    /// failure is returned and the second query is not attempted.
    pub async fn get_report(&self, range: DateRange) -> DbResult<BillingTagReport> {
        let repo = self.db.billing_tags();
        let statistics = repo.get_statistics(range).await?;
        let model_usage = repo.get_model_usage(range).await?;
        Ok(BillingTagReport {
            statistics,
            model_usage,
        })
    }
}
