use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    db::{
        dialect::SqlDialect,
        error::DbResult,
        queries,
        repos::{BillingTagRepo, DateRange},
    },
    models::{BillingTagStatistic, ModelUsageByBillingTag},
};

/// Reports only read, so the repo holds the read pool (the replica when one is
/// configured, the primary otherwise).
pub struct PostgresBillingTagRepo {
    read_pool: PgPool,
    statistics_sql: String,
    model_usage_sql: String,
}

impl PostgresBillingTagRepo {
    pub fn new(read_pool: PgPool) -> Self {
        Self {
            read_pool,
            statistics_sql: queries::statistics_sql(SqlDialect::Postgres),
            model_usage_sql: queries::model_usage_sql(SqlDialect::Postgres),
        }
    }

    fn statistic_from_row(row: &PgRow) -> Result<BillingTagStatistic, sqlx::Error> {
        Ok(BillingTagStatistic {
            billing_tag: row
                .try_get::<Option<String>, _>("billing_tag")?
                .unwrap_or_default(),
            request_count: row.try_get("request_count")?,
            quota: row.try_get("quota")?,
            prompt_tokens: row.try_get("prompt_tokens")?,
            completion_tokens: row.try_get("completion_tokens")?,
            request_time: row.try_get("request_time")?,
        })
    }

    fn model_usage_from_row(row: &PgRow) -> Result<ModelUsageByBillingTag, sqlx::Error> {
        Ok(ModelUsageByBillingTag {
            billing_tag: row
                .try_get::<Option<String>, _>("billing_tag")?
                .unwrap_or_default(),
            model_name: row
                .try_get::<Option<String>, _>("model_name")?
                .unwrap_or_default(),
            request_count: row.try_get("request_count")?,
        })
    }
}

#[async_trait]
impl BillingTagRepo for PostgresBillingTagRepo {
    async fn get_statistics(&self, range: DateRange) -> DbResult<Vec<BillingTagStatistic>> {
        let rows = sqlx::query(&self.statistics_sql)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.read_pool)
            .await?;

        Ok(rows
            .iter()
            .map(Self::statistic_from_row)
            .collect::<Result<_, _>>()?)
    }

    async fn get_model_usage(&self, range: DateRange) -> DbResult<Vec<ModelUsageByBillingTag>> {
        let rows = sqlx::query(&self.model_usage_sql)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.read_pool)
            .await?;

        Ok(rows
            .iter()
            .map(Self::model_usage_from_row)
            .collect::<Result<_, _>>()?)
    }
}
