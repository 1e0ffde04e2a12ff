use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use crate::{
    db::{
        dialect::SqlDialect,
        error::DbResult,
        queries,
        repos::{BillingTagRepo, DateRange},
    },
    models::{BillingTagStatistic, ModelUsageByBillingTag},
};

pub struct SqliteBillingTagRepo {
    pool: SqlitePool,
    statistics_sql: String,
    model_usage_sql: String,
}

impl SqliteBillingTagRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            statistics_sql: queries::statistics_sql(SqlDialect::Sqlite),
            model_usage_sql: queries::model_usage_sql(SqlDialect::Sqlite),
        }
    }

    fn statistic_from_row(row: &SqliteRow) -> Result<BillingTagStatistic, sqlx::Error> {
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

    fn model_usage_from_row(row: &SqliteRow) -> Result<ModelUsageByBillingTag, sqlx::Error> {
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
impl BillingTagRepo for SqliteBillingTagRepo {
    async fn get_statistics(&self, range: DateRange) -> DbResult<Vec<BillingTagStatistic>> {
        // DATE(..., 'unixepoch') yields ISO-8601 text, so dates bind as text
        let rows = sqlx::query(&self.statistics_sql)
            .bind(range.start.format("%Y-%m-%d").to_string())
            .bind(range.end.format("%Y-%m-%d").to_string())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(Self::statistic_from_row)
            .collect::<Result<_, _>>()?)
    }

    async fn get_model_usage(&self, range: DateRange) -> DbResult<Vec<ModelUsageByBillingTag>> {
        let rows = sqlx::query(&self.model_usage_sql)
            .bind(range.start.format("%Y-%m-%d").to_string())
            .bind(range.end.format("%Y-%m-%d").to_string())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(Self::model_usage_from_row)
            .collect::<Result<_, _>>()?)
    }
}
