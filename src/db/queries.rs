//! Billing tag aggregation queries.
//!
//! Both reports share one row source: completion-type usage log entries inside a
//! UTC date range, left-joined to the live (not soft-deleted) token they were made
//! with and inner-joined to the owning user. Each entry is attributed to its
//! resolved billing tag, computed inside the query so grouping happens on it.
//!
//! Both queries take two bind parameters: the inclusive start and end dates.

use super::dialect::SqlDialect;
use crate::models::LOG_TYPE_CONSUME;

/// JSON key in `tokens.setting` holding the explicit billing tag.
pub const BILLING_TAG_SETTING_KEY: &str = "billing_tag";

/// Expression resolving the effective billing tag of a joined log row.
///
/// The token's explicit tag wins when it is present and non-empty; otherwise the
/// user's group is used. Absent, JSON null and `""` tags are all treated as unset.
pub fn resolved_billing_tag(dialect: SqlDialect) -> String {
    format!(
        "COALESCE(NULLIF({}, ''), users.{})",
        dialect.json_text("tokens.setting", BILLING_TAG_SETTING_KEY),
        dialect.quote_ident("group"),
    )
}

fn from_and_filter(dialect: SqlDialect) -> String {
    format!(
        "FROM logs \
         LEFT JOIN tokens ON logs.token_name = tokens.name \
             AND logs.user_id = tokens.user_id \
             AND tokens.deleted_at IS NULL \
         INNER JOIN users ON logs.user_id = users.id \
         WHERE logs.type = {LOG_TYPE_CONSUME} \
             AND {} BETWEEN {} AND {}",
        dialect.epoch_to_date("logs.created_at"),
        dialect.placeholder(1),
        dialect.placeholder(2),
    )
}

fn sum(dialect: SqlDialect, column: &str) -> String {
    dialect.bigint(&format!("COALESCE(SUM({column}), 0)"))
}

/// Per-tag totals, ordered by quota descending then tag ascending.
///
/// Columns: `billing_tag`, `request_count`, `quota`, `prompt_tokens`,
/// `completion_tokens`, `request_time`.
pub fn statistics_sql(dialect: SqlDialect) -> String {
    // Grouping and ordering are positional: `quota` and `billing_tag` would
    // otherwise be ambiguous with input columns on some engines.
    format!(
        "SELECT \
             {tag} AS billing_tag, \
             COUNT(*) AS request_count, \
             {quota} AS quota, \
             {prompt} AS prompt_tokens, \
             {completion} AS completion_tokens, \
             {request_time} AS request_time \
         {from} \
         GROUP BY 1 \
         ORDER BY 3 DESC, 1 ASC",
        tag = resolved_billing_tag(dialect),
        quota = sum(dialect, "logs.quota"),
        prompt = sum(dialect, "logs.prompt_tokens"),
        completion = sum(dialect, "logs.completion_tokens"),
        request_time = sum(dialect, "logs.request_time"),
        from = from_and_filter(dialect),
    )
}

/// Request counts per (tag, model), ordered by tag ascending, then count
/// descending, then model ascending.
///
/// Columns: `billing_tag`, `model_name`, `request_count`.
pub fn model_usage_sql(dialect: SqlDialect) -> String {
    format!(
        "SELECT \
             {tag} AS billing_tag, \
             logs.model_name AS model_name, \
             COUNT(*) AS request_count \
         {from} \
         GROUP BY 1, 2 \
         ORDER BY 1 ASC, 3 DESC, 2 ASC",
        tag = resolved_billing_tag(dialect),
        from = from_and_filter(dialect),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SqlDialect; 3] = [SqlDialect::Sqlite, SqlDialect::Postgres, SqlDialect::Mysql];

    #[test]
    fn test_resolved_tag_falls_back_to_group() {
        assert!(resolved_billing_tag(SqlDialect::Sqlite).ends_with("users.\"group\")"));
        assert!(resolved_billing_tag(SqlDialect::Postgres).ends_with("users.\"group\")"));
        assert!(resolved_billing_tag(SqlDialect::Mysql).ends_with("users.`group`)"));
    }

    #[test]
    fn test_resolved_tag_treats_empty_as_unset() {
        for dialect in ALL {
            let expr = resolved_billing_tag(dialect);
            assert!(expr.starts_with("COALESCE(NULLIF("), "{dialect}: {expr}");
            assert!(expr.contains("'billing_tag'") || expr.contains("'$.billing_tag'"));
        }
    }

    #[test]
    fn test_soft_deleted_tokens_excluded_from_join() {
        for dialect in ALL {
            let sql = statistics_sql(dialect);
            assert!(sql.contains("LEFT JOIN tokens"));
            assert!(sql.contains("AND tokens.deleted_at IS NULL"));
            assert!(sql.contains("INNER JOIN users ON logs.user_id = users.id"));
        }
    }

    #[test]
    fn test_only_completion_events_counted() {
        for dialect in ALL {
            assert!(statistics_sql(dialect).contains("WHERE logs.type = 2"));
            assert!(model_usage_sql(dialect).contains("WHERE logs.type = 2"));
        }
    }

    #[test]
    fn test_date_filter_placeholders() {
        assert!(statistics_sql(SqlDialect::Postgres).contains("BETWEEN $1 AND $2"));
        assert!(statistics_sql(SqlDialect::Sqlite).contains("BETWEEN ? AND ?"));
        assert!(model_usage_sql(SqlDialect::Mysql).contains("BETWEEN ? AND ?"));
    }

    #[test]
    fn test_statistics_ordering() {
        for dialect in ALL {
            let sql = statistics_sql(dialect);
            assert!(sql.ends_with("GROUP BY 1 ORDER BY 3 DESC, 1 ASC"), "{sql}");
        }
    }

    #[test]
    fn test_model_usage_ordering() {
        for dialect in ALL {
            let sql = model_usage_sql(dialect);
            assert!(sql.ends_with("GROUP BY 1, 2 ORDER BY 1 ASC, 3 DESC, 2 ASC"), "{sql}");
        }
    }

    #[test]
    fn test_postgres_sums_are_cast() {
        let sql = statistics_sql(SqlDialect::Postgres);
        assert!(sql.contains("(COALESCE(SUM(logs.quota), 0))::BIGINT AS quota"));
        let sql = statistics_sql(SqlDialect::Mysql);
        assert!(sql.contains("CAST(COALESCE(SUM(logs.request_time), 0) AS SIGNED) AS request_time"));
    }
}
