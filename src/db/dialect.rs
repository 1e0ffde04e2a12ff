//! SQL dialect strategy.
//!
//! The supported backends disagree on JSON field extraction, epoch-to-date
//! conversion, integer casts, identifier quoting and bind placeholders. Every
//! such difference is expressed here, so query builders stay backend-neutral
//! and row handling never needs to know which engine produced a row.

use std::fmt;

/// SQL dialect of a configured database backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlDialect {
    Sqlite,
    Postgres,
    Mysql,
}

impl SqlDialect {
    /// Quote an identifier. Needed for reserved words such as `group`.
    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            SqlDialect::Sqlite | SqlDialect::Postgres => {
                format!("\"{}\"", ident.replace('"', "\"\""))
            }
            SqlDialect::Mysql => format!("`{}`", ident.replace('`', "``")),
        }
    }

    /// Expression extracting the string value of `key` from a JSON document stored
    /// in `column` as text.
    ///
    /// Yields SQL NULL when the document is NULL, empty or not valid JSON, when the
    /// key is absent, and when the key holds anything other than a JSON string.
    pub fn json_text(&self, column: &str, key: &str) -> String {
        match self {
            // json_type raises on malformed input, so validity is checked first
            SqlDialect::Sqlite => format!(
                "CASE WHEN json_valid({column}) THEN \
                 CASE WHEN json_type({column}, '$.{key}') = 'text' \
                 THEN json_extract({column}, '$.{key}') END END"
            ),
            SqlDialect::Postgres => {
                let doc = format!("NULLIF({column}::text, '')::jsonb");
                format!(
                    "CASE WHEN jsonb_typeof({doc} -> '{key}') = 'string' \
                     THEN {doc} ->> '{key}' END"
                )
            }
            SqlDialect::Mysql => format!(
                "CASE WHEN JSON_VALID({column}) THEN \
                 CASE WHEN JSON_TYPE(JSON_EXTRACT({column}, '$.{key}')) = 'STRING' \
                 THEN JSON_UNQUOTE(JSON_EXTRACT({column}, '$.{key}')) END END"
            ),
        }
    }

    /// Expression converting a seconds-since-epoch column to its UTC calendar date.
    pub fn epoch_to_date(&self, column: &str) -> String {
        match self {
            SqlDialect::Sqlite => format!("DATE({column}, 'unixepoch')"),
            SqlDialect::Postgres => format!("(TO_TIMESTAMP({column}) AT TIME ZONE 'UTC')::DATE"),
            // Pure interval arithmetic, independent of the session time zone.
            SqlDialect::Mysql => {
                format!("DATE(DATE_ADD('1970-01-01 00:00:00', INTERVAL {column} SECOND))")
            }
        }
    }

    /// Cast an integer aggregate to a 64-bit signed integer.
    ///
    /// PostgreSQL and MySQL widen `SUM` over integers to NUMERIC/DECIMAL.
    pub fn bigint(&self, expr: &str) -> String {
        match self {
            SqlDialect::Sqlite => expr.to_string(),
            SqlDialect::Postgres => format!("({expr})::BIGINT"),
            SqlDialect::Mysql => format!("CAST({expr} AS SIGNED)"),
        }
    }

    /// Bind placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::Sqlite | SqlDialect::Mysql => "?".to_string(),
            SqlDialect::Postgres => format!("${index}"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SqlDialect::Sqlite => "sqlite",
            SqlDialect::Postgres => "postgres",
            SqlDialect::Mysql => "mysql",
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_quoting() {
        assert_eq!(SqlDialect::Sqlite.quote_ident("group"), "\"group\"");
        assert_eq!(SqlDialect::Postgres.quote_ident("group"), "\"group\"");
        assert_eq!(SqlDialect::Mysql.quote_ident("group"), "`group`");
    }

    #[test]
    fn test_quote_escapes_embedded_quotes() {
        assert_eq!(SqlDialect::Postgres.quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(SqlDialect::Mysql.quote_ident("a`b"), "`a``b`");
    }

    #[test]
    fn test_json_text_only_accepts_strings() {
        let sqlite = SqlDialect::Sqlite.json_text("tokens.setting", "billing_tag");
        assert!(sqlite.contains("json_valid(tokens.setting)"));
        assert!(sqlite.contains("json_type(tokens.setting, '$.billing_tag') = 'text'"));
        assert!(sqlite.contains("THEN json_extract(tokens.setting, '$.billing_tag')"));

        let pg = SqlDialect::Postgres.json_text("tokens.setting", "billing_tag");
        assert!(pg.contains(
            "jsonb_typeof(NULLIF(tokens.setting::text, '')::jsonb -> 'billing_tag') = 'string'"
        ));
        assert!(pg.contains("NULLIF(tokens.setting::text, '')::jsonb ->> 'billing_tag'"));

        let mysql = SqlDialect::Mysql.json_text("tokens.setting", "billing_tag");
        assert!(mysql.contains("JSON_UNQUOTE(JSON_EXTRACT(tokens.setting, '$.billing_tag'))"));
        assert!(mysql.contains("= 'STRING'"));
    }

    #[test]
    fn test_epoch_to_date() {
        assert_eq!(
            SqlDialect::Sqlite.epoch_to_date("logs.created_at"),
            "DATE(logs.created_at, 'unixepoch')"
        );
        assert!(
            SqlDialect::Postgres
                .epoch_to_date("logs.created_at")
                .contains("AT TIME ZONE 'UTC'")
        );
        assert!(
            SqlDialect::Mysql
                .epoch_to_date("logs.created_at")
                .contains("INTERVAL logs.created_at SECOND")
        );
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(SqlDialect::Sqlite.placeholder(2), "?");
        assert_eq!(SqlDialect::Mysql.placeholder(1), "?");
        assert_eq!(SqlDialect::Postgres.placeholder(2), "$2");
    }

    #[test]
    fn test_bigint_cast() {
        assert_eq!(SqlDialect::Sqlite.bigint("SUM(x)"), "SUM(x)");
        assert_eq!(SqlDialect::Postgres.bigint("SUM(x)"), "(SUM(x))::BIGINT");
        assert_eq!(SqlDialect::Mysql.bigint("SUM(x)"), "CAST(SUM(x) AS SIGNED)");
    }
}
