pub mod billing_tags;
#[cfg(feature = "csv-export")]
mod csv_export;
mod error;

use axum::{Router, routing::get};
pub use error::AdminError;

use crate::AppState;

/// Admin report routes, relative to `server.admin_base_path`.
pub fn get_admin_routes() -> Router<AppState> {
    let router = Router::new().route(
        "/billing-tags/statistics",
        get(billing_tags::get_statistics),
    );

    #[cfg(feature = "csv-export")]
    let router = router.route(
        "/billing-tags/statistics/export",
        get(billing_tags::export_statistics),
    );

    router
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use sqlx::SqlitePool;
    use tower::ServiceExt;

    use crate::{
        config::ReportingServiceConfig,
        db::{
            DbPool,
            tests::harness::{create_sqlite_pool, run_sqlite_migrations},
        },
    };

    const STATS: &str = "/admin/v1/billing-tags/statistics";

    /// Create a test application over a fresh in-memory database
    async fn test_app_with_config(config_str: &str) -> (axum::Router, SqlitePool) {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;

        let config =
            ReportingServiceConfig::from_str(config_str).expect("Failed to parse test config");
        let state = crate::AppState::with_db(config.clone(), Arc::new(DbPool::from_sqlite(pool.clone())));
        (crate::build_app(&config, state), pool)
    }

    async fn test_app() -> (axum::Router, SqlitePool) {
        test_app_with_config("").await
    }

    /// Two users, one tagged token, a soft-deleted token and a non-completion log.
    /// All completion logs fall on 2024-01-15 UTC.
    async fn seed(pool: &SqlitePool) {
        for sql in [
            r#"INSERT INTO users (id, username, "group") VALUES (1, 'alice', 'default')"#,
            r#"INSERT INTO users (id, username, "group") VALUES (2, 'bob', 'vip')"#,
            r#"INSERT INTO tokens (user_id, name, setting) VALUES (1, 'research', '{"billing_tag":"team-research"}')"#,
            r#"INSERT INTO tokens (user_id, name, setting, deleted_at) VALUES (2, 'old', '{"billing_tag":"ghost"}', '2024-01-01')"#,
            "INSERT INTO logs (user_id, created_at, type, token_name, model_name, quota, prompt_tokens, completion_tokens, request_time) \
             VALUES (1, 1705320000, 2, 'research', 'gpt-4', 500, 50, 100, 1200)",
            "INSERT INTO logs (user_id, created_at, type, token_name, model_name, quota, prompt_tokens, completion_tokens, request_time) \
             VALUES (1, 1705320000, 2, 'research', 'claude', 300, 30, 60, 800)",
            "INSERT INTO logs (user_id, created_at, type, token_name, model_name, quota, prompt_tokens, completion_tokens, request_time) \
             VALUES (1, 1705320000, 2, 'personal', 'gpt-4', 100, 10, 20, 300)",
            "INSERT INTO logs (user_id, created_at, type, token_name, model_name, quota, prompt_tokens, completion_tokens, request_time) \
             VALUES (2, 1705320000, 2, 'old', 'gpt-4', 200, 20, 40, 400)",
            "INSERT INTO logs (user_id, created_at, type, token_name, model_name, quota) \
             VALUES (2, 1705320000, 1, 'old', '', 0)",
        ] {
            sqlx::query(sql).execute(pool).await.unwrap();
        }
    }

    async fn get(app: &axum::Router, uri: &str) -> axum::response::Response {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    /// Helper to make a GET request
    async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
        let response = get(app, uri).await;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    // ============================================================================
    // Statistics Tests
    // ============================================================================

    #[tokio::test]
    async fn test_statistics_report() {
        let (app, pool) = test_app().await;
        seed(&pool).await;

        let (status, json) = get_json(
            &app,
            &format!("{STATS}?start_time=2024-01-01&end_time=2024-01-31"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "");

        let data = json["data"].as_array().unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data[0]["billing_tag"], "team-research");
        assert_eq!(data[0]["request_count"], 2);
        assert_eq!(data[0]["quota"], 800);
        assert_eq!(data[0]["prompt_tokens"], 80);
        assert_eq!(data[0]["completion_tokens"], 160);
        assert_eq!(data[0]["request_time"], 2000);
        // soft-deleted token falls back to the group
        assert_eq!(data[1]["billing_tag"], "vip");
        assert_eq!(data[2]["billing_tag"], "default");

        let total: i64 = data
            .iter()
            .map(|row| row["request_count"].as_i64().unwrap())
            .sum();
        assert_eq!(total, 4);

        let usage = json["model_usage"].as_array().unwrap();
        let pairs: Vec<(&str, &str, i64)> = usage
            .iter()
            .map(|row| {
                (
                    row["billing_tag"].as_str().unwrap(),
                    row["model_name"].as_str().unwrap(),
                    row["request_count"].as_i64().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("default", "gpt-4", 1),
                ("team-research", "claude", 1),
                ("team-research", "gpt-4", 1),
                ("vip", "gpt-4", 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_statistics_empty_range() {
        let (app, pool) = test_app().await;
        seed(&pool).await;

        let (status, json) = get_json(
            &app,
            &format!("{STATS}?start_time=2023-01-01&end_time=2023-12-31"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"], serde_json::json!([]));
        assert_eq!(json["model_usage"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_statistics_reversed_range_is_empty() {
        let (app, pool) = test_app().await;
        seed(&pool).await;

        let (status, json) = get_json(
            &app,
            &format!("{STATS}?start_time=2024-01-31&end_time=2024-01-01"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert!(json["data"].as_array().unwrap().is_empty());
        assert!(json["model_usage"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_statistics_rejects_malformed_date() {
        let (app, _pool) = test_app().await;

        let (status, json) = get_json(
            &app,
            &format!("{STATS}?start_time=2024/01/01&end_time=2024-01-31"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "message": "invalid start_time format, expected YYYY-MM-DD"
            })
        );
    }

    #[tokio::test]
    async fn test_statistics_requires_both_dates() {
        let (app, _pool) = test_app().await;

        let (status, json) = get_json(&app, &format!("{STATS}?start_time=2024-01-01")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "invalid parameters: end_time is required");
    }

    #[tokio::test]
    async fn test_statistics_query_failure_is_reported() {
        let (app, pool) = test_app().await;
        sqlx::query("DROP TABLE tokens").execute(&pool).await.unwrap();

        let (status, json) = get_json(
            &app,
            &format!("{STATS}?start_time=2024-01-01&end_time=2024-01-31"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        let message = json["message"].as_str().unwrap();
        assert!(message.contains("no such table: tokens"), "{json}");
        assert!(!message.starts_with("Database error"), "{json}");
    }

    #[tokio::test]
    async fn test_custom_admin_base_path() {
        let (app, pool) = test_app_with_config(
            r#"
[server]
admin_base_path = "/api/admin"
"#,
        )
        .await;
        seed(&pool).await;

        let (status, _) = get_json(
            &app,
            "/api/admin/billing-tags/statistics?start_time=2024-01-01&end_time=2024-01-31",
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = get_json(
            &app,
            &format!("{STATS}?start_time=2024-01-01&end_time=2024-01-31"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // ============================================================================
    // Export Tests
    // ============================================================================

    #[cfg(feature = "csv-export")]
    #[tokio::test]
    async fn test_export_csv() {
        let (app, pool) = test_app().await;
        seed(&pool).await;

        let response = get(
            &app,
            &format!("{STATS}/export?start_time=2024-01-01&end_time=2024-01-31"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/csv; charset=utf-8"
        );
        assert_eq!(
            response.headers()["content-disposition"],
            "attachment; filename=billing_tag_stats_2024-01-01_2024-01-31.csv"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.starts_with(&[0xEF, 0xBB, 0xBF]));

        let text = std::str::from_utf8(&body[3..]).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "计费标签,请求次数,额度消耗,输入Tokens,输出Tokens,请求时长(ms)",
                "team-research,2,800,80,160,2000",
                "vip,1,200,20,40,400",
                "default,1,100,10,20,300",
            ]
        );
    }

    #[cfg(feature = "csv-export")]
    #[tokio::test]
    async fn test_export_csv_english_header() {
        let (app, _pool) = test_app_with_config(
            r#"
[reporting]
csv_header_locale = "en"
"#,
        )
        .await;

        let response = get(
            &app,
            &format!("{STATS}/export?start_time=2024-01-01&end_time=2024-01-31"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = std::str::from_utf8(&body[3..]).unwrap();
        assert_eq!(
            text,
            "Billing Tag,Request Count,Quota,Prompt Tokens,Completion Tokens,Request Time (ms)\n"
        );
    }

    #[cfg(feature = "csv-export")]
    #[tokio::test]
    async fn test_export_rejects_malformed_date() {
        let (app, _pool) = test_app().await;

        let (status, json) = get_json(
            &app,
            &format!("{STATS}/export?start_time=2024-01-01&end_time=2024-1-31"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json["message"],
            "invalid end_time format, expected YYYY-MM-DD"
        );
    }

    #[cfg(feature = "csv-export")]
    #[tokio::test]
    async fn test_export_query_failure_is_json_envelope() {
        let (app, pool) = test_app().await;
        sqlx::query("DROP TABLE logs").execute(&pool).await.unwrap();

        let response = get(
            &app,
            &format!("{STATS}/export?start_time=2024-01-01&end_time=2024-01-31"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()["content-type"]
                .to_str()
                .unwrap()
                .starts_with("application/json")
        );
        assert!(response.headers().get("content-disposition").is_none());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert!(
            json["message"].as_str().unwrap().contains("no such table: logs"),
            "{json}"
        );
    }
}
