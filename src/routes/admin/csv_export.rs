//! CSV export for billing tag statistics
//!
//! The document is sent as a chunked body: the first chunk carries the UTF-8 byte
//! order mark (so spreadsheet tools detect the encoding) and the header row, and
//! each statistic row follows as its own chunk.

use axum::{
    body::Body,
    http::header,
    response::{IntoResponse, Response},
};
use bytes::{BufMut, Bytes, BytesMut};
use csv::{Terminator, WriterBuilder};
use futures::stream;

use super::AdminError;
use crate::{config::CsvHeaderLocale, models::BillingTagStatistic};

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Error type for CSV export operations
#[derive(Debug, thiserror::Error)]
#[error("CSV export error: {0}")]
pub struct CsvExportError(String);

impl From<CsvExportError> for AdminError {
    fn from(err: CsvExportError) -> Self {
        AdminError::CsvWrite(err.0)
    }
}

/// Streaming CSV response that sets download headers
pub struct CsvResponse {
    pub body: Body,
    pub filename: String,
}

impl IntoResponse for CsvResponse {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename={}", self.filename),
                ),
            ],
            self.body,
        )
            .into_response()
    }
}

/// Download filename for a report over `[start, end]`.
pub fn export_filename(start: &str, end: &str) -> String {
    format!("billing_tag_stats_{start}_{end}.csv")
}

/// Encode one CSV record, including its line terminator.
fn encode_record<I, T>(fields: I) -> Result<Bytes, CsvExportError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    wtr.write_record(fields)
        .map_err(|e| CsvExportError(e.to_string()))?;
    wtr.into_inner()
        .map(Bytes::from)
        .map_err(|e| CsvExportError(e.to_string()))
}

/// BOM followed by the header row.
fn preamble(locale: CsvHeaderLocale) -> Result<Bytes, CsvExportError> {
    let header = encode_record(locale.labels())?;
    let mut buf = BytesMut::with_capacity(UTF8_BOM.len() + header.len());
    buf.put_slice(UTF8_BOM);
    buf.put(header);
    Ok(buf.freeze())
}

fn statistic_record(stat: &BillingTagStatistic) -> Result<Bytes, CsvExportError> {
    encode_record([
        stat.billing_tag.clone(),
        stat.request_count.to_string(),
        stat.quota.to_string(),
        stat.prompt_tokens.to_string(),
        stat.completion_tokens.to_string(),
        stat.request_time.to_string(),
    ])
}

/// Build the chunked CSV body for a set of statistics.
///
/// The header is encoded eagerly so a failure there is reported as an error
/// response; a row that fails to encode ends the stream with an error.
pub fn statistics_csv_body(
    statistics: Vec<BillingTagStatistic>,
    locale: CsvHeaderLocale,
) -> Result<Body, CsvExportError> {
    let first = preamble(locale)?;
    let rows = statistics.into_iter().map(|stat| {
        statistic_record(&stat).inspect_err(|e| {
            tracing::error!(error = %e, billing_tag = %stat.billing_tag, "Aborting CSV stream");
        })
    });
    let chunks = std::iter::once(Ok(first)).chain(rows);
    Ok(Body::from_stream(stream::iter(chunks)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(tag: &str, count: i64, quota: i64) -> BillingTagStatistic {
        BillingTagStatistic {
            billing_tag: tag.to_string(),
            request_count: count,
            quota,
            prompt_tokens: 11,
            completion_tokens: 22,
            request_time: 333,
        }
    }

    async fn collect(body: Body) -> Vec<u8> {
        axum::body::to_bytes(body, usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_two_rows_produce_three_lines() {
        let body = statistics_csv_body(
            vec![stat("team-a", 5, 900), stat("default", 2, 100)],
            CsvHeaderLocale::default(),
        )
        .unwrap();
        let bytes = collect(body).await;

        assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));
        let text = std::str::from_utf8(&bytes[3..]).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in &lines {
            assert_eq!(line.split(',').count(), 6, "{line}");
        }
        assert_eq!(
            lines[0],
            "计费标签,请求次数,额度消耗,输入Tokens,输出Tokens,请求时长(ms)"
        );
        assert_eq!(lines[1], "team-a,5,900,11,22,333");
        assert_eq!(lines[2], "default,2,100,11,22,333");
    }

    #[tokio::test]
    async fn test_empty_statistics_is_header_only() {
        let body = statistics_csv_body(Vec::new(), CsvHeaderLocale::En).unwrap();
        let bytes = collect(body).await;
        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        assert_eq!(
            text,
            "Billing Tag,Request Count,Quota,Prompt Tokens,Completion Tokens,Request Time (ms)\n"
        );
    }

    #[tokio::test]
    async fn test_tags_with_delimiters_are_quoted() {
        let body =
            statistics_csv_body(vec![stat("ops, \"core\"", 1, 1)], CsvHeaderLocale::En).unwrap();
        let bytes = collect(body).await;
        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert_eq!(row, r#""ops, ""core""",1,1,11,22,333"#);
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(
            export_filename("2024-01-01", "2024-01-31"),
            "billing_tag_stats_2024-01-01_2024-01-31.csv"
        );
    }
}
