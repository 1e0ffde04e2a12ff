use serde::{Deserialize, Serialize};

/// Report rendering configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportingConfig {
    /// Language of the CSV export header row. The Chinese labels are the ones
    /// the admin UI has always downloaded.
    #[serde(default)]
    pub csv_header_locale: CsvHeaderLocale,
}

/// Header label set for the CSV export.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CsvHeaderLocale {
    En,
    #[default]
    Zh,
}

impl CsvHeaderLocale {
    /// Column labels in export order: tag, request count, quota,
    /// prompt tokens, completion tokens, request time.
    pub fn labels(&self) -> [&'static str; 6] {
        match self {
            CsvHeaderLocale::En => [
                "Billing Tag",
                "Request Count",
                "Quota",
                "Prompt Tokens",
                "Completion Tokens",
                "Request Time (ms)",
            ],
            CsvHeaderLocale::Zh => [
                "计费标签",
                "请求次数",
                "额度消耗",
                "输入Tokens",
                "输出Tokens",
                "请求时长(ms)",
            ],
        }
    }
}
