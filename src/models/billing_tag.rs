use serde::{Deserialize, Serialize};

/// Discriminator value of completion-type (consumption) events in the usage log.
/// Only these events are counted by the billing tag reports.
pub const LOG_TYPE_CONSUME: i64 = 2;

/// Aggregated usage for one resolved billing tag.
///
/// The billing tag is the token's explicit `billing_tag` setting when set and
/// non-empty, otherwise the owning user's group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct BillingTagStatistic {
    /// Resolved billing tag
    #[cfg_attr(feature = "utoipa", schema(example = "team-research"))]
    pub billing_tag: String,
    /// Number of completion requests
    pub request_count: i64,
    /// Quota consumed, in the usage log's quota unit
    pub quota: i64,
    /// Input tokens
    pub prompt_tokens: i64,
    /// Output tokens
    pub completion_tokens: i64,
    /// Cumulative request time in milliseconds
    pub request_time: i64,
}

/// Request count for one (billing tag, model) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct ModelUsageByBillingTag {
    /// Resolved billing tag
    pub billing_tag: String,
    /// Model name as recorded in the usage log
    #[cfg_attr(feature = "utoipa", schema(example = "gpt-4o-mini"))]
    pub model_name: String,
    /// Number of completion requests
    pub request_count: i64,
}
