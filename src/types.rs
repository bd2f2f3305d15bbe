use std::collections::BTreeMap;

use utoipa::ToSchema;

/// Mock per-user usage. `completions` is always the sum of
/// `language_breakdown`.
#[derive(
    serde::Serialize, serde::Deserialize, ToSchema, Debug, Clone, PartialEq,
)]
pub struct UsageRecord {
    #[schema(example = "alice@example.com")]
    pub user: String,
    pub completions: u32,
    #[schema(example = 12.5)]
    pub active_hours: f64,
    pub language_breakdown: BTreeMap<String, u32>,
    /// RFC 3339.
    pub last_seen: String,
}

#[derive(serde::Serialize, serde::Deserialize, ToSchema, Debug, Clone)]
pub struct UsageReport {
    #[schema(example = "success")]
    pub status: String,
    pub data: Vec<UsageRecord>,
    /// RFC 3339.
    pub timestamp: String,
}

impl UsageReport {
    #[must_use]
    pub fn success(data: Vec<UsageRecord>, timestamp: String) -> Self {
        Self {
            status: "success".to_string(),
            data,
            timestamp,
        }
    }
}

#[derive(
    serde::Serialize, serde::Deserialize, ToSchema, Debug, Clone, PartialEq,
)]
pub struct HealthReport {
    #[schema(example = "healthy")]
    pub status: String,
}

impl HealthReport {
    #[must_use]
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, ToSchema, Debug, Clone)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}
