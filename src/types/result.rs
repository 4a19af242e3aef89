use serde::{Deserialize, Serialize};

/// Structured outcome of one publish attempt. Failures never escape the
/// workflow boundary as errors; they are folded into this shape instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PublishResult {
    pub success: bool,
    /// Confirmed post URL; present only on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Platform-specific identifier extracted from the confirmed URL.
    /// Absence of a match is tolerated, so this is optional even on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    /// Error classification name on failure (e.g. `PublishNotConfirmedError`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Best-effort diagnostic screenshot captured at the point of failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<Vec<u8>>,
}

impl PublishResult {
    pub fn published(url: String, post_id: Option<String>) -> Self {
        PublishResult {
            success: true,
            url: Some(url),
            post_id,
            ..PublishResult::default()
        }
    }

    pub fn failed(classification: &str, screenshot: Option<Vec<u8>>) -> Self {
        PublishResult {
            success: false,
            error: Some(classification.to_string()),
            screenshot,
            ..PublishResult::default()
        }
    }
}

/// Outcome of a credential verification request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct VerifyOutcome {
    pub success: bool,
    /// Display name or handle of the authenticated user, when it could be
    /// scraped. A scrape miss does not fail the verification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Engagement counters scraped from a published post.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactions: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<u64>,
}
