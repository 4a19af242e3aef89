use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Hard cap on tags accepted by the supported platforms; extra tags are
/// silently truncated rather than rejected.
pub const MAX_TAGS: usize = 5;

/// Metadata key holding an attached media URL, when present.
pub const MEDIA_URL_KEY: &str = "mediaUrl";

/// Content platforms with a scripted publish workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Medium,
    Substack,
}

impl Platform {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "medium" => Some(Platform::Medium),
            "substack" => Some(Platform::Substack),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Platform::Medium => "medium",
            Platform::Substack => "substack",
        }
    }
}

/// One piece of publishable content. Title and body are mandatory and
/// non-empty; everything else is optional platform dressing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PublishContent {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Open metadata map, e.g. an attached media URL under [`MEDIA_URL_KEY`].
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl PublishContent {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        PublishContent {
            title: title.into(),
            body: body.into(),
            ..PublishContent::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty() && !self.body.trim().is_empty()
    }

    /// Tags capped to the platform maximum, empty entries dropped.
    pub fn capped_tags(&self) -> Vec<&str> {
        self.tags
            .iter()
            .map(String::as_str)
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .take(MAX_TAGS)
            .collect()
    }

    pub fn media_url(&self) -> Option<&str> {
        self.metadata
            .get(MEDIA_URL_KEY)
            .map(String::as_str)
            .filter(|url| !url.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_truncated_to_platform_cap() {
        let mut content = PublishContent::new("T", "B");
        content.tags = (0..8).map(|i| format!("tag-{i}")).collect();
        let capped = content.capped_tags();
        assert_eq!(capped.len(), MAX_TAGS);
        assert_eq!(capped[0], "tag-0");
        assert_eq!(capped[4], "tag-4");
    }

    #[test]
    fn blank_tags_are_dropped_before_capping() {
        let mut content = PublishContent::new("T", "B");
        content.tags = vec!["  ".into(), "rust".into(), "".into()];
        assert_eq!(content.capped_tags(), vec!["rust"]);
    }

    #[test]
    fn completeness_requires_title_and_body() {
        assert!(PublishContent::new("T", "B").is_complete());
        assert!(!PublishContent::new(" ", "B").is_complete());
        assert!(!PublishContent::new("T", "").is_complete());
    }

    #[test]
    fn media_url_reads_metadata_key() {
        let mut content = PublishContent::new("T", "B");
        assert!(content.media_url().is_none());
        content
            .metadata
            .insert(MEDIA_URL_KEY.to_string(), "https://img.example/x.png".to_string());
        assert_eq!(content.media_url(), Some("https://img.example/x.png"));
    }

    #[test]
    fn platform_parse_is_case_insensitive() {
        assert_eq!(Platform::parse("Medium"), Some(Platform::Medium));
        assert_eq!(Platform::parse(" SUBSTACK "), Some(Platform::Substack));
        assert_eq!(Platform::parse("ghost"), None);
    }
}
