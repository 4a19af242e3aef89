//! Verification oracle for injected field text.
//!
//! Every stage that writes text into a page field re-reads the field and
//! routes the comparison through [`matches`], so all platforms share one
//! correctness criterion. The check is deliberately a prefix-containment
//! test: rich-text editors decorate, wrap, and re-flow injected content, so
//! exact equality would reject perfectly good fills.

/// Prefix length compared for short, title-like fields.
pub const TITLE_PREFIX_LEN: usize = 10;

/// Prefix length compared for long, body-like fields.
pub const BODY_PREFIX_LEN: usize = 40;

/// Class of field under verification; selects the prefix constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    Title,
    Body,
}

impl FieldClass {
    pub fn prefix_len(self) -> usize {
        match self {
            FieldClass::Title => TITLE_PREFIX_LEN,
            FieldClass::Body => BODY_PREFIX_LEN,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FieldClass::Title => "title",
            FieldClass::Body => "body",
        }
    }
}

/// Decide whether a claimed field mutation actually happened.
///
/// Returns true iff `actual.trim()` is non-empty and contains the prefix of
/// `expected` of length `min(K, len(expected))` where `K` is the per-class
/// constant. Pure function; no side effects.
pub fn matches(expected: &str, actual: &str, class: FieldClass) -> bool {
    let trimmed = actual.trim();
    if trimmed.is_empty() {
        return false;
    }

    let take = class.prefix_len().min(expected.chars().count());
    let prefix: String = expected.chars().take(take).collect();
    trimmed.contains(&prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_actual_never_matches() {
        assert!(!matches("Hello world", "", FieldClass::Title));
        assert!(!matches("Hello world", "   \n\t ", FieldClass::Title));
    }

    #[test]
    fn short_expected_uses_its_full_length() {
        // expected shorter than the title constant: the whole string is the prefix.
        assert!(matches("Hi", "Hi there", FieldClass::Title));
        assert!(!matches("Hi", "bye", FieldClass::Title));
    }

    #[test]
    fn long_expected_is_truncated_to_class_prefix() {
        let expected = "A headline that is much longer than the prefix window";
        // first 10 chars: "A headline"
        assert!(matches(expected, "A headline (draft)", FieldClass::Title));
        assert!(!matches(
            expected,
            "A headlin_", // 10th char differs
            FieldClass::Title
        ));
    }

    #[test]
    fn body_class_compares_a_longer_prefix() {
        let expected = "0123456789012345678901234567890123456789XYZ";
        let first_forty = &expected[..40];
        assert!(matches(expected, first_forty, FieldClass::Body));
        // Title class would already pass on the first 10 characters.
        assert!(matches(expected, &expected[..10], FieldClass::Title));
        assert!(!matches(expected, &expected[..10], FieldClass::Body));
    }

    #[test]
    fn containment_tolerates_editor_decoration() {
        assert!(matches(
            "My headline",
            "  ✦ My headline ✦ (autosaved)  ",
            FieldClass::Title
        ));
    }

    #[test]
    fn prefix_is_measured_in_chars_not_bytes() {
        let expected = "héllo wörld extra"; // multi-byte chars near the cut
        assert!(matches(expected, "héllo wörl", FieldClass::Title));
    }
}
