//! Follower count extraction.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::CountExtractor;
use crate::writer::FollowerCount;

/// Marker immediately before the count.
pub const FOLLOWED_BY_MARKER: &str = r#""edge_followed_by":{"count":"#;

/// Marker immediately after the count.
pub const VIEWER_MARKER: &str = r#"},"followed_by_viewer""#;

static PROFILE_PAGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    build_pattern(FOLLOWED_BY_MARKER, VIEWER_MARKER).expect("profile page pattern is valid")
});

fn build_pattern(before: &str, after: &str) -> Result<Regex, regex_lite::Error> {
    Regex::new(&format!(
        "{}(.+?){}",
        regex_lite::escape(before),
        regex_lite::escape(after)
    ))
}

/// Captures the text between two adjacent JSON field markers.
///
/// The capture is lazy and does not span lines, so the first complete
/// `before ... after` pair on a line wins.
#[derive(Debug, Clone)]
pub struct MarkerPatternExtractor {
    name: String,
    pattern: Regex,
}

impl MarkerPatternExtractor {
    /// Extractor for arbitrary markers.
    pub fn new(name: impl Into<String>, before: &str, after: &str) -> Result<Self, regex_lite::Error> {
        Ok(Self {
            name: name.into(),
            pattern: build_pattern(before, after)?,
        })
    }

    /// Extractor for the embedded profile JSON
    /// (`"edge_followed_by":{"count":N},"followed_by_viewer"`).
    pub fn profile_page() -> Self {
        Self {
            name: "edge_followed_by/v1".to_string(),
            pattern: PROFILE_PAGE_PATTERN.clone(),
        }
    }
}

impl Default for MarkerPatternExtractor {
    fn default() -> Self {
        Self::profile_page()
    }
}

impl CountExtractor for MarkerPatternExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, body: &str) -> Option<FollowerCount> {
        self.pattern
            .captures(body)
            .and_then(|caps| caps.get(1))
            .map(|m| FollowerCount::new(m.as_str()))
    }
}
