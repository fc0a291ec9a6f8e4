//! Styled text: plain text plus overlapping style ranges.
//!
//! A [`Text`] carries a multiset of half-open `[start, end)` ranges measured
//! in characters. Ranges may nest or overlap freely; exporters decide how
//! to render conflicting styles.
//!
//! # Resolution
//!
//! The *most specific* style at a position is the covering range with the
//! smallest span. When two covering ranges have the same span, the one
//! marked last wins.
//!
//! ```rust,ignore
//! use uniseg_core::Text;
//!
//! let text = Text::new("abc").mark(0, 1, "bold")?.mark(1, 3, "italic")?;
//! assert_eq!(text.most_style_at(0), Some("bold"));
//! assert_eq!(text.most_style_at(2), Some("italic"));
//! ```

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::{UnisegError, UnisegResult};

// ============================================================================
// StyleRange
// ============================================================================

/// A tagged span over a text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleRange {
    /// First covered character (inclusive).
    pub start: usize,
    /// End character (exclusive).
    pub end: usize,
    /// Style name, e.g. `bold` or `link`.
    pub style: String,
    /// Optional style parameter, e.g. the URL of a `link`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

impl StyleRange {
    /// Creates a range without a parameter.
    pub fn new(start: usize, end: usize, style: impl Into<String>) -> Self {
        Self {
            start,
            end,
            style: style.into(),
            param: None,
        }
    }

    /// Attaches a parameter to this range.
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    /// Number of characters covered.
    pub fn span(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if `position` falls inside this range.
    pub fn covers(&self, position: usize) -> bool {
        self.start <= position && position < self.end
    }

    /// Renders `style` or `style:param`.
    pub fn qualified(&self) -> String {
        match &self.param {
            Some(param) => format!("{}:{param}", self.style),
            None => self.style.clone(),
        }
    }

    fn validate(&self, len: usize) -> UnisegResult<()> {
        if self.start < self.end && self.end <= len {
            Ok(())
        } else {
            Err(UnisegError::InvalidRange {
                start: self.start,
                end: self.end,
                len,
            })
        }
    }
}

// ============================================================================
// Text
// ============================================================================

/// Text content with style annotations.
///
/// Deserialization validates every range like [`Text::with_styles`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawText")]
pub struct Text {
    /// The raw text.
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    styles: Vec<StyleRange>,
}

/// Unchecked wire form of [`Text`].
#[derive(Deserialize)]
struct RawText {
    text: String,
    #[serde(default)]
    styles: Vec<StyleRange>,
}

impl TryFrom<RawText> for Text {
    type Error = UnisegError;

    fn try_from(raw: RawText) -> UnisegResult<Self> {
        Self::with_styles(raw.text, raw.styles)
    }
}

/// A maximal run of characters sharing the same active styles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRun<'a> {
    /// Character offset of the run.
    pub start: usize,
    /// The text of the run.
    pub text: &'a str,
    /// Covering styles, innermost first.
    pub styles: Vec<&'a StyleRange>,
}

impl Text {
    /// Creates unstyled text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            styles: Vec::new(),
        }
    }

    /// Creates text with a validated set of ranges.
    pub fn with_styles(
        text: impl Into<String>,
        styles: impl IntoIterator<Item = StyleRange>,
    ) -> UnisegResult<Self> {
        let mut this = Self::new(text);
        this.set_styles(styles)?;
        Ok(this)
    }

    /// Returns the text as a string slice.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Returns true if the text is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns true if any style range is attached.
    pub fn is_styled(&self) -> bool {
        !self.styles.is_empty()
    }

    /// Returns all ranges in insertion order.
    pub fn styles(&self) -> &[StyleRange] {
        &self.styles
    }

    /// Marks `[start, end)` with `style` (builder form).
    pub fn mark(self, start: usize, end: usize, style: impl Into<String>) -> UnisegResult<Self> {
        self.mark_range(StyleRange::new(start, end, style))
    }

    /// Marks `[start, end)` with `style` and a parameter (builder form).
    pub fn mark_with(
        self,
        start: usize,
        end: usize,
        style: impl Into<String>,
        param: impl Into<String>,
    ) -> UnisegResult<Self> {
        self.mark_range(StyleRange::new(start, end, style).with_param(param))
    }

    /// Appends a prepared range (builder form).
    pub fn mark_range(mut self, range: StyleRange) -> UnisegResult<Self> {
        self.push_style(range)?;
        Ok(self)
    }

    /// Appends a range in place.
    ///
    /// Identical ranges are kept; the range set is a multiset.
    pub fn push_style(&mut self, range: StyleRange) -> UnisegResult<&mut Self> {
        range.validate(self.char_len())?;
        self.styles.push(range);
        Ok(self)
    }

    /// Replaces every range at once. On error the old ranges are kept.
    pub fn set_styles(&mut self, styles: impl IntoIterator<Item = StyleRange>) -> UnisegResult<()> {
        let len = self.char_len();
        let styles: Vec<StyleRange> = styles.into_iter().collect();
        for range in &styles {
            range.validate(len)?;
        }
        self.styles = styles;
        Ok(())
    }

    /// Drops every range.
    pub fn clear_styles(&mut self) {
        self.styles.clear();
    }

    /// Returns the most specific range covering `position`.
    pub fn style_at(&self, position: usize) -> Option<&StyleRange> {
        // `min_by_key` keeps the first minimum, so scan newest first.
        self.styles
            .iter()
            .rev()
            .filter(|range| range.covers(position))
            .min_by_key(|range| range.span())
    }

    /// Name of the most specific style covering `position`.
    pub fn most_style_at(&self, position: usize) -> Option<&str> {
        self.style_at(position).map(|range| range.style.as_str())
    }

    /// All ranges covering `position`, innermost first.
    pub fn styles_at(&self, position: usize) -> Vec<&StyleRange> {
        let mut covering: Vec<(usize, &StyleRange)> = self
            .styles
            .iter()
            .enumerate()
            .filter(|(_, range)| range.covers(position))
            .collect();
        covering.sort_by(|(ia, a), (ib, b)| a.span().cmp(&b.span()).then(ib.cmp(ia)));
        covering.into_iter().map(|(_, range)| range).collect()
    }

    /// The most specific style at the first marked position.
    pub fn extract_most_style(&self) -> Option<&str> {
        let first = self.styles.iter().map(|range| range.start).min()?;
        self.most_style_at(first)
    }

    /// Splits the text into runs with identical covering styles.
    pub fn runs(&self) -> Vec<StyledRun<'_>> {
        let len = self.char_len();
        let mut bounds: Vec<usize> = vec![0, len];
        for range in &self.styles {
            bounds.push(range.start);
            bounds.push(range.end);
        }
        bounds.sort_unstable();
        bounds.dedup();

        let offsets = self.byte_offsets();
        bounds
            .windows(2)
            .filter(|w| w[0] < w[1])
            .map(|w| StyledRun {
                start: w[0],
                text: &self.text[offsets[w[0]]..offsets[w[1]]],
                styles: self.styles_at(w[0]),
            })
            .collect()
    }

    /// Returns the characters in `[start, end)` as a string slice.
    pub fn slice_chars(&self, start: usize, end: usize) -> Option<&str> {
        let offsets = self.byte_offsets();
        if start > end || end >= offsets.len() {
            return None;
        }
        Some(&self.text[offsets[start]..offsets[end]])
    }

    // Byte offset of every char boundary, including the end.
    fn byte_offsets(&self) -> Vec<usize> {
        self.text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(self.text.len()))
            .collect()
    }
}

impl Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for Text {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Text {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_specific_style() {
        let text = Text::new("abc")
            .mark(0, 1, "bold")
            .unwrap()
            .mark(1, 3, "italic")
            .unwrap();
        assert_eq!(text.most_style_at(0), Some("bold"));
        assert_eq!(text.most_style_at(2), Some("italic"));
        assert_eq!(text.extract_most_style(), Some("bold"));
    }

    #[test]
    fn test_nested_innermost_first() {
        let text = Text::new("hello world")
            .mark(0, 11, "bold")
            .unwrap()
            .mark(6, 11, "italic")
            .unwrap()
            .mark(6, 8, "code")
            .unwrap();
        let names: Vec<&str> = text
            .styles_at(7)
            .iter()
            .map(|r| r.style.as_str())
            .collect();
        assert_eq!(names, vec!["code", "italic", "bold"]);
        assert_eq!(text.most_style_at(2), Some("bold"));
        assert_eq!(text.most_style_at(11), None);
    }

    #[test]
    fn test_equal_span_last_wins() {
        let text = Text::new("abcd")
            .mark(0, 2, "bold")
            .unwrap()
            .mark(0, 2, "underline")
            .unwrap();
        assert_eq!(text.most_style_at(1), Some("underline"));
        assert_eq!(text.styles_at(0)[0].style, "underline");
    }

    #[test]
    fn test_empty_range_rejected() {
        let err = Text::new("abc").mark(1, 1, "bold").unwrap_err();
        assert!(matches!(
            err,
            UnisegError::InvalidRange {
                start: 1,
                end: 1,
                len: 3
            }
        ));
        assert!(Text::new("abc").mark(2, 4, "bold").is_err());
        assert!(Text::new("").mark(0, 1, "bold").is_err());
    }

    #[test]
    fn test_duplicate_ranges_retained() {
        let text = Text::new("abc")
            .mark(0, 2, "bold")
            .unwrap()
            .mark(0, 2, "bold")
            .unwrap();
        assert_eq!(text.styles().len(), 2);
    }

    #[test]
    fn test_set_styles_is_atomic() {
        let mut text = Text::new("abc").mark(0, 1, "bold").unwrap();
        let result = text.set_styles([StyleRange::new(0, 2, "i"), StyleRange::new(0, 9, "u")]);
        assert!(result.is_err());
        assert_eq!(text.styles(), &[StyleRange::new(0, 1, "bold")]);
    }

    #[test]
    fn test_runs_and_char_offsets() {
        let text = Text::new("héllo!")
            .mark(1, 5, "bold")
            .unwrap()
            .mark_with(0, 2, "link", "https://example.com")
            .unwrap();
        let runs = text.runs();
        let pieces: Vec<&str> = runs.iter().map(|r| r.text).collect();
        assert_eq!(pieces, vec!["h", "é", "llo", "!"]);
        assert_eq!(runs[1].styles.len(), 2);
        assert_eq!(runs[1].styles[0].qualified(), "link:https://example.com");
        assert!(runs[3].styles.is_empty());
        assert_eq!(text.slice_chars(1, 3), Some("él"));
    }

    #[test]
    fn test_deserialize_validates_ranges() {
        let err = serde_json::from_str::<Text>(
            r#"{"text":"a","styles":[{"start":0,"end":5,"style":"b"}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid style range [0, 5)"), "{err}");

        let text: Text = serde_json::from_str(
            r#"{"text":"ab","styles":[{"start":0,"end":2,"style":"bold"}]}"#,
        )
        .unwrap();
        assert_eq!(text.runs().len(), 1);
        assert_eq!(serde_json::from_str::<Text>(r#"{"text":"x"}"#).unwrap(), Text::new("x"));
    }
}
