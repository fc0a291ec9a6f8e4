//! The platform-neutral message container.
//!
//! [`UniMessage`] is an ordered sequence of [`Segment`]s. Insertion order is
//! preserved by every operation; adjacent text segments are never merged,
//! so each keeps its own style ranges.
//!
//! # Example
//!
//! ```rust,ignore
//! use uniseg_core::{Segment, SegmentKind, UniMessage};
//!
//! let mut msg = UniMessage::text("Hello ") + Segment::at("123") + "!";
//! assert!(msg.has(SegmentKind::At));
//! assert_eq!(msg.get_kind(SegmentKind::Text, 1).and_then(Segment::as_text), Some("!"));
//! msg.remove_kind(SegmentKind::At, 0);
//! assert_eq!(msg.extract_plain_text(), "Hello !");
//! ```

use std::fmt::{self, Display};
use std::ops::{Add, AddAssign, Deref, Index, RangeBounds};

use serde::{Deserialize, Serialize};

use crate::segment::{Segment, SegmentKind};

/// An ordered sequence of universal segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniMessage {
    segments: Vec<Segment>,
}

impl UniMessage {
    /// Creates an empty message.
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Creates a message holding a single text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Self::from(Segment::text(text))
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    // --------------------------------
    // Building
    // --------------------------------

    /// Appends a segment.
    pub fn push(&mut self, segment: impl Into<Segment>) -> &mut Self {
        self.segments.push(segment.into());
        self
    }

    /// Appends a segment (builder form).
    pub fn with(mut self, segment: impl Into<Segment>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Inserts a segment at `index`, shifting later segments right.
    pub fn insert(&mut self, index: usize, segment: impl Into<Segment>) {
        self.segments.insert(index, segment.into());
    }

    // --------------------------------
    // Positional access
    // --------------------------------

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Replaces the segment at `index`, returning the old one.
    pub fn set(&mut self, index: usize, segment: impl Into<Segment>) -> Option<Segment> {
        let slot = self.segments.get_mut(index)?;
        Some(std::mem::replace(slot, segment.into()))
    }

    /// Removes the segment at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Segment> {
        (index < self.segments.len()).then(|| self.segments.remove(index))
    }

    /// Copies a positional range into a new message.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Self {
        use std::ops::Bound;
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e + 1,
            Bound::Excluded(&e) => e,
            Bound::Unbounded => self.segments.len(),
        };
        let end = end.min(self.segments.len());
        let start = start.min(end);
        Self::from_segments(self.segments[start..end].to_vec())
    }

    // --------------------------------
    // Kind-based access
    // --------------------------------

    /// Returns true if any segment has `kind`.
    pub fn has(&self, kind: SegmentKind) -> bool {
        self.segments.iter().any(|seg| seg.kind() == kind)
    }

    /// Number of segments with `kind`.
    pub fn count(&self, kind: SegmentKind) -> usize {
        self.segments.iter().filter(|seg| seg.kind() == kind).count()
    }

    /// Position of the `nth` segment with `kind`.
    pub fn index_of(&self, kind: SegmentKind, nth: usize) -> Option<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, seg)| seg.kind() == kind)
            .nth(nth)
            .map(|(index, _)| index)
    }

    /// The `nth` segment with `kind`.
    pub fn get_kind(&self, kind: SegmentKind, nth: usize) -> Option<&Segment> {
        self.index_of(kind, nth).map(|index| &self.segments[index])
    }

    /// Replaces the `nth` segment with `kind`.
    pub fn set_kind(
        &mut self,
        kind: SegmentKind,
        nth: usize,
        segment: impl Into<Segment>,
    ) -> Option<Segment> {
        let index = self.index_of(kind, nth)?;
        self.set(index, segment)
    }

    /// Removes the `nth` segment with `kind`.
    pub fn remove_kind(&mut self, kind: SegmentKind, nth: usize) -> Option<Segment> {
        let index = self.index_of(kind, nth)?;
        self.remove(index)
    }

    /// All segments with `kind`, in order.
    pub fn select(&self, kind: SegmentKind) -> Self {
        self.filter(|seg| seg.kind() == kind)
    }

    /// All custom segments tagged `tag`, in order.
    pub fn select_custom(&self, tag: &str) -> Self {
        self.filter(|seg| seg.kind() == SegmentKind::Custom && seg.type_tag() == tag)
    }

    /// Returns true if every segment has `kind` (false when empty).
    pub fn only(&self, kind: SegmentKind) -> bool {
        !self.segments.is_empty() && self.segments.iter().all(|seg| seg.kind() == kind)
    }

    /// Keeps the segments whose kind is listed.
    pub fn include(&self, kinds: &[SegmentKind]) -> Self {
        self.filter(|seg| kinds.contains(&seg.kind()))
    }

    /// Drops the segments whose kind is listed.
    pub fn exclude(&self, kinds: &[SegmentKind]) -> Self {
        self.filter(|seg| !kinds.contains(&seg.kind()))
    }

    /// Keeps the segments matching `predicate`.
    pub fn filter(&self, predicate: impl Fn(&Segment) -> bool) -> Self {
        self.segments
            .iter()
            .filter(|seg| predicate(seg))
            .cloned()
            .collect()
    }

    // --------------------------------
    // Text
    // --------------------------------

    /// Concatenates the content of all text segments.
    pub fn extract_plain_text(&self) -> String {
        self.segments.iter().filter_map(Segment::as_text).collect()
    }

    /// Returns true if the message is made only of text segments.
    pub fn is_plain_text(&self) -> bool {
        self.only(SegmentKind::Text)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Trait implementations
// ══════════════════════════════════════════════════════════════════════════════

impl Deref for UniMessage {
    type Target = [Segment];

    fn deref(&self) -> &Self::Target {
        &self.segments
    }
}

impl Index<usize> for UniMessage {
    type Output = Segment;

    fn index(&self, index: usize) -> &Self::Output {
        &self.segments[index]
    }
}

impl Display for UniMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

macro_rules! impl_concat {
    ($($rhs:ty),* $(,)?) => {
        $(
            impl Add<$rhs> for UniMessage {
                type Output = UniMessage;

                fn add(mut self, rhs: $rhs) -> Self::Output {
                    self.segments.push(Segment::from(rhs));
                    self
                }
            }

            impl AddAssign<$rhs> for UniMessage {
                fn add_assign(&mut self, rhs: $rhs) {
                    self.segments.push(Segment::from(rhs));
                }
            }
        )*
    };
}

impl_concat!(Segment, &str, String, crate::style::Text);

impl Add<UniMessage> for UniMessage {
    type Output = UniMessage;

    fn add(mut self, rhs: UniMessage) -> Self::Output {
        self.segments.extend(rhs.segments);
        self
    }
}

impl AddAssign<UniMessage> for UniMessage {
    fn add_assign(&mut self, rhs: UniMessage) {
        self.segments.extend(rhs.segments);
    }
}

impl Extend<Segment> for UniMessage {
    fn extend<T: IntoIterator<Item = Segment>>(&mut self, iter: T) {
        self.segments.extend(iter);
    }
}

impl From<Vec<Segment>> for UniMessage {
    fn from(segments: Vec<Segment>) -> Self {
        Self { segments }
    }
}

impl From<Segment> for UniMessage {
    fn from(segment: Segment) -> Self {
        Self {
            segments: vec![segment],
        }
    }
}

impl From<&str> for UniMessage {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for UniMessage {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl FromIterator<Segment> for UniMessage {
    fn from_iter<T: IntoIterator<Item = Segment>>(iter: T) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for UniMessage {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}

impl<'a> IntoIterator for &'a UniMessage {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
