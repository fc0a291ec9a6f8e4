//! Message templates with typed placeholders.
//!
//! A template is text (or a whole [`UniMessage`]) containing placeholders:
//!
//! - `{}` takes the next positional argument,
//! - `{0}` takes a positional argument by index,
//! - `{name}` takes a named argument,
//! - `{name:hint}` converts the argument with a hint such as `at` or `image`.
//!
//! `{{` and `}}` produce literal braces. Text produced by the template is
//! merged into as few text segments as possible; non-text segments from the
//! template itself or from arguments are kept in place.
//!
//! ```rust,ignore
//! let tpl = Template::new("Hello {user:at}, look: {0:image}")?;
//! let msg = tpl.format(
//!     &TemplateArgs::new()
//!         .arg("https://example.com/cat.png")
//!         .named("user", "123"),
//! )?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::TemplateError;
use crate::message::UniMessage;
use crate::segment::{Media, Segment, SegmentData, SegmentKind};

// ============================================================================
// Arguments
// ============================================================================

/// A value substituted into a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateArg {
    Text(String),
    Segment(Segment),
    Message(UniMessage),
}

impl TemplateArg {
    /// Plain-text rendering of the argument.
    pub fn to_text(&self) -> String {
        match self {
            TemplateArg::Text(text) => text.clone(),
            TemplateArg::Segment(segment) => segment.to_string(),
            TemplateArg::Message(message) => message.to_string(),
        }
    }

    fn into_segments(self) -> Vec<Segment> {
        match self {
            TemplateArg::Text(text) => vec![Segment::text(text)],
            TemplateArg::Segment(segment) => vec![segment],
            TemplateArg::Message(message) => message.into_segments(),
        }
    }
}

impl From<&str> for TemplateArg {
    fn from(value: &str) -> Self {
        TemplateArg::Text(value.to_owned())
    }
}

impl From<String> for TemplateArg {
    fn from(value: String) -> Self {
        TemplateArg::Text(value)
    }
}

impl From<Segment> for TemplateArg {
    fn from(value: Segment) -> Self {
        TemplateArg::Segment(value)
    }
}

impl From<UniMessage> for TemplateArg {
    fn from(value: UniMessage) -> Self {
        TemplateArg::Message(value)
    }
}

macro_rules! impl_display_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for TemplateArg {
                fn from(value: $ty) -> Self {
                    TemplateArg::Text(value.to_string())
                }
            }
        )*
    };
}

impl_display_arg!(i32, i64, u32, u64, usize, f64, bool, char);

/// Positional and named arguments for [`Template::format`].
#[derive(Debug, Clone, Default)]
pub struct TemplateArgs {
    positional: Vec<TemplateArg>,
    named: HashMap<String, TemplateArg>,
}

impl TemplateArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<TemplateArg>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a named argument.
    pub fn named(mut self, name: impl Into<String>, value: impl Into<TemplateArg>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }
}

// ============================================================================
// Hints
// ============================================================================

/// Converts an argument into segments.
pub type HintFn = Arc<dyn Fn(&TemplateArg) -> Result<Vec<Segment>, TemplateError> + Send + Sync>;

fn bad(hint: &str, reason: impl Into<String>) -> TemplateError {
    TemplateError::BadArgument {
        hint: hint.to_owned(),
        reason: reason.into(),
    }
}

// Text arguments become ids/urls; segments of the expected kind pass through.
fn builtin_hint(hint: &str, arg: &TemplateArg) -> Option<Result<Vec<Segment>, TemplateError>> {
    let expect = |kind: SegmentKind, make: &dyn Fn(&str) -> Segment| match arg {
        TemplateArg::Text(text) => Ok(vec![make(text.as_str())]),
        TemplateArg::Segment(segment) if segment.kind() == kind => Ok(vec![segment.clone()]),
        other => Err(bad(hint, format!("expected text or {kind}, got {}", other.to_text()))),
    };

    let result = match hint {
        "text" => Ok(vec![Segment::text(arg.to_text())]),
        "at" => expect(SegmentKind::At, &|id| Segment::at(id)),
        "at_role" => expect(SegmentKind::At, &|id| Segment::at_role(id)),
        "at_channel" => expect(SegmentKind::At, &|id| Segment::at_channel(id)),
        "emoji" => expect(SegmentKind::Emoji, &|id| Segment::emoji(id)),
        "image" => expect(SegmentKind::Image, &|url| Segment::image(Media::from_url(url))),
        "audio" => expect(SegmentKind::Audio, &|url| Segment::audio(Media::from_url(url))),
        "video" => expect(SegmentKind::Video, &|url| Segment::video(Media::from_url(url))),
        "file" => expect(SegmentKind::File, &|url| Segment::file(Media::from_url(url))),
        "reply" => expect(SegmentKind::Reply, &|id| Segment::reply(id)),
        _ => return None,
    };
    Some(result)
}

// ============================================================================
// Template
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Key {
    Auto,
    Index(usize),
    Name(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Auto => f.write_str("{}"),
            Key::Index(i) => write!(f, "{i}"),
            Key::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Literal(Segment),
    Placeholder { key: Key, hint: Option<String> },
}

/// A parsed message template.
#[derive(Clone, Default)]
pub struct Template {
    parts: Vec<Part>,
    hints: HashMap<String, HintFn>,
}

impl Template {
    /// Parses a text template.
    pub fn new(source: &str) -> Result<Self, TemplateError> {
        let mut parts = Vec::new();
        parse_text(source, &mut parts)?;
        Ok(Self {
            parts,
            hints: HashMap::new(),
        })
    }

    /// Parses placeholders inside the text segments of `message`.
    ///
    /// Non-text segments and text without braces are kept as they are;
    /// styled text containing placeholders loses its styles.
    pub fn from_message(message: &UniMessage) -> Result<Self, TemplateError> {
        let mut parts = Vec::new();
        for segment in message {
            match segment.as_text() {
                Some(text) if text.contains(['{', '}']) => parse_text(text, &mut parts)?,
                _ => parts.push(Part::Literal(segment.clone())),
            }
        }
        Ok(Self {
            parts,
            hints: HashMap::new(),
        })
    }

    /// Registers a custom hint, shadowing a built-in one of the same name.
    pub fn hint<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&TemplateArg) -> Result<Vec<Segment>, TemplateError> + Send + Sync + 'static,
    {
        self.hints.insert(name.into(), Arc::new(f));
        self
    }

    /// Substitutes `args` into the template.
    pub fn format(&self, args: &TemplateArgs) -> Result<UniMessage, TemplateError> {
        let mut out = Output::default();
        let mut auto = 0;

        for part in &self.parts {
            match part {
                Part::Literal(segment) => out.push(segment.clone()),
                Part::Placeholder { key, hint } => {
                    let arg = match key {
                        Key::Auto => {
                            auto += 1;
                            args.positional.get(auto - 1)
                        }
                        Key::Index(i) => args.positional.get(*i),
                        Key::Name(name) => args.named.get(name),
                    };
                    let arg = arg.ok_or_else(|| {
                        TemplateError::MissingArgument(match key {
                            Key::Auto => (auto - 1).to_string(),
                            _ => key.to_string(),
                        })
                    })?;
                    for segment in self.apply(hint.as_deref(), arg)? {
                        out.push(segment);
                    }
                }
            }
        }

        Ok(out.finish())
    }

    fn apply(&self, hint: Option<&str>, arg: &TemplateArg) -> Result<Vec<Segment>, TemplateError> {
        let Some(hint) = hint else {
            return Ok(arg.clone().into_segments());
        };
        if let Some(f) = self.hints.get(hint) {
            return f(arg);
        }
        builtin_hint(hint, arg).unwrap_or_else(|| Err(TemplateError::UnknownHint(hint.to_owned())))
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("parts", &self.parts)
            .field("hints", &self.hints.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl UniMessage {
    /// Parses this message as a template.
    pub fn template(&self) -> Result<Template, TemplateError> {
        Template::from_message(self)
    }
}

// Accumulates output, merging runs of unstyled text.
#[derive(Default)]
struct Output {
    segments: Vec<Segment>,
    pending: String,
}

impl Output {
    fn push(&mut self, segment: Segment) {
        match &segment.data {
            SegmentData::Text(text) if !text.is_styled() && segment.children.is_empty() => {
                self.pending.push_str(text.as_str());
            }
            _ => {
                self.flush();
                self.segments.push(segment);
            }
        }
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            self.segments.push(Segment::text(std::mem::take(&mut self.pending)));
        }
    }

    fn finish(mut self) -> UniMessage {
        self.flush();
        UniMessage::from_segments(self.segments)
    }
}

fn parse_text(text: &str, parts: &mut Vec<Part>) -> Result<(), TemplateError> {
    let mut literal = String::new();
    let mut chars = text.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        match ch {
            '{' if chars.peek().is_some_and(|&(_, c)| c == '{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek().is_some_and(|&(_, c)| c == '}') => {
                chars.next();
                literal.push('}');
            }
            '}' => return Err(TemplateError::UnmatchedBrace(offset)),
            '{' => {
                let mut inner = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    match c {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => return Err(TemplateError::Unclosed(offset)),
                        c => inner.push(c),
                    }
                }
                if !closed {
                    return Err(TemplateError::Unclosed(offset));
                }
                if !literal.is_empty() {
                    parts.push(Part::Literal(Segment::text(std::mem::take(&mut literal))));
                }
                parts.push(parse_placeholder(&inner));
            }
            c => literal.push(c),
        }
    }

    if !literal.is_empty() {
        parts.push(Part::Literal(Segment::text(literal)));
    }
    Ok(())
}

fn parse_placeholder(inner: &str) -> Part {
    let (key, hint) = match inner.split_once(':') {
        Some((key, hint)) => (key.trim(), Some(hint.trim())),
        None => (inner.trim(), None),
    };
    let key = if key.is_empty() {
        Key::Auto
    } else if let Ok(index) = key.parse() {
        Key::Index(index)
    } else {
        Key::Name(key.to_owned())
    };
    Part::Placeholder {
        key,
        hint: hint.filter(|h| !h.is_empty()).map(str::to_owned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_and_named() {
        let tpl = Template::new("{} and {1}, {name}!").unwrap();
        let msg = tpl
            .format(&TemplateArgs::new().arg("a").arg(2).named("name", "z"))
            .unwrap();
        assert_eq!(msg.len(), 1);
        assert_eq!(msg.extract_plain_text(), "a and 2, z!");
    }

    #[test]
    fn test_hints_produce_segments() {
        let tpl = Template::new("Hi {user:at} {0:image}").unwrap();
        let msg = tpl
            .format(
                &TemplateArgs::new()
                    .arg("https://a/b.png")
                    .named("user", "123"),
            )
            .unwrap();
        assert_eq!(msg[0], Segment::text("Hi "));
        assert_eq!(msg[1], Segment::at("123"));
        assert_eq!(msg[2], Segment::text(" "));
        assert_eq!(msg[3], Segment::image(Media::from_url("https://a/b.png")));
    }

    #[test]
    fn test_segment_and_message_args() {
        let tpl = Template::new("[{}|{}]").unwrap();
        let msg = tpl
            .format(
                &TemplateArgs::new()
                    .arg(Segment::at("1"))
                    .arg(UniMessage::text("x").with(Segment::at_all())),
            )
            .unwrap();
        assert_eq!(msg.to_string(), "[@1|x@everyone]");
        assert_eq!(msg.len(), 5);
    }

    #[test]
    fn test_escapes_and_errors() {
        let msg = Template::new("{{literal}}")
            .unwrap()
            .format(&TemplateArgs::new())
            .unwrap();
        assert_eq!(msg.extract_plain_text(), "{literal}");

        assert_eq!(Template::new("oops {").unwrap_err(), TemplateError::Unclosed(5));
        assert_eq!(Template::new("a } b").unwrap_err(), TemplateError::UnmatchedBrace(2));

        let tpl = Template::new("{missing}").unwrap();
        assert_eq!(
            tpl.format(&TemplateArgs::new()).unwrap_err(),
            TemplateError::MissingArgument("missing".into())
        );
        let tpl = Template::new("{0:nope}").unwrap();
        assert_eq!(
            tpl.format(&TemplateArgs::new().arg("x")).unwrap_err(),
            TemplateError::UnknownHint("nope".into())
        );
        let tpl = Template::new("{0:at}").unwrap();
        assert!(matches!(
            tpl.format(&TemplateArgs::new().arg(Segment::reply("1"))),
            Err(TemplateError::BadArgument { .. })
        ));
    }

    #[test]
    fn test_from_message_and_custom_hint() {
        let source = UniMessage::from(Segment::reply("9")).with("to {who:shout}");
        let tpl = source
            .template()
            .unwrap()
            .hint("shout", |arg| Ok(vec![Segment::text(arg.to_text().to_uppercase())]));
        let msg = tpl.format(&TemplateArgs::new().named("who", "bob")).unwrap();
        assert_eq!(msg[0], Segment::reply("9"));
        assert_eq!(msg[1], Segment::text("to BOB"));
    }
}
