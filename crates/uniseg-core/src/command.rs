//! Splitting universal messages into command-line style tokens.
//!
//! Text segments are split with shell rules (whitespace, single and double
//! quotes, backslash escapes inside double quotes). Every other segment
//! becomes one opaque placeholder token such as `\x00AT_0`, which a
//! [`HandleRegistry`] maps back to the original segment.
//!
//! With the `command` feature, [`UniMessage::parse_command`] feeds the
//! tokens to a clap parser, and [`SegmentArg`] fields resolve placeholders
//! back into segments:
//!
//! ```rust,ignore
//! #[derive(clap::Parser)]
//! struct Ban {
//!     user: SegmentArg,
//!     #[arg(long, default_value_t = 60)]
//!     minutes: u32,
//! }
//!
//! let cmd: Ban = msg.parse_command()?;
//! let at = cmd.user.at().unwrap();
//! ```

use std::collections::HashMap;

use crate::message::UniMessage;
use crate::segment::{Segment, SegmentKind};

/// Leading byte of every placeholder token.
pub const PLACEHOLDER_PREFIX: char = '\x00';

/// Maps placeholder tokens back to the segments they replaced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandleRegistry {
    segments: HashMap<String, Segment>,
}

impl HandleRegistry {
    /// Returns the segment behind a placeholder token.
    pub fn resolve(&self, token: &str) -> Option<&Segment> {
        self.segments.get(token)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    fn register(&mut self, counters: &mut HashMap<SegmentKind, usize>, segment: &Segment) -> String {
        let counter = counters.entry(segment.kind()).or_default();
        let token = format!(
            "{PLACEHOLDER_PREFIX}{}_{counter}",
            segment.kind().as_str().to_uppercase()
        );
        *counter += 1;
        self.segments.insert(token.clone(), segment.clone());
        token
    }
}

/// Simple shell-like argument splitting for plain text.
pub fn shell_split(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;
    // Distinguishes `""` (an empty argument) from no argument.
    let mut quoted = false;

    for ch in input.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_double_quote => escape_next = true,
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                quoted = true;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                quoted = true;
            }
            c if c.is_whitespace() && !in_single_quote && !in_double_quote => {
                if !current.is_empty() || quoted {
                    args.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() || quoted {
        args.push(current);
    }

    args
}

impl UniMessage {
    /// Splits the message into shell-style tokens.
    ///
    /// A segment boundary always breaks a word, so text in separate
    /// segments is never concatenated.
    pub fn command_tokens(&self) -> (Vec<String>, HandleRegistry) {
        let mut args = Vec::new();
        let mut registry = HandleRegistry::default();
        let mut counters = HashMap::new();

        for segment in self {
            match segment.as_text() {
                Some(text) => args.extend(shell_split(text)),
                None => args.push(registry.register(&mut counters, segment)),
            }
        }

        (args, registry)
    }
}

#[cfg(feature = "command")]
pub use clap_support::SegmentArg;

#[cfg(feature = "command")]
mod clap_support {
    use std::cell::RefCell;

    use super::HandleRegistry;
    use crate::message::UniMessage;
    use crate::segment::{At, Media, Segment, SegmentData};

    // Registry visible to `SegmentArg::from_str` while clap parses.
    thread_local! {
        static CURRENT_REGISTRY: RefCell<Option<HandleRegistry>> = const { RefCell::new(None) };
    }

    /// A non-text segment that appeared as a command argument.
    ///
    /// Plain words are accepted too and become text segments.
    #[derive(Debug, Clone, PartialEq)]
    pub struct SegmentArg(Segment);

    impl SegmentArg {
        pub fn segment(&self) -> &Segment {
            &self.0
        }

        pub fn into_segment(self) -> Segment {
            self.0
        }

        /// The mention, if this argument was one.
        pub fn at(&self) -> Option<&At> {
            match &self.0.data {
                SegmentData::At(at) => Some(at),
                _ => None,
            }
        }

        /// The media payload, if this argument was media.
        pub fn media(&self) -> Option<&Media> {
            self.0.as_media()
        }
    }

    impl std::ops::Deref for SegmentArg {
        type Target = Segment;

        fn deref(&self) -> &Self::Target {
            &self.0
        }
    }

    impl std::fmt::Display for SegmentArg {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            std::fmt::Display::fmt(&self.0, f)
        }
    }

    impl std::str::FromStr for SegmentArg {
        type Err = String;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            if !s.starts_with(super::PLACEHOLDER_PREFIX) {
                return Ok(Self(Segment::text(s)));
            }
            CURRENT_REGISTRY.with(|reg| {
                reg.borrow()
                    .as_ref()
                    .and_then(|r| r.resolve(s).cloned())
                    .map(SegmentArg)
                    .ok_or_else(|| format!("not a valid segment argument: {s:?}"))
            })
        }
    }

    impl UniMessage {
        /// Parses the message as a command line with clap.
        ///
        /// The first token is the command name, as `argv[0]`.
        pub fn parse_command<T: clap::Parser>(&self) -> Result<T, clap::Error> {
            let (args, registry) = self.command_tokens();
            CURRENT_REGISTRY.with(|reg| *reg.borrow_mut() = Some(registry));
            let result = T::try_parse_from(&args);
            CURRENT_REGISTRY.with(|reg| *reg.borrow_mut() = None);
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Media;

    #[test]
    fn test_shell_split() {
        assert_eq!(shell_split("/echo hello world"), vec!["/echo", "hello", "world"]);
        assert_eq!(
            shell_split(r#"/echo "hello world" 'a b' "x\"y""#),
            vec!["/echo", "hello world", "a b", "x\"y"]
        );
        assert_eq!(shell_split(r#"say """#), vec!["say", ""]);
        assert!(shell_split("  \t ").is_empty());
    }

    #[test]
    fn test_command_tokens() {
        let msg = UniMessage::text("/ban ")
            .with(Segment::at("123"))
            .with("10 ")
            .with(Segment::image(Media::from_url("https://a/b.png")))
            .with(Segment::at("456"));
        let (args, registry) = msg.command_tokens();
        assert_eq!(args, vec!["/ban", "\x00AT_0", "10", "\x00IMAGE_0", "\x00AT_1"]);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.resolve("\x00AT_1"), Some(&Segment::at("456")));
    }

    #[test]
    fn test_segment_boundary_breaks_words() {
        let msg = UniMessage::text("ab").with("cd");
        assert_eq!(msg.command_tokens().0, vec!["ab", "cd"]);
    }

    #[cfg(feature = "command")]
    #[test]
    fn test_parse_command() {
        use clap::Parser;

        #[derive(Parser, Debug)]
        struct Ban {
            user: SegmentArg,
            #[arg(long, default_value_t = 60)]
            minutes: u32,
        }

        let msg = UniMessage::text("/ban ")
            .with(Segment::at("123"))
            .with(" --minutes 5");
        let cmd: Ban = msg.parse_command().unwrap();
        assert_eq!(cmd.user.at().map(|at| at.target.as_str()), Some("123"));
        assert_eq!(cmd.minutes, 5);

        let err = UniMessage::text("/ban").parse_command::<Ban>().unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
