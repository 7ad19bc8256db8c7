//! IRC line codec.
//!
//! Decodes a raw protocol line (RFC 2812 with IRCv3 message tags) into a
//! [`Message`] and encodes messages back into wire lines. Parsing is
//! lenient: absent tags, prefix or parameters yield empty defaults and no
//! input is rejected.
//!
//! ```rust,ignore
//! use tern_core::{Command, Message, Reply};
//!
//! let msg = Message::parse(":irc.example.org 001 nick :Welcome");
//! assert_eq!(msg.command, Command::Reply(Reply::RPL_WELCOME));
//! assert_eq!(msg.params, ["nick", "Welcome"]);
//! ```

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use tracing::warn;

use super::reply::Reply;
use crate::error::{EncodeError, EncodeResult};

// =============================================================================
// Tag Escaping
// =============================================================================

/// Escaped character to its unescaped value (IRCv3 message-tags).
const ESCAPE_SEQUENCES: [(char, char); 5] = [
    ('n', '\n'),
    ('r', '\r'),
    ('s', ' '),
    ('\\', '\\'),
    (':', ';'),
];

/// Escapes a tag value for the wire.
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match ESCAPE_SEQUENCES.iter().find(|(_, raw)| *raw == c) {
            Some((seq, _)) => {
                escaped.push('\\');
                escaped.push(*seq);
            }
            None => escaped.push(c),
        }
    }
    escaped
}

/// Unescapes a tag value from the wire.
///
/// Unknown escapes yield the escaped character itself. A lone trailing
/// backslash is dropped.
pub fn unescape(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some(seq) => {
                let raw = ESCAPE_SEQUENCES
                    .iter()
                    .find(|(s, _)| *s == seq)
                    .map_or(seq, |(_, raw)| *raw);
                unescaped.push(raw);
            }
            None => break,
        }
    }
    unescaped
}

// =============================================================================
// Prefix
// =============================================================================

/// Origin of a message: `name[!ident]@host` or a bare `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Prefix {
    /// Nickname or server name.
    pub name: String,
    /// Username, only present together with a host.
    pub ident: Option<String>,
    /// Hostname.
    pub host: Option<String>,
}

impl Prefix {
    /// Creates a bare prefix (server or nickname only).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ident: None,
            host: None,
        }
    }

    /// Creates a full user prefix.
    pub fn user(
        name: impl Into<String>,
        ident: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ident: Some(ident.into()),
            host: Some(host.into()),
        }
    }

    /// Parses a prefix, ignoring leading colons.
    ///
    /// The ident separator `!` is only honored when a host is present.
    pub fn parse(prefix: &str) -> Self {
        let prefix = prefix.trim_start_matches(':');
        let Some((user, host)) = prefix.split_once('@') else {
            return Self::new(prefix);
        };
        match user.split_once('!') {
            Some((name, ident)) => Self::user(name, ident, host),
            None => Self {
                name: user.to_owned(),
                ident: None,
                host: Some(host.to_owned()),
            },
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(host) = self.host.as_deref().filter(|h| !h.is_empty()) {
            if let Some(ident) = self.ident.as_deref().filter(|i| !i.is_empty()) {
                write!(f, "!{ident}")?;
            }
            write!(f, "@{host}")?;
        }
        Ok(())
    }
}

// =============================================================================
// Tags
// =============================================================================

/// Value of a message tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagValue {
    /// The tag was sent without `=value`.
    True,
    /// Unescaped tag value.
    Value(String),
}

impl TagValue {
    /// Returns the string value, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::True => None,
            Self::Value(v) => Some(v),
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        Self::Value(value.to_owned())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        Self::Value(value)
    }
}

impl From<bool> for TagValue {
    fn from(_: bool) -> Self {
        Self::True
    }
}

/// Message tags, ordered by key.
pub type Tags = BTreeMap<String, TagValue>;

// =============================================================================
// Command
// =============================================================================

/// Message command: a well-known numeric reply or a named command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// A numeric present in the [`Reply`] table.
    Reply(Reply),
    /// Any other command, upper-cased. Unknown numerals are kept here verbatim.
    Named(String),
}

impl Command {
    /// Returns the named command, if this is not a numeric reply.
    pub fn as_named(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Reply(_) => None,
        }
    }

    /// Returns `true` if this is the named command `name` (case-insensitive).
    pub fn is(&self, name: &str) -> bool {
        self.as_named()
            .is_some_and(|own| own.eq_ignore_ascii_case(name))
    }
}

impl From<Reply> for Command {
    fn from(reply: Reply) -> Self {
        Self::Reply(reply)
    }
}

/// Upper-cases the token and maps known numerals onto [`Reply`].
impl From<&str> for Command {
    fn from(token: &str) -> Self {
        let upper = token.to_ascii_uppercase();
        match upper.parse::<Reply>() {
            Ok(reply) => Self::Reply(reply),
            Err(_) => Self::Named(upper),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reply(reply) => fmt::Display::fmt(reply, f),
            Self::Named(name) => f.write_str(name),
        }
    }
}

// =============================================================================
// Message
// =============================================================================

/// A decoded IRC message.
///
/// Messages are built once, by [`Message::parse`] or by the outbound
/// constructors, and shared behind an `Arc` afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The command.
    pub command: Command,
    /// The origin, if the line carried one.
    pub prefix: Option<Prefix>,
    /// Parameters; the last one may contain spaces.
    pub params: Vec<String>,
    /// Unescaped IRCv3 tags.
    pub tags: Tags,
    /// The untouched input line, for decoded messages.
    pub raw_line: Option<String>,
}

impl Message {
    /// Creates an outbound message.
    pub fn new<I, S>(command: impl Into<Command>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            prefix: None,
            params: params.into_iter().map(Into::into).collect(),
            tags: Tags::new(),
            raw_line: None,
        }
    }

    /// Sets the prefix.
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Adds a tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Decodes a raw line (without the CRLF terminator).
    pub fn parse(line: &str) -> Self {
        let mut rest = line;

        let mut tags = Tags::new();
        if let Some(stripped) = rest.strip_prefix('@') {
            let (segment, remainder) = split_token(stripped);
            for tag in segment.split(';') {
                let (key, value) = match tag.split_once('=') {
                    Some((key, value)) => (key, TagValue::Value(unescape(value))),
                    None => (tag, TagValue::True),
                };
                if !key.is_empty() {
                    tags.insert(key.to_owned(), value);
                }
            }
            rest = remainder;
        }

        let mut prefix = None;
        if rest.starts_with(':') {
            let (segment, remainder) = split_token(rest);
            prefix = Some(Prefix::parse(segment));
            rest = remainder;
        }

        let (token, mut rest) = split_token(rest);
        let upper = token.to_ascii_uppercase();
        let is_numeral = !upper.is_empty() && upper.bytes().all(|b| b.is_ascii_digit());
        let command = match upper.parse::<Reply>() {
            Ok(reply) => Command::Reply(reply),
            Err(_) => {
                if is_numeral {
                    warn!(code = %upper, line = %line, "Unknown server reply code");
                }
                Command::Named(upper)
            }
        };

        let mut params = Vec::new();
        while !rest.is_empty() {
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_owned());
                break;
            }
            let (param, remainder) = split_token(rest);
            params.push(param.to_owned());
            rest = remainder;
        }

        Self {
            command,
            prefix,
            params,
            tags,
            raw_line: Some(line.to_owned()),
        }
    }

    /// Returns the parameter at `index`.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Returns the last parameter.
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// Returns the prefix name (nickname or server).
    pub fn source(&self) -> Option<&str> {
        self.prefix.as_ref().map(|p| p.name.as_str())
    }

    /// Returns a tag value.
    pub fn tag(&self, key: &str) -> Option<&TagValue> {
        self.tags.get(key)
    }

    /// Encodes the message as a wire line, without CRLF.
    ///
    /// Fails if the result would not parse back into the same message:
    /// a line break or NUL anywhere, an empty or spaced command, or a
    /// parameter before the last that needs the trailing form.
    pub fn to_line(&self) -> EncodeResult<String> {
        let command = self.command.to_string();
        if command.is_empty() || command.contains(char::is_whitespace) {
            return Err(EncodeError::InvalidCommand { command });
        }
        if let Some(prefix) = &self.prefix {
            check_line_safe("prefix", &prefix.to_string())?;
        }
        for (key, value) in &self.tags {
            check_line_safe("tag key", key)?;
            if let TagValue::Value(value) = value {
                check_line_safe("tag value", value)?;
            }
        }

        let last = self.params.len().saturating_sub(1);
        for (index, param) in self.params.iter().enumerate() {
            check_line_safe(&format!("parameter {index}"), param)?;
            if index < last && needs_trailing(param) {
                return Err(EncodeError::MiddleParam {
                    index,
                    param: param.clone(),
                });
            }
        }
        Ok(self.to_string())
    }
}

/// Rejects CR, LF and NUL.
pub fn check_line_safe(part: &str, value: &str) -> EncodeResult<()> {
    if value.contains(['\r', '\n', '\0']) {
        return Err(EncodeError::ForbiddenCharacter {
            part: part.to_owned(),
            value: value.to_owned(),
        });
    }
    Ok(())
}

fn needs_trailing(param: &str) -> bool {
    param.is_empty() || param.contains(' ') || param.starts_with(':')
}

/// Writes the wire form without validation; see [`Message::to_line`].
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.tags.is_empty() {
            f.write_char('@')?;
            for (i, (key, value)) in self.tags.iter().enumerate() {
                if i > 0 {
                    f.write_char(';')?;
                }
                f.write_str(key)?;
                if let TagValue::Value(value) = value {
                    write!(f, "={}", escape(value))?;
                }
            }
            f.write_char(' ')?;
        }
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        write!(f, "{}", self.command)?;

        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            if i == last && needs_trailing(param) {
                write!(f, " :{param}")?;
            } else {
                write!(f, " {param}")?;
            }
        }
        Ok(())
    }
}

/// Splits off the first whitespace-delimited token; the remainder is
/// stripped of leading whitespace.
fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}
