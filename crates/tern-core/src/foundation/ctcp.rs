//! CTCP (Client-to-Client Protocol) sub-codec.
//!
//! CTCP commands travel inside PRIVMSG (requests) and NOTICE (replies)
//! text, delimited by the `\x01` control byte:
//!
//! ```text
//! PRIVMSG #chan :\x01VERSION\x01
//! NOTICE nick :\x01VERSION tern 0.1\x01
//! ```

use std::fmt;

use super::message::{Message, Prefix};

/// The CTCP delimiter.
pub const CTCP_DELIM: char = '\x01';

/// A CTCP command extracted from a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtcpMessage {
    /// Upper-cased CTCP command, e.g. `VERSION`.
    pub command: String,
    /// Whitespace-separated arguments.
    pub params: Vec<String>,
    /// Prefix of the carrying message.
    pub prefix: Option<Prefix>,
}

impl CtcpMessage {
    /// Extracts a CTCP request from a PRIVMSG.
    ///
    /// Returns `None` for other commands, for messages with fewer than two
    /// parameters, and for text that is not fully wrapped in `\x01` or has a
    /// blank body. The command is the first whitespace-delimited token.
    pub fn from_message(msg: &Message) -> Option<Self> {
        if !msg.command.is("PRIVMSG") {
            return None;
        }
        let text = msg.param(1)?;
        let body = text
            .strip_prefix(CTCP_DELIM)?
            .strip_suffix(CTCP_DELIM)?;

        let mut tokens = body.split_whitespace();
        let command = tokens.next()?;

        Some(Self {
            command: command.to_ascii_uppercase(),
            params: tokens.map(str::to_owned).collect(),
            prefix: msg.prefix.clone(),
        })
    }

    /// Returns the nickname of the sender.
    pub fn source(&self) -> Option<&str> {
        self.prefix.as_ref().map(|p| p.name.as_str())
    }
}

impl fmt::Display for CtcpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.params.join(" ");
        f.write_str(&wrap(&self.command, Some(&text)))
    }
}

/// Shorthand for [`CtcpMessage::from_message`].
pub fn extract(msg: &Message) -> Option<CtcpMessage> {
    CtcpMessage::from_message(msg)
}

/// Wraps a CTCP command and optional text in `\x01` delimiters.
pub fn wrap(command: &str, text: Option<&str>) -> String {
    match text.filter(|t| !t.is_empty()) {
        Some(text) => format!("{CTCP_DELIM}{command} {text}{CTCP_DELIM}"),
        None => format!("{CTCP_DELIM}{command}{CTCP_DELIM}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn privmsg(text: &str) -> Message {
        Message::new("PRIVMSG", ["#chan", text]).with_prefix(Prefix::user("nick", "u", "h"))
    }

    #[test]
    fn test_extract_version() {
        let ctcp = extract(&privmsg("\x01VERSION\x01")).unwrap();

        assert_eq!(ctcp.command, "VERSION");
        assert!(ctcp.params.is_empty());
        assert_eq!(ctcp.source(), Some("nick"));
    }

    #[test]
    fn test_extract_with_params() {
        let ctcp = extract(&privmsg("\x01ping 123  456 \x01")).unwrap();

        assert_eq!(ctcp.command, "PING");
        assert_eq!(ctcp.params, ["123", "456"]);
    }

    #[test]
    fn test_command_ends_at_any_whitespace() {
        let ctcp = extract(&privmsg("\x01VERSION\targ\x01")).unwrap();
        assert_eq!(ctcp.command, "VERSION");
        assert_eq!(ctcp.params, ["arg"]);

        let ctcp = extract(&privmsg("\x01 time\x01")).unwrap();
        assert_eq!(ctcp.command, "TIME");
        assert!(ctcp.params.is_empty());
    }

    #[test]
    fn test_plain_text_is_not_ctcp() {
        assert!(extract(&privmsg("hello")).is_none());
        assert!(extract(&privmsg("\x01VERSION")).is_none());
        assert!(extract(&privmsg("\x01 \x01")).is_none());
        assert!(extract(&privmsg("\x01\x01")).is_none());
        assert!(extract(&privmsg("\x01\t\x01")).is_none());
    }

    #[test]
    fn test_only_privmsg_with_text() {
        let notice = Message::new("NOTICE", ["#chan", "\x01VERSION\x01"]);
        assert!(extract(&notice).is_none());

        let short = Message::new("PRIVMSG", ["#chan"]);
        assert!(extract(&short).is_none());
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("VERSION", None), "\x01VERSION\x01");
        assert_eq!(wrap("VERSION", Some("")), "\x01VERSION\x01");
        assert_eq!(wrap("ACTION", Some("waves")), "\x01ACTION waves\x01");
    }
}
