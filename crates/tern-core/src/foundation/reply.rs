//! Well-known IRC numeric replies.
//!
//! Numerics are three-digit commands sent by servers (RFC 1459, RFC 2812 and
//! widely deployed extensions). The codec maps all-digit commands onto
//! [`Reply`]; numerals missing from this table stay plain strings.

#![allow(non_camel_case_types)]

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

macro_rules! replies {
    ($($(#[$doc:meta])* $name:ident = $code:literal,)*) => {
        /// IRC server numeric reply.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u16)]
        #[non_exhaustive]
        pub enum Reply {
            $($(#[$doc])* $name = $code,)*
        }

        impl Reply {
            /// Looks up a reply by its numeric code.
            pub fn from_code(code: u16) -> Option<Self> {
                match code {
                    $($code => Some(Self::$name),)*
                    _ => None,
                }
            }

            /// Returns the symbolic name, e.g. `RPL_WELCOME`.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$name => stringify!($name),)*
                }
            }
        }
    };
}

replies! {
    // === Connection Registration ===
    /// 001
    RPL_WELCOME = 1,
    /// 002
    RPL_YOURHOST = 2,
    /// 003
    RPL_CREATED = 3,
    /// 004
    RPL_MYINFO = 4,
    /// 005 - ISUPPORT tokens
    RPL_ISUPPORT = 5,
    /// 010
    RPL_BOUNCE = 10,

    // === Command Replies ===
    /// 221
    RPL_UMODEIS = 221,
    /// 251
    RPL_LUSERCLIENT = 251,
    /// 252
    RPL_LUSEROP = 252,
    /// 253
    RPL_LUSERUNKNOWN = 253,
    /// 254
    RPL_LUSERCHANNELS = 254,
    /// 255
    RPL_LUSERME = 255,
    /// 265
    RPL_LOCALUSERS = 265,
    /// 266
    RPL_GLOBALUSERS = 266,
    /// 301
    RPL_AWAY = 301,
    /// 305
    RPL_UNAWAY = 305,
    /// 306
    RPL_NOWAWAY = 306,
    /// 311
    RPL_WHOISUSER = 311,
    /// 312
    RPL_WHOISSERVER = 312,
    /// 313
    RPL_WHOISOPERATOR = 313,
    /// 315
    RPL_ENDOFWHO = 315,
    /// 317
    RPL_WHOISIDLE = 317,
    /// 318
    RPL_ENDOFWHOIS = 318,
    /// 319
    RPL_WHOISCHANNELS = 319,
    /// 322
    RPL_LIST = 322,
    /// 323
    RPL_LISTEND = 323,
    /// 324
    RPL_CHANNELMODEIS = 324,
    /// 329
    RPL_CREATIONTIME = 329,
    /// 330
    RPL_WHOISACCOUNT = 330,
    /// 331
    RPL_NOTOPIC = 331,
    /// 332
    RPL_TOPIC = 332,
    /// 333
    RPL_TOPICWHOTIME = 333,
    /// 341
    RPL_INVITING = 341,
    /// 352
    RPL_WHOREPLY = 352,
    /// 353
    RPL_NAMREPLY = 353,
    /// 366
    RPL_ENDOFNAMES = 366,
    /// 367
    RPL_BANLIST = 367,
    /// 368
    RPL_ENDOFBANLIST = 368,
    /// 372
    RPL_MOTD = 372,
    /// 375
    RPL_MOTDSTART = 375,
    /// 376
    RPL_ENDOFMOTD = 376,
    /// 381
    RPL_YOUREOPER = 381,
    /// 396
    RPL_HOSTHIDDEN = 396,

    // === Error Replies ===
    /// 401
    ERR_NOSUCHNICK = 401,
    /// 402
    ERR_NOSUCHSERVER = 402,
    /// 403
    ERR_NOSUCHCHANNEL = 403,
    /// 404
    ERR_CANNOTSENDTOCHAN = 404,
    /// 405
    ERR_TOOMANYCHANNELS = 405,
    /// 421
    ERR_UNKNOWNCOMMAND = 421,
    /// 422
    ERR_NOMOTD = 422,
    /// 431
    ERR_NONICKNAMEGIVEN = 431,
    /// 432
    ERR_ERRONEUSNICKNAME = 432,
    /// 433
    ERR_NICKNAMEINUSE = 433,
    /// 436
    ERR_NICKCOLLISION = 436,
    /// 437
    ERR_UNAVAILRESOURCE = 437,
    /// 441
    ERR_USERNOTINCHANNEL = 441,
    /// 442
    ERR_NOTONCHANNEL = 442,
    /// 443
    ERR_USERONCHANNEL = 443,
    /// 451
    ERR_NOTREGISTERED = 451,
    /// 461
    ERR_NEEDMOREPARAMS = 461,
    /// 462
    ERR_ALREADYREGISTRED = 462,
    /// 464
    ERR_PASSWDMISMATCH = 464,
    /// 465
    ERR_YOUREBANNEDCREEP = 465,
    /// 471
    ERR_CHANNELISFULL = 471,
    /// 472
    ERR_UNKNOWNMODE = 472,
    /// 473
    ERR_INVITEONLYCHAN = 473,
    /// 474
    ERR_BANNEDFROMCHAN = 474,
    /// 475
    ERR_BADCHANNELKEY = 475,
    /// 477
    ERR_NEEDREGGEDNICK = 477,
    /// 481
    ERR_NOPRIVILEGES = 481,
    /// 482
    ERR_CHANOPRIVSNEEDED = 482,
    /// 501
    ERR_UMODEUNKNOWNFLAG = 501,
    /// 502
    ERR_USERSDONTMATCH = 502,

    // === SASL (IRCv3) ===
    /// 900
    RPL_LOGGEDIN = 900,
    /// 901
    RPL_LOGGEDOUT = 901,
    /// 903
    RPL_SASLSUCCESS = 903,
    /// 904
    ERR_SASLFAIL = 904,
    /// 906
    ERR_SASLABORTED = 906,
}

impl Reply {
    /// Returns the numeric code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Returns `true` for error numerics (400-599 and SASL failures).
    pub fn is_error(self) -> bool {
        self.name().starts_with("ERR_")
    }
}

/// The numeral is not a known reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown server reply code {0}")]
pub struct UnknownReply(pub String);

impl FromStr for Reply {
    type Err = UnknownReply;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(UnknownReply(s.to_owned()));
        }
        s.parse::<u16>()
            .ok()
            .and_then(Self::from_code)
            .ok_or_else(|| UnknownReply(s.to_owned()))
    }
}

/// Formats as the three-digit wire form.
impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_code() {
        assert_eq!(Reply::from_code(1), Some(Reply::RPL_WELCOME));
        assert_eq!(Reply::from_code(433), Some(Reply::ERR_NICKNAMEINUSE));
        assert_eq!(Reply::from_code(999), None);
    }

    #[test]
    fn test_parse_numeral() {
        assert_eq!("001".parse::<Reply>(), Ok(Reply::RPL_WELCOME));
        assert_eq!("376".parse::<Reply>(), Ok(Reply::RPL_ENDOFMOTD));
        assert!("999".parse::<Reply>().is_err());
        assert!("PRIVMSG".parse::<Reply>().is_err());
    }

    #[test]
    fn test_display_is_zero_padded() {
        assert_eq!(Reply::RPL_WELCOME.to_string(), "001");
        assert_eq!(Reply::RPL_NAMREPLY.to_string(), "353");
        assert_eq!(Reply::RPL_WELCOME.name(), "RPL_WELCOME");
    }

    #[test]
    fn test_error_classification() {
        assert!(Reply::ERR_NICKNAMEINUSE.is_error());
        assert!(!Reply::RPL_TOPIC.is_error());
    }
}
