//! CTCP (Client-To-Client Protocol) framing.
//!
//! CTCP embeds sub-commands inside PRIVMSG/NOTICE payloads, framed by the
//! `\x01` delimiter byte. The messaging handler detects the framing and
//! delegates to a sub-dispatch on the payload's leading keyword.

/// The CTCP delimiter byte.
pub const CTCP_DELIMITER: char = '\u{01}';

/// A parsed CTCP payload, borrowing from the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ctcp<'a> {
    /// `ACTION <text>`: a /me action; re-enters the message path.
    Action(&'a str),
    /// `VERSION`: answered directly with the client identification string.
    Version,
    /// Any other keyword; ignored.
    Other(&'a str),
}

/// Whether a message body is CTCP-framed.
pub fn is_ctcp(text: &str) -> bool {
    text.len() >= 2 && text.starts_with(CTCP_DELIMITER) && text.ends_with(CTCP_DELIMITER)
}

/// Unwrap the delimiters and classify the payload.
///
/// Returns `None` when `text` is not CTCP-framed.
pub fn parse(text: &str) -> Option<Ctcp<'_>> {
    if !is_ctcp(text) {
        return None;
    }
    let payload = &text[1..text.len() - 1];

    Some(match payload.split_once(' ') {
        Some(("ACTION", rest)) => Ctcp::Action(rest),
        Some(("VERSION", _)) => Ctcp::Version,
        None if payload == "ACTION" => Ctcp::Action(""),
        None if payload == "VERSION" => Ctcp::Version,
        _ => Ctcp::Other(payload),
    })
}
