//! IRCv3 capability tags.
//!
//! The handshake requests the intersection of the capabilities the server
//! advertises and the set the configuration desires; acknowledged entries
//! move from the pending set to the negotiated set.
//!
//! # Reference
//! - IRCv3 Capability Negotiation: <https://ircv3.net/specs/extensions/capability-negotiation>

/// A negotiable client capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Capability {
    /// Show all user prefix modes in NAMES.
    MultiPrefix,
    /// SASL authentication.
    Sasl,
    /// Server-time message tags.
    ServerTime,
    /// Notify of away status changes.
    AwayNotify,
    /// Notify of account login/logout.
    AccountNotify,
    /// Extended JOIN with account and realname.
    ExtendedJoin,
    /// Unknown/custom capability.
    Custom(String),
}

impl AsRef<str> for Capability {
    fn as_ref(&self) -> &str {
        match self {
            Self::MultiPrefix => "multi-prefix",
            Self::Sasl => "sasl",
            Self::ServerTime => "server-time",
            Self::AwayNotify => "away-notify",
            Self::AccountNotify => "account-notify",
            Self::ExtendedJoin => "extended-join",
            Self::Custom(s) => s,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<&str> for Capability {
    fn from(s: &str) -> Self {
        match s {
            "multi-prefix" => Self::MultiPrefix,
            "sasl" => Self::Sasl,
            "server-time" => Self::ServerTime,
            "away-notify" => Self::AwayNotify,
            "account-notify" => Self::AccountNotify,
            "extended-join" => Self::ExtendedJoin,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// Parse a space-separated capability list from a CAP LS/ACK/NAK argument.
///
/// Values (`cap=value`) and ACK modifiers (`-`, `~`, `=`) are stripped;
/// removal entries (`-cap`) are skipped entirely.
pub fn parse_cap_list(list: &str) -> Vec<Capability> {
    list.split_whitespace()
        .filter(|cap| !cap.starts_with('-'))
        .map(|cap| {
            let cap = cap.trim_start_matches(['~', '=']);
            let name = cap.split('=').next().unwrap_or(cap);
            Capability::from(name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_ref() {
        assert_eq!(Capability::MultiPrefix.as_ref(), "multi-prefix");
        assert_eq!(Capability::Sasl.as_ref(), "sasl");
        assert_eq!(Capability::Custom("znc.in/self-message".into()).as_ref(), "znc.in/self-message");
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Capability::from("sasl"), Capability::Sasl);
        assert_eq!(
            Capability::from("draft/chathistory"),
            Capability::Custom("draft/chathistory".to_string())
        );
    }

    #[test]
    fn test_parse_cap_list_values_and_modifiers() {
        let caps = parse_cap_list("multi-prefix sasl=PLAIN,EXTERNAL -away-notify ~server-time");
        assert_eq!(caps.len(), 3);
        assert!(caps.contains(&Capability::MultiPrefix));
        assert!(caps.contains(&Capability::Sasl));
        assert!(caps.contains(&Capability::ServerTime));
        assert!(!caps.contains(&Capability::AwayNotify));
    }
}
