//! Message source (prefix) decomposition.

/// The `nick!user@host` prefix of a server line, borrowed.
///
/// Server-originated lines carry a bare server name; it lands in `nick`
/// with `user` and `host` empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source<'a> {
    /// The raw prefix as received.
    pub raw: &'a str,
    /// Nick (or server name).
    pub nick: &'a str,
    /// Ident/username, if present.
    pub user: Option<&'a str>,
    /// Host, if present.
    pub host: Option<&'a str>,
}

impl<'a> Source<'a> {
    /// Split a prefix into its components.
    pub fn parse(raw: &'a str) -> Source<'a> {
        let (nick_user, host) = match raw.split_once('@') {
            Some((nu, h)) => (nu, Some(h)),
            None => (raw, None),
        };
        let (nick, user) = match nick_user.split_once('!') {
            Some((n, u)) => (n, Some(u)),
            None => (nick_user, None),
        };
        Source {
            raw,
            nick,
            user,
            host,
        }
    }

    /// Whether this prefix names a server rather than a user.
    pub fn is_server(&self) -> bool {
        self.user.is_none() && self.host.is_none() && self.nick.contains('.')
    }
}
