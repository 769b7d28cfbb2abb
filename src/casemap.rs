//! IRC case-mapping.
//!
//! Nick and channel comparison is case-insensitive under a casemapping the
//! server declares via ISUPPORT. Under `rfc1459`, `[`/`{`, `]`/`}`, `\`/`|`
//! and `~`/`^` are additionally equivalent.

/// Server-declared casemapping rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Casemapping {
    /// Plain ASCII case folding. The default until the server says otherwise.
    #[default]
    Ascii,
    /// RFC 1459 folding with the bracket equivalences.
    Rfc1459,
}

impl Casemapping {
    /// Parse an ISUPPORT `CASEMAPPING=` value. Unknown values are ignored.
    pub fn parse(value: &str) -> Option<Casemapping> {
        match value {
            "ascii" => Some(Casemapping::Ascii),
            "rfc1459" | "rfc1459-strict" => Some(Casemapping::Rfc1459),
            _ => None,
        }
    }

    fn fold_char(self, c: char) -> char {
        match (self, c) {
            (Casemapping::Rfc1459, '[') => '{',
            (Casemapping::Rfc1459, ']') => '}',
            (Casemapping::Rfc1459, '\\') => '|',
            (Casemapping::Rfc1459, '~') => '^',
            (_, 'A'..='Z') => c.to_ascii_lowercase(),
            _ => c,
        }
    }

    /// Fold a name to its canonical lowercase form, usable as a registry key.
    pub fn fold(self, s: &str) -> String {
        s.chars().map(|c| self.fold_char(c)).collect()
    }

    /// Compare two names case-insensitively under this mapping.
    pub fn eq(self, a: &str, b: &str) -> bool {
        if a.len() != b.len() {
            return false;
        }
        a.chars()
            .zip(b.chars())
            .all(|(ca, cb)| self.fold_char(ca) == self.fold_char(cb))
    }
}
