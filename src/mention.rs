//! Local-nick mention detection.
//!
//! The mention flag is computed once per inbound message or action and
//! stored on the event; consumers never recompute it.

use crate::casemap::Casemapping;

/// Characters that terminate a word for mention purposes: whitespace plus
/// punctuation that cannot legally occur inside a nick. Nick-legal specials
/// (`-`, `_`, `[`, `]`, `\`, `` ` ``, `^`, `{`, `|`, `}`) do not split.
fn is_word_boundary(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            ',' | '.' | ':' | ';' | '!' | '?' | '(' | ')' | '<' | '>' | '@' | '"' | '\''
                | '*' | '&' | '#' | '+' | '=' | '/' | '~'
        )
}

/// True iff `nick` appears as a standalone token of `text` under the
/// session casemapping. Substring matches (`al` inside `alpha`) do not count.
pub fn is_mentioned(text: &str, nick: &str, casemapping: Casemapping) -> bool {
    if nick.is_empty() {
        return false;
    }
    text.split(is_word_boundary)
        .any(|token| casemapping.eq(token, nick))
}
