//! mIRC formatting and color code stripping.
//!
//! Inbound message bodies can carry display-only control codes (bold,
//! color, italic, …). Handlers strip them before mention detection and
//! event construction; consumers only ever see clean text.

use std::borrow::Cow;

const BOLD: char = '\u{02}';
const COLOR: char = '\u{03}';
const HEX_COLOR: char = '\u{04}';
const RESET: char = '\u{0f}';
const REVERSE: char = '\u{16}';
const ITALIC: char = '\u{1d}';
const STRIKETHROUGH: char = '\u{1e}';
const UNDERLINE: char = '\u{1f}';

fn is_format_char(c: char) -> bool {
    matches!(
        c,
        BOLD | COLOR | HEX_COLOR | RESET | REVERSE | ITALIC | STRIKETHROUGH | UNDERLINE
    )
}

/// Extension trait for stripping display-only formatting from message text.
pub trait FormattedStringExt {
    /// Remove all mIRC formatting codes, including color digit arguments.
    ///
    /// Borrows when the input contains no formatting.
    fn strip_formatting(&self) -> Cow<'_, str>;
}

impl FormattedStringExt for str {
    fn strip_formatting(&self) -> Cow<'_, str> {
        if !self.chars().any(is_format_char) {
            return Cow::Borrowed(self);
        }

        let mut out = String::with_capacity(self.len());
        let mut chars = self.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                COLOR => {
                    // Up to two foreground digits, optionally ",NN" background.
                    for _ in 0..2 {
                        if chars.peek().is_some_and(|d| d.is_ascii_digit()) {
                            chars.next();
                        }
                    }
                    if chars.peek() == Some(&',') {
                        let mut lookahead = chars.clone();
                        lookahead.next();
                        if lookahead.peek().is_some_and(|d| d.is_ascii_digit()) {
                            chars.next();
                            for _ in 0..2 {
                                if chars.peek().is_some_and(|d| d.is_ascii_digit()) {
                                    chars.next();
                                }
                            }
                        }
                    }
                }
                HEX_COLOR => {
                    for _ in 0..6 {
                        if chars.peek().is_some_and(|d| d.is_ascii_hexdigit()) {
                            chars.next();
                        }
                    }
                }
                c if is_format_char(c) => {}
                c => out.push(c),
            }
        }
        Cow::Owned(out)
    }
}
