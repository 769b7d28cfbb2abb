//! Nom-based tokenizer for raw IRC lines.
//!
//! Splits one line (with or without its trailing CRLF) into optional IRCv3
//! tags, an optional prefix, a command, and parameters. A final parameter
//! introduced by `:` may contain spaces. Parsing is pure and borrows from
//! the input; the dispatch loop works on [`LineRef`] without allocating.

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    sequence::preceded,
    IResult,
};

use crate::error::LineParseError;
use crate::prefix::Source;

/// Parse IRCv3 message tags (the part after `@` and before the first space).
fn parse_tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_until(" "))(input)
}

/// Parse the message prefix (the part after `:` and before the first space).
fn parse_prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c| c != ' '))(input)
}

/// Parse the command token: letters or a 3-digit numeric.
fn parse_command(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric())(input)
}

fn parse_params(mut rest: &str) -> Vec<&str> {
    let mut params = Vec::new();

    while let Some(b' ') = rest.as_bytes().first().copied() {
        // Runs of spaces count as a single separator.
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }

        if let Some(b':') = rest.as_bytes().first().copied() {
            // Trailing parameter: everything after `:` to end of line.
            params.push(&rest[1..]);
            break;
        }

        let end = rest.find(' ').unwrap_or(rest.len());
        params.push(&rest[..end]);
        rest = &rest[end..];
    }

    params
}

/// One tokenized protocol line, borrowing from the read buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRef<'a> {
    /// Raw IRCv3 tags string (without the leading `@`), if present.
    pub tags: Option<&'a str>,
    /// Message prefix (without the leading `:`), if present.
    pub prefix: Option<&'a str>,
    /// Command keyword or 3-digit numeric, as received.
    pub command: &'a str,
    /// Parameters in order; the last may contain spaces.
    pub params: Vec<&'a str>,
}

impl<'a> LineRef<'a> {
    /// Tokenize one raw line.
    ///
    /// Fails with [`LineParseError`] when no command token can be found.
    pub fn parse(input: &'a str) -> Result<LineRef<'a>, LineParseError> {
        let trimmed = input.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            return Err(LineParseError::Empty);
        }

        let (rest, tags) =
            opt(parse_tags)(trimmed).map_err(|_| LineParseError::MissingCommand)?;
        let (rest, _) = space0::<_, nom::error::Error<&str>>(rest)
            .map_err(|_| LineParseError::MissingCommand)?;
        let (rest, prefix) =
            opt(parse_prefix)(rest).map_err(|_| LineParseError::MissingCommand)?;
        let (rest, _) = space0::<_, nom::error::Error<&str>>(rest)
            .map_err(|_| LineParseError::MissingCommand)?;
        let (rest, command) =
            parse_command(rest).map_err(|_| LineParseError::MissingCommand)?;

        Ok(LineRef {
            tags,
            prefix,
            command,
            params: parse_params(rest),
        })
    }

    /// Parameter at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.params.get(index).copied()
    }

    /// The prefix decomposed into nick/user/host.
    pub fn source(&self) -> Option<Source<'a>> {
        self.prefix.map(Source::parse)
    }

    /// Re-join the line into wire form (no CRLF).
    ///
    /// The final parameter gets a `:` when it is empty, contains a space, or
    /// itself starts with `:`; round-trips any well-formed line up to
    /// whitespace normalization.
    pub fn to_wire(&self) -> String {
        let mut s = String::new();
        if let Some(tags) = self.tags {
            s.push('@');
            s.push_str(tags);
            s.push(' ');
        }
        if let Some(prefix) = self.prefix {
            s.push(':');
            s.push_str(prefix);
            s.push(' ');
        }
        s.push_str(self.command);
        if let Some((trailing, middle)) = self.params.split_last() {
            for param in middle {
                s.push(' ');
                s.push_str(param);
            }
            s.push(' ');
            if trailing.is_empty() || trailing.contains(' ') || trailing.starts_with(':') {
                s.push(':');
            }
            s.push_str(trailing);
        }
        s
    }
}
