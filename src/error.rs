//! Error types for the client engine.
//!
//! Parsing and dispatch errors are recoverable (the offending line is
//! dropped); negotiation and nick-exhaustion errors are fatal for the
//! session and surface to consumers through exactly one forced
//! disconnect event.

use thiserror::Error;

/// Fatal errors that terminate a session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Underlying transport read/write failure.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A mandatory capability or mandatory SASL was rejected.
    #[error(transparent)]
    Negotiation(#[from] NegotiationFailure),

    /// Every candidate nick was rejected during registration.
    #[error("all {attempted} candidate nicks rejected")]
    NickExhausted {
        /// Number of candidates that were tried.
        attempted: usize,
    },

    /// The server closed the connection with an ERROR line.
    #[error("server error: {0}")]
    ServerError(String),
}

/// The tokenizer could not extract a command from a raw line.
///
/// Always recoverable: the line is dropped and the connection continues.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LineParseError {
    /// Line was empty (or whitespace only).
    #[error("empty line")]
    Empty,

    /// No command token could be found.
    #[error("missing command")]
    MissingCommand,
}

/// A handler received fewer parameters than its contract requires.
///
/// Logged and dropped; a single malformed line from the network must
/// never terminate the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{command}: not enough parameters: expected {expected}, got {got}")]
pub struct ProtocolViolation {
    /// The command whose contract was violated.
    pub command: String,
    /// Minimum number of parameters the handler requires.
    pub expected: usize,
    /// Number of parameters actually present.
    pub got: usize,
}

impl ProtocolViolation {
    /// Check that `got` parameters satisfy a handler needing `expected`.
    pub fn check(command: &str, expected: usize, got: usize) -> Result<(), ProtocolViolation> {
        if got < expected {
            Err(ProtocolViolation {
                command: command.to_string(),
                expected,
                got,
            })
        } else {
            Ok(())
        }
    }
}

/// Capability negotiation or SASL failed in a way configuration marks fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NegotiationFailure {
    /// Server NAKed a capability configured as mandatory.
    #[error("mandatory capability rejected: {0}")]
    CapabilityRejected(String),

    /// SASL authentication failed and SASL is configured as mandatory.
    #[error("SASL authentication failed: {0}")]
    SaslRejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_check() {
        assert!(ProtocolViolation::check("PRIVMSG", 2, 2).is_ok());
        let err = ProtocolViolation::check("PRIVMSG", 2, 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "PRIVMSG: not enough parameters: expected 2, got 1"
        );
    }

    #[test]
    fn test_negotiation_display() {
        let err = NegotiationFailure::CapabilityRejected("sasl".to_string());
        assert_eq!(err.to_string(), "mandatory capability rejected: sasl");
    }

    #[test]
    fn test_transport_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err: EngineError = io_err.into();
        assert!(matches!(err, EngineError::Transport(_)));
    }
}
