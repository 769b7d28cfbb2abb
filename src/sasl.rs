//! SASL PLAIN credential encoding.
//!
//! The handshake answers the server's `AUTHENTICATE +` continuation with a
//! single base64 blob: `authzid NUL authcid NUL password` (RFC 4616). For
//! IRC the authorization identity is left empty.
//!
//! # Reference
//! - IRCv3 SASL: <https://ircv3.net/specs/extensions/sasl-3.2>
//! - RFC 4616 (PLAIN): <https://tools.ietf.org/html/rfc4616>

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Maximum length of a single AUTHENTICATE argument (400 bytes).
///
/// Longer responses must be split across multiple AUTHENTICATE lines.
pub const SASL_CHUNK_SIZE: usize = 400;

/// Encode PLAIN credentials with an empty authorization identity.
pub fn encode_plain(account: &str, password: &str) -> String {
    encode_plain_with_authzid("", account, password)
}

/// Encode PLAIN credentials with an explicit authorization identity.
pub fn encode_plain_with_authzid(authzid: &str, authcid: &str, password: &str) -> String {
    let payload = format!("{}\0{}\0{}", authzid, authcid, password);
    BASE64.encode(payload.as_bytes())
}

/// Split an encoded response into AUTHENTICATE-sized chunks.
///
/// base64 output is ASCII, so byte offsets are char boundaries.
pub fn chunk_response(encoded: &str) -> impl Iterator<Item = &str> {
    (0..encoded.len())
        .step_by(SASL_CHUNK_SIZE)
        .map(move |start| &encoded[start..encoded.len().min(start + SASL_CHUNK_SIZE)])
}
