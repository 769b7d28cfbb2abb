//! CRLF line codec for the transport stream.
//!
//! Decodes the server's byte stream into one `String` per protocol line
//! and encodes outbound lines with CRLF termination. Length is enforced
//! on the inbound side so a hostile server cannot grow the buffer
//! without bound.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Maximum accepted line length in bytes, tags included.
pub const MAX_LINE_LEN: usize = 8191;

/// Newline-delimited codec producing borrowable line strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineCodec;

impl Decoder for LineCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        let Some(pos) = src.iter().position(|&b| b == b'\n') else {
            if src.len() > MAX_LINE_LEN {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("line exceeds {} bytes", MAX_LINE_LEN),
                ));
            }
            return Ok(None);
        };
        // The cap applies even when the whole line arrived in one read.
        if pos > MAX_LINE_LEN {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("line exceeds {} bytes", MAX_LINE_LEN),
            ));
        }

        let mut line = src.split_to(pos + 1);
        // Drop the LF and any preceding CR.
        line.truncate(pos);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }

        let text = String::from_utf8_lossy(&line).into_owned();
        Ok(Some(text))
    }
}

impl Encoder<String> for LineCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + 2);
        dst.put_slice(item.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
