//! Incremental response framing.
//!
//! [`ResponseDecoder`] pulls complete responses out of a growing byte buffer.
//! A response ends at the first CRLF that is not the terminator of a literal
//! announcement (`{n}\r\n`); literal payloads are skipped by length, so they
//! may contain anything, CRLF included.

use bytes::BytesMut;

use crate::parser::{Response, ResponseParser};
use crate::{Error, Result};

/// Longest line (outside literals) the decoder buffers.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Largest literal the decoder accepts.
pub const MAX_LITERAL_SIZE: usize = crate::parser::lexer::MAX_LITERAL_SIZE;

/// Outcome of one decode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A complete response was consumed from the buffer.
    Response(Response),
    /// More bytes are needed. Nothing was consumed.
    Incomplete,
}

/// Stateless framer for server output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseDecoder;

impl ResponseDecoder {
    /// Creates a decoder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Takes one complete response off the front of `buf`, if there is one.
    ///
    /// # Errors
    ///
    /// [`Error::Parse`] for a bare LF, an oversized line or literal, or a
    /// response the parser rejects. The offending bytes are consumed.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Decoded> {
        match frame_len(buf) {
            Ok(Some(len)) => {
                let frame = buf.split_to(len);
                ResponseParser::parse(&frame).map(Decoded::Response)
            }
            Ok(None) => Ok(Decoded::Incomplete),
            Err(e) => {
                buf.clear();
                Err(e)
            }
        }
    }

    /// Like [`decode`](Self::decode), for when the peer has closed the stream.
    ///
    /// # Errors
    ///
    /// Leftover bytes that do not form a complete response are a syntax error.
    pub fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Decoded> {
        match self.decode(buf)? {
            Decoded::Incomplete if !buf.is_empty() => {
                let position = buf.len();
                buf.clear();
                Err(Error::Parse {
                    position,
                    message: "stream ended inside a response (missing CRLF terminator)".into(),
                })
            }
            decoded => Ok(decoded),
        }
    }
}

/// Length of the first complete response in `buf`, literals included.
fn frame_len(buf: &[u8]) -> Result<Option<usize>> {
    let mut pos = 0;
    loop {
        let rest = &buf[pos..];
        let Some(lf) = rest.iter().position(|&b| b == b'\n') else {
            if rest.len() > MAX_LINE_LENGTH {
                return Err(parse_error(pos, "line exceeds maximum length"));
            }
            return Ok(None);
        };
        if lf > MAX_LINE_LENGTH {
            return Err(parse_error(pos, "line exceeds maximum length"));
        }
        if lf == 0 || rest[lf - 1] != b'\r' {
            return Err(parse_error(pos + lf, "line not terminated by CRLF"));
        }

        let line_end = pos + lf + 1;
        match literal_len(&rest[..lf - 1]) {
            Some(n) if n > MAX_LITERAL_SIZE => {
                return Err(parse_error(pos, "literal exceeds maximum size"));
            }
            Some(n) => {
                if buf.len() < line_end + n {
                    return Ok(None);
                }
                pos = line_end + n;
            }
            None => return Ok(Some(line_end)),
        }
    }
}

/// Parses a trailing `{n}` or `{n+}` on a line (CRLF already stripped).
fn literal_len(line: &[u8]) -> Option<usize> {
    let body = line.strip_suffix(b"}")?;
    let open = body.iter().rposition(|&b| b == b'{')?;
    let digits = &body[open + 1..];
    let digits = digits.strip_suffix(b"+").unwrap_or(digits);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

fn parse_error(position: usize, message: &str) -> Error {
    Error::Parse {
        position,
        message: message.to_string(),
    }
}
