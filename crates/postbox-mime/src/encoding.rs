//! Transfer encodings, charsets and encoded header words.
//!
//! Decoding here is lenient where mail in the wild is sloppy: base64
//! ignores line breaks and other whitespace, quoted-printable keeps a
//! malformed escape as literal text, and encoded words that fail to decode
//! are left as they were.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use encoding_rs::{Encoding, UTF_8};

use crate::error::Result;

/// `Content-Transfer-Encoding` of a body part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    #[default]
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Base64.
    Base64,
    /// Quoted-printable.
    QuotedPrintable,
    /// Raw binary.
    Binary,
}

impl TransferEncoding {
    /// Parses an encoding name. Unknown names are treated as 7bit.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }

    /// Undoes the encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if base64 content is not valid base64.
    pub fn decode(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::SevenBit | Self::EightBit | Self::Binary => Ok(data.to_vec()),
            Self::Base64 => decode_base64(data),
            Self::QuotedPrintable => Ok(decode_quoted_printable(data)),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Decodes base64, skipping whitespace anywhere in the input.
///
/// # Errors
///
/// Returns an error if what remains is not valid base64.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let compact: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD.decode(compact).map_err(Into::into)
}

/// Decodes quoted-printable at the byte level (RFC 2045 section 6.7).
///
/// Soft line breaks (`=` before CRLF or LF) are removed. An `=` not
/// followed by two hex digits is kept verbatim.
#[must_use]
pub fn decode_quoted_printable(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        let byte = data[i];
        if byte != b'=' {
            out.push(byte);
            i += 1;
            continue;
        }

        let rest = &data[i + 1..];
        if rest.starts_with(b"\r\n") {
            i += 3;
        } else if rest.starts_with(b"\n") {
            i += 2;
        } else if let Some(value) = rest.get(..2).and_then(hex_pair) {
            out.push(value);
            i += 3;
        } else {
            out.push(byte);
            i += 1;
        }
    }
    out
}

fn hex_pair(pair: &[u8]) -> Option<u8> {
    let hi = char::from(pair[0]).to_digit(16)?;
    let lo = char::from(pair[1]).to_digit(16)?;
    u8::try_from(hi * 16 + lo).ok()
}

/// Converts bytes in `charset` to a string.
///
/// Labels are resolved the way browsers resolve them, so `latin1` reads as
/// windows-1252. Missing or unknown labels decode as lossy UTF-8.
#[must_use]
pub fn decode_charset(data: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .map(|c| c.trim().trim_matches('"'))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    encoding.decode_without_bom_handling(data).0.into_owned()
}

/// Decodes RFC 2047 encoded words in a header value.
///
/// Whitespace between two adjacent encoded words is dropped, as the RFC
/// requires. Words that cannot be decoded are kept as written.
#[must_use]
pub fn decode_rfc2047(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut pending_space = "";
    let mut last_was_word = false;

    while !rest.is_empty() {
        if let Some((decoded, consumed)) = rest.strip_prefix("=?").and_then(encoded_word) {
            if !last_was_word {
                out.push_str(pending_space);
            }
            out.push_str(&decoded);
            pending_space = "";
            last_was_word = true;
            rest = &rest[consumed + 2..];
            continue;
        }

        let ws_len = rest.len() - rest.trim_start().len();
        if ws_len > 0 {
            out.push_str(pending_space);
            pending_space = &rest[..ws_len];
            rest = &rest[ws_len..];
            continue;
        }

        out.push_str(pending_space);
        pending_space = "";
        last_was_word = false;
        let next = rest
            .char_indices()
            .skip(1)
            .find(|&(i, c)| c.is_whitespace() || rest[i..].starts_with("=?"))
            .map_or(rest.len(), |(i, _)| i);
        out.push_str(&rest[..next]);
        rest = &rest[next..];
    }
    out.push_str(pending_space);
    out
}

/// Decodes `charset?encoding?text?=` (the part after `=?`). Returns the
/// text and the number of bytes consumed.
fn encoded_word(s: &str) -> Option<(String, usize)> {
    let mut fields = s.splitn(3, '?');
    let charset = fields.next()?;
    let encoding = fields.next()?;
    let tail = fields.next()?;
    let end = tail.find("?=")?;
    let payload = &tail[..end];
    if payload.contains(char::is_whitespace) {
        return None;
    }
    let name = charset.split('*').next().unwrap_or(charset);

    let bytes = match encoding.to_ascii_uppercase().as_str() {
        "B" => decode_base64(payload.as_bytes()).ok()?,
        "Q" => decode_quoted_printable(payload.replace('_', " ").as_bytes()),
        _ => return None,
    };
    let consumed = charset.len() + encoding.len() + end + 4;
    Some((decode_charset(&bytes, Some(name)), consumed))
}

/// Decodes an RFC 2231 extended parameter value (`charset'lang'%XX...`).
///
/// Values without the two quote marks are percent-decoded as UTF-8.
#[must_use]
pub fn decode_rfc2231(value: &str) -> String {
    let mut parts = value.splitn(3, '\'');
    let (charset, encoded) = match (parts.next(), parts.next(), parts.next()) {
        (Some(charset), Some(_lang), Some(encoded)) => (Some(charset), encoded),
        _ => (None, value),
    };

    let raw = encoded.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            if let Some(value) = raw.get(i + 1..i + 3).and_then(hex_pair) {
                bytes.push(value);
                i += 3;
                continue;
            }
        }
        bytes.push(raw[i]);
        i += 1;
    }

    let charset = charset.filter(|c| !c.is_empty());
    decode_charset(&bytes, charset.or(Some("utf-8")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_unknown_encoding_is_seven_bit() {
        assert_eq!(TransferEncoding::parse("x-uuencode"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse(" BASE64 "), TransferEncoding::Base64);
    }

    #[test]
    fn test_base64_tolerates_line_breaks() {
        let decoded = TransferEncoding::Base64
            .decode(b"SGVsbG8s\r\nIFdvcmxk\r\nIQ==\r\n")
            .unwrap();
        assert_eq!(decoded, b"Hello, World!");
        assert!(TransferEncoding::Base64.decode(b"!!!!").is_err());
    }

    #[test]
    fn test_quoted_printable_is_byte_level() {
        assert_eq!(decode_quoted_printable(b"H=E9llo"), b"H\xE9llo");
        assert_eq!(decode_quoted_printable(b"soft=\r\nbreak"), b"softbreak");
        assert_eq!(decode_quoted_printable(b"soft=\nbreak"), b"softbreak");
        assert_eq!(decode_quoted_printable(b"100=%"), b"100=%");
        assert_eq!(decode_quoted_printable(b"tail="), b"tail=");
    }

    #[test]
    fn test_charsets() {
        assert_eq!(decode_charset(b"caf\xE9", Some("ISO-8859-1")), "café");
        assert_eq!(decode_charset("café".as_bytes(), Some("utf-8")), "café");
        assert_eq!(decode_charset(b"plain", None), "plain");
        assert_eq!(decode_charset(b"caf\xE9", Some("x-unknown")), "caf\u{FFFD}");
    }

    #[test]
    fn test_legacy_charsets() {
        assert_eq!(decode_charset(b"caf\xE9 \x80", Some("windows-1252")), "café €");
        assert_eq!(decode_charset(b"\xc7\xe4\xe5", Some("KOI8-R")), "гДЕ");
        assert_eq!(decode_rfc2047("=?windows-1252?Q?caf=E9_=80?="), "café €");
        assert_eq!(decode_rfc2047("=?koi8-r?B?8NLJ18XU?="), "Привет");
    }

    #[test]
    fn test_encoded_words() {
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?="), "Héllo");
        assert_eq!(decode_rfc2047("=?UTF-8?Q?H=C3=A9llo_there?="), "Héllo there");
        assert_eq!(decode_rfc2047("=?iso-8859-1?q?caf=E9?="), "café");
        assert_eq!(decode_rfc2047("Re: plain subject"), "Re: plain subject");
    }

    #[test]
    fn test_adjacent_encoded_words_join() {
        assert_eq!(
            decode_rfc2047("=?utf-8?Q?Hello?= =?utf-8?Q?_World?="),
            "Hello World"
        );
        assert_eq!(
            decode_rfc2047("Fwd: =?utf-8?B?SMOpbGxv?= again"),
            "Fwd: Héllo again"
        );
    }

    #[test]
    fn test_broken_encoded_word_is_kept() {
        assert_eq!(decode_rfc2047("=?utf-8?X?abc?="), "=?utf-8?X?abc?=");
        assert_eq!(decode_rfc2047("=?unterminated"), "=?unterminated");
    }

    #[test]
    fn test_extended_parameters() {
        assert_eq!(decode_rfc2231("utf-8''na%C3%AFve.txt"), "naïve.txt");
        assert_eq!(decode_rfc2231("iso-8859-1'en'caf%E9.pdf"), "café.pdf");
        assert_eq!(decode_rfc2231("plain.txt"), "plain.txt");
    }

    proptest! {
        #[test]
        fn test_plain_text_survives_header_decoding(s in "[a-zA-Z0-9 .,:!-]{0,64}") {
            prop_assert_eq!(decode_rfc2047(&s), s);
        }

        #[test]
        fn test_qp_without_equals_is_identity(data in proptest::collection::vec(any::<u8>().prop_filter("no =", |b| *b != b'='), 0..256)) {
            prop_assert_eq!(decode_quoted_printable(&data), data);
        }
    }
}
