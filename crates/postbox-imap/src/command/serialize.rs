//! Byte-level command writer.
//!
//! A command is written as a list of fragments. Every synchronizing literal
//! ends a fragment: the session must wait for a `+` continuation before it
//! sends the next one.

use crate::parser::lexer::is_atom_char;

use super::types::FetchAttribute;

/// Strings longer than this are always sent as literals.
pub const LITERAL_THRESHOLD: usize = 1024;

/// An encoded command, split at synchronizing literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCommand {
    fragments: Vec<Vec<u8>>,
}

impl EncodedCommand {
    /// Fragments in send order. All but the last end in `{n}\r\n`.
    #[must_use]
    pub fn fragments(&self) -> &[Vec<u8>] {
        &self.fragments
    }

    /// The whole command as it appears on the wire.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.fragments.concat()
    }
}

pub(super) struct Writer {
    literal_plus: bool,
    fragments: Vec<Vec<u8>>,
    buf: Vec<u8>,
}

impl Writer {
    pub(super) fn new(tag: &str, literal_plus: bool) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');
        Self {
            literal_plus,
            fragments: Vec::new(),
            buf,
        }
    }

    pub(super) fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub(super) fn sp(&mut self) -> &mut Self {
        self.raw(b" ")
    }

    /// Writes an atom, quoted string or literal, whichever the bytes allow.
    pub(super) fn astring(&mut self, s: &[u8]) -> &mut Self {
        if needs_literal(s) {
            self.literal(s)
        } else if is_plain_atom(s) {
            self.raw(s)
        } else {
            self.buf.push(b'"');
            for &b in s {
                if b == b'"' || b == b'\\' {
                    self.buf.push(b'\\');
                }
                self.buf.push(b);
            }
            self.buf.push(b'"');
            self
        }
    }

    fn literal(&mut self, s: &[u8]) -> &mut Self {
        if self.literal_plus {
            self.buf.extend_from_slice(format!("{{{}+}}\r\n", s.len()).as_bytes());
        } else {
            self.buf.extend_from_slice(format!("{{{}}}\r\n", s.len()).as_bytes());
            self.fragments.push(std::mem::take(&mut self.buf));
        }
        self.buf.extend_from_slice(s);
        self
    }

    pub(super) fn fetch_items(&mut self, items: &[FetchAttribute]) -> &mut Self {
        let wrap = items.len() != 1;
        if wrap {
            self.buf.push(b'(');
        }
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.buf.push(b' ');
            }
            self.fetch_attribute(item);
        }
        if wrap {
            self.buf.push(b')');
        }
        self
    }

    fn fetch_attribute(&mut self, item: &FetchAttribute) {
        let name: &[u8] = match item {
            FetchAttribute::Flags => b"FLAGS",
            FetchAttribute::InternalDate => b"INTERNALDATE",
            FetchAttribute::Rfc822Size => b"RFC822.SIZE",
            FetchAttribute::Envelope => b"ENVELOPE",
            FetchAttribute::BodyStructure => b"BODYSTRUCTURE",
            FetchAttribute::Uid => b"UID",
            FetchAttribute::Body { section, peek } => {
                self.raw(if *peek { b"BODY.PEEK[" } else { b"BODY[" });
                if let Some(section) = section {
                    self.raw(section.as_bytes());
                }
                self.raw(b"]");
                return;
            }
        };
        self.raw(name);
    }

    pub(super) fn finish(mut self) -> EncodedCommand {
        self.buf.extend_from_slice(b"\r\n");
        self.fragments.push(self.buf);
        EncodedCommand {
            fragments: self.fragments,
        }
    }
}

/// CR, LF, NUL and 8-bit bytes cannot travel in a quoted string.
fn needs_literal(s: &[u8]) -> bool {
    s.len() > LITERAL_THRESHOLD || s.iter().any(|&b| matches!(b, b'\r' | b'\n' | 0) || b >= 0x80)
}

// Atoms that would lex as something else (numbers, NIL, `+`) are quoted.
fn is_plain_atom(s: &[u8]) -> bool {
    let Some(&first) = s.first() else {
        return false;
    };
    !first.is_ascii_digit()
        && first != b'+'
        && !s.eq_ignore_ascii_case(b"NIL")
        && s.iter().all(|&b| is_atom_char(b) && b != b'\\')
}
