//! Typed body structure tree and part numbering.

use std::fmt;
use std::str::FromStr;

use crate::encoding::{TransferEncoding, decode_charset, decode_rfc2047, decode_rfc2231};
use crate::error::{Error, Result};

/// A `type/subtype` pair, compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    /// Primary type, lower case.
    pub kind: String,
    /// Subtype, lower case.
    pub subtype: String,
}

impl MediaType {
    /// Creates a media type.
    #[must_use]
    pub fn new(kind: &str, subtype: &str) -> Self {
        Self {
            kind: kind.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
        }
    }

    /// `text/html`
    #[must_use]
    pub fn text_html() -> Self {
        Self::new("text", "html")
    }

    /// `text/plain`
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }
}

impl FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().split_once('/') {
            Some((kind, subtype)) if !kind.is_empty() && !subtype.is_empty() => {
                Ok(Self::new(kind, subtype))
            }
            _ => Err(Error::InvalidMediaType(s.to_string())),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)
    }
}

/// Dotted, 1-based body part number (`1`, `2.1`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartNumber(Vec<u32>);

impl PartNumber {
    /// Part `1`, which is also the body of a single-part message.
    #[must_use]
    pub fn first() -> Self {
        Self(vec![1])
    }

    /// The `index`-th (1-based) child of this part.
    #[must_use]
    pub fn child(&self, index: u32) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    /// Path components.
    #[must_use]
    pub fn path(&self) -> &[u32] {
        &self.0
    }
}

impl FromStr for PartNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let path = s
            .split('.')
            .map(|n| n.parse::<u32>().ok().filter(|&n| n > 0))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::InvalidPartNumber(s.to_string()))?;
        Ok(Self(path))
    }
}

impl fmt::Display for PartNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, n) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{n}")?;
        }
        Ok(())
    }
}

/// `Content-Disposition` of a part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Disposition {
    /// `inline`, `attachment`, ... (lower case).
    pub kind: String,
    /// Disposition parameters, names lower case.
    pub params: Vec<(String, String)>,
}

/// A non-multipart body part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Leaf {
    /// Primary type, lower case.
    pub media_type: String,
    /// Subtype, lower case. `None` when the server sent none.
    pub subtype: Option<String>,
    /// Content-Type parameters, names lower case.
    pub params: Vec<(String, String)>,
    /// Transfer encoding.
    pub encoding: TransferEncoding,
    /// Content-Disposition, if any.
    pub disposition: Option<Disposition>,
    /// Content-ID.
    pub id: Option<String>,
    /// Encoded size in bytes.
    pub size: u32,
}

impl Leaf {
    /// Effective media type. A leaf without a subtype counts as `text/plain`.
    #[must_use]
    pub fn mime_type(&self) -> MediaType {
        match &self.subtype {
            Some(subtype) => MediaType::new(&self.media_type, subtype),
            None => MediaType::text_plain(),
        }
    }

    /// Content-Type parameter, looked up case-insensitively.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        lookup(&self.params, name)
    }

    /// `charset` parameter.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.param("charset")
    }

    /// Declared file name: disposition `filename` first, then content-type
    /// `name`. RFC 2231 and RFC 2047 forms are decoded.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        let from_disposition = self
            .disposition
            .as_ref()
            .and_then(|d| named(&d.params, "filename"));
        from_disposition
            .or_else(|| named(&self.params, "name"))
            .filter(|name| !name.trim().is_empty())
    }

    /// Removes the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid for its encoding.
    pub fn decode(&self, raw: &[u8]) -> Result<Vec<u8>> {
        self.encoding.decode(raw)
    }

    /// Removes the transfer encoding and converts from the part's charset.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid for its encoding.
    pub fn decode_text(&self, raw: &[u8]) -> Result<String> {
        let bytes = self.decode(raw)?;
        Ok(decode_charset(&bytes, self.charset()))
    }
}

fn lookup<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Reads `name*` (RFC 2231) or `name` (possibly RFC 2047 encoded).
fn named(params: &[(String, String)], name: &str) -> Option<String> {
    if let Some(extended) = lookup(params, &format!("{name}*")) {
        return Some(decode_rfc2231(extended));
    }
    lookup(params, name).map(decode_rfc2047)
}

/// A message body as a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyPart {
    /// Anything that is not multipart.
    Leaf(Leaf),
    /// `multipart/*` with its children in order.
    Multipart {
        /// Subtype, lower case (`mixed`, `alternative`, ...).
        subtype: String,
        /// Child parts.
        children: Vec<BodyPart>,
    },
}

impl BodyPart {
    /// Every leaf with its part number, depth first in part order.
    ///
    /// A top-level leaf is part `1`; children of the top-level multipart
    /// are `1`, `2`, ...; deeper children are `parent.child`.
    #[must_use]
    pub fn leaves(&self) -> Vec<(PartNumber, &Leaf)> {
        let mut out = Vec::new();
        match self {
            Self::Leaf(leaf) => out.push((PartNumber::first(), leaf)),
            Self::Multipart { children, .. } => {
                for (i, child) in (1..).zip(children) {
                    child.collect_leaves(PartNumber(vec![i]), &mut out);
                }
            }
        }
        out
    }

    fn collect_leaves<'a>(&'a self, number: PartNumber, out: &mut Vec<(PartNumber, &'a Leaf)>) {
        match self {
            Self::Leaf(leaf) => out.push((number, leaf)),
            Self::Multipart { children, .. } => {
                for (i, child) in (1..).zip(children) {
                    child.collect_leaves(number.child(i), out);
                }
            }
        }
    }

    /// Leaves whose media type equals `target`, in search order.
    #[must_use]
    pub fn candidates(&self, target: &MediaType) -> Vec<(PartNumber, &Leaf)> {
        self.leaves()
            .into_iter()
            .filter(|(_, leaf)| &leaf.mime_type() == target)
            .collect()
    }

    /// Leaves that declare a file name, in part order.
    #[must_use]
    pub fn attachments(&self) -> Vec<(PartNumber, &Leaf)> {
        self.leaves()
            .into_iter()
            .filter(|(_, leaf)| leaf.filename().is_some())
            .collect()
    }
}
