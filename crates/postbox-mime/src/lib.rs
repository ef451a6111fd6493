//! # postbox-mime
//!
//! Body structure handling for messages read over IMAP.
//!
//! ## Features
//!
//! - **Typed tree**: [`BodyPart::Leaf`] vs [`BodyPart::Multipart`], with
//!   IMAP part numbering ([`PartNumber`])
//! - **Preferred-type search**: [`resolve`] walks the tree depth first and
//!   returns the first non-empty part of the requested type
//! - **Decoding**: base64, quoted-printable, charsets, RFC 2047 encoded
//!   words and RFC 2231 parameters
//!
//! ## Quick Start
//!
//! ```ignore
//! use postbox_mime::{MediaType, resolve};
//!
//! // `tree` comes from a BODYSTRUCTURE, `source` fetches BODY[part].
//! let html = resolve(&tree, &MediaType::text_html(), &source).await?;
//! if let Some(part) = html {
//!     println!("part {}: {}", part.part, part.text);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod resolve;
mod structure;

pub mod encoding;

pub use encoding::TransferEncoding;
pub use error::{Error, Result};
pub use resolve::{PartSource, ResolvedPart, fetch_bytes, fetch_text, resolve};
pub use structure::{BodyPart, Disposition, Leaf, MediaType, PartNumber};
