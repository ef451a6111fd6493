//! # postbox-core
//!
//! Mailbox operations for `postbox`, built on `postbox-imap` and
//! `postbox-mime`.
//!
//! This crate provides:
//! - Account configuration (serde, JSON) and validation
//! - [`MailClient`]: total and unread counts, headers, preferred body text
//!   and attachments of one selected mailbox
//! - Flag changes, deletion and expunge
//! - Saving attachments to a folder
//! - Guaranteed release: EXPUNGE + CLOSE + LOGOUT on [`MailClient::close`],
//!   at the end of [`MailClient::scope`], or when the client is dropped
//!
//! ```ignore
//! use postbox_core::{AccountConfig, BodyFormat, MailClient};
//!
//! let config = AccountConfig::new("imap.example.com", "ada@example.com");
//! let subjects = MailClient::scope(config, "secret", async |client| {
//!     let mut subjects = Vec::new();
//!     for id in client.unread().await? {
//!         if let Some(header) = client.header(id).await? {
//!             subjects.push(header.subject);
//!         }
//!     }
//!     Ok(subjects)
//! })
//! .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
mod error;
pub mod mailbox;

pub use account::{
    AccountConfig, Queueing, Security, ValidationError, ValidationResult, validate_account,
};
pub use error::{Error, Result};
pub use mailbox::{
    Attachment, BodyFormat, Email, MailClient, MessageHeader, MessageSummary,
};
pub use postbox_imap::Flag;
