//! Values returned by mailbox operations.

use chrono::{DateTime, FixedOffset};
use postbox_imap::{Flag, Flags};
use postbox_mime::{MediaType, PartNumber};

/// Which body representation the caller prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyFormat {
    /// `text/html`, falling back to `text/plain`.
    #[default]
    Html,
    /// `text/plain` only.
    Plain,
}

/// Flags and dates of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    /// Sequence number.
    pub seq: u32,
    /// UID, when the server sent it.
    pub uid: Option<u32>,
    /// Current flags.
    pub flags: Flags,
    /// When the server received the message.
    pub internal_date: Option<DateTime<FixedOffset>>,
}

impl MessageSummary {
    /// Whether `\Seen` is set.
    #[must_use]
    pub fn is_read(&self) -> bool {
        self.flags.is_seen()
    }

    /// Whether `\Flagged` is set.
    #[must_use]
    pub fn is_flagged(&self) -> bool {
        self.flags.contains(&Flag::Flagged)
    }
}

/// Envelope data of one message, shaped for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    /// Sequence number.
    pub seq: u32,
    /// `Date:` header, or the internal date when that is missing.
    pub date: Option<DateTime<FixedOffset>>,
    /// Sender address, `mailbox@host` with the mailbox lower-cased.
    pub from: String,
    /// Sender display name, decoded.
    pub name: String,
    /// Subject, decoded.
    pub subject: String,
    /// First Reply-To address.
    pub reply_to: Option<String>,
    /// Display name of the first Reply-To address, decoded.
    pub reply_to_name: Option<String>,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Current flags.
    pub flags: Flags,
}

impl MessageHeader {
    /// Date part, `YYYY-MM-DD`.
    #[must_use]
    pub fn date(&self) -> Option<String> {
        self.date.map(|d| d.format("%Y-%m-%d").to_string())
    }

    /// Time part, `HH:MM:SS`.
    #[must_use]
    pub fn time(&self) -> Option<String> {
        self.date.map(|d| d.format("%H:%M:%S").to_string())
    }

    /// Whether `\Seen` is set.
    #[must_use]
    pub fn is_read(&self) -> bool {
        self.flags.is_seen()
    }
}

/// A decoded attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Declared file name.
    pub filename: String,
    /// Content with the transfer encoding removed.
    pub data: Vec<u8>,
    /// Where the part sits in the body.
    pub part: PartNumber,
    /// Declared media type.
    pub media_type: MediaType,
}

impl Attachment {
    /// Size of the decoded content in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Header, body and attachments of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    /// Envelope data.
    pub header: MessageHeader,
    /// Preferred body text, empty when there is none.
    pub body: String,
    /// Attachments in part order.
    pub attachments: Vec<Attachment>,
}
