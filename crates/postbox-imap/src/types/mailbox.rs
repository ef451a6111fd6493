//! Mailbox names and the state captured on SELECT.

use super::{Flags, SeqNum, Uid, UidValidity};

/// Mailbox name as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox(pub String);

impl Mailbox {
    /// Wraps a mailbox name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// `INBOX`.
    #[must_use]
    pub fn inbox() -> Self {
        Self("INBOX".to_string())
    }

    /// Returns the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Mailbox {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// What the server told us about the selected mailbox.
///
/// Filled from the untagged data of a SELECT and kept current afterwards by
/// unsolicited `EXISTS` / `EXPUNGE` responses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Message count.
    pub exists: u32,
    /// Messages with `\Recent`.
    pub recent: u32,
    /// First unseen message, if the server reported it.
    pub unseen: Option<SeqNum>,
    /// Predicted next UID.
    pub uid_next: Option<Uid>,
    /// UIDVALIDITY.
    pub uid_validity: Option<UidValidity>,
    /// Flags defined in the mailbox.
    pub flags: Flags,
    /// Flags that can be stored permanently.
    pub permanent_flags: Flags,
    /// Selected read-only.
    pub read_only: bool,
}
